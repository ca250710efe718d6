//! Built-in catalog of audit scenarios. Read-only data.

use contracts::{Difficulty, Scenario};
use rand::Rng;
use rand::RngCore;

struct ScenarioSeed {
    id: u32,
    title: &'static str,
    category: &'static str,
    difficulty: Difficulty,
    log_text: &'static str,
    vulnerability_type: &'static str,
    hidden_anomaly: &'static str,
    audit_clue: &'static str,
    answer_key: &'static str,
}

const SCENARIOS: [ScenarioSeed; 10] = [
    ScenarioSeed {
        id: 1,
        title: "Flash Loan Arbitrage Exploit",
        category: "DeFi",
        difficulty: Difficulty::Advanced,
        log_text: "Block Height: #15428763
[1] User A borrows 10,000 ETH from dYdX (Flash Loan)
[2] Swaps 10,000 ETH for DAI on Uniswap V2 (Rate: 1 ETH = 3,800 DAI)
[3] Swaps DAI for ETH on SushiSwap (Rate: 1 ETH = 3,820 DAI)
[4] Repays flash loan of 10,000 ETH
[5] Profit: 52.36 ETH transferred to User A's address",
        vulnerability_type: "Price Manipulation Attack",
        hidden_anomaly: "The swap in step [3] used a pre-manipulated liquidity pool",
        audit_clue: "Check if the liquidity change timestamps on both exchanges are suspiciously close",
        answer_key: "price_manipulation",
    },
    ScenarioSeed {
        id: 2,
        title: "NFT Minting Permission Bypass",
        category: "NFT",
        difficulty: Difficulty::Intermediate,
        log_text: "Contract: MoonbirdsClone (0x7E9a...)
[1] User B calls mintPublic(quantity: 5) - Success
[2] User B calls mintPublic(quantity: 5) - Success
[3] User B calls mintPublic(quantity: 5) - Success
[4] User B transfers 15 NFTs to new address
[5] Total minted: 15/10,000",
        vulnerability_type: "Missing Re-mint Protection",
        hidden_anomaly:
            "Contract doesn't record minted addresses, allowing unlimited mints from same address",
        audit_clue: "Check if mintPublic function calls _checkMintLimit modifier",
        answer_key: "missing_limit_check",
    },
    ScenarioSeed {
        id: 3,
        title: "Governance Proposal Hijack",
        category: "DAO",
        difficulty: Difficulty::Advanced,
        log_text: "DAO: UniWhales Governance
Proposal #47: \"Allocate 20% of treasury ETH to core contributors\"
[1] Proposal created by: User C (holds 0.01% tokens)
[2] Snapshot time: Block #15428700
[3] Current votes:
   - For: 42% (mainly from 3 new addresses)
   - Against: 15%
   - Abstain: 43%
[4] Voting deadline: 2 hours remaining",
        vulnerability_type: "Vote Borrowing Attack",
        hidden_anomaly: "Voting power of 3 new addresses comes from the same flash loan pool",
        audit_clue:
            "Check token holding duration of voting addresses, verify if temporarily borrowed",
        answer_key: "vote_borrowing",
    },
    ScenarioSeed {
        id: 4,
        title: "Staking Reward Calculation Error",
        category: "DeFi",
        difficulty: Difficulty::Intermediate,
        log_text: "Staking Contract: StellarFarm v2
[1] User D stakes 100,000 USDC
[2] After 7 days, User D withdraws:
   - Principal: 100,000 USDC
   - Rewards: 15,732 USDC (APY: 820%)
[3] Total staked in contract: 1,200,000 USDC
[4] Reward pool balance: 35,000 USDC",
        vulnerability_type: "Integer Overflow / Reward Over-issuance",
        hidden_anomaly: "Reward calculation uses incorrect multiplier (1000x error)",
        audit_clue: "Check reward calculation formula: reward = principal * rate * time / precision",
        answer_key: "integer_overflow",
    },
    ScenarioSeed {
        id: 5,
        title: "Multisig Timelock Bypass",
        category: "Multisig",
        difficulty: Difficulty::Advanced,
        log_text: "Multisig Wallet: 3/5 Gnosis Safe
Pending Transaction #89:
[1] Transfer funds: 500 ETH -> External address
[2] Signed by: Address A, Address B, Address C
[3] Submission time: 2024-03-15 14:30:00 UTC
[4] Execution time: 2024-03-15 14:31:00 UTC
[5] Timelock setting: Minimum 24 hours",
        vulnerability_type: "Timelock Configuration Error",
        hidden_anomaly: "Timelock contract not properly connected to multisig wallet",
        audit_clue: "Check if timelock contract owner is the multisig wallet address",
        answer_key: "timelock_bypass",
    },
    ScenarioSeed {
        id: 6,
        title: "Oracle Data Manipulation",
        category: "DeFi",
        difficulty: Difficulty::Advanced,
        log_text: "Lending Protocol: Atlantis Lend
[1] User E deposits collateral: 100 BTC (value $4,200,000)
[2] User E borrows: 2,800,000 USDT (collateral ratio: 66%)
[3] Price update: BTC/USD from $42,000 -> $38,000
[4] Liquidation triggered: User E's position liquidated
[5] Liquidation price: $38,000 (from Chainlink)
[6] Other exchange average: $41,500",
        vulnerability_type: "Oracle Flash Unbinding Attack",
        hidden_anomaly:
            "Chainlink oracle used abnormally low minimum responder count during update",
        audit_clue: "Check oracle aggregator's minimum responder parameter",
        answer_key: "oracle_manipulation",
    },
    ScenarioSeed {
        id: 7,
        title: "Token Transfer Tax Vulnerability",
        category: "Token",
        difficulty: Difficulty::Intermediate,
        log_text: "Token: TaxToken (TAX)
[1] User F buys: 100,000 TAX (worth 10 ETH)
[2] User F transfers to User G: 100,000 TAX
[3] User G receives: 99,000 TAX (1% transfer tax)
[4] User G transfers back to User F: 99,000 TAX
[5] User F receives: 100,980 TAX
[6] Tax contract balance: Should hold 1,980 TAX, actually holds 0",
        vulnerability_type: "Tax Distribution Logic Error",
        hidden_anomaly:
            "Tax tokens incorrectly sent to burn address without updating total supply",
        audit_clue: "Check tax distribution logic in _transfer function",
        answer_key: "tax_logic_error",
    },
    ScenarioSeed {
        id: 8,
        title: "Cross-chain Bridge Signature Vulnerability",
        category: "Bridge",
        difficulty: Difficulty::Advanced,
        log_text: "Cross-chain Bridge: Orion Bridge (ETH -> BSC)
[1] User H locks on ETH chain: 50 ETH
[2] Proof generated: Included in block #15428745
[3] User H redeems on BSC chain: 50 ETH
[4] 5 minutes later, same User H redeems again on BSC: 50 ETH
[5] Bridge contract BSC balance: Decreased by 100 ETH in short time",
        vulnerability_type: "Signature Replay Attack",
        hidden_anomaly: "Cross-chain message lacks unique nonce, allowing duplicate redemptions",
        audit_clue: "Check if verification function validates proof uniqueness",
        answer_key: "replay_attack",
    },
    ScenarioSeed {
        id: 9,
        title: "Liquidity Pool Infinite Mint",
        category: "DEX",
        difficulty: Difficulty::Advanced,
        log_text: "DEX: Cronos Swap
Liquidity Pool: CRO/USDC
[1] User I adds liquidity: 10,000 CRO + 3,800 USDC
[2] Receives LP tokens: 380.45 CROUSDC-LP
[3] User I immediately removes liquidity:
   - Receives: 20,000 CRO + 7,600 USDC
   - LP tokens burned: 380.45
[4] Pool balance change:
   - Before: 100,000 CRO + 38,000 USDC
   - After: 90,000 CRO + 33,400 USDC",
        vulnerability_type: "Mint Function Missing Input Balance Check",
        hidden_anomaly: "Adding liquidity doesn't verify if CRO/USDC ratio is correct",
        audit_clue: "Check balance validation in addLiquidity function",
        answer_key: "mint_validation_error",
    },
    ScenarioSeed {
        id: 10,
        title: "Airdrop Claim Permission Leak",
        category: "Airdrop",
        difficulty: Difficulty::Intermediate,
        log_text: "Airdrop Contract: Arbitrum Odyssey Airdrop
[1] User J calls claim(proof, amount: 500 ARB) - Success
[2] User K calls claim(proof, amount: 500 ARB) - Success
[3] User L calls claim(using User J's proof, amount: 500 ARB) - Success
[4] Total claimed: 1,500 ARB
[5] Should have claimed: 1,000 ARB",
        vulnerability_type: "Merkle Proof Not Marked as Used",
        hidden_anomaly: "Contract doesn't store used proof hashes",
        audit_clue: "Check if claim function sets proofUsed mapping",
        answer_key: "proof_reuse",
    },
];

impl ScenarioSeed {
    fn to_scenario(&self) -> Scenario {
        Scenario {
            id: self.id,
            title: self.title.to_string(),
            category: self.category.to_string(),
            difficulty: self.difficulty,
            log_text: self.log_text.to_string(),
            vulnerability_type: self.vulnerability_type.to_string(),
            hidden_anomaly: self.hidden_anomaly.to_string(),
            audit_clue: self.audit_clue.to_string(),
            answer_key: self.answer_key.to_string(),
        }
    }
}

pub fn count() -> usize {
    SCENARIOS.len()
}

pub fn all() -> Vec<Scenario> {
    SCENARIOS.iter().map(ScenarioSeed::to_scenario).collect()
}

pub fn get(id: u32) -> Option<Scenario> {
    SCENARIOS
        .iter()
        .find(|seed| seed.id == id)
        .map(ScenarioSeed::to_scenario)
}

/// Uniform pick over the whole catalog.
pub fn pick(rng: &mut dyn RngCore) -> Scenario {
    let index = rng.gen_range(0..SCENARIOS.len());
    SCENARIOS[index].to_scenario()
}
