//! Round chat: system notices, player messages, and scripted AI replies.
//! Nothing here feeds back into roles, votes, or rewards.

use contracts::{ChatMessage, GameConfig, Player, ScheduledAction, Scenario};
use rand::{Rng, RngCore};

pub const AI_REPLIES: [&str; 8] = [
    "I think step [3] is suspicious, the timestamps are too close",
    "This looks like a classic flash loan attack pattern",
    "Let me check the contract address...",
    "Agreed, there seems to be an overflow risk in the calculations",
    "Did anyone notice the abnormally low transaction fees?",
    "The vulnerability might be in the permission check",
    "I'm not sure about this one, needs more analysis",
    "This could be a reentrancy issue",
];

pub fn round_started(scenario: &Scenario, tick: u64) -> ChatMessage {
    ChatMessage::system(format!("Game started! Scenario: {}", scenario.title), tick)
}

pub fn round_instructions(discussion_secs: u32, tick: u64) -> ChatMessage {
    let minutes = discussion_secs.div_ceil(60).max(1);
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    ChatMessage::system(
        format!(
            "Analyze the transaction logs and find potential vulnerabilities. Voting begins in {minutes} {unit}."
        ),
        tick,
    )
}

pub fn voting_started(tick: u64) -> ChatMessage {
    ChatMessage::system(
        "Voting phase started! Vote for who you think is the Saboteur.",
        tick,
    )
}

pub fn reply_text(phrase_index: usize) -> &'static str {
    AI_REPLIES[phrase_index % AI_REPLIES.len()]
}

/// Maybe picks a simulated player to answer the human, returning the
/// reply action and its delay in ticks.
pub fn plan_reply(
    roster: &[Player],
    config: &GameConfig,
    rng: &mut dyn RngCore,
) -> Option<(u64, ScheduledAction)> {
    let responders = roster
        .iter()
        .filter(|player| player.is_simulated)
        .collect::<Vec<_>>();
    if responders.is_empty() || !rng.gen_bool(config.chat_reply_probability) {
        return None;
    }

    let responder = responders[rng.gen_range(0..responders.len())];
    let phrase_index = rng.gen_range(0..AI_REPLIES.len());
    let [min_delay, max_delay] = config.chat_reply_delay;
    let delay = rng.gen_range(min_delay..=max_delay).max(1);

    Some((
        u64::from(delay),
        ScheduledAction::AiChatReply {
            responder_id: responder.id.clone(),
            phrase_index,
        },
    ))
}
