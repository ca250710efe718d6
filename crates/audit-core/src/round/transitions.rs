use contracts::{Action, ChatMessage, GameEventKind, Phase, Player, ScheduledAction};
use rand::Rng;

use super::{Effect, RoundEvent, RoundState, Transition, TransitionContext};
use crate::error::RoundError;
use crate::schedule;
use crate::voting::{self, RoundRecord, VoteRejection};
use crate::{chat, roster, scenario};

impl RoundState {
    pub fn apply(
        &self,
        event: &RoundEvent,
        ctx: &mut TransitionContext<'_>,
    ) -> Result<Transition, RoundError> {
        let mut step = Step {
            state: self.clone(),
            effects: Vec::new(),
        };

        match event {
            RoundEvent::Tick => step.tick(ctx),
            RoundEvent::Action(action) => step.action(action, ctx)?,
        }

        Ok(Transition {
            state: step.state,
            effects: step.effects,
        })
    }
}

struct Step {
    state: RoundState,
    effects: Vec<Effect>,
}

impl Step {
    fn action(&mut self, action: &Action, ctx: &mut TransitionContext<'_>) -> Result<(), RoundError> {
        match action {
            Action::StartMatch => self.start_match(ctx),
            Action::StartWithAi => self.start_with_ai(ctx),
            Action::SendChat { text } => self.send_chat(text, ctx),
            Action::CastVote { target_id } => self.cast_human_vote(target_id, ctx),
            Action::NextRound => self.next_round(ctx),
            Action::Exit => {
                self.exit(ctx);
                Ok(())
            }
        }
    }

    fn log(&mut self, kind: GameEventKind) {
        self.effects.push(Effect::Log(kind));
    }

    fn require_phase(&self, action: &'static str, expected: Phase) -> Result<(), RoundError> {
        if self.state.phase != expected {
            return Err(RoundError::WrongPhase {
                action,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn set_phase(&mut self, to: Phase) {
        let from = self.state.phase;
        self.state.phase = to;
        self.state.generation = self.state.generation.saturating_add(1);
        self.log(GameEventKind::PhaseChanged { from, to });
    }

    // -----------------------------------------------------------------------
    // Lobby / Results -> Matching
    // -----------------------------------------------------------------------

    fn start_match(&mut self, ctx: &mut TransitionContext<'_>) -> Result<(), RoundError> {
        self.require_phase("start_match", Phase::Lobby)?;
        self.charge_entry_fee(ctx)?;
        self.enter_matching(ctx);
        Ok(())
    }

    fn next_round(&mut self, ctx: &mut TransitionContext<'_>) -> Result<(), RoundError> {
        self.require_phase("next_round", Phase::Results)?;
        self.charge_entry_fee(ctx)?;
        self.state.round_number = self.state.round_number.saturating_add(1);
        self.enter_matching(ctx);
        Ok(())
    }

    fn charge_entry_fee(&mut self, ctx: &TransitionContext<'_>) -> Result<(), RoundError> {
        let fee = ctx.config.entry_fee;
        let balance = self.state.profile.token_balance;
        if balance < fee {
            return Err(RoundError::InsufficientBalance { balance, fee });
        }
        self.state.profile.token_balance = balance - fee;
        self.effects
            .push(Effect::ProfileChanged(self.state.profile.clone()));
        Ok(())
    }

    fn enter_matching(&mut self, ctx: &mut TransitionContext<'_>) {
        let human = Player::from_profile(&self.state.profile);
        self.state.roster = roster::build_roster(human.clone());
        self.state.scenario = None;
        self.state.votes.clear();
        self.state.messages.clear();
        self.state.result = None;
        self.state.timers = ctx.config.timers();
        self.set_phase(Phase::Matching);
        self.log(GameEventKind::PlayerJoined {
            player_id: human.id,
            name: human.name,
            is_simulated: false,
        });

        let start = self.state.tick;
        let generation = self.state.generation;
        for offset in &ctx.config.join_offsets {
            if ctx.rng.gen_bool(ctx.config.join_probability) {
                self.state.schedule.schedule(
                    start + u64::from(*offset),
                    generation,
                    ScheduledAction::SimulatedJoin,
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Matching -> Discussion
    // -----------------------------------------------------------------------

    fn start_with_ai(&mut self, ctx: &mut TransitionContext<'_>) -> Result<(), RoundError> {
        self.require_phase("start_with_ai", Phase::Matching)?;
        self.enter_discussion(ctx);
        Ok(())
    }

    fn enter_discussion(&mut self, ctx: &mut TransitionContext<'_>) {
        let added =
            roster::fill_remaining_with_ai(&mut self.state.roster, ctx.config.roster_size, ctx.rng);
        for player in added {
            self.log(GameEventKind::PlayerJoined {
                player_id: player.id,
                name: player.name,
                is_simulated: true,
            });
        }

        roster::assign_roles(&mut self.state.roster, ctx.rng);
        self.log(GameEventKind::RolesAssigned {
            roster_size: self.state.roster.len(),
        });

        let scenario = scenario::pick(ctx.rng);
        let tick = self.state.tick;
        self.state.timers.matching = 0;
        self.state.timers.discussion = ctx.config.discussion_secs;
        self.state.messages = vec![
            chat::round_started(&scenario, tick),
            chat::round_instructions(ctx.config.discussion_secs, tick),
        ];
        self.state.scenario = Some(scenario);
        self.set_phase(Phase::Discussion);
    }

    fn send_chat(&mut self, text: &str, ctx: &mut TransitionContext<'_>) -> Result<(), RoundError> {
        let phase = self.state.phase;
        if !matches!(phase, Phase::Discussion | Phase::Voting) {
            return Err(RoundError::WrongPhase {
                action: "send_chat",
                phase,
            });
        }
        let content = text.trim();
        if content.is_empty() {
            return Err(RoundError::EmptyMessage);
        }

        let sender = self
            .state
            .human()
            .cloned()
            .unwrap_or_else(|| Player::from_profile(&self.state.profile));
        let tick = self.state.tick;
        self.state
            .messages
            .push(ChatMessage::from_player(&sender, content, tick));
        self.log(GameEventKind::ChatPosted {
            sender_id: Some(sender.id),
        });

        if phase == Phase::Discussion {
            if let Some((delay, reply)) = chat::plan_reply(&self.state.roster, ctx.config, ctx.rng)
            {
                let generation = self.state.generation;
                self.state.schedule.schedule(tick + delay, generation, reply);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Discussion -> Voting -> Results
    // -----------------------------------------------------------------------

    fn enter_voting(&mut self, ctx: &mut TransitionContext<'_>) {
        let tick = self.state.tick;
        self.state.timers.discussion = 0;
        self.state.timers.voting = ctx.config.voting_secs;
        self.state.votes.clear();
        self.state.messages.push(chat::voting_started(tick));
        self.set_phase(Phase::Voting);

        // Every simulated vote lands strictly before the voting timer runs out.
        let latest = u64::from(ctx.config.voting_secs.saturating_sub(1));
        let generation = self.state.generation;
        let voters = self
            .state
            .roster
            .iter()
            .filter(|player| player.is_simulated)
            .map(|player| player.id.clone())
            .collect::<Vec<_>>();
        for (index, voter_id) in voters.into_iter().enumerate() {
            let slot = u32::try_from(index + 1)
                .unwrap_or(u32::MAX)
                .saturating_mul(ctx.config.ai_vote_spacing);
            let jitter = ctx.rng.gen_range(0..=ctx.config.ai_vote_jitter);
            let offset = u64::from(slot.saturating_add(jitter)).min(latest);
            self.state.schedule.schedule(
                tick + offset,
                generation,
                ScheduledAction::AiVote { voter_id },
            );
        }
    }

    fn cast_human_vote(
        &mut self,
        target_id: &str,
        ctx: &mut TransitionContext<'_>,
    ) -> Result<(), RoundError> {
        let voter_id = self.state.profile.id.clone();
        self.record_vote(&voter_id, target_id)
            .map_err(RoundError::InvalidVote)?;
        if self.quorum_reached() {
            self.resolve_round(ctx);
        }
        Ok(())
    }

    fn record_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), VoteRejection> {
        voting::validate_vote(
            self.state.phase,
            &self.state.roster,
            &self.state.votes,
            voter_id,
            target_id,
        )?;
        self.state
            .votes
            .insert(voter_id.to_string(), target_id.to_string());
        self.log(GameEventKind::VoteCast {
            voter_id: voter_id.to_string(),
            target_id: target_id.to_string(),
        });
        Ok(())
    }

    fn cast_simulated_vote(
        &mut self,
        voter_id: &str,
        ctx: &mut TransitionContext<'_>,
    ) -> Result<(), VoteRejection> {
        let candidates = self
            .state
            .roster
            .iter()
            .filter(|player| player.id != voter_id)
            .map(|player| player.id.clone())
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return Err(VoteRejection::UnknownTarget);
        }
        let target_id = candidates[ctx.rng.gen_range(0..candidates.len())].clone();
        self.record_vote(voter_id, &target_id)
    }

    fn quorum_reached(&self) -> bool {
        !self.state.roster.is_empty() && self.state.votes.len() == self.state.roster.len()
    }

    fn resolve_round(&mut self, ctx: &mut TransitionContext<'_>) {
        let missing = self
            .state
            .simulated_without_vote()
            .into_iter()
            .map(|player| player.id.clone())
            .collect::<Vec<_>>();
        for voter_id in missing {
            if let Err(rejection) = self.cast_simulated_vote(&voter_id, ctx) {
                let reason = format!("{rejection:?}");
                self.drop_entry(ScheduledAction::AiVote { voter_id }, &reason);
            }
        }

        let result = voting::resolve(&self.state.votes, &self.state.roster);
        for player in &mut self.state.roster {
            let reward = result.per_player_reward.get(&player.id).copied().unwrap_or(0);
            player.token_balance = player.token_balance.saturating_add(reward);
        }

        let human_reward = result
            .per_player_reward
            .get(&self.state.profile.id)
            .copied()
            .unwrap_or(0);
        self.state.profile.token_balance =
            self.state.profile.token_balance.saturating_add(human_reward);
        self.state.profile.rounds_played = self.state.profile.rounds_played.saturating_add(1);
        self.effects
            .push(Effect::ProfileChanged(self.state.profile.clone()));

        if let Some(scenario) = &self.state.scenario {
            let entry = RoundRecord {
                result: &result,
                votes: &self.state.votes,
                roster: &self.state.roster,
                scenario,
                human_id: &self.state.profile.id,
                round_number: self.state.round_number,
                recorded_at_ms: ctx.now_ms,
                generation: self.state.generation,
            }
            .to_history_entry();
            self.effects.push(Effect::RoundCompleted(entry));
        }

        self.log(GameEventKind::RoundResolved {
            ejected_player_id: result.ejected_player_id.clone(),
            saboteur_caught: result.saboteur_caught,
            human_reward,
        });
        self.state.timers.voting = 0;
        self.state.result = Some(result);
        self.set_phase(Phase::Results);
    }

    // -----------------------------------------------------------------------
    // Any -> Lobby
    // -----------------------------------------------------------------------

    fn exit(&mut self, ctx: &mut TransitionContext<'_>) {
        self.state.round_number = 1;
        self.state.roster.clear();
        self.state.scenario = None;
        self.state.messages.clear();
        self.state.votes.clear();
        self.state.result = None;
        self.state.timers = ctx.config.timers();
        self.state.schedule.clear();
        if self.state.phase == Phase::Lobby {
            self.state.generation = self.state.generation.saturating_add(1);
        } else {
            self.set_phase(Phase::Lobby);
        }
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    fn tick(&mut self, ctx: &mut TransitionContext<'_>) {
        self.state.tick = self.state.tick.saturating_add(1);
        let due = self.state.schedule.pop_due(self.state.tick);
        for entry in due {
            match schedule::staleness(&entry, self.state.generation, self.state.phase) {
                Some(reason) => self.drop_entry(entry.action, reason),
                None => self.fire(entry.action, ctx),
            }
        }
        self.advance_timer(ctx);
    }

    fn drop_entry(&mut self, action: ScheduledAction, reason: &str) {
        self.log(GameEventKind::ScheduledActionDropped {
            action,
            reason: reason.to_string(),
        });
    }

    fn fire(&mut self, action: ScheduledAction, ctx: &mut TransitionContext<'_>) {
        match action {
            ScheduledAction::SimulatedJoin => {
                match roster::admit_simulated_player(
                    &mut self.state.roster,
                    ctx.config.roster_size,
                    ctx.rng,
                ) {
                    Some(player) => self.log(GameEventKind::PlayerJoined {
                        player_id: player.id,
                        name: player.name,
                        is_simulated: true,
                    }),
                    None => self.drop_entry(ScheduledAction::SimulatedJoin, "roster_full"),
                }
            }
            ScheduledAction::AiVote { voter_id } => match self.cast_simulated_vote(&voter_id, ctx) {
                Ok(()) => {
                    if self.quorum_reached() {
                        self.resolve_round(ctx);
                    }
                }
                Err(rejection) => {
                    let reason = format!("{rejection:?}");
                    self.drop_entry(ScheduledAction::AiVote { voter_id }, &reason);
                }
            },
            ScheduledAction::AiChatReply {
                responder_id,
                phrase_index,
            } => match roster::find(&self.state.roster, &responder_id).cloned() {
                Some(responder) => {
                    let tick = self.state.tick;
                    self.state.messages.push(ChatMessage::from_player(
                        &responder,
                        chat::reply_text(phrase_index),
                        tick,
                    ));
                    self.log(GameEventKind::ChatPosted {
                        sender_id: Some(responder.id),
                    });
                }
                None => self.drop_entry(
                    ScheduledAction::AiChatReply {
                        responder_id,
                        phrase_index,
                    },
                    "unknown_responder",
                ),
            },
        }
    }

    fn advance_timer(&mut self, ctx: &mut TransitionContext<'_>) {
        match self.state.phase {
            Phase::Matching => {
                if countdown(&mut self.state.timers.matching) {
                    self.enter_discussion(ctx);
                }
            }
            Phase::Discussion => {
                if countdown(&mut self.state.timers.discussion) {
                    self.enter_voting(ctx);
                }
            }
            Phase::Voting => {
                if countdown(&mut self.state.timers.voting) {
                    self.resolve_round(ctx);
                }
            }
            Phase::Lobby | Phase::Results => {}
        }
    }
}

/// Decrements `timer`; true once it sits at zero.
fn countdown(timer: &mut u32) -> bool {
    *timer = timer.saturating_sub(1);
    *timer == 0
}
