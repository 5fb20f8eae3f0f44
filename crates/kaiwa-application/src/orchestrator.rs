//! Turn orchestrator.
//!
//! Drives one conversation from its first turn to its end: who speaks, what
//! they are asked to say, how the reply is bounded and presented, and when
//! the conversation stops.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kaiwa_core::config::ChatConfig;
use kaiwa_core::dialogue::{
    EndSchedule, LexiconQuestionDetector, QuestionDetector, trim_reply,
};
use kaiwa_core::error::Result;
use kaiwa_core::persona::Persona;
use kaiwa_core::session::{
    ConversationHistoryStore, ConversationSession, DestinationId, EndReason, Turn, TurnKind,
    transcript,
};
use kaiwa_interaction::{Dispatcher, GenerationError, PromptBuilder, PromptError, ResponseGenerator};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::speaker::SpeakerSelector;

/// Why a turn produced nothing.
#[derive(Debug)]
pub enum SkipReason {
    Failed(GenerationError),
    Empty,
    TooShort { chars: usize },
    Prompt(PromptError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(err) => write!(f, "generation failed: {err}"),
            Self::Empty => write!(f, "empty reply"),
            Self::TooShort { chars } => write!(f, "reply too short ({chars} chars)"),
            Self::Prompt(err) => write!(f, "prompt rendering failed: {err}"),
        }
    }
}

/// Result of asking the generator for one utterance.
#[derive(Debug)]
pub enum GenerationOutcome {
    Usable(String),
    Skipped(SkipReason),
}

/// What to converse about, where and with whom.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub destination: DestinationId,
    pub participants: Vec<Arc<Persona>>,
    pub topic: String,
}

/// Summary of a finished conversation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub destination: DestinationId,
    pub topic: String,
    pub participants: Vec<String>,
    pub turns: Vec<Turn>,
    pub skipped_turns: usize,
    pub end_reason: EndReason,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Mutable bookkeeping of one running loop.
struct LoopState {
    rng: StdRng,
    previous_speaker: Option<String>,
    last_timestamp: Option<DateTime<Utc>>,
    skipped: usize,
    consecutive_failures: usize,
    closing_considered: bool,
}

impl LoopState {
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(stamp);
        stamp
    }
}

pub struct TurnOrchestrator {
    generator: Arc<dyn ResponseGenerator>,
    dispatcher: Arc<dyn Dispatcher>,
    detector: Arc<dyn QuestionDetector>,
    history: Arc<ConversationHistoryStore>,
    prompts: PromptBuilder,
    selector: SpeakerSelector,
    schedule: EndSchedule,
    config: ChatConfig,
    seed: Option<u64>,
}

impl TurnOrchestrator {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        dispatcher: Arc<dyn Dispatcher>,
        history: Arc<ConversationHistoryStore>,
        config: ChatConfig,
    ) -> Result<Self> {
        config.validate()?;
        let prompts = PromptBuilder::new()
            .map_err(|e| kaiwa_core::KaiwaError::internal(e.to_string()))?;
        Ok(Self {
            generator,
            dispatcher,
            detector: Arc::new(LexiconQuestionDetector::new(config.question.clone())),
            history,
            prompts,
            selector: SpeakerSelector::new(&config.favored),
            schedule: EndSchedule::from(&config.termination),
            config,
            seed: None,
        })
    }

    pub fn with_detector(mut self, detector: Arc<dyn QuestionDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Makes every run draw from the same random sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<ConversationHistoryStore> {
        &self.history
    }

    /// Validates the request and runs the conversation to its end.
    pub async fn start(&self, request: SessionRequest) -> Result<SessionReport> {
        let session =
            ConversationSession::new(request.destination, request.participants, request.topic)?;
        Ok(self.run(session).await)
    }

    /// Runs an already created session to its end.
    pub async fn run(&self, mut session: ConversationSession) -> SessionReport {
        let mut state = LoopState {
            rng: match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
            previous_speaker: None,
            last_timestamp: None,
            skipped: 0,
            consecutive_failures: 0,
            closing_considered: false,
        };

        let max_turns = state
            .rng
            .gen_range(self.config.turns.min..=self.config.turns.max);
        tracing::info!(
            session_id = %session.id,
            destination = %session.destination,
            topic = %session.topic,
            participants = ?session.participant_ids(),
            max_turns,
            "Conversation started"
        );

        let mut end_reason = EndReason::TurnCap;
        for index in 0..max_turns {
            if self.pace_needed(&state) {
                self.pace(&mut state).await;
            }

            let Some((speaker, kind, prompt)) = self.plan_turn(&session, index, &mut state).await
            else {
                tracing::error!(session_id = %session.id, turn_index = index, "No speaker available");
                end_reason = EndReason::Stalled {
                    consecutive_failures: state.consecutive_failures,
                };
                break;
            };

            let context = self.context(&session.id).await;
            let text = match self.produce(&speaker, prompt, &context).await {
                GenerationOutcome::Usable(text) => text,
                GenerationOutcome::Skipped(reason) => {
                    state.skipped += 1;
                    state.consecutive_failures += 1;
                    tracing::warn!(
                        session_id = %session.id,
                        turn_index = index,
                        speaker = %speaker.id,
                        %reason,
                        consecutive_failures = state.consecutive_failures,
                        "Turn skipped"
                    );
                    if state.consecutive_failures >= self.config.max_consecutive_failures {
                        end_reason = EndReason::Stalled {
                            consecutive_failures: state.consecutive_failures,
                        };
                        break;
                    }
                    continue;
                }
            };
            state.consecutive_failures = 0;

            if !self
                .present(&mut session, &speaker, text, index, kind, &mut state)
                .await
            {
                state.skipped += 1;
                continue;
            }

            let Some(mut latest) = self.history.last(&session.id).await else {
                continue;
            };
            // An addressed question is answered before anything else happens.
            if !self.awaits_answer(&session, &latest)
                && self.closing_due(&session, index, &mut state)
            {
                self.closing_phase(&mut session, index, &mut state).await;
                if let Some(last) = self.history.last(&session.id).await {
                    latest = last;
                }
            }
            if self.awaits_answer(&session, &latest) {
                tracing::debug!(
                    session_id = %session.id,
                    turn_index = index,
                    asker = %latest.speaker_id,
                    "Waiting for the addressed participant"
                );
                continue;
            }

            if let Some(reason) = self.schedule.decide(
                index,
                &latest.text,
                session.all_have_spoken(),
                &mut state.rng,
            ) {
                end_reason = reason;
                break;
            }
        }

        session.end(end_reason.clone());
        let turns = self.history.all(&session.id).await;
        tracing::info!(
            session_id = %session.id,
            destination = %session.destination,
            turns = turns.len(),
            skipped = state.skipped,
            %end_reason,
            "Conversation ended"
        );

        SessionReport {
            participants: session.participant_ids(),
            session_id: session.id,
            destination: session.destination,
            topic: session.topic,
            turns,
            skipped_turns: state.skipped,
            end_reason,
            started_at: session.started_at,
            ended_at: Utc::now(),
        }
    }

    /// Chooses the speaker and renders their instruction for turn `index`.
    async fn plan_turn(
        &self,
        session: &ConversationSession,
        index: usize,
        state: &mut LoopState,
    ) -> Option<(Arc<Persona>, TurnKind, std::result::Result<String, PromptError>)> {
        let latest = self.history.last(&session.id).await;
        let pending = latest.as_ref().and_then(|turn| {
            let detection =
                self.detector
                    .detect(&turn.text, &turn.speaker_id, session.participants());
            detection.is_question.then_some((turn, detection.addressee))
        });

        let (speaker, kind) = match &pending {
            Some((question, addressee)) => (
                self.selector.answerer(
                    session,
                    &question.speaker_id,
                    addressee.as_deref(),
                    &mut state.rng,
                )?,
                TurnKind::Answer,
            ),
            None => (
                self.selector.select(
                    session,
                    state.previous_speaker.as_deref(),
                    &mut state.rng,
                )?,
                TurnKind::Regular,
            ),
        };

        let traits = speaker.traits();
        let prompt = match (&pending, &latest) {
            (Some((question, _)), _) => self.prompts.answer(&traits, &session.topic, question),
            (None, None) => self.prompts.opening(&traits, &session.topic),
            (None, Some(_)) => {
                let recent = self.history.tail(&session.id, self.config.quote_turns).await;
                self.prompts.continuation(&traits, &session.topic, &recent)
            }
        };
        let prompt = match prompt {
            Ok(prompt) => self.frame_for_mentor(&speaker, index, prompt, state),
            Err(err) => Err(err),
        };

        Some((speaker, kind, prompt))
    }

    fn frame_for_mentor(
        &self,
        speaker: &Persona,
        index: usize,
        prompt: String,
        state: &mut LoopState,
    ) -> std::result::Result<String, PromptError> {
        let mentor = &self.config.mentor;
        if mentor.persona_id.as_deref() != Some(speaker.id.as_str()) || index < mentor.min_turn {
            return Ok(prompt);
        }
        if mentor.probability <= 0.0 || !state.rng.gen_bool(mentor.probability) {
            return Ok(prompt);
        }
        match mentor.references.choose(&mut state.rng) {
            Some(reference) => self.prompts.with_mentor_framing(prompt, reference),
            None => Ok(prompt),
        }
    }

    async fn context(&self, session_id: &str) -> String {
        transcript(&self.history.tail(session_id, self.config.context_turns).await)
    }

    /// Asks the generator for an utterance and checks it is usable.
    async fn produce(
        &self,
        speaker: &Persona,
        prompt: std::result::Result<String, PromptError>,
        context: &str,
    ) -> GenerationOutcome {
        let prompt = match prompt {
            Ok(prompt) => prompt,
            Err(err) => return GenerationOutcome::Skipped(SkipReason::Prompt(err)),
        };
        let reply = match self
            .generator
            .generate(&speaker.traits(), &prompt, context)
            .await
        {
            Ok(reply) => reply,
            Err(err) => return GenerationOutcome::Skipped(SkipReason::Failed(err)),
        };

        let reply = reply.trim();
        let chars = reply.chars().count();
        if chars == 0 {
            GenerationOutcome::Skipped(SkipReason::Empty)
        } else if chars < self.config.min_reply_chars {
            GenerationOutcome::Skipped(SkipReason::TooShort { chars })
        } else {
            GenerationOutcome::Usable(reply.to_string())
        }
    }

    /// Bounds, presents and records one utterance. Returns false if the turn
    /// could not be recorded.
    async fn present(
        &self,
        session: &mut ConversationSession,
        speaker: &Persona,
        text: String,
        index: usize,
        kind: TurnKind,
        state: &mut LoopState,
    ) -> bool {
        let text = trim_reply(&text, &self.config.trim, self.config.min_reply_chars).into_text();
        let is_question = self.detector.is_question(&text);
        let turn = Turn::new(speaker, text, index, kind, state.stamp()).with_question(is_question);

        if let Err(err) = session.admit(&turn) {
            tracing::error!(session_id = %session.id, error = %err, "Turn rejected");
            return false;
        }

        match self
            .dispatcher
            .present_as(session.destination, &speaker.identity(), &turn.text)
            .await
        {
            Ok(outcome) => tracing::debug!(
                session_id = %session.id,
                turn_index = index,
                speaker = %speaker.id,
                ?kind,
                ?outcome,
                "Turn presented"
            ),
            Err(err) => tracing::warn!(
                session_id = %session.id,
                turn_index = index,
                speaker = %speaker.id,
                error = %err,
                "Dispatch failed, recording turn anyway"
            ),
        }

        if let Err(err) = self.history.append(&session.id, turn).await {
            tracing::error!(session_id = %session.id, error = %err, "Failed to record turn");
            return false;
        }
        state.previous_speaker = Some(speaker.id.clone());
        true
    }

    fn awaits_answer(&self, session: &ConversationSession, turn: &Turn) -> bool {
        self.detector
            .detect(&turn.text, &turn.speaker_id, session.participants())
            .addressee
            .is_some()
    }

    /// The closing summary is considered once, at the first eligible turn.
    fn closing_due(&self, session: &ConversationSession, index: usize, state: &mut LoopState) -> bool {
        let mentor = &self.config.mentor;
        if state.closing_considered || index < mentor.closing_turn {
            return false;
        }
        let Some(mentor_id) = mentor.persona_id.as_deref() else {
            return false;
        };
        if !session.is_participant(mentor_id) {
            return false;
        }
        state.closing_considered = true;
        mentor.closing_probability > 0.0 && state.rng.gen_bool(mentor.closing_probability)
    }

    /// Mentor summary followed by one reaction from every other participant.
    async fn closing_phase(
        &self,
        session: &mut ConversationSession,
        index: usize,
        state: &mut LoopState,
    ) {
        let Some(mentor) = self
            .config
            .mentor
            .persona_id
            .as_deref()
            .and_then(|id| session.participant(id))
            .cloned()
        else {
            return;
        };
        tracing::info!(session_id = %session.id, turn_index = index, "Closing phase");

        self.pace(state).await;
        let prompt = self.prompts.mentor_summary(&mentor.traits(), &session.topic);
        let context = self.context(&session.id).await;
        let summary = match self.produce(&mentor, prompt, &context).await {
            GenerationOutcome::Usable(text) => text,
            GenerationOutcome::Skipped(reason) => {
                state.skipped += 1;
                tracing::warn!(session_id = %session.id, %reason, "Mentor summary skipped");
                return;
            }
        };
        if !self
            .present(session, &mentor, summary, index, TurnKind::MentorSummary, state)
            .await
        {
            state.skipped += 1;
            return;
        }
        let summary = self
            .history
            .last(&session.id)
            .await
            .map(|turn| turn.text)
            .unwrap_or_default();

        let others: Vec<_> = session
            .participants()
            .iter()
            .filter(|p| p.id != mentor.id)
            .cloned()
            .collect();
        for persona in others {
            self.pace(state).await;
            let prompt =
                self.prompts
                    .closing_reaction(&persona.traits(), &mentor.display_name, &summary);
            let context = self.context(&session.id).await;
            match self.produce(&persona, prompt, &context).await {
                GenerationOutcome::Usable(text) => {
                    if !self
                        .present(session, &persona, text, index, TurnKind::ClosingReaction, state)
                        .await
                    {
                        state.skipped += 1;
                    }
                }
                GenerationOutcome::Skipped(reason) => {
                    state.skipped += 1;
                    tracing::warn!(
                        session_id = %session.id,
                        speaker = %persona.id,
                        %reason,
                        "Closing reaction skipped"
                    );
                }
            }
        }
    }

    fn pace_needed(&self, state: &LoopState) -> bool {
        state.last_timestamp.is_some()
    }

    async fn pace(&self, state: &mut LoopState) {
        let pacing = self.config.pacing;
        if pacing.max_ms == 0 {
            return;
        }
        let millis = state.rng.gen_range(pacing.min_ms..=pacing.max_ms);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
