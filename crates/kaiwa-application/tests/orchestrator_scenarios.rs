//! End-to-end conversation runs against stub generators and a recording
//! dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kaiwa_application::{ChannelCoordinator, SessionRequest, TurnOrchestrator};
use kaiwa_core::config::{ChatConfig, EndBand, PacingConfig, TerminationConfig, TurnRange};
use kaiwa_core::persona::{
    Persona, PersonaIdentity, PersonaRegistry, PersonaTraits, get_default_presets,
};
use kaiwa_core::session::{ConversationHistoryStore, DestinationId, EndReason, TurnKind};
use kaiwa_interaction::{
    DispatchError, DispatchOutcome, Dispatcher, GenerationError, ResponseGenerator,
};
use tokio::sync::Mutex;

/// Returns scripted replies in call order, then the fallback.
struct ScriptedGenerator {
    script: Vec<(usize, String)>,
    fallback: String,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn constant(text: &str) -> Self {
        Self {
            script: Vec::new(),
            fallback: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, call: usize, text: &str) -> Self {
        self.script.push((call, text.to_string()));
        self
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        _traits: &PersonaTraits,
        _prompt: &str,
        _context: &str,
    ) -> Result<String, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .iter()
            .find(|(at, _)| *at == call)
            .map(|(_, text)| text.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Replies depend on who is speaking.
struct ByPersonaGenerator {
    replies: Vec<(String, String)>,
    fallback: String,
    delay: Option<Duration>,
}

#[async_trait]
impl ResponseGenerator for ByPersonaGenerator {
    fn name(&self) -> &str {
        "by-persona"
    }

    async fn generate(
        &self,
        traits: &PersonaTraits,
        _prompt: &str,
        _context: &str,
    ) -> Result<String, GenerationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .replies
            .iter()
            .find(|(name, _)| *name == traits.name)
            .map(|(_, text)| text.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    sent: Mutex<Vec<(DestinationId, String, String)>>,
}

impl RecordingDispatcher {
    async fn texts(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(_, id, text)| (id.clone(), text.clone()))
            .collect()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn present_as(
        &self,
        destination: DestinationId,
        identity: &PersonaIdentity,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.sent
            .lock()
            .await
            .push((destination, identity.persona_id.clone(), text.to_string()));
        Ok(DispatchOutcome::AsPersona)
    }
}

fn persona(id: &str, name: &str) -> Arc<Persona> {
    Arc::new(Persona {
        id: id.to_string(),
        name: name.to_string(),
        display_name: name.to_string(),
        aliases: Vec::new(),
        avatar_url: None,
        personality: "friendly".to_string(),
        speaking_style: "casual".to_string(),
        interests: vec!["coffee".to_string()],
        active: true,
    })
}

fn presets(ids: &[&str]) -> Vec<Arc<Persona>> {
    get_default_presets()
        .into_iter()
        .filter(|p| ids.contains(&p.id.as_str()))
        .map(Arc::new)
        .collect()
}

fn config(turns: usize) -> ChatConfig {
    ChatConfig {
        turns: TurnRange {
            min: turns,
            max: turns,
        },
        pacing: PacingConfig::none(),
        ..ChatConfig::default()
    }
}

fn orchestrator(
    generator: impl ResponseGenerator + 'static,
    dispatcher: Arc<RecordingDispatcher>,
    config: ChatConfig,
    seed: u64,
) -> TurnOrchestrator {
    TurnOrchestrator::new(
        Arc::new(generator),
        dispatcher,
        Arc::new(ConversationHistoryStore::new()),
        config,
    )
    .unwrap()
    .with_seed(seed)
}

#[tokio::test]
async fn short_conversation_stops_at_the_turn_cap() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant("Nice!I think so too."),
        dispatcher.clone(),
        config(3),
        42,
    );

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(100),
            participants: vec![persona("alice", "Alice"), persona("bob", "Bob")],
            topic: "coffee".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::TurnCap);
    assert_eq!(report.turns.len(), 3);
    assert_eq!(report.skipped_turns, 0);
    let speakers: Vec<_> = report.turns.iter().map(|t| t.speaker_id.as_str()).collect();
    assert_ne!(speakers[0], speakers[1]);
    assert_ne!(speakers[1], speakers[2]);
    assert!(report.turns.iter().all(|t| t.text == "Nice!I think so too."));
    assert_eq!(dispatcher.sent.lock().await.len(), 3);
}

#[tokio::test]
async fn empty_reply_is_skipped_and_the_loop_continues() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant("そうですね、面白いです。").with(1, ""),
        dispatcher.clone(),
        config(4),
        7,
    );

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(100),
            participants: vec![persona("alice", "Alice"), persona("bob", "Bob")],
            topic: "coffee".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::TurnCap);
    assert_eq!(report.skipped_turns, 1);
    assert_eq!(report.turns.len(), 3);
    let indices: Vec<_> = report.turns.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 2, 3]);
    assert_eq!(dispatcher.sent.lock().await.len(), 3);
}

#[tokio::test]
async fn single_participant_is_refused_without_turns() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant("hello"),
        dispatcher.clone(),
        config(3),
        1,
    );

    let err = orchestrator
        .start(SessionRequest {
            destination: DestinationId(100),
            participants: vec![persona("alice", "Alice")],
            topic: "coffee".to_string(),
        })
        .await
        .unwrap_err();

    assert!(err.is_refused_start());
    assert!(matches!(
        err,
        kaiwa_core::KaiwaError::InsufficientParticipants {
            required: 2,
            provided: 1
        }
    ));
    assert!(dispatcher.sent.lock().await.is_empty());
}

#[tokio::test]
async fn closing_phrase_ends_the_conversation_immediately() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant("なるほど、勉強になります。").with(10, "また今度！"),
        dispatcher.clone(),
        config(20),
        3,
    );

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(100),
            participants: presets(&["ai_takahashi", "ai_sato", "ai_suzuki"]),
            topic: "趣味について".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::ClosingKeyword { turn_index: 10 });
    assert_eq!(report.turns.len(), 11);
    assert_eq!(report.turns.last().unwrap().text, "また今度！");
}

#[tokio::test]
async fn closing_phrase_before_the_minimum_turn_is_ignored() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant("なるほど、勉強になります。").with(3, "またね！"),
        dispatcher,
        config(6),
        3,
    );

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(100),
            participants: presets(&["ai_takahashi", "ai_sato"]),
            topic: "趣味について".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::TurnCap);
    assert_eq!(report.turns.len(), 6);
}

#[tokio::test]
async fn chance_ending_waits_until_everyone_has_spoken() {
    let mut config = config(10);
    config.termination = TerminationConfig {
        min_turn: 0,
        bands: vec![EndBand {
            min_turn: 0,
            probability: 1.0,
        }],
        ..TerminationConfig::default()
    };

    for seed in 0..20 {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let orchestrator = orchestrator(
            ScriptedGenerator::constant("いいですね。"),
            dispatcher,
            config.clone(),
            seed,
        );
        let report = orchestrator
            .start(SessionRequest {
                destination: DestinationId(1),
                participants: presets(&["ai_takahashi", "ai_sato", "ai_suzuki"]),
                topic: "音楽".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            report.end_reason,
            EndReason::Probability {
                turn_index: 2,
                probability: 1.0
            }
        );
        let mut speakers: Vec<_> = report.turns.iter().map(|t| t.speaker_id.clone()).collect();
        speakers.sort();
        speakers.dedup();
        assert_eq!(speakers.len(), 3, "seed {seed}");
    }
}

#[tokio::test]
async fn history_matches_presentation_order() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant("いい天気ですね。散歩日和です。"),
        dispatcher.clone(),
        config(12),
        11,
    );

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(9),
            participants: presets(&["ai_takahashi", "ai_sato", "ai_suzuki"]),
            topic: "今日の天気について".to_string(),
        })
        .await
        .unwrap();

    for pair in report.turns.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
        assert!(pair[0].index < pair[1].index);
    }
    let recorded: Vec<_> = report
        .turns
        .iter()
        .map(|t| (t.speaker_id.clone(), t.text.clone()))
        .collect();
    assert_eq!(dispatcher.texts().await, recorded);
    assert_eq!(
        orchestrator.history().all(&report.session_id).await,
        report.turns
    );
}

#[tokio::test]
async fn long_replies_are_bounded() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant(&"あ".repeat(300))
            .with(1, &format!("{}。{}", "い".repeat(60), "う".repeat(200))),
        dispatcher,
        config(4),
        5,
    );

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(9),
            participants: presets(&["ai_takahashi", "ai_sato"]),
            topic: "本".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.turns.len(), 4);
    for turn in &report.turns {
        assert!(turn.text.chars().count() <= 120);
    }
    assert!(report.turns[0].text.ends_with("..."));
    assert_eq!(report.turns[1].text, format!("{}。", "い".repeat(60)));
}

#[tokio::test]
async fn addressed_question_is_answered_by_the_named_persona() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let generator = ByPersonaGenerator {
        replies: vec![(
            "高橋誠".to_string(),
            "鈴木さんはどう思いますか？".to_string(),
        )],
        fallback: "なるほど、面白いですね。".to_string(),
        delay: None,
    };
    let orchestrator = orchestrator(generator, dispatcher, config(8), 21);

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(2),
            participants: presets(&["ai_takahashi", "ai_sato", "ai_suzuki"]),
            topic: "おすすめの本について".to_string(),
        })
        .await
        .unwrap();

    let mut questions = 0;
    for pair in report.turns.windows(2) {
        if pair[0].is_question {
            questions += 1;
            assert_eq!(pair[0].speaker_id, "ai_takahashi");
            assert_eq!(pair[1].speaker_id, "ai_suzuki");
            assert_eq!(pair[1].kind, TurnKind::Answer);
            assert!(pair[1].answers_question);
        }
    }
    assert!(questions >= 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_start_in_one_channel_is_refused() {
    let generator = ByPersonaGenerator {
        replies: Vec::new(),
        fallback: "楽しいですね。".to_string(),
        delay: Some(Duration::from_secs(1)),
    };
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = Arc::new(orchestrator(generator, dispatcher.clone(), config(4), 8));
    let registry = Arc::new(PersonaRegistry::new(get_default_presets()));
    let coordinator = ChannelCoordinator::new(orchestrator.clone(), registry);
    let dest = DestinationId(77);

    let (first, second) = tokio::join!(
        coordinator.start_session(dest, presets(&["ai_takahashi", "ai_sato"]), "映画"),
        coordinator.start_session(dest, presets(&["ai_suzuki", "ai_sato"]), "音楽"),
    );

    let first = first.unwrap();
    let err = second.unwrap_err();
    assert!(matches!(
        err,
        kaiwa_core::KaiwaError::SessionInProgress { destination: 77 }
    ));
    assert_eq!(first.turns.len(), 4);
    assert!(
        dispatcher
            .sent
            .lock()
            .await
            .iter()
            .all(|(_, id, _)| id == "ai_takahashi" || id == "ai_sato")
    );
    assert!(!coordinator.is_busy(dest));
    assert_eq!(coordinator.last_activity(dest), Some(first.ended_at));

    // A later session replaces the earlier history.
    let next = coordinator
        .start_session(dest, presets(&["ai_suzuki", "ai_sato"]), "音楽")
        .await
        .unwrap();
    assert_eq!(orchestrator.history().len(&first.session_id).await, 0);
    assert_eq!(orchestrator.history().len(&next.session_id).await, 4);
}

#[tokio::test(start_paused = true)]
async fn different_channels_run_side_by_side() {
    let generator = ByPersonaGenerator {
        replies: Vec::new(),
        fallback: "楽しいですね。".to_string(),
        delay: Some(Duration::from_secs(1)),
    };
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = Arc::new(orchestrator(generator, dispatcher.clone(), config(3), 8));
    let registry = Arc::new(PersonaRegistry::new(get_default_presets()));
    let coordinator = ChannelCoordinator::new(orchestrator, registry);

    let (a, b) = tokio::join!(
        coordinator.start_session(DestinationId(1), presets(&["ai_takahashi", "ai_sato"]), "映画"),
        coordinator.start_session(DestinationId(2), presets(&["ai_suzuki", "ai_sato"]), "音楽"),
    );
    assert_eq!(a.unwrap().turns.len(), 3);
    assert_eq!(b.unwrap().turns.len(), 3);

    let sent = dispatcher.sent.lock().await;
    assert_eq!(sent.iter().filter(|(d, _, _)| *d == DestinationId(1)).count(), 3);
    assert_eq!(sent.iter().filter(|(d, _, _)| *d == DestinationId(2)).count(), 3);
}

#[tokio::test]
async fn random_session_uses_registry_personas() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = Arc::new(orchestrator(
        ScriptedGenerator::constant("いいですね。"),
        dispatcher,
        config(3),
        2,
    ));
    let registry = Arc::new(PersonaRegistry::new(get_default_presets()));
    let coordinator = ChannelCoordinator::new(orchestrator, registry.clone());

    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(4);
    let report = coordinator
        .start_random_session(DestinationId(5), &mut rng)
        .await
        .unwrap();

    assert!((2..=3).contains(&report.participants.len()));
    assert!(report.participants.iter().all(|id| registry.get(id).is_some()));
    assert!(!report.topic.is_empty());
}

#[tokio::test]
async fn mentor_summary_is_followed_by_every_other_participant() {
    let mut config = config(4);
    config.mentor.closing_turn = 2;
    config.mentor.closing_probability = 1.0;
    config.mentor.probability = 0.0;

    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(
        ScriptedGenerator::constant("いいですね。"),
        dispatcher,
        config,
        13,
    );
    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(4),
            participants: presets(&["ai_yamada", "ai_sato", "ai_suzuki"]),
            topic: "起業のアイデアについて".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::TurnCap);
    assert_eq!(report.turns.len(), 7);
    let summary_at = report
        .turns
        .iter()
        .position(|t| t.kind == TurnKind::MentorSummary)
        .unwrap();
    assert_eq!(report.turns[summary_at].speaker_id, "ai_yamada");
    assert_eq!(report.turns[summary_at].index, 2);
    let mut reactors: Vec<_> = report.turns[summary_at + 1..summary_at + 3]
        .iter()
        .map(|t| {
            assert_eq!(t.kind, TurnKind::ClosingReaction);
            t.speaker_id.clone()
        })
        .collect();
    reactors.sort();
    assert_eq!(reactors, vec!["ai_sato", "ai_suzuki"]);
    assert_eq!(
        report
            .turns
            .iter()
            .filter(|t| t.kind == TurnKind::MentorSummary)
            .count(),
        1
    );
}

struct FailingGenerator;

#[async_trait]
impl ResponseGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        _traits: &PersonaTraits,
        _prompt: &str,
        _context: &str,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Timeout(Duration::from_secs(30)))
    }
}

#[tokio::test]
async fn repeated_failures_stall_the_conversation() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = orchestrator(FailingGenerator, dispatcher.clone(), config(10), 0);

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(4),
            participants: presets(&["ai_takahashi", "ai_sato"]),
            topic: "音楽".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        report.end_reason,
        EndReason::Stalled {
            consecutive_failures: 3
        }
    );
    assert!(report.turns.is_empty());
    assert_eq!(report.skipped_turns, 3);
    assert!(dispatcher.sent.lock().await.is_empty());
}

#[tokio::test]
async fn refused_start_keeps_the_previous_history() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = Arc::new(orchestrator(
        ScriptedGenerator::constant("いいですね。"),
        dispatcher,
        config(3),
        6,
    ));
    let registry = Arc::new(PersonaRegistry::new(get_default_presets()));
    let coordinator = ChannelCoordinator::new(orchestrator.clone(), registry);
    let dest = DestinationId(31);

    let earlier = coordinator
        .start_session(dest, presets(&["ai_takahashi", "ai_sato"]), "映画")
        .await
        .unwrap();
    assert_eq!(orchestrator.history().len(&earlier.session_id).await, 3);

    let err = coordinator
        .start_session(dest, presets(&["ai_suzuki"]), "音楽")
        .await
        .unwrap_err();
    assert!(err.is_refused_start());
    assert_eq!(orchestrator.history().len(&earlier.session_id).await, 3);
    assert_eq!(
        coordinator.last_session_id(dest).as_deref(),
        Some(earlier.session_id.as_str())
    );
    assert!(!coordinator.is_busy(dest));
}

#[tokio::test(start_paused = true)]
async fn cancelled_session_history_is_cleared_by_the_next_start() {
    let generator = ByPersonaGenerator {
        replies: Vec::new(),
        fallback: "楽しいですね。".to_string(),
        delay: Some(Duration::from_secs(1)),
    };
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let orchestrator = Arc::new(orchestrator(generator, dispatcher, config(6), 12));
    let registry = Arc::new(PersonaRegistry::new(get_default_presets()));
    let coordinator = ChannelCoordinator::new(orchestrator.clone(), registry);
    let dest = DestinationId(32);

    let cut_short = tokio::time::timeout(
        Duration::from_millis(2500),
        coordinator.start_session(dest, presets(&["ai_takahashi", "ai_sato"]), "映画"),
    )
    .await;
    assert!(cut_short.is_err());
    assert!(!coordinator.is_busy(dest));
    let cancelled = coordinator.last_session_id(dest).unwrap();
    assert_eq!(orchestrator.history().len(&cancelled).await, 2);

    let next = coordinator
        .start_session(dest, presets(&["ai_suzuki", "ai_sato"]), "音楽")
        .await
        .unwrap();
    assert_eq!(orchestrator.history().len(&cancelled).await, 0);
    assert_eq!(coordinator.last_session_id(dest), Some(next.session_id));
}

#[tokio::test]
async fn closing_phase_waits_for_the_addressed_answer() {
    let mut config = config(6);
    config.mentor.closing_turn = 0;
    config.mentor.closing_probability = 1.0;
    config.mentor.probability = 0.0;

    for seed in 0..10 {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let generator = ByPersonaGenerator {
            replies: vec![(
                "高橋誠".to_string(),
                "鈴木さんはどう思いますか？".to_string(),
            )],
            fallback: "なるほど、面白いですね。".to_string(),
            delay: None,
        };
        let orchestrator = orchestrator(generator, dispatcher, config.clone(), seed);
        let report = orchestrator
            .start(SessionRequest {
                destination: DestinationId(6),
                participants: presets(&["ai_takahashi", "ai_suzuki", "ai_yamada"]),
                topic: "旅行".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            report
                .turns
                .iter()
                .filter(|t| t.kind == TurnKind::MentorSummary)
                .count(),
            1,
            "seed {seed}"
        );
        for pair in report.turns.windows(2) {
            if pair[0].speaker_id == "ai_takahashi" {
                assert_eq!(pair[1].speaker_id, "ai_suzuki", "seed {seed}");
                assert_ne!(pair[1].kind, TurnKind::MentorSummary, "seed {seed}");
            }
        }
    }
}

/// Remembers when each generation was requested.
struct TimedGenerator {
    requested_at: Mutex<Vec<tokio::time::Instant>>,
}

#[async_trait]
impl ResponseGenerator for TimedGenerator {
    fn name(&self) -> &str {
        "timed"
    }

    async fn generate(
        &self,
        _traits: &PersonaTraits,
        _prompt: &str,
        _context: &str,
    ) -> Result<String, GenerationError> {
        self.requested_at.lock().await.push(tokio::time::Instant::now());
        Ok("いいですね。".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn turns_are_paced_apart() {
    let mut config = config(4);
    config.pacing = PacingConfig {
        min_ms: 1000,
        max_ms: 1500,
    };
    let generator = Arc::new(TimedGenerator {
        requested_at: Mutex::new(Vec::new()),
    });
    let orchestrator = TurnOrchestrator::new(
        generator.clone(),
        Arc::new(RecordingDispatcher::default()),
        Arc::new(ConversationHistoryStore::new()),
        config,
    )
    .unwrap()
    .with_seed(9);

    let started = tokio::time::Instant::now();
    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(3),
            participants: presets(&["ai_takahashi", "ai_sato"]),
            topic: "散歩".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.turns.len(), 4);
    let requested = generator.requested_at.lock().await.clone();
    assert_eq!(requested.len(), 4);
    assert_eq!(requested[0], started);
    for pair in requested.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_millis(1000), "gap {gap:?}");
        assert!(gap <= Duration::from_millis(1500), "gap {gap:?}");
    }
    assert!(started.elapsed() >= Duration::from_millis(3000));
}

/// Every presentation attempt fails.
#[derive(Default)]
struct UnreachableDispatcher {
    attempts: AtomicUsize,
}

#[async_trait]
impl Dispatcher for UnreachableDispatcher {
    async fn present_as(
        &self,
        destination: DestinationId,
        _identity: &PersonaIdentity,
        _text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DispatchError::Send {
            destination,
            message: "channel unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn failed_dispatch_still_records_the_turn() {
    let dispatcher = Arc::new(UnreachableDispatcher::default());
    let history = Arc::new(ConversationHistoryStore::new());
    let orchestrator = TurnOrchestrator::new(
        Arc::new(ScriptedGenerator::constant("そうですね、面白いです。")),
        dispatcher.clone(),
        history.clone(),
        config(5),
    )
    .unwrap()
    .with_seed(17);

    let report = orchestrator
        .start(SessionRequest {
            destination: DestinationId(8),
            participants: presets(&["ai_takahashi", "ai_sato", "ai_suzuki"]),
            topic: "料理".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(report.end_reason, EndReason::TurnCap);
    assert_eq!(report.turns.len(), 5);
    assert_eq!(report.skipped_turns, 0);
    assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 5);
    assert_eq!(history.len(&report.session_id).await, 5);
    let indices: Vec<_> = report.turns.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}
