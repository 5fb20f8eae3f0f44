//! Application layer for kaiwa.
//!
//! Runs conversations: the turn orchestrator, the per-channel coordinator,
//! the spontaneous-chat scheduler and persona replies to users.

pub mod coordinator;
pub mod mention;
pub mod orchestrator;
pub mod reply;
pub mod scheduler;
pub mod speaker;
pub mod topics;

pub use coordinator::ChannelCoordinator;
pub use mention::MentionTracker;
pub use orchestrator::{
    GenerationOutcome, SessionReport, SessionRequest, SkipReason, TurnOrchestrator,
};
pub use reply::{ReplyResponder, UserReply, strip_mentions};
pub use scheduler::{SpontaneousChatScheduler, is_due};
pub use speaker::SpeakerSelector;
pub use topics::TopicCatalogue;
