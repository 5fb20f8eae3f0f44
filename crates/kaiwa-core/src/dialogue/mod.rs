//! Dialogue heuristics module.
//!
//! Pure functions and small traits that shape a conversation without touching
//! I/O: question detection, the end schedule and reply trimming.
//!
//! # Module Structure
//!
//! - `question`: Question and addressee detection (`QuestionDetector`, `LexiconQuestionDetector`)
//! - `termination`: When a conversation should end (`EndSchedule`)
//! - `trim`: Reply length bounding (`trim_reply`)

pub mod question;
pub mod termination;
pub mod trim;

// Re-export public API
pub use question::{LexiconQuestionDetector, QuestionDetection, QuestionDetector};
pub use termination::EndSchedule;
pub use trim::{Trimmed, trim_reply};
