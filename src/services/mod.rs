//! Async services tying the engines to storage

pub mod coaching;
pub mod progression;

pub use coaching::{CoachingService, SetPrescription};
pub use progression::ProgressionService;
