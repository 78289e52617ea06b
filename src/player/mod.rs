pub mod checks;
pub mod queue;
pub mod service;

pub use queue::{QueueManager, QueueSnapshot, StatusNotifier, StatusTarget, TrackEndOutcome};
pub use service::{PlayerService, VoiceContext};
