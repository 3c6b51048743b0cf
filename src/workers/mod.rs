pub mod batch;
pub mod retry;

pub use batch::StoryBatchOrchestrator;
pub use retry::{backoff_delay, wait_for_cancel};

pub const TARGET_BATCH: &str = "story_batch";
