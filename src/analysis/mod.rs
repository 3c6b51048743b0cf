pub mod analyzer;
pub mod context;
pub mod status;

pub use analyzer::IntelligenceAnalyzer;
pub use context::{build_context, SynthesisContext};
pub use status::infer_story_status;
