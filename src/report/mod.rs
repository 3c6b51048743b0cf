pub mod aggregator;
pub mod contradictions;
pub mod parser;
pub mod schema;
pub mod story_id;
pub mod types;

pub use aggregator::{aggregate, StoryOutcome};
pub use contradictions::{detect_contradictions, issue_key, merge_contradictions};
pub use parser::{parse_report_response, ParsedResponse, ReportDraft};
pub use story_id::{assign_story_ids, slugify};
pub use types::*;

pub const TARGET_REPORT: &str = "report_analysis";
