// Declare submodules
mod classification;
mod common;
mod intelligence;

pub use classification::cluster_classification_prompt;
pub use common::*;
pub use intelligence::{intelligence_report_prompt, repair_prompt};
