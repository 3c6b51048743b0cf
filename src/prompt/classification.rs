use crate::dataset::Article;
use crate::prompt::common::{DONT_TELL_ME, JSON_ONLY};

/// Generate a prompt asking whether a cluster of headlines describes a coherent news story.
pub fn cluster_classification_prompt(articles: &[&Article]) -> String {
    let headlines = articles
        .iter()
        .map(|a| {
            format!(
                "- [{}] {} ({}, {})",
                a.id,
                a.title,
                a.source_host(),
                a.publish_date.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"## HEADLINES (ONE AUTOMATICALLY BUILT CLUSTER):
----------
{headlines}
----------

TASK: Decide whether these headlines describe a coherent news story.

* **hasStory:** false when the headlines share only vague vocabulary or a broad subject area and no concrete event ties them together.
* **storyType:** SINGLE_STORY when all headlines cover one event; COLLECTION_OF_STORIES when they cover several distinguishable events on one topic.
* **title:** A neutral, specific headline for the story (max 12 words). Empty when hasStory is false.
* **importance:** 1-10. 10 means major international consequence; 1 means trivial or purely local interest.
* **reason:** One sentence explaining the decision.

RETURN FORMAT (JSON):
{{
  "hasStory": true,
  "storyType": "SINGLE_STORY|COLLECTION_OF_STORIES",
  "title": "Headline",
  "importance": 5,
  "reason": "One sentence."
}}
{json_only}
{dont_tell_me}"#,
        headlines = headlines,
        json_only = JSON_ONLY,
        dont_tell_me = DONT_TELL_ME,
    )
}
