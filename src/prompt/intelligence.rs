use chrono::{DateTime, Utc};

use crate::clustering::types::{Story, StoryType};
use crate::prompt::common::{reference_context, DONT_TELL_ME, JSON_ONLY, WRITE_IN_CLEAR_ENGLISH};
use crate::util::truncate_graphemes;
use crate::validation::Violation;

/// Largest slice of a rejected response echoed back in a repair prompt.
const MAX_ECHOED_RESPONSE_CHARS: usize = 6_000;

/// Generate the prompt that turns a story's articles into an intelligence report.
pub fn intelligence_report_prompt(
    story: &Story,
    context: &str,
    reference_date: Option<DateTime<Utc>>,
    schema: &str,
) -> String {
    let story_shape = match story.story_type {
        StoryType::SingleStory => "a single news event",
        StoryType::CollectionOfStories => {
            "several related events sharing one topic; cover each distinguishable event in the timeline"
        }
    };

    format!(
        r#"{reference}

## STORY
Working title: {title}
Shape: {shape}
Cluster importance (1-10): {importance}

## ARTICLES
----------
{context}
----------

TASK: Write a structured intelligence report on this story using ONLY the articles above.

GUIDELINES:
* **executiveSummary:** What happened, who is involved, and why it matters. Synthesize across sources; do not summarize articles one by one.
* **timeline:** Dated events in chronological order. Use the date the event happened, not the publication date, when the articles state it.
* **storyStatus:** DEVELOPING while facts are still emerging, ESCALATING when the latest events are more serious than earlier ones, DE_ESCALATING when they are less serious, CONCLUDING when the story is resolving, STATIC when nothing has changed across the articles.
* **significance:** How much this matters beyond the people directly involved. Explain the level in one or two sentences.
* **entities:** Key people, organizations and places with the role each plays and the positions each has taken.
* **sources:** One entry per publication, citing the article IDs from the headers. Grade reliability on sourcing and corroboration, not on reputation alone, and describe any detectable bias.
* **factualBasis:** Facts that at least one article reports with attribution and no other article disputes.
* **informationGaps:** Questions a careful reader would still have.
* **claims:** Every specific, checkable assertion that a named source makes, tagged with a short issue label. Claims from different sources about the same question MUST share the same issue label.

## RESPONSE SCHEMA
{schema}
{json_only}
{clear_english}
{dont_tell_me}"#,
        reference = reference_context(reference_date),
        title = story.title,
        shape = story_shape,
        importance = story.importance,
        context = context,
        schema = schema,
        json_only = JSON_ONLY,
        clear_english = WRITE_IN_CLEAR_ENGLISH,
        dont_tell_me = DONT_TELL_ME,
    )
}

/// Generate the single follow-up prompt sent when a report response fails validation.
pub fn repair_prompt(original_prompt: &str, response: &str, violations: &[Violation]) -> String {
    let (echoed, truncated) = truncate_graphemes(response, MAX_ECHOED_RESPONSE_CHARS);
    let problems = violations
        .iter()
        .map(|v| format!("- {}", v))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{original}

## YOUR PREVIOUS RESPONSE{note}
----------
{echoed}
----------

## PROBLEMS FOUND
{problems}

Return the corrected report as a single JSON object that fixes every problem listed above. Keep everything that was already correct.
{json_only}"#,
        original = original_prompt,
        note = if truncated { " (truncated)" } else { "" },
        echoed = echoed,
        problems = problems,
        json_only = JSON_ONLY,
    )
}
