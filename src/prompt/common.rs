use chrono::{DateTime, Utc};

// Common text blocks for all prompts
pub const DONT_TELL_ME: &str = r#"
Important instructions for your responses:

1. Do not narrate or describe your actions.
2. Do not summarize or restate the instructions I've given you.
3. Do not preface your response with phrases like "Here's the analysis..." or "I will now..."
4. Do not acknowledge or confirm that you understand these instructions.
5. Avoid phrases like "As an AI language model..." or similar self-referential statements.
"#;

pub const JSON_ONLY: &str = r#"
Output rules:
1. Respond with a single JSON object and nothing else.
2. Do not wrap the JSON in Markdown code fences.
3. Use exactly the field names given. Enumerated values must be spelled exactly as listed.
4. Never invent article IDs; only use IDs that appear in the article headers.
"#;

pub const WRITE_IN_CLEAR_ENGLISH: &str = r#"
Language standards for output:
1. Write all text values in clear American English.
2. For non-English quotes, give the original followed by a translation in parentheses.
3. Do not translate names of people or organizations.
"#;

/// Dates the prompt against the newest article instead of today, so the same
/// articles always produce the same prompt.
pub fn reference_context(reference_date: Option<DateTime<Utc>>) -> String {
    match reference_date {
        Some(date) => format!(
            "Reference date (newest article in this set): {}\nTreat anything after this date as unknown.",
            date.format("%B %-d, %Y")
        ),
        None => "Reference date: unknown".to_string(),
    }
}
