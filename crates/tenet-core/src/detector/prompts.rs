//! Prompt templates for contradiction detection.

use crate::types::{ContradictionContext, ExistingItemForCheck};

/// Rules shared by the single and batched prompts.
const STATE_CHANGE_RULES: &str = r#"## What counts as a state change (the existing fact must be REPLACED)
- "is single" -> "is dating someone" (relationship status changed)
- "owes X" -> "paid off X" (the debt no longer exists)
- "is unemployed" -> "works as Y" (employment changed)
- "lives in Lisbon" -> "lives in Porto" (residence changed)
- "weighs 80kg" -> "weighs 75kg" (current value differs)
- "earns 5000 a month" -> "earns 8000 a month" (value updated)
- "dislikes coffee" -> "loves coffee" (preference changed)

## What does NOT count (both facts stay true)
- "lives alone" + "works from home" (different topics)
- "started a Python course" + "finished a Python course" (events in time)
- "likes coffee" + "prefers espresso" (added detail, not a replacement)
- "was born in Lisbon" + "lives in Porto" (complementary facts)

## Golden rule
Ask: "Does the existing fact still describe the user's CURRENT state?"
- If NO, it is a state change (isContradiction: true)
- If YES, both coexist (isContradiction: false)"#;

/// System prompt for comparing one existing fact.
pub fn contradiction_system_prompt() -> String {
    format!(
        r#"You are a detector of state changes in personal facts.
Decide whether a NEW fact makes an EXISTING fact obsolete for the user's current state.

{}

Respond ONLY with valid JSON, no additional text:
{{
  "isContradiction": boolean,
  "confidence": number between 0.0 and 1.0,
  "explanation": "short explanation"
}}"#,
        STATE_CHANGE_RULES
    )
}

/// System prompt for comparing many existing facts in one call.
pub fn batch_contradiction_system_prompt() -> String {
    format!(
        r#"You are a detector of state changes in personal facts.
For EACH existing fact, decide whether the NEW fact makes it obsolete for the user's current state.

{}

Respond ONLY with a valid JSON array, no additional text, one entry per existing fact:
[
  {{
    "itemId": "id of the existing fact",
    "isContradiction": boolean,
    "confidence": number between 0.0 and 1.0,
    "explanation": "short explanation"
  }}
]"#,
        STATE_CHANGE_RULES
    )
}

fn context_block(context: &ContradictionContext) -> String {
    format!(
        "## Context\n- Knowledge type: {}\n- Life area: {}",
        context.kind.label(),
        context.area_label()
    )
}

/// Build the user message for a single comparison.
pub fn build_check_message(
    new_content: &str,
    existing_content: &str,
    context: &ContradictionContext,
) -> String {
    format!(
        "{}\n\n## Existing fact (recorded earlier)\n\"{}\"\n\n## New fact (just reported)\n\"{}\"",
        context_block(context),
        existing_content,
        new_content
    )
}

/// Build the user message for a batched comparison.
pub fn build_batch_message(
    new_content: &str,
    existing: &[ExistingItemForCheck],
    context: &ContradictionContext,
) -> String {
    let items = existing
        .iter()
        .enumerate()
        .map(|(index, item)| {
            format!("{}. ID: \"{}\" - \"{}\"", index + 1, item.id, item.display_text())
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\n## New fact to be added\n\"{}\"\n\n## Existing facts to compare\n{}",
        context_block(context),
        new_content,
        items
    )
}
