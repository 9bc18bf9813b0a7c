/// Prompt builders
///
/// Pure formatting: every Mirror flavour becomes three independent prompts
/// (core, encouraging verse, invitation to growth). The JSON keys named in
/// each prompt are the contract the assembler parses.
use crate::db::{JournalEntry, SpiritualPlace};

/// The three prompts fanned out for one Mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub core: String,
    pub verse: String,
    pub invitation: String,
}

/// Escape a journal body for embedding inside a quoted prompt string
pub fn sanitize_for_prompt(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' | '\r' | '\t' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

fn format_journals(entries: &[JournalEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut block = format!(
                "Journal {} ({})\n",
                i + 1,
                entry.created_at.format("%B %-d, %Y")
            );
            if let Some(prompt) = entry.prompt_text.as_deref().filter(|p| !p.trim().is_empty()) {
                block.push_str(&format!("Prompt: {}\n", prompt.trim()));
            }
            block.push_str(entry.content.trim());
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

const CORE_SHAPE: &str = r#"Respond with a JSON object of exactly this shape:
{
  "themes": {
    "title": "short heading for the themes screen",
    "themes": [
      {"name": "2-4 word theme", "description": "2-3 sentences tying the theme to specific entries", "frequency": "how often it appears"}
    ]
  },
  "parallel_story": {
    "character": "biblical figure",
    "scripture_reference": "book chapter:verse range",
    "story": "3-5 sentences retelling the relevant part of their story",
    "connection": "2-3 sentences on how their journey mirrors the writer's"
  },
  "observations": {
    "title": "short heading for the observations screen",
    "patterns": ["observation about recurring thoughts, emotions or habits"],
    "growth": ["evidence of spiritual growth across the entries"]
  }
}
Use 3 to 5 themes and 2 to 4 items in each observations list."#;

const VERSE_SHAPE: &str = r#"Respond with a JSON object of exactly this shape:
{
  "encouraging_verse": {
    "reference": "book chapter:verse",
    "text": "the verse text",
    "reflection": "2-3 sentences on why this verse speaks to the writer right now"
  }
}"#;

const INVITATION_SHAPE: &str = r#"Respond with a JSON object of exactly this shape:
{
  "invitation_to_growth": {
    "title": "short, warm heading",
    "invitation": "2-3 sentences inviting a next step of faith",
    "practical_steps": ["concrete step the writer could take this week"]
  }
}
Give 2 or 3 practical steps."#;

const TONE: &str = "Write with warmth and humility, in the second person. Do not diagnose, \
lecture, or quote the journals back verbatim. Ground everything in what the writer actually shared.";

/// Prompts for a standard Mirror over a journal backlog
pub fn standard_prompts(entries: &[JournalEntry]) -> PromptSet {
    let journals = format_journals(entries);
    let count = entries.len();

    PromptSet {
        core: format!(
            "Read these {count} journal entries from one person's spiritual journal, oldest first.\n\n\
             {journals}\n\n\
             Identify the recurring spiritual themes, one biblical figure whose story parallels \
             this season of their life, and honest observations about patterns and growth.\n\
             {TONE}\n\n{CORE_SHAPE}"
        ),
        verse: format!(
            "Read these {count} journal entries from one person's spiritual journal.\n\n\
             {journals}\n\n\
             Choose one Bible verse that would encourage this person in what they are walking through.\n\
             {TONE}\n\n{VERSE_SHAPE}"
        ),
        invitation: format!(
            "Read these {count} journal entries from one person's spiritual journal.\n\n\
             {journals}\n\n\
             Offer one gentle invitation to grow in faith, rooted in what they wrote.\n\
             {TONE}\n\n{INVITATION_SHAPE}"
        ),
    }
}

/// Prompts for the onboarding preview over a single journal
pub fn preview_prompts(journal_content: &str) -> PromptSet {
    let journal = journal_content.trim();

    PromptSet {
        core: format!(
            "Read this single journal entry written by someone trying a spiritual journaling app.\n\n\
             {journal}\n\n\
             Identify the spiritual themes it touches, one biblical figure whose story parallels it, \
             and a few honest observations. Keep every field brief.\n\
             {TONE}\n\n{CORE_SHAPE}"
        ),
        verse: format!(
            "Read this journal entry.\n\n{journal}\n\n\
             Choose one Bible verse that would encourage the writer.\n{TONE}\n\n{VERSE_SHAPE}"
        ),
        invitation: format!(
            "Read this journal entry.\n\n{journal}\n\n\
             Offer one gentle invitation to grow in faith.\n{TONE}\n\n{INVITATION_SHAPE}"
        ),
    }
}

/// Prompts for the Day 1 mini-Mirror over the two seed journals
pub fn day1_prompts(
    place: SpiritualPlace,
    first: &JournalEntry,
    second: &JournalEntry,
) -> PromptSet {
    let place = place.label();
    let first = sanitize_for_prompt(first.content.trim());
    let second = sanitize_for_prompt(second.content.trim());
    let context = format!(
        "On their first day, a new user described their spiritual place as \"{place}\" and \
         recorded two short voice journals.\n\
         Journal 1: \"{first}\"\n\
         Journal 2: \"{second}\""
    );

    PromptSet {
        core: format!(
            "{context}\n\n\
             Summarise each journal in one line, then choose one biblical figure whose story parallels \
             where they are.\n{TONE}\n\n\
             Respond with a JSON object of exactly this shape:\n\
             {{\n  \"one_line_summaries\": [\"one sentence for journal 1\", \"one sentence for journal 2\"],\n  \
             \"parallel_story\": {{\n    \"character\": \"biblical figure\",\n    \
             \"scripture_reference\": \"book chapter:verse range\",\n    \
             \"story\": \"2-3 sentences\",\n    \
             \"connection\": \"1-2 sentences\"\n  }}\n}}"
        ),
        verse: format!(
            "{context}\n\nChoose one Bible verse to encourage them as they begin.\n{TONE}\n\n{VERSE_SHAPE}"
        ),
        invitation: format!(
            "{context}\n\nOffer one gentle invitation for their first week of journaling.\n{TONE}\n\n{INVITATION_SHAPE}"
        ),
    }
}

/// Prompt that reduces a free-text focus to a one or two word theme
pub fn focus_theme_prompt(focus_text: &str) -> String {
    format!(
        "A user wrote what they want to focus on in their spiritual life:\n\n\
         \"{}\"\n\n\
         Name the focus as a theme of one or two words, title case, no punctuation \
         (for example \"Patience\" or \"Trusting God\").\n\
         Respond with a JSON object of exactly this shape: {{\"theme\": \"...\"}}",
        sanitize_for_prompt(focus_text.trim())
    )
}
