//! Compact classification prompt

use std::fmt::Write as _;

use super::ClassificationBatch;

const MAX_TITLE_CHARS: usize = 80;
const MAX_KEYWORD_CHARS: usize = 100;

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Field separators would break the `ID|Title|Keywords` rows
fn clean_field(text: &str) -> String {
    text.replace(['|', '\n', '\r'], " ").trim().to_string()
}

/// Prompt listing the taxonomy and one `ID|Title|Keywords` row per paper.
///
/// IDs are in-batch indices, which is what the model must key its answer by.
pub fn build_prompt(batch: &ClassificationBatch, taxonomy: &[String]) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Preferred collection taxonomy:");
    for path in taxonomy {
        let _ = writeln!(prompt, "- {}", path);
    }
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Rules:");
    let _ = writeln!(prompt, "- Use exact paths such as \"Parent/Child\"");
    let _ = writeln!(prompt, "- Match each paper to the most specific subcategory");
    let _ = writeln!(prompt, "- Return \"Unclassified\" if unsure");
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "TASK: Classify papers given as \"ID|Title|Keywords\". \
         Return JSON: {{\"0\": \"Path/Subpath\", \"1\": \"Path/Subpath\", ...}}"
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Papers:");
    for (id, paper) in batch.papers.iter().enumerate() {
        let title = clean_field(paper.title());
        let keywords = clean_field(&paper.keywords.join("; "));
        let _ = writeln!(
            prompt,
            "{}|{}|{}",
            id,
            truncate_chars(&title, MAX_TITLE_CHARS),
            truncate_chars(&keywords, MAX_KEYWORD_CHARS)
        );
    }
    let _ = writeln!(prompt);
    prompt.push_str("JSON:");
    prompt
}
