//! Locate the keyword section in a reading note

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

static LABEL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static BLOCK_RE: OnceLock<Option<Regex>> = OnceLock::new();
static TAG_RE: OnceLock<Option<Regex>> = OnceLock::new();
static FIELD_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, pattern, "failed to compile note regex");
            None
        }
    })
    .as_ref()
}

/// A line that opens the keyword section; group 1 holds the rest of the line
fn label_re() -> Option<&'static Regex> {
    compiled(
        &LABEL_RE,
        r"(?i)^[\s#>*\-]*(?:论文关键词|关键词|论文分类|keywords\s*[–-]\s*tags|keywords|tags)[\s*]*(?:[:：][\s*]*(.*))?$",
    )
}

/// Another `Label:` line, which ends a multi-line section
fn field_re() -> Option<&'static Regex> {
    compiled(&FIELD_RE, r"^[#*\s]*[^,，;；、:：]{1,30}[:：]")
}

fn block_re() -> Option<&'static Regex> {
    compiled(&BLOCK_RE, r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr)>")
}

fn tag_re() -> Option<&'static Regex> {
    compiled(&TAG_RE, r"<[^>]*>")
}

/// Convert note HTML into plain text lines
pub fn note_text(note_html: &str) -> String {
    let with_breaks = match block_re() {
        Some(re) => re.replace_all(note_html, "\n").into_owned(),
        None => note_html.to_string(),
    };
    let without_tags = match tag_re() {
        Some(re) => re.replace_all(&with_breaks, "").into_owned(),
        None => with_breaks,
    };
    without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Summary headings, markdown headings and `Label:` lines
fn is_boundary(line: &str) -> bool {
    let lower = line.to_lowercase();
    let heading = lower.trim_start_matches(['#', '*', ' ']);
    ["summary", "abstract", "摘要", "总结"]
        .iter()
        .any(|h| heading.starts_with(h))
        || line.starts_with('#')
        || field_re().is_some_and(|re| re.is_match(line))
}

/// Raw keyword text following the first keyword label in a note.
///
/// Accepts English and Chinese labels with an ASCII or full-width colon. The
/// section is the rest of the label line plus following lines, up to a blank
/// line, a heading or another `Label:` line. Returns `None` when the note has
/// no keyword label or the section is empty.
pub fn extract_keyword_section(note_html: &str) -> Option<String> {
    let label = label_re()?;
    let text = note_text(note_html);
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let (start, first) = lines.iter().enumerate().find_map(|(i, line)| {
        label
            .captures(line)
            .map(|caps| (i, caps.get(1).map_or("", |m| m.as_str()).trim()))
    })?;

    let mut collected: Vec<&str> = Vec::new();
    if !first.is_empty() {
        collected.push(first);
    }

    for line in &lines[start + 1..] {
        if line.is_empty() {
            if collected.is_empty() {
                continue;
            }
            break;
        }
        if is_boundary(line) {
            break;
        }
        // A capitalized line starts a new paragraph once the section has text
        if !collected.is_empty() && line.starts_with(|c: char| c.is_ascii_uppercase()) {
            break;
        }
        collected.push(line);
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}
