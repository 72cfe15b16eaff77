//! Markdown snippets for console output

use std::fmt::Display;

/// Markdown table with title-cased headers
///
/// # Examples
///
/// ```
/// use api_gate::markdown::table;
///
/// let md = table(&[vec!["alpha", "1"]], &["name", "item count"]);
/// assert!(md.contains("| Name | Item Count |"));
/// assert!(md.contains("| alpha | 1 |"));
/// ```
pub fn table<R, C, H>(rows: &[R], headers: &[H]) -> String
where
    R: AsRef<[C]>,
    C: Display,
    H: AsRef<str>,
{
    let header_line = headers
        .iter()
        .map(|h| title_case(h.as_ref()))
        .collect::<Vec<_>>()
        .join(" | ");
    let rule = vec!["---"; headers.len()].join(" | ");

    let mut out = format!("\n\n| {header_line} | \n| {rule} | \n");
    for row in rows {
        let cells = row
            .as_ref()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&format!("| {cells} | \n"));
    }
    out.push('\n');
    out
}

/// Bulleted list, one item per line
pub fn bullets<T: Display>(items: &[T]) -> String {
    let lines = items
        .iter()
        .map(|item| format!("* {item}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n{lines}\n")
}

/// Indentation-based code block under a `###` heading
pub fn code_block(snippet: &str, description: &str) -> String {
    let body = snippet.replace('\n', "\n    ");
    format!("\n###{description}:\n     {body}\n")
}

/// Capitalize the first letter of each word and lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
