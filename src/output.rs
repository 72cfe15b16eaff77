//! Console rendering of values, responses and markdown
//!
//! [`render`] decides how something should look; an [`OutputSink`] decides where
//! it goes. Responses are rendered by status:
//!
//! | Status | Rendering |
//! |---|---|
//! | transport failure | `#Server Error` block naming the URL and error text |
//! | 2xx | body as indented JSON, raw text if it is not JSON |
//! | 401, 403 | fixed "no permission" message |
//! | 404 | fixed "not found" message |
//! | 5xx | `#Server Error` block naming URL, status and body |
//! | anything else | raw body |

use crate::config::DisplayConfig;
use crate::error::Result;
use crate::session::ResponseRecord;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

/// Message shown for 401 and 403 responses
pub const NO_PERMISSION: &str = "#You do not have permissions to view this resource";
/// Message shown for 404 responses
pub const NOT_FOUND: &str = "#Unable to find the requested resource";

/// Something to show the user
#[derive(Clone, Debug)]
pub enum Output {
    /// Structured data, shown as JSON
    Value(Value),
    /// An HTTP outcome, shown according to its status
    Response(ResponseRecord),
    /// Plain text; a leading `#` marks it as a markdown document
    Text(String),
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Value(value)
    }
}

impl From<ResponseRecord> for Output {
    fn from(record: ResponseRecord) -> Self {
        Output::Response(record)
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Output::Text(text)
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Output::Text(text.to_string())
    }
}

/// Rendered output, tagged by kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    /// Pretty-printed JSON
    Json(String),
    /// Markdown document
    Markdown(String),
    /// Plain text
    Text(String),
}

impl Rendered {
    /// The rendered text regardless of kind
    pub fn as_str(&self) -> &str {
        match self {
            Rendered::Json(s) | Rendered::Markdown(s) | Rendered::Text(s) => s,
        }
    }
}

/// Destination for rendered output
pub trait OutputSink {
    /// Write one rendered item
    fn emit(&mut self, rendered: &Rendered) -> Result<()>;
}

/// Decide how `output` should be shown
pub fn render(output: &Output) -> Result<Rendered> {
    Ok(match output {
        Output::Value(value) => Rendered::Json(to_pretty(value, b"  ")?),
        Output::Text(text) if text.starts_with('#') => Rendered::Markdown(text.clone()),
        Output::Text(text) => Rendered::Text(text.clone()),
        Output::Response(record) => render_response(record)?,
    })
}

fn render_response(record: &ResponseRecord) -> Result<Rendered> {
    if record.is_transport_failure() {
        return Ok(Rendered::Markdown(format!(
            "#Server Error \n> {} - {}",
            record.target,
            record.text()
        )));
    }
    Ok(match record.status {
        200..=299 => match record.json::<Value>() {
            Ok(body) => Rendered::Json(to_pretty(&body, b"    ")?),
            Err(_) => Rendered::Text(record.text().into_owned()),
        },
        401 | 403 => Rendered::Markdown(NO_PERMISSION.to_string()),
        404 => Rendered::Markdown(NOT_FOUND.to_string()),
        500.. => Rendered::Markdown(format!(
            "#Server Error \n> {} - {} - {}",
            record.target,
            record.status,
            record.text()
        )),
        _ => Rendered::Text(record.text().into_owned()),
    })
}

fn to_pretty(value: &Value, indent: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render `output` and hand it to `sink`
pub fn echo(sink: &mut dyn OutputSink, output: impl Into<Output>) -> Result<()> {
    let rendered = render(&output.into())?;
    sink.emit(&rendered)
}

/// Writes rendered output to a terminal-like writer
///
/// Markdown prose is wrapped to the terminal width when it is known; table rows
/// and indented code lines are left alone.
pub struct ConsoleSink<W: Write> {
    writer: W,
    display: DisplayConfig,
}

impl ConsoleSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout(display: DisplayConfig) -> Self {
        Self::new(std::io::stdout(), display)
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Sink writing to `writer`
    pub fn new(writer: W, display: DisplayConfig) -> Self {
        Self { writer, display }
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for ConsoleSink<W> {
    fn emit(&mut self, rendered: &Rendered) -> Result<()> {
        let text = match rendered {
            Rendered::Markdown(md) => wrap_markdown(md, usize::from(self.display.terminal_width)),
            other => other.as_str().to_string(),
        };
        writeln!(self.writer, "{text}")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn wrap_markdown(md: &str, width: usize) -> String {
    if width == 0 {
        return md.to_string();
    }
    md.lines()
        .map(|line| {
            if line.starts_with('|') || line.starts_with("    ") || line.chars().count() <= width {
                line.to_string()
            } else {
                wrap_line(line, width)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_line(line: &str, width: usize) -> String {
    let mut out = String::new();
    let mut current = 0;
    for word in line.split_whitespace() {
        let len = word.chars().count();
        if current > 0 && current + 1 + len > width {
            out.push('\n');
            current = 0;
        } else if current > 0 {
            out.push(' ');
            current += 1;
        }
        out.push_str(word);
        current += len;
    }
    out
}
