//! Output formatting for CLI commands

use std::io::Write;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
///
/// In JSON mode stdout only carries machine-readable data; progress and
/// streamed logs move to stderr.
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message.green().bold()),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints an error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("{}", message.red().bold()),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "error": message
                    })
                );
            }
        }
    }

    /// Prints a warning (stderr)
    pub fn warn(&self, message: &str) {
        eprintln!("{}", message.yellow());
    }

    /// Prints a progress status line
    pub fn status(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message.yellow()),
            OutputFormat::Json => eprintln!("{}", message),
        }
    }

    /// Prints a line of plain text (text only)
    pub fn line(&self, message: &str) {
        if self.format == OutputFormat::Text {
            println!("{}", message);
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints nested data as an indented key/value tree, or JSON
    pub fn render(&self, value: &Value) {
        match self.format {
            OutputFormat::Text => print!("{}", render_recursive(value)),
            OutputFormat::Json => self.data(value),
        }
    }

    /// Forwards a raw chunk of streamed output as-is
    pub fn raw(&self, chunk: &[u8]) {
        let result = match self.format {
            OutputFormat::Text => {
                let mut out = std::io::stdout().lock();
                out.write_all(chunk).and_then(|_| out.flush())
            }
            OutputFormat::Json => {
                let mut err = std::io::stderr().lock();
                err.write_all(chunk).and_then(|_| err.flush())
            }
        };
        if let Err(e) = result {
            tracing::debug!("dropped streamed output: {}", e);
        }
    }

    /// Progress bar with `len` steps; hidden in JSON mode
    pub fn progress_bar(&self, len: u64, message: &str) -> ProgressBar {
        if self.is_json() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {percent}%")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_message(message.to_string());
        pb
    }

    /// Prints a blank line (text only)
    pub fn blank(&self) {
        if self.format == OutputFormat::Text {
            println!();
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Renders nested JSON as an indented `key: value` tree
pub fn render_recursive(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, 0, &mut out);
    out
}

fn render_into(value: &Value, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if is_nested(item) {
                    out.push_str(&format!("{}{}:\n", pad, key));
                    render_into(item, indent + 2, out);
                } else {
                    out.push_str(&format!("{}{}: {}\n", pad, key, scalar(item)));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if is_nested(item) {
                    out.push_str(&format!("{}-\n", pad));
                    render_into(item, indent + 2, out);
                } else {
                    out.push_str(&format!("{}- {}\n", pad, scalar(item)));
                }
            }
        }
        other => out.push_str(&format!("{}{}\n", pad, scalar(other))),
    }
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_objects_indented() {
        let rendered = render_recursive(&json!({
            "id": "setup-1",
            "status": "failed",
            "build": {"id": "b1", "status": "failed"},
            "failure_message": null
        }));

        assert_eq!(
            rendered,
            "build:\n  id: b1\n  status: failed\nfailure_message: \nid: setup-1\nstatus: failed\n"
        );
    }

    #[test]
    fn renders_lists_as_dashes() {
        let rendered = render_recursive(&json!({"flows": ["ci", {"name": "x"}], "empty": []}));
        assert_eq!(rendered, "empty: []\nflows:\n  - ci\n  -\n    name: x\n");
    }

    #[test]
    fn renders_bare_scalar() {
        assert_eq!(render_recursive(&json!(42)), "42\n");
    }
}
