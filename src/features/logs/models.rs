use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Level recorded when a line does not name one.
pub const DEFAULT_LEVEL: &str = "info";

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "fatal"];

/// One line of an application log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

impl LogEntry {
    /// Parses `<RFC3339 timestamp> [LEVEL] message...`.
    ///
    /// The level word is optional and may be bracketed or followed by a colon.
    /// Runs of whitespace in the message collapse to one space. Returns `None`
    /// for lines without a valid timestamp or without a message.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let timestamp = DateTime::parse_from_rfc3339(fields.next()?)
            .ok()?
            .with_timezone(&Utc);

        let mut rest: Vec<&str> = fields.collect();
        let level = match rest.first().and_then(|field| level_of(field)) {
            Some(level) if rest.len() > 1 => {
                rest.remove(0);
                level
            }
            _ => DEFAULT_LEVEL.to_string(),
        };
        if rest.is_empty() {
            return None;
        }

        Some(Self {
            timestamp,
            level,
            message: rest.join(" "),
        })
    }
}

fn level_of(field: &str) -> Option<String> {
    let word = field
        .trim_matches(|c| c == '[' || c == ']' || c == ':')
        .to_ascii_lowercase();
    let word = if word == "warning" { "warn".to_string() } else { word };
    LEVELS.contains(&word.as_str()).then_some(word)
}
