//! Raw line tokenizing and the owned [`Line`] model.

mod nom_parser;
pub mod tags;

pub use self::nom_parser::RawLine;
pub use self::tags::Tag;

use chrono::{DateTime, Utc};

use crate::error::LineParseError;
use crate::hostmask::Hostmask;

/// A tokenized server line.
///
/// The command is upper-cased; numerics keep their three digits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// IRCv3 tags, in the order sent.
    pub tags: Vec<Tag>,
    /// Source of the line without the leading `:`.
    pub prefix: Option<String>,
    /// Command name or numeric.
    pub command: String,
    /// Parameters, with the trailing parameter last.
    pub params: Vec<String>,
}

impl Line {
    /// Tokenize a raw line. CR/LF terminators are ignored.
    pub fn parse(raw: &str) -> Result<Self, LineParseError> {
        let parsed = RawLine::parse(raw)?;

        Ok(Line {
            tags: parsed.tags.map(tags::parse_tags).unwrap_or_default(),
            prefix: parsed.prefix.map(str::to_owned),
            command: parsed.command.to_ascii_uppercase(),
            params: parsed.params.into_iter().map(str::to_owned).collect(),
        })
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The last parameter, if any.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when the line has no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The numeric code, when the command is a three-digit reply.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Parsed source hostmask; empty when the line had no prefix.
    pub fn source(&self) -> Hostmask {
        self.prefix.as_deref().map(Hostmask::parse).unwrap_or_default()
    }

    /// Look up a tag value by key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|t| t.key() == key).and_then(Tag::value)
    }

    /// The IRCv3 `server-time` tag, if present and well-formed.
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        self.tag("time")
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

impl std::str::FromStr for Line {
    type Err = LineParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Line::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_accessors() {
        let line = Line::parse(":nick!u@h privmsg #chan :hello there\r\n").unwrap();
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.param(0), Some("#chan"));
        assert_eq!(line.trailing(), Some("hello there"));
        assert_eq!(line.source().nick, "nick");
        assert_eq!(line.numeric(), None);
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn test_numeric() {
        let line: Line = ":irc.example.net 001 me :Welcome".parse().unwrap();
        assert_eq!(line.numeric(), Some(1));
        assert!(line.source().is_server_name());
    }

    #[test]
    fn test_server_time_tag() {
        let line = Line::parse("@time=2023-05-01T12:30:00.000Z :n!u@h PRIVMSG #c :x").unwrap();
        let time = line.server_time().unwrap();
        assert_eq!(time.timestamp(), 1_682_944_200);

        let line = Line::parse("@time=garbage :n!u@h PRIVMSG #c :x").unwrap();
        assert!(line.server_time().is_none());
    }
}
