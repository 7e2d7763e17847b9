//! Nom-based IRC line tokenizer.
//!
//! Splits a raw line into borrowed tags, prefix, command and parameters.
//! No semantic validation happens here; a line that has a command token
//! always tokenizes.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::{context, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult,
};

use crate::error::LineParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Parse IRCv3 message tags (the part after `@` and before the first space).
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_until(" ")),
    )(input)
}

/// Parse message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

/// Parse the command name or three-digit numeric.
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// Tokenize a line into its components.
///
/// ```text
/// [@tags SPACE] [:prefix SPACE] command *(SPACE middle) [SPACE :trailing]
/// ```
///
/// Runs of spaces between parameters are treated as one separator.
pub fn parse_line(input: &str) -> ParseResult<&str, RawLine<'_>> {
    let (input, tags) = context("parsing optional tags", opt(parse_tags))(input)?;
    let (input, _) = space0(input)?;

    let (input, prefix) = context("parsing optional prefix", opt(parse_prefix))(input)?;
    let (input, _) = space0(input)?;

    let (input, command) = context("parsing required command", parse_command)(input)?;

    let mut params: Vec<&str> = Vec::new();
    let mut rest = input;

    loop {
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.len() == rest.len() || trimmed.is_empty() {
            // No separator, or only trailing whitespace left.
            rest = trimmed;
            break;
        }
        rest = trimmed;

        if let Some(after_colon) = rest.strip_prefix(':') {
            let end = after_colon.find(['\r', '\n']).unwrap_or(after_colon.len());
            params.push(&after_colon[..end]);
            rest = &after_colon[end..];
            break;
        }

        let end = rest.find([' ', '\r', '\n']).unwrap_or(rest.len());
        if end == 0 {
            break;
        }
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    Ok((
        rest,
        RawLine {
            tags,
            prefix,
            command,
            params,
        },
    ))
}

/// A tokenized line borrowing from its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name or numeric, as sent.
    pub command: &'a str,
    /// Parameters, including the trailing one.
    pub params: Vec<&'a str>,
}

impl<'a> RawLine<'a> {
    /// Tokenize a line, stripping any CR/LF terminator first.
    pub fn parse(input: &'a str) -> Result<Self, LineParseError> {
        let input = input.trim_end_matches(['\r', '\n']);
        if input.trim().is_empty() {
            return Err(LineParseError::EmptyLine);
        }

        match parse_line(input) {
            Ok((_remaining, line)) => Ok(line),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let mut position = input.len();
                let mut context_info = None;

                for (error_input, error_kind) in &e.errors {
                    position = input.len() - error_input.len();
                    if let VerboseErrorKind::Context(ctx) = error_kind {
                        context_info = Some(*ctx);
                    }
                }

                if context_info == Some("parsing required command") {
                    return Err(LineParseError::MissingCommand);
                }

                Err(LineParseError::ParseContext {
                    position,
                    context: context_info.unwrap_or("tokenizing line").to_string(),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(LineParseError::ParseContext {
                position: input.len(),
                context: "incomplete input".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let line = RawLine::parse("PING").unwrap();
        assert_eq!(line.command, "PING");
        assert!(line.tags.is_none());
        assert!(line.prefix.is_none());
        assert!(line.params.is_empty());
    }

    #[test]
    fn test_parse_with_prefix_and_trailing() {
        let line = RawLine::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(line.prefix, Some("nick!user@host"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#channel", "Hello, world!"]);
    }

    #[test]
    fn test_parse_with_tags() {
        let line = RawLine::parse("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(line.tags, Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(line.prefix, Some("nick"));
        assert_eq!(line.params, vec!["#ch", "Hi"]);
    }

    #[test]
    fn test_parse_crlf_and_lf() {
        let line = RawLine::parse("PING :server\r\n").unwrap();
        assert_eq!(line.params, vec!["server"]);

        let line = RawLine::parse("PING :server\n").unwrap();
        assert_eq!(line.params, vec!["server"]);
    }

    #[test]
    fn test_parse_numeric() {
        let line = RawLine::parse(":server 367 me #chan *!*@bad.host setter 1700000000").unwrap();
        assert_eq!(line.command, "367");
        assert_eq!(
            line.params,
            vec!["me", "#chan", "*!*@bad.host", "setter", "1700000000"]
        );
    }

    #[test]
    fn test_parse_collapses_repeated_spaces() {
        let line = RawLine::parse(":server  MODE  #chan   +o  nick ").unwrap();
        assert_eq!(line.command, "MODE");
        assert_eq!(line.params, vec!["#chan", "+o", "nick"]);
    }

    #[test]
    fn test_parse_empty_trailing() {
        let line = RawLine::parse("PRIVMSG #channel :").unwrap();
        assert_eq!(line.params, vec!["#channel", ""]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(RawLine::parse(""), Err(LineParseError::EmptyLine));
        assert_eq!(RawLine::parse("\r\n"), Err(LineParseError::EmptyLine));
        assert_eq!(
            RawLine::parse(":only.a.prefix"),
            Err(LineParseError::MissingCommand)
        );
        assert!(RawLine::parse("@tags-without-anything-else").is_err());
    }
}
