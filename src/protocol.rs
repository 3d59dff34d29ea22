//! Line protocol parser and response generator.
//!
//! Every inbound line is trimmed and classified into one of a handful of
//! commands:
//! - Greetings: `hello`, `bye`
//! - Slash commands: `/time`, `/quit`, `/echo <text>`
//! - Anything else is echoed back verbatim
//!
//! Matching is exact and case-sensitive. Responses are single lines
//! terminated by `\n`.

use bytes::BytesMut;
use chrono::{DateTime, Utc};

/// Maximum message length considered for command evaluation
pub const MAX_MESSAGE_LENGTH: usize = 1024;

/// Prefix of the echo command, including its separating space
const ECHO_PREFIX: &str = "/echo ";

/// Parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Blank line
    Empty,

    /// `hello`
    Hello,

    /// `bye`: close the session
    Bye,

    /// `/time`: report the current time
    Time,

    /// `/quit`: close the session
    Quit,

    /// `/echo <text>`
    Echo(&'a str),

    /// Any other line starting with `/`
    Unknown,

    /// Plain text, echoed back
    Message(&'a str),
}

impl<'a> Command<'a> {
    /// Classify an already-trimmed message.
    ///
    /// The message is truncated to [`MAX_MESSAGE_LENGTH`] before matching.
    pub fn parse(message: &'a str) -> Self {
        let msg = truncate(message, MAX_MESSAGE_LENGTH);

        match msg {
            "" => Command::Empty,
            "hello" => Command::Hello,
            "bye" => Command::Bye,
            "/time" => Command::Time,
            "/quit" => Command::Quit,
            _ if msg.starts_with('/') => match msg.strip_prefix(ECHO_PREFIX) {
                Some(text) => Command::Echo(text),
                None => Command::Unknown,
            },
            _ => Command::Message(msg),
        }
    }

    /// Reason recorded in the activity log for farewell commands
    pub fn farewell_reason(&self) -> Option<&'static str> {
        match self {
            Command::Bye => Some("said bye"),
            Command::Quit => Some("/quit"),
            _ => None,
        }
    }
}

/// Truncate `s` to at most `max` bytes without splitting a character.
pub fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }

    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Response generator
pub struct Response;

impl Response {
    /// Generate the response for a command
    pub fn for_command(command: &Command<'_>, now: DateTime<Utc>) -> BytesMut {
        match command {
            Command::Empty => BytesMut::from(Self::prompt()),
            Command::Hello => BytesMut::from(Self::greeting()),
            Command::Bye | Command::Quit => BytesMut::from(Self::goodbye()),
            Command::Time => Self::time(now),
            Command::Echo(text) | Command::Message(text) => Self::line(text),
            Command::Unknown => BytesMut::from(Self::unknown_command()),
        }
    }

    /// Generate the reply to a blank line
    pub fn prompt() -> &'static [u8] {
        b"Say something. . .\n"
    }

    /// Generate the reply to `hello`
    pub fn greeting() -> &'static [u8] {
        b"Hi there!\n"
    }

    /// Generate the farewell sent before closing
    pub fn goodbye() -> &'static [u8] {
        b"Goodbye!\n"
    }

    /// Generate the reply to an unrecognised slash command
    pub fn unknown_command() -> &'static [u8] {
        b"Unknown command\n"
    }

    /// Generate the notice sent when a client goes quiet
    pub fn inactivity() -> &'static [u8] {
        b"Disconnected due to inactivity.\n"
    }

    /// Generate an RFC 1123 timestamp line
    pub fn time(now: DateTime<Utc>) -> BytesMut {
        Self::line(&now.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }

    /// Generate a newline-terminated line
    pub fn line(text: &str) -> BytesMut {
        let mut response = BytesMut::with_capacity(text.len() + 1);
        response.extend_from_slice(text.as_bytes());
        response.extend_from_slice(b"\n");
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    #[test]
    fn test_parse_greetings() {
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("hello"), Command::Hello);
        assert_eq!(Command::parse("bye"), Command::Bye);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Command::parse("Hello"), Command::Message("Hello"));
        assert_eq!(Command::parse("BYE"), Command::Message("BYE"));
        assert_eq!(Command::parse("/TIME"), Command::Unknown);
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(Command::parse("/time"), Command::Time);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/echo foo bar"), Command::Echo("foo bar"));
        assert_eq!(Command::parse("/echo "), Command::Echo(""));
        assert_eq!(Command::parse("/bogus"), Command::Unknown);
        assert_eq!(Command::parse("/"), Command::Unknown);
    }

    #[test]
    fn test_echo_requires_space() {
        // "/echo" alone and "/echofoo" are not echo commands
        assert_eq!(Command::parse("/echo"), Command::Unknown);
        assert_eq!(Command::parse("/echofoo"), Command::Unknown);
    }

    #[test]
    fn test_parse_exact_match_only() {
        assert_eq!(Command::parse("hello there"), Command::Message("hello there"));
        assert_eq!(Command::parse("/time now"), Command::Unknown);
        assert_eq!(Command::parse("/quit!"), Command::Unknown);
    }

    #[test]
    fn test_farewell() {
        assert_eq!(Command::Bye.farewell_reason(), Some("said bye"));
        assert_eq!(Command::Quit.farewell_reason(), Some("/quit"));
        assert_eq!(Command::Time.farewell_reason(), None);
    }

    #[test]
    fn test_parse_truncates_long_messages() {
        let long = "a".repeat(MAX_MESSAGE_LENGTH + 100);
        match Command::parse(&long) {
            Command::Message(msg) => assert_eq!(msg.len(), MAX_MESSAGE_LENGTH),
            other => panic!("unexpected: {:?}", other),
        }

        let long_echo = format!("/echo {}", "b".repeat(MAX_MESSAGE_LENGTH));
        match Command::parse(&long_echo) {
            Command::Echo(text) => assert_eq!(text.len(), MAX_MESSAGE_LENGTH - ECHO_PREFIX.len()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_truncation_can_change_command() {
        // A padded "hello" past the limit stays a plain message
        let padded = format!("{}hello", "x".repeat(MAX_MESSAGE_LENGTH));
        assert_eq!(
            Command::parse(&padded),
            Command::Message(&padded[..MAX_MESSAGE_LENGTH])
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // 'é' is two bytes; cutting at byte 2 would split it
        assert_eq!(truncate("aé", 2), "a");
        assert_eq!(truncate("aé", 3), "aé");
    }

    #[test]
    fn test_responses() {
        let now = Utc::now();
        assert_eq!(&Response::for_command(&Command::Empty, now)[..], b"Say something. . .\n");
        assert_eq!(&Response::for_command(&Command::Hello, now)[..], b"Hi there!\n");
        assert_eq!(&Response::for_command(&Command::Bye, now)[..], b"Goodbye!\n");
        assert_eq!(&Response::for_command(&Command::Quit, now)[..], b"Goodbye!\n");
        assert_eq!(&Response::for_command(&Command::Echo("foo"), now)[..], b"foo\n");
        assert_eq!(&Response::for_command(&Command::Message("hi all"), now)[..], b"hi all\n");
        assert_eq!(&Response::for_command(&Command::Unknown, now)[..], b"Unknown command\n");
    }

    #[test]
    fn test_time_response_is_rfc1123() {
        let now = Utc.with_ymd_and_hms(2009, 11, 10, 23, 0, 0).unwrap();
        let response = Response::for_command(&Command::Time, now);
        assert_eq!(&response[..], b"Tue, 10 Nov 2009 23:00:00 GMT\n");

        let text = std::str::from_utf8(&response).unwrap().trim_end();
        let parsed = NaiveDateTime::parse_from_str(text, "%a, %d %b %Y %H:%M:%S GMT").unwrap();
        assert_eq!(parsed, now.naive_utc());
    }
}
