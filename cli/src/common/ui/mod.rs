//! # chatrs Terminal UI (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! The small amount of terminal presentation the `chat` and `ask` commands
//! share: the prompt, the bot prefix for replies (including streamed ones),
//! and the one-line status "toasts" shown after feedback.
//!
//! Output goes to a caller-supplied writer so the helpers can be tested
//! against a buffer; the commands pass `stdout`.
//!
use crate::chat::session::Reply;
use std::io::{self, BufRead, Write};

const USER_PREFIX: &str = "You: ";
pub const BOT_PREFIX: &str = "Bot: ";

/// Prints the input prompt without a newline.
pub fn prompt<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "{}", USER_PREFIX)?;
    out.flush()
}

/// Reads one line. `None` at end of input.
pub fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

/// Starts a streamed reply: the prefix, ready for deltas.
pub fn begin_stream<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "{}", BOT_PREFIX)?;
    out.flush()
}

/// Writes one streamed delta immediately.
pub fn stream_delta<W: Write>(out: &mut W, delta: &str) -> io::Result<()> {
    write!(out, "{}", delta)?;
    out.flush()
}

/// Finishes a reply.
///
/// A reply that was streamed only needs its line ended. Anything else is
/// printed whole; if a stream was started but the reply came from elsewhere
/// (an apology after a failed stream), it starts on a fresh line.
pub fn finish_reply<W: Write>(out: &mut W, reply: &Reply, stream_started: bool) -> io::Result<()> {
    if reply.streamed {
        writeln!(out)
    } else if stream_started {
        writeln!(out)?;
        writeln!(out, "{}{}", BOT_PREFIX, reply.text)
    } else {
        writeln!(out, "{}{}", BOT_PREFIX, reply.text)
    }
}

/// One-line success or failure notice.
pub fn toast<W: Write>(out: &mut W, ok: bool, message: &str) -> io::Result<()> {
    let mark = if ok { "✅" } else { "❌" };
    writeln!(out, "{} {}", mark, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::ReplySource;

    fn reply(text: &str, streamed: bool) -> Reply {
        Reply {
            text: text.to_string(),
            source: ReplySource::Model,
            streamed,
        }
    }

    #[test]
    fn test_read_line_strips_newline_and_detects_eof() {
        let mut input = io::Cursor::new("hello\r\nbye\n");
        assert_eq!(read_line(&mut input).unwrap().as_deref(), Some("hello"));
        assert_eq!(read_line(&mut input).unwrap().as_deref(), Some("bye"));
        assert_eq!(read_line(&mut input).unwrap(), None);
    }

    #[test]
    fn test_finish_reply_variants() {
        let mut out = Vec::new();
        finish_reply(&mut out, &reply("whole", false), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Bot: whole\n");

        let mut out = Vec::new();
        begin_stream(&mut out).unwrap();
        stream_delta(&mut out, "str").unwrap();
        stream_delta(&mut out, "eamed").unwrap();
        finish_reply(&mut out, &reply("streamed", true), true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Bot: streamed\n");

        let mut out = Vec::new();
        begin_stream(&mut out).unwrap();
        finish_reply(&mut out, &reply("Sorry", false), true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Bot: \nBot: Sorry\n");
    }

    #[test]
    fn test_toast() {
        let mut out = Vec::new();
        toast(&mut out, true, "Feedback sent").unwrap();
        toast(&mut out, false, "Feedback failed").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "✅ Feedback sent\n❌ Feedback failed\n"
        );
    }
}
