//! # chatrs Ask Command
//!
//! File: cli/src/commands/ask.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `chatrs ask <text...>` runs a single turn through a fresh session and
//! prints the reply on stdout with no decoration, so it composes with other
//! shell tools. Ignored input prints nothing and still exits successfully.
//!
//! ## Examples
//!
//! ```bash
//! chatrs ask what time is it
//! chatrs ask --stream --model gpt-4o "summarise the borrow checker"
//! ```
//!
use super::ModelOverrides;
use crate::chat::session::{Session, SessionFactory};
use crate::core::config::load_config;
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The question, as one or more words.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    pub text: Vec<String>,

    #[command(flatten)]
    pub overrides: ModelOverrides,
}

pub async fn handle_ask(args: AskArgs, config_path: Option<&Path>) -> Result<()> {
    info!("Handling ask command ({} words)", args.text.len());
    let config = args.overrides.apply(load_config(config_path)?)?;
    let stream = config.model.stream;
    let mut session = SessionFactory::from_config(&config)?.create();
    let question = args.text.join(" ");
    let mut stdout = io::stdout();
    answer(&mut session, &question, stream, &mut stdout).await
}

/// Runs one turn and writes the bare reply to `out`.
pub(crate) async fn answer<W: Write + Send>(
    session: &mut Session,
    question: &str,
    stream: bool,
    out: &mut W,
) -> Result<()> {
    let mut wrote_delta = false;
    let reply = if stream {
        let mut sink = |delta: &str| {
            wrote_delta = true;
            if let Err(e) = write!(out, "{}", delta).and_then(|_| out.flush()) {
                warn!("Failed to write streamed text: {}", e);
            }
        };
        session.handle_streaming(question, &mut sink).await
    } else {
        session.handle(question).await
    };

    let Some(reply) = reply else {
        info!("Input ignored, nothing to print");
        return Ok(());
    };
    if reply.streamed {
        writeln!(out)?;
    } else {
        if wrote_delta {
            writeln!(out)?;
        }
        writeln!(out, "{}", reply.text).context("Failed to write reply")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::fallback::tests::ScriptedModel;
    use crate::core::config::Config;

    fn session(outcomes: Vec<Result<String>>) -> Session {
        SessionFactory::from_config(&Config::default())
            .unwrap()
            .with_model(ScriptedModel::new(outcomes))
            .create()
    }

    #[tokio::test]
    async fn test_answer_prints_bare_reply() {
        let mut session = session(vec![]);
        let mut out = Vec::new();
        answer(&mut session, "hello", false, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hey 👋 How can I help you?\n");
    }

    #[tokio::test]
    async fn test_answer_streams_model_text() {
        let mut session = session(vec![Ok("Ferris is a crab.".into())]);
        let mut out = Vec::new();
        answer(&mut session, "who is ferris", true, &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Ferris is a crab.\n");
    }

    #[tokio::test]
    async fn test_answer_ignores_junk() {
        let model = ScriptedModel::new(vec![]);
        let mut session = SessionFactory::from_config(&Config::default())
            .unwrap()
            .with_model(model.clone())
            .create();
        let mut out = Vec::new();
        answer(&mut session, "?!", false, &mut out).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(model.calls(), 0);
    }
}
