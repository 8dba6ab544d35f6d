//! # chatrs Chat Command
//!
//! File: cli/src/commands/chat.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `chatrs chat` is the terminal conversation: a prompt, one session for the
//! lifetime of the process, and a handful of slash commands.
//!
//! ## Commands inside the REPL
//!
//! - `/clear`: empty the transcript and lift any cooldown
//! - `/feedback <text>`: post feedback to the configured webhook
//! - `bye`, `exit`, `/quit` (or end of input): leave
//!
//! ## Examples
//!
//! ```bash
//! chatrs chat
//! chatrs -v c --stream --temperature 0.2
//! ```
//!
use super::ModelOverrides;
use crate::chat::feedback::FeedbackClient;
use crate::chat::session::{Session, SessionFactory};
use crate::common::ui;
use crate::core::config::load_config;
use crate::core::error::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

const EXIT_WORDS: [&str; 3] = ["bye", "exit", "/quit"];
const FAREWELL: &str = "Goodbye! 👋";

#[derive(Parser, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub overrides: ModelOverrides,
}

pub async fn handle_chat(args: ChatArgs, config_path: Option<&Path>) -> Result<()> {
    info!("Handling chat command");
    let config = args.overrides.apply(load_config(config_path)?)?;
    let session = SessionFactory::from_config(&config)?.create();
    let feedback = match FeedbackClient::from_config(&config.feedback) {
        Ok(client) => Some(client),
        Err(e) => {
            debug!("Feedback disabled: {:#}", e);
            None
        }
    };

    println!(
        "💬 chatrs ({}). Type /clear to start over, /feedback <text> to send feedback, bye to leave.",
        config.model.model
    );
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let repl = Repl {
        session,
        feedback,
        stream: config.model.stream,
    };
    repl.run(&mut input, &mut stdout).await
}

struct Repl {
    session: Session,
    feedback: Option<FeedbackClient>,
    stream: bool,
}

impl Repl {
    async fn run<R: BufRead, W: Write + Send>(mut self, input: &mut R, out: &mut W) -> Result<()> {
        loop {
            ui::prompt(out)?;
            let Some(line) = ui::read_line(input)? else {
                writeln!(out)?;
                break;
            };
            let line = line.trim();

            if EXIT_WORDS.contains(&line.to_lowercase().as_str()) {
                writeln!(out, "{}{}", ui::BOT_PREFIX, FAREWELL)?;
                break;
            }
            if line == "/clear" {
                self.session.clear();
                ui::toast(out, true, "Conversation cleared")?;
                continue;
            }
            if let Some(text) = line.strip_prefix("/feedback") {
                self.send_feedback(text, out).await?;
                continue;
            }
            self.turn(line, out).await?;
        }
        info!(
            "Chat ended after {} turns",
            self.session.transcript().len()
        );
        Ok(())
    }

    async fn turn<W: Write + Send>(&mut self, line: &str, out: &mut W) -> Result<()> {
        let mut started = false;
        let reply = if self.stream {
            let mut sink = |delta: &str| {
                let written = if started {
                    ui::stream_delta(out, delta)
                } else {
                    started = true;
                    ui::begin_stream(out).and_then(|_| ui::stream_delta(out, delta))
                };
                if let Err(e) = written {
                    warn!("Failed to write streamed text: {}", e);
                }
            };
            self.session.handle_streaming(line, &mut sink).await
        } else {
            self.session.handle(line).await
        };
        if let Some(reply) = reply {
            ui::finish_reply(out, &reply, started)?;
        }
        Ok(())
    }

    async fn send_feedback<W: Write>(&self, text: &str, out: &mut W) -> Result<()> {
        let Some(client) = &self.feedback else {
            ui::toast(out, false, "Feedback is not configured (set feedback.url)")?;
            return Ok(());
        };
        match client.submit(text).await {
            Ok(()) => ui::toast(out, true, "Thanks! Feedback sent.")?,
            Err(e) => {
                warn!("Feedback failed: {:#}", e);
                ui::toast(out, false, &format!("Feedback failed: {}", e))?;
            }
        }
        Ok(())
    }
}
