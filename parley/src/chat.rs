//! Interactive chat loop
//!
//! Stdin is read on its own thread and delivered as [`Event`]s, alongside
//! Ctrl-C presses that arrive while no reply is being generated. The loop
//! returns normally on `/quit`, end of input, or an idle Ctrl-C, so logs are
//! flushed on the way out.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{Context, Result};
use parley_core::llm::{CompletionSource, EchoSource, OpenAiSource};
use parley_core::store::ClientRegistry;
use parley_core::{
    humanize_error, CancelToken, Config, SessionId, TranscriptStore, TurnOutcome, TurnRunner,
};

use crate::{open_store, Provider};

/// Something the chat loop has to react to.
#[derive(Debug)]
enum Event {
    Line(String),
    /// Ctrl-C with no generation running.
    Interrupt,
    Eof,
}

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Clear,
    History,
    Blank,
    Prompt(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Blank,
        "/quit" | "/exit" => Input::Quit,
        "/clear" => Input::Clear,
        "/history" => Input::History,
        prompt => Input::Prompt(prompt),
    }
}

fn build_source(config: &Config, provider: Provider) -> Result<Box<dyn CompletionSource>> {
    Ok(match provider {
        Provider::Openai => Box::new(
            OpenAiSource::new(&config.llm)
                .context("cannot use the openai provider (try --provider echo)")?,
        ),
        Provider::Echo => Box::new(EchoSource::new()),
    })
}

fn spawn_stdin_reader(events: Sender<Event>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if events.send(Event::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
        let _ = events.send(Event::Eof);
    });
}

pub fn run(
    config: &Config,
    registry: &ClientRegistry,
    session_id: SessionId,
    provider: Provider,
) -> Result<()> {
    let source = build_source(config, provider)?;
    let mut selection = open_store(config, registry, &session_id);

    // Ctrl-C stops the reply being generated; with nothing in flight it ends
    // the chat.
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let (events_tx, events) = mpsc::channel();
    let interrupt_tx = events_tx.clone();
    ctrlc::set_handler(move || {
        if !handler_token.cancel() {
            let _ = interrupt_tx.send(Event::Interrupt);
        }
    })
    .context("failed to set Ctrl+C handler")?;
    spawn_stdin_reader(events_tx);

    let span = parley_core::logging::session_span(&session_id);
    let _entered = span.enter();
    tracing::info!(
        session_id = %session_id,
        backend = %selection.kind,
        source = source.name(),
        "Chat started"
    );
    println!("Session {} ({} history)", session_id.short(), selection.kind);
    println!("Resume with: parley chat --session {}", session_id);

    let runner = TurnRunner::new(source.as_ref(), config.llm.temperature);
    let stdout = io::stdout();
    let stderr = io::stderr();
    repl(
        selection.store.as_mut(),
        &runner,
        &cancel,
        &events,
        &mut stdout.lock(),
        &mut stderr.lock(),
    )?;

    tracing::info!(session_id = %session_id, "Chat ended");
    Ok(())
}

/// Process events until the user leaves.
///
/// Store failures are shown in their humanized form and the loop keeps going
/// on the same store.
fn repl(
    store: &mut dyn TranscriptStore,
    runner: &TurnRunner<'_>,
    cancel: &CancelToken,
    events: &Receiver<Event>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    match store.get_message_count() {
        Ok(0) => {}
        Ok(previous) => writeln!(out, "Resumed {} earlier message(s).", previous)?,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read transcript");
            writeln!(err, "{}", humanize_error(&e))?;
        }
    }
    writeln!(out, "Type /clear to reset the conversation, /quit to leave.")?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let line = match events.recv() {
            Ok(Event::Line(line)) => line,
            Ok(Event::Interrupt) => {
                writeln!(out, "\nGoodbye.")?;
                break;
            }
            Ok(Event::Eof) | Err(_) => {
                writeln!(out)?;
                break;
            }
        };

        match parse_input(&line) {
            Input::Blank => continue,
            Input::Quit => break,
            Input::Clear => match store.clear() {
                Ok(()) => writeln!(out, "Conversation cleared.")?,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to clear transcript");
                    writeln!(err, "{}", humanize_error(&e))?;
                }
            },
            Input::History => match store.get_messages() {
                Ok(messages) => {
                    for msg in messages {
                        writeln!(out, "[{}] {}", msg.role.label(), msg.content)?;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read transcript");
                    writeln!(err, "{}", humanize_error(&e))?;
                }
            },
            Input::Prompt(prompt) => {
                let result = runner.run(store, prompt, cancel, &mut |chunk| {
                    let _ = write!(out, "{}", chunk);
                    let _ = out.flush();
                });
                writeln!(out)?;
                match result {
                    Ok(TurnOutcome::Cancelled(_)) => writeln!(out, "[stopped]")?,
                    Ok(TurnOutcome::Empty) => writeln!(out, "(no reply)")?,
                    Ok(_) => {}
                    // The session stays on its backend; the user can retry.
                    Err(e) => {
                        tracing::error!(error = %e, "Transcript store failed during turn");
                        writeln!(err, "{}", humanize_error(&e))?;
                    }
                }
            }
        }
    }
    Ok(())
}
