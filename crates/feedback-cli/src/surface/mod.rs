//! Terminal presentation surface.
//!
//! Launched by a presentation session with null stdin/stdout, so it draws on
//! the controlling terminal directly. On submit it writes the merged answer
//! to the output file; on close (Esc or Ctrl+C) it writes the empty answer.
//! Either way the process exits 0 and the caller gets a result. Run by hand
//! without `--output-file`, it prints the answer to stdout instead.

mod render;
mod state;

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use feedback_core::{encode, write_handoff, FeedbackResult};

use render::render_ui;
use state::{Outcome, SurfaceState};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

type SurfaceTerminal = Terminal<CrosstermBackend<Box<dyn Write>>>;

/// Show the form, wait for the human, and write the result to `output`,
/// or print it to stdout when no output file was given.
pub fn run(prompt: &str, options: &[String], output: Option<&Path>) -> anyhow::Result<()> {
    let mut state = SurfaceState::new(prompt, options.to_vec());

    let mut terminal = init_terminal().context("Failed to set up terminal")?;
    let outcome = event_loop(&mut terminal, &mut state);
    let restored = restore_terminal(&mut terminal);
    let outcome = outcome.context("Terminal input failed")?;
    restored.context("Failed to restore terminal")?;

    let result = match outcome {
        Outcome::Submit => state.result(),
        Outcome::Close | Outcome::Continue => FeedbackResult::default(),
    };

    let submitted = outcome == Outcome::Submit;
    tracing::debug!(submitted, "Surface closed");
    match output {
        Some(output) => write_handoff(output, &result)
            .with_context(|| format!("Failed to write result to {}", output.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&encode(&result))?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn event_loop(terminal: &mut SurfaceTerminal, state: &mut SurfaceState) -> io::Result<Outcome> {
    loop {
        terminal.draw(|frame| render_ui(frame, state))?;

        if !event::poll(EVENT_POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            match state.handle_key(key) {
                Outcome::Continue => {}
                done => return Ok(done),
            }
        }
    }
}

fn init_terminal() -> io::Result<SurfaceTerminal> {
    let mut tty = terminal_writer()?;
    enable_raw_mode()?;
    let setup = execute!(tty, EnterAlternateScreen)
        .and_then(|()| Terminal::new(CrosstermBackend::new(tty)))
        .and_then(|mut terminal| terminal.clear().map(|()| terminal));
    if setup.is_err() {
        let _ = disable_raw_mode();
    }
    setup
}

fn restore_terminal(terminal: &mut SurfaceTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

#[cfg(unix)]
fn terminal_writer() -> io::Result<Box<dyn Write>> {
    let tty = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")?;
    Ok(Box::new(tty))
}

#[cfg(not(unix))]
fn terminal_writer() -> io::Result<Box<dyn Write>> {
    Ok(Box::new(io::stderr()))
}
