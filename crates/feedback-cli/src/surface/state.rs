//! Input state of the terminal surface, independent of drawing.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use feedback_core::{merge, selected_options, FeedbackResult};

/// Which part of the form receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Options,
    Text,
}

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Submit,
    Close,
}

/// Prompt, option checkboxes and the free-text buffer.
#[derive(Debug, Clone)]
pub struct SurfaceState {
    prompt: String,
    options: Vec<String>,
    checked: Vec<bool>,
    cursor: usize,
    focus: Focus,
    text: String,
}

impl SurfaceState {
    pub fn new(prompt: impl Into<String>, options: Vec<String>) -> Self {
        let focus = if options.is_empty() {
            Focus::Text
        } else {
            Focus::Options
        };
        Self {
            prompt: prompt.into(),
            checked: vec![false; options.len()],
            options,
            cursor: 0,
            focus,
            text: String::new(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_checked(&self, index: usize) -> bool {
        self.checked.get(index).copied().unwrap_or(false)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        if key.kind == KeyEventKind::Release {
            return Outcome::Continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Outcome::Close,
            KeyCode::Char('c') | KeyCode::Char('C') if ctrl => return Outcome::Close,
            KeyCode::Char('s') | KeyCode::Char('S') if ctrl => return Outcome::Submit,
            KeyCode::Enter if ctrl => return Outcome::Submit,
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            _ => match self.focus {
                Focus::Options => self.handle_options_key(key.code),
                Focus::Text if !ctrl => self.handle_text_key(key.code),
                Focus::Text => {}
            },
        }
        Outcome::Continue
    }

    fn handle_options_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.cursor + 1 < self.options.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(checked) = self.checked.get_mut(self.cursor) {
                    *checked = !*checked;
                }
            }
            _ => {}
        }
    }

    fn handle_text_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.text.push(c),
            KeyCode::Enter => self.text.push('\n'),
            KeyCode::Backspace => {
                self.text.pop();
            }
            _ => {}
        }
    }

    fn toggle_focus(&mut self) {
        // Nothing to focus besides the text field without options
        if self.options.is_empty() {
            return;
        }
        self.focus = match self.focus {
            Focus::Options => Focus::Text,
            Focus::Text => Focus::Options,
        };
    }

    /// The answer as it would be submitted now.
    pub fn result(&self) -> FeedbackResult {
        let selected = selected_options(&self.options, &self.checked);
        FeedbackResult::new(merge(&selected, &self.text))
    }
}
