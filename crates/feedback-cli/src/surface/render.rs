use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::state::{Focus, SurfaceState};

const MIN_TEXT_HEIGHT: u16 = 3;

pub(super) fn render_ui(frame: &mut Frame<'_>, state: &SurfaceState) {
    let area = frame.area();
    let prompt_height = wrapped_height(state.prompt(), area.width.saturating_sub(2))
        .saturating_add(2)
        .min(area.height / 2)
        .max(3);
    let options_height = if state.options().is_empty() {
        0
    } else {
        (state.options().len() as u16 + 2).min(area.height / 3)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(prompt_height),
            Constraint::Length(options_height),
            Constraint::Min(MIN_TEXT_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    render_prompt(frame, chunks[0], state);
    if options_height > 0 {
        render_options(frame, chunks[1], state);
    }
    render_text(frame, chunks[2], state);
    render_footer(frame, chunks[3]);
}

fn render_prompt(frame: &mut Frame<'_>, area: Rect, state: &SurfaceState) {
    let prompt = Paragraph::new(state.prompt().to_owned())
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Question "));
    frame.render_widget(prompt, area);
}

fn render_options(frame: &mut Frame<'_>, area: Rect, state: &SurfaceState) {
    let focused = state.focus() == Focus::Options;
    let visible = area.height.saturating_sub(2) as usize;
    let first = state.cursor().saturating_sub(visible.saturating_sub(1));

    let lines: Vec<Line<'_>> = state
        .options()
        .iter()
        .enumerate()
        .skip(first)
        .take(visible)
        .map(|(index, label)| {
            let mark = if state.is_checked(index) { "[x] " } else { "[ ] " };
            let style = if focused && index == state.cursor() {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![Span::styled(mark, style), Span::styled(label.as_str(), style)])
        })
        .collect();

    let options = Paragraph::new(lines).block(focus_block(" Options ", focused));
    frame.render_widget(options, area);
}

fn render_text(frame: &mut Frame<'_>, area: Rect, state: &SurfaceState) {
    let focused = state.focus() == Focus::Text;
    let inner_height = area.height.saturating_sub(2);
    let line_count = text_line_count(state.text());
    let scroll = line_count.saturating_sub(inner_height);

    let text = Paragraph::new(state.text().to_owned())
        .scroll((scroll, 0))
        .block(focus_block(" Your feedback ", focused));
    frame.render_widget(text, area);

    if focused && area.width > 2 && area.height > 2 {
        let last_line = state.text().rsplit('\n').next().unwrap_or("");
        let column = (last_line.chars().count() as u16).min(area.width - 3);
        let row = (line_count - scroll).saturating_sub(1).min(inner_height - 1);
        frame.set_cursor_position(Position::new(area.x + 1 + column, area.y + 1 + row));
    }
}

fn render_footer(frame: &mut Frame<'_>, area: Rect) {
    let muted = Style::default().fg(Color::DarkGray);
    let footer = Paragraph::new(Line::from(vec![
        Span::styled("submit (ctrl+s)", Style::default().fg(Color::Green)),
        Span::styled("  |  ", muted),
        Span::styled("focus (tab)", muted),
        Span::styled("  |  ", muted),
        Span::styled("toggle (space)", muted),
        Span::styled("  |  ", muted),
        Span::styled("close (esc/ctrl+c)", muted),
    ]));
    frame.render_widget(footer, area);
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
}

/// Rows `text` occupies when wrapped at `width` columns.
fn wrapped_height(text: &str, width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = text
        .split('\n')
        .map(|line| line.chars().count().max(1).div_ceil(width))
        .sum();
    rows.min(u16::MAX as usize) as u16
}

fn text_line_count(text: &str) -> u16 {
    text.split('\n').count().min(u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(state: &SurfaceState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|frame| render_ui(frame, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_wrapped_height() {
        assert_eq!(wrapped_height("", 10), 1);
        assert_eq!(wrapped_height("abcdefghij", 10), 1);
        assert_eq!(wrapped_height("abcdefghijk", 10), 2);
        assert_eq!(wrapped_height("a\nb\n", 10), 3);
        assert_eq!(wrapped_height("abc", 0), 3);
    }

    #[test]
    fn test_renders_prompt_and_options() {
        let state = SurfaceState::new(
            "Deploy to production?",
            vec!["Yes".to_string(), "No".to_string()],
        );
        let screen = screen(&state);

        assert!(screen.contains("Deploy to production?"));
        assert!(screen.contains("[ ] Yes"));
        assert!(screen.contains("[ ] No"));
        assert!(screen.contains("submit (ctrl+s)"));
    }

    #[test]
    fn test_renders_without_options() {
        let state = SurfaceState::new("Anything else?", Vec::new());
        let screen = screen(&state);

        assert!(screen.contains("Anything else?"));
        assert!(!screen.contains("Options"));
        assert!(screen.contains("Your feedback"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let state = SurfaceState::new("q", vec!["A".to_string()]);
        let mut terminal = Terminal::new(TestBackend::new(2, 2)).unwrap();
        terminal.draw(|frame| render_ui(frame, &state)).unwrap();
    }
}
