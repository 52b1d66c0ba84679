pub mod schedule_input;

use tui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::state::RootClasses;

/// Colors for one theme. Chosen from the root class list so the screens
/// follow whatever theme was applied at startup or toggled since.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub muted: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub error: Color,
}

const DARK: Palette = Palette {
    fg: Color::White,
    bg: Color::Black,
    accent: Color::Cyan,
    muted: Color::Gray,
    highlight_fg: Color::White,
    highlight_bg: Color::Blue,
    error: Color::LightRed,
};

const LIGHT: Palette = Palette {
    fg: Color::Black,
    bg: Color::White,
    accent: Color::Blue,
    muted: Color::DarkGray,
    highlight_fg: Color::White,
    highlight_bg: Color::Blue,
    error: Color::Red,
};

impl Palette {
    pub fn for_root(root: &RootClasses) -> Self {
        if root.contains("dark") {
            DARK
        } else {
            LIGHT
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default().fg(self.accent)
    }
}

/// Header, body and status line.
pub fn frame_layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

const LOADING_LABEL: &str = "Carregando…";

pub fn render_header<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    company: &str,
    user: Option<&str>,
    loading: bool,
    palette: &Palette,
) {
    let mut spans = vec![Span::styled(
        company.to_string(),
        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
    )];
    if let Some(user) = user {
        spans.push(Span::styled(format!("  ·  {user}"), Style::default().fg(palette.muted)));
    }
    if loading {
        spans.push(Span::styled(format!("  {LOADING_LABEL}"), Style::default().fg(palette.accent)));
    }

    let header = Paragraph::new(Spans::from(spans))
        .style(palette.base())
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

/// One-line status: the last error if any, otherwise `info`.
pub fn render_status<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    error: Option<&str>,
    info: Option<&str>,
    palette: &Palette,
) {
    let line = match (error, info) {
        (Some(error), _) => Span::styled(error.to_string(), Style::default().fg(palette.error)),
        (None, Some(info)) => Span::styled(info.to_string(), Style::default().fg(palette.muted)),
        (None, None) => Span::raw(""),
    };
    f.render_widget(Paragraph::new(Spans::from(line)).style(palette.base()), area);
}

pub fn render_confirmation<B: Backend>(f: &mut Frame<B>, area: Rect, title: &str, lines: &[&str], palette: &Palette) {
    let popup_area = centered_rect(50, 30, area);

    let mut text = vec![Spans::from("")];
    text.extend(lines.iter().map(|line| Spans::from(*line)));
    text.push(Spans::from(""));
    text.push(Spans::from("<S> Sim  <N> Não"));

    let popup = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .style(palette.base());

    f.render_widget(tui::widgets::Clear, popup_area);
    f.render_widget(popup, popup_area);
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
