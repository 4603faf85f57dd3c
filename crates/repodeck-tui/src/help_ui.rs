// Help overlay: static keybinding reference.
use crate::ui::centered_rect;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn render_help(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(56, 70, area);
    frame.render_widget(Clear, popup);

    let help = Paragraph::new(keybinding_lines())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Keybindings ")
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Left);

    frame.render_widget(help, popup);
}

fn keybinding_lines() -> Vec<Line<'static>> {
    let mut lines = vec![section("Navigation")];
    lines.extend([
        binding("j / k, ↓ / ↑", "move down / up"),
        binding("h / l, ← / →", "move left / right (grid)"),
        binding("1 / 2", "list view / grid view"),
        binding("SPACE", "expand or collapse (list)"),
    ]);
    lines.push(section("Actions"));
    lines.extend([
        binding("e", "open details"),
        binding("o", "open in browser"),
        binding("c", "launch editor in checkout"),
        binding("r", "refresh selected repository"),
        binding("R", "refresh everything"),
        binding("s", "check quality gate (selected)"),
        binding("S", "check quality gates (all)"),
    ]);
    lines.push(section("Other"));
    lines.extend([
        binding("?", "this help"),
        binding("q", "quit"),
    ]);
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  press any key to close",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn section(title: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(
            title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ])
}

fn binding(keys: &'static str, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("    {:<16}", keys), Style::default().fg(Color::Cyan)),
        Span::styled(action, Style::default().fg(Color::Gray)),
    ])
}
