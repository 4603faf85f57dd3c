// Top-level rendering: header, active projection, status bar, overlays.
use crate::app::{App, Overlay, ViewMode};
use crate::{detail_ui, grid_ui, help_ui, list_ui};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// A way of laying the repository table onto the screen. Each projection
/// owns the cursor arithmetic for its index space, so movement stays sane
/// when the user flips between views.
pub trait Projection {
    fn render(&self, frame: &mut Frame, app: &App, area: Rect);
    fn move_vertical(&self, app: &mut App, delta: isize);
    fn move_horizontal(&self, app: &mut App, delta: isize);
}

pub fn projection_for(view: ViewMode) -> &'static dyn Projection {
    match view {
        ViewMode::List => &list_ui::ListProjection,
        ViewMode::Grid => &grid_ui::GridProjection,
    }
}

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    projection_for(app.view).render(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    match app.overlay {
        Overlay::Help => help_ui::render_help(frame, frame.area()),
        Overlay::Detail(view) => detail_ui::render_detail(frame, app, view, frame.area()),
        Overlay::None => {}
    }
}

/// Rect centered in `r`, sized as a percentage of it. Used by the overlays.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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

pub fn color_for(color: repodeck_core::models::StatusColor) -> Color {
    use repodeck_core::models::StatusColor;
    match color {
        StatusColor::Red => Color::Red,
        StatusColor::Yellow => Color::Yellow,
        StatusColor::Blue => Color::Blue,
        StatusColor::Green => Color::Green,
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let view_name = match app.view {
        ViewMode::List => "list",
        ViewMode::Grid => "grid",
    };

    let mut spans = vec![
        Span::styled(
            "RepoDeck",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("{} repositories", app.repos.len()),
            Style::default().fg(Color::White),
        ),
        Span::styled("  •  ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} open issues", app.issues_total()),
            Style::default().fg(Color::White),
        ),
        Span::styled("  •  ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("view: {}", view_name),
            Style::default().fg(Color::Gray),
        ),
        Span::styled("  •  ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            if app.sonar_enabled {
                "quality: on"
            } else {
                "quality: off"
            },
            Style::default().fg(Color::Gray),
        ),
    ];
    if app.refreshing {
        spans.push(Span::styled(
            "  ⟳ refreshing",
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(header, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if let Some(error) = &app.error {
        spans.push(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        ));
    } else {
        if !app.status.is_empty() {
            spans.push(Span::styled(
                app.status.as_str(),
                Style::default().fg(Color::Yellow),
            ));
            spans.push(Span::raw("  "));
        }
        if !app.warnings.is_empty() {
            spans.push(Span::styled(
                format!("{} warnings", app.warnings.len()),
                Style::default().fg(Color::Magenta),
            ));
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(hints(app), Style::default().fg(Color::DarkGray)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn hints(app: &App) -> &'static str {
    match app.overlay {
        Overlay::Detail(_) => "j/k: scroll | h/l: prev/next | ESC: close",
        Overlay::Help => "any key: close",
        Overlay::None => {
            "j/k: move | SPACE: expand | e: details | o: open | c: launch | r/R: refresh | s/S: quality | 1/2: view | ?: help | q: quit"
        }
    }
}
