// Grid projection: a three-column card wall for scanning many repositories
// at once. No expansion here; `e` opens the detail overlay instead.
use crate::app::App;
use crate::ui::{color_for, Projection};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use repodeck_core::models::{GateState, GitState, Repository};

pub const GRID_COLS: usize = 3;

const CELL_HEIGHT: u16 = 4;

pub struct GridProjection;

impl Projection for GridProjection {
    fn render(&self, frame: &mut Frame, app: &App, area: Rect) {
        render_grid(frame, app, area);
    }

    fn move_vertical(&self, app: &mut App, delta: isize) {
        step(app, delta * GRID_COLS as isize);
    }

    fn move_horizontal(&self, app: &mut App, delta: isize) {
        step(app, delta);
    }
}

/// Move only when the target cell exists; the grid never wraps.
fn step(app: &mut App, delta: isize) {
    let len = app.repos.len();
    if len == 0 {
        return;
    }
    let next = app.cursor as isize + delta;
    if next >= 0 && (next as usize) < len {
        app.cursor = next as usize;
    }
}

fn render_grid(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Repositories ({}) ", app.repos.len()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.repos.is_empty() {
        let text = if app.refreshing {
            "Fetching repositories..."
        } else {
            "No repositories. Press R to refresh."
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let visible = (inner.height / CELL_HEIGHT).max(1) as usize;
    let total_rows = app.repos.len().div_ceil(GRID_COLS);
    let cursor_row = app.cursor.min(app.repos.len() - 1) / GRID_COLS;
    // Scroll just far enough to keep the cursor's row on screen.
    let first_row = cursor_row.saturating_sub(visible.saturating_sub(1));

    let cell_width = inner.width / GRID_COLS as u16;
    if cell_width == 0 {
        return;
    }

    for (screen_row, grid_row) in (first_row..total_rows).take(visible).enumerate() {
        let y = inner.y + screen_row as u16 * CELL_HEIGHT;
        let height = CELL_HEIGHT.min(inner.bottom().saturating_sub(y));
        if height < 3 {
            break;
        }

        for col in 0..GRID_COLS {
            let index = grid_row * GRID_COLS + col;
            let Some(repo) = app.repos.get(index) else {
                break;
            };
            let cell = Rect {
                x: inner.x + col as u16 * cell_width,
                y,
                width: cell_width,
                height,
            };
            render_cell(frame, repo, index == app.cursor, cell);
        }
    }
}

fn render_cell(frame: &mut Frame, repo: &Repository, selected: bool, area: Rect) {
    let accent = color_for(repo.status_color());
    let border_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(accent)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(
            format!(" {} ", repo.key.name),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let gate = match repo.gate.state {
        GateState::Passed => Span::styled("✓", Style::default().fg(Color::Green)),
        GateState::Warning => Span::styled("!", Style::default().fg(Color::Yellow)),
        GateState::Failed => Span::styled("✗", Style::default().fg(Color::Red)),
        GateState::Unknown => Span::styled("?", Style::default().fg(Color::DarkGray)),
    };
    let git = match &repo.git {
        GitState::NotCloned => Span::styled("not cloned", Style::default().fg(Color::DarkGray)),
        GitState::Clean { branch } => Span::styled(
            branch.clone().unwrap_or_else(|| "?".to_string()),
            Style::default().fg(Color::Green),
        ),
        GitState::Dirty { branch } => Span::styled(
            format!("{}*", branch.clone().unwrap_or_else(|| "?".to_string())),
            Style::default().fg(Color::Yellow),
        ),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("● ", Style::default().fg(accent)),
            Span::styled(
                format!("{} issues  ", repo.open_issues),
                Style::default().fg(Color::White),
            ),
            gate,
        ]),
        Line::from(vec![
            git,
            Span::styled(
                repo.language
                    .as_deref()
                    .map(|l| format!("  {}", l))
                    .unwrap_or_default(),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ViewMode;
    use repodeck_core::models::{DetailState, QualityGate, RepoKey};

    fn grid_app(count: usize) -> App {
        let repos = (0..count)
            .map(|i| Repository {
                key: RepoKey::new("acme", format!("repo-{}", i)),
                url: String::new(),
                description: None,
                language: None,
                open_issues: 0,
                gate: QualityGate::unchecked(),
                git: GitState::NotCloned,
                detail: DetailState::Unloaded,
            })
            .collect();

        let mut app = App::new(false);
        app.set_repos(repos);
        app.switch_view(ViewMode::Grid);
        app
    }

    #[test]
    fn vertical_steps_by_a_full_row() {
        let mut app = grid_app(7);
        let projection = GridProjection;

        projection.move_vertical(&mut app, 1);
        assert_eq!(app.cursor, 3);
        projection.move_vertical(&mut app, 1);
        assert_eq!(app.cursor, 6);
        projection.move_vertical(&mut app, -1);
        projection.move_vertical(&mut app, -1);
        assert_eq!(app.cursor, 0);
        projection.move_vertical(&mut app, -1);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn vertical_stops_where_no_cell_exists_below() {
        let mut app = grid_app(7);
        app.cursor = 4;

        GridProjection.move_vertical(&mut app, 1);
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn horizontal_clamps_at_both_ends() {
        let mut app = grid_app(7);
        let projection = GridProjection;

        projection.move_horizontal(&mut app, -1);
        assert_eq!(app.cursor, 0);
        projection.move_horizontal(&mut app, 1);
        assert_eq!(app.cursor, 1);

        app.cursor = 6;
        projection.move_horizontal(&mut app, 1);
        assert_eq!(app.cursor, 6);
    }

    #[test]
    fn empty_grid_ignores_motion() {
        let mut app = grid_app(0);
        GridProjection.move_vertical(&mut app, 1);
        GridProjection.move_horizontal(&mut app, 1);
        assert_eq!(app.cursor, 0);
    }
}
