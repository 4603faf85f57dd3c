// List projection: one row per repository, with issues and pull requests
// spliced in below expanded rows.
use crate::app::{App, Row};
use crate::ui::{color_for, Projection};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use repodeck_core::models::{DetailState, GateState, GitState, Issue, PullRequest, Repository};

pub struct ListProjection;

impl Projection for ListProjection {
    fn render(&self, frame: &mut Frame, app: &App, area: Rect) {
        render_list(frame, app, area);
    }

    fn move_vertical(&self, app: &mut App, delta: isize) {
        let len = app.visible_rows().len();
        if len == 0 {
            return;
        }
        let next = app.cursor as isize + delta;
        if next >= 0 && (next as usize) < len {
            app.cursor = next as usize;
        }
    }

    fn move_horizontal(&self, _app: &mut App, _delta: isize) {}
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let rows = app.visible_rows();

    if rows.is_empty() {
        let text = if app.refreshing {
            "Fetching repositories..."
        } else {
            "No repositories. Press R to refresh."
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Repositories "));
        frame.render_widget(empty, area);
        return;
    }

    let name_width = app
        .repos
        .iter()
        .map(|r| r.key.name.len())
        .max()
        .unwrap_or(0)
        .min(40);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| match row {
            Row::Repo(i) => {
                let repo = &app.repos[*i];
                repo_item(repo, app.expanded.contains(&repo.key), name_width)
            }
            Row::Pull { repo, item } => {
                let detail = app.repos[*repo].detail.loaded();
                match detail.and_then(|d| d.pulls.get(*item)) {
                    Some(pull) => pull_item(pull),
                    None => placeholder_item(&app.repos[*repo].detail),
                }
            }
            Row::Issue { repo, item } => {
                let detail = app.repos[*repo].detail.loaded();
                match detail.and_then(|d| d.issues.get(*item)) {
                    Some(issue) => issue_item(issue),
                    None => placeholder_item(&app.repos[*repo].detail),
                }
            }
            Row::Placeholder(i) => placeholder_item(&app.repos[*i].detail),
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.cursor.min(rows.len() - 1)));

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Repositories ({}) ", app.repos.len())),
        )
        .highlight_style(Style::default().bg(Color::Rgb(68, 71, 90)));

    frame.render_stateful_widget(list, area, &mut state);
}

fn repo_item(repo: &Repository, expanded: bool, name_width: usize) -> ListItem<'static> {
    let dot = Span::styled(
        "● ",
        Style::default().fg(color_for(repo.status_color())),
    );
    let marker = Span::styled(
        if expanded { "▾ " } else { "  " },
        Style::default().fg(Color::DarkGray),
    );
    let name = Span::styled(
        format!("{:<width$}", repo.key.name, width = name_width),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let mut spans = vec![
        dot,
        marker,
        name,
        Span::raw("  "),
        gate_span(repo.gate.state, repo.gate.checked),
        Span::raw("  "),
        Span::styled(
            format!("{:>3} issues", repo.open_issues),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        git_span(&repo.git),
    ];

    if let Some(description) = &repo.description {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            truncate(description, 48),
            Style::default().fg(Color::DarkGray),
        ));
    }

    ListItem::new(Line::from(spans))
}

fn pull_item(pull: &PullRequest) -> ListItem<'static> {
    let mut spans = vec![
        Span::raw("      "),
        Span::styled("⇄ ", Style::default().fg(Color::Magenta)),
        Span::styled(
            format!("#{:<5}", pull.number),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(truncate(&pull.title, 64)),
    ];
    if pull.draft {
        spans.push(Span::styled(
            " [draft]",
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(Span::styled(
        format!("  ({})", pull.author),
        Style::default().fg(Color::DarkGray),
    ));

    ListItem::new(Line::from(spans))
}

fn issue_item(issue: &Issue) -> ListItem<'static> {
    let mut spans = vec![
        Span::raw("      "),
        Span::styled("◦ ", Style::default().fg(Color::Blue)),
        Span::styled(
            format!("#{:<5}", issue.number),
            Style::default().fg(Color::Blue),
        ),
        Span::raw(truncate(&issue.title, 64)),
    ];
    for label in issue.labels.iter().take(3) {
        spans.push(Span::styled(
            format!(" [{}]", label),
            Style::default().fg(Color::Yellow),
        ));
    }
    if issue.comments > 0 {
        spans.push(Span::styled(
            format!(" 💬{}", issue.comments),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(Span::styled(
        format!("  ({})", issue.author),
        Style::default().fg(Color::DarkGray),
    ));

    ListItem::new(Line::from(spans))
}

fn placeholder_item(detail: &DetailState) -> ListItem<'static> {
    let text = match detail {
        DetailState::Loading => "      … loading",
        DetailState::Loaded(_) => "      no open pulls or issues",
        DetailState::Unloaded | DetailState::Stale => "      … not loaded",
    };
    ListItem::new(Line::from(Span::styled(
        text,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )))
}

fn gate_span(state: GateState, checked: bool) -> Span<'static> {
    match state {
        GateState::Passed => Span::styled("✓ gate", Style::default().fg(Color::Green)),
        GateState::Warning => Span::styled("! gate", Style::default().fg(Color::Yellow)),
        GateState::Failed => Span::styled("✗ gate", Style::default().fg(Color::Red)),
        GateState::Unknown => {
            let glyph = if checked { "· gate" } else { "? gate" };
            Span::styled(glyph, Style::default().fg(Color::DarkGray))
        }
    }
}

fn git_span(git: &GitState) -> Span<'static> {
    match git {
        GitState::NotCloned => Span::styled("—", Style::default().fg(Color::DarkGray)),
        GitState::Clean { branch } => Span::styled(
            branch.clone().unwrap_or_else(|| "?".to_string()),
            Style::default().fg(Color::Green),
        ),
        GitState::Dirty { branch } => Span::styled(
            format!("{}*", branch.clone().unwrap_or_else(|| "?".to_string())),
            Style::default().fg(Color::Yellow),
        ),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
