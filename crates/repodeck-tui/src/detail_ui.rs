// Detail overlay: one issue or pull request, full width, scrollable body.
use crate::app::{App, DetailKind, DetailView};
use crate::ui::centered_rect;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use repodeck_core::models::{Issue, PullRequest, Repository};

pub fn render_detail(frame: &mut Frame, app: &App, view: DetailView, area: Rect) {
    let Some(repo) = app.repos.get(view.repo) else {
        return;
    };
    let Some(detail) = repo.detail.loaded() else {
        return;
    };

    let popup = centered_rect(72, 80, area);
    frame.render_widget(Clear, popup);

    match view.kind {
        DetailKind::Pull => {
            let Some(pull) = detail.pulls.get(view.item) else {
                return;
            };
            render_pull(frame, repo, pull, view, detail.pulls.len(), popup);
        }
        DetailKind::Issue => {
            let Some(issue) = detail.issues.get(view.item) else {
                return;
            };
            render_issue(frame, repo, issue, view, detail.issues.len(), popup);
        }
    }
}

fn render_pull(
    frame: &mut Frame,
    repo: &Repository,
    pull: &PullRequest,
    view: DetailView,
    total: usize,
    area: Rect,
) {
    let mut lines = vec![
        Line::from(Span::styled(
            pull.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        meta_line("author", &pull.author),
        meta_line(
            "state",
            &if pull.draft {
                format!("{} (draft)", pull.state)
            } else {
                pull.state.clone()
            },
        ),
    ];

    if let (Some(head), Some(base)) = (&pull.head_ref, &pull.base_ref) {
        lines.push(meta_line("branch", &format!("{} into {}", head, base)));
    }
    lines.push(meta_line(
        "created",
        &pull.created_at.format("%Y-%m-%d").to_string(),
    ));
    lines.push(meta_line(
        "updated",
        &pull.updated_at.format("%Y-%m-%d").to_string(),
    ));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        pull.url.clone(),
        Style::default().fg(Color::Blue),
    )));

    render_popup(
        frame,
        format!(" {} · PR #{} ", repo.key.name, pull.number),
        lines,
        view,
        total,
        area,
    );
}

fn render_issue(
    frame: &mut Frame,
    repo: &Repository,
    issue: &Issue,
    view: DetailView,
    total: usize,
    area: Rect,
) {
    let mut lines = vec![
        Line::from(Span::styled(
            issue.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        meta_line("author", &issue.author),
        meta_line("state", &issue.state),
        meta_line("comments", &issue.comments.to_string()),
    ];

    if !issue.labels.is_empty() {
        lines.push(meta_line("labels", &issue.labels.join(", ")));
    }
    lines.push(meta_line(
        "created",
        &issue.created_at.format("%Y-%m-%d").to_string(),
    ));
    lines.push(Line::from(""));

    match issue.body.as_deref() {
        Some(body) if !body.trim().is_empty() => {
            for paragraph in body.lines() {
                lines.push(Line::from(paragraph.to_string()));
            }
        }
        _ => lines.push(Line::from(Span::styled(
            "(no description)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        issue.url.clone(),
        Style::default().fg(Color::Blue),
    )));

    render_popup(
        frame,
        format!(" {} · issue #{} ", repo.key.name, issue.number),
        lines,
        view,
        total,
        area,
    );
}

fn render_popup(
    frame: &mut Frame,
    title: String,
    lines: Vec<Line<'static>>,
    view: DetailView,
    total: usize,
    area: Rect,
) {
    let footer = format!(" {} of {} · h/l to browse, ESC to close ", view.item + 1, total);

    let body = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_alignment(Alignment::Left)
                .title_bottom(Line::from(footer).right_aligned())
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false })
        .scroll((view.scroll, 0));

    frame.render_widget(body, area);
}

fn meta_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:>9}: ", label),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(value.to_string(), Style::default().fg(Color::Gray)),
    ])
}
