// TUI event loop and terminal management. Background fetches report back
// through an mpsc channel drained once per tick; the loop is the only
// writer of the store.
use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::warn;

use repodeck_api::launcher::{self, LaunchOutcome};
use repodeck_core::fetch::{FetchCoordinator, FetchProgress, FetchReport};
use repodeck_core::models::{DetailState, QualityGate, RepoDetail, RepoKey, Repository};
use repodeck_core::Config;

use crate::app::{App, Overlay, Row, ViewMode};
use crate::ui;

/// Completion messages from background tasks.
#[derive(Debug)]
pub enum AppEvent {
    RefreshPage {
        generation: u64,
        repos: Vec<Repository>,
        done: usize,
        total: usize,
    },
    RefreshDone {
        generation: u64,
        result: Result<FetchReport, String>,
    },
    RepoRefreshed {
        key: RepoKey,
        result: Result<(Repository, Vec<String>), String>,
    },
    DetailLoaded {
        key: RepoKey,
        epoch: u64,
        result: Result<RepoDetail, String>,
    },
    QualityLoaded {
        key: RepoKey,
        result: Result<QualityGate, String>,
    },
    QualitySweepDone {
        warnings: Vec<String>,
    },
}

pub async fn run_tui(
    mut app: App,
    coordinator: FetchCoordinator,
    config: Config,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<AppEvent>(64);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    spawn_refresh(&mut app, &coordinator, &tx);

    // Main loop
    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // any keypress clears the error banner
                    app.error = None;
                    match app.overlay {
                        Overlay::Help => app.overlay = Overlay::None,
                        Overlay::Detail(_) => handle_detail_key(&mut app, key.code),
                        Overlay::None => {
                            handle_key(&mut app, key.code, &coordinator, &config, &tx)
                        }
                    }
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            handle_event(&mut app, event);
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn handle_key(
    app: &mut App,
    code: KeyCode,
    coordinator: &FetchCoordinator,
    config: &Config,
    tx: &mpsc::Sender<AppEvent>,
) {
    match code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('?') => {
            app.overlay = Overlay::Help;
        }
        KeyCode::Char('1') => app.switch_view(ViewMode::List),
        KeyCode::Char('2') => app.switch_view(ViewMode::Grid),
        KeyCode::Char('j') | KeyCode::Down => {
            ui::projection_for(app.view).move_vertical(app, 1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            ui::projection_for(app.view).move_vertical(app, -1);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            ui::projection_for(app.view).move_horizontal(app, -1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            ui::projection_for(app.view).move_horizontal(app, 1);
        }
        KeyCode::Char(' ') => {
            if let Some(key) = app.toggle_expand() {
                spawn_detail_load(app, coordinator, tx, key);
            }
        }
        KeyCode::Char('e') => {
            let collapsed_repo_row = app.view == ViewMode::List
                && matches!(app.selected_row(), Some(Row::Repo(_)))
                && app
                    .selected_key()
                    .is_some_and(|key| !app.expanded.contains(&key));

            if collapsed_repo_row {
                if let Some(key) = app.toggle_expand() {
                    spawn_detail_load(app, coordinator, tx, key);
                }
            } else if !app.open_selected_detail() {
                if let Some(key) = app.begin_detail_load() {
                    app.status = format!("Loading details for {}...", key.name);
                    spawn_detail_load(app, coordinator, tx, key);
                } else if app
                    .selected_repo()
                    .is_some_and(|r| r.detail == DetailState::Loading)
                {
                    app.status = "Details still loading...".to_string();
                } else if app.selected_repo().is_some() {
                    app.status = "No open pulls or issues".to_string();
                }
            }
        }
        KeyCode::Char('o') => {
            if let Some(url) = selected_url(app) {
                if let Err(e) = open::that(&url) {
                    app.error = Some(format!("Failed to open browser: {}", e));
                }
            }
        }
        KeyCode::Char('c') => launch_selected(app, config),
        KeyCode::Char('r') => {
            if let Some(key) = app.selected_key() {
                let want_detail = app.expanded.contains(&key);
                app.status = format!("Refreshing {}...", key.name);
                spawn_repo_refresh(coordinator, tx, key, app.sonar_enabled, want_detail);
            }
        }
        KeyCode::Char('R') => spawn_refresh(app, coordinator, tx),
        KeyCode::Char('s') => {
            if let Some(key) = app.selected_key() {
                app.status = format!("Checking quality gate for {}...", key.name);
                spawn_quality_check(coordinator, tx, key);
            }
        }
        KeyCode::Char('S') => {
            if !app.repos.is_empty() {
                app.status = "Checking quality gates...".to_string();
                let keys = app.repos.iter().map(|r| r.key.clone()).collect();
                spawn_quality_sweep(coordinator, tx, keys);
            }
        }
        _ => {}
    }
}

fn handle_detail_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc | KeyCode::Char('e') => app.close_detail(),
        KeyCode::Char('j') | KeyCode::Down => app.detail_scroll(3),
        KeyCode::Char('k') | KeyCode::Up => app.detail_scroll(-3),
        KeyCode::Char('h') | KeyCode::Left => app.detail_step(-1),
        KeyCode::Char('l') | KeyCode::Right => app.detail_step(1),
        _ => {}
    }
}

fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::RefreshPage {
            generation,
            repos,
            done,
            total,
        } => {
            if generation != app.generation {
                return;
            }
            app.set_repos(repos);
            app.status = format!("Refreshing... {}/{}", done, total);
        }
        AppEvent::RefreshDone { generation, result } => {
            if generation != app.generation {
                return;
            }
            app.refreshing = false;
            match result {
                Ok(report) => {
                    for warning in &report.warnings {
                        warn!("{}", warning);
                    }
                    app.warnings = report.warnings;
                    app.set_repos(report.repos);
                    app.status = format!("{} repositories", app.repos.len());
                }
                Err(e) => {
                    app.error = Some(format!("Refresh failed: {}", e));
                    app.status = "Refresh failed".to_string();
                }
            }
        }
        AppEvent::RepoRefreshed { key, result } => match result {
            Ok((repo, warnings)) => {
                app.replace_repo(repo);
                app.warnings.extend(warnings);
                app.status = format!("Refreshed {}", key.name);
            }
            Err(e) => {
                app.error = Some(format!("Refresh of {} failed: {}", key, e));
            }
        },
        AppEvent::DetailLoaded { key, epoch, result } => {
            app.apply_detail(&key, epoch, result);
        }
        AppEvent::QualityLoaded { key, result } => match result {
            Ok(gate) => app.apply_quality(&key, gate),
            Err(e) => {
                app.error = Some(format!("Quality gate for {} failed: {}", key, e));
            }
        },
        AppEvent::QualitySweepDone { warnings } => {
            if warnings.is_empty() {
                app.status = "Quality gates updated".to_string();
            } else {
                app.status = format!("Quality gates updated, {} warnings", warnings.len());
                for warning in &warnings {
                    warn!("{}", warning);
                }
                app.warnings.extend(warnings);
            }
        }
    }
}

/// Kick off a full refresh. Progress pages stream back as they complete;
/// the final report closes out the generation.
fn spawn_refresh(app: &mut App, coordinator: &FetchCoordinator, tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_refresh();
    app.status = "Refreshing...".to_string();

    let coordinator = coordinator.clone();
    let tx = tx.clone();
    let check_quality = app.sonar_enabled;

    tokio::spawn(async move {
        let (progress_tx, mut progress_rx) = mpsc::channel::<FetchProgress>(16);

        let forward = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(page) = progress_rx.recv().await {
                let _ = forward
                    .send(AppEvent::RefreshPage {
                        generation,
                        repos: page.repos,
                        done: page.done,
                        total: page.total,
                    })
                    .await;
            }
        });

        let result = coordinator.fetch_all(check_quality, progress_tx).await;
        // the progress sender is gone once fetch_all returns, so this join
        // guarantees pages arrive before the final report
        let _ = forwarder.await;
        let _ = tx
            .send(AppEvent::RefreshDone {
                generation,
                result: result.map_err(|e| e.to_string()),
            })
            .await;
    });
}

fn spawn_repo_refresh(
    coordinator: &FetchCoordinator,
    tx: &mpsc::Sender<AppEvent>,
    key: RepoKey,
    check_quality: bool,
    want_detail: bool,
) {
    let coordinator = coordinator.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = coordinator
            .fetch_single(&key, check_quality, want_detail)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::RepoRefreshed { key, result }).await;
    });
}

fn spawn_detail_load(
    app: &App,
    coordinator: &FetchCoordinator,
    tx: &mpsc::Sender<AppEvent>,
    key: RepoKey,
) {
    let epoch = app.detail_epoch;
    let coordinator = coordinator.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = coordinator
            .fetch_detail(&key)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::DetailLoaded { key, epoch, result }).await;
    });
}

fn spawn_quality_check(
    coordinator: &FetchCoordinator,
    tx: &mpsc::Sender<AppEvent>,
    key: RepoKey,
) {
    let coordinator = coordinator.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = coordinator
            .fetch_quality(&key)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::QualityLoaded { key, result }).await;
    });
}

fn spawn_quality_sweep(
    coordinator: &FetchCoordinator,
    tx: &mpsc::Sender<AppEvent>,
    keys: Vec<RepoKey>,
) {
    let coordinator = coordinator.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let (result_tx, mut result_rx) = mpsc::channel(16);

        let forward = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some((key, gate)) = result_rx.recv().await {
                let _ = forward
                    .send(AppEvent::QualityLoaded {
                        key,
                        result: Ok(gate),
                    })
                    .await;
            }
        });

        let warnings = coordinator.fetch_quality_all(keys, result_tx).await;
        let _ = forwarder.await;
        let _ = tx.send(AppEvent::QualitySweepDone { warnings }).await;
    });
}

/// URL for `o`: the inline item under the cursor, or the repository page.
fn selected_url(app: &App) -> Option<String> {
    let row = app.selected_row()?;
    let repo = app.repos.get(row.repo_index())?;

    let inline = match row {
        Row::Pull { item, .. } => repo
            .detail
            .loaded()
            .and_then(|d| d.pulls.get(item))
            .map(|p| p.url.clone()),
        Row::Issue { item, .. } => repo
            .detail
            .loaded()
            .and_then(|d| d.issues.get(item))
            .map(|i| i.url.clone()),
        Row::Repo(_) | Row::Placeholder(_) => None,
    };

    Some(inline.unwrap_or_else(|| repo.url.clone()))
}

/// `c`: launch the configured tool in the selected repository's checkout.
fn launch_selected(app: &mut App, config: &Config) {
    let Some(row) = app.selected_row() else {
        return;
    };
    let Some(repo) = app.repos.get(row.repo_index()) else {
        return;
    };

    let Some(path) = config.local.code_dir().map(|dir| dir.join(&repo.key.name)) else {
        app.error = Some("No local code path configured".to_string());
        return;
    };
    if !path.exists() {
        app.error = Some(format!("Repository not found locally: {}", path.display()));
        return;
    }

    let label = match row {
        Row::Pull { item, .. } => repo
            .detail
            .loaded()
            .and_then(|d| d.pulls.get(item))
            .map(|p| format!("PR #{}", p.number)),
        Row::Issue { item, .. } => repo
            .detail
            .loaded()
            .and_then(|d| d.issues.get(item))
            .map(|i| format!("#{}", i.number)),
        Row::Repo(_) | Row::Placeholder(_) => None,
    }
    .unwrap_or_else(|| repo.key.name.clone());

    match launcher::launch(&config.launcher.command, &config.launcher.args, &path) {
        LaunchOutcome::Spawned => app.status = format!("Launching {}...", label),
        LaunchOutcome::Failed(reason) => {
            app.error = Some(format!("Launch failed: {}", reason));
        }
    }
}
