// TUI application state: the repository table, cursor, expansion set, and
// overlay stack. All mutation goes through methods here so background task
// completions and keypresses cannot leave the view inconsistent.
use std::collections::{HashMap, HashSet};

use repodeck_core::models::{DetailState, QualityGate, RepoDetail, RepoKey, Repository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    List,
    Grid,
}

/// What the cursor can rest on in list view. Expanding a repository inserts
/// its pull requests and issues as selectable rows right below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Repo(usize),
    Pull { repo: usize, item: usize },
    Issue { repo: usize, item: usize },
    /// Expanded repository with nothing to show yet (loading, or empty).
    Placeholder(usize),
}

impl Row {
    pub fn repo_index(&self) -> usize {
        match *self {
            Row::Repo(i) | Row::Placeholder(i) => i,
            Row::Pull { repo, .. } | Row::Issue { repo, .. } => repo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    Pull,
    Issue,
}

/// An open item modal: which repository, which kind, which item, and how
/// far the body is scrolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailView {
    pub repo: usize,
    pub kind: DetailKind,
    pub item: usize,
    pub scroll: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    Detail(DetailView),
}

pub struct App {
    pub repos: Vec<Repository>,
    pub expanded: HashSet<RepoKey>,
    pub view: ViewMode,
    /// Index into the active projection: visible rows in list view, the
    /// repository vector in grid view.
    pub cursor: usize,
    pub status: String,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub refreshing: bool,
    pub sonar_enabled: bool,
    /// Bumped per full refresh; completions carrying an older generation
    /// are dropped because a newer refresh owns the table.
    pub generation: u64,
    /// Bumped whenever the table is replaced; in-flight detail loads from
    /// before the bump no longer apply.
    pub detail_epoch: u64,
    /// Last checked gate per repository, so a refresh without the quality
    /// pass does not blank out verdicts we already have.
    pub gate_snapshot: HashMap<RepoKey, QualityGate>,
    pub overlay: Overlay,
    pub should_quit: bool,
}

impl App {
    pub fn new(sonar_enabled: bool) -> Self {
        Self {
            repos: Vec::new(),
            expanded: HashSet::new(),
            view: ViewMode::List,
            cursor: 0,
            status: "Starting...".to_string(),
            error: None,
            warnings: Vec::new(),
            refreshing: false,
            sonar_enabled,
            generation: 0,
            detail_epoch: 0,
            gate_snapshot: HashMap::new(),
            overlay: Overlay::None,
            should_quit: false,
        }
    }

    /// Everything the list view shows, top to bottom.
    pub fn visible_rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for (i, repo) in self.repos.iter().enumerate() {
            rows.push(Row::Repo(i));
            if self.expanded.contains(&repo.key) {
                match repo.detail.loaded() {
                    Some(detail) if !detail.pulls.is_empty() || !detail.issues.is_empty() => {
                        for item in 0..detail.pulls.len() {
                            rows.push(Row::Pull { repo: i, item });
                        }
                        for item in 0..detail.issues.len() {
                            rows.push(Row::Issue { repo: i, item });
                        }
                    }
                    _ => rows.push(Row::Placeholder(i)),
                }
            }
        }
        rows
    }

    pub fn selected_row(&self) -> Option<Row> {
        match self.view {
            ViewMode::List => self.visible_rows().get(self.cursor).copied(),
            ViewMode::Grid => {
                if self.repos.is_empty() {
                    None
                } else {
                    Some(Row::Repo(self.cursor.min(self.repos.len() - 1)))
                }
            }
        }
    }

    pub fn selected_repo_index(&self) -> Option<usize> {
        self.selected_row().map(|row| row.repo_index())
    }

    pub fn selected_repo(&self) -> Option<&Repository> {
        self.selected_repo_index().and_then(|i| self.repos.get(i))
    }

    pub fn selected_key(&self) -> Option<RepoKey> {
        self.selected_repo().map(|r| r.key.clone())
    }

    pub fn issues_total(&self) -> u32 {
        self.repos.iter().map(|r| r.open_issues).sum()
    }

    /// Start a full refresh: bump the generation so completions of any
    /// previous refresh are ignored, and remember checked gates so the new
    /// data does not blank them out.
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        self.refreshing = true;
        for repo in &self.repos {
            if repo.gate.checked {
                self.gate_snapshot
                    .insert(repo.key.clone(), repo.gate.clone());
            }
        }
        self.generation
    }

    /// Replace the table with a fresh snapshot. Checked gates carry over
    /// onto records the fetch left unchecked, surviving loaded details turn
    /// stale, expansion is pruned to survivors, and the cursor follows the
    /// selected repository through the re-sort.
    pub fn set_repos(&mut self, incoming: Vec<Repository>) {
        let selected = self.selected_key();
        let mut repos = incoming;

        for repo in &mut repos {
            let previous = self.repos.iter().find(|r| r.key == repo.key);
            if !repo.gate.checked {
                let remembered = self
                    .gate_snapshot
                    .get(&repo.key)
                    .cloned()
                    .or_else(|| previous.filter(|r| r.gate.checked).map(|r| r.gate.clone()));
                if let Some(gate) = remembered {
                    repo.gate = gate;
                }
            }
            if repo.detail == DetailState::Unloaded {
                if let Some(previous) = previous {
                    if matches!(previous.detail, DetailState::Loaded(_) | DetailState::Stale) {
                        repo.detail = DetailState::Stale;
                    }
                }
            }
        }

        // Stable sort: rank, then open issues, then listing order.
        repos.sort_by(|a, b| {
            a.severity_rank()
                .cmp(&b.severity_rank())
                .then(b.open_issues.cmp(&a.open_issues))
        });

        self.expanded.retain(|key| repos.iter().any(|r| &r.key == key));
        self.detail_epoch += 1;
        if matches!(self.overlay, Overlay::Detail(_)) {
            self.overlay = Overlay::None;
        }
        self.repos = repos;
        self.restore_cursor(selected);
    }

    /// Swap one repository in place, keeping its table position. Used by
    /// single-repo refresh so the row does not jump around.
    pub fn replace_repo(&mut self, incoming: Repository) {
        let Some(pos) = self.repos.iter().position(|r| r.key == incoming.key) else {
            return;
        };

        let mut incoming = incoming;
        let old = &self.repos[pos];
        if !incoming.gate.checked && old.gate.checked {
            incoming.gate = old.gate.clone();
        }
        if incoming.detail == DetailState::Unloaded
            && matches!(old.detail, DetailState::Loaded(_) | DetailState::Stale)
        {
            incoming.detail = DetailState::Stale;
        }

        self.repos[pos] = incoming;
        self.ensure_overlay();
        self.clamp_cursor();
    }

    /// Apply a quality verdict. Never re-sorts; ordering changes only on a
    /// full refresh.
    pub fn apply_quality(&mut self, key: &RepoKey, gate: QualityGate) {
        if let Some(repo) = self.repos.iter_mut().find(|r| &r.key == key) {
            repo.gate = gate;
        }
    }

    /// Toggle expansion of the selected repository (list view only).
    /// Returns the key when the caller should start a detail fetch.
    pub fn toggle_expand(&mut self) -> Option<RepoKey> {
        if self.view != ViewMode::List {
            return None;
        }
        let index = self.selected_repo_index()?;
        let key = self.repos[index].key.clone();

        if self.expanded.contains(&key) {
            self.expanded.remove(&key);
            let rows = self.visible_rows();
            if let Some(pos) = rows
                .iter()
                .position(|row| matches!(row, Row::Repo(i) if *i == index))
            {
                self.cursor = pos;
            }
            return None;
        }

        self.expanded.insert(key.clone());
        match self.repos[index].detail {
            DetailState::Unloaded | DetailState::Stale => {
                self.repos[index].detail = DetailState::Loading;
                Some(key)
            }
            DetailState::Loading | DetailState::Loaded(_) => None,
        }
    }

    /// Mark the selected repository's detail as loading without expanding
    /// it. Grid view uses this for on-demand modals.
    pub fn begin_detail_load(&mut self) -> Option<RepoKey> {
        let index = self.selected_repo_index()?;
        match self.repos[index].detail {
            DetailState::Unloaded | DetailState::Stale => {
                self.repos[index].detail = DetailState::Loading;
                Some(self.repos[index].key.clone())
            }
            _ => None,
        }
    }

    /// Land a finished detail load. Ignored unless the epoch still matches,
    /// the repository is still present, and it is still waiting.
    pub fn apply_detail(
        &mut self,
        key: &RepoKey,
        epoch: u64,
        result: Result<RepoDetail, String>,
    ) {
        if epoch != self.detail_epoch {
            return;
        }
        let Some(index) = self.repos.iter().position(|r| &r.key == key) else {
            return;
        };
        if self.repos[index].detail != DetailState::Loading {
            return;
        }

        match result {
            Ok(detail) => self.repos[index].detail = DetailState::Loaded(detail),
            Err(msg) => {
                self.repos[index].detail = DetailState::Unloaded;
                self.expanded.remove(key);
                self.error = Some(msg);
                self.clamp_cursor();
            }
        }
    }

    /// Open the modal for the selected inline row, or the first pull (then
    /// first issue) of the selected repository. False when there is nothing
    /// loaded to show.
    pub fn open_selected_detail(&mut self) -> bool {
        match self.selected_row() {
            Some(Row::Pull { repo, item }) => {
                self.overlay = Overlay::Detail(DetailView {
                    repo,
                    kind: DetailKind::Pull,
                    item,
                    scroll: 0,
                });
                true
            }
            Some(Row::Issue { repo, item }) => {
                self.overlay = Overlay::Detail(DetailView {
                    repo,
                    kind: DetailKind::Issue,
                    item,
                    scroll: 0,
                });
                true
            }
            Some(Row::Repo(_)) | Some(Row::Placeholder(_)) => self.open_first_detail(),
            None => false,
        }
    }

    fn open_first_detail(&mut self) -> bool {
        let Some(index) = self.selected_repo_index() else {
            return false;
        };
        let Some(detail) = self.repos[index].detail.loaded() else {
            return false;
        };

        let kind = if !detail.pulls.is_empty() {
            DetailKind::Pull
        } else if !detail.issues.is_empty() {
            DetailKind::Issue
        } else {
            return false;
        };

        self.overlay = Overlay::Detail(DetailView {
            repo: index,
            kind,
            item: 0,
            scroll: 0,
        });
        true
    }

    /// Close the modal, returning the cursor to the row it came from when
    /// that row still exists.
    pub fn close_detail(&mut self) {
        let Overlay::Detail(view) = self.overlay else {
            self.overlay = Overlay::None;
            return;
        };
        self.overlay = Overlay::None;

        if self.view != ViewMode::List {
            return;
        }
        let rows = self.visible_rows();
        let target = rows.iter().position(|row| match (view.kind, row) {
            (DetailKind::Pull, Row::Pull { repo, item }) => {
                *repo == view.repo && *item == view.item
            }
            (DetailKind::Issue, Row::Issue { repo, item }) => {
                *repo == view.repo && *item == view.item
            }
            _ => false,
        });
        if let Some(pos) = target {
            self.cursor = pos;
        } else {
            self.clamp_cursor();
        }
    }

    pub fn detail_scroll(&mut self, delta: i32) {
        if let Overlay::Detail(view) = &mut self.overlay {
            view.scroll = view.scroll.saturating_add_signed(delta as i16);
        }
    }

    /// Step to the previous or next item of the same kind in the modal.
    pub fn detail_step(&mut self, delta: isize) {
        let Overlay::Detail(view) = &mut self.overlay else {
            return;
        };
        let Some(repo) = self.repos.get(view.repo) else {
            return;
        };
        let Some(detail) = repo.detail.loaded() else {
            return;
        };
        let count = match view.kind {
            DetailKind::Pull => detail.pulls.len(),
            DetailKind::Issue => detail.issues.len(),
        };

        let next = view.item as isize + delta;
        if next >= 0 && (next as usize) < count {
            view.item = next as usize;
            view.scroll = 0;
        }
    }

    pub fn switch_view(&mut self, view: ViewMode) {
        if self.view == view {
            return;
        }
        let selected = self.selected_key();
        self.view = view;
        self.restore_cursor(selected);
    }

    /// Point the cursor at the given repository in the current projection,
    /// falling back to a clamp when it is gone.
    fn restore_cursor(&mut self, selected: Option<RepoKey>) {
        let target = selected.and_then(|key| self.repos.iter().position(|r| r.key == key));

        match self.view {
            ViewMode::List => {
                if let Some(index) = target {
                    let rows = self.visible_rows();
                    if let Some(pos) = rows
                        .iter()
                        .position(|row| matches!(row, Row::Repo(i) if *i == index))
                    {
                        self.cursor = pos;
                        return;
                    }
                }
                self.clamp_cursor();
            }
            ViewMode::Grid => {
                if let Some(index) = target {
                    self.cursor = index;
                    return;
                }
                self.clamp_cursor();
            }
        }
    }

    fn clamp_cursor(&mut self) {
        let len = match self.view {
            ViewMode::List => self.visible_rows().len(),
            ViewMode::Grid => self.repos.len(),
        };
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    /// Drop the modal if a table change pulled the data out from under it.
    fn ensure_overlay(&mut self) {
        if let Overlay::Detail(view) = self.overlay {
            let valid = self
                .repos
                .get(view.repo)
                .and_then(|r| r.detail.loaded())
                .map(|d| match view.kind {
                    DetailKind::Pull => view.item < d.pulls.len(),
                    DetailKind::Issue => view.item < d.issues.len(),
                })
                .unwrap_or(false);
            if !valid {
                self.overlay = Overlay::None;
            }
        }
    }
}
