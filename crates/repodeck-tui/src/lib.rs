// Terminal UI implementation using ratatui
// The dashboard face of RepoDeck

pub mod app;
pub mod detail_ui;
pub mod grid_ui;
pub mod help_ui;
pub mod list_ui;
pub mod runner;
pub mod ui;

pub use app::{App, DetailKind, DetailView, Overlay, Row, ViewMode};
pub use runner::{run_tui, AppEvent};
pub use ui::Projection;
