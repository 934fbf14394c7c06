//! Per-screen rendering.

pub mod customers;
pub mod dashboard;
pub mod detail;

use ratatui::text::{Line, Span};

use crate::app::LoadState;
use crate::ui::styles;

/// One-line notice for a view's loading/failed state, or `None` when there
/// is nothing to say.
pub(crate) fn load_notice(state: &LoadState) -> Option<Line<'static>> {
    match state {
        LoadState::Idle => None,
        LoadState::Loading => Some(Line::from(Span::styled(" Loading...", styles::muted_style()))),
        LoadState::Failed(message) => Some(Line::from(vec![
            Span::styled(format!(" {} ", message), styles::error_style()),
            Span::styled("[u]", styles::help_key_style()),
            Span::styled(" retry", styles::muted_style()),
        ])),
    }
}
