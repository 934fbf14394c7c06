use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, DetailView, Tab};

use super::styles;
use super::tabs::{customers, dashboard, detail};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(2), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Clientele CRM";
    let user = app
        .user_name()
        .map(|name| format!("{}  ", name))
        .unwrap_or_default();
    let help_hint = "[?] Help";

    let padding = (area.width as usize)
        .saturating_sub(title.len() + user.chars().count() + help_hint.len() + 4);

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(user, styles::list_item_style()),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn push_labels(spans: &mut Vec<Span<'static>>, labels: &[(&'static str, bool)]) {
    for (i, (label, selected)) in labels.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(*label, styles::tab_style(*selected)));
    }
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let main_tabs = [
        ("[1] Dashboard", app.current_tab == Tab::Dashboard),
        ("[2] Customers", app.current_tab == Tab::Customers),
    ];

    let mut spans = vec![Span::raw(" ")];
    push_labels(&mut spans, &main_tabs);

    // Detail sub-views on the right while a customer is open
    if app.viewing_customer.is_some() {
        let detail_tabs = [
            (DetailView::Overview.title(), app.detail_view == DetailView::Overview),
            (DetailView::Contacts.title(), app.detail_view == DetailView::Contacts),
            (DetailView::Activities.title(), app.detail_view == DetailView::Activities),
        ];
        let main_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let detail_width: usize = detail_tabs.iter().map(|(l, _)| l.len()).sum::<usize>()
            + (detail_tabs.len() - 1) * 3;
        let padding = (area.width as usize).saturating_sub(main_width + detail_width + 2);
        spans.push(Span::raw(" ".repeat(padding)));
        push_labels(&mut spans, &detail_tabs);
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    if app.viewing_customer.is_some() {
        detail::render(frame, app, area);
        return;
    }
    match app.current_tab {
        Tab::Dashboard => dashboard::render(frame, app, area),
        Tab::Customers => customers::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[u]pdate | [L]ogout | [q]uit";

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" Updated {} ", app.cache_ages.last_updated()),
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn help_line(key: &'static str, description: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(description, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 25, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Clientele CRM", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1-2", "Switch tabs"),
        help_line("←/→", "Prev/next tab or detail view"),
        help_line("↑/↓ j/k", "Navigate list"),
        help_line("Enter", "Open customer"),
        help_line("Esc", "Go back / clear search"),
        Line::from(""),
        Line::from(Span::styled(" Customers", styles::highlight_style())),
        help_line("/", "Search by name or email"),
        help_line("s", "Cycle status filter"),
        help_line("[ / ]", "Previous/next page"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("u", "Reload current view"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(72, 18, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Sign in to Clientele", styles::title_style())),
        Line::from(""),
        Line::from(Span::styled(
            " 1. Open this URL in your browser:",
            styles::highlight_style(),
        )),
    ];

    match app.login_url {
        Some(ref url) => lines.push(Line::from(Span::styled(format!(" {}", url), styles::list_item_style()))),
        None => lines.push(Line::from(Span::styled(" (unavailable)", styles::muted_style()))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " 2. Paste the address you are redirected to:",
        styles::highlight_style(),
    )));

    let cursor = if app.login_in_progress { "" } else { "▌" };
    lines.push(Line::from(vec![
        Span::styled(" [", styles::muted_style()),
        Span::styled(format!("{}{}", app.login_input, cursor), styles::selected_style()),
        Span::styled("]", styles::muted_style()),
    ]));
    lines.push(Line::from(""));

    if app.login_in_progress {
        lines.push(Line::from(Span::styled(" Signing in...", styles::muted_style())));
    } else {
        lines.push(Line::from(vec![
            Span::styled(" Enter", styles::help_key_style()),
            Span::styled(" sign in  ", styles::muted_style()),
            Span::styled("F5", styles::help_key_style()),
            Span::styled(" new link  ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" quit", styles::muted_style()),
        ]));
    }

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect_fixed(50, 20, outer), Rect::new(25, 10, 50, 20));

        // Larger than the screen is clipped
        let small = Rect::new(0, 0, 30, 10);
        assert_eq!(centered_rect_fixed(50, 20, small), Rect::new(0, 0, 30, 10));
    }
}
