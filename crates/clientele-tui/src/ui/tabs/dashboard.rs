use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use clientele_core::utils::format_date;

use crate::app::App;
use crate::ui::styles;
use crate::ui::tabs::load_notice;

/// Render the Dashboard tab: metric cards above the recent customers table
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Metric cards
            Constraint::Length(1), // Load notice
            Constraint::Min(5),    // Recent customers
        ])
        .split(area);

    render_cards(frame, app, chunks[0]);
    if let Some(notice) = load_notice(&app.dashboard_load) {
        frame.render_widget(Paragraph::new(notice), chunks[1]);
    }
    render_recent(frame, app, chunks[2]);
}

fn metric_card(frame: &mut Frame, area: Rect, title: &str, value: u64, caption: String) {
    let lines = vec![
        Line::from(Span::styled(format!(" {}", value), styles::metric_value_style())),
        Line::from(Span::styled(format!(" {}", caption), styles::muted_style())),
    ];
    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_cards(frame: &mut Frame, app: &App, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let metrics = &app.dashboard;
    metric_card(
        frame,
        cards[0],
        "Total Customers",
        metrics.total_customers,
        "all records".to_string(),
    );
    metric_card(
        frame,
        cards[1],
        "Active Customers",
        metrics.active_customers,
        format!("{}% of total", metrics.active_share_percent()),
    );
    metric_card(
        frame,
        cards[2],
        "New Customers",
        metrics.new_customers,
        "this month".to_string(),
    );
}

fn render_recent(frame: &mut Frame, app: &App, area: Rect) {
    let recent = &app.dashboard.recent_customers;

    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Company / Email"),
        Cell::from("Status"),
        Cell::from("Created"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = recent
        .iter()
        .map(|customer| {
            Row::new(vec![
                Cell::from(customer.name.clone()),
                Cell::from(customer.subtitle().to_string()),
                Cell::from(Span::styled(
                    customer.status.label(),
                    styles::status_style(customer.status),
                )),
                Cell::from(format_date(&customer.created_at)),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Percentage(30),
        Constraint::Fill(2),
        Constraint::Length(10),
        Constraint::Length(14),
    ];

    let title = if recent.is_empty() {
        " Recent Customers - none yet ".to_string()
    } else {
        " Recent Customers - [Enter] open ".to_string()
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !recent.is_empty() {
        state.select(Some(app.dashboard_selection));
    }
    frame.render_stateful_widget(table, area, &mut state);
}
