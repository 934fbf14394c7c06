use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use clientele_core::models::Customer;
use clientele_core::utils::{format_date, truncate};

use crate::app::{App, AppState};
use crate::ui::styles;
use crate::ui::tabs::load_notice;

/// Render the Customers tab: filter bar, table with preview panel, pager
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Filters
            Constraint::Min(5),    // Table + preview
            Constraint::Length(1), // Pager
        ])
        .split(area);

    render_filter_bar(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);
    render_table(frame, app, body[0]);
    render_preview(frame, app.customer_page.data.get(app.customer_selection), body[1]);

    render_pager(frame, app, chunks[2]);
}

fn render_filter_bar(frame: &mut Frame, app: &App, area: Rect) {
    let searching = app.state == AppState::Searching;
    let search_text = if searching {
        format!("{}▌", app.search_input)
    } else if app.filters.search_query.is_empty() {
        "-".to_string()
    } else {
        app.filters.search_query.clone()
    };

    let mut spans = vec![
        Span::styled(" [/] Search: ", styles::muted_style()),
        Span::styled(
            search_text,
            if searching { styles::search_style() } else { styles::list_item_style() },
        ),
        Span::styled("   [s] Status: ", styles::muted_style()),
        Span::styled(app.filters.status_label(), styles::highlight_style()),
    ];

    if let Some(notice) = load_notice(&app.customers_load) {
        spans.push(Span::raw("  "));
        spans.extend(notice.spans);
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let customers = &app.customer_page.data;

    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Company / Email"),
        Cell::from("Status"),
        Cell::from("Type"),
        Cell::from("Last Contact"),
        Cell::from("Created"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = customers
        .iter()
        .map(|customer| {
            let last_contact = customer
                .last_contact
                .as_deref()
                .map(format_date)
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from(customer.name.clone()),
                Cell::from(truncate(customer.subtitle(), 28)),
                Cell::from(Span::styled(
                    customer.status.label(),
                    styles::status_style(customer.status),
                )),
                Cell::from(customer.customer_type.label()),
                Cell::from(last_contact),
                Cell::from(format_date(&customer.created_at)),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(13),
        Constraint::Length(13),
    ];

    let title = format!(" Customers ({}) ", app.customer_page.meta.total);
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
    if !customers.is_empty() {
        state.select(Some(app.customer_selection));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_preview(frame: &mut Frame, selected: Option<&Customer>, area: Rect) {
    let lines = match selected {
        Some(customer) => {
            let placeholder = "-";
            let mut lines = vec![
                Line::from(vec![
                    Span::styled(format!(" {}  ", customer.initials()), styles::highlight_style()),
                    Span::styled(customer.name.clone(), styles::title_style()),
                ]),
                Line::from(""),
                Line::from(vec![
                    Span::styled(" Email:   ", styles::muted_style()),
                    Span::raw(customer.email.clone()),
                ]),
                Line::from(vec![
                    Span::styled(" Phone:   ", styles::muted_style()),
                    Span::raw(customer.phone.clone().unwrap_or_else(|| placeholder.to_string())),
                ]),
                Line::from(vec![
                    Span::styled(" Company: ", styles::muted_style()),
                    Span::raw(customer.company.clone().unwrap_or_else(|| placeholder.to_string())),
                ]),
                Line::from(vec![
                    Span::styled(" Status:  ", styles::muted_style()),
                    Span::styled(customer.status.label(), styles::status_style(customer.status)),
                ]),
            ];
            if let Some(ref notes) = customer.notes {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(format!(" {}", notes), styles::muted_style())));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(" [Enter] open", styles::muted_style())));
            lines
        }
        None => vec![Line::from(Span::styled(" No customer selected", styles::muted_style()))],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_pager(frame: &mut Frame, app: &App, area: Rect) {
    let meta = &app.customer_page.meta;
    let (first, last) = meta.showing_range();

    let nav_style = |enabled: bool| if enabled { styles::help_key_style() } else { styles::muted_style() };

    let line = Line::from(vec![
        Span::styled(
            format!(" Showing {} to {} of {} customers   ", first, last, meta.total),
            styles::muted_style(),
        ),
        Span::styled("[[] previous", nav_style(meta.has_previous())),
        Span::raw("  "),
        Span::styled("[]] next", nav_style(meta.has_next())),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
