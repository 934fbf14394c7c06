use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use clientele_core::models::{Activity, Contact, Customer};
use clientele_core::services::CustomerOverview;
use clientele_core::utils::{format_date, format_datetime, format_long_date};

use crate::app::{App, DetailView};
use crate::ui::styles;
use crate::ui::tabs::load_notice;

/// Render the customer detail screen for `app.viewing_customer`
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Load notice
            Constraint::Min(5),    // Body
        ])
        .split(area);

    if let Some(notice) = load_notice(&app.detail_load) {
        frame.render_widget(Paragraph::new(notice), chunks[1]);
    }

    let Some(ref overview) = app.overview else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(false));
        frame.render_widget(block, chunks[0]);
        return;
    };

    render_header(frame, &overview.customer, chunks[0]);

    match app.detail_view {
        DetailView::Overview => render_overview(frame, overview, chunks[2]),
        DetailView::Contacts => render_contacts(frame, &overview.contacts, app.contact_selection, chunks[2]),
        DetailView::Activities => {
            render_activities(frame, &overview.activities, app.activity_selection, chunks[2])
        }
    }
}

fn render_header(frame: &mut Frame, customer: &Customer, area: Rect) {
    let line = Line::from(vec![
        Span::styled(format!(" {}  ", customer.initials()), styles::highlight_style()),
        Span::styled(customer.name.clone(), styles::title_style()),
        Span::raw("  "),
        Span::styled(customer.status.label(), styles::status_style(customer.status)),
        Span::styled(format!("  {}", customer.customer_type.label()), styles::muted_style()),
        Span::styled("   [Esc] back", styles::muted_style()),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn field_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {:<14}", label), styles::muted_style()),
        Span::styled(value, styles::list_item_style()),
    ])
}

fn render_overview(frame: &mut Frame, overview: &CustomerOverview, area: Rect) {
    let customer = &overview.customer;
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let mut info = vec![
        field_line("Email", customer.email.clone()),
        field_line("Phone", or_dash(&customer.phone)),
        field_line("Company", or_dash(&customer.company)),
        Line::from(""),
    ];

    match customer.address.as_ref().filter(|a| !a.is_empty()) {
        Some(address) => {
            for (i, line) in address.display_lines().into_iter().enumerate() {
                let label = if i == 0 { "Address" } else { "" };
                info.push(field_line(label, line));
            }
        }
        None => info.push(field_line("Address", "-".to_string())),
    }

    if let Some(ref notes) = customer.notes {
        info.push(Line::from(""));
        info.push(Line::from(Span::styled(" Notes", styles::highlight_style())));
        info.push(Line::from(Span::styled(format!(" {}", notes), styles::list_item_style())));
    }

    let info_block = Block::default()
        .title(" Customer Information ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(info).block(info_block).wrap(Wrap { trim: false }),
        columns[0],
    );

    let open_tasks = overview.activities.iter().filter(|a| a.is_open_task()).count();
    let summary = vec![
        field_line("Created", format_long_date(&customer.created_at)),
        field_line("Updated", format_long_date(&customer.updated_at)),
        field_line(
            "Last contact",
            customer
                .last_contact
                .as_deref()
                .map(format_long_date)
                .unwrap_or_else(|| "Never".to_string()),
        ),
        Line::from(""),
        field_line("Contacts", overview.contacts.len().to_string()),
        field_line("Activities", overview.activities.len().to_string()),
        field_line("Open tasks", open_tasks.to_string()),
    ];
    let summary_block = Block::default()
        .title(" Summary ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(summary).block(summary_block), columns[1]);
}

fn render_contacts(frame: &mut Frame, contacts: &[Contact], selected: usize, area: Rect) {
    let header = Row::new(vec![
        Cell::from(" "),
        Cell::from("Name"),
        Cell::from("Position"),
        Cell::from("Email"),
        Cell::from("Phone"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = contacts
        .iter()
        .map(|contact| {
            let marker = if contact.is_primary { "★" } else { " " };
            Row::new(vec![
                Cell::from(Span::styled(marker, styles::highlight_style())),
                Cell::from(contact.name.clone()),
                Cell::from(contact.position_display().to_string()),
                Cell::from(contact.email.clone()),
                Cell::from(contact.phone.clone().unwrap_or_else(|| "-".to_string())),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Fill(3),
        Constraint::Length(16),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(" Contacts ({}) - ★ primary ", contacts.len()))
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !contacts.is_empty() {
        state.select(Some(selected));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn activity_item(activity: &Activity) -> ListItem<'static> {
    let mut spans = vec![
        Span::styled(format!(" {} ", activity.activity_type.icon()), styles::highlight_style()),
        Span::styled(format!("{:<8}", activity.activity_type.label()), styles::muted_style()),
        Span::styled(activity.title.clone(), styles::list_item_style()),
        Span::styled(format!("  {}", format_datetime(&activity.created_at)), styles::muted_style()),
    ];
    if activity.is_open_task() {
        let due = activity
            .due_date
            .as_deref()
            .map(|d| format!("  open, due {}", format_date(d)))
            .unwrap_or_else(|| "  open".to_string());
        spans.push(Span::styled(due, styles::error_style()));
    }

    let mut lines = vec![Line::from(spans)];
    if let Some(ref description) = activity.description {
        lines.push(Line::from(Span::styled(
            format!("            {}", description),
            styles::muted_style(),
        )));
    }
    ListItem::new(lines)
}

fn render_activities(frame: &mut Frame, activities: &[Activity], selected: usize, area: Rect) {
    let items: Vec<ListItem> = activities.iter().map(activity_item).collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" Activities ({}) ", activities.len()))
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    if !activities.is_empty() {
        state.select(Some(selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
