//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. Network work is
//! always started through `App` methods that spawn background tasks, so input
//! handling never blocks the draw loop.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{
    can_add_redirect_char, can_add_search_char, move_selection, App, AppState, DetailView, Tab,
    PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return Ok(handle_login_input(app, key)),
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Searching => {
            handle_search_input(app, key);
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('1') => switch_tab(app, Tab::Dashboard),
        KeyCode::Char('2') => switch_tab(app, Tab::Customers),
        KeyCode::Char('u') => app.refresh_current_view(),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Left => {
            if app.viewing_customer.is_some() {
                app.detail_view = app.detail_view.prev();
            } else {
                switch_tab(app, app.current_tab.prev());
            }
        }
        KeyCode::Right => {
            if app.viewing_customer.is_some() {
                app.detail_view = app.detail_view.next();
            } else {
                switch_tab(app, app.current_tab.next());
            }
        }
        KeyCode::Up | KeyCode::Char('k') => move_current_selection(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_current_selection(app, 1),
        KeyCode::PageUp => move_current_selection(app, -(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => move_current_selection(app, PAGE_SCROLL_SIZE as isize),
        KeyCode::Enter => {
            if app.viewing_customer.is_none() {
                if let Some(id) = app.selected_customer().map(|c| c.id.clone()) {
                    app.open_customer(id);
                }
            }
        }
        KeyCode::Esc => {
            if app.viewing_customer.is_some() {
                app.close_customer();
            } else if app.current_tab == Tab::Customers && !app.filters.search_query.is_empty() {
                app.search_input.clear();
                app.apply_search();
            }
        }
        _ => {
            if app.current_tab == Tab::Customers && app.viewing_customer.is_none() {
                handle_customers_list_key(app, key);
            }
        }
    }

    Ok(false)
}

fn switch_tab(app: &mut App, tab: Tab) {
    if app.viewing_customer.is_some() {
        app.close_customer();
    }
    app.current_tab = tab;
}

fn move_current_selection(app: &mut App, delta: isize) {
    if app.viewing_customer.is_some() {
        let Some(ref overview) = app.overview else {
            return;
        };
        match app.detail_view {
            DetailView::Overview => {}
            DetailView::Contacts => {
                app.contact_selection =
                    move_selection(app.contact_selection, delta, overview.contacts.len());
            }
            DetailView::Activities => {
                app.activity_selection =
                    move_selection(app.activity_selection, delta, overview.activities.len());
            }
        }
        return;
    }

    match app.current_tab {
        Tab::Dashboard => {
            app.dashboard_selection = move_selection(
                app.dashboard_selection,
                delta,
                app.dashboard.recent_customers.len(),
            );
        }
        Tab::Customers => {
            app.customer_selection = move_selection(
                app.customer_selection,
                delta,
                app.customer_page.data.len(),
            );
        }
    }
}

fn handle_customers_list_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('/') => {
            app.search_input = app.filters.search_query.clone();
            app.state = AppState::Searching;
        }
        KeyCode::Char('s') => app.cycle_status_filter(),
        KeyCode::Char('[') => app.previous_page(),
        KeyCode::Char(']') => app.next_page(),
        _ => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            // Abandon the edit, keep the active query
            app.search_input.clear();
            app.state = AppState::Normal;
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
            app.apply_search();
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) => {
            if can_add_search_char(app.search_input.chars().count(), c) {
                app.search_input.push(c);
            }
        }
        _ => {}
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return true;
        }
        KeyCode::Enter => app.submit_login(),
        KeyCode::Backspace => {
            app.login_input.pop();
        }
        KeyCode::F(5) => app.start_login(),
        KeyCode::Char(c) => push_login_char(app, c),
        _ => {}
    }
    false
}

/// Append pasted text to the redirect field, dropping newlines and other
/// control characters.
pub fn handle_paste(app: &mut App, text: &str) {
    match app.state {
        AppState::LoggingIn => {
            for c in text.chars() {
                push_login_char(app, c);
            }
        }
        AppState::Searching => {
            for c in text.chars() {
                if can_add_search_char(app.search_input.chars().count(), c) {
                    app.search_input.push(c);
                }
            }
        }
        _ => {}
    }
}

fn push_login_char(app: &mut App, c: char) {
    if !app.login_in_progress && can_add_redirect_char(app.login_input.len(), c) {
        app.login_input.push(c);
    }
}
