//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, title/tab/status bars and overlays
//! - `input`: keyboard event handling
//! - `styles`: colors and text styles
//! - `tabs`: dashboard, customer list and customer detail screens

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
