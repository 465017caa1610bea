//! UI rendering

pub mod components;
pub mod layout;
pub mod screens;
pub mod theme;

pub use theme::Theme;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Clear};

use crate::app::{App, Screen};

/// Main render function - delegates to appropriate screen, then the lock overlay
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.state.current_screen {
        Screen::Dashboard => screens::dashboard::draw(frame, area, app),
        Screen::Wizard => screens::wizard::draw(frame, area, app),
        Screen::Verify => screens::verify::draw(frame, area, app),
        Screen::Help => screens::help::draw(frame, area, app),
    }

    if let Some(view) = app.overlay.view() {
        frame.render_widget(Clear, area);
        frame.render_widget(Block::default().style(app.theme.overlay(view.opacity)), area);
        if view.input_visible {
            screens::lock::draw(frame, area, app);
        } else if app.state.backgrounded {
            screens::lock::draw_cover(frame, area, app);
        }
    }
}
