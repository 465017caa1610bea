//! Explicit passcode verification

use ratatui::prelude::*;

use crate::app::App;
use crate::ui::layout::{render_footer, render_header, render_status_bar, ScreenLayout};
use crate::ui::screens::lock::draw_prompt;

/// Draw the verification screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let layout = ScreenLayout::new(area);

    render_header(frame, layout.header, Some("Verify Passcode"), "", theme);

    if let Some(session) = app.lock.verification() {
        draw_prompt(frame, layout.content, app, session, " Verify ", "");

        let mut hints = vec![("Enter", "Submit")];
        if session.can_cancel() {
            hints.push(("Esc", "Cancel"));
        }
        if session.biometrics_available() {
            hints.push(("F4", "Biometrics"));
        }
        render_footer(frame, layout.footer, &hints, theme);
    }

    render_status_bar(
        frame,
        layout.status,
        app.state.status_message.as_deref(),
        app.state.error_message.as_deref(),
        theme,
    );
}
