//! Help screen

use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

use crate::app::App;
use crate::ui::layout::{render_footer, render_header, section_block, ScreenLayout};

/// Draw the help screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let layout = ScreenLayout::new(area);

    render_header(frame, layout.header, Some("Help"), "", theme);

    let heading = |text: &'static str| Line::from(Span::styled(text, theme.title()));

    let content = Paragraph::new(vec![
        Line::from(""),
        heading("  Navigation:"),
        Line::from("    j/k or Up/Down  - Move selection"),
        Line::from("    Enter           - Select / Submit"),
        Line::from("    Esc             - Cancel the current flow"),
        Line::from("    ?               - Show this help"),
        Line::from("    q or Ctrl-C     - Quit"),
        Line::from(""),
        heading("  Application lifecycle:"),
        Line::from("    F2              - Send the app to the background"),
        Line::from("    F3              - Bring the app back to the foreground"),
        Line::from("    F4              - Retry biometric unlock"),
        Line::from(""),
        heading("  Passcode setup:"),
        Line::from("    Enter the new passcode twice. Tab switches the passcode"),
        Line::from("    type before the first entry. Numeric codes submit once"),
        Line::from("    all digits are entered."),
        Line::from(""),
        heading("  Lock modes:"),
        Line::from("    hide in app switcher - cover while backgrounded, prompt on return"),
        Line::from("    always visible       - prompt stays up while inactive"),
        Line::from("    autohide             - cover while backgrounded, no prompt"),
        Line::from("    disabled             - never lock"),
        Line::from(""),
        Line::from(Span::styled(
            "    Wrong entries trigger a cooldown before the next attempt.",
            theme.text_muted(),
        )),
    ])
    .wrap(Wrap { trim: false })
    .block(section_block("Help", theme));

    frame.render_widget(content, layout.content);

    render_footer(frame, layout.footer, &[("Esc", "Back")], theme);
}
