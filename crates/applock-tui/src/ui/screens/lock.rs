//! Lock overlay prompt

use applock_core::{InputSession, SessionState};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::App;
use crate::ui::components::code_display;
use crate::ui::layout::centered_rect_fixed;
use crate::ui::screens::session_feedback;

/// Draw the unlock prompt on the overlay
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let Some(session) = app.lock.unlock_session() else {
        draw_cover(frame, area, app);
        return;
    };

    let mut hints = vec!["[Enter] Unlock"];
    if session.biometrics_available() {
        hints.push("[F4] Biometrics");
    }
    draw_prompt(frame, area, app, session, " Locked ", &hints.join("    "));
}

/// Draw the blank cover shown while the app is in the background
pub fn draw_cover(frame: &mut Frame, area: Rect, app: &App) {
    let cover = centered_rect_fixed(30, 3, area);
    let widget = Paragraph::new("◆ APPLOCK")
        .style(app.theme.title())
        .alignment(Alignment::Center);
    frame.render_widget(widget, Rect::new(cover.x, cover.y + 1, cover.width, 1));
}

/// Passcode dialog shared by the overlay and explicit verification
pub(crate) fn draw_prompt(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    session: &InputSession,
    title: &str,
    help: &str,
) {
    let theme = &app.theme;

    let dialog = centered_rect_fixed(52, 12, area);
    let block = Block::default()
        .title(title)
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border_focused());

    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Instructions
            Constraint::Length(2), // Code display
            Constraint::Length(2), // Feedback
            Constraint::Min(0),    // Spacer
            Constraint::Length(1), // Help
        ])
        .split(inner);

    let instructions = Paragraph::new("Enter passcode")
        .style(theme.text_secondary())
        .alignment(Alignment::Center);
    frame.render_widget(instructions, chunks[0]);

    code_display::render(frame, chunks[1], session.kind(), session.input_len(), theme);

    let feedback = match session.state() {
        SessionState::Completed(outcome) if outcome.is_success() => {
            Some(("Unlocked".to_string(), theme.success()))
        }
        _ => session_feedback(session, &app.lock.config().cooldown)
            .map(|text| (text, theme.danger())),
    };
    if let Some((text, style)) = feedback {
        let widget = Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center);
        frame.render_widget(widget, chunks[2]);
    }

    let help = Paragraph::new(help)
        .style(theme.text_muted())
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[4]);
}
