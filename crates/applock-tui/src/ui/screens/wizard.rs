//! Passcode setup and change wizard

use applock_core::{Wizard, WizardKind, WizardStep};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::ui::components::code_display;
use crate::ui::layout::{centered_rect, render_footer, render_header, section_block, ScreenLayout};
use crate::ui::screens::session_feedback;

/// Draw the wizard screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let layout = ScreenLayout::new(area);

    let Some(wizard) = app.lock.wizard() else {
        render_header(frame, layout.header, Some("Passcode"), "", theme);
        return;
    };

    let title = match wizard.flavor() {
        WizardKind::Setup => "Set Up Passcode",
        WizardKind::Change => "Change Passcode",
    };
    render_header(
        frame,
        layout.header,
        Some(title),
        &format!("step {} ", step_number(wizard)),
        theme,
    );

    let dialog = centered_rect(60, 70, layout.content);
    let block = section_block(title, theme);
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Instructions
            Constraint::Length(2), // Code type
            Constraint::Length(2), // Code display
            Constraint::Length(2), // Feedback
            Constraint::Min(0),
        ])
        .split(inner);

    let instructions = Paragraph::new(instructions(wizard))
        .style(theme.text())
        .alignment(Alignment::Center);
    frame.render_widget(instructions, chunks[0]);

    if wizard.step() == WizardStep::BiometricOffer {
        let hint = Paragraph::new("[y] Enable    [n] Not now")
            .style(theme.text_secondary())
            .alignment(Alignment::Center);
        frame.render_widget(hint, chunks[2]);
    } else {
        let kind = Paragraph::new(wizard.kind().to_string())
            .style(theme.text_muted())
            .alignment(Alignment::Center);
        frame.render_widget(kind, chunks[1]);

        let entered = wizard.session().map(|session| session.input_len()).unwrap_or(0);
        code_display::render(frame, chunks[2], wizard.kind(), entered, theme);
    }

    if let Some(feedback) = feedback(wizard, app) {
        let widget = Paragraph::new(feedback)
            .style(theme.danger())
            .alignment(Alignment::Center);
        frame.render_widget(widget, chunks[3]);
    }

    if let Some(error) = &app.state.error_message {
        let widget = Paragraph::new(error.as_str())
            .style(theme.danger())
            .alignment(Alignment::Center);
        frame.render_widget(widget, layout.status);
    }

    let mut hints = vec![("Enter", "Submit"), ("Esc", "Cancel")];
    if wizard.step() == WizardStep::CaptureNew && wizard.types().len() > 1 {
        hints.push(("Tab", "Passcode type"));
    }
    render_footer(frame, layout.footer, &hints, theme);
}

fn step_number(wizard: &Wizard) -> &'static str {
    match (wizard.flavor(), wizard.step()) {
        (WizardKind::Change, WizardStep::VerifyCurrent) => "1",
        (WizardKind::Change, WizardStep::CaptureNew) => "2",
        (WizardKind::Change, WizardStep::ConfirmReenter) => "3",
        (WizardKind::Setup, WizardStep::CaptureNew) => "1",
        (WizardKind::Setup, WizardStep::ConfirmReenter) => "2",
        _ => "-",
    }
}

fn instructions(wizard: &Wizard) -> String {
    match wizard.step() {
        WizardStep::VerifyCurrent => "Enter your current passcode".to_string(),
        WizardStep::CaptureNew => "Enter a new passcode".to_string(),
        WizardStep::ConfirmReenter => "Re-enter the new passcode".to_string(),
        WizardStep::BiometricOffer => format!("Unlock with {}?", wizard.biometry_kind()),
        WizardStep::Finished => "Done".to_string(),
        WizardStep::Cancelled => "Cancelled".to_string(),
    }
}

fn feedback(wizard: &Wizard, app: &App) -> Option<String> {
    match wizard.step() {
        WizardStep::VerifyCurrent => wizard
            .session()
            .and_then(|session| session_feedback(session, &app.lock.config().cooldown)),
        WizardStep::CaptureNew if wizard.mismatch_count() > 0 => {
            Some("Passcodes did not match. Try again".to_string())
        }
        _ => None,
    }
}
