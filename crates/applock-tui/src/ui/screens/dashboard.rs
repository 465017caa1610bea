//! Dashboard screen - main menu and lock status

use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph};

use crate::app::{mode_label, App, MenuItem};
use crate::ui::layout::{render_footer, render_header, render_status_bar, section_block, ScreenLayout};

/// Draw the dashboard
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let layout = ScreenLayout::new(area);

    let mode = app.lock.config().mode;
    render_header(
        frame,
        layout.header,
        Some("Dashboard"),
        &format!("mode: {} ", mode_label(mode)),
        theme,
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout.content);

    // Menu
    let items: Vec<ListItem> = MenuItem::ALL
        .iter()
        .enumerate()
        .map(|(i, item)| {
            ListItem::new(format!("  {}  ", item.label()))
                .style(theme.menu_item(i == app.state.menu_index))
        })
        .collect();

    let menu = List::new(items).block(section_block("Main Menu", theme));
    frame.render_widget(menu, chunks[0]);

    // Lock status
    let passcode = match app.lock.passcode_info() {
        Some(info) => Line::from(vec![
            Span::styled("Passcode:   ", theme.text_secondary()),
            Span::styled(info.kind.to_string(), theme.success()),
        ]),
        None => Line::from(vec![
            Span::styled("Passcode:   ", theme.text_secondary()),
            Span::styled("Not set", theme.warning()),
        ]),
    };

    let biometrics = app
        .lock
        .passcode_info()
        .map(|info| info.allow_biometrics)
        .unwrap_or(false);
    let device = app.lock.authenticator().biometry_kind();

    let effective = app.lock.effective_mode();
    let mut lines = vec![
        passcode,
        Line::from(vec![
            Span::styled("Biometrics: ", theme.text_secondary()),
            Span::styled(
                if biometrics { "enabled" } else { "disabled" },
                theme.text(),
            ),
            Span::styled(format!(" ({})", device), theme.text_muted()),
        ]),
        Line::from(vec![
            Span::styled("Lock mode:  ", theme.text_secondary()),
            Span::styled(mode_label(mode), theme.text()),
        ]),
    ];
    if effective != mode {
        lines.push(Line::from(Span::styled(
            format!("            {} until a passcode is set", mode_label(effective)),
            theme.text_muted(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press F2 to send the app to the background, F3 to return",
        theme.text_muted(),
    )));

    let status = Paragraph::new(lines).block(section_block("Status", theme));
    frame.render_widget(status, chunks[1]);

    render_status_bar(
        frame,
        layout.status,
        app.state.status_message.as_deref(),
        app.state.error_message.as_deref(),
        theme,
    );

    render_footer(
        frame,
        layout.footer,
        &[("↑↓", "Navigate"), ("Enter", "Select"), ("?", "Help"), ("q", "Quit")],
        theme,
    );
}
