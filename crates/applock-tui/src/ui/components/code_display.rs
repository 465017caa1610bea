//! Masked passcode display

use applock_core::PasscodeType;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::Theme;

/// Dots shown for variable-length codes before the display scrolls
const MAX_VARIABLE_DOTS: usize = 16;

/// Build the masked representation of `entered` characters of a `kind` code
///
/// Fixed-width codes show one slot per digit. Variable-length codes show a
/// dot per character and a count once the row is full.
pub fn masked(kind: PasscodeType, entered: usize) -> String {
    match kind.max_input_length() {
        Some(slots) => (0..slots)
            .map(|i| if i < entered { "●" } else { "○" })
            .collect::<Vec<_>>()
            .join(" "),
        None if entered > MAX_VARIABLE_DOTS => {
            format!("{} ({})", vec!["●"; MAX_VARIABLE_DOTS].join(" "), entered)
        }
        None => vec!["●"; entered].join(" "),
    }
}

/// Render the masked code centered in `area`
pub fn render(frame: &mut Frame, area: Rect, kind: PasscodeType, entered: usize, theme: &Theme) {
    let style = if entered == 0 {
        theme.code_placeholder()
    } else {
        theme.code_dot()
    };

    let text = if entered == 0 && kind.max_input_length().is_none() {
        "_".to_string()
    } else {
        masked(kind, entered)
    };

    let widget = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center);
    frame.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PasscodeType::FOUR_DIGITS, 0, "○ ○ ○ ○")]
    #[case(PasscodeType::FOUR_DIGITS, 2, "● ● ○ ○")]
    #[case(PasscodeType::SIX_DIGITS, 6, "● ● ● ● ● ●")]
    #[case(PasscodeType::Alphanumeric, 3, "● ● ●")]
    #[case(PasscodeType::CustomNumeric, 0, "")]
    fn test_masked(#[case] kind: PasscodeType, #[case] entered: usize, #[case] expected: &str) {
        assert_eq!(masked(kind, entered), expected);
    }

    #[test]
    fn test_long_variable_code_shows_count() {
        let text = masked(PasscodeType::Alphanumeric, 20);
        assert!(text.ends_with("(20)"));
    }
}
