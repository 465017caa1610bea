//! Lock overlay drawn over the terminal UI

use std::time::{Duration, Instant};

use applock_core::OverlayHost;
use parking_lot::Mutex;

/// What the renderer needs to know about the overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayView {
    /// Whether the passcode prompt is shown on the overlay
    pub input_visible: bool,
    /// 1.0 while shown, falling to 0.0 during a fade
    pub opacity: f32,
}

#[derive(Debug, Default)]
struct OverlayState {
    present: bool,
    input_visible: bool,
    fade: Option<(Instant, Duration)>,
}

/// [`OverlayHost`] backed by a full-screen layer in the TUI
#[derive(Debug, Default)]
pub struct TerminalOverlay {
    state: Mutex<OverlayState>,
}

impl TerminalOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current overlay, `None` when nothing covers the app
    pub fn view(&self) -> Option<OverlayView> {
        self.view_at(Instant::now())
    }

    fn view_at(&self, now: Instant) -> Option<OverlayView> {
        let state = self.state.lock();
        if !state.present {
            return None;
        }

        let opacity = match state.fade {
            Some((started, duration)) if !duration.is_zero() => {
                let elapsed = now.saturating_duration_since(started).as_secs_f32();
                (1.0 - elapsed / duration.as_secs_f32()).clamp(0.0, 1.0)
            }
            Some(_) => 0.0,
            None => 1.0,
        };

        Some(OverlayView {
            input_visible: state.input_visible && state.fade.is_none(),
            opacity,
        })
    }
}

impl OverlayHost for TerminalOverlay {
    fn create(&self) {
        let mut state = self.state.lock();
        state.present = true;
        state.fade = None;
        tracing::debug!("Overlay created");
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        *state = OverlayState::default();
        tracing::debug!("Overlay destroyed");
    }

    fn fade_out(&self, duration: Duration) {
        self.state.lock().fade = Some((Instant::now(), duration));
    }

    fn set_input_visible(&self, visible: bool) {
        self.state.lock().input_visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let overlay = TerminalOverlay::new();
        assert!(overlay.view().is_none());

        overlay.create();
        overlay.set_input_visible(true);
        let view = overlay.view().unwrap();
        assert!(view.input_visible);
        assert_eq!(view.opacity, 1.0);

        overlay.destroy();
        assert!(overlay.view().is_none());
    }

    #[test]
    fn test_fade_hides_input() {
        let overlay = TerminalOverlay::new();
        overlay.create();
        overlay.set_input_visible(true);
        overlay.fade_out(Duration::from_millis(300));

        let started = overlay.state.lock().fade.map(|(start, _)| start).unwrap();
        let halfway = overlay.view_at(started + Duration::from_millis(150)).unwrap();
        assert!(!halfway.input_visible);
        assert!((halfway.opacity - 0.5).abs() < 0.01);

        let done = overlay.view_at(started + Duration::from_secs(1)).unwrap();
        assert_eq!(done.opacity, 0.0);
    }
}
