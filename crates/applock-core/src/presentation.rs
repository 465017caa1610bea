//! Lock overlay presentation
//!
//! [`LockPresentationController`] decides, from lifecycle events and the
//! effective [`PasscodeMode`], whether the lock overlay exists and whether
//! its input is visible. Rendering is left to an [`OverlayHost`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::types::{LifecycleEvent, PasscodeMode, Visibility};

/// Default fade duration of an animated dismissal
pub const DEFAULT_DISMISS_ANIMATION: Duration = Duration::from_millis(300);

/// Capacity of the event channel
const EVENT_CAPACITY: usize = 32;

/// Surface that renders the lock overlay
///
/// Calls are made from the controller's owner, never concurrently.
pub trait OverlayHost: Send + Sync {
    /// Put an overlay above the application content
    fn create(&self);

    /// Remove the overlay
    fn destroy(&self);

    /// Start fading the overlay out over `duration`; `destroy` follows
    fn fade_out(&self, duration: Duration);

    /// Show or blank the passcode input on the overlay
    fn set_input_visible(&self, visible: bool);
}

/// Observable presentation changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationEvent {
    VisibilityChanged(Visibility),
    OverlayCreated,
    /// A dismissal started; `animated` dismissals destroy after the fade
    OverlayDismissing { animated: bool },
    OverlayDestroyed,
}

#[derive(Debug, Default)]
struct PresentationState {
    visibility: Visibility,
    overlay: bool,
    /// A fade is running and will destroy the overlay
    fading: bool,
    /// Bumped whenever a pending fade must be abandoned
    generation: u64,
}

struct Shared {
    host: Arc<dyn OverlayHost>,
    state: Mutex<PresentationState>,
    events: broadcast::Sender<PresentationEvent>,
}

impl Shared {
    fn emit(&self, event: PresentationEvent) {
        let _ = self.events.send(event);
    }

    fn destroy_if_current(&self, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.generation != generation || !state.overlay {
                debug!("Dismissal superseded, keeping overlay");
                return;
            }
            state.overlay = false;
            state.fading = false;
        }
        self.host.destroy();
        self.emit(PresentationEvent::OverlayDestroyed);
    }
}

/// Overlay visibility state machine
#[derive(Clone)]
pub struct LockPresentationController {
    shared: Arc<Shared>,
    dismiss_animation: Duration,
}

impl LockPresentationController {
    pub fn new(host: Arc<dyn OverlayHost>, dismiss_animation: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                host,
                state: Mutex::new(PresentationState::default()),
                events,
            }),
            dismiss_animation,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.shared.state.lock().visibility
    }

    /// Whether an overlay exists (including one that is fading out)
    pub fn has_overlay(&self) -> bool {
        self.shared.state.lock().overlay
    }

    pub fn is_dismissing(&self) -> bool {
        self.shared.state.lock().fading
    }

    /// Whether the passcode prompt should currently be shown
    pub fn is_prompting(&self) -> bool {
        let state = self.shared.state.lock();
        state.overlay && !state.fading && state.visibility.is_visible()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresentationEvent> {
        self.shared.events.subscribe()
    }

    /// Apply a lifecycle event under `mode`
    pub fn handle(&self, mode: PasscodeMode, event: LifecycleEvent) {
        debug!("Lifecycle {:?} in mode {:?}", event, mode);

        match (mode, event) {
            (PasscodeMode::Disabled, LifecycleEvent::Launched) => {
                self.set_visibility(Visibility::Hidden);
                self.dismiss(false);
            }
            (PasscodeMode::Disabled, LifecycleEvent::DidEnterBackground) => {}
            (PasscodeMode::Disabled, _) => self.set_visibility(Visibility::Hidden),

            (PasscodeMode::AlwaysVisible | PasscodeMode::HideInAppSwitcher, LifecycleEvent::Launched) => {
                self.ensure_overlay();
                self.set_visibility(Visibility::Visible);
            }
            (PasscodeMode::AlwaysVisible, LifecycleEvent::WillResignActive) => {
                self.set_visibility(Visibility::Visible)
            }
            (PasscodeMode::HideInAppSwitcher, LifecycleEvent::WillResignActive) => {
                // An existing overlay keeps covering the content
                if !self.has_overlay() {
                    self.set_visibility(Visibility::Hidden);
                }
            }
            (
                PasscodeMode::AlwaysVisible | PasscodeMode::HideInAppSwitcher,
                LifecycleEvent::WillEnterForeground,
            ) => self.set_visibility(Visibility::Visible),

            (PasscodeMode::Autohide, LifecycleEvent::Launched | LifecycleEvent::WillResignActive) => {
                self.set_visibility(Visibility::Hidden)
            }
            (PasscodeMode::Autohide, LifecycleEvent::WillEnterForeground) => {
                self.dismiss(false);
            }

            (_, LifecycleEvent::DidEnterBackground) => self.ensure_overlay(),
        }
    }

    /// Create the overlay unless one exists
    ///
    /// A running fade is abandoned and the overlay is recreated.
    pub fn ensure_overlay(&self) {
        let (abandoned, visible) = {
            let mut state = self.shared.state.lock();
            if state.overlay && !state.fading {
                return;
            }
            let abandoned = state.fading;
            state.generation = state.generation.wrapping_add(1);
            state.overlay = true;
            state.fading = false;
            (abandoned, state.visibility.is_visible())
        };

        if abandoned {
            debug!("New overlay requested during fade, recreating");
            self.shared.host.destroy();
        }

        self.shared.host.create();
        self.shared.host.set_input_visible(visible);
        self.shared.emit(PresentationEvent::OverlayCreated);
    }

    /// Remove the overlay and hide the prompt
    ///
    /// Animated dismissals fade for the configured duration and then remove
    /// the overlay, unless a new overlay is requested meanwhile. A
    /// non-animated dismissal also cuts a running fade short.
    pub fn dismiss(&self, animated: bool) {
        self.set_visibility(Visibility::Hidden);

        let generation = {
            let mut state = self.shared.state.lock();
            if !state.overlay || (animated && state.fading) {
                return;
            }
            state.generation = state.generation.wrapping_add(1);
            state.fading = animated;
            state.generation
        };

        self.shared
            .emit(PresentationEvent::OverlayDismissing { animated });

        if !animated || self.dismiss_animation.is_zero() {
            self.shared.destroy_if_current(generation);
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime, dismissing overlay without animation");
            self.shared.destroy_if_current(generation);
            return;
        };

        self.shared.host.fade_out(self.dismiss_animation);

        let shared = Arc::clone(&self.shared);
        let delay = self.dismiss_animation;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.destroy_if_current(generation);
        });
    }

    fn set_visibility(&self, visibility: Visibility) {
        let notify_host = {
            let mut state = self.shared.state.lock();
            if state.visibility == visibility {
                return;
            }
            state.visibility = visibility;
            state.overlay && !state.fading
        };

        if notify_host {
            self.shared.host.set_input_visible(visibility.is_visible());
        }
        self.shared
            .emit(PresentationEvent::VisibilityChanged(visibility));
    }
}

impl std::fmt::Debug for LockPresentationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LockPresentationController")
            .field("visibility", &state.visibility)
            .field("overlay", &state.overlay)
            .field("fading", &state.fading)
            .finish()
    }
}

/// Overlay host without a surface that records what it was asked to do
#[derive(Debug, Default)]
pub struct HeadlessOverlay {
    live: AtomicUsize,
    created: AtomicUsize,
    fades: AtomicUsize,
    input_visible: AtomicBool,
}

impl HeadlessOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays currently alive
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Overlays created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Fades started so far
    pub fn fades(&self) -> usize {
        self.fades.load(Ordering::SeqCst)
    }

    pub fn input_visible(&self) -> bool {
        self.input_visible.load(Ordering::SeqCst)
    }
}

impl OverlayHost for HeadlessOverlay {
    fn create(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.created.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.input_visible.store(false, Ordering::SeqCst);
    }

    fn fade_out(&self, _duration: Duration) {
        self.fades.fetch_add(1, Ordering::SeqCst);
    }

    fn set_input_visible(&self, visible: bool) {
        self.input_visible.store(visible, Ordering::SeqCst);
    }
}
