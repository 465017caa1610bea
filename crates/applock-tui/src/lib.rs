//! Applock TUI - Terminal demonstration of the application lock
//!
//! Drives an [`applock_core::AppLock`] from keyboard input and simulated
//! application lifecycle events, drawing the lock overlay over the app.

pub mod app;
pub mod overlay;
pub mod ui;

pub use app::{App, AppOptions};
