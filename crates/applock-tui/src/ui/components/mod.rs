//! Reusable UI components

pub mod code_display;
