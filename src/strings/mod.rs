//! # Strings Module
//!
//! Centralizes log lines and notification texts.
//! Ensures consistency in messaging and easier updates.

pub mod logs;
pub mod templates;
