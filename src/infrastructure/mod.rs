//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (Notifier, SocialApi, FeedSource, RosterSource).

pub mod feed;
pub mod matrix;
pub mod roster;
pub mod social;
