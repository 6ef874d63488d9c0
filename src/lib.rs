//! Convert slide decks to PDF and hold a conversation about the resulting
//! documents through a hosted assistant API.

pub mod config;
pub mod models;
pub mod providers;
pub mod services;
