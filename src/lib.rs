//! Terminal client for a remote task service: views over today, upcoming,
//! projects, labels and a month calendar, with bulk edits and undo.

pub mod api;
pub mod app;
pub mod auth;
pub mod bulk;
pub mod config;
pub mod display;
pub mod error;
pub mod forms;
pub mod keymap;
pub mod markdown;
pub mod model;
pub mod runtime;
pub mod search;
pub mod ui;
pub mod viewport;
pub mod views;
