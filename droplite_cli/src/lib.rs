//! Terminal dashboard for a droplite server: the file collection view and the
//! theme store, both backed by the server's REST API.

pub mod api;
pub mod config;
pub mod files;
pub mod theme;
pub mod ui;
