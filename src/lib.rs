//! Watchlist, watched and favorites lists for a movie catalog session,
//! synchronized between a remote document store and an on-device copy.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;
