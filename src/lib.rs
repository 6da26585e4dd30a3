//! News content gateway library.
//!
//! A content access layer that sits between a news site's pages and its
//! upstream sources: a WordPress REST API for articles, plus trending-topic
//! and YouTube metadata sources that degrade to static fallbacks.

pub mod cache;
pub mod config;
pub mod constants;
pub mod fallback;
pub mod trends;
pub mod upstream;
pub mod web;
pub mod wordpress;
pub mod youtube;
