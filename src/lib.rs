//! Homefeed - a localized home screen content feed
//!
//! This crate fetches the pre-aggregated JSON feed published for a locale,
//! optionally through a proxy, and reshapes it into per-source collections.

pub mod config;
pub mod fetcher;
pub mod model;
pub mod proxy;
pub mod routes;
