//! Core types and trait definitions for geonotify.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the incident model, the geofence matcher, the delivery task format and the
//! location-check flow; storage and queue backends plug in through the traits
//! in [`store`] and [`queue`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod check;
pub mod error;
pub mod geofence;
pub mod incident;
pub mod location;
pub mod payload;
pub mod queue;
pub mod store;

pub use error::{Error, Result};
