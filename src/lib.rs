//! Building fiber-readiness map client.
//!
//! ARCHITECTURE
//! ============
//! - `map`: viewport-driven loading of building footprints and centroids,
//!   the layer store that tracks which buildings are fiber-ready, and the
//!   async session that debounces pan/zoom input.
//! - `net`: typed reqwest client for the REST API.
//! - `services`: record workflows that keep the map in step with saves and
//!   deletes.
//! - `config`: environment-driven settings shared by all of the above.

pub mod config;
pub mod map;
pub mod net;
pub mod services;
