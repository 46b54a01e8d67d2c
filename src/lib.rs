//! Library crate for multisport-score-back, exposing modules for binaries and integration tests.

pub mod config;
/// Storage backends behind the game store trait.
pub mod dao;
/// Request and response bodies of the HTTP and SSE surface.
pub mod dto;
/// Error layers and their HTTP mapping.
pub mod error;
/// Axum routers, one per resource.
pub mod routes;
/// Use cases behind the routes, plus background tasks.
pub mod services;
pub mod sports;
/// Shared application state, the game model and its engine.
pub mod state;
pub mod sync;
