//! JSON HTTP surface over the engine.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
