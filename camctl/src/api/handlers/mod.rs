//! Axum route handlers.

pub mod cameras;
