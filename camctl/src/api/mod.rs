//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Response shapes that exist only at the HTTP boundary
//!
//! # API Structure
//!
//! Everything lives under `/api`:
//!
//! - **Diagnostics** (`/api/debug/cameras/{id}/stream-check`): On-demand stream checks
//! - **Cameras** (`/api/cameras/{id}/playback`): Normalized player URLs
//!
//! Responses under `/api` are never cached. OpenAPI documentation is served at `/api/docs`.

pub mod handlers;
pub mod models;
