//! Database record models matching table schemas.
//!
//! Models derive `sqlx::FromRow` and are kept separate from the API models in
//! [`crate::api::models`] so storage and wire shapes can evolve independently.

pub mod cameras;
