//! API request/response models.
//!
//! Stream check reports are served as-is from [`crate::probes::models`]; this module holds the
//! shapes that exist only at the HTTP boundary.

pub mod cameras;
