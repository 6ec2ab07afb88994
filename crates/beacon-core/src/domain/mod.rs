//! Domain types: pointer and window geometry, and the per-tick payload.

pub mod geometry;
pub mod positions;
