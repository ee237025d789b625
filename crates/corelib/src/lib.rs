//! Core types: math re-exports, Camera, Spin.

pub use glam::{Mat4, Vec3, vec3};

pub mod camera;
pub mod error;
pub mod spin;

pub use error::{CoreError, CoreResult};
