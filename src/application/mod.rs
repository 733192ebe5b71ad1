//! Application services: the render pipeline and error mapping.

pub mod error;
pub mod render;
