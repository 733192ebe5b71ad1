//! Concrete components and the route table served by the binary.

pub mod components;
pub mod site;
