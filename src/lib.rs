//! Server-side rendering of component trees into strings, byte streams, and
//! pull iterators.

pub mod application;
pub mod config;
pub mod infra;
pub mod presentation;
