//! Core business logic for usof.

pub mod services;

pub use services::*;
