//! Shared domain types for the Auteur replay director.

pub mod config;
pub mod director;
pub mod events;
pub mod observation;
pub mod secs;
pub mod timeline;

mod errors;

pub use errors::{AuteurError, Result};
