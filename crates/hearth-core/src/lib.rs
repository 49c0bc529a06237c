//! # Hearth Core
//!
//! Core domain types, identifiers, and interfaces for the Hearth family
//! platform.
//!
//! This crate provides the foundational types used throughout the system:
//! - Type-safe identifiers (newtype pattern)
//! - Domain entities (User, Family)
//! - Error types
//! - The coarse legacy role retained for backward compatibility

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod family;
pub mod id;
pub mod user;

pub use error::{FieldError, HearthError, HearthResult};
pub use family::*;
pub use id::*;
pub use user::*;
