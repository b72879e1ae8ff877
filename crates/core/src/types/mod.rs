//! Core types for the loyalty card service.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod role;
pub mod unique_code;
pub mod username;

pub use id::*;
pub use role::{Role, RoleError};
pub use unique_code::{UniqueCode, UniqueCodeError};
pub use username::{Username, UsernameError};
