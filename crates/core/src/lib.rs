//! Core filter types for omnivec
//!
//! This crate contains the backend-independent metadata-filter AST, its
//! validator, and the error vocabulary shared by every backend translator.

mod error;
mod filter;
mod validate;
mod value;

pub mod constants;
pub mod env_config;

pub use error::*;
pub use filter::*;
pub use validate::*;
pub use value::*;
