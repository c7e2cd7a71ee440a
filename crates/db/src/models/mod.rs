//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row, plus whatever create DTOs and response shapes the API needs.

pub mod annotation;
pub mod inference;
pub mod sample;
pub mod session;
pub mod user;
pub mod video;
