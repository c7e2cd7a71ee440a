//! Domain logic for the dashlabel annotation backend.
//!
//! Everything in this crate is pure: no database, network or filesystem
//! access. The `db` and `api` crates build on these types and rules.

pub mod alignment;
pub mod annotation;
pub mod clock;
pub mod error;
pub mod inference;
pub mod lock;
pub mod selection;
pub mod storage;
pub mod timeseries;
pub mod types;
pub mod workflow;
