//! Cotacao Common Types
//!
//! This crate contains the types shared between the quote server and the
//! companion client: the canonical quote record, its wire envelope, the
//! deadline allocator, and the per-stage error taxonomy.

pub mod deadline;
pub mod error;
pub mod quote;

pub use deadline::*;
pub use error::*;
pub use quote::*;
