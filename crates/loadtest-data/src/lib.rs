//! Reference data and synthetic record generation for pointer-loadtest.
//!
//! This crate owns the fixed corpus of identifiers that parameterizes load
//! test requests: patient (NHS) numbers, pointer IDs, and pointer type codes.
//! The corpus is loaded once per run and shared read-only across all workers;
//! the single-use delete pool is the only mutable piece and is synchronized
//! internally.

pub mod error;
pub mod nhs_number;
pub mod record;
pub mod reference;

pub use error::ReferenceDataError;
pub use nhs_number::{generate_nhs_number, is_valid_nhs_number};
pub use record::{create_record, DocumentReference, PointerType, DEFAULT_TEMPLATE};
pub use reference::{DeletePool, ReferenceDataset, DEFAULT_POINTER_TYPES};
