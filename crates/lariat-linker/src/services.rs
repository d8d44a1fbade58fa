//! Linker services
//!
//! The overload resolver never decides convertibility itself; it asks the
//! [`LinkerServices`] capability so an embedding language can widen the
//! rules (implicit numeric widening, wrapper types) without touching the
//! resolver.

use lariat_core::types::TypeKey;

/// Language-specific type conversion queries
pub trait LinkerServices: Send + Sync {
    /// True if a value of runtime type `from` can be passed where `to` is
    /// declared
    fn can_convert(&self, from: &TypeKey, to: &TypeKey) -> bool;
}

/// Conversion rules that admit only assignability along the parent chain
#[derive(Clone, Copy, Debug, Default)]
pub struct CoreServices;

impl LinkerServices for CoreServices {
    fn can_convert(&self, from: &TypeKey, to: &TypeKey) -> bool {
        to.is_assignable_from(from)
    }
}
