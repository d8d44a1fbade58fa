//! Lariat core type model
//!
//! This crate provides the building blocks the dynamic linking layer is
//! assembled from:
//! - Loader scopes and identity-keyed runtime types
//! - Dynamically typed values observed during dispatch
//! - Invocable handles and method signatures
//! - Raw member descriptors and the reflective access capability

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod access;
pub mod handle;
pub mod member;
pub mod scope;
pub mod types;
pub mod value;

pub use access::{AccessError, DirectAccess, ReflectiveAccess};
pub use handle::{InvocableHandle, InvokeFn, MethodSignature};
pub use member::{MemberKind, RawMember};
pub use scope::LoaderScope;
pub use types::{StaticType, TypeKey, WeakTypeKey};
pub use value::{Payload, Value};

/// Linking and invocation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LinkError {
    /// No candidate method applies to the observed argument types
    #[error("no applicable overload of `{name}` for argument types ({arg_types})")]
    NoMatch {
        /// Name of the dynamic method
        name: String,
        /// Rendered argument types of the failing call
        arg_types: String,
    },

    /// More than one candidate survived with no strict specificity winner
    #[error("ambiguous call to `{name}` for argument types ({arg_types}); candidates: {candidates}")]
    Ambiguous {
        /// Name of the dynamic method
        name: String,
        /// Rendered argument types of the failing call
        arg_types: String,
        /// Rendered signatures of the tied candidates
        candidates: String,
    },

    /// The type declares no member with the requested name
    #[error("type `{type_name}` has no member `{member}`")]
    NoSuchMember {
        /// Name of the type that was searched
        type_name: String,
        /// The requested member name
        member: String,
    },

    /// A selected member cannot be legally invoked; fatal, never retried
    #[error("illegal member access: {0}")]
    IllegalAccess(String),

    /// The call site has no target installed
    #[error("call site is not linked")]
    NotLinked,

    /// A member body reported a failure
    #[error("invocation failed: {0}")]
    Invocation(String),
}

impl From<AccessError> for LinkError {
    fn from(err: AccessError) -> Self {
        LinkError::IllegalAccess(err.to_string())
    }
}

/// Linking and invocation result
pub type LinkResult<T> = Result<T, LinkError>;
