//! Reflective access capability
//!
//! Turning a [`RawMember`] into an [`InvocableHandle`] is the one place
//! where legality of access is checked. A member that cannot be legally
//! invoked should never have been linked at all, so an [`AccessError`] is
//! fatal to linking: the layer above converts it into
//! [`LinkError::IllegalAccess`](crate::LinkError::IllegalAccess) and
//! propagates it immediately, never caching or retrying.
//!
//! The capability arrives fully constructed at linker initialization;
//! how it is isolated or sandboxed is the embedder's concern.

use crate::handle::InvocableHandle;
use crate::member::{MemberKind, RawMember};

/// Error produced when a raw member cannot be unreflected
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccessError {
    /// The member is not legally invocable from the linking layer
    #[error("member `{0}` is not accessible")]
    Inaccessible(String),

    /// The member kind does not match the requested unreflection
    #[error("member `{name}` is a {actual:?}, not a {expected:?}")]
    WrongKind {
        /// Member name
        name: String,
        /// The kind the caller asked to unreflect
        expected: MemberKind,
        /// The kind the member actually is
        actual: MemberKind,
    },
}

/// Capability that turns raw members into invocable handles
pub trait ReflectiveAccess: Send + Sync {
    /// Unreflect a method
    fn unreflect(&self, member: &RawMember) -> Result<InvocableHandle, AccessError>;

    /// Unreflect a property getter
    fn unreflect_getter(&self, member: &RawMember) -> Result<InvocableHandle, AccessError>;

    /// Unreflect a property setter
    fn unreflect_setter(&self, member: &RawMember) -> Result<InvocableHandle, AccessError>;

    /// Unreflect a constructor
    fn unreflect_constructor(&self, member: &RawMember) -> Result<InvocableHandle, AccessError>;
}

/// In-process reflective access
///
/// Hands out the member's own body behind its declaring signature,
/// refusing inaccessible members and mismatched kinds.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectAccess;

impl DirectAccess {
    fn unreflect_kind(
        member: &RawMember,
        expected: MemberKind,
    ) -> Result<InvocableHandle, AccessError> {
        if member.kind() != expected {
            return Err(AccessError::WrongKind {
                name: member.name().to_string(),
                expected,
                actual: member.kind(),
            });
        }
        if !member.is_accessible() {
            return Err(AccessError::Inaccessible(member.name().to_string()));
        }
        Ok(InvocableHandle::direct(member.signature(), member.body().clone()))
    }
}

impl ReflectiveAccess for DirectAccess {
    fn unreflect(&self, member: &RawMember) -> Result<InvocableHandle, AccessError> {
        Self::unreflect_kind(member, MemberKind::Method)
    }

    fn unreflect_getter(&self, member: &RawMember) -> Result<InvocableHandle, AccessError> {
        Self::unreflect_kind(member, MemberKind::Getter)
    }

    fn unreflect_setter(&self, member: &RawMember) -> Result<InvocableHandle, AccessError> {
        Self::unreflect_kind(member, MemberKind::Setter)
    }

    fn unreflect_constructor(&self, member: &RawMember) -> Result<InvocableHandle, AccessError> {
        Self::unreflect_kind(member, MemberKind::Constructor)
    }
}
