//! Raw member descriptors
//!
//! A [`RawMember`] is the not-yet-linked description of a method, property
//! accessor, or constructor declared on a type: its signature, an
//! accessibility bit, and the implementation supplied by the embedder.
//! Members become invocable only by passing through the
//! [`ReflectiveAccess`](crate::access::ReflectiveAccess) capability.

use crate::handle::{InvokeFn, MethodSignature};
use crate::types::TypeKey;
use std::fmt;

/// Kind of a raw member
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// An instance or static method
    Method,
    /// A property getter
    Getter,
    /// A property setter
    Setter,
    /// A constructor
    Constructor,
}

/// A raw, not-yet-linked member of a type
#[derive(Clone)]
pub struct RawMember {
    name: String,
    kind: MemberKind,
    param_types: Vec<TypeKey>,
    varargs: bool,
    accessible: bool,
    body: InvokeFn,
}

impl RawMember {
    /// Describe a method
    pub fn method(name: impl Into<String>, param_types: Vec<TypeKey>, body: InvokeFn) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            param_types,
            varargs: false,
            accessible: true,
            body,
        }
    }

    /// Describe a varargs method; the last parameter type is the element
    /// type of the collecting array
    pub fn varargs_method(
        name: impl Into<String>,
        param_types: Vec<TypeKey>,
        body: InvokeFn,
    ) -> Self {
        Self {
            varargs: true,
            ..Self::method(name, param_types, body)
        }
    }

    /// Describe a property getter
    pub fn getter(name: impl Into<String>, body: InvokeFn) -> Self {
        Self {
            kind: MemberKind::Getter,
            ..Self::method(name, Vec::new(), body)
        }
    }

    /// Describe a property setter taking one value of the given type
    pub fn setter(name: impl Into<String>, param_type: TypeKey, body: InvokeFn) -> Self {
        Self {
            kind: MemberKind::Setter,
            ..Self::method(name, vec![param_type], body)
        }
    }

    /// Describe a constructor
    pub fn constructor(name: impl Into<String>, param_types: Vec<TypeKey>, body: InvokeFn) -> Self {
        Self {
            kind: MemberKind::Constructor,
            ..Self::method(name, param_types, body)
        }
    }

    /// Mark the member as not legally invocable from the linking layer
    pub fn inaccessible(mut self) -> Self {
        self.accessible = false;
        self
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member kind
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Whether the member may be legally invoked
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Implementation supplied by the embedder
    pub fn body(&self) -> &InvokeFn {
        &self.body
    }

    /// The declaring signature of this member
    pub fn signature(&self) -> MethodSignature {
        MethodSignature::new(self.name.clone(), self.param_types.clone(), self.varargs)
    }
}

impl fmt::Debug for RawMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMember")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("signature", &self.signature())
            .field("accessible", &self.accessible)
            .finish()
    }
}
