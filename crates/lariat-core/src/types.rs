//! Runtime type keys
//!
//! A [`TypeKey`] is an opaque, globally unique identifier for a runtime
//! type. Equality is identity, never structure: two keys are the same type
//! only if they came from the same construction. A key records the loader
//! scope that defined it, an optional parent key (the assignability
//! chain), and the raw members the type declares.
//!
//! Keys can be downgraded to [`WeakTypeKey`] so caches can observe when a
//! type has become unreachable everywhere else.

use crate::member::RawMember;
use crate::scope::LoaderScope;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

struct TypeData {
    id: u64,
    name: String,
    scope: LoaderScope,
    parent: Option<TypeKey>,
    members: Vec<RawMember>,
    array_type: OnceCell<TypeKey>,
}

/// Identity-equal key for a runtime type
#[derive(Clone)]
pub struct TypeKey {
    inner: Arc<TypeData>,
}

impl TypeKey {
    /// Create a leaf type with no parent and no members
    pub fn new(name: impl Into<String>, scope: &LoaderScope) -> Self {
        Self::builder(name, scope).build()
    }

    /// Start building a type with a parent and declared members
    pub fn builder(name: impl Into<String>, scope: &LoaderScope) -> TypeKeyBuilder {
        TypeKeyBuilder {
            name: name.into(),
            scope: scope.clone(),
            parent: None,
            members: Vec::new(),
        }
    }

    /// Unique identifier of this type
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Type name (for diagnostics)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The loader scope that defined this type
    pub fn scope(&self) -> &LoaderScope {
        &self.inner.scope
    }

    /// Parent type in the assignability chain
    pub fn parent(&self) -> Option<&TypeKey> {
        self.inner.parent.as_ref()
    }

    /// Raw members declared directly on this type
    pub fn members(&self) -> &[RawMember] {
        &self.inner.members
    }

    /// True if a value of type `other` can be used where `self` is declared:
    /// `other` is this type or has it on its parent chain
    pub fn is_assignable_from(&self, other: &TypeKey) -> bool {
        let mut current = Some(other);
        while let Some(ty) = current {
            if ty.id() == self.id() {
                return true;
            }
            current = ty.parent();
        }
        false
    }

    /// The array type over this element type, created lazily and shared by
    /// all callers. Array types have no parent: assignability between
    /// arrays is identity only.
    pub fn array_of(&self) -> TypeKey {
        self.inner
            .array_type
            .get_or_init(|| TypeKey::new(format!("{}[]", self.inner.name), &self.inner.scope))
            .clone()
    }

    /// Downgrade to a weak key that does not keep the type alive
    pub fn downgrade(&self) -> WeakTypeKey {
        WeakTypeKey {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({}#{})", self.inner.name, self.inner.id)
    }
}

/// Weak form of a [`TypeKey`]; observes reclamation without preventing it
#[derive(Clone)]
pub struct WeakTypeKey {
    id: u64,
    inner: Weak<TypeData>,
}

impl WeakTypeKey {
    /// Identifier of the type this key referred to
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Recover the strong key if the type is still alive
    pub fn upgrade(&self) -> Option<TypeKey> {
        self.inner.upgrade().map(|inner| TypeKey { inner })
    }
}

impl fmt::Debug for WeakTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakTypeKey(#{})", self.id)
    }
}

/// Builder for [`TypeKey`]
pub struct TypeKeyBuilder {
    name: String,
    scope: LoaderScope,
    parent: Option<TypeKey>,
    members: Vec<RawMember>,
}

impl TypeKeyBuilder {
    /// Set the parent type
    pub fn parent(mut self, parent: &TypeKey) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Declare a raw member on the type
    pub fn member(mut self, member: RawMember) -> Self {
        self.members.push(member);
        self
    }

    /// Build the type key
    pub fn build(self) -> TypeKey {
        TypeKey {
            inner: Arc::new(TypeData {
                id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
                name: self.name,
                scope: self.scope,
                parent: self.parent,
                members: self.members,
                array_type: OnceCell::new(),
            }),
        }
    }
}

/// A statically declared argument type in a call shape
///
/// Call sites often carry erased or imprecise signatures; an `Unknown`
/// position keeps every candidate in contention until invocation time.
#[derive(Clone, Debug)]
pub enum StaticType {
    /// The argument type is known at link time
    Known(TypeKey),
    /// The argument type is only observable at invocation time
    Unknown,
}

impl StaticType {
    /// True for [`StaticType::Unknown`]
    pub fn is_unknown(&self) -> bool {
        matches!(self, StaticType::Unknown)
    }

    /// The known type key, if any
    pub fn known(&self) -> Option<&TypeKey> {
        match self {
            StaticType::Known(ty) => Some(ty),
            StaticType::Unknown => None,
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Known(ty) => write!(f, "{}", ty.name()),
            StaticType::Unknown => write!(f, "?"),
        }
    }
}
