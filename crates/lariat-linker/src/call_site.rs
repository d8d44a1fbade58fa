//! Call sites and call shapes
//!
//! A [`CallSiteDescriptor`] is the statically visible shape of a call:
//! the method name and the declared argument types, any of which may be
//! unknown when the site's signature is erased. A [`CallSite`] is the
//! relinkable location itself: it starts unlinked, holds one target once
//! linked, and can be invalidated back to unlinked by its owner (for
//! example on a guard failure), after which linking starts over.

use lariat_core::types::StaticType;
use lariat_core::{InvocableHandle, LinkError, LinkResult, Value};
use parking_lot::Mutex;
use std::fmt;

/// Statically known shape of a call site
#[derive(Clone)]
pub struct CallSiteDescriptor {
    name: String,
    static_types: Vec<StaticType>,
}

impl CallSiteDescriptor {
    /// Create a call shape with the given statically declared types
    pub fn new(name: impl Into<String>, static_types: Vec<StaticType>) -> Self {
        Self {
            name: name.into(),
            static_types,
        }
    }

    /// Create a call shape with every argument type unknown at link time
    pub fn unknown(name: impl Into<String>, arg_count: usize) -> Self {
        Self::new(name, vec![StaticType::Unknown; arg_count])
    }

    /// Name of the method the site calls
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments the site passes
    pub fn arg_count(&self) -> usize {
        self.static_types.len()
    }

    /// Statically declared argument types
    pub fn static_types(&self) -> &[StaticType] {
        &self.static_types
    }

    /// True if any argument type is unknown at link time
    pub fn has_unknown(&self) -> bool {
        self.static_types.iter().any(StaticType::is_unknown)
    }
}

impl fmt::Display for CallSiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, ty) in self.static_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for CallSiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallSiteDescriptor({self})")
    }
}

/// A relinkable call site
pub struct CallSite {
    descriptor: CallSiteDescriptor,
    target: Mutex<Option<InvocableHandle>>,
}

impl CallSite {
    /// Create an unlinked call site
    pub fn new(descriptor: CallSiteDescriptor) -> Self {
        Self {
            descriptor,
            target: Mutex::new(None),
        }
    }

    /// The site's call shape
    pub fn descriptor(&self) -> &CallSiteDescriptor {
        &self.descriptor
    }

    /// True once a target is installed
    pub fn is_linked(&self) -> bool {
        self.target.lock().is_some()
    }

    /// Install a target, replacing any previous one
    pub fn link(&self, target: InvocableHandle) {
        *self.target.lock() = Some(target);
    }

    /// Drop the installed target; the next invocation fails until the
    /// owner relinks
    pub fn invalidate(&self) {
        *self.target.lock() = None;
    }

    /// Invoke the installed target
    pub fn invoke(&self, args: &[Value]) -> LinkResult<Value> {
        let target = self.target.lock().clone().ok_or(LinkError::NotLinked)?;
        target.invoke(args)
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("descriptor", &self.descriptor)
            .field("linked", &self.is_linked())
            .finish()
    }
}
