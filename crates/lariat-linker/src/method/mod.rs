//! Dynamic methods
//!
//! A dynamic method is a named unit of dispatch bound either to a single
//! concrete member or to all same-named overloads of a class. Producing an
//! invocation performs as much overload resolution as the call shape
//! allows at link time; when the shape leaves more than one candidate in
//! contention (or carries argument types unknown until invocation), the
//! returned handle is a residual dispatcher that finishes resolution
//! against the concrete argument types on every call.

mod resolver;

use crate::call_site::CallSiteDescriptor;
use crate::services::LinkerServices;
use lariat_core::handle::{InvocableHandle, MethodSignature};
use lariat_core::{LinkError, LinkResult};
use std::fmt;
use std::sync::Arc;

/// One member of an overload set
#[derive(Clone)]
pub struct CandidateMethod {
    signature: Arc<MethodSignature>,
    handle: InvocableHandle,
}

impl CandidateMethod {
    /// Wrap a handle backed by a concrete member; `None` if the handle
    /// carries no declaring signature
    pub fn from_handle(handle: InvocableHandle) -> Option<Self> {
        let signature = Arc::new(handle.signature()?.clone());
        Some(Self { signature, handle })
    }

    /// Declaring signature of the member
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// The member's invocable handle, unadapted
    pub fn handle(&self) -> &InvocableHandle {
        &self.handle
    }
}

impl fmt::Debug for CandidateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CandidateMethod({:?})", self.signature)
    }
}

/// A named overload set
///
/// Membership never changes once the owning [`DynamicMethod`] has been
/// published; duplicates by declaring signature are rejected at build
/// time.
#[derive(Clone, Debug)]
pub struct OverloadedMethod {
    name: String,
    methods: Vec<CandidateMethod>,
}

impl OverloadedMethod {
    /// Create an empty overload set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Name shared by every member of the set
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a candidate unless an equivalent signature is already present;
    /// returns false when the candidate was skipped as a duplicate
    pub fn add(&mut self, candidate: CandidateMethod) -> bool {
        if self
            .methods
            .iter()
            .any(|m| m.signature() == candidate.signature())
        {
            return false;
        }
        self.methods.push(candidate);
        true
    }

    /// The candidates in registration order
    pub fn methods(&self) -> &[CandidateMethod] {
        &self.methods
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True if the set has no candidates
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// A named, possibly overloaded unit of dispatch
#[derive(Clone, Debug)]
pub enum DynamicMethod {
    /// Bound to a single concrete member
    Single(CandidateMethod),
    /// Bound to all same-named overloads of a class
    Overloaded(OverloadedMethod),
}

impl DynamicMethod {
    /// Build from a candidate list: `Single` for exactly one candidate,
    /// `Overloaded` otherwise
    pub fn from_candidates(
        name: impl Into<String>,
        candidates: Vec<CandidateMethod>,
    ) -> Option<Self> {
        let mut candidates = candidates;
        match candidates.len() {
            0 => None,
            1 => candidates.pop().map(DynamicMethod::Single),
            _ => {
                let mut set = OverloadedMethod::new(name);
                for candidate in candidates {
                    set.add(candidate);
                }
                Some(DynamicMethod::Overloaded(set))
            }
        }
    }

    /// Name of the dynamic method
    pub fn name(&self) -> &str {
        match self {
            DynamicMethod::Single(m) => m.signature().name(),
            DynamicMethod::Overloaded(o) => o.name(),
        }
    }

    /// Create an invocation for the given call shape
    ///
    /// Overloaded methods are narrowed by static applicability first. A
    /// uniquely applicable candidate with a fully known shape links
    /// directly; otherwise the returned handle re-resolves the surviving
    /// candidates against concrete argument types on every invocation.
    /// Varargs targets are adapted so trailing arguments are packed into
    /// one array value before the underlying member runs.
    pub fn get_invocation(
        &self,
        call_site: &CallSiteDescriptor,
        services: &Arc<dyn LinkerServices>,
    ) -> LinkResult<InvocableHandle> {
        match self {
            DynamicMethod::Single(m) => {
                if !resolver::matches_arity(m.signature(), call_site.arg_count()) {
                    return Err(LinkError::NoMatch {
                        name: self.name().to_string(),
                        arg_types: resolver::describe_shape(call_site),
                    });
                }
                Ok(resolver::adapt(m))
            }
            DynamicMethod::Overloaded(o) => {
                let applicable: Vec<CandidateMethod> = o
                    .methods()
                    .iter()
                    .filter(|m| {
                        resolver::static_applicable(m.signature(), call_site, services.as_ref())
                    })
                    .cloned()
                    .collect();
                if applicable.is_empty() {
                    return Err(LinkError::NoMatch {
                        name: o.name().to_string(),
                        arg_types: resolver::describe_shape(call_site),
                    });
                }
                if applicable.len() == 1 && !call_site.has_unknown() {
                    // Full link-time resolution.
                    return Ok(resolver::adapt(&applicable[0]));
                }
                Ok(resolver::residual_dispatcher(
                    o.name().to_string(),
                    applicable,
                    services.clone(),
                ))
            }
        }
    }

    /// True if some candidate's declaring signature equals the handle's;
    /// used to avoid registering the same member twice
    pub fn contains(&self, handle: &InvocableHandle) -> bool {
        let Some(signature) = handle.signature() else {
            return false;
        };
        match self {
            DynamicMethod::Single(m) => m.signature() == signature,
            DynamicMethod::Overloaded(o) => {
                o.methods().iter().any(|m| m.signature() == signature)
            }
        }
    }
}
