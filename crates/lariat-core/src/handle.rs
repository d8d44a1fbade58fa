//! Invocable handles
//!
//! An [`InvocableHandle`] is the unit of code linking produces: something
//! that can be invoked with runtime values. Handles produced from concrete
//! members carry their declaring [`MethodSignature`]; residual dispatchers
//! synthesized by the overload resolver carry none.

use crate::types::TypeKey;
use crate::value::Value;
use crate::LinkResult;
use std::fmt;
use std::sync::Arc;

/// The callable backing an invocable handle
pub type InvokeFn = Arc<dyn Fn(&[Value]) -> LinkResult<Value> + Send + Sync>;

/// Declared signature of a concrete member
///
/// For a varargs member the last parameter type is the *element* type of
/// the collecting array, not the array type itself.
#[derive(Clone, PartialEq, Eq)]
pub struct MethodSignature {
    name: String,
    param_types: Vec<TypeKey>,
    varargs: bool,
}

impl MethodSignature {
    /// Create a signature
    pub fn new(name: impl Into<String>, param_types: Vec<TypeKey>, varargs: bool) -> Self {
        Self {
            name: name.into(),
            param_types,
            varargs,
        }
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn param_types(&self) -> &[TypeKey] {
        &self.param_types
    }

    /// True if the trailing parameter collects a variable argument list
    pub fn is_varargs(&self) -> bool {
        self.varargs
    }

    /// Number of leading fixed parameters (all of them unless varargs)
    pub fn fixed_arity(&self) -> usize {
        if self.varargs {
            self.param_types.len().saturating_sub(1)
        } else {
            self.param_types.len()
        }
    }

    /// Element type of the collecting array, for varargs signatures
    pub fn vararg_element(&self) -> Option<&TypeKey> {
        if self.varargs {
            self.param_types.last()
        } else {
            None
        }
    }
}

impl fmt::Debug for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, ty) in self.param_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ty.name())?;
            if self.varargs && i + 1 == self.param_types.len() {
                write!(f, "...")?;
            }
        }
        write!(f, ")")
    }
}

/// An invocable unit of code produced by linking
#[derive(Clone)]
pub struct InvocableHandle {
    signature: Option<Arc<MethodSignature>>,
    invoke: InvokeFn,
}

impl InvocableHandle {
    /// Handle backed by a concrete member with a declared signature
    pub fn direct(signature: MethodSignature, invoke: InvokeFn) -> Self {
        Self {
            signature: Some(Arc::new(signature)),
            invoke,
        }
    }

    /// Synthetic handle with no declaring signature, used for residual
    /// dispatchers that re-resolve on every call
    pub fn dispatcher(invoke: InvokeFn) -> Self {
        Self {
            signature: None,
            invoke,
        }
    }

    /// Declaring signature, if this handle is backed by a concrete member
    pub fn signature(&self) -> Option<&MethodSignature> {
        self.signature.as_deref()
    }

    /// Invoke with the given runtime arguments
    pub fn invoke(&self, args: &[Value]) -> LinkResult<Value> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for InvocableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(sig) => write!(f, "InvocableHandle({sig:?})"),
            None => write!(f, "InvocableHandle(<dispatcher>)"),
        }
    }
}
