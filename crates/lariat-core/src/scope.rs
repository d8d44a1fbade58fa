//! Loader scopes
//!
//! A loader scope identifies the code-loading context that defined a type.
//! Scopes form a parent chain rooted at the process-wide bootstrap scope.
//! A scope is *visible from* another scope when it is that scope or one of
//! its ancestors; the retention policy of the class-keyed cache is built
//! on this relation.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

static BOOTSTRAP: Lazy<LoaderScope> = Lazy::new(|| LoaderScope {
    inner: Arc::new(ScopeData {
        id: 0,
        name: "bootstrap".to_string(),
        parent: None,
    }),
});

#[derive(Debug)]
struct ScopeData {
    id: u64,
    name: String,
    parent: Option<LoaderScope>,
}

/// A code-loading context
///
/// Clones share identity; equality compares identity, never structure.
#[derive(Clone)]
pub struct LoaderScope {
    inner: Arc<ScopeData>,
}

impl LoaderScope {
    /// The process-wide root scope; ancestor of every scope created with
    /// [`LoaderScope::new_child`].
    pub fn bootstrap() -> Self {
        BOOTSTRAP.clone()
    }

    /// Create a child scope of this scope
    pub fn new_child(&self, name: impl Into<String>) -> Self {
        LoaderScope {
            inner: Arc::new(ScopeData {
                id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Unique identifier of this scope
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Scope name (for diagnostics)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Parent scope (None for the bootstrap scope)
    pub fn parent(&self) -> Option<&LoaderScope> {
        self.inner.parent.as_ref()
    }

    /// True if `self` is the same scope as `other` or one of its ancestors
    pub fn is_visible_from(&self, other: &LoaderScope) -> bool {
        let mut current = Some(other);
        while let Some(scope) = current {
            if scope.id() == self.id() {
                return true;
            }
            current = scope.parent();
        }
        false
    }
}

impl PartialEq for LoaderScope {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for LoaderScope {}

impl fmt::Debug for LoaderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoaderScope({}#{})", self.inner.name, self.inner.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_is_shared() {
        assert_eq!(LoaderScope::bootstrap(), LoaderScope::bootstrap());
        assert_eq!(LoaderScope::bootstrap().id(), 0);
        assert!(LoaderScope::bootstrap().parent().is_none());
    }

    #[test]
    fn test_child_identity() {
        let root = LoaderScope::bootstrap();
        let a = root.new_child("app");
        let b = root.new_child("app");

        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.parent(), Some(&root));
    }

    #[test]
    fn test_visibility_is_ancestry() {
        let root = LoaderScope::bootstrap();
        let app = root.new_child("app");
        let plugin = app.new_child("plugin");
        let sibling = root.new_child("sibling");

        // Every scope is visible from itself.
        assert!(app.is_visible_from(&app));
        // Ancestors are visible from descendants.
        assert!(root.is_visible_from(&plugin));
        assert!(app.is_visible_from(&plugin));
        // Not the other way around.
        assert!(!plugin.is_visible_from(&app));
        // Siblings see neither direction.
        assert!(!sibling.is_visible_from(&plugin));
        assert!(!plugin.is_visible_from(&sibling));
    }
}
