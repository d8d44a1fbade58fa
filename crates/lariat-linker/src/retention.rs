//! Cache retention policy
//!
//! An entry may be strongly retained when the key's defining scope is
//! visible from the cache owner's scope: the owner's loading context can
//! already reach that scope, so pinning the entry cannot keep anything
//! alive that the owner was not keeping alive anyway. Everything else is
//! held weakly so a throwaway scope can be reclaimed.

use lariat_core::scope::LoaderScope;

/// How a cache entry is retained
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetentionMode {
    /// The entry is pinned for the lifetime of the cache
    Strong,
    /// The entry lives only as long as its key is reachable elsewhere
    Weak,
}

impl RetentionMode {
    /// Pick the retention mode for an entry whose key was defined in
    /// `candidate`, held by a cache owned by `owner`
    pub fn for_scopes(owner: &LoaderScope, candidate: &LoaderScope) -> Self {
        if can_retain_strongly(owner, candidate) {
            RetentionMode::Strong
        } else {
            RetentionMode::Weak
        }
    }
}

/// True iff `candidate` is the same scope as, or an ancestor of, `owner`
///
/// Pure relation lookup; called once per cache miss.
pub fn can_retain_strongly(owner: &LoaderScope, candidate: &LoaderScope) -> bool {
    candidate.is_visible_from(owner)
}
