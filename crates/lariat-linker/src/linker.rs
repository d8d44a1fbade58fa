//! Per-class metadata and the dynamic linker front end
//!
//! [`ClassMetadata`] is the value the class-keyed cache computes for each
//! type: its members, unreflected through the injected
//! [`ReflectiveAccess`] capability and folded into dynamic methods, with
//! same-named overloads merged across the parent chain. [`DynamicLinker`]
//! owns the cache and answers link requests against it.

use crate::call_site::{CallSite, CallSiteDescriptor};
use crate::class_map::ClassMap;
use crate::method::{CandidateMethod, DynamicMethod};
use crate::services::LinkerServices;
use lariat_core::access::ReflectiveAccess;
use lariat_core::member::MemberKind;
use lariat_core::scope::LoaderScope;
use lariat_core::types::TypeKey;
use lariat_core::{InvocableHandle, LinkError, LinkResult};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Immutable linking metadata derived from one type
#[derive(Debug)]
pub struct ClassMetadata {
    methods: FxHashMap<String, Arc<DynamicMethod>>,
    constructor: Option<Arc<DynamicMethod>>,
    getters: FxHashMap<String, InvocableHandle>,
    setters: FxHashMap<String, InvocableHandle>,
}

impl ClassMetadata {
    /// Walk the type and its ancestors, unreflecting every member.
    /// Members declared lower in the chain are seen first; an ancestor
    /// member with an already-registered signature is skipped as an
    /// override. Constructors are taken from the type itself only.
    fn introspect(ty: &TypeKey, access: &dyn ReflectiveAccess) -> LinkResult<Self> {
        let mut buckets: FxHashMap<String, Vec<CandidateMethod>> = FxHashMap::default();
        let mut constructors: Vec<CandidateMethod> = Vec::new();
        let mut getters: FxHashMap<String, InvocableHandle> = FxHashMap::default();
        let mut setters: FxHashMap<String, InvocableHandle> = FxHashMap::default();

        let mut current = Some(ty.clone());
        while let Some(t) = current {
            for member in t.members() {
                match member.kind() {
                    MemberKind::Method => {
                        let handle = access.unreflect(member)?;
                        let Some(candidate) = CandidateMethod::from_handle(handle) else {
                            continue;
                        };
                        let bucket = buckets.entry(member.name().to_string()).or_default();
                        if bucket
                            .iter()
                            .any(|m| m.signature() == candidate.signature())
                        {
                            continue;
                        }
                        bucket.push(candidate);
                    }
                    MemberKind::Constructor => {
                        if t != *ty {
                            continue;
                        }
                        let handle = access.unreflect_constructor(member)?;
                        let Some(candidate) = CandidateMethod::from_handle(handle) else {
                            continue;
                        };
                        if constructors
                            .iter()
                            .any(|m| m.signature() == candidate.signature())
                        {
                            continue;
                        }
                        constructors.push(candidate);
                    }
                    MemberKind::Getter => {
                        let handle = access.unreflect_getter(member)?;
                        getters.entry(member.name().to_string()).or_insert(handle);
                    }
                    MemberKind::Setter => {
                        let handle = access.unreflect_setter(member)?;
                        setters.entry(member.name().to_string()).or_insert(handle);
                    }
                }
            }
            current = t.parent().cloned();
        }

        let methods = buckets
            .into_iter()
            .filter_map(|(name, candidates)| {
                DynamicMethod::from_candidates(name.clone(), candidates)
                    .map(|method| (name, Arc::new(method)))
            })
            .collect();
        let constructor =
            DynamicMethod::from_candidates(ty.name().to_string(), constructors).map(Arc::new);

        Ok(Self {
            methods,
            constructor,
            getters,
            setters,
        })
    }

    /// Dynamic method for the given name
    pub fn method(&self, name: &str) -> Option<&Arc<DynamicMethod>> {
        self.methods.get(name)
    }

    /// Constructor dynamic method, if the type declares constructors
    pub fn constructor(&self) -> Option<&Arc<DynamicMethod>> {
        self.constructor.as_ref()
    }

    /// Property getter for the given name
    pub fn getter(&self, name: &str) -> Option<&InvocableHandle> {
        self.getters.get(name)
    }

    /// Property setter for the given name
    pub fn setter(&self, name: &str) -> Option<&InvocableHandle> {
        self.setters.get(name)
    }
}

/// The linking front end: a class-keyed metadata cache plus the injected
/// reflective access capability
pub struct DynamicLinker {
    metadata: ClassMap<ClassMetadata>,
}

impl DynamicLinker {
    /// Create a linker whose cache is owned by `scope` and whose members
    /// are unreflected through `access`
    pub fn new(scope: LoaderScope, access: Arc<dyn ReflectiveAccess>) -> Self {
        let metadata = ClassMap::new(scope, move |ty: &TypeKey| {
            ClassMetadata::introspect(ty, access.as_ref()).map(Arc::new)
        });
        Self { metadata }
    }

    /// The scope governing the cache's retention policy
    pub fn scope(&self) -> &LoaderScope {
        self.metadata.scope()
    }

    /// Metadata for a type, computed on first request
    pub fn metadata(&self, ty: &TypeKey) -> LinkResult<Arc<ClassMetadata>> {
        self.metadata.get(ty)
    }

    /// Dynamic method of a type by name
    pub fn dynamic_method(
        &self,
        ty: &TypeKey,
        name: &str,
    ) -> LinkResult<Option<Arc<DynamicMethod>>> {
        Ok(self.metadata.get(ty)?.method(name).cloned())
    }

    /// Resolve a call shape against a type into an invocable target
    pub fn link(
        &self,
        ty: &TypeKey,
        shape: &CallSiteDescriptor,
        services: &Arc<dyn LinkerServices>,
    ) -> LinkResult<InvocableHandle> {
        let metadata = self.metadata.get(ty)?;
        let method = metadata
            .method(shape.name())
            .ok_or_else(|| LinkError::NoSuchMember {
                type_name: ty.name().to_string(),
                member: shape.name().to_string(),
            })?;
        method.get_invocation(shape, services)
    }

    /// Resolve a call site's shape and install the target on the site
    pub fn link_call_site(
        &self,
        ty: &TypeKey,
        site: &CallSite,
        services: &Arc<dyn LinkerServices>,
    ) -> LinkResult<()> {
        let target = self.link(ty, site.descriptor(), services)?;
        site.link(target);
        Ok(())
    }

    /// Drop weak cache entries whose type has been reclaimed
    pub fn sweep(&self) {
        self.metadata.sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CoreServices;
    use lariat_core::access::DirectAccess;
    use lariat_core::handle::InvokeFn;
    use lariat_core::member::RawMember;
    use lariat_core::Value;

    fn tag_body(ret: &TypeKey, tag: &str) -> InvokeFn {
        let ret = ret.clone();
        let tag = tag.to_string();
        Arc::new(move |_args: &[Value]| Ok(Value::str(ret.clone(), tag.clone())))
    }

    fn linker(scope: &LoaderScope) -> DynamicLinker {
        DynamicLinker::new(scope.clone(), Arc::new(DirectAccess))
    }

    fn services() -> Arc<dyn LinkerServices> {
        Arc::new(CoreServices)
    }

    #[test]
    fn test_overloads_merge_across_parent_chain() {
        let scope = LoaderScope::bootstrap().new_child("app");
        let string = TypeKey::new("String", &scope);
        let int = TypeKey::new("int", &scope);

        let base = TypeKey::builder("Base", &scope)
            .member(RawMember::method(
                "greet",
                vec![int.clone()],
                tag_body(&string, "Base::greet(int)"),
            ))
            .build();
        let derived = TypeKey::builder("Derived", &scope)
            .parent(&base)
            .member(RawMember::method(
                "greet",
                vec![string.clone()],
                tag_body(&string, "Derived::greet(String)"),
            ))
            .build();

        let linker = linker(&scope);
        let method = linker.dynamic_method(&derived, "greet").unwrap().unwrap();
        assert!(matches!(&*method, DynamicMethod::Overloaded(o) if o.len() == 2));

        let shape = CallSiteDescriptor::new(
            "greet",
            vec![lariat_core::StaticType::Known(int.clone())],
        );
        let handle = method.get_invocation(&shape, &services()).unwrap();
        let out = handle.invoke(&[Value::int(int, 5)]).unwrap();
        assert_eq!(out.as_str(), Some("Base::greet(int)"));
    }

    #[test]
    fn test_override_shadows_ancestor_member() {
        let scope = LoaderScope::bootstrap().new_child("app");
        let string = TypeKey::new("String", &scope);

        let base = TypeKey::builder("Base", &scope)
            .member(RawMember::method(
                "greet",
                vec![string.clone()],
                tag_body(&string, "Base::greet"),
            ))
            .build();
        let derived = TypeKey::builder("Derived", &scope)
            .parent(&base)
            .member(RawMember::method(
                "greet",
                vec![string.clone()],
                tag_body(&string, "Derived::greet"),
            ))
            .build();

        let linker = linker(&scope);
        let method = linker.dynamic_method(&derived, "greet").unwrap().unwrap();
        // The ancestor's identical signature was skipped.
        assert!(matches!(&*method, DynamicMethod::Single(_)));

        let handle = method
            .get_invocation(&CallSiteDescriptor::unknown("greet", 1), &services())
            .unwrap();
        let out = handle.invoke(&[Value::str(string, "x")]).unwrap();
        assert_eq!(out.as_str(), Some("Derived::greet"));
    }

    #[test]
    fn test_metadata_is_cached_per_type() {
        let scope = LoaderScope::bootstrap().new_child("app");
        let string = TypeKey::new("String", &scope);
        let ty = TypeKey::builder("Point", &scope)
            .member(RawMember::method(
                "norm",
                Vec::new(),
                tag_body(&string, "norm"),
            ))
            .build();

        let linker = linker(&scope);
        let first = linker.metadata(&ty).unwrap();
        let second = linker.metadata(&ty).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_illegal_access_is_fatal() {
        let scope = LoaderScope::bootstrap().new_child("app");
        let string = TypeKey::new("String", &scope);
        let ty = TypeKey::builder("Sealed", &scope)
            .member(
                RawMember::method("hidden", Vec::new(), tag_body(&string, "hidden"))
                    .inaccessible(),
            )
            .build();

        let linker = linker(&scope);
        let err = linker.metadata(&ty).unwrap_err();
        assert!(matches!(err, LinkError::IllegalAccess(_)));
    }

    #[test]
    fn test_missing_member_is_reported() {
        let scope = LoaderScope::bootstrap().new_child("app");
        let ty = TypeKey::new("Empty", &scope);

        let linker = linker(&scope);
        let err = linker
            .link(&ty, &CallSiteDescriptor::unknown("nope", 0), &services())
            .unwrap_err();
        assert!(matches!(err, LinkError::NoSuchMember { .. }));
    }

    #[test]
    fn test_accessors_and_constructors_unreflect() {
        let scope = LoaderScope::bootstrap().new_child("app");
        let string = TypeKey::new("String", &scope);

        let ty = TypeKey::builder("Widget", &scope)
            .member(RawMember::getter("label", tag_body(&string, "get label")))
            .member(RawMember::setter(
                "label",
                string.clone(),
                tag_body(&string, "set label"),
            ))
            .member(RawMember::constructor(
                "Widget",
                Vec::new(),
                tag_body(&string, "new Widget"),
            ))
            .member(RawMember::constructor(
                "Widget",
                vec![string.clone()],
                tag_body(&string, "new Widget(String)"),
            ))
            .build();

        let linker = linker(&scope);
        let metadata = linker.metadata(&ty).unwrap();

        let get = metadata.getter("label").unwrap();
        assert_eq!(get.invoke(&[]).unwrap().as_str(), Some("get label"));
        assert!(metadata.setter("label").is_some());

        let ctor = metadata.constructor().unwrap();
        let shape = CallSiteDescriptor::new(
            "Widget",
            vec![lariat_core::StaticType::Known(string.clone())],
        );
        let handle = ctor.get_invocation(&shape, &services()).unwrap();
        let out = handle.invoke(&[Value::str(string, "x")]).unwrap();
        assert_eq!(out.as_str(), Some("new Widget(String)"));
    }
}
