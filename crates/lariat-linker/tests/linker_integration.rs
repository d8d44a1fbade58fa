//! Integration tests for the linking layer: cache coherence under
//! concurrency, loader-aware retention, and end-to-end call-site linking.

use lariat_core::access::DirectAccess;
use lariat_core::handle::InvokeFn;
use lariat_core::member::RawMember;
use lariat_core::types::{StaticType, TypeKey};
use lariat_core::{LinkError, LoaderScope, Value};
use lariat_linker::{
    CallSite, CallSiteDescriptor, ClassMap, CoreServices, DynamicLinker, LinkerServices,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn tag_body(ret: &TypeKey, tag: &str) -> InvokeFn {
    let ret = ret.clone();
    let tag = tag.to_string();
    Arc::new(move |_args: &[Value]| Ok(Value::str(ret.clone(), tag.clone())))
}

fn services() -> Arc<dyn LinkerServices> {
    Arc::new(CoreServices)
}

#[test]
fn test_concurrent_gets_converge_on_one_value() {
    let scope = LoaderScope::bootstrap().new_child("app");
    let computed = Arc::new(AtomicUsize::new(0));
    let counter = computed.clone();
    let map: Arc<ClassMap<String>> = Arc::new(ClassMap::new(scope.clone(), move |key: &TypeKey| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(key.name().to_string()))
    }));

    let keys: Vec<TypeKey> = (0..4)
        .map(|i| TypeKey::new(format!("T{i}"), &scope))
        .collect();

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let mut handles = Vec::new();
    for _ in 0..threads {
        let map = map.clone();
        let keys = keys.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            keys.iter()
                .map(|key| map.get(key).unwrap())
                .collect::<Vec<_>>()
        }));
    }

    let results: Vec<Vec<Arc<String>>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Every thread observed the same published value per key.
    for (i, key) in keys.iter().enumerate() {
        let winner = map.get(key).unwrap();
        for row in &results {
            assert!(Arc::ptr_eq(&row[i], &winner));
            assert_eq!(row[i].as_str(), key.name());
        }
    }
    // Redundant computation is allowed, unbounded recomputation is not:
    // once published, nothing recomputes.
    let after = computed.load(Ordering::SeqCst);
    map.get(&keys[0]).unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), after);
}

/// Value whose drop is observable, for retention tests.
struct Tracked {
    dropped: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_strong_entry_survives_key_drop() {
    let root = LoaderScope::bootstrap();
    let app = root.new_child("app");
    let dropped = Arc::new(AtomicUsize::new(0));
    let flag = dropped.clone();
    let map: ClassMap<Tracked> = ClassMap::new(app.clone(), move |_key: &TypeKey| {
        Ok(Arc::new(Tracked {
            dropped: flag.clone(),
        }))
    });

    let ty = TypeKey::new("AppThing", &app);
    map.get(&ty).unwrap();
    drop(ty);
    map.sweep();

    // Pinned by the strong partition regardless of the key's other refs.
    assert_eq!(map.strong_count(), 1);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);
}

#[test]
fn test_weak_entry_is_reclaimed_with_its_key() {
    let app = LoaderScope::bootstrap().new_child("app");
    let throwaway = app.new_child("throwaway");
    let dropped = Arc::new(AtomicUsize::new(0));
    let computed = Arc::new(AtomicUsize::new(0));
    let flag = dropped.clone();
    let counter = computed.clone();
    let map: ClassMap<Tracked> = ClassMap::new(app, move |_key: &TypeKey| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Tracked {
            dropped: flag.clone(),
        }))
    });

    let ty = TypeKey::new("PluginThing", &throwaway);
    map.get(&ty).unwrap();
    map.get(&ty).unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 1);
    assert_eq!(map.strong_count(), 0);

    // Once the key is gone everywhere else, the entry is unrecoverable
    // and the value itself is released by the sweep.
    drop(ty);
    map.sweep();
    assert_eq!(map.weak_count(), 0);
    assert_eq!(dropped.load(Ordering::SeqCst), 1);

    // A new key for the same conceptual class starts from scratch.
    let again = TypeKey::new("PluginThing", &throwaway);
    map.get(&again).unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 2);
}

/// A small class hierarchy: Object <- String, Object <- Integer, with an
/// overloaded `render` on Doc, a varargs `join`, and a crosswise `pick`.
struct World {
    scope: LoaderScope,
    object: TypeKey,
    string: TypeKey,
    integer: TypeKey,
    doc: TypeKey,
}

impl World {
    fn new() -> Self {
        let scope = LoaderScope::bootstrap().new_child("world");
        let object = TypeKey::new("Object", &scope);
        let string = TypeKey::builder("String", &scope).parent(&object).build();
        let integer = TypeKey::builder("Integer", &scope).parent(&object).build();

        let doc = TypeKey::builder("Doc", &scope)
            .member(RawMember::method(
                "render",
                vec![integer.clone()],
                tag_body(&string, "render(Integer)"),
            ))
            .member(RawMember::method(
                "render",
                vec![string.clone()],
                tag_body(&string, "render(String)"),
            ))
            .member(RawMember::method(
                "render",
                vec![object.clone()],
                tag_body(&string, "render(Object)"),
            ))
            .member(RawMember::varargs_method(
                "join",
                vec![string.clone(), integer.clone()],
                {
                    let ret = string.clone();
                    Arc::new(move |args: &[Value]| {
                        let sep = args[0].as_str().unwrap_or("");
                        let parts = args[1].as_array().unwrap_or(&[]);
                        let joined = parts
                            .iter()
                            .filter_map(Value::as_int)
                            .map(|n| n.to_string())
                            .collect::<Vec<_>>()
                            .join(sep);
                        Ok(Value::str(ret.clone(), joined))
                    })
                },
            ))
            .member(RawMember::method(
                "pick",
                vec![string.clone(), object.clone()],
                tag_body(&string, "pick(String, Object)"),
            ))
            .member(RawMember::method(
                "pick",
                vec![object.clone(), string.clone()],
                tag_body(&string, "pick(Object, String)"),
            ))
            .build();

        Self {
            scope,
            object,
            string,
            integer,
            doc,
        }
    }

    fn linker(&self) -> DynamicLinker {
        DynamicLinker::new(self.scope.clone(), Arc::new(DirectAccess))
    }

    fn str_val(&self, s: &str) -> Value {
        Value::str(self.string.clone(), s)
    }

    fn int_val(&self, n: i64) -> Value {
        Value::int(self.integer.clone(), n)
    }
}

#[test]
fn test_link_time_resolution_with_known_types() {
    let world = World::new();
    let linker = world.linker();

    let shape = CallSiteDescriptor::new(
        "render",
        vec![StaticType::Known(world.integer.clone())],
    );
    let handle = linker.link(&world.doc, &shape, &services()).unwrap();

    // render(String) is filtered out statically; render(Object) stays
    // applicable, so the survivors are tie-broken by specificity.
    let out = handle.invoke(&[world.int_val(7)]).unwrap();
    assert_eq!(out.as_str(), Some("render(Integer)"));
}

#[test]
fn test_deferred_resolution_with_erased_shape() {
    let world = World::new();
    let linker = world.linker();

    let shape = CallSiteDescriptor::unknown("render", 1);
    let handle = linker.link(&world.doc, &shape, &services()).unwrap();
    assert!(handle.signature().is_none());

    let out = handle.invoke(&[world.str_val("hi")]).unwrap();
    assert_eq!(out.as_str(), Some("render(String)"));
    let out = handle.invoke(&[world.int_val(1)]).unwrap();
    assert_eq!(out.as_str(), Some("render(Integer)"));
    let out = handle.invoke(&[Value::unit(world.object.clone())]).unwrap();
    assert_eq!(out.as_str(), Some("render(Object)"));
}

#[test]
fn test_varargs_packing_end_to_end() {
    let world = World::new();
    let linker = world.linker();

    let shape = CallSiteDescriptor::new(
        "join",
        vec![
            StaticType::Known(world.string.clone()),
            StaticType::Known(world.integer.clone()),
            StaticType::Known(world.integer.clone()),
            StaticType::Known(world.integer.clone()),
        ],
    );
    let handle = linker.link(&world.doc, &shape, &services()).unwrap();

    let out = handle
        .invoke(&[
            world.str_val("-"),
            world.int_val(1),
            world.int_val(2),
            world.int_val(3),
        ])
        .unwrap();
    assert_eq!(out.as_str(), Some("1-2-3"));
}

#[test]
fn test_crosswise_tie_is_ambiguous_at_invocation_time() {
    let world = World::new();
    let linker = world.linker();

    let shape = CallSiteDescriptor::unknown("pick", 2);
    let handle = linker.link(&world.doc, &shape, &services()).unwrap();

    let err = handle
        .invoke(&[world.str_val("a"), world.str_val("b")])
        .unwrap_err();
    assert!(matches!(err, LinkError::Ambiguous { .. }));
}

#[test]
fn test_call_site_relinking() {
    let world = World::new();
    let linker = world.linker();

    let site = CallSite::new(CallSiteDescriptor::unknown("render", 1));
    assert!(matches!(
        site.invoke(&[world.str_val("x")]),
        Err(LinkError::NotLinked)
    ));

    linker
        .link_call_site(&world.doc, &site, &services())
        .unwrap();
    assert!(site.is_linked());
    let out = site.invoke(&[world.str_val("x")]).unwrap();
    assert_eq!(out.as_str(), Some("render(String)"));

    // Guard failure: the owner invalidates and relinks from scratch.
    site.invalidate();
    assert!(matches!(
        site.invoke(&[world.str_val("x")]),
        Err(LinkError::NotLinked)
    ));
    linker
        .link_call_site(&world.doc, &site, &services())
        .unwrap();
    let out = site.invoke(&[world.int_val(4)]).unwrap();
    assert_eq!(out.as_str(), Some("render(Integer)"));
}

#[test]
fn test_concurrent_linking_shares_metadata() {
    let world = World::new();
    let linker = Arc::new(world.linker());

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let mut handles = Vec::new();
    for _ in 0..threads {
        let linker = linker.clone();
        let barrier = barrier.clone();
        let doc = world.doc.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            linker.metadata(&doc).unwrap()
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for pair in results.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
    }
}
