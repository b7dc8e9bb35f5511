//! Integration tests for void_reflect crate
//!
//! Exercises attributed construction, re-binding on copy and tree operations
//! end to end through the public API

use std::rc::Rc;
use void_reflect::prelude::*;
use void_reflect::{rtti, DatumRef, JsonLoader, RttiRef};

#[derive(Debug, Clone, Default)]
struct Foo {
    data: Member<i32>,
}

impl Foo {
    fn with_data(value: i32) -> Self {
        Self {
            data: Member::scalar(value),
        }
    }
}

attributed!(Foo);

impl Attributed for Foo {
    fn signatures() -> Vec<Signature> {
        vec![Signature::external("Data", 1, |f: &Foo| &f.data)]
    }
}

#[derive(Debug, Clone)]
struct Bar {
    base: Foo,
    speeds: Member<f32>,
    label: Member<String>,
}

impl Default for Bar {
    fn default() -> Self {
        Self {
            base: Foo::default(),
            speeds: Member::new(vec![0.0; 3]),
            label: Member::scalar(String::from("bar")),
        }
    }
}

attributed!(Bar: Foo => base);

impl Attributed for Bar {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external("Speeds", 3, |b: &Bar| &b.speeds),
            Signature::external("Label", 1, |b: &Bar| &b.label),
            Signature::internal("Children", DatumType::Table, 2),
            Signature::internal("Tags", DatumType::String, 4),
        ]
    }
}

fn registry() -> TypeManager {
    let mut types = TypeManager::new();
    types.register::<Foo>().unwrap();
    types.register::<Bar>().unwrap();
    types
}

#[test]
fn test_foo_scenario() {
    let types = registry();
    let mut arena = ScopeArena::new();

    let foo1 = arena.create_attributed(&types, Foo::with_data(10)).unwrap();
    let foo2 = arena.create_attributed(&types, Foo::with_data(20)).unwrap();

    let data = |arena: &ScopeArena, id: ScopeId| arena.scope(id).unwrap().at("Data").unwrap().get::<i32>(0).unwrap();
    assert_eq!(data(&arena, foo1), 10);
    assert_eq!(data(&arena, foo2), 20);
    assert!(!arena.scopes_equal(foo1, foo2));

    let copy = arena.clone_scope(foo1).unwrap();
    assert_eq!(data(&arena, copy), 10);
    assert!(arena.scopes_equal(foo1, copy));
}

#[test]
fn test_attribute_count_and_order() {
    let types = registry();
    let mut arena = ScopeArena::new();
    let bar = arena.create_attributed(&types, Bar::default()).unwrap();
    let scope = arena.scope(bar).unwrap();

    let flattened = types.signatures(Bar::TYPE_ID).unwrap();
    assert_eq!(scope.len(), flattened.len() + 1);
    assert_eq!(
        scope.keys().collect::<Vec<_>>(),
        vec!["this", "Data", "Speeds", "Label", "Children", "Tags"]
    );

    assert!(scope.at("Data").unwrap().is_external());
    assert_eq!(scope.at("Speeds").unwrap().size(), 3);
    let tags = scope.at("Tags").unwrap();
    assert!(!tags.is_external());
    assert_eq!((tags.size(), tags.capacity()), (0, 4));
    assert_eq!(scope.at("Children").unwrap().datum_type(), DatumType::Table);

    let this = scope.at("this").unwrap().get::<RttiRef>(0).unwrap();
    assert!(this.get().unwrap().is(Foo::TYPE_ID));
    assert!(scope.is(Foo::TYPE_ID));
    assert_eq!(scope.type_name(), "Bar");
}

#[test]
fn test_member_and_datum_mutate_each_other() {
    let types = registry();
    let mut arena = ScopeArena::new();
    let bar = arena.create_attributed(&types, Bar::default()).unwrap();

    arena
        .scope_mut(bar)
        .unwrap()
        .at_mut("Speeds")
        .unwrap()
        .set(4.5f32, 2)
        .unwrap();
    assert_eq!(arena.object::<Bar>(bar).unwrap().speeds.get(2), Some(4.5));

    arena.object::<Foo>(bar).unwrap().data.set(0, 99);
    assert_eq!(arena.scope(bar).unwrap().at("Data").unwrap().get::<i32>(0).unwrap(), 99);

    arena.object::<Bar>(bar).unwrap().label.set(0, String::from("renamed"));
    assert_eq!(
        arena.scope(bar).unwrap().at("Label").unwrap().to_string(0).unwrap(),
        "renamed"
    );
}

#[test]
fn test_copy_then_mutate_leaves_original() {
    let types = registry();
    let mut arena = ScopeArena::new();
    let original = arena.create_attributed(&types, Bar::default()).unwrap();
    let copy = arena.clone_scope(original).unwrap();

    assert_eq!(arena.scope(copy).unwrap().type_name(), "Bar");
    assert!(arena.scope(copy).unwrap().at("Speeds").unwrap().is_external());

    arena.scope_mut(copy).unwrap().at_mut("Speeds").unwrap().set(7.0f32, 0).unwrap();
    arena.scope_mut(copy).unwrap().at_mut("Data").unwrap().set(5, 0).unwrap();

    assert_eq!(arena.object::<Bar>(copy).unwrap().speeds.get(0), Some(7.0));
    assert_eq!(arena.object::<Bar>(original).unwrap().speeds.get(0), Some(0.0));
    assert_eq!(arena.object::<Foo>(original).unwrap().data.value(), 0);
    assert_eq!(
        arena.scope(original).unwrap().at("Speeds").unwrap().get::<f32>(0).unwrap(),
        0.0
    );

    let this = arena.scope(copy).unwrap().at("this").unwrap().get::<RttiRef>(0).unwrap();
    let copied_bar = this.get().unwrap().downcast_ref::<Bar>().unwrap();
    assert!(copied_bar.speeds.shares_storage_with(&arena.object::<Bar>(copy).unwrap().speeds));
}

#[test]
fn test_clone_keeps_attributed_children() {
    let types = registry();
    let mut arena = ScopeArena::new();
    let parent = arena.create_attributed(&types, Bar::default()).unwrap();
    let child = arena.create_attributed(&types, Foo::with_data(3)).unwrap();
    arena.adopt(parent, child, "Children").unwrap();

    let copy = arena.clone_scope(parent).unwrap();
    let copied_child = arena.children(copy)[0];
    assert_ne!(copied_child, child);
    assert_eq!(arena.scope(copied_child).unwrap().type_name(), "Foo");
    assert_eq!(arena.object::<Foo>(copied_child).unwrap().data.value(), 3);
    assert!(arena.scopes_equal(parent, copy));

    arena.object::<Foo>(copied_child).unwrap().data.set(0, 4);
    assert!(!arena.scopes_equal(parent, copy));
    assert_eq!(arena.object::<Foo>(child).unwrap().data.value(), 3);
}

#[test]
fn test_update_external_storage_rebinds_in_place() {
    let types = registry();
    let mut arena = ScopeArena::new();
    let foo = arena.create_attributed(&types, Foo::with_data(1)).unwrap();
    arena.update_external_storage(foo).unwrap();
    assert_eq!(arena.scope(foo).unwrap().at("Data").unwrap().get::<i32>(0).unwrap(), 1);
    assert!(arena.update_external_storage(ScopeId::null()).is_err());
}

#[test]
fn test_register_requires_parent() {
    let mut types = TypeManager::new();
    let err = types.register::<Bar>().unwrap_err();
    assert!(matches!(err, ReflectError::InvalidOperation(_)));

    types.register::<Foo>().unwrap();
    assert!(matches!(
        types.register::<Foo>(),
        Err(ReflectError::DuplicateType { .. })
    ));

    let mut arena = ScopeArena::new();
    assert!(matches!(
        arena.create_attributed(&types, Bar::default()),
        Err(ReflectError::UnknownType(_))
    ));
    assert!(arena.is_empty());
}

#[test]
fn test_external_capacity_is_a_ceiling() {
    let member = Member::new(vec![1, 2]);
    let mut datum = Datum::new();
    datum.set_storage(&member).unwrap();

    let err = datum.push_back(3).unwrap_err();
    assert!(matches!(err, ReflectError::InvalidOperation(_)));
    assert_eq!(datum.size(), 2);
    assert_eq!(datum.get::<i32>(0).unwrap(), 1);
    assert_eq!(datum.get::<i32>(1).unwrap(), 2);
}

#[test]
fn test_adopt_cycle_leaves_trees_unchanged() {
    let mut arena = ScopeArena::new();
    let c = arena.create_scope();
    let middle = arena.append_scope(c, "children").unwrap();
    let d = arena.append_scope(middle, "children").unwrap();

    let err = arena.adopt(d, c, "loop").unwrap_err();
    assert!(matches!(err, ReflectError::Cycle { .. }));
    assert!(arena.scope(c).unwrap().parent().is_none());
    assert_eq!(arena.children(c), vec![middle]);
    assert_eq!(arena.children(middle), vec![d]);
    assert!(arena.children(d).is_empty());
    assert!(arena.scope(d).unwrap().find("loop").is_none());
}

#[test]
fn test_search_children_miss_in_deep_tree() {
    let mut arena = ScopeArena::new();
    let root = arena.create_scope();
    let child = arena.append_scope(root, "children").unwrap();
    arena.append_scope(child, "children").unwrap();
    assert!(arena.search_children(root, "nonexistent").is_none());

    let mut deepest = root;
    for _ in 0..10_000 {
        deepest = arena.append_scope(deepest, "children").unwrap();
    }
    assert!(arena.search_children(root, "nonexistent").is_none());
    assert_eq!(arena.ancestors(deepest).len(), 10_000);

    let copy = arena.clone_scope(root).unwrap();
    assert!(arena.scopes_equal(root, copy));
    arena.destroy(copy).unwrap();
}

#[test]
fn test_prescribed_and_auxiliary() {
    let types = registry();
    let mut arena = ScopeArena::new();
    let foo = arena.create_attributed(&types, Foo::default()).unwrap();
    let scope = arena.scope_mut(foo).unwrap();

    assert!(matches!(
        scope.append_auxiliary_attribute("Data"),
        Err(ReflectError::InvalidOperation(_))
    ));
    assert!(scope.append_auxiliary_attribute("this").is_err());
    scope.append_auxiliary_attribute("Notes").unwrap().push_back(String::from("hi")).unwrap();

    assert!(scope.is_prescribed_attribute("Data"));
    assert!(scope.is_auxiliary_attribute("Notes"));
    assert!(!scope.is_auxiliary_attribute("Missing"));
    assert_eq!(scope.prescribed_attributes(), vec!["this", "Data"]);
    assert_eq!(scope.auxiliary_attributes(), vec!["Notes"]);

    arena.clear(foo).unwrap();
    let scope = arena.scope(foo).unwrap();
    assert_eq!(scope.len(), 2);
    assert!(scope.find("Notes").is_none());
}

#[test]
fn test_create_child_by_class_name() {
    let types = registry();
    let mut factory = Factory::new();
    factory.register::<Foo>().unwrap();
    factory.register::<Bar>().unwrap();

    let mut arena = ScopeArena::new();
    let root = arena.create_scope();
    let child = arena.create_child(&types, &factory, root, "Bar", "Items").unwrap();
    assert_eq!(arena.scope(child).unwrap().parent(), Some(root));
    assert!(arena.scope(child).unwrap().is(Bar::TYPE_ID));

    assert!(matches!(
        arena.create_child(&types, &factory, root, "Nope", "Items"),
        Err(ReflectError::UnknownClass(_))
    ));
    assert_eq!(arena.len(), 2);
}

#[test]
fn test_json_populates_attributed_children() {
    let types = registry();
    let mut factory = Factory::new();
    factory.register::<Bar>().unwrap();

    let mut arena = ScopeArena::new();
    let root = arena.create_scope();
    JsonLoader::new(&types, &factory)
        .load_str(
            &mut arena,
            root,
            r#"{
                "Bars": { "type": "table", "class": "Bar", "value": {
                    "Data": { "type": "integer", "value": 12 },
                    "Speeds": { "type": "float", "value": [1, 2, 3] },
                    "Extra": { "type": "string", "value": "aux" }
                } }
            }"#,
        )
        .unwrap();

    let bar = arena.children(root)[0];
    let object = arena.object::<Bar>(bar).unwrap();
    assert_eq!(object.base.data.value(), 12);
    assert_eq!(object.speeds.to_vec(), vec![1.0, 2.0, 3.0]);
    assert!(arena.scope(bar).unwrap().is_auxiliary_attribute("Extra"));
}

#[test]
fn test_reference_datums_resolve() {
    let mut arena = ScopeArena::new();
    let scope = arena.create_scope();
    arena.scope_mut(scope).unwrap().append("Target").unwrap().push_back(8).unwrap();
    arena
        .scope_mut(scope)
        .unwrap()
        .append("Link")
        .unwrap()
        .push_back(DatumRef::new(scope, "Target"))
        .unwrap();

    let link = arena.scope(scope).unwrap().at("Link").unwrap().get::<DatumRef>(0).unwrap();
    assert_eq!(arena.resolve(&link).unwrap().get::<i32>(0).unwrap(), 8);
}

/// Copies lose their member storage, so re-binding a copy fails
#[derive(Debug)]
struct Brittle {
    data: Member<i32>,
}

impl Default for Brittle {
    fn default() -> Self {
        Self {
            data: Member::scalar(1),
        }
    }
}

impl Clone for Brittle {
    fn clone(&self) -> Self {
        Self {
            data: Member::new(Vec::new()),
        }
    }
}

attributed!(Brittle);

impl Attributed for Brittle {
    fn signatures() -> Vec<Signature> {
        vec![Signature::external("Data", 1, |b: &Brittle| &b.data)]
    }
}

#[test]
fn test_failed_clone_leaves_no_scopes() {
    let mut types = registry();
    types.register::<Brittle>().unwrap();
    let mut arena = ScopeArena::new();
    let root = arena.create_scope();
    let middle = arena.append_scope(root, "Children").unwrap();
    let brittle = arena.create_attributed(&types, Brittle::default()).unwrap();
    arena.adopt(middle, brittle, "Children").unwrap();
    assert_eq!(arena.len(), 3);

    assert!(matches!(
        arena.clone_scope(root),
        Err(ReflectError::InvalidOperation(_))
    ));
    assert_eq!(arena.len(), 3);
    assert_eq!(arena.roots(), vec![root]);
}

#[derive(Debug)]
struct Lamp {
    lit: bool,
}

rtti!(Lamp {
    fn describe(&self) -> String {
        format!("Lamp({})", if self.lit { "on" } else { "off" })
    }
});

#[test]
fn test_pointer_text_is_pointee_description() {
    let mut datum = Datum::from(RttiRef::from(Rc::new(Lamp { lit: true })));
    datum.push_back(RttiRef::null()).unwrap();
    assert_eq!(datum.to_string(0).unwrap(), "Lamp(on)");
    assert_eq!(datum.to_string(1).unwrap(), "nullptr");

    let types = registry();
    let mut arena = ScopeArena::new();
    let id = arena.create_attributed(&types, Bar::default()).unwrap();
    assert_eq!(arena.scope(id).unwrap().at("this").unwrap().to_string(0).unwrap(), "Bar");
}
