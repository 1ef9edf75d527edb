//! Whole-substrate properties checked through the tree classes.

use loom_object::{ClassTag, DeepCopy, Item, ItemId, ObjectId, Rewrite, Storage, Store, Visit};
use loom_tree::{new_store, ENodeKind, LiteralKind, Tree, TreeKind, Type, TypeKind, TREE_TAG};
use std::collections::HashSet;

fn named(store: &mut Store, kind: TreeKind, name: &str) -> Tree {
    let t = Tree::new(store, kind);
    let ident = store.intern(name);
    t.set_ident(store, ident);
    t
}

fn int(store: &mut Store, value: i64) -> Tree {
    let lit = Tree::new(store, TreeKind::Literal);
    lit.set_subkind(store, LiteralKind::Int);
    lit.set_ival(store, value);
    lit
}

/// Writes a distinguishable value into every item of `id` that `keep`
/// allows, returning what was written.
fn populate(store: &mut Store, id: ObjectId, keep: u64) -> Vec<(ItemId, Item)> {
    let class = store.class(store.tag(id));
    let mask = class.slots_for(store.kind(id)) & keep;
    let mut written = Vec::new();
    for (n, item) in ItemId::iter_mask(mask).enumerate() {
        let value = match item.storage() {
            Storage::Ident => {
                let ident = store.intern(&format!("item{n}"));
                store.set_ident(id, item, ident);
                Item::Ident(Some(ident))
            }
            Storage::Int => {
                store.set_int(id, item, n as i64 + 1);
                Item::Int(n as i64 + 1)
            }
            Storage::Double => {
                store.set_double(id, item, n as f64 + 0.5);
                Item::Double(n as f64 + 0.5)
            }
            Storage::Object => {
                let target = store.alloc(store.tag(id), 0);
                store.set_object(id, item, Some(target));
                Item::Object(Some(target))
            }
            Storage::Array => {
                let target = store.alloc(store.tag(id), 0);
                store.push_array(id, item, target);
                Item::Array(vec![target])
            }
        };
        written.push((item, value));
    }
    written
}

#[test]
fn every_kind_of_every_class_has_a_schema() {
    let store = new_store();
    for class in store.registry().iter() {
        assert!(class.validate().is_ok(), "{}", class.name);
        for kind in 0..class.kind_count() as u16 {
            assert_ne!(class.slots_for(kind), 0);
            assert!(!class.kind_name(kind).is_empty());
            assert_ne!(class.kind_name(kind), "<invalid kind>");
        }
    }
}

#[test]
fn slots_round_trip_for_every_storage_kind() {
    let mut store = new_store();
    store.open_arena();
    for kind in TreeKind::ALL {
        let node = Tree::new(&mut store, *kind);
        let written = populate(&mut store, node.id(), u64::MAX);
        for (item, value) in written {
            assert_eq!(store.get(node.id()).item(item), Some(&value), "{kind} {}", item.name());
        }
    }
}

#[test]
fn retags_keep_shared_items() {
    let mut store = new_store();
    for class in store.registry().iter().collect::<Vec<_>>() {
        for &(from, to) in class.change_allowed {
            store.open_arena();
            let id = store.alloc(class.tag, from);
            let written = populate(&mut store, id, class.slots_for(to));
            store.change_kind(id, to);
            assert_eq!(store.kind(id), to);
            for (item, value) in written {
                assert_eq!(
                    store.get(id).item(item),
                    Some(&value),
                    "{} -> {} lost {}",
                    class.kind_name(from),
                    class.kind_name(to),
                    item.name()
                );
            }
        }
    }
}

#[test]
#[should_panic(expected = "cannot change tree kind T_ENTITY to T_ARCH")]
fn undeclared_retag_is_fatal() {
    let mut store = new_store();
    store.open_arena();
    let entity = Tree::new(&mut store, TreeKind::Entity);
    entity.change_kind(&mut store, TreeKind::Arch);
}

/// R = process with two statements A and B whose values share X.
fn shared_graph(store: &mut Store) -> (Tree, Tree, Tree, Tree) {
    let root = named(store, TreeKind::Process, "r");
    let x = int(store, 7);
    let a = Tree::new(store, TreeKind::Return);
    a.set_value(store, Some(x));
    let b = Tree::new(store, TreeKind::Assert);
    b.set_value(store, Some(x));
    root.add_stmt(store, a);
    root.add_stmt(store, b);
    (root, a, b, x)
}

#[test]
fn visit_reaches_shared_nodes_once() {
    let mut store = new_store();
    store.open_arena();
    let (root, _, _, x) = shared_graph(&mut store);

    let mut seen = Vec::new();
    let count = root.visit(&store, |_, t| seen.push(t));
    assert_eq!(count, 4);
    assert_eq!(seen.iter().filter(|t| **t == x).count(), 1);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), seen.len());
}

#[test]
fn consecutive_visits_get_fresh_generations() {
    let mut store = new_store();
    store.open_arena();
    let (root, _, _, _) = shared_graph(&mut store);
    let first = Visit::new(&store);
    let g1 = first.generation();
    assert_eq!(first.run(root.id(), &mut |_: &Store, _: ObjectId| {}), 4);
    let second = Visit::new(&store);
    assert!(second.generation() > g1);
    assert_eq!(second.run(root.id(), &mut |_: &Store, _: ObjectId| {}), 4);
}

#[test]
fn rewrite_substitutes_one_replacement_for_a_shared_node() {
    let mut store = new_store();
    store.open_arena();
    let (root, a, b, x) = shared_graph(&mut store);

    let mut replaced = 0;
    root.rewrite(&mut store, |s, t| {
        if t == x {
            replaced += 1;
            Some(int(s, 8))
        } else {
            Some(t)
        }
    });
    assert_eq!(replaced, 1);
    let xa = a.value(&store);
    assert_ne!(xa, x);
    assert_eq!(xa, b.value(&store));
    assert_eq!(xa.ival(&store), 8);
}

#[test]
fn rewrite_deletes_array_elements() {
    let mut store = new_store();
    store.open_arena();
    let (root, a, b, _) = shared_graph(&mut store);
    let generic = Rewrite::new(TREE_TAG)
        .kind(TreeKind::Return.as_raw())
        .post(|_, _| None)
        .run(&mut store, root.id());
    assert_eq!(generic, Some(root.id()));
    assert_eq!(root.stmts(&store).collect::<Vec<_>>(), vec![b]);
    assert_ne!(root.stmt(&store, 0), a);
}

#[test]
fn copy_clones_a_shared_node_once() {
    let mut store = new_store();
    store.open_arena();
    let (root, a, b, x) = shared_graph(&mut store);

    let clone = root.copy(&mut store, |_, t| t == x, |_, _, _| {}, |_, _, _| {});
    assert_ne!(clone, root);
    let (ca, cb) = (clone.stmt(&store, 0), clone.stmt(&store, 1));
    assert_ne!(ca, a);
    assert_ne!(cb, b);
    let cx = ca.value(&store);
    assert_ne!(cx, x);
    assert_eq!(cx, cb.value(&store));
    assert_eq!(a.value(&store), x);
}

#[test]
fn copy_shares_what_the_predicate_leaves() {
    let mut store = new_store();
    store.open_arena();
    let decl = named(&mut store, TreeKind::ConstDecl, "c");
    let body = named(&mut store, TreeKind::FuncBody, "f");
    let name = named(&mut store, TreeKind::Ref, "c");
    name.set_reference(&mut store, Some(decl));
    let ret = Tree::new(&mut store, TreeKind::Return);
    ret.set_value(&mut store, Some(name));
    body.add_stmt(&mut store, ret);

    let clone = DeepCopy::new()
        .clone_if(TREE_TAG, |s, id| store_kind(s, id) == TreeKind::Ref)
        .run(&mut store, body.id());
    let clone = Tree::from_id(&store, clone).unwrap();
    let cloned_name = clone.stmt(&store, 0).value(&store);
    assert_ne!(cloned_name, name);
    assert_eq!(cloned_name.reference(&store), decl);
}

fn store_kind(store: &Store, id: ObjectId) -> TreeKind {
    Tree::from_id(store, id).unwrap().kind(store)
}

#[test]
#[should_panic(expected = "is frozen")]
fn frozen_arenas_reject_mutation() {
    let mut store = new_store();
    let arena = store.open_arena();
    let entity = named(&mut store, TreeKind::Entity, "e");
    store.freeze(arena);
    let other = store.intern("f");
    entity.set_ident(&mut store, other);
}

#[test]
#[should_panic(expected = "no arena is open")]
fn allocation_needs_an_open_arena() {
    let mut store = new_store();
    let arena = store.open_arena();
    store.freeze(arena);
    Tree::new(&mut store, TreeKind::Null);
}

#[test]
fn opening_an_arena_freezes_the_previous_one() {
    let mut store = new_store();
    let first = store.open_arena();
    named(&mut store, TreeKind::Package, "p");
    let second = store.open_arena();
    assert!(store.is_frozen(first));
    assert!(!store.is_frozen(second));
    assert_eq!(store.arena(first).key(), Some("p"));
}

#[test]
fn serialization_preserves_sharing_and_cross_class_links() {
    let mut store = new_store();
    store.open_arena();
    let unit = named(&mut store, TreeKind::Package, "shapes");
    let int_type = Type::new(&mut store, TypeKind::Integer);
    let range = Tree::new(&mut store, TreeKind::Range);
    let (lo, hi) = (int(&mut store, 0), int(&mut store, 255));
    range.set_left(&mut store, lo);
    range.set_right(&mut store, hi);
    int_type.add_dim(&mut store, range);
    let type_decl = named(&mut store, TreeKind::TypeDecl, "byte");
    type_decl.set_type(&mut store, Some(int_type));
    unit.add_decl(&mut store, type_decl);
    for name in ["a", "b"] {
        let c = named(&mut store, TreeKind::ConstDecl, name);
        c.set_type(&mut store, Some(int_type));
        c.set_value(&mut store, Some(hi));
        unit.add_decl(&mut store, c);
    }

    let mut bytes = Vec::new();
    unit.write(&mut store, &mut bytes).unwrap();
    let mut other = new_store();
    let back = Tree::read(&mut other, &mut bytes.as_slice(), &mut loom_object::LoadedOnly).unwrap();

    let decls: Vec<Tree> = back.decls(&other).collect();
    assert_eq!(decls.len(), 3);
    let ty = decls[0].ty(&other);
    assert_eq!(ty.kind(&other), TypeKind::Integer);
    assert_eq!(decls[1].ty(&other), ty);
    assert_eq!(decls[2].ty(&other), ty);
    assert_eq!(decls[1].value(&other), decls[2].value(&other));
    assert_eq!(ty.dim(&other, 0).right(&other), decls[1].value(&other));
    assert_eq!(ty.dim(&other, 0).left(&other).ival(&other), 0);
    assert_eq!(other.ident_str(decls[2].ident(&other)), "b");
}

#[test]
fn sweep_reclaims_unreachable_nodes_only() {
    let mut store = new_store();
    let arena = store.open_arena();
    let entity = named(&mut store, TreeKind::Entity, "e");
    let kept = named(&mut store, TreeKind::SignalDecl, "kept");
    entity.add_decl(&mut store, kept);
    let abandoned = named(&mut store, TreeKind::SignalDecl, "abandoned");
    let abandoned_value = int(&mut store, 1);
    abandoned.set_value(&mut store, Some(abandoned_value));

    store.freeze(arena);
    assert!(store.is_live(entity.id()));
    assert!(store.is_live(kept.id()));
    assert!(!store.is_live(abandoned.id()));
    assert!(!store.is_live(abandoned_value.id()));
    assert_eq!(store.arena(arena).live_count(), 2);
}

#[test]
fn elaboration_roots_anchor_their_arena() {
    let mut store = new_store();
    let arena = store.open_arena();
    let root = loom_tree::ENode::new(&mut store, ENodeKind::Root);
    let scope = loom_tree::ENode::new(&mut store, ENodeKind::Scope);
    root.add_scope(&mut store, scope);
    let stray = loom_tree::ENode::new(&mut store, ENodeKind::Process);
    store.freeze(arena);
    assert!(store.is_live(scope.id()));
    assert!(!store.is_live(stray.id()));
}

#[test]
fn trees_downcast_by_tag() {
    let mut store = new_store();
    store.open_arena();
    let ty = Type::new(&mut store, TypeKind::Real);
    let tree = Tree::new(&mut store, TreeKind::Null);
    assert_eq!(Tree::from_id(&store, ty.id()), None);
    assert_eq!(Tree::from_id(&store, tree.id()), Some(tree));
    assert_eq!(store.tag(tree.id()), ClassTag::from_raw(0));
}
