//! End-to-end entity scenarios through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use worldcore::ecs::{shared, OnCreate, OnDestroy};
use worldcore::{ArrayIndex, Entity, EntityRelation, Scope, Type, ID};

const A: Type = Type(1);
const B: Type = Type(2);

type Log = Rc<RefCell<Vec<(&'static str, ID, Type)>>>;

fn record(scope: &mut Scope, all: Type, log: &Log) {
    let created = log.clone();
    scope.watch(
        all,
        Type::NONE,
        shared(OnCreate(move |e: Entity, t: Type| created.borrow_mut().push(("create", e.id(), t)))),
    );
    let destroyed = log.clone();
    scope.watch(
        all,
        Type::NONE,
        shared(OnDestroy(move |e: Entity, t: Type| destroyed.borrow_mut().push(("destroy", e.id(), t)))),
    );
}

#[test]
fn test_entity_lifecycle() {
    let mut scope = Scope::new();
    let on_a: Log = Rc::default();
    let every: Log = Rc::default();
    record(&mut scope, A, &on_a);
    record(&mut scope, Type::NONE, &every);

    let ent = scope.create(A | B).unwrap();
    let id = ent.id();
    assert_eq!(id.seq(), 0);
    assert_eq!(*on_a.borrow(), vec![("create", id, A | B)]);

    scope.delete_type(ent, A);
    assert_eq!(on_a.borrow().last(), Some(&("destroy", id, A)));

    scope.set_type(ent, Type::NONE);
    assert_eq!(on_a.borrow().len(), 2);
    assert_eq!(
        *every.borrow(),
        vec![("create", id, A | B), ("destroy", id, A), ("destroy", id, B)]
    );

    let again = scope.create(A).unwrap();
    // sequences start at 0, so the freed first slot comes back as 0
    assert_eq!(again.id().seq(), 0);
    assert_eq!(again.id().generation(), 2);
    assert!(!scope.is_live(ent));
}

#[test]
fn test_relation_cascade_through_component_rows() {
    let mut scope = Scope::new();
    let rows = Rc::new(RefCell::new(ArrayIndex::new()));
    scope.watch(A, Type::NONE, rows.clone());
    let rel = EntityRelation::new(&mut scope);

    let ents = scope.create_n(A, 4).unwrap();
    let root = ents.entity(0);
    let kids: Vec<ID> = ents.iter().skip(1).map(|e| e.id()).collect();
    rel.borrow_mut().insert_many(Type::NONE, root.id(), &kids).unwrap();
    rel.borrow_mut().insert(Type::NONE, kids[0], kids[1]).unwrap();
    assert_eq!(rel.borrow().len(), 4);

    scope.destroy(ents.entity(1));
    assert_eq!(rows.borrow().used(), 3);
    let rel = rel.borrow();
    assert_eq!(rel.len(), 2);
    assert!(rel.lookup_a(kids[0]).is_empty());
    assert!(rel.lookup_b(kids[0]).is_empty());
    let remaining = rel.b_side(&rel.lookup_a(root.id()));
    assert_eq!(remaining.ids, vec![kids[1], kids[2]]);
}

#[derive(Clone, Debug)]
enum Op {
    Create,
    Destroy(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Create),
        2 => (0usize..64).prop_map(Op::Destroy),
    ]
}

proptest! {
    #[test]
    fn test_array_index_bijection(ops in proptest::collection::vec(op(), 1..200)) {
        let mut scope = Scope::new();
        let index = Rc::new(RefCell::new(ArrayIndex::new()));
        scope.watch(Type::NONE, Type::NONE, index.clone());
        let mut live: Vec<Entity> = Vec::new();

        for op in ops {
            match op {
                Op::Create => {
                    let ent = scope.create(A).unwrap();
                    live.push(ent);
                }
                Op::Destroy(k) if !live.is_empty() => {
                    let ent = live.swap_remove(k % live.len());
                    let row = index.borrow().get(ent).unwrap();
                    scope.destroy(ent);
                    prop_assert_eq!(index.borrow().id(row), ID::ZERO);
                }
                Op::Destroy(_) => {}
            }

            let index = index.borrow();
            prop_assert_eq!(index.used(), live.len());
            for &ent in &live {
                let row = index.get(ent).unwrap();
                prop_assert_eq!(index.id(row), ent.id());
                prop_assert_eq!(index.entity(row), ent);
            }
        }
    }
}
