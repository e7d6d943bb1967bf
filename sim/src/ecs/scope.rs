//! The entity scope: identity, component types, and change notification.
//!
//! ## Watchers
//!
//! A [`Watcher`] registered with `(all, any)` masks is told about type bits
//! appearing on (`entity_created`) or vanishing from (`entity_destroyed`) an
//! entity:
//!
//! - `all == 0` watchers fire on every change, optionally narrowed to changes
//!   that touch `any`.
//! - compound `all` watchers see Create only once every required bit is
//!   present, and Destroy as soon as any required bit is removed.
//!
//! Within one transition all Destroy events precede all Create events, and
//! watchers are called in registration order.
//!
//! ## Handles
//!
//! [`Entity`] is a plain `(scope id, ID)` pair. Every mutator validates the
//! handle's generation against the scope's slot; a mismatch panics since it
//! can only come from using a handle after its entity was destroyed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::id::{Type, ID};
use crate::error::EcsError;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique tag for a [`Scope`], carried by every handle it issues.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ScopeId(u64);

impl ScopeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Handle to an entity: trivially copyable, holds no reference to its scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Entity {
    scope: ScopeId,
    id: ID,
}

impl Entity {
    /// The zero entity; belongs to no scope.
    pub const NONE: Entity = Entity {
        scope: ScopeId(0),
        id: ID::ZERO,
    };

    /// Unvalidated handle; the owning scope checks it on first use.
    pub fn new(scope: ScopeId, id: ID) -> Self {
        Self { scope, id }
    }

    pub fn id(self) -> ID {
        self.id
    }

    pub fn scope(self) -> ScopeId {
        self.scope
    }

    pub fn is_zero(self) -> bool {
        self.id.is_zero()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity({} {})", self.scope, self.id)
    }
}

/// Callbacks fired as type bits are added to or removed from entities.
///
/// Watchers receive only the bits that changed. They must not perform
/// structural mutations on the scope that is dispatching to them.
pub trait Watcher {
    fn entity_created(&mut self, ent: Entity, typ: Type);
    fn entity_destroyed(&mut self, ent: Entity, typ: Type);
}

/// Shared, type-erased watcher as stored by a [`Scope`].
pub type WatcherRef = Rc<RefCell<dyn Watcher>>;

/// Wraps any watcher for registration.
pub fn shared<W: Watcher + 'static>(watcher: W) -> Rc<RefCell<W>> {
    Rc::new(RefCell::new(watcher))
}

/// Watcher that only handles Create events.
pub struct OnCreate<F>(pub F);

impl<F: FnMut(Entity, Type)> Watcher for OnCreate<F> {
    fn entity_created(&mut self, ent: Entity, typ: Type) {
        (self.0)(ent, typ)
    }

    fn entity_destroyed(&mut self, _ent: Entity, _typ: Type) {}
}

/// Watcher that only handles Destroy events.
pub struct OnDestroy<F>(pub F);

impl<F: FnMut(Entity, Type)> Watcher for OnDestroy<F> {
    fn entity_created(&mut self, _ent: Entity, _typ: Type) {}

    fn entity_destroyed(&mut self, ent: Entity, typ: Type) {
        (self.0)(ent, typ)
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    gen: u8,
    typ: Type,
}

struct Registration {
    all: Type,
    any: Type,
    watcher: WatcherRef,
}

/// Frame of reference for entity IDs and owner of their types.
pub struct Scope {
    id: ScopeId,
    typs: Vec<Slot>,
    free: Vec<ID>,
    watchers: Vec<Registration>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("len", &self.len())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            id: ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed)),
            typs: Vec::new(),
            free: Vec::new(),
            watchers: Vec::new(),
        }
    }

    pub fn scope_id(&self) -> ScopeId {
        self.id
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.typs.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a watcher. The same watcher may be registered several times.
    pub fn watch(&mut self, all: Type, any: Type, watcher: WatcherRef) {
        self.watchers.push(Registration { all, any, watcher });
    }

    /// Remove every registration of `watcher`.
    pub fn remove_watcher<W: ?Sized>(&mut self, watcher: &Rc<RefCell<W>>) {
        let target = Rc::as_ptr(watcher).cast::<()>();
        self.watchers
            .retain(|reg| Rc::as_ptr(&reg.watcher).cast::<()>() != target);
    }

    /// Create a live entity of the given type, dispatching Create events.
    pub fn create(&mut self, typ: Type) -> Result<Entity, EcsError> {
        if typ.is_empty() {
            return Err(EcsError::InvalidArgument("cannot create an entity of zero type"));
        }
        let id = self.alloc();
        let seq = id.seq() as usize;
        let slot = &mut self.typs[seq];
        if !slot.typ.is_empty() {
            return Err(EcsError::StructuralMisuse(
                "free list yielded an entity with non-zero type",
            ));
        }
        slot.typ = typ;
        let ent = Entity { scope: self.id, id };
        self.dispatch_create(ent, typ, typ);
        Ok(ent)
    }

    /// Create `n` entities of the same type.
    pub fn create_n(&mut self, typ: Type, n: usize) -> Result<Entities, EcsError> {
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            ids.push(self.create(typ)?.id);
        }
        Ok(Entities::new(self.id, ids))
    }

    fn alloc(&mut self) -> ID {
        if let Some(id) = self.free.pop() {
            return id;
        }
        self.typs.push(Slot {
            gen: 1,
            typ: Type::NONE,
        });
        ID::new((self.typs.len() - 1) as u64, 1)
    }

    /// Resolve an ID into a handle, panicking if it is stale. The zero ID
    /// resolves to [`Entity::NONE`].
    pub fn entity(&self, id: ID) -> Entity {
        if id.is_zero() {
            return Entity::NONE;
        }
        match self.try_entity(id) {
            Ok(ent) => ent,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_entity(&self, id: ID) -> Result<Entity, EcsError> {
        let ent = Entity { scope: self.id, id };
        self.check(ent)?;
        Ok(ent)
    }

    /// Current ID at a sequence number, or zero if the slot is free.
    pub fn id(&self, seq: u64) -> ID {
        match self.typs.get(seq as usize) {
            Some(slot) if !slot.typ.is_empty() => ID::new(seq, slot.gen),
            _ => ID::ZERO,
        }
    }

    /// Validate a handle against this scope, returning its slot index.
    pub fn check(&self, ent: Entity) -> Result<usize, EcsError> {
        if ent.id.is_zero() {
            return Err(EcsError::ZeroHandle);
        }
        if ent.scope != self.id {
            return Err(EcsError::ForeignEntity {
                scope: self.id.0,
                entity_scope: ent.scope.0,
            });
        }
        let seq = ent.id.seq() as usize;
        let gen = ent.id.generation();
        match self.typs.get(seq) {
            Some(slot) if gen != 0 && slot.gen == gen => Ok(seq),
            Some(slot) => Err(EcsError::StaleHandle {
                id: ent.id,
                current: ID::new(seq as u64, slot.gen),
            }),
            None => Err(EcsError::StaleHandle {
                id: ent.id,
                current: ID::ZERO,
            }),
        }
    }

    fn must_check(&self, ent: Entity) -> usize {
        match self.check(ent) {
            Ok(seq) => seq,
            Err(err) => panic!("{}", err),
        }
    }

    /// Panic unless `ent` is a valid handle issued by this scope.
    pub fn must_own(&self, ent: Entity, role: &str) {
        if let Err(err) = self.check(ent) {
            panic!("{} entity rejected: {}", role, err);
        }
    }

    /// Whether the handle still names a live entity of this scope.
    pub fn is_live(&self, ent: Entity) -> bool {
        match self.check(ent) {
            Ok(seq) => !self.typs[seq].typ.is_empty(),
            Err(_) => false,
        }
    }

    pub fn type_of(&self, ent: Entity) -> Type {
        self.typs[self.must_check(ent)].typ
    }

    /// Validated sequence number; component managers key their data by it.
    pub fn seq(&self, ent: Entity) -> u64 {
        self.must_check(ent) as u64
    }

    /// Replace the entity's type. Setting zero destroys it. Returns whether
    /// anything changed.
    pub fn set_type(&mut self, ent: Entity, typ: Type) -> bool {
        let seq = self.must_check(ent);
        self.apply_type(ent, seq, typ)
    }

    pub fn add_type(&mut self, ent: Entity, typ: Type) -> bool {
        let seq = self.must_check(ent);
        let prior = self.typs[seq].typ;
        self.apply_type(ent, seq, prior | typ)
    }

    pub fn delete_type(&mut self, ent: Entity, typ: Type) -> bool {
        let seq = self.must_check(ent);
        let prior = self.typs[seq].typ;
        self.apply_type(ent, seq, prior & !typ)
    }

    pub fn destroy(&mut self, ent: Entity) -> bool {
        self.set_type(ent, Type::NONE)
    }

    /// Destroy every live entity.
    pub fn clear(&mut self) {
        for seq in 0..self.typs.len() {
            let slot = self.typs[seq];
            if slot.typ.is_empty() {
                continue;
            }
            let ent = Entity {
                scope: self.id,
                id: ID::new(seq as u64, slot.gen),
            };
            self.apply_type(ent, seq, Type::NONE);
        }
    }

    fn apply_type(&mut self, ent: Entity, seq: usize, typ: Type) -> bool {
        let prior = self.typs[seq].typ;
        let change = prior ^ typ;
        if change.is_empty() {
            return false;
        }

        self.typs[seq].typ = typ;

        let destroyed = prior & change;
        if !destroyed.is_empty() {
            self.dispatch_destroy(ent, typ, destroyed);
        }

        if typ.is_empty() {
            let gen = match self.typs[seq].gen.wrapping_add(1) {
                0 => 1,
                gen => gen,
            };
            self.typs[seq].gen = gen;
            self.free.push(ent.id.with_generation(gen));
            return true;
        }

        let created = typ & change;
        if !created.is_empty() {
            self.dispatch_create(ent, typ, created);
        }
        true
    }

    fn dispatch_create(&self, ent: Entity, typ: Type, created: Type) {
        for reg in &self.watchers {
            let all_ok = reg.all.is_empty() || (typ.has_all(reg.all) && created.has_any(reg.all));
            let any_ok = reg.any.is_empty() || created.has_any(reg.any);
            if all_ok && any_ok {
                borrow_watcher(&reg.watcher).entity_created(ent, created);
            }
        }
    }

    fn dispatch_destroy(&self, ent: Entity, typ: Type, destroyed: Type) {
        for reg in &self.watchers {
            // only watchers whose full mask was present before this change
            let all_ok =
                reg.all.is_empty() || (!typ.has_all(reg.all) && (typ | destroyed).has_all(reg.all));
            let any_ok = reg.any.is_empty() || destroyed.has_any(reg.any);
            if all_ok && any_ok {
                borrow_watcher(&reg.watcher).entity_destroyed(ent, destroyed);
            }
        }
    }

    /// Live entities in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        let scope = self.id;
        self.typs.iter().enumerate().filter_map(move |(seq, slot)| {
            (!slot.typ.is_empty()).then(|| Entity {
                scope,
                id: ID::new(seq as u64, slot.gen),
            })
        })
    }

    /// Live entities having all of `all` and, if non-zero, any of `any`.
    pub fn filter(&self, all: Type, any: Type) -> Entities {
        let ids = self
            .iter()
            .filter(|&ent| {
                let typ = self.typs[ent.id.seq() as usize].typ;
                typ.has_all(all) && (any.is_empty() || typ.has_any(any))
            })
            .map(Entity::id)
            .collect();
        Entities::new(self.id, ids)
    }
}

fn borrow_watcher(watcher: &WatcherRef) -> std::cell::RefMut<'_, dyn Watcher> {
    match watcher.try_borrow_mut() {
        Ok(w) => w,
        Err(_) => panic!(
            "{}",
            EcsError::StructuralMisuse("watcher re-entered while it was being dispatched")
        ),
    }
}

/// A collection of entity IDs from one scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entities {
    pub scope: ScopeId,
    pub ids: Vec<ID>,
}

impl Entities {
    pub fn new(scope: ScopeId, ids: Vec<ID>) -> Self {
        Self { scope, ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn entity(&self, i: usize) -> Entity {
        Entity {
            scope: self.scope,
            id: self.ids[i],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        let scope = self.scope;
        self.ids.iter().map(move |&id| Entity { scope, id })
    }

    /// Keep only entities whose type has all of `t`.
    pub fn filter_all(&mut self, scope: &Scope, t: Type) {
        let owner = self.scope;
        self.ids
            .retain(|&id| scope.type_of(Entity { scope: owner, id }).has_all(t));
    }

    /// Keep only entities whose type has any of `t`.
    pub fn filter_any(&mut self, scope: &Scope, t: Type) {
        let owner = self.scope;
        self.ids
            .retain(|&id| scope.type_of(Entity { scope: owner, id }).has_any(t));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Type = Type(1);
    const B: Type = Type(2);
    const C: Type = Type(4);

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Event {
        Create(ID, Type),
        Destroy(ID, Type),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl Watcher for Recorder {
        fn entity_created(&mut self, ent: Entity, typ: Type) {
            self.events.push(Event::Create(ent.id(), typ));
        }

        fn entity_destroyed(&mut self, ent: Entity, typ: Type) {
            self.events.push(Event::Destroy(ent.id(), typ));
        }
    }

    #[test]
    fn test_create_rejects_zero_type() {
        let mut scope = Scope::new();
        assert_eq!(
            scope.create(Type::NONE),
            Err(EcsError::InvalidArgument("cannot create an entity of zero type"))
        );
        assert_eq!(scope.len(), 0);
    }

    #[test]
    fn test_create_and_recycle() {
        let mut scope = Scope::new();
        let e0 = scope.create(A).unwrap();
        let e1 = scope.create(B).unwrap();
        assert_eq!(e0.id(), ID::new(0, 1));
        assert_eq!(e1.id(), ID::new(1, 1));
        assert_eq!(scope.len(), 2);

        assert!(scope.destroy(e0));
        assert_eq!(scope.len(), 1);
        assert!(!scope.is_live(e0));
        assert_eq!(scope.id(0), ID::ZERO);

        let e2 = scope.create(C).unwrap();
        assert_eq!(e2.id(), ID::new(0, 2));
        assert_eq!(scope.type_of(e2), C);
        assert_eq!(scope.id(0), ID::new(0, 2));
    }

    #[test]
    fn test_generation_wraps_past_zero() {
        let mut scope = Scope::new();
        let mut last = scope.create(A).unwrap();
        for _ in 0..255 {
            scope.destroy(last);
            last = scope.create(A).unwrap();
        }
        // 1 + 255 destroys wraps 255 -> 1
        assert_eq!(last.id().generation(), 1);
        assert_eq!(last.id().seq(), 0);
    }

    #[test]
    #[should_panic(expected = "stale entity handle")]
    fn test_stale_handle_panics() {
        let mut scope = Scope::new();
        let ent = scope.create(A).unwrap();
        scope.destroy(ent);
        scope.add_type(ent, B);
    }

    #[test]
    #[should_panic(expected = "zero entity handle")]
    fn test_zero_handle_panics() {
        let mut scope = Scope::new();
        scope.set_type(Entity::NONE, A);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let mut a = Scope::new();
        let b = Scope::new();
        let ent = a.create(A).unwrap();
        assert!(matches!(b.check(ent), Err(EcsError::ForeignEntity { .. })));
    }

    #[test]
    fn test_entity_resolves_ids() {
        let mut scope = Scope::new();
        let ent = scope.create(A).unwrap();
        assert_eq!(scope.entity(ent.id()), ent);
        assert_eq!(scope.entity(ID::ZERO), Entity::NONE);
        assert!(scope.try_entity(ID::new(0, 9)).is_err());
    }

    #[test]
    fn test_compound_watcher_lifecycle() {
        let mut scope = Scope::new();
        let every = shared(Recorder::default());
        let on_a = shared(Recorder::default());
        scope.watch(Type::NONE, Type::NONE, every.clone());
        scope.watch(A, Type::NONE, on_a.clone());

        let ent = scope.create(A | B).unwrap();
        scope.delete_type(ent, A);
        scope.set_type(ent, Type::NONE);

        let id = ent.id();
        assert_eq!(
            every.borrow().events,
            vec![
                Event::Create(id, A | B),
                Event::Destroy(id, A),
                Event::Destroy(id, B),
            ]
        );
        // B leaving does not touch the required A bit.
        assert_eq!(
            on_a.borrow().events,
            vec![Event::Create(id, A | B), Event::Destroy(id, A)]
        );
    }

    #[test]
    fn test_compound_create_fires_last() {
        let mut scope = Scope::new();
        let both = shared(Recorder::default());
        scope.watch(A | B, Type::NONE, both.clone());

        let ent = scope.create(A).unwrap();
        assert!(both.borrow().events.is_empty());
        scope.add_type(ent, B);
        scope.add_type(ent, C);
        assert_eq!(both.borrow().events, vec![Event::Create(ent.id(), B)]);

        // Destroy fires as soon as any required bit goes.
        scope.delete_type(ent, A);
        assert_eq!(both.borrow().events[1], Event::Destroy(ent.id(), A));
        scope.delete_type(ent, B);
        assert_eq!(both.borrow().events.len(), 2);
    }

    #[test]
    fn test_compound_watcher_ignores_partial_entities() {
        let mut scope = Scope::new();
        let both = shared(Recorder::default());
        scope.watch(A | B, Type::NONE, both.clone());

        let ent = scope.create(A).unwrap();
        scope.destroy(ent);
        let ent = scope.create(A | C).unwrap();
        scope.delete_type(ent, C);
        scope.delete_type(ent, A);
        assert!(both.borrow().events.is_empty());
    }

    #[test]
    fn test_any_mask_narrows_dispatch() {
        let mut scope = Scope::new();
        let rec = shared(Recorder::default());
        scope.watch(Type::NONE, C, rec.clone());
        let ent = scope.create(A).unwrap();
        scope.add_type(ent, B | C);
        scope.delete_type(ent, A);
        scope.delete_type(ent, C);
        assert_eq!(
            rec.borrow().events,
            vec![Event::Create(ent.id(), B | C), Event::Destroy(ent.id(), C)]
        );
    }

    #[test]
    fn test_destroy_precedes_create_in_one_transition() {
        let mut scope = Scope::new();
        let rec = shared(Recorder::default());
        scope.watch(Type::NONE, Type::NONE, rec.clone());
        let ent = scope.create(A).unwrap();
        scope.set_type(ent, B);
        assert_eq!(
            rec.borrow().events[1..],
            [Event::Destroy(ent.id(), A), Event::Create(ent.id(), B)]
        );
    }

    #[test]
    fn test_watchers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scope = Scope::new();
        for tag in 0..3 {
            let log = log.clone();
            scope.watch(
                Type::NONE,
                Type::NONE,
                shared(OnCreate(move |_: Entity, _: Type| log.borrow_mut().push(tag))),
            );
        }
        scope.create(A).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_watcher() {
        let mut scope = Scope::new();
        let rec = shared(Recorder::default());
        scope.watch(Type::NONE, Type::NONE, rec.clone());
        scope.watch(A, Type::NONE, rec.clone());
        scope.create(A).unwrap();
        assert_eq!(rec.borrow().events.len(), 2);

        scope.remove_watcher(&rec);
        scope.create(A).unwrap();
        assert_eq!(rec.borrow().events.len(), 2);
    }

    #[test]
    fn test_set_same_type_is_noop() {
        let mut scope = Scope::new();
        let rec = shared(Recorder::default());
        scope.watch(Type::NONE, Type::NONE, rec.clone());
        let ent = scope.create(A).unwrap();
        assert!(!scope.set_type(ent, A));
        assert!(!scope.add_type(ent, A));
        assert!(!scope.delete_type(ent, B));
        assert_eq!(rec.borrow().events.len(), 1);
    }

    #[test]
    fn test_clear_destroys_everything() {
        let mut scope = Scope::new();
        let destroyed = Rc::new(RefCell::new(0));
        let counter = destroyed.clone();
        scope.watch(
            Type::NONE,
            Type::NONE,
            shared(OnDestroy(move |_: Entity, _: Type| *counter.borrow_mut() += 1)),
        );
        scope.create_n(A, 5).unwrap();
        scope.clear();
        assert_eq!(scope.len(), 0);
        assert_eq!(*destroyed.borrow(), 5);
        assert_eq!(scope.iter().count(), 0);
    }

    #[test]
    fn test_entities_filters() {
        let mut scope = Scope::new();
        let a = scope.create(A).unwrap();
        let ab = scope.create(A | B).unwrap();
        let c = scope.create(C).unwrap();

        let mut all = Entities::new(scope.scope_id(), vec![a.id(), ab.id(), c.id()]);
        all.filter_all(&scope, A | B);
        assert_eq!(all.ids, vec![ab.id()]);

        let mut any = Entities::new(scope.scope_id(), vec![a.id(), ab.id(), c.id()]);
        any.filter_any(&scope, B | C);
        assert_eq!(any.ids, vec![ab.id(), c.id()]);

        let q = scope.filter(A, Type::NONE);
        assert_eq!(q.ids, vec![a.id(), ab.id()]);
        assert_eq!(q.entity(1), ab);
    }
}
