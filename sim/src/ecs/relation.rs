//! Relations between entities, modelled as entities of a private scope.
//!
//! Each edge is an entity in the relation's own [`Scope`], tagged with
//! [`TYPE_ENTITY_RELATION`], so embedders can hang per-edge component data off
//! it with ordinary watchers. Endpoints are stored by [`ID`] only.
//!
//! ## Cascading
//!
//! The relation registers a watcher on its endpoint scope(s). When a type bit
//! is removed from an endpoint entity every incident edge is destroyed, which
//! in turn removes it from both adjacency maps.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::id::{Type, ID};
use super::scope::{Entities, Entity, Scope, ScopeId, Watcher};
use crate::error::EcsError;

/// Marker bit carried by every edge entity.
pub const TYPE_ENTITY_RELATION: Type = Type(1 << 63);

/// Per-edge endpoint columns and the two adjacency maps.
#[derive(Debug, Default)]
struct Edges {
    aid: Vec<ID>,
    bid: Vec<ID>,
    aindex: HashMap<ID, Vec<ID>>,
    bindex: HashMap<ID, Vec<ID>>,
}

fn remove_edge(index: &mut HashMap<ID, Vec<ID>>, key: ID, rel: ID) {
    if let Some(rels) = index.get_mut(&key) {
        rels.retain(|&id| id != rel);
        if rels.is_empty() {
            index.remove(&key);
        }
    }
}

impl Watcher for Edges {
    fn entity_created(&mut self, rel: Entity, _typ: Type) {
        let seq = rel.id().seq() as usize;
        if seq >= self.aid.len() {
            self.aid.resize(seq + 1, ID::ZERO);
            self.bid.resize(seq + 1, ID::ZERO);
        }
        self.aid[seq] = ID::ZERO;
        self.bid[seq] = ID::ZERO;
    }

    fn entity_destroyed(&mut self, rel: Entity, _typ: Type) {
        let seq = rel.id().seq() as usize;
        let aid = std::mem::take(&mut self.aid[seq]);
        let bid = std::mem::take(&mut self.bid[seq]);
        remove_edge(&mut self.aindex, aid, rel.id());
        remove_edge(&mut self.bindex, bid, rel.id());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    A,
    B,
    Both,
}

/// Forwards endpoint destruction into the relation.
struct EndpointWatcher {
    rel: Weak<RefCell<EntityRelation>>,
    side: Side,
}

impl Watcher for EndpointWatcher {
    fn entity_created(&mut self, _ent: Entity, _typ: Type) {}

    fn entity_destroyed(&mut self, ent: Entity, _typ: Type) {
        let Some(rel) = self.rel.upgrade() else {
            return;
        };
        let Ok(mut rel) = rel.try_borrow_mut() else {
            panic!(
                "{}",
                EcsError::StructuralMisuse("endpoint destroyed while its relation was borrowed")
            );
        };
        match self.side {
            Side::A => rel.delete_a(ent.id()),
            Side::B => rel.delete_b(ent.id()),
            Side::Both => {
                rel.delete_a(ent.id());
                rel.delete_b(ent.id());
            }
        }
    }
}

/// Many-to-many links between entities of an A scope and a B scope (which may
/// be the same scope, making the relation a graph).
pub struct EntityRelation {
    scope: Scope,
    a: ScopeId,
    b: ScopeId,
    edges: Rc<RefCell<Edges>>,
}

impl EntityRelation {
    fn with_scopes(a: ScopeId, b: ScopeId) -> Self {
        let edges = Rc::new(RefCell::new(Edges::default()));
        let mut scope = Scope::new();
        scope.watch(TYPE_ENTITY_RELATION, Type::NONE, edges.clone());
        Self { scope, a, b, edges }
    }

    /// Auto-relation among the entities of one scope.
    pub fn new(a: &mut Scope) -> Rc<RefCell<Self>> {
        let rel = Rc::new(RefCell::new(Self::with_scopes(a.scope_id(), a.scope_id())));
        a.watch(
            Type::NONE,
            Type::NONE,
            Rc::new(RefCell::new(EndpointWatcher {
                rel: Rc::downgrade(&rel),
                side: Side::Both,
            })),
        );
        rel
    }

    /// Relation from entities of `a` to entities of a distinct scope `b`.
    pub fn between(a: &mut Scope, b: &mut Scope) -> Rc<RefCell<Self>> {
        let rel = Rc::new(RefCell::new(Self::with_scopes(a.scope_id(), b.scope_id())));
        for (scope, side) in [(a, Side::A), (b, Side::B)] {
            scope.watch(
                Type::NONE,
                Type::NONE,
                Rc::new(RefCell::new(EndpointWatcher {
                    rel: Rc::downgrade(&rel),
                    side,
                })),
            );
        }
        rel
    }

    /// The private scope holding edge entities.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Mutable access for registering per-edge component managers.
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// Number of live edges.
    pub fn len(&self) -> usize {
        self.scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// Create one edge from `aid` to `bid`. Extra `typ` bits are added to the
    /// edge entity alongside the relation marker.
    pub fn insert(&mut self, typ: Type, aid: ID, bid: ID) -> Result<Entity, EcsError> {
        let rel = self.scope.create(TYPE_ENTITY_RELATION | typ)?;
        let seq = rel.id().seq() as usize;
        let mut edges = self.edges.borrow_mut();
        edges.aid[seq] = aid;
        edges.bid[seq] = bid;
        edges.aindex.entry(aid).or_default().push(rel.id());
        edges.bindex.entry(bid).or_default().push(rel.id());
        Ok(rel)
    }

    /// Create edges from one `aid` to each of `bids`. Both adjacency maps are
    /// left alone while the edges are created and updated once at the end.
    pub fn insert_many(&mut self, typ: Type, aid: ID, bids: &[ID]) -> Result<Entities, EcsError> {
        let mut rels = Vec::with_capacity(bids.len());
        let result: Result<(), EcsError> = bids.iter().try_for_each(|&bid| {
            let rel = self.scope.create(TYPE_ENTITY_RELATION | typ)?;
            let seq = rel.id().seq() as usize;
            let mut edges = self.edges.borrow_mut();
            edges.aid[seq] = aid;
            edges.bid[seq] = bid;
            rels.push(rel.id());
            Ok(())
        });

        // index whatever was created, even if the batch stopped early
        let mut edges = self.edges.borrow_mut();
        let Edges { aindex, bindex, .. } = &mut *edges;
        if !rels.is_empty() {
            aindex.entry(aid).or_default().extend_from_slice(&rels);
        }
        for (&bid, &rel) in bids.iter().zip(&rels) {
            bindex.entry(bid).or_default().push(rel);
        }
        drop(edges);

        result.map(|()| Entities::new(self.scope.scope_id(), rels))
    }

    /// Destroy every edge whose A endpoint is `aid`.
    pub fn delete_a(&mut self, aid: ID) {
        let rels = self.edges.borrow_mut().aindex.remove(&aid);
        self.destroy_all(rels.unwrap_or_default());
    }

    /// Destroy every edge whose B endpoint is `bid`.
    pub fn delete_b(&mut self, bid: ID) {
        let rels = self.edges.borrow_mut().bindex.remove(&bid);
        self.destroy_all(rels.unwrap_or_default());
    }

    fn destroy_all(&mut self, rels: Vec<ID>) {
        let owner = self.scope.scope_id();
        for id in rels {
            let rel = Entity::new(owner, id);
            if self.scope.is_live(rel) {
                self.scope.destroy(rel);
            }
        }
    }

    /// Edges leaving `aid`.
    pub fn lookup_a(&self, aid: ID) -> Entities {
        let ids = self.edges.borrow().aindex.get(&aid).cloned();
        Entities::new(self.scope.scope_id(), ids.unwrap_or_default())
    }

    /// Edges arriving at `bid`.
    pub fn lookup_b(&self, bid: ID) -> Entities {
        let ids = self.edges.borrow().bindex.get(&bid).cloned();
        Entities::new(self.scope.scope_id(), ids.unwrap_or_default())
    }

    /// A endpoint of one edge.
    pub fn a(&self, rel: Entity) -> Entity {
        let seq = self.scope.seq(rel) as usize;
        Entity::new(self.a, self.edges.borrow().aid[seq])
    }

    /// B endpoint of one edge.
    pub fn b(&self, rel: Entity) -> Entity {
        let seq = self.scope.seq(rel) as usize;
        Entity::new(self.b, self.edges.borrow().bid[seq])
    }

    /// A endpoints of a batch of edges, in the same order.
    pub fn a_side(&self, rels: &Entities) -> Entities {
        let edges = self.edges.borrow();
        let ids = rels
            .iter()
            .map(|rel| edges.aid[self.scope.seq(rel) as usize])
            .collect();
        Entities::new(self.a, ids)
    }

    /// B endpoints of a batch of edges, in the same order.
    pub fn b_side(&self, rels: &Entities) -> Entities {
        let edges = self.edges.borrow();
        let ids = rels
            .iter()
            .map(|rel| edges.bid[self.scope.seq(rel) as usize])
            .collect();
        Entities::new(self.b, ids)
    }
}
