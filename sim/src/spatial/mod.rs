//! Linear quadtree over caller-chosen integer handles.
//!
//! Items are addressed by a dense index `ix` (typically an [`ArrayIndex`]
//! row) and positioned by a [`Point`]. The index keeps a permutation of the
//! item indices sorted by [`Key`], so point and rectangle queries are a binary
//! search plus a forward scan.
//!
//! ## Lazy repair
//!
//! Updates only rewrite the item's key and flag it invalidated. The first
//! query after a batch of updates repairs the order:
//!
//! - with at least half of the entries invalidated, a full resort;
//! - otherwise invalidated entries are insertion-sorted into a prefix, and
//!   that prefix is merged into the untouched tail by in-place rotation.
//!
//! [`ArrayIndex`]: crate::ecs::ArrayIndex

mod key;

pub use key::{Key, Point, Rect, MAX_COORD, MIN_COORD};

use key::{KEY_INVAL, KEY_SET};

#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    /// Item indices, sorted by key once repaired.
    ix: Vec<usize>,
    /// Keys by item index.
    ks: Vec<Key>,
    invalid: usize,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocated item slots.
    pub fn len(&self) -> usize {
        self.ix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ix.is_empty()
    }

    /// Key stored for an item, unset for unknown items.
    pub fn get(&self, i: usize) -> Key {
        self.ks.get(i).copied().unwrap_or_default()
    }

    /// Entries awaiting repair.
    pub fn pending(&self) -> usize {
        self.invalid
    }

    /// Record the point for item `i`, allocating slots up to it if needed.
    pub fn update(&mut self, i: usize, p: Point) {
        let key = Key::new(p).invalidated();
        if i < self.ix.len() {
            let prior = self.ks[i];
            self.ks[i] = key;
            if !prior.is_invalid() {
                self.invalid += 1;
            }
            return;
        }

        let n = self.ix.len();
        self.ix.extend(n..=i);
        self.ks.resize(i + 1, Key(KEY_INVAL));
        self.ks[i] = key;
        self.invalid += self.ix.len() - n;
    }

    /// Forget the point for item `i`.
    pub fn delete(&mut self, i: usize) {
        let Some(prior) = self.ks.get(i).copied() else {
            return;
        };
        self.ks[i] = Key(KEY_INVAL);
        if !prior.is_invalid() {
            self.invalid += 1;
        }
    }

    /// Restore key order; queries do this implicitly.
    pub fn repair(&mut self) {
        if self.invalid == 0 {
            return;
        }
        if self.invalid >= self.ix.len() / 2 {
            tracing::trace!(invalid = self.invalid, len = self.ix.len(), "spatial index resort");
            self.resort();
        } else {
            tracing::trace!(invalid = self.invalid, len = self.ix.len(), "spatial index reindex");
            self.reindex();
        }
        self.invalid = 0;
    }

    fn resort(&mut self) {
        for k in &mut self.ks {
            *k = k.validated();
        }
        let ks = &self.ks;
        self.ix.sort_by_key(|&i| ks[i]);
    }

    fn reindex(&mut self) {
        // gather invalidated entries into a sorted prefix
        let mut eoh = 0;
        for jj in 0..self.ix.len() {
            let i = self.ix[jj];
            if !self.ks[i].is_invalid() {
                continue;
            }
            self.ks[i] = self.ks[i].validated();
            let kk = self.narrow(0, eoh, self.ks[i]);
            if kk != jj {
                self.ix[kk..=jj].rotate_right(1);
            }
            eoh += 1;
        }

        // merge prefix into the tail
        let (mut head, mut body) = (0, eoh);
        while head < body && body < self.ix.len() {
            if self.ks[self.ix[body]] < self.ks[self.ix[head]] {
                body += 1;
                self.ix[head..body].rotate_right(1);
            }
            head += 1;
        }
    }

    /// Lower bound of `k` (as a set key) within sorted positions `lo..hi`.
    fn narrow(&self, mut lo: usize, mut hi: usize, k: Key) -> usize {
        let k = Key(k.0 | KEY_SET);
        while lo < hi {
            let h = lo + (hi - lo) / 2;
            if self.ks[self.ix[h]] < k {
                lo = h + 1;
            } else {
                hi = h;
            }
        }
        lo
    }

    fn run(&self, mut ii: usize, k: Key) -> usize {
        while ii < self.ix.len() && self.ks[self.ix[ii]] == k {
            ii += 1;
        }
        ii
    }

    /// Items whose point equals `p` (after saturation).
    pub fn at(&mut self, p: Point) -> Cursor<'_> {
        self.repair();
        let k = Key::new(p);
        let lo = self.narrow(0, self.ix.len(), k);
        let hi = self.run(lo, k);
        Cursor {
            index: &*self,
            rect: None,
            kmax: k,
            ii: lo,
            end: hi,
        }
    }

    /// Items whose point lies in `r`, both corners included, in key order.
    pub fn within(&mut self, r: Rect) -> Cursor<'_> {
        self.repair();
        let kmin = Key::new(r.min);
        let kmax = Key::new(r.max);
        let lo = self.narrow(0, self.ix.len(), kmin);
        let hi = self.run(self.narrow(lo, self.ix.len(), kmax), kmax);
        Cursor {
            index: &*self,
            rect: Some(Rect::new(kmin.point(), kmax.point())),
            kmax,
            ii: lo,
            end: hi,
        }
    }
}

/// Single-pass query over a repaired [`SpatialIndex`].
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    index: &'a SpatialIndex,
    rect: Option<Rect>,
    kmax: Key,
    ii: usize,
    end: usize,
}

impl Iterator for Cursor<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.ii < self.end {
            let i = self.index.ix[self.ii];
            self.ii += 1;
            let k = self.index.ks[i];
            if k > self.kmax {
                self.ii = self.end;
                return None;
            }
            match self.rect {
                None => return Some(i),
                Some(r) if r.contains(k.point()) => return Some(i),
                Some(_) => {}
            }
        }
        None
    }
}
