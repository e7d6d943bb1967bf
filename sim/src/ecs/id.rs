//! Generational entity identifiers and component type masks.
//!
//! An [`ID`] packs a 56-bit sequence number under an 8-bit generation
//! number. Generation 0 never names a live entity, so the all-zero value
//! doubles as the "no entity" sentinel.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};

const GEN_SHIFT: u32 = 56;
const SEQ_MASK: u64 = 0x00ff_ffff_ffff_ffff;

/// Identifies one entity within a [`Scope`](super::Scope) for the lifetime of
/// its generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ID(u64);

impl ID {
    pub const ZERO: ID = ID(0);

    /// Packs a sequence number and generation. Panics on generation 0.
    pub fn new(seq: u64, generation: u8) -> Self {
        assert!(generation != 0, "invalid use of gen-0 ID");
        ID((seq & SEQ_MASK) | ((generation as u64) << GEN_SHIFT))
    }

    pub fn from_raw(raw: u64) -> Self {
        ID(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn seq(self) -> u64 {
        self.0 & SEQ_MASK
    }

    pub fn generation(self) -> u8 {
        (self.0 >> GEN_SHIFT) as u8
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Copy of this ID under a different generation.
    pub fn with_generation(self, generation: u8) -> Self {
        ID::new(self.seq(), generation)
    }
}

impl fmt::Display for ID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (gen, seq) = (self.generation(), self.seq());
        if gen == 0 {
            if seq != 0 {
                return write!(f, "INVALID_ZeroID(seq:{})", seq);
            }
            return f.write_str("ZeroID");
        }
        write!(f, "{}(gen:{})", seq, gen)
    }
}

impl fmt::Debug for ID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Component composition of an entity: one or more bits per registered
/// component. Entities only exist while their type is non-zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Type(pub u64);

impl Type {
    pub const NONE: Type = Type(0);

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `t` is present.
    pub fn has_all(self, t: Type) -> bool {
        self.0 & t.0 == t.0
    }

    /// True when at least one bit of `t` is present.
    pub fn has_any(self, t: Type) -> bool {
        self.0 & t.0 != 0
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T+{:016X}", self.0)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl BitOr for Type {
    type Output = Type;
    fn bitor(self, rhs: Type) -> Type {
        Type(self.0 | rhs.0)
    }
}

impl BitOrAssign for Type {
    fn bitor_assign(&mut self, rhs: Type) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Type {
    type Output = Type;
    fn bitand(self, rhs: Type) -> Type {
        Type(self.0 & rhs.0)
    }
}

impl BitAndAssign for Type {
    fn bitand_assign(&mut self, rhs: Type) {
        self.0 &= rhs.0;
    }
}

impl BitXor for Type {
    type Output = Type;
    fn bitxor(self, rhs: Type) -> Type {
        Type(self.0 ^ rhs.0)
    }
}

impl Not for Type {
    type Output = Type;
    fn not(self) -> Type {
        Type(!self.0)
    }
}
