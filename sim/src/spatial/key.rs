//! Z-order keys for the spatial index.
//!
//! A key packs two flag bits over a 60-bit Morton interleave of the biased
//! x/y components. Components outside `MIN_COORD..=MAX_COORD` saturate to the
//! nearest bound; [`Key::point`] returns the saturated point.

use std::fmt;

use serde::{Deserialize, Serialize};

pub(crate) const KEY_SET: u64 = 1 << 63;
pub(crate) const KEY_INVAL: u64 = 1 << 62;

const COMP_BITS: u32 = 30;
const MORTON_MASK: u64 = (1 << (2 * COMP_BITS)) - 1;
const COMP_MASK: u64 = (1 << COMP_BITS) - 1;

/// Smallest representable coordinate.
pub const MIN_COORD: i64 = -(1 << (COMP_BITS - 1)) + 1;
/// Largest representable coordinate.
pub const MAX_COORD: i64 = (1 << (COMP_BITS - 1)) - 1;

/// Integer point in the index's coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The point as stored by the index, components clamped into range.
    pub fn saturated(self) -> Self {
        Self {
            x: self.x.clamp(MIN_COORD, MAX_COORD),
            y: self.y.clamp(MIN_COORD, MAX_COORD),
        }
    }

    pub fn is_representable(self) -> bool {
        self.saturated() == self
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Rectangle including both corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }
}

/// Stored key value: `set` flag, `invalidated` flag, Morton code.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub(crate) u64);

impl Key {
    /// Encode a point, saturating out-of-range components.
    pub fn new(p: Point) -> Self {
        if !p.is_representable() {
            tracing::warn!(x = p.x, y = p.y, "spatial coordinate saturated");
        }
        let p = p.saturated();
        Key(zkey(bias(p.x), bias(p.y)) | KEY_SET)
    }

    /// Whether the key holds a point at all.
    pub fn is_set(self) -> bool {
        self.0 & KEY_SET != 0
    }

    pub(crate) fn is_invalid(self) -> bool {
        self.0 & KEY_INVAL != 0
    }

    pub(crate) fn invalidated(self) -> Self {
        Key(self.0 | KEY_INVAL)
    }

    pub(crate) fn validated(self) -> Self {
        Key(self.0 & !KEY_INVAL)
    }

    /// Decode the (possibly saturated) point. Unset keys decode to the origin.
    pub fn point(self) -> Point {
        if !self.is_set() {
            return Point::default();
        }
        let z = self.0 & MORTON_MASK;
        Point {
            x: combine(z) as i64 + MIN_COORD,
            y: combine(z >> 1) as i64 + MIN_COORD,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_set() {
            return f.write_str("Key(unset)");
        }
        let star = if self.is_invalid() { "*" } else { "" };
        write!(f, "Key{}{}", self.point(), star)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn bias(n: i64) -> u64 {
    (n - MIN_COORD) as u64
}

fn zkey(x: u64, y: u64) -> u64 {
    split(x) | (split(y) << 1)
}

fn split(value: u64) -> u64 {
    let mut z = value & COMP_MASK;
    z = (z | (z << 16)) & 0x0000_ffff_0000_ffff;
    z = (z | (z << 8)) & 0x00ff_00ff_00ff_00ff;
    z = (z | (z << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    z = (z | (z << 2)) & 0x3333_3333_3333_3333;
    z = (z | (z << 1)) & 0x5555_5555_5555_5555;
    z
}

fn combine(z: u64) -> u64 {
    let mut z = z & 0x5555_5555_5555_5555;
    z = (z | (z >> 1)) & 0x3333_3333_3333_3333;
    z = (z | (z >> 2)) & 0x0f0f_0f0f_0f0f_0f0f;
    z = (z | (z >> 4)) & 0x00ff_00ff_00ff_00ff;
    z = (z | (z >> 8)) & 0x0000_ffff_0000_ffff;
    z = (z | (z >> 16)) & 0x0000_0000_ffff_ffff;
    z
}
