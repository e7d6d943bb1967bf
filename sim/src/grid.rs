//! Hilbert-ordered square grid and its neighbour stencil tables.
//!
//! Cells are numbered along a Hilbert curve over an `L x L` torus
//! (`L = 2^order`), so neighbouring cells mostly sit close in memory. All
//! per-cell arrays in the automaton use this numbering.
//!
//! Stencil slot order:
//!
//! ```text
//!   stencil9        stencil5        stencil3
//!   +---+---+---+       +---+
//!   | 6 | 3 | 7 |       | 3 |         +---+---+
//!   +---+---+---+   +---+---+---+     |   | 0 |
//!   | 2 |   | 0 |   | 2 |   | 0 |     +---+---+
//!   +---+---+---+   +---+---+---+     | 1 |
//!   | 5 | 1 | 4 |       | 1 |         +---+
//!   +---+---+---+       +---+
//! ```
//!
//! The gathered ("wide") forms put the cell itself in slot 0 and the table
//! neighbours after it.

use crate::spatial::Point;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Neighbour offsets for stencil9; the first four are stencil5.
const OFFSETS9: [(i64, i64); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

fn rot(n: i64, x: &mut i64, y: &mut i64, rx: i64, ry: i64) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}

/// Hilbert index of a point; coordinates wrap around the torus.
pub fn hilbert_encode(p: Point, length: usize) -> usize {
    let n = length as i64;
    let (mut x, mut y) = (p.x.rem_euclid(n), p.y.rem_euclid(n));
    let mut d = 0;
    let mut s = n / 2;
    while s > 0 {
        let rx = ((x & s) > 0) as i64;
        let ry = ((y & s) > 0) as i64;
        d += s * s * ((3 * rx) ^ ry);
        rot(n, &mut x, &mut y, rx, ry);
        s /= 2;
    }
    d as usize
}

/// Point at a Hilbert index; indices wrap modulo the area.
pub fn hilbert_decode(i: usize, length: usize) -> Point {
    let n = length as i64;
    let mut t = (i % (length * length)) as i64;
    let (mut x, mut y) = (0, 0);
    let mut s = 1;
    while s < n {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        rot(s, &mut x, &mut y, rx, ry);
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    Point::new(x, y)
}

/// `dst[i]` becomes the point of Hilbert index `i`.
pub fn write_hilbert_points(dst: &mut [Point], length: usize) {
    for y in 0..length as i64 {
        for x in 0..length as i64 {
            let p = Point::new(x, y);
            dst[hilbert_encode(p, length)] = p;
        }
    }
}

/// Reorder a Hilbert-indexed vector into row-major order.
pub fn raster_hilbert<T: Copy>(dst: &mut [T], src: &[T], length: usize) {
    let mut i = 0;
    for y in 0..length as i64 {
        for x in 0..length as i64 {
            dst[i] = src[hilbert_encode(Point::new(x, y), length)];
            i += 1;
        }
    }
}

fn neighbours<const N: usize>(i: usize, length: usize) -> [usize; N] {
    let p = hilbert_decode(i, length);
    let mut out = [0; N];
    for (slot, (dx, dy)) in out.iter_mut().zip(OFFSETS9) {
        *slot = hilbert_encode(Point::new(p.x + dx, p.y + dy), length);
    }
    out
}

fn write_table<const N: usize>(dst: &mut [[usize; N]], length: usize) {
    #[cfg(feature = "parallel")]
    {
        dst.par_iter_mut()
            .enumerate()
            .for_each(|(i, row)| *row = neighbours(i, length));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (i, row) in dst.iter_mut().enumerate() {
            *row = neighbours(i, length);
        }
    }
}

/// East and south neighbours.
pub fn write_stencil3_table(dst: &mut [[usize; 2]], length: usize) {
    write_table(dst, length);
}

/// East, south, west and north neighbours.
pub fn write_stencil5_table(dst: &mut [[usize; 4]], length: usize) {
    write_table(dst, length);
}

/// Cardinal neighbours followed by SE, SW, NW, NE.
pub fn write_stencil9_table(dst: &mut [[usize; 8]], length: usize) {
    write_table(dst, length);
}

fn gather<T, const N: usize, const W: usize>(dst: &mut [[T; W]], src: &[T], table: &[[usize; N]])
where
    T: Copy + Send + Sync,
{
    let read = |(wide, row): (&mut [T; W], &[usize; N]), i: usize| {
        wide[0] = src[i];
        for j in 0..N {
            wide[j + 1] = src[row[j]];
        }
    };

    #[cfg(feature = "parallel")]
    {
        dst.par_iter_mut()
            .zip(table.par_iter())
            .enumerate()
            .for_each(|(i, pair)| read(pair, i));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (i, pair) in dst.iter_mut().zip(table.iter()).enumerate() {
            read(pair, i);
        }
    }
}

/// Gather (self, east, south) for every cell.
pub fn write_stencil3<T: Copy + Send + Sync>(dst: &mut [[T; 3]], src: &[T], table: &[[usize; 2]]) {
    gather(dst, src, table);
}

/// Gather self and the four cardinal neighbours for every cell.
pub fn write_stencil5<T: Copy + Send + Sync>(dst: &mut [[T; 5]], src: &[T], table: &[[usize; 4]]) {
    gather(dst, src, table);
}

/// Gather self and all eight neighbours for every cell.
pub fn write_stencil9<T: Copy + Send + Sync>(dst: &mut [[T; 9]], src: &[T], table: &[[usize; 8]]) {
    gather(dst, src, table);
}

fn scatter<const N: usize, const W: usize>(dst: &mut [i64], src: &[[i64; W]], table: &[[usize; N]]) {
    for (i, (wide, row)) in src.iter().zip(table).enumerate() {
        dst[i] += wide[0];
        for j in 0..N {
            dst[row[j]] += wide[j + 1];
        }
    }
}

/// Scatter-add (self, east, south) deltas back onto the grid.
pub fn add_stencil3(dst: &mut [i64], src: &[[i64; 3]], table: &[[usize; 2]]) {
    scatter(dst, src, table);
}

pub fn add_stencil5(dst: &mut [i64], src: &[[i64; 5]], table: &[[usize; 4]]) {
    scatter(dst, src, table);
}

pub fn add_stencil9(dst: &mut [i64], src: &[[i64; 9]], table: &[[usize; 8]]) {
    scatter(dst, src, table);
}

/// Geometry and precomputed neighbour tables for one grid order.
#[derive(Debug, Clone)]
pub struct Grid {
    pub order: u32,
    pub length: usize,
    pub area: usize,
    /// Point for each Hilbert index.
    pub points: Vec<Point>,
    pub stencil3: Vec<[usize; 2]>,
    pub stencil5: Vec<[usize; 4]>,
    pub stencil9: Vec<[usize; 8]>,
}

impl Grid {
    pub fn new(order: u32) -> Self {
        let length = 1usize << order;
        let area = length * length;
        let mut grid = Self {
            order,
            length,
            area,
            points: vec![Point::default(); area],
            stencil3: vec![[0; 2]; area],
            stencil5: vec![[0; 4]; area],
            stencil9: vec![[0; 8]; area],
        };
        write_hilbert_points(&mut grid.points, length);
        write_stencil3_table(&mut grid.stencil3, length);
        write_stencil5_table(&mut grid.stencil5, length);
        write_stencil9_table(&mut grid.stencil9, length);
        grid
    }

    pub fn encode(&self, p: Point) -> usize {
        hilbert_encode(p, self.length)
    }

    pub fn decode(&self, i: usize) -> Point {
        self.points[i % self.area]
    }
}
