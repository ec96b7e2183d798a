use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// An integer coordinate on a `D`-dimensional hypercubic lattice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position<const D: usize>(pub [i32; D]);

impl<const D: usize> Position<D> {
    /// Creates a new position from its coordinates.
    #[inline(always)]
    pub fn new(coords: [i32; D]) -> Self {
        Position(coords)
    }

    /// The lattice origin.
    #[inline(always)]
    pub fn origin() -> Self {
        Position([0; D])
    }

    /// Unit vector along `axis` (panics if `axis >= D`).
    #[inline(always)]
    pub fn unit(axis: usize) -> Self {
        let mut coords = [0; D];
        coords[axis] = 1;
        Position(coords)
    }

    /// One of the `2 * D` nearest-neighbour offsets.
    /// Even `m` points along `-axis`, odd `m` along `+axis`, with `axis = m / 2`.
    #[inline(always)]
    pub fn direction(m: usize) -> Self {
        let sign = if m % 2 == 1 { 1 } else { -1 };
        Self::unit(m / 2) * sign
    }

    /// Number of nearest-neighbour directions on this lattice.
    #[inline(always)]
    pub const fn direction_count() -> usize {
        2 * D
    }

    /// Iterates the `2 * D` nearest neighbours of this position.
    pub fn neighbours(self) -> impl Iterator<Item = Position<D>> {
        (0..Self::direction_count()).map(move |m| self + Self::direction(m))
    }

    /// Manhattan (L1) distance to another position.
    pub fn manhattan(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.abs_diff(*b))
            .sum()
    }

    /// Manhattan norm of this position taken as an offset.
    pub fn norm_l1(&self) -> u32 {
        self.0.iter().map(|c| c.unsigned_abs()).sum()
    }

    pub fn to_float(&self) -> FloatVec<D> {
        let mut out = [0.0; D];
        for (o, c) in out.iter_mut().zip(self.0.iter()) {
            *o = *c as f32;
        }
        FloatVec(out)
    }

    pub fn coords(&self) -> &[i32; D] {
        &self.0
    }
}

impl<const D: usize> fmt::Display for Position<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (n, c) in self.0.iter().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

impl<const D: usize> Add for Position<D> {
    type Output = Self;
    fn add(mut self, other: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += *b;
        }
        self
    }
}

impl<const D: usize> AddAssign for Position<D> {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl<const D: usize> Sub for Position<D> {
    type Output = Self;
    fn sub(mut self, other: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a -= *b;
        }
        self
    }
}

impl<const D: usize> Neg for Position<D> {
    type Output = Self;
    fn neg(mut self) -> Self {
        for a in self.0.iter_mut() {
            *a = -*a;
        }
        self
    }
}

impl<const D: usize> Mul<i32> for Position<D> {
    type Output = Self;
    fn mul(mut self, scalar: i32) -> Self {
        for a in self.0.iter_mut() {
            *a *= scalar;
        }
        self
    }
}

/// A floating point vector, used for centres of mass and distances.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FloatVec<const D: usize>(pub [f32; D]);

impl<const D: usize> FloatVec<D> {
    #[inline(always)]
    pub fn zero() -> Self {
        FloatVec([0.0; D])
    }

    #[inline(always)]
    pub fn length_squared(&self) -> f32 {
        self.0.iter().map(|c| c * c).sum()
    }

    #[inline(always)]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline(always)]
    pub fn distance(&self, other: &Self) -> f32 {
        (*self - *other).length()
    }
}

impl<const D: usize> Add for FloatVec<D> {
    type Output = Self;
    fn add(mut self, other: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += *b;
        }
        self
    }
}

impl<const D: usize> Sub for FloatVec<D> {
    type Output = Self;
    fn sub(mut self, other: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a -= *b;
        }
        self
    }
}

impl<const D: usize> Div<f32> for FloatVec<D> {
    type Output = Self;
    fn div(mut self, scalar: f32) -> Self {
        for a in self.0.iter_mut() {
            *a /= scalar;
        }
        self
    }
}

/// Volume of the unit ball in `dimension` dimensions.
/// V(0) = 1, V(1) = 2, V(n) = V(n - 2) * 2π / n.
pub fn unit_ball_volume(dimension: usize) -> f32 {
    match dimension {
        0 => 1.0,
        1 => 2.0,
        n => unit_ball_volume(n - 2) * 2.0 * std::f32::consts::PI / n as f32,
    }
}

/// All lattice offsets whose Manhattan norm is at most `reach`, ordered
/// by norm and then lexicographically. The zero offset comes first.
pub fn ball_offsets<const D: usize>(reach: u32) -> Vec<Position<D>> {
    let r = reach as i32;
    let mut offsets = vec![Position::<D>::origin()];
    // Grow one axis at a time; every partial offset is kept within the L1 budget.
    for axis in 0..D {
        let mut next = Vec::with_capacity(offsets.len() * (2 * reach as usize + 1));
        for base in &offsets {
            let used = base.norm_l1() as i32;
            for c in -(r - used)..=(r - used) {
                let mut p = *base;
                p.0[axis] = c;
                next.push(p);
            }
        }
        offsets = next;
    }
    offsets.sort_by_key(|p| (p.norm_l1(), *p));
    offsets
}
