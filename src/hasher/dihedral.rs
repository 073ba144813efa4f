//! The eight rotations and reflections of an image, applied to its 16x16 DCT
//! coefficients instead of its pixels.
//!
//! Each basis function is even or odd about the image centre depending on
//! the parity of its index, so a transform only swaps coefficient positions
//! and flips signs.

use crate::hasher::DCT_DIM;

use std::ops::{BitAnd, BitOr};

type Block = [[f32; DCT_DIM]; DCT_DIM];

/// A set of dihedral transforms to compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dihedral(u8);

impl Dihedral {
    pub const ORIGINAL: Self = Self(0x01);
    /// Counter-clockwise quarter turn.
    pub const ROTATE_90: Self = Self(0x02);
    pub const ROTATE_180: Self = Self(0x04);
    pub const ROTATE_270: Self = Self(0x08);
    /// Mirror top to bottom.
    pub const FLIP_X: Self = Self(0x10);
    /// Mirror left to right.
    pub const FLIP_Y: Self = Self(0x20);
    /// Transpose about the main diagonal.
    pub const FLIP_PLUS_1: Self = Self(0x40);
    /// Transpose about the anti-diagonal.
    pub const FLIP_MINUS_1: Self = Self(0x80);
    pub const ALL: Self = Self(0xff);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for Dihedral {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for Dihedral {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for Dihedral {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

#[inline]
fn odd(i: usize) -> bool {
    i & 1 != 0
}

#[inline]
fn signed(v: f32, keep: bool) -> f32 {
    if keep {
        v
    } else {
        -v
    }
}

pub fn original(a: &Block) -> Block {
    *a
}

pub fn rotate_90(a: &Block) -> Block {
    let mut b = [[0.0; DCT_DIM]; DCT_DIM];
    for i in 0..DCT_DIM {
        for j in 0..DCT_DIM {
            b[j][i] = signed(a[i][j], odd(j));
        }
    }
    b
}

pub fn rotate_180(a: &Block) -> Block {
    let mut b = [[0.0; DCT_DIM]; DCT_DIM];
    for i in 0..DCT_DIM {
        for j in 0..DCT_DIM {
            b[i][j] = signed(a[i][j], !odd(i + j));
        }
    }
    b
}

pub fn rotate_270(a: &Block) -> Block {
    let mut b = [[0.0; DCT_DIM]; DCT_DIM];
    for i in 0..DCT_DIM {
        for j in 0..DCT_DIM {
            b[j][i] = signed(a[i][j], odd(i));
        }
    }
    b
}

pub fn flip_x(a: &Block) -> Block {
    let mut b = [[0.0; DCT_DIM]; DCT_DIM];
    for i in 0..DCT_DIM {
        for j in 0..DCT_DIM {
            b[i][j] = signed(a[i][j], odd(i));
        }
    }
    b
}

pub fn flip_y(a: &Block) -> Block {
    let mut b = [[0.0; DCT_DIM]; DCT_DIM];
    for i in 0..DCT_DIM {
        for j in 0..DCT_DIM {
            b[i][j] = signed(a[i][j], odd(j));
        }
    }
    b
}

pub fn flip_plus_1(a: &Block) -> Block {
    let mut b = [[0.0; DCT_DIM]; DCT_DIM];
    for i in 0..DCT_DIM {
        for j in 0..DCT_DIM {
            b[j][i] = a[i][j];
        }
    }
    b
}

pub fn flip_minus_1(a: &Block) -> Block {
    let mut b = [[0.0; DCT_DIM]; DCT_DIM];
    for i in 0..DCT_DIM {
        for j in 0..DCT_DIM {
            b[j][i] = signed(a[i][j], !odd(i + j));
        }
    }
    b
}
