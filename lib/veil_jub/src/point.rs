//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Twisted Edwards group law: a·x² + y² = 1 + d·x²·y²

use alloy_primitives::U256;
use ff::Field;
use serde::{Deserialize, Serialize};

use crate::field::{Fq, from_fq, to_fq_reduced};

pub const COEFF_A: u64 = 168700;
pub const COEFF_D: u64 = 168696;

/// Order of the prime subgroup generated by [`Point::generator`]
pub const SUB_ORDER: U256 = U256::from_limbs([
    0x677297dc392126f1,
    0xab3eedb83920ee0a,
    0x370a08b6d0302b0b,
    0x060c89ce5c263405,
]);

const BASE8_X: U256 = U256::from_limbs([
    0x2893f3f6bb957051,
    0x2ab8d8010534e0b6,
    0x4eacb2e09d6277c1,
    0x0bb77a6ad63e739b,
]);

const BASE8_Y: U256 = U256::from_limbs([
    0x4b3c257a872d7d8b,
    0xfce0051fb9e13377,
    0x25572e1cd16bf9ed,
    0x25797203f7a0b249,
]);

fn coeff_a() -> Fq {
    Fq::from(COEFF_A)
}

fn coeff_d() -> Fq {
    Fq::from(COEFF_D)
}

/// Affine point with canonical coordinates. The identity is `(0, 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    #[serde(with = "crate::util::decimal")]
    pub x: U256,
    #[serde(with = "crate::util::decimal")]
    pub y: U256,
}

impl Default for Point {
    fn default() -> Self {
        Self::identity()
    }
}

impl Point {
    pub const fn new(x: U256, y: U256) -> Self {
        Self { x, y }
    }

    pub const fn identity() -> Self {
        Self {
            x: U256::ZERO,
            y: U256::ONE,
        }
    }

    /// The "Base8" generator of the prime-order subgroup.
    pub const fn generator() -> Self {
        Self {
            x: BASE8_X,
            y: BASE8_Y,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.x.is_zero() && self.y == U256::ONE
    }

    pub fn is_on_curve(&self) -> bool {
        let x = to_fq_reduced(&self.x);
        let y = to_fq_reduced(&self.y);
        let x2 = x.square();
        let y2 = y.square();
        coeff_a() * x2 + y2 == Fq::ONE + coeff_d() * x2 * y2
    }

    pub fn to_projective(&self) -> ProjectivePoint {
        ProjectivePoint {
            x: to_fq_reduced(&self.x),
            y: to_fq_reduced(&self.y),
            z: Fq::ONE,
        }
    }

    pub fn neg(&self) -> Self {
        Self {
            x: crate::field::neg(self.x),
            y: self.y,
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        self.to_projective().add(&other.to_projective()).to_affine()
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn double(&self) -> Self {
        self.to_projective().double().to_affine()
    }

    pub fn mul(&self, scalar: &U256) -> Self {
        self.to_projective().mul(scalar).to_affine()
    }
}

impl core::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::add(&self, &rhs)
    }
}

impl core::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::sub(&self, &rhs)
    }
}

impl core::ops::Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::neg(&self)
    }
}

impl core::iter::Sum for Point {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ProjectivePoint::identity(), |acc, p| acc.add(&p.to_projective()))
            .to_affine()
    }
}

/// Projective (X:Y:Z) coordinates, x = X/Z, y = Y/Z.
#[derive(Clone, Copy, Debug)]
pub struct ProjectivePoint {
    x: Fq,
    y: Fq,
    z: Fq,
}

impl ProjectivePoint {
    pub fn identity() -> Self {
        Self {
            x: Fq::ZERO,
            y: Fq::ONE,
            z: Fq::ONE,
        }
    }

    /// add-2008-bbjlp, complete on Baby Jubjub so it also doubles.
    pub fn add(&self, other: &Self) -> Self {
        let a = self.z * other.z;
        let b = a.square();
        let c = self.x * other.x;
        let d = self.y * other.y;
        let e = coeff_d() * c * d;
        let f = b - e;
        let g = b + e;
        let x3 = a * f * ((self.x + self.y) * (other.x + other.y) - c - d);
        let y3 = a * g * (d - coeff_a() * c);
        let z3 = f * g;
        Self {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    pub fn double(&self) -> Self {
        self.add(self)
    }

    /// Double-and-add from the most significant bit.
    pub fn mul(&self, scalar: &U256) -> Self {
        let mut acc = Self::identity();
        for i in (0..scalar.bit_len()).rev() {
            acc = acc.double();
            if scalar.bit(i) {
                acc = acc.add(self);
            }
        }
        acc
    }

    /// Points off the curve may have Z = 0; those normalise to (0, 0).
    pub fn to_affine(&self) -> Point {
        let z_inv = self.z.invert().unwrap_or(Fq::ZERO);
        Point {
            x: from_fq(&(self.x * z_inv)),
            y: from_fq(&(self.y * z_inv)),
        }
    }
}
