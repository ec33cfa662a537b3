//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Point compression to (x, sign flag)

use alloy_primitives::U256;
use ff::Field;
use serde::{Deserialize, Serialize};

use crate::{
    error::{JubError, Result},
    field::{Fq, from_fq, is_negative, to_fq},
    point::{COEFF_A, COEFF_D, Point},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompressedPoint {
    #[serde(with = "crate::util::decimal")]
    pub x: U256,
    pub flag: bool,
}

impl CompressedPoint {
    pub fn decompress(&self) -> Result<Point> {
        decompress(self.x, self.flag)
    }
}

impl Point {
    pub fn compress(&self) -> CompressedPoint {
        compress(self)
    }
}

pub fn compress(point: &Point) -> CompressedPoint {
    CompressedPoint {
        x: point.x,
        flag: is_negative(point.y),
    }
}

/// Solves the curve equation for y. `x = 0` is always the identity and never
/// takes a square root.
pub fn decompress(x: U256, flag: bool) -> Result<Point> {
    if x.is_zero() {
        return Ok(Point::identity());
    }

    let fx = to_fq(&x)?;
    let x2 = fx.square();
    let ax2m1 = Fq::from(COEFF_A) * x2 - Fq::ONE;
    let dx2m1 = Fq::from(COEFF_D) * x2 - Fq::ONE;
    let dx2m1_inv: Fq = Option::from(dx2m1.invert()).ok_or(JubError::NoSquareRoot(x))?;
    let y2 = ax2m1 * dx2m1_inv;
    let y: Fq = Option::from(y2.sqrt()).ok_or(JubError::NoSquareRoot(x))?;

    let y = from_fq(&y);
    let y_out = if is_negative(y) == flag {
        y
    } else {
        crate::field::neg(y)
    };

    Ok(Point { x, y: y_out })
}
