//! Baby Jubjub arithmetic.
//!
//! The curve is the twisted Edwards curve `a·x² + y² = 1 + d·x²·y²` defined over the BN254
//! scalar field, so its points can be manipulated natively inside BN254 Groth16 circuits.
//! Points are kept in affine form; `a` is a square and `d` is not, which makes the addition
//! law complete.

use crate::*;
use ark_ec::twisted_edwards::TECurveConfig;
use ark_ed_on_bn254::EdwardsConfig;
use ark_ff::{BigInteger, Field, MontFp, One, PrimeField, Zero};
use std::ops::{Add, Neg, Sub};

/// Base field of the curve (the BN254 scalar field, native to the proof system)
pub type Fq = ark_bn254::Fr;

/// Scalar field of the prime-order subgroup generated by [`Point::generator`]
pub type Scalar = ark_ed_on_bn254::Fr;

/// Curve coefficient `a = 168700`
pub const COEFF_A: Fq = <EdwardsConfig as TECurveConfig>::COEFF_A;

/// Curve coefficient `d = 168696`
pub const COEFF_D: Fq = <EdwardsConfig as TECurveConfig>::COEFF_D;

/// x-coordinate of the protocol generator (circomlib `Base8`)
pub const GENERATOR_X: Fq =
    MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553");

/// y-coordinate of the protocol generator (circomlib `Base8`)
pub const GENERATOR_Y: Fq =
    MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203");

/// An affine point on Baby Jubjub.
///
/// Values constructed through [`Point::new`] or decoded from bytes are guaranteed to be on the
/// curve and in the prime-order subgroup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    x: Fq,
    y: Fq,
}

impl Point {
    /// Create a point from its coordinates, rejecting anything off-curve or outside the subgroup
    pub fn new(x: Fq, y: Fq) -> Result<Self, Error> {
        let point = Point { x, y };
        if !point.is_on_curve() || !point.is_in_prime_subgroup() {
            return Err(Error::InvalidPoint);
        }
        Ok(point)
    }

    pub(crate) const fn new_unchecked(x: Fq, y: Fq) -> Self {
        Point { x, y }
    }

    /// The neutral element `(0, 1)`
    pub fn identity() -> Self {
        Point {
            x: Fq::zero(),
            y: Fq::one(),
        }
    }

    /// The protocol generator `G`
    pub const fn generator() -> Self {
        Point {
            x: GENERATOR_X,
            y: GENERATOR_Y,
        }
    }

    pub fn x(&self) -> Fq {
        self.x
    }

    pub fn y(&self) -> Fq {
        self.y
    }

    pub fn is_identity(&self) -> bool {
        self.x.is_zero() && self.y.is_one()
    }

    /// Check the curve equation `a·x² + y² = 1 + d·x²·y²`
    pub fn is_on_curve(&self) -> bool {
        let x2 = self.x.square();
        let y2 = self.y.square();
        COEFF_A * x2 + y2 == Fq::one() + COEFF_D * x2 * y2
    }

    /// Check that multiplying by the subgroup order yields the identity
    pub fn is_in_prime_subgroup(&self) -> bool {
        let order = Scalar::MODULUS.to_bits_be();
        self.mul_bits_be(&order).is_identity()
    }

    /// Twisted Edwards addition
    pub fn add(&self, other: &Point) -> Point {
        let x1x2 = self.x * other.x;
        let y1y2 = self.y * other.y;
        let dxy = COEFF_D * x1x2 * y1y2;

        let x_num = self.x * other.y + self.y * other.x;
        let y_num = y1y2 - COEFF_A * x1x2;

        // The addition law is complete, so neither denominator vanishes for curve points
        let x_den = (Fq::one() + dxy)
            .inverse()
            .expect("zkballot: incomplete addition on Baby Jubjub");
        let y_den = (Fq::one() - dxy)
            .inverse()
            .expect("zkballot: incomplete addition on Baby Jubjub");

        Point {
            x: x_num * x_den,
            y: y_num * y_den,
        }
    }

    pub fn double(&self) -> Point {
        self.add(self)
    }

    /// `-(x, y) = (-x, y)`
    pub fn neg(&self) -> Point {
        Point {
            x: -self.x,
            y: self.y,
        }
    }

    pub fn sub(&self, other: &Point) -> Point {
        self.add(&other.neg())
    }

    /// Scalar multiplication.
    ///
    /// Runs double-and-add-always over every bit of the scalar representation and picks the
    /// result arithmetically, so the sequence of curve operations does not depend on the
    /// scalar's bits.
    pub fn mul(&self, scalar: &Scalar) -> Point {
        let bits = scalar.into_bigint().to_bits_be();
        self.mul_bits_be(&bits)
    }

    /// Multiply by a small integer, as used to map plaintexts onto the curve
    pub fn mul_u64(&self, value: u64) -> Point {
        self.mul(&Scalar::from(value))
    }

    fn mul_bits_be(&self, bits: &[bool]) -> Point {
        let mut acc = Point::identity();
        for bit in bits {
            acc = acc.double();
            let sum = Point::add(&acc, self);
            acc = Point::select(*bit, &sum, &acc);
        }
        acc
    }

    /// Branch-free selection: `when_true` if `bit`, otherwise `when_false`
    fn select(bit: bool, when_true: &Point, when_false: &Point) -> Point {
        let b = Fq::from(bit as u64);
        Point {
            x: when_false.x + b * (when_true.x - when_false.x),
            y: when_false.y + b * (when_true.y - when_false.y),
        }
    }

    /// 64-byte encoding: big-endian x followed by big-endian y
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&fq_to_bytes(&self.x));
        bytes[32..].copy_from_slice(&fq_to_bytes(&self.y));
        bytes
    }

    /// Decode and validate a point
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != 64 {
            return Err(Error::WrongLength {
                what: "curve point",
                expected: 64,
                found: bytes.len(),
            });
        }
        let x = fq_from_bytes(&bytes[..32])?;
        let y = fq_from_bytes(&bytes[32..])?;
        Point::new(x, y)
    }
}

impl Default for Point {
    fn default() -> Self {
        Point::identity()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::add(&self, &other)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::sub(&self, &other)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::neg(&self)
    }
}

impl std::iter::Sum for Point {
    fn sum<I: Iterator<Item = Point>>(iter: I) -> Point {
        iter.fold(Point::identity(), |acc, p| acc + p)
    }
}
