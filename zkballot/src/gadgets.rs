//! R1CS gadgets for Baby Jubjub points.

use crate::*;
use ark_ff::{Field, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::ns;
use ark_relations::r1cs::{Namespace, SynthesisError};
use std::borrow::Borrow;

lazy_static! {
    /// `2^i·G` for every bit position of a circuit field element
    static ref GENERATOR_POWERS: Vec<Point> = {
        let mut powers = Vec::with_capacity(Fq::MODULUS_BIT_SIZE as usize);
        let mut current = Point::generator();
        for _ in 0..Fq::MODULUS_BIT_SIZE {
            powers.push(current);
            current = current.double();
        }
        powers
    };
}

/// An affine curve point allocated in a constraint system
#[derive(Clone, Debug)]
pub struct PointVar {
    pub x: FpVar<Fq>,
    pub y: FpVar<Fq>,
}

impl PointVar {
    pub fn new(x: FpVar<Fq>, y: FpVar<Fq>) -> Self {
        PointVar { x, y }
    }

    pub fn constant(point: Point) -> Self {
        PointVar {
            x: FpVar::constant(point.x()),
            y: FpVar::constant(point.y()),
        }
    }

    pub fn identity() -> Self {
        PointVar::constant(Point::identity())
    }

    pub fn value(&self) -> Result<Point, SynthesisError> {
        Ok(Point::new_unchecked(self.x.value()?, self.y.value()?))
    }

    /// Constrain `a·x² + y² = 1 + d·x²·y²`
    pub fn enforce_on_curve(&self) -> Result<(), SynthesisError> {
        let x2 = self.x.square()?;
        let y2 = self.y.square()?;
        let lhs = &x2 * COEFF_A + &y2;
        let rhs = (&x2 * &y2) * COEFF_D + Fq::from(1u64);
        lhs.enforce_equal(&rhs)
    }

    pub fn enforce_equal(&self, other: &PointVar) -> Result<(), SynthesisError> {
        self.x.enforce_equal(&other.x)?;
        self.y.enforce_equal(&other.y)
    }

    /// `when_true` if `cond`, else `when_false`
    pub fn select(
        cond: &Boolean<Fq>,
        when_true: &PointVar,
        when_false: &PointVar,
    ) -> Result<PointVar, SynthesisError> {
        Ok(PointVar {
            x: FpVar::conditionally_select(cond, &when_true.x, &when_false.x)?,
            y: FpVar::conditionally_select(cond, &when_true.y, &when_false.y)?,
        })
    }

    /// Complete twisted Edwards addition
    pub fn add(&self, other: &PointVar) -> Result<PointVar, SynthesisError> {
        let x1y2 = &self.x * &other.y;
        let y1x2 = &self.y * &other.x;
        let y1y2 = &self.y * &other.y;
        let x1x2 = &self.x * &other.x;
        let dxy = (&x1x2 * &y1y2) * COEFF_D;

        let one = FpVar::Constant(Fq::from(1u64));
        let x_num = x1y2 + y1x2;
        let x_den = &one + &dxy;
        let y_num = y1y2 - x1x2 * COEFF_A;
        let y_den = one - dxy;

        Ok(PointVar {
            x: divide(&x_num, &x_den)?,
            y: divide(&y_num, &y_den)?,
        })
    }

    pub fn double(&self) -> Result<PointVar, SynthesisError> {
        self.add(self)
    }

    /// Variable-base multiplication by a little-endian bit decomposition
    pub fn scalar_mul_le(&self, bits: &[Boolean<Fq>]) -> Result<PointVar, SynthesisError> {
        let mut result = PointVar::identity();
        let mut base = self.clone();
        for (i, bit) in bits.iter().enumerate() {
            let sum = result.add(&base)?;
            result = PointVar::select(bit, &sum, &result)?;
            if i + 1 < bits.len() {
                base = base.double()?;
            }
        }
        Ok(result)
    }

    /// Fixed-base multiplication of the generator by a little-endian bit decomposition
    pub fn generator_mul(bits: &[Boolean<Fq>]) -> Result<PointVar, SynthesisError> {
        if bits.len() > GENERATOR_POWERS.len() {
            return Err(SynthesisError::Unsatisfiable);
        }
        let mut result = PointVar::identity();
        for (bit, power) in bits.iter().zip(GENERATOR_POWERS.iter()) {
            let sum = result.add(&PointVar::constant(*power))?;
            result = PointVar::select(bit, &sum, &result)?;
        }
        Ok(result)
    }
}

/// `num / den`, witnessed and checked with a single multiplication constraint
fn divide(num: &FpVar<Fq>, den: &FpVar<Fq>) -> Result<FpVar<Fq>, SynthesisError> {
    let cs = num.cs().or(den.cs());
    if cs.is_none() {
        let inverse = den
            .value()?
            .inverse()
            .ok_or(SynthesisError::DivisionByZero)?;
        return Ok(FpVar::constant(num.value()? * inverse));
    }

    let quotient = FpVar::new_witness(ns!(cs, "quotient"), || {
        let inverse = den
            .value()?
            .inverse()
            .ok_or(SynthesisError::DivisionByZero)?;
        Ok(num.value()? * inverse)
    })?;
    quotient.mul_equals(den, num)?;
    Ok(quotient)
}

impl AllocVar<Point, Fq> for PointVar {
    fn new_variable<T: Borrow<Point>>(
        cs: impl Into<Namespace<Fq>>,
        f: impl FnOnce() -> Result<T, SynthesisError>,
        mode: AllocationMode,
    ) -> Result<Self, SynthesisError> {
        let ns = cs.into();
        let cs = ns.cs();
        let point = f().map(|p| *p.borrow()).ok();

        let x = FpVar::new_variable(
            ns!(cs, "x"),
            || point.map(|p| p.x()).ok_or(SynthesisError::AssignmentMissing),
            mode,
        )?;
        let y = FpVar::new_variable(
            ns!(cs, "y"),
            || point.map(|p| p.y()).ok_or(SynthesisError::AssignmentMissing),
            mode,
        )?;
        Ok(PointVar { x, y })
    }
}
