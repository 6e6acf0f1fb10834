//! The tally-correctness circuit.
//!
//! Proves knowledge of the election secret key `sk` such that every published result point is
//! the decryption of the matching aggregate ciphertext, and the result points add up to
//! `total_votes·G`.
//!
//! Public inputs, in order:
//! `pk.x, pk.y, c1.x[N], c1.y[N], c2.x[N], c2.y[N], result.x[N], result.y[N], total_votes`.

use crate::*;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::ns;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use std::convert::TryInto;

/// Number of public inputs the tally circuit exposes for `n` candidates
pub const fn tally_public_inputs(n: usize) -> usize {
    2 + 6 * n + 1
}

#[derive(Clone, Debug)]
pub struct TallyCircuit<const N: usize> {
    pub public_key: Option<Point>,
    pub c1_totals: Option<[Point; N]>,
    pub c2_totals: Option<[Point; N]>,
    pub result_points: Option<[Point; N]>,
    pub total_votes: Option<u64>,

    pub secret: Option<Scalar>,
}

impl<const N: usize> TallyCircuit<N> {
    /// A circuit with no assignment, used for key generation
    pub fn blank() -> Self {
        TallyCircuit {
            public_key: None,
            c1_totals: None,
            c2_totals: None,
            result_points: None,
            total_votes: None,
            secret: None,
        }
    }

    /// Assign the circuit for the claimed per-candidate `results` of the aggregate `totals`
    pub fn new(keys: &KeyPair, totals: &[Ciphertext], results: &[u64]) -> Result<Self, Error> {
        check_candidate_count(N)?;
        let totals: [Ciphertext; N] = to_array(totals.to_vec(), "aggregate ciphertext vector")?;
        let results: [u64; N] = to_array(results.to_vec(), "tally results")?;

        let generator = Point::generator();
        Ok(TallyCircuit {
            public_key: Some(keys.public),
            c1_totals: Some(totals.map(|ct| ct.c1)),
            c2_totals: Some(totals.map(|ct| ct.c2)),
            result_points: Some(results.map(|m| generator.mul_u64(m))),
            total_votes: Some(results.iter().sum()),
            secret: Some(*keys.secret()),
        })
    }

    /// The public signals this assignment exposes
    pub fn public_signals(&self) -> Option<TallySignals> {
        Some(TallySignals {
            public_key: self.public_key?,
            c1_totals: self.c1_totals?.to_vec(),
            c2_totals: self.c2_totals?.to_vec(),
            result_points: self.result_points?.to_vec(),
            total_votes: self.total_votes?,
        })
    }
}

pub(crate) fn to_array<T, const N: usize>(items: Vec<T>, what: &'static str) -> Result<[T; N], Error> {
    items.try_into().map_err(|v: Vec<T>| Error::WrongLength {
        what,
        expected: N,
        found: v.len(),
    })
}

/// Allocate the x coordinates of a point group, then the y coordinates
fn alloc_point_inputs<const N: usize>(
    cs: &ConstraintSystemRef<Fq>,
    points: &Option<[Point; N]>,
) -> Result<Vec<PointVar>, SynthesisError> {
    let mut xs = Vec::with_capacity(N);
    for i in 0..N {
        xs.push(FpVar::new_input(ns!(cs, "x"), || {
            points
                .as_ref()
                .map(|p| p[i].x())
                .ok_or(SynthesisError::AssignmentMissing)
        })?);
    }

    let mut ys = Vec::with_capacity(N);
    for i in 0..N {
        ys.push(FpVar::new_input(ns!(cs, "y"), || {
            points
                .as_ref()
                .map(|p| p[i].y())
                .ok_or(SynthesisError::AssignmentMissing)
        })?);
    }

    Ok(xs.into_iter().zip(ys).map(|(x, y)| PointVar::new(x, y)).collect())
}

impl<const N: usize> ConstraintSynthesizer<Fq> for TallyCircuit<N> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fq>) -> Result<(), SynthesisError> {
        if N == 0 || N > MAX_CANDIDATES {
            return Err(SynthesisError::Unsatisfiable);
        }

        // Public inputs
        let public_key = PointVar::new_input(ns!(cs, "public_key"), || {
            self.public_key.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let c1_totals = alloc_point_inputs(&cs, &self.c1_totals)?;
        let c2_totals = alloc_point_inputs(&cs, &self.c2_totals)?;
        let result_points = alloc_point_inputs(&cs, &self.result_points)?;
        let total_votes = FpVar::new_input(ns!(cs, "total_votes"), || {
            self.total_votes
                .map(Fq::from)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Private input
        let secret = FpVar::new_witness(ns!(cs, "secret"), || {
            self.secret
                .as_ref()
                .map(scalar_to_fq)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let secret_bits = secret.to_bits_le()?;

        // pk == sk·G
        PointVar::generator_mul(&secret_bits)?.enforce_equal(&public_key)?;

        // C2_j == result_j + sk·C1_j
        let mut sum = PointVar::identity();
        for ((c1, c2), result) in c1_totals.iter().zip(&c2_totals).zip(&result_points) {
            let mask = c1.scalar_mul_le(&secret_bits)?;
            result.add(&mask)?.enforce_equal(c2)?;
            sum = sum.add(result)?;
        }

        // Σ result_j == total_votes·G
        let total_bits = total_votes.to_bits_le()?;
        PointVar::generator_mul(&total_bits)?.enforce_equal(&sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    fn is_satisfied<const N: usize>(circuit: TallyCircuit<N>) -> bool {
        let cs = ConstraintSystem::<Fq>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    fn aggregate(keys: &KeyPair, choices: &[u64], n: usize) -> Vec<Ciphertext> {
        let mut rng = rand::thread_rng();
        let ballots: Vec<Vec<Ciphertext>> = choices
            .iter()
            .map(|c| {
                let r: Vec<Scalar> = (0..n).map(|_| random_nonzero_scalar(&mut rng)).collect();
                encrypt_vote_onehot(*c, n, &keys.public, &r).unwrap()
            })
            .collect();
        aggregate_votes(&ballots, n).unwrap()
    }

    #[test]
    fn correct_tally_is_satisfied() {
        let keys = KeyPair::from_secret(Scalar::from(31337u64));
        let totals = aggregate(&keys, &[0, 1, 0], 3);

        let circuit = TallyCircuit::<3>::new(&keys, &totals, &[2, 1, 0]).unwrap();
        assert_eq!(circuit.total_votes, Some(3));
        assert!(is_satisfied(circuit));
    }

    #[test]
    fn wrong_results_are_unsatisfiable() {
        let keys = KeyPair::from_secret(Scalar::from(31337u64));
        let totals = aggregate(&keys, &[0, 1, 0], 3);

        // Same total, wrong distribution
        assert!(!is_satisfied(
            TallyCircuit::<3>::new(&keys, &totals, &[1, 1, 1]).unwrap()
        ));
        // Right distribution, inflated total
        let mut circuit = TallyCircuit::<3>::new(&keys, &totals, &[2, 1, 0]).unwrap();
        circuit.total_votes = Some(4);
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn wrong_secret_is_unsatisfiable() {
        let keys = KeyPair::from_secret(Scalar::from(31337u64));
        let totals = aggregate(&keys, &[1], 2);

        let mut circuit = TallyCircuit::<2>::new(&keys, &totals, &[0, 1]).unwrap();
        circuit.secret = Some(Scalar::from(31338u64));
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn empty_election_tallies_to_zero() {
        let keys = KeyPair::from_secret(Scalar::from(5u64));
        let totals = aggregate(&keys, &[], 2);
        assert!(is_satisfied(
            TallyCircuit::<2>::new(&keys, &totals, &[0, 0]).unwrap()
        ));
    }

    #[test]
    fn public_input_layout() {
        let keys = KeyPair::from_secret(Scalar::from(77u64));
        let totals = aggregate(&keys, &[1, 1], 2);
        let circuit = TallyCircuit::<2>::new(&keys, &totals, &[0, 2]).unwrap();
        let signals = circuit.public_signals().unwrap();

        let cs = ConstraintSystem::<Fq>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        let instance = cs.borrow().unwrap().instance_assignment.clone();

        assert_eq!(instance.len(), tally_public_inputs(2) + 1);
        assert_eq!(instance[1..].to_vec(), signals.to_field_elements());
        assert_eq!(instance[1], keys.public.x());
        assert_eq!(instance[3], totals[0].c1.x());
        assert_eq!(instance[4], totals[1].c1.x());
        assert_eq!(instance[5], totals[0].c1.y());
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        let keys = KeyPair::from_secret(Scalar::from(77u64));
        let totals = aggregate(&keys, &[0], 2);
        assert!(matches!(
            TallyCircuit::<2>::new(&keys, &totals, &[1]),
            Err(Error::WrongLength { .. })
        ));
        assert!(TallyCircuit::<3>::new(&keys, &totals, &[1, 0, 0]).is_err());
    }
}
