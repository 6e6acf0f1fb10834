//! The vote-legality circuit.
//!
//! Proves that a ballot of `N` ciphertexts encrypts a one-hot vector for the candidate
//! committed to in `commitment`, without revealing the candidate.
//!
//! Public inputs, in order: `commitment, ciphertext_hash, pk.x, pk.y`.

use crate::*;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::ns;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use std::convert::TryInto;

/// Number of public inputs the vote circuit exposes
pub const VOTE_PUBLIC_INPUTS: usize = 4;

#[derive(Clone, Debug)]
pub struct VoteCircuit<const N: usize> {
    pub commitment: Option<Fq>,
    pub ciphertext_hash: Option<Fq>,
    pub public_key: Option<Point>,

    pub candidate_id: Option<u64>,
    pub salt: Option<Fq>,
    pub randomness: Option<[Scalar; N]>,
    pub ciphertexts: Option<[Ciphertext; N]>,
}

impl<const N: usize> VoteCircuit<N> {
    /// A circuit with no assignment, used for key generation
    pub fn blank() -> Self {
        VoteCircuit {
            commitment: None,
            ciphertext_hash: None,
            public_key: None,
            candidate_id: None,
            salt: None,
            randomness: None,
            ciphertexts: None,
        }
    }

    /// Build a fully assigned circuit, encrypting the one-hot vote and deriving the public values
    pub fn new(
        public_key: Point,
        candidate_id: u64,
        salt: Fq,
        randomness: [Scalar; N],
    ) -> Result<Self, Error> {
        check_candidate_count(N)?;

        let ciphertexts = encrypt_vote_onehot(candidate_id, N, &public_key, &randomness)?;
        let commitment = compute_commitment(candidate_id, &salt)?;
        let ciphertext_hash = compute_ciphertext_hash(&ciphertexts)?;

        let ciphertexts: [Ciphertext; N] =
            ciphertexts.try_into().map_err(|v: Vec<Ciphertext>| Error::WrongLength {
                what: "ballot ciphertext vector",
                expected: N,
                found: v.len(),
            })?;

        Ok(VoteCircuit {
            commitment: Some(commitment),
            ciphertext_hash: Some(ciphertext_hash),
            public_key: Some(public_key),
            candidate_id: Some(candidate_id),
            salt: Some(salt),
            randomness: Some(randomness),
            ciphertexts: Some(ciphertexts),
        })
    }

    /// The public signals this assignment exposes
    pub fn public_signals(&self) -> Option<VoteSignals> {
        Some(VoteSignals {
            commitment: self.commitment?,
            ciphertext_hash: self.ciphertext_hash?,
            public_key: self.public_key?,
        })
    }
}

pub(crate) fn check_candidate_count(n: usize) -> Result<(), Error> {
    if n == 0 || n > MAX_CANDIDATES {
        return Err(Error::UnsupportedCandidateCount(n));
    }
    Ok(())
}

impl<const N: usize> ConstraintSynthesizer<Fq> for VoteCircuit<N> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fq>) -> Result<(), SynthesisError> {
        if N == 0 || N > MAX_CANDIDATES {
            return Err(SynthesisError::Unsatisfiable);
        }

        // Public inputs
        let commitment = FpVar::new_input(ns!(cs, "commitment"), || {
            self.commitment.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let ciphertext_hash = FpVar::new_input(ns!(cs, "ciphertext_hash"), || {
            self.ciphertext_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let public_key = PointVar::new_input(ns!(cs, "public_key"), || {
            self.public_key.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Private inputs
        let candidate_id = FpVar::new_witness(ns!(cs, "candidate_id"), || {
            self.candidate_id
                .map(Fq::from)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let salt = FpVar::new_witness(ns!(cs, "salt"), || {
            self.salt.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // commitment == H(candidate_id, salt)
        let expected = poseidon_hash_var(cs.clone(), &[candidate_id.clone(), salt])?;
        expected.enforce_equal(&commitment)?;

        // Exactly one selector is set, which also bounds candidate_id to [0, N)
        let mut selectors = Vec::with_capacity(N);
        let mut selected = FpVar::zero();
        for slot in 0..N {
            let bit = candidate_id.is_eq(&FpVar::constant(Fq::from(slot as u64)))?;
            selected += FpVar::from(bit.clone());
            selectors.push(bit);
        }
        selected.enforce_equal(&FpVar::one())?;

        public_key.enforce_on_curve()?;

        let generator = PointVar::constant(Point::generator());
        let identity = PointVar::identity();
        let mut components = Vec::with_capacity(4 * N);

        for (slot, selector) in selectors.iter().enumerate() {
            let r = FpVar::new_witness(ns!(cs, "randomness"), || {
                self.randomness
                    .as_ref()
                    .map(|r| scalar_to_fq(&r[slot]))
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
            let c1 = PointVar::new_witness(ns!(cs, "c1"), || {
                self.ciphertexts
                    .as_ref()
                    .map(|c| c[slot].c1)
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
            let c2 = PointVar::new_witness(ns!(cs, "c2"), || {
                self.ciphertexts
                    .as_ref()
                    .map(|c| c[slot].c2)
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;

            let r_bits = r.to_bits_le()?;

            // C1 == r·G
            PointVar::generator_mul(&r_bits)?.enforce_equal(&c1)?;

            // C2 == bit·G + r·pk
            let message = PointVar::select(selector, &generator, &identity)?;
            let mask = public_key.scalar_mul_le(&r_bits)?;
            message.add(&mask)?.enforce_equal(&c2)?;

            components.extend([c1.x, c1.y, c2.x, c2.y]);
        }

        // ciphertext_hash == H(c1x_0, c1y_0, c2x_0, c2y_0, ...)
        let expected = poseidon_hash_var(cs, &components)?;
        expected.enforce_equal(&ciphertext_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    fn is_satisfied<const N: usize>(circuit: VoteCircuit<N>) -> bool {
        let cs = ConstraintSystem::<Fq>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    fn randomness<const N: usize>() -> [Scalar; N] {
        let mut rng = rand::thread_rng();
        [(); N].map(|_| random_nonzero_scalar(&mut rng))
    }

    fn keys() -> KeyPair {
        KeyPair::from_secret(Scalar::from(424242u64))
    }

    /// Assign arbitrary plaintexts to each slot, keeping commitment and hash consistent
    fn forged<const N: usize>(candidate_id: u64, plaintexts: [u64; N]) -> VoteCircuit<N> {
        let keys = keys();
        let salt = Fq::from(99u64);
        let r = randomness::<N>();
        let mut slots = [Ciphertext::zero(); N];
        for i in 0..N {
            slots[i] = encrypt(plaintexts[i], &keys.public, &r[i]);
        }

        VoteCircuit {
            commitment: Some(compute_commitment(candidate_id, &salt).unwrap()),
            ciphertext_hash: Some(compute_ciphertext_hash(&slots).unwrap()),
            public_key: Some(keys.public),
            candidate_id: Some(candidate_id),
            salt: Some(salt),
            randomness: Some(r),
            ciphertexts: Some(slots),
        }
    }

    #[test]
    fn honest_vote_is_satisfied() {
        let keys = keys();
        for candidate in 0..3u64 {
            let circuit =
                VoteCircuit::<3>::new(keys.public, candidate, Fq::from(7u64), randomness()).unwrap();
            assert!(is_satisfied(circuit));
        }
    }

    #[test]
    fn public_input_layout() {
        let keys = keys();
        let circuit = VoteCircuit::<2>::new(keys.public, 1, Fq::from(5u64), randomness()).unwrap();
        let signals = circuit.public_signals().unwrap();

        let cs = ConstraintSystem::<Fq>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        let instance = cs.borrow().unwrap().instance_assignment.clone();

        // The first instance variable is the constant one
        assert_eq!(instance.len(), VOTE_PUBLIC_INPUTS + 1);
        assert_eq!(instance[1..].to_vec(), signals.to_field_elements());
    }

    #[test]
    fn double_vote_is_unsatisfiable() {
        assert!(!is_satisfied(forged::<3>(0, [1, 1, 0])));
    }

    #[test]
    fn empty_vote_is_unsatisfiable() {
        assert!(!is_satisfied(forged::<3>(0, [0, 0, 0])));
    }

    #[test]
    fn out_of_range_candidate_is_unsatisfiable() {
        assert!(!is_satisfied(forged::<3>(3, [0, 0, 0])));
        assert!(!is_satisfied(forged::<3>(3, [0, 0, 1])));
    }

    #[test]
    fn non_boolean_slot_is_unsatisfiable() {
        assert!(!is_satisfied(forged::<3>(1, [0, 2, 0])));
    }

    #[test]
    fn mismatched_commitment_is_unsatisfiable() {
        let mut circuit = forged::<2>(1, [0, 1]);
        assert!(is_satisfied(circuit.clone()));
        circuit.commitment = Some(compute_commitment(0, &Fq::from(99u64)).unwrap());
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn candidate_count_is_bounded() {
        let keys = keys();
        assert!(matches!(
            VoteCircuit::<0>::new(keys.public, 0, Fq::from(1u64), []),
            Err(Error::UnsupportedCandidateCount(0))
        ));
        assert!(matches!(
            VoteCircuit::<2>::new(keys.public, 2, Fq::from(1u64), randomness()),
            Err(Error::CandidateOutOfRange { .. })
        ));
    }
}
