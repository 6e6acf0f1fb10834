//! Exponential ElGamal over Baby Jubjub.
//!
//! A plaintext `m` is encoded as `m·G`, which makes ciphertexts additively homomorphic:
//! adding two ciphertexts point-wise yields an encryption of the sum of their plaintexts.
//! Recovering `m` afterwards requires a bounded discrete log (see [`DiscreteLog`]).

use crate::*;
use ark_ff::Zero;
use rand::{CryptoRng, RngCore};
use tracing::debug;

/// An election encryption keypair.
///
/// Only the public half is ever placed in a transaction.
#[derive(Clone)]
pub struct KeyPair {
    secret: Scalar,
    pub public: Point,
}

impl KeyPair {
    /// Generate a fresh keypair with a secret in `[1, l)`
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = random_nonzero_scalar(rng);
        KeyPair::from_secret(secret)
    }

    /// Derive the keypair for a known secret
    pub fn from_secret(secret: Scalar) -> Self {
        let public = Point::generator().mul(&secret);
        KeyPair { secret, public }
    }

    pub fn secret(&self) -> &Scalar {
        &self.secret
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// An ElGamal ciphertext `(C1, C2) = (r·G, m·G + r·pk)`
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub c1: Point,
    pub c2: Point,
}

impl Ciphertext {
    /// The trivial encryption of zero (`r = 0`), the neutral element for [`homomorphic_add`]
    pub fn zero() -> Self {
        Ciphertext {
            c1: Point::identity(),
            c2: Point::identity(),
        }
    }

    /// Point-wise sum of two ciphertexts
    pub fn add(&self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: self.c1 + other.c1,
            c2: self.c2 + other.c2,
        }
    }

    /// Point-wise difference, undoing an earlier [`Ciphertext::add`]
    pub fn sub(&self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: self.c1 - other.c1,
            c2: self.c2 - other.c2,
        }
    }

    /// Flatten to `[c1x, c1y, c2x, c2y]`
    pub fn to_field_elements(&self) -> [Fq; 4] {
        [self.c1.x(), self.c1.y(), self.c2.x(), self.c2.y()]
    }
}

/// Encrypt `message` under `public` with the caller-supplied randomness `r`.
///
/// Every call must use a fresh `r`; reusing it across ciphertexts leaks plaintext
/// differences. Prefer [`encrypt_random`] unless the randomness must be retained.
pub fn encrypt(message: u64, public: &Point, r: &Scalar) -> Ciphertext {
    let generator = Point::generator();
    let c1 = generator.mul(r);
    let c2 = generator.mul_u64(message) + public.mul(r);
    Ciphertext { c1, c2 }
}

/// Encrypt `message` with freshly sampled non-zero randomness
pub fn encrypt_random<R: RngCore + CryptoRng>(
    message: u64,
    public: &Point,
    rng: &mut R,
) -> Ciphertext {
    let r = random_nonzero_scalar(rng);
    encrypt(message, public, &r)
}

/// Strip the mask and return `m·G = C2 - sk·C1`
pub fn decrypt_to_point(ciphertext: &Ciphertext, secret: &Scalar) -> Point {
    ciphertext.c2 - ciphertext.c1.mul(secret)
}

/// Fully decrypt a ciphertext, recovering the plaintext with the given discrete-log strategy
pub fn decrypt<D: DiscreteLog>(
    ciphertext: &Ciphertext,
    secret: &Scalar,
    solver: &D,
) -> Result<u64, Error> {
    solver.solve(&decrypt_to_point(ciphertext, secret))
}

/// Add a non-empty list of ciphertexts
pub fn homomorphic_add(ciphertexts: &[Ciphertext]) -> Result<Ciphertext, Error> {
    let (first, rest) = ciphertexts
        .split_first()
        .ok_or(Error::EmptyCiphertextList)?;
    Ok(rest.iter().fold(*first, |acc, ct| acc.add(ct)))
}

/// Column-wise sum of ballot ciphertext vectors.
///
/// With no ballots every slot is [`Ciphertext::zero`].
pub fn aggregate_votes(
    ballots: &[Vec<Ciphertext>],
    num_candidates: usize,
) -> Result<Vec<Ciphertext>, Error> {
    let mut totals = vec![Ciphertext::zero(); num_candidates];
    for ballot in ballots {
        if ballot.len() != num_candidates {
            return Err(Error::WrongLength {
                what: "ballot ciphertext vector",
                expected: num_candidates,
                found: ballot.len(),
            });
        }
        for (total, ct) in totals.iter_mut().zip(ballot) {
            *total = total.add(ct);
        }
    }

    debug!(
        ballots = ballots.len(),
        num_candidates, "aggregated encrypted ballots"
    );

    Ok(totals)
}

/// Encrypt a one-hot vote: `1` in slot `candidate_id`, `0` elsewhere, one randomness per slot
pub fn encrypt_vote_onehot(
    candidate_id: u64,
    num_candidates: usize,
    public: &Point,
    randomness: &[Scalar],
) -> Result<Vec<Ciphertext>, Error> {
    if candidate_id >= num_candidates as u64 {
        return Err(Error::CandidateOutOfRange {
            candidate: candidate_id,
            num_candidates,
        });
    }
    if randomness.len() != num_candidates {
        return Err(Error::WrongLength {
            what: "ballot randomness",
            expected: num_candidates,
            found: randomness.len(),
        });
    }

    Ok(randomness
        .iter()
        .enumerate()
        .map(|(slot, r)| {
            let message = (slot as u64 == candidate_id) as u64;
            encrypt(message, public, r)
        })
        .collect())
}

/// Aggregate the ballots and decrypt each column, returning per-candidate totals
pub fn homomorphic_tally<D: DiscreteLog>(
    ballots: &[Vec<Ciphertext>],
    num_candidates: usize,
    secret: &Scalar,
    solver: &D,
) -> Result<Vec<u64>, Error> {
    if secret.is_zero() {
        return Err(Error::InvalidScalar("secret key must be non-zero".to_string()));
    }

    aggregate_votes(ballots, num_candidates)?
        .iter()
        .map(|total| decrypt(total, secret, solver))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keypair() -> KeyPair {
        KeyPair::from_secret(Scalar::from(0x5eed_u64))
    }

    #[test]
    fn encrypt_decrypt() {
        let mut rng = rand::thread_rng();
        let keys = KeyPair::generate(&mut rng);
        let solver = BabyStepGiantStep::new(100);

        for m in [0u64, 1, 42, 100] {
            let ct = encrypt_random(m, &keys.public, &mut rng);
            assert_eq!(decrypt(&ct, keys.secret(), &solver).unwrap(), m);
            assert_eq!(
                decrypt_to_point(&ct, keys.secret()),
                Point::generator().mul_u64(m)
            );
        }
    }

    #[test]
    fn fresh_randomness_gives_distinct_ciphertexts() {
        let mut rng = rand::thread_rng();
        let keys = KeyPair::generate(&mut rng);
        let a = encrypt_random(1, &keys.public, &mut rng);
        let b = encrypt_random(1, &keys.public, &mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_add_is_an_error() {
        assert!(matches!(
            homomorphic_add(&[]),
            Err(Error::EmptyCiphertextList)
        ));
    }

    #[test]
    fn onehot_rejects_out_of_range() {
        let keys = keypair();
        let r = vec![Scalar::from(1u64); 3];
        assert!(matches!(
            encrypt_vote_onehot(3, 3, &keys.public, &r),
            Err(Error::CandidateOutOfRange {
                candidate: 3,
                num_candidates: 3
            })
        ));
        assert!(encrypt_vote_onehot(0, 3, &keys.public, &r[..2]).is_err());
    }

    #[test]
    fn tally_of_onehot_votes() {
        let mut rng = rand::thread_rng();
        let keys = KeyPair::generate(&mut rng);
        let choices = [0u64, 1, 0, 2, 0];

        let ballots: Vec<Vec<Ciphertext>> = choices
            .iter()
            .map(|c| {
                let r: Vec<Scalar> = (0..3).map(|_| random_nonzero_scalar(&mut rng)).collect();
                encrypt_vote_onehot(*c, 3, &keys.public, &r).unwrap()
            })
            .collect();

        let solver = LookupTable::new(10);
        let totals = homomorphic_tally(&ballots, 3, keys.secret(), &solver).unwrap();
        assert_eq!(totals, vec![3, 1, 1]);
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        let totals = aggregate_votes(&[], 4).unwrap();
        assert_eq!(totals, vec![Ciphertext::zero(); 4]);

        let keys = keypair();
        let solver = BabyStepGiantStep::new(10);
        assert_eq!(
            homomorphic_tally(&[], 4, keys.secret(), &solver).unwrap(),
            vec![0, 0, 0, 0]
        );
    }

    #[test]
    fn aggregate_rejects_ragged_ballots() {
        let keys = keypair();
        let r = vec![Scalar::from(9u64); 2];
        let ballot = encrypt_vote_onehot(1, 2, &keys.public, &r).unwrap();
        assert!(matches!(
            aggregate_votes(&[ballot], 3),
            Err(Error::WrongLength { expected: 3, found: 2, .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn addition_is_homomorphic(a in 0u64..200, b in 0u64..200, r1 in 1u64.., r2 in 1u64..) {
            let keys = keypair();
            let ca = encrypt(a, &keys.public, &Scalar::from(r1));
            let cb = encrypt(b, &keys.public, &Scalar::from(r2));
            let sum = homomorphic_add(&[ca, cb]).unwrap();

            let solver = BabyStepGiantStep::new(400);
            prop_assert_eq!(decrypt(&sum, keys.secret(), &solver).unwrap(), a + b);
        }
    }
}
