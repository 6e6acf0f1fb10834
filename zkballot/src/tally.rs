use crate::*;
use ed25519_dalek::VerifyingKey as PublicKey;
use indexmap::IndexMap;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

/// A decrypted election result together with its correctness proof
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    /// Per-candidate totals, in ballot slot order
    pub results: Vec<u64>,

    /// Election public key the aggregate was decrypted under
    pub public_key: Point,

    /// Column-wise sum of every accepted ballot
    pub aggregate: Vec<Ciphertext>,

    /// `results[j]·G` for each candidate
    pub result_points: Vec<Point>,

    pub total_votes: u64,

    pub proof: ZkProof,
}

/// Aggregate `ballots`, decrypt each column and prove the decryption
pub fn tally_ballots<const N: usize, D, R>(
    proving_key: &CircuitProvingKey,
    keys: &KeyPair,
    ballots: &[Vec<Ciphertext>],
    solver: &D,
    rng: &mut R,
) -> Result<Tally, Error>
where
    D: DiscreteLog,
    R: RngCore + CryptoRng,
{
    let aggregate = aggregate_votes(ballots, N)?;
    let results = aggregate
        .iter()
        .map(|total| decrypt(total, keys.secret(), solver))
        .collect::<Result<Vec<u64>, Error>>()?;
    debug!(?results, "decrypted aggregate");

    let circuit = TallyCircuit::<N>::new(keys, &aggregate, &results)?;
    let signals = circuit
        .public_signals()
        .ok_or_else(|| Error::Synthesis("tally circuit is not fully assigned".to_string()))?;
    let proof = prove_tally(proving_key, circuit, rng)?;

    info!(
        candidates = N,
        ballots = ballots.len(),
        total_votes = signals.total_votes,
        "tallied election"
    );

    Ok(Tally {
        results,
        public_key: keys.public,
        aggregate,
        result_points: signals.result_points,
        total_votes: signals.total_votes,
        proof,
    })
}

impl Tally {
    pub fn num_candidates(&self) -> usize {
        self.results.len()
    }

    /// The public signals the tally proof must carry
    pub fn signals(&self) -> TallySignals {
        TallySignals {
            public_key: self.public_key,
            c1_totals: self.aggregate.iter().map(|ct| ct.c1).collect(),
            c2_totals: self.aggregate.iter().map(|ct| ct.c2).collect(),
            result_points: self.result_points.clone(),
            total_votes: self.total_votes,
        }
    }

    /// Check the claim against the ledger's own view of the election.
    ///
    /// Every comparison runs before the pairing check, so a mismatch is reported by slot.
    pub fn check(
        &self,
        verifying_key: &CircuitVerifyingKey,
        election_public: &Point,
        expected_aggregate: &[Ciphertext],
        ballots_cast: u64,
    ) -> Result<(), ValidationError> {
        let n = expected_aggregate.len();
        for found in [
            self.results.len(),
            self.aggregate.len(),
            self.result_points.len(),
        ] {
            if found != n {
                return Err(ValidationError::CandidateCountMismatch { expected: n, found });
            }
        }

        if self.public_key != *election_public {
            return Err(ValidationError::EncryptionKeyMismatch);
        }

        if let Some(slot) = self
            .aggregate
            .iter()
            .zip(expected_aggregate)
            .position(|(claimed, expected)| claimed != expected)
        {
            return Err(ValidationError::AggregateMismatch(slot));
        }

        let claimed = self
            .results
            .iter()
            .try_fold(0u64, |acc, r| acc.checked_add(*r))
            .ok_or(ValidationError::TallySumMismatch {
                claimed: u64::MAX,
                total: self.total_votes,
            })?;
        if claimed != self.total_votes {
            return Err(ValidationError::TallySumMismatch {
                claimed,
                total: self.total_votes,
            });
        }
        if self.total_votes != ballots_cast {
            return Err(ValidationError::BallotCountMismatch {
                claimed: self.total_votes,
                cast: ballots_cast,
            });
        }

        let generator = Point::generator();
        if let Some(slot) = self
            .results
            .iter()
            .zip(&self.result_points)
            .position(|(m, point)| generator.mul_u64(*m) != *point)
        {
            return Err(ValidationError::ResultPointMismatch(slot));
        }

        if !verify_tally_proof(verifying_key, &self.proof, &self.signals()) {
            warn!(total_votes = self.total_votes, "tally proof rejected");
            return Err(ValidationError::TallyProofRejected);
        }

        Ok(())
    }

    /// Candidate name to total, in ballot order
    pub fn totals(&self, candidates: &[String]) -> IndexMap<String, u64> {
        candidates
            .iter()
            .cloned()
            .zip(self.results.iter().copied())
            .collect()
    }

    /// Every candidate sharing the highest total
    pub fn winners(&self, candidates: &[String]) -> Vec<String> {
        let best = match self.results.iter().max() {
            Some(best) if *best > 0 => *best,
            _ => return vec![],
        };
        candidates
            .iter()
            .zip(&self.results)
            .filter(|(_, total)| **total == best)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Transaction 5: Tally
///
/// Published by the election authority once voting has ended.
#[derive(Serialize, Deserialize, Clone)]
pub struct TallyTransaction {
    pub id: Identifier,
    pub election: Identifier,

    #[serde(with = "EdPublicKeyHex")]
    pub authority_public_key: PublicKey,

    pub tally: Tally,
}

impl TallyTransaction {
    pub fn new(election: Identifier, authority_public_key: PublicKey, tally: Tally) -> Self {
        TallyTransaction {
            id: Identifier::new(election, TransactionType::Tally, None),
            election,
            authority_public_key,
            tally,
        }
    }
}

impl Signable for TallyTransaction {
    fn id(&self) -> Identifier {
        self.id
    }

    fn public(&self) -> Option<PublicKey> {
        Some(self.authority_public_key)
    }

    fn inputs(&self) -> Vec<Identifier> {
        vec![self.election]
    }

    /// Validate the tally transaction
    ///
    /// The validation does the following:
    ///  - Validates that the authority signed it and voting has ended
    ///  - Validates the claimed aggregate against the ledger's running aggregate
    ///  - Validates sums, result points and finally the tally proof
    fn validate_tx<S: Store>(
        &self,
        store: &S,
        state: Option<&ElectionState>,
    ) -> Result<(), ValidationError> {
        let election = store.get_election(self.election)?;
        validate_authority_tx(
            &election,
            self.id,
            &self.authority_public_key,
            state,
            Phase::Ended,
        )?;
        let state = state.ok_or(ValidationError::ElectionMismatch)?;

        self.tally.check(
            &election.tally_verifying_key,
            &election.encryption_public,
            state.aggregate(),
            state.ballots_cast(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballots(keys: &KeyPair, choices: &[u64], n: usize) -> Vec<Vec<Ciphertext>> {
        let mut rng = rand::thread_rng();
        choices
            .iter()
            .map(|c| {
                let r: Vec<Scalar> = (0..n).map(|_| random_nonzero_scalar(&mut rng)).collect();
                encrypt_vote_onehot(*c, n, &keys.public, &r).unwrap()
            })
            .collect()
    }

    #[test]
    fn tally_and_check() {
        let mut rng = rand::thread_rng();
        let circuit_keys = setup_tally::<3, _>(&mut rng).unwrap();
        let keys = KeyPair::generate(&mut rng);
        let cast = ballots(&keys, &[0, 1, 0], 3);
        let solver = BabyStepGiantStep::new(10);

        let tally =
            tally_ballots::<3, _, _>(&circuit_keys.proving, &keys, &cast, &solver, &mut rng).unwrap();
        assert_eq!(tally.results, vec![2, 1, 0]);
        assert_eq!(tally.total_votes, 3);

        let expected = aggregate_votes(&cast, 3).unwrap();
        tally
            .check(&circuit_keys.verifying, &keys.public, &expected, 3)
            .unwrap();

        let names: Vec<String> = vec!["Alice".into(), "Bob".into(), "Carol".into()];
        let totals = tally.totals(&names);
        assert_eq!(totals.get("Alice"), Some(&2));
        assert_eq!(totals.keys().last().map(String::as_str), Some("Carol"));
        assert_eq!(tally.winners(&names), vec!["Alice".to_string()]);
    }

    #[test]
    fn tampered_claims_are_pinpointed() {
        let mut rng = rand::thread_rng();
        let circuit_keys = setup_tally::<3, _>(&mut rng).unwrap();
        let keys = KeyPair::generate(&mut rng);
        let cast = ballots(&keys, &[0, 1, 0], 3);
        let expected = aggregate_votes(&cast, 3).unwrap();
        let solver = LookupTable::new(10);
        let tally =
            tally_ballots::<3, _, _>(&circuit_keys.proving, &keys, &cast, &solver, &mut rng).unwrap();
        let vk = &circuit_keys.verifying;

        // Same total, different distribution
        let mut forged = tally.clone();
        forged.results = vec![1, 1, 1];
        assert!(matches!(
            forged.check(vk, &keys.public, &expected, 3),
            Err(ValidationError::ResultPointMismatch(0))
        ));

        // Distribution and points consistent with each other, but not with the proof
        let generator = Point::generator();
        forged.result_points = forged.results.iter().map(|m| generator.mul_u64(*m)).collect();
        assert!(matches!(
            forged.check(vk, &keys.public, &expected, 3),
            Err(ValidationError::TallyProofRejected)
        ));

        let mut inflated = tally.clone();
        inflated.results = vec![3, 1, 0];
        assert!(matches!(
            inflated.check(vk, &keys.public, &expected, 3),
            Err(ValidationError::TallySumMismatch { claimed: 4, total: 3 })
        ));

        assert!(matches!(
            tally.check(vk, &keys.public, &expected, 4),
            Err(ValidationError::BallotCountMismatch { claimed: 3, cast: 4 })
        ));

        let mut swapped = expected.clone();
        swapped.swap(1, 2);
        assert!(matches!(
            tally.check(vk, &keys.public, &swapped, 3),
            Err(ValidationError::AggregateMismatch(1))
        ));

        let other = KeyPair::generate(&mut rng);
        assert!(matches!(
            tally.check(vk, &other.public, &expected, 3),
            Err(ValidationError::EncryptionKeyMismatch)
        ));

        assert!(matches!(
            tally.check(vk, &keys.public, &expected[..2], 3),
            Err(ValidationError::CandidateCountMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn proof_binds_every_public_signal() {
        let mut rng = rand::thread_rng();
        let circuit_keys = setup_tally::<3, _>(&mut rng).unwrap();
        let keys = KeyPair::generate(&mut rng);
        let cast = ballots(&keys, &[2, 1, 2, 2], 3);
        let solver = LookupTable::new(10);
        let tally =
            tally_ballots::<3, _, _>(&circuit_keys.proving, &keys, &cast, &solver, &mut rng).unwrap();
        let vk = &circuit_keys.verifying;

        let signals = tally.signals();
        assert!(verify_tally_proof(vk, &tally.proof, &signals));

        // Off-by-one vote totals
        for total_votes in [signals.total_votes - 1, signals.total_votes + 1] {
            let mut shifted = signals.clone();
            shifted.total_votes = total_votes;
            assert!(!verify_tally_proof(vk, &tally.proof, &shifted));
        }

        // One result point moved to a neighbouring multiple of G
        for candidate in 0..3 {
            let mut moved = signals.clone();
            moved.result_points[candidate] = moved.result_points[candidate] + Point::generator();
            assert!(!verify_tally_proof(vk, &tally.proof, &moved));
        }

        // Any single coordinate nudged by one
        let fields = signals.to_field_elements();
        for i in 0..fields.len() {
            let mut nudged = fields.clone();
            nudged[i] += Fq::from(1u64);
            let nudged: Vec<PublicSignal> = nudged.into_iter().map(PublicSignal::from).collect();
            assert!(!verify(vk, &nudged, &tally.proof), "signal {} was not bound", i);
        }
    }

    #[test]
    fn empty_election_has_no_winner() {
        let mut rng = rand::thread_rng();
        let circuit_keys = setup_tally::<2, _>(&mut rng).unwrap();
        let keys = KeyPair::generate(&mut rng);
        let solver = LookupTable::new(4);

        let tally =
            tally_ballots::<2, _, _>(&circuit_keys.proving, &keys, &[], &solver, &mut rng).unwrap();
        assert_eq!(tally.results, vec![0, 0]);
        tally
            .check(&circuit_keys.verifying, &keys.public, &[Ciphertext::zero(); 2], 0)
            .unwrap();
        assert!(tally.winners(&["A".to_string(), "B".to_string()]).is_empty());
    }
}
