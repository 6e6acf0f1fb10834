use crate::*;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};

/// An encrypted ballot as submitted to the ledger
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub ciphertexts: Vec<Ciphertext>,

    #[serde(with = "FieldHex")]
    pub commitment: Fq,

    #[serde(with = "FieldHex")]
    pub ciphertext_hash: Fq,

    pub proof: ZkProof,
}

/// What the voter keeps to later recognise (and re-derive) their ballot.
///
/// Never leaves the voter's device.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BallotSecret {
    pub candidate_id: u64,

    #[serde(with = "FieldHex")]
    pub salt: Fq,

    #[serde(with = "scalar_vec_hex")]
    pub randomness: Vec<Scalar>,
}

impl BallotSecret {
    /// Re-encrypt the one-hot vote from the retained randomness
    pub fn ciphertexts(&self, election_public: &Point) -> Result<Vec<Ciphertext>, Error> {
        encrypt_vote_onehot(
            self.candidate_id,
            self.randomness.len(),
            election_public,
            &self.randomness,
        )
    }

    /// Check that `ballot` is the ballot this secret produced
    pub fn opens(&self, ballot: &Ballot, election_public: &Point) -> bool {
        verify_commitment(self.candidate_id, &self.salt, &ballot.commitment)
            && self
                .ciphertexts(election_public)
                .map(|cts| cts == ballot.ciphertexts)
                .unwrap_or(false)
    }
}

/// Encrypt a vote for `candidate_id` among `N` candidates and prove it is well formed
pub fn cast_ballot<const N: usize, R: RngCore + CryptoRng>(
    proving_key: &CircuitProvingKey,
    election_public: &Point,
    candidate_id: u64,
    rng: &mut R,
) -> Result<(Ballot, BallotSecret), Error> {
    let salt = random_salt(rng);
    let randomness: [Scalar; N] = [(); N].map(|_| random_nonzero_scalar(rng));

    let circuit = VoteCircuit::<N>::new(*election_public, candidate_id, salt, randomness)?;
    let (commitment, ciphertext_hash, ciphertexts) =
        match (circuit.commitment, circuit.ciphertext_hash, circuit.ciphertexts) {
            (Some(commitment), Some(hash), Some(ciphertexts)) => {
                (commitment, hash, ciphertexts.to_vec())
            }
            _ => return Err(Error::Synthesis("vote circuit is not fully assigned".to_string())),
        };

    let proof = prove_vote(proving_key, circuit, rng)?;
    info!(candidates = N, commitment = %fq_to_hex(&commitment), "cast ballot");

    let ballot = Ballot {
        ciphertexts,
        commitment,
        ciphertext_hash,
        proof,
    };
    let secret = BallotSecret {
        candidate_id,
        salt,
        randomness: randomness.to_vec(),
    };
    Ok((ballot, secret))
}

impl Ballot {
    pub fn num_candidates(&self) -> usize {
        self.ciphertexts.len()
    }

    /// The public signals a valid proof for this ballot must carry
    pub fn signals(&self, election_public: &Point) -> VoteSignals {
        VoteSignals {
            commitment: self.commitment,
            ciphertext_hash: self.ciphertext_hash,
            public_key: *election_public,
        }
    }

    /// Cheap structural checks, run before any pairing
    pub fn check_consistency(
        &self,
        num_candidates: usize,
        election_public: &Point,
    ) -> Result<(), ValidationError> {
        if self.ciphertexts.len() != num_candidates {
            return Err(ValidationError::CandidateCountMismatch {
                expected: num_candidates,
                found: self.ciphertexts.len(),
            });
        }

        if compute_ciphertext_hash(&self.ciphertexts)? != self.ciphertext_hash {
            return Err(ValidationError::CiphertextHashMismatch);
        }

        if self.proof.public_signals != self.signals(election_public).to_public_signals() {
            return Err(ValidationError::PublicSignalsMismatch);
        }

        Ok(())
    }

    /// Full ballot validation: structure first, then the vote proof
    pub fn verify(
        &self,
        verifying_key: &CircuitVerifyingKey,
        num_candidates: usize,
        election_public: &Point,
    ) -> Result<(), ValidationError> {
        self.check_consistency(num_candidates, election_public)?;

        if !verify_vote_proof(verifying_key, &self.proof, &self.signals(election_public)) {
            return Err(ValidationError::VoteProofRejected);
        }

        debug!(commitment = %fq_to_hex(&self.commitment), "ballot verified");
        Ok(())
    }
}
