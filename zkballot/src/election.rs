use crate::*;
use ed25519_dalek::VerifyingKey as PublicKey;
use std::collections::HashSet;
use std::fmt;

/// Transaction 1: Election
#[derive(Serialize, Deserialize, Clone)]
pub struct ElectionTransaction {
    pub id: Identifier,

    /// Election Authority Public Key
    ///
    /// The election authority's public key should be posted in a trusted and well-known location.
    #[serde(with = "EdPublicKeyHex")]
    pub authority_public: PublicKey,

    /// Candidate names, in ballot slot order
    pub candidates: Vec<String>,

    /// ElGamal public key ballots are encrypted to
    pub encryption_public: Point,

    /// Registered voter signing keys
    #[serde(with = "ed_public_key_vec_hex")]
    pub voters: Vec<PublicKey>,

    /// Upper bound on any candidate's total, used to bound decryption
    pub max_votes: u64,

    #[serde(with = "VerifyingKeyHex")]
    pub vote_verifying_key: CircuitVerifyingKey,

    #[serde(with = "VerifyingKeyHex")]
    pub tally_verifying_key: CircuitVerifyingKey,
}

impl ElectionTransaction {
    /// Create a new ElectionTransaction
    pub fn new(
        authority_public: PublicKey,
        candidates: Vec<String>,
        encryption_public: Point,
        vote_verifying_key: CircuitVerifyingKey,
        tally_verifying_key: CircuitVerifyingKey,
    ) -> Self {
        ElectionTransaction {
            id: Identifier::new_for_election(),
            authority_public,
            candidates,
            encryption_public,
            voters: vec![],
            max_votes: 0,
            vote_verifying_key,
            tally_verifying_key,
        }
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_registered(&self, voter: &PublicKey) -> bool {
        self.voters.iter().any(|v| v == voter)
    }

    /// Discrete-log solver covering every total this election can produce
    pub fn solver(&self) -> BabyStepGiantStep {
        BabyStepGiantStep::new(self.max_votes)
    }
}

impl Signable for ElectionTransaction {
    fn id(&self) -> Identifier {
        self.id
    }

    fn public(&self) -> Option<PublicKey> {
        Some(self.authority_public)
    }

    fn inputs(&self) -> Vec<Identifier> {
        // No inputs requires for election
        vec![]
    }

    /// Validate the election transaction
    fn validate_tx<S: Store>(
        &self,
        store: &S,
        state: Option<&ElectionState>,
    ) -> Result<(), ValidationError> {
        if state.is_some() || store.get_transaction(self.id).is_some() {
            return Err(ValidationError::ElectionAlreadyExists);
        }
        if self.id != self.id.election() {
            return Err(ValidationError::MismatchedTransactionType);
        }

        if self.candidates.is_empty() {
            return Err(ValidationError::NoCandidates);
        }
        if self.candidates.len() > MAX_CANDIDATES {
            return Err(Error::UnsupportedCandidateCount(self.candidates.len()).into());
        }

        if self.voters.is_empty() {
            return Err(ValidationError::NoVoters);
        }
        if self.max_votes < self.voters.len() as u64 {
            return Err(ValidationError::InvalidMaxVotes {
                max_votes: self.max_votes,
                voters: self.voters.len(),
            });
        }

        if self.encryption_public.is_identity() {
            return Err(ValidationError::WeakEncryptionKey);
        }

        // The verifying keys must match the circuit shape for this candidate count
        let vote_inputs = self.vote_verifying_key.num_public_inputs();
        if vote_inputs != VOTE_PUBLIC_INPUTS {
            return Err(Error::WrongLength {
                what: "vote verifying key inputs",
                expected: VOTE_PUBLIC_INPUTS,
                found: vote_inputs,
            }
            .into());
        }
        let tally_inputs = self.tally_verifying_key.num_public_inputs();
        if tally_inputs != tally_public_inputs(self.num_candidates()) {
            return Err(Error::WrongLength {
                what: "tally verifying key inputs",
                expected: tally_public_inputs(self.num_candidates()),
                found: tally_inputs,
            }
            .into());
        }

        Ok(())
    }
}

/// Lifecycle phase of an election
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Created,
    Active,
    Ended,
    Tallied,
}

impl Phase {
    /// The only phase this one may move to
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Created => Some(Phase::Active),
            Phase::Active => Some(Phase::Ended),
            Phase::Ended => Some(Phase::Tallied),
            Phase::Tallied => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Phase::Created => "created",
            Phase::Active => "active",
            Phase::Ended => "ended",
            Phase::Tallied => "tallied",
        };
        write!(f, "{}", name)
    }
}

/// Ledger-side state of one election
#[derive(Clone, Debug)]
pub struct ElectionState {
    pub election: Identifier,
    phase: Phase,
    pub num_candidates: usize,
    voted: HashSet<[u8; 32]>,
    commitments: HashSet<[u8; 32]>,
    aggregate: Vec<Ciphertext>,
    ballots_cast: u64,
    results: Option<Vec<u64>>,
}

impl ElectionState {
    pub fn new(election: &ElectionTransaction) -> Self {
        ElectionState {
            election: election.id,
            phase: Phase::Created,
            num_candidates: election.num_candidates(),
            voted: HashSet::new(),
            commitments: HashSet::new(),
            aggregate: vec![Ciphertext::zero(); election.num_candidates()],
            ballots_cast: 0,
            results: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Fail unless the election is in `expected`
    pub fn require_phase(&self, expected: Phase) -> Result<(), ValidationError> {
        if self.phase != expected {
            return Err(ValidationError::InvalidPhase {
                expected,
                found: self.phase,
            });
        }
        Ok(())
    }

    /// Advance along `Created → Active → Ended → Tallied`
    pub fn transition(&mut self, next: Phase) -> Result<(), ValidationError> {
        if self.phase.next() != Some(next) {
            return Err(ValidationError::InvalidPhaseTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    pub fn has_voted(&self, voter: &PublicKey) -> bool {
        self.voted.contains(voter.as_bytes())
    }

    pub fn has_commitment(&self, commitment: &Fq) -> bool {
        self.commitments.contains(&fq_to_bytes(commitment))
    }

    /// Fold an accepted ballot into the running aggregate
    pub fn record_ballot(&mut self, voter: &PublicKey, ballot: &Ballot) -> Result<(), ValidationError> {
        self.require_phase(Phase::Active)?;
        if ballot.ciphertexts.len() != self.num_candidates {
            return Err(ValidationError::CandidateCountMismatch {
                expected: self.num_candidates,
                found: ballot.ciphertexts.len(),
            });
        }

        self.voted.insert(*voter.as_bytes());
        self.commitments.insert(fq_to_bytes(&ballot.commitment));
        for (total, ct) in self.aggregate.iter_mut().zip(&ballot.ciphertexts) {
            *total = total.add(ct);
        }
        self.ballots_cast += 1;
        Ok(())
    }

    /// Column-wise sum of every accepted ballot
    pub fn aggregate(&self) -> &[Ciphertext] {
        &self.aggregate
    }

    pub fn ballots_cast(&self) -> u64 {
        self.ballots_cast
    }

    pub fn record_results(&mut self, results: Vec<u64>) -> Result<(), ValidationError> {
        self.transition(Phase::Tallied)?;
        self.results = Some(results);
        Ok(())
    }

    pub fn results(&self) -> Option<&[u64]> {
        self.results.as_deref()
    }

    /// Undo a `transition` or `record_results` that moved the election out of `previous`
    pub(crate) fn rollback_phase(&mut self, previous: Phase) {
        if self.phase == Phase::Tallied {
            self.results = None;
        }
        self.phase = previous;
    }

    /// Undo a `record_ballot`
    pub(crate) fn rollback_ballot(&mut self, voter: &PublicKey, ballot: &Ballot) {
        self.voted.remove(voter.as_bytes());
        self.commitments.remove(&fq_to_bytes(&ballot.commitment));
        for (total, ct) in self.aggregate.iter_mut().zip(&ballot.ciphertexts) {
            *total = total.sub(ct);
        }
        self.ballots_cast -= 1;
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn phases_only_move_forward() {
        assert_eq!(Phase::Created.next(), Some(Phase::Active));
        assert_eq!(Phase::Tallied.next(), None);
        assert_eq!(Phase::Ended.to_string(), "ended");
    }

    #[test]
    fn create_new_election() {
        let mut rng = rand::thread_rng();
        let store = MemStore::default();

        // Bad keypair
        let (bad_secret, _bad_public) = generate_keypair();

        // Create election authority public and private key
        let (authority_secret, authority_public) = generate_keypair();
        let (_voter_secret, voter_public) = generate_keypair();

        let vote_keys = setup_vote::<2, _>(&mut rng).unwrap();
        let tally_keys = setup_tally::<2, _>(&mut rng).unwrap();
        let encryption = KeyPair::generate(&mut rng);

        let mut election = ElectionTransaction::new(
            authority_public,
            vec!["Alice".to_string(), "Bob".to_string()],
            encryption.public,
            vote_keys.verifying.clone(),
            tally_keys.verifying.clone(),
        );

        // Validation should fail without voters
        assert!(matches!(
            election.validate_tx(&store, None),
            Err(ValidationError::NoVoters)
        ));
        election.voters = vec![voter_public];

        // Validation should fail when max_votes cannot cover the registry
        assert!(matches!(
            election.validate_tx(&store, None),
            Err(ValidationError::InvalidMaxVotes { .. })
        ));
        election.max_votes = 10;
        assert_eq!(election.solver().max_value(), 10);

        // The election must sit at its own root identifier
        let mut misfiled = election.clone();
        misfiled.id = Identifier::new(election.id, TransactionType::Vote, Some(&b"misfiled"[..]));
        assert!(matches!(
            misfiled.validate_tx(&store, None),
            Err(ValidationError::MismatchedTransactionType)
        ));

        // Swapped verifying keys do not match the circuit shapes
        let mut swapped = election.clone();
        swapped.vote_verifying_key = tally_keys.verifying.clone();
        assert!(swapped.validate_tx(&store, None).is_err());

        // Identity encryption key is rejected
        let mut weak = election.clone();
        weak.encryption_public = Point::identity();
        assert!(matches!(
            weak.validate_tx(&store, None),
            Err(ValidationError::WeakEncryptionKey)
        ));

        // Signing with wrong key should fail
        assert!(Signed::sign(&bad_secret, election.clone()).is_err());

        // Check inputs
        assert!(election.inputs().is_empty());

        // Finalize election transaction by signing it
        let election = Signed::sign(&authority_secret, election).unwrap();
        let election_generic = SignedTransaction::from(election.clone());
        assert!(election_generic.transaction_type() == TransactionType::Election);
        assert_eq!(
            format!("{}", election_generic.transaction_type()),
            "election"
        );
        assert!(election_generic.id() == election.id);

        // Validate the election transaction
        election.verify_signature().unwrap();
        election.validate(&store, None).unwrap();

        // An election cannot be created twice
        let state = ElectionState::new(&election);
        assert!(matches!(
            election.validate(&store, Some(&state)),
            Err(ValidationError::ElectionAlreadyExists)
        ));
    }

    #[test]
    fn state_machine_rejects_skips() {
        let mut state = ElectionState {
            election: Identifier::new_for_election(),
            phase: Phase::Created,
            num_candidates: 2,
            voted: HashSet::new(),
            commitments: HashSet::new(),
            aggregate: vec![Ciphertext::zero(); 2],
            ballots_cast: 0,
            results: None,
        };

        assert!(matches!(
            state.transition(Phase::Ended),
            Err(ValidationError::InvalidPhaseTransition {
                from: Phase::Created,
                to: Phase::Ended
            })
        ));
        state.transition(Phase::Active).unwrap();
        assert!(state.transition(Phase::Active).is_err());
        assert!(matches!(
            state.require_phase(Phase::Ended),
            Err(ValidationError::InvalidPhase {
                expected: Phase::Ended,
                found: Phase::Active
            })
        ));
        assert!(state.record_results(vec![0, 0]).is_err());

        state.transition(Phase::Ended).unwrap();
        state.record_results(vec![1, 2]).unwrap();
        assert_eq!(state.phase(), Phase::Tallied);
        assert_eq!(state.results(), Some(&[1u64, 2][..]));
        assert!(state.transition(Phase::Created).is_err());

        state.rollback_phase(Phase::Ended);
        assert_eq!(state.phase(), Phase::Ended);
        assert_eq!(state.results(), None);
    }
}
