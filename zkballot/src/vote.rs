use crate::*;
use ed25519_dalek::VerifyingKey as PublicKey;

/// Transaction 3: Vote
///
/// Signed by a registered voter key. The identifier is derived from that key, so a voter can
/// only ever occupy one vote slot per election.
#[derive(Serialize, Deserialize, Clone)]
pub struct VoteTransaction {
    pub id: Identifier,
    pub election: Identifier,

    #[serde(with = "EdPublicKeyHex")]
    pub voter_public: PublicKey,

    pub ballot: Ballot,
}

impl VoteTransaction {
    pub fn new(election: Identifier, voter_public: PublicKey, ballot: Ballot) -> Self {
        VoteTransaction {
            id: Identifier::new(
                election,
                TransactionType::Vote,
                Some(&voter_public.as_bytes()[..]),
            ),
            election,
            voter_public,
            ballot,
        }
    }
}

impl Signable for VoteTransaction {
    fn id(&self) -> Identifier {
        self.id
    }

    fn public(&self) -> Option<PublicKey> {
        Some(self.voter_public)
    }

    fn inputs(&self) -> Vec<Identifier> {
        vec![self.election]
    }

    /// Validate the vote transaction
    ///
    /// The validation does the following:
    ///  - Validates that voting is open
    ///  - Validates that the voter is registered and has not voted
    ///  - Validates that the commitment has not been seen before
    ///  - Validates the ballot structure and its vote proof
    fn validate_tx<S: Store>(
        &self,
        store: &S,
        state: Option<&ElectionState>,
    ) -> Result<(), ValidationError> {
        let election = store.get_election(self.election)?;
        let state = state.ok_or(ValidationError::ElectionMismatch)?;

        if self.id.election() != self.election || state.election != election.id {
            return Err(ValidationError::ElectionMismatch);
        }
        let expected_id = Identifier::new(
            self.election,
            TransactionType::Vote,
            Some(&self.voter_public.as_bytes()[..]),
        );
        if self.id != expected_id {
            return Err(ValidationError::MismatchedTransactionType);
        }

        state.require_phase(Phase::Active)?;

        if !election.is_registered(&self.voter_public) {
            return Err(ValidationError::VoterNotRegistered);
        }
        if state.has_voted(&self.voter_public) {
            return Err(ValidationError::AlreadyVoted);
        }
        if state.has_commitment(&self.ballot.commitment) {
            return Err(ValidationError::DuplicateCommitment);
        }

        self.ballot.verify(
            &election.vote_verifying_key,
            election.num_candidates(),
            &election.encryption_public,
        )
    }
}
