use crate::*;
use ed25519_dalek::VerifyingKey as PublicKey;

/// Transaction 4: VotingEnd
#[derive(Serialize, Deserialize, Clone)]
pub struct VotingEndTransaction {
    pub id: Identifier,
    pub election: Identifier,
    #[serde(with = "EdPublicKeyHex")]
    pub authority_public_key: PublicKey,
}

impl VotingEndTransaction {
    /// Create a new VotingEndTransaction closing the ballot box
    pub fn new(election: Identifier, authority_public_key: PublicKey) -> Self {
        VotingEndTransaction {
            id: Identifier::new(election, TransactionType::VotingEnd, None),
            election,
            authority_public_key,
        }
    }
}

impl Signable for VotingEndTransaction {
    fn id(&self) -> Identifier {
        self.id
    }

    fn public(&self) -> Option<PublicKey> {
        Some(self.authority_public_key)
    }

    fn inputs(&self) -> Vec<Identifier> {
        vec![self.election]
    }

    /// Validate the transaction
    ///
    /// The validation does the following:
    ///  - Validates that this transaction has been signed by a valid election authority
    ///  - Validates that voting is currently open
    fn validate_tx<S: Store>(
        &self,
        store: &S,
        state: Option<&ElectionState>,
    ) -> Result<(), ValidationError> {
        let election = store.get_election(self.election)?;
        validate_authority_tx(&election, self.id, &self.authority_public_key, state, Phase::Active)
    }
}

/// Shared checks for the authority's phase-change transactions
pub(crate) fn validate_authority_tx(
    election: &ElectionTransaction,
    id: Identifier,
    authority_public_key: &PublicKey,
    state: Option<&ElectionState>,
    expected: Phase,
) -> Result<(), ValidationError> {
    // Validate the the election authority public key is the same
    if *authority_public_key != election.authority_public {
        return Err(ValidationError::AuthorityPublicKeyMismatch);
    }
    if id.election() != election.id {
        return Err(ValidationError::ElectionMismatch);
    }

    let state = state.ok_or(ValidationError::ElectionMismatch)?;
    state.require_phase(expected)
}
