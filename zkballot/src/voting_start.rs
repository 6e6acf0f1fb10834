use crate::*;
use ed25519_dalek::VerifyingKey as PublicKey;

/// Transaction 2: VotingStart
#[derive(Serialize, Deserialize, Clone)]
pub struct VotingStartTransaction {
    pub id: Identifier,
    pub election: Identifier,
    #[serde(with = "EdPublicKeyHex")]
    pub authority_public_key: PublicKey,
}

impl VotingStartTransaction {
    /// Create a new VotingStartTransaction opening the ballot box
    pub fn new(election: Identifier, authority_public_key: PublicKey) -> Self {
        VotingStartTransaction {
            id: Identifier::new(election, TransactionType::VotingStart, None),
            election,
            authority_public_key,
        }
    }
}

impl Signable for VotingStartTransaction {
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
    /// Only the election authority may open voting, and only once.
    fn validate_tx<S: Store>(
        &self,
        store: &S,
        state: Option<&ElectionState>,
    ) -> Result<(), ValidationError> {
        let election = store.get_election(self.election)?;
        validate_authority_tx(&election, self.id, &self.authority_public_key, state, Phase::Created)
    }
}
