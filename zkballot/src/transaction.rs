use crate::*;
use ed25519_dalek::Signature;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey as PublicKey;
use ed25519_dalek::{Signer, Verifier};
use num_enum::TryFromPrimitive;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256, Sha512};
use std::convert::TryFrom;
use std::ops::Deref;
use std::str::FromStr;
use uuid::Uuid;

/// Implements the per-variant plumbing between `SignedTransaction` and `Signed<T>`
macro_rules! signed_transaction_variants {
    ($($variant:ident => $tx:ty),* $(,)?) => {
        /// A signed transaction
        #[derive(Serialize, Deserialize, Clone)]
        #[serde(tag = "type")]
        #[serde(rename_all = "snake_case")]
        pub enum SignedTransaction {
            $($variant(Signed<$tx>),)*
        }

        impl SignedTransaction {
            /// Get the transaction type
            pub fn transaction_type(&self) -> TransactionType {
                match self {
                    $(SignedTransaction::$variant(_) => TransactionType::$variant,)*
                }
            }

            /// Get the transaction ID
            pub fn id(&self) -> Identifier {
                match self {
                    $(SignedTransaction::$variant(signed) => signed.tx.id(),)*
                }
            }

            /// Get the transactions this one depends on
            pub fn inputs(&self) -> Vec<Identifier> {
                match self {
                    $(SignedTransaction::$variant(signed) => signed.inputs(),)*
                }
            }

            /// Verify the signature and validate against the store and election state
            pub fn validate<S: Store>(
                &self,
                store: &S,
                state: Option<&ElectionState>,
            ) -> Result<(), ValidationError> {
                match self {
                    $(SignedTransaction::$variant(signed) => signed.validate(store, state),)*
                }
            }
        }

        $(
            impl From<Signed<$tx>> for SignedTransaction {
                fn from(tx: Signed<$tx>) -> Self {
                    SignedTransaction::$variant(tx)
                }
            }

            impl TryFrom<SignedTransaction> for Signed<$tx> {
                type Error = ValidationError;

                fn try_from(tx: SignedTransaction) -> Result<Self, Self::Error> {
                    match tx {
                        SignedTransaction::$variant(tx) => Ok(tx),
                        _ => Err(ValidationError::MismatchedTransactionType),
                    }
                }
            }
        )*
    };
}

signed_transaction_variants! {
    Election => ElectionTransaction,
    VotingStart => VotingStartTransaction,
    Vote => VoteTransaction,
    VotingEnd => VotingEndTransaction,
    Tally => TallyTransaction,
}

impl SignedTransaction {
    /// Pack into bytes
    pub fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("zkballot: Unexpected error packing transaction")
    }

    /// Unpack from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // If it starts with `{` then it's JSON
        if bytes.first() == Some(&b'{') {
            Ok(serde_json::from_slice(bytes)?)
        } else {
            Ok(serde_cbor::from_slice(bytes)?)
        }
    }

    /// SHA-256 of the packed transaction, as recorded in vote events
    pub fn hash(&self) -> [u8; 32] {
        Sha256::digest(self.as_bytes()).into()
    }
}

/// This trait should be considered sealed and should not be implemented outside this crate
#[doc(hidden)]
pub trait Signable: Serialize {
    fn id(&self) -> Identifier;
    fn public(&self) -> Option<PublicKey>;
    fn inputs(&self) -> Vec<Identifier>;
    fn validate_tx<S: Store>(
        &self,
        store: &S,
        state: Option<&ElectionState>,
    ) -> Result<(), ValidationError>;

    fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(&self).expect("zkballot: Unexpected error serializing transaction")
    }
}

/// A generic signed transaction
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Signed<T: Signable + Serialize> {
    pub tx: T,

    #[serde(with = "EdSignatureHex")]
    pub sig: Signature,
}

impl<T: Signable + Serialize> Signed<T> {
    /// Sign a transaction, producing a Signed<T>
    pub fn sign(secret: &SigningKey, transaction: T) -> Result<Self, Error> {
        let public_key = secret.verifying_key();
        if let Some(tx_public) = transaction.public() {
            if public_key != tx_public {
                return Err(Error::MismatchedPublicKeys);
            }
        }

        let serialized = transaction.as_bytes();
        let signature = secret.sign(&serialized);

        Ok(Signed {
            tx: transaction,
            sig: signature,
        })
    }

    /// Verify the signature on a signed transaction
    pub fn verify_signature(&self) -> Result<(), ValidationError> {
        let serialized = self.tx.as_bytes();

        if let Some(tx_public) = self.tx.public() {
            Ok(tx_public.verify(&serialized, &self.sig)?)
        } else {
            Ok(())
        }
    }

    /// Get the inner unsigned transaction
    pub fn inner(&self) -> &T {
        &self.tx
    }

    /// Get the transaction ID
    pub fn id(&self) -> Identifier {
        self.tx.id()
    }

    /// Verify the signature and validate the transaction
    pub fn validate<S: Store>(
        &self,
        store: &S,
        state: Option<&ElectionState>,
    ) -> Result<(), ValidationError> {
        self.verify_signature()?;
        self.validate_tx(store, state)?;

        Ok(())
    }
}

impl<T: Signable + Serialize> AsRef<T> for Signed<T> {
    fn as_ref(&self) -> &T {
        &self.tx
    }
}

impl<T: Signable + Serialize> Deref for Signed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

/// Transaction identifier
///
/// The identifier defines the election, transction-type, and a unique identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    pub election_id: [u8; 15],
    pub transaction_type: TransactionType,
    pub unique_id: Option<[u8; 16]>,
}

impl Identifier {
    /// Create a new Identifier within an election.
    ///
    /// The unique part is derived from `unique_info`, so transactions that must be singular
    /// (one vote per voter key, one tally per election) collide by construction.
    pub fn new(
        election_id: Identifier,
        transaction_type: TransactionType,
        unique_info: Option<&[u8]>,
    ) -> Self {
        let unique_id = unique_info.map(|info| {
            let mut unique_id = [0u8; 16];
            unique_id.copy_from_slice(&Sha512::digest(info)[0..16]);
            unique_id
        });
        Identifier {
            election_id: election_id.election_id,
            transaction_type,
            unique_id,
        }
    }

    /// Create a new identifier for an election
    pub fn new_for_election() -> Self {
        let uuid = Uuid::new_v4();
        let mut election_id = [0u8; 15];
        election_id.copy_from_slice(&uuid.as_bytes()[..15]);

        Identifier {
            election_id,
            transaction_type: TransactionType::Election,
            unique_id: Some([0; 16]),
        }
    }

    /// The identifier of the election this transaction belongs to
    pub fn election(&self) -> Identifier {
        Identifier {
            election_id: self.election_id,
            transaction_type: TransactionType::Election,
            unique_id: Some([0; 16]),
        }
    }

    pub fn to_array(&self) -> [u8; 32] {
        let mut bytes: [u8; 32] = [0; 32];
        bytes[0..15].clone_from_slice(&self.election_id);
        bytes[15] = self.transaction_type as u8;
        if let Some(unique_id) = self.unique_id {
            bytes[16..32].clone_from_slice(&unique_id);
        }
        bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self.unique_id {
            Some(_) => self.to_array().to_vec(),
            None => self.to_array()[..16].to_vec(),
        }
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::IdentifierBadHex)?;

        if bytes.len() != 32 && bytes.len() != 16 {
            return Err(Error::IdentifierBadLen);
        }

        let mut election_id = [0u8; 15];
        election_id.copy_from_slice(&bytes[0..15]);
        let transaction_type = TransactionType::try_from_primitive(bytes[15])
            .map_err(|_| Error::IdentifierBadType(bytes[15]))?;

        let unique_id = if bytes.len() == 32 {
            let mut unique_id = [0u8; 16];
            unique_id.copy_from_slice(&bytes[16..]);
            Some(unique_id)
        } else {
            None
        };

        Ok(Identifier {
            election_id,
            transaction_type,
            unique_id,
        })
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        std::str::FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// A transaction type, ordered by where it appears in an election's lifecycle
#[derive(
    Serialize,
    Deserialize,
    TryFromPrimitive,
    Copy,
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TransactionType {
    Election = 1,
    VotingStart = 2,
    Vote = 3,
    VotingEnd = 4,
    Tally = 5,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            TransactionType::Election => "election",
            TransactionType::VotingStart => "voting_start",
            TransactionType::Vote => "vote",
            TransactionType::VotingEnd => "voting_end",
            TransactionType::Tally => "tally",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_identifier() {
        assert!(TransactionType::Election as u8 == 1);
        assert!(TransactionType::VotingStart as u8 == 2);
        assert!(TransactionType::Vote as u8 == 3);
        assert!(TransactionType::VotingEnd as u8 == 4);
        assert!(TransactionType::Tally as u8 == 5);

        let election_id = Identifier::new_for_election();
        let election_id_bytes = election_id.to_bytes();
        assert_eq!(election_id_bytes[15], 1);

        let stringed = election_id.to_string();
        let from_string = Identifier::from_str(&stringed).unwrap();

        assert_eq!(election_id, from_string);
    }

    #[test]
    fn identifiers_within_an_election() {
        let election_id = Identifier::new_for_election();
        let a = Identifier::new(election_id, TransactionType::Vote, Some(&b"voter-a"[..]));
        let b = Identifier::new(election_id, TransactionType::Vote, Some(&b"voter-b"[..]));
        let end = Identifier::new(election_id, TransactionType::VotingEnd, None);

        assert_ne!(a, b);
        assert_eq!(a, Identifier::new(election_id, TransactionType::Vote, Some(&b"voter-a"[..])));
        assert_eq!(a.election(), election_id);
        assert_eq!(end.to_bytes().len(), 16);
        assert_eq!(Identifier::from_str(&end.to_string()).unwrap(), end);
        assert!(election_id < a && a < end);
    }

    #[test]
    fn bad_identifiers() {
        assert!(matches!(
            Identifier::from_str("zz"),
            Err(Error::IdentifierBadHex)
        ));
        assert!(matches!(
            Identifier::from_str("00"),
            Err(Error::IdentifierBadLen)
        ));
        let mut bytes = [0u8; 16];
        bytes[15] = 42;
        assert!(matches!(
            Identifier::from_str(&hex::encode(bytes)),
            Err(Error::IdentifierBadType(42))
        ));
    }
}
