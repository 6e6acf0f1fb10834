use crate::*;

use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("zkballot: point is not on the curve or not in the prime-order subgroup")]
    InvalidPoint,

    #[error("zkballot: invalid field element: {0}")]
    InvalidFieldElement(String),

    #[error("zkballot: invalid scalar: {0}")]
    InvalidScalar(String),

    #[error("zkballot: wrong length for {what}: expected {expected}, found {found}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("zkballot: candidate {candidate} out of range for {num_candidates} candidates")]
    CandidateOutOfRange {
        candidate: u64,
        num_candidates: usize,
    },

    #[error("zkballot: {0} candidates is unsupported (must be between 1 and {MAX_CANDIDATES})")]
    UnsupportedCandidateCount(usize),

    #[error("zkballot: hash arity {0} exceeds the maximum of {MAX_HASH_INPUTS} inputs")]
    HashArityExceeded(usize),

    #[error("zkballot: cannot add an empty list of ciphertexts")]
    EmptyCiphertextList,

    #[error("zkballot: discrete log not found in range [0, {max_value}]")]
    DLogNotFound { max_value: u64 },

    #[error("zkballot: cannot build a merkle tree with no leaves")]
    EmptyTree,

    #[error("zkballot: leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("zkballot: circuit is not satisfied by the witness: {0}")]
    UnsatisfiedCircuit(String),

    #[error("zkballot: constraint synthesis failed: {0}")]
    Synthesis(String),

    #[error("zkballot: serialization error: {0}")]
    Serialization(String),

    #[error("zkballot: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("zkballot: mismatched public keys")]
    MismatchedPublicKeys,

    #[error("zkballot: invalid identifier - invalid hexidecimal")]
    IdentifierBadHex,

    #[error("zkballot: invalid identifier - wrong length")]
    IdentifierBadLen,

    #[error("zkballot: invalid identifier - unknown transaction type {0}")]
    IdentifierBadType(u8),

    #[error("zkballot: CBOR error deserializing transaction: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("zkballot: JSON error: {0}")]
    JSONDeserialization(#[from] serde_json::Error),

    #[error("zkballot: hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl From<ark_relations::r1cs::SynthesisError> for Error {
    fn from(err: ark_relations::r1cs::SynthesisError) -> Self {
        Error::Synthesis(err.to_string())
    }
}

impl From<ark_serialize::SerializationError> for Error {
    fn from(err: ark_serialize::SerializationError) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Transaction Validation errors
///
/// Consistency checks are cheap comparisons and always run before any pairing check,
/// so a mismatch is reported precisely rather than as an opaque proof failure.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("zkballot validation: election authority public key mismatch")]
    AuthorityPublicKeyMismatch,

    #[error("zkballot validation: election mismatch")]
    ElectionMismatch,

    #[error("zkballot validation: election already exists")]
    ElectionAlreadyExists,

    #[error("zkballot validation: election has no candidates")]
    NoCandidates,

    #[error("zkballot validation: election has no registered voters")]
    NoVoters,

    #[error("zkballot validation: max_votes {max_votes} cannot cover {voters} registered voters")]
    InvalidMaxVotes { max_votes: u64, voters: usize },

    #[error("zkballot validation: encryption public key is the identity point")]
    WeakEncryptionKey,

    #[error("zkballot validation: election is in phase {found}, expected {expected}")]
    InvalidPhase { expected: Phase, found: Phase },

    #[error("zkballot validation: cannot move election from {from} to {to}")]
    InvalidPhaseTransition { from: Phase, to: Phase },

    #[error("zkballot validation: voter is not registered for this election")]
    VoterNotRegistered,

    #[error("zkballot validation: voter has already cast a ballot")]
    AlreadyVoted,

    #[error("zkballot validation: a ballot with this commitment was already accepted")]
    DuplicateCommitment,

    #[error("zkballot validation: ballot has {found} ciphertexts, election has {expected} candidates")]
    CandidateCountMismatch { expected: usize, found: usize },

    #[error("zkballot validation: ciphertext hash does not match the ballot ciphertexts")]
    CiphertextHashMismatch,

    #[error("zkballot validation: proof public signals do not match the ballot")]
    PublicSignalsMismatch,

    #[error("zkballot validation: vote proof rejected")]
    VoteProofRejected,

    #[error("zkballot validation: tally proof rejected")]
    TallyProofRejected,

    #[error("zkballot validation: encryption public key mismatch")]
    EncryptionKeyMismatch,

    #[error("zkballot validation: results sum to {claimed} but total votes is {total}")]
    TallySumMismatch { claimed: u64, total: u64 },

    #[error("zkballot validation: tally claims {claimed} votes but {cast} ballots were cast")]
    BallotCountMismatch { claimed: u64, cast: u64 },

    #[error("zkballot validation: result point for candidate {0} does not match the claimed result")]
    ResultPointMismatch(usize),

    #[error("zkballot validation: aggregate ciphertext for candidate {0} does not match the ledger")]
    AggregateMismatch(usize),

    #[error("zkballot validation: transaction not found: {0}")]
    TransactionNotFound(#[from] TransactionNotFound),

    #[error("zkballot validation: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("zkballot validation: malformed input: {0}")]
    Malformed(#[from] Error),

    #[error("zkballot validation: mismatched transaction type and id type")]
    MismatchedTransactionType,
}
