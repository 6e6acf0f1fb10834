use crate::*;
use ark_ff::{BigInteger, PrimeField, UniformRand, Zero};
use ark_serialize::CanonicalDeserialize;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey as PublicKey;
use rand::{CryptoRng, RngCore};

/// Generate an ed25519 keypair for signing transactions
pub fn generate_keypair() -> (SigningKey, PublicKey) {
    let mut csprng = rand::rngs::OsRng {};
    let secret = SigningKey::generate(&mut csprng);
    let public = secret.verifying_key();
    (secret, public)
}

/// Encode a field element as 32 big-endian bytes
pub fn fq_to_bytes(value: &Fq) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&value.into_bigint().to_bytes_be());
    bytes
}

/// Decode a field element from 32 big-endian bytes, rejecting non-canonical encodings
pub fn fq_from_bytes(bytes: &[u8]) -> Result<Fq, Error> {
    if bytes.len() != 32 {
        return Err(Error::WrongLength {
            what: "field element",
            expected: 32,
            found: bytes.len(),
        });
    }
    let mut le = bytes.to_vec();
    le.reverse();

    Fq::deserialize_compressed(le.as_slice())
        .map_err(|_| Error::InvalidFieldElement(hex::encode(bytes)))
}

pub fn fq_to_hex(value: &Fq) -> String {
    hex::encode(fq_to_bytes(value))
}

pub fn fq_from_hex(s: &str) -> Result<Fq, Error> {
    let bytes = hex::decode(s.trim_start_matches("0x"))?;
    fq_from_bytes(&bytes)
}

/// Encode a scalar as 32 big-endian bytes
pub fn scalar_to_bytes(value: &Scalar) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&value.into_bigint().to_bytes_be());
    bytes
}

/// Decode a scalar from 32 big-endian bytes, rejecting values outside `[0, order)`
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar, Error> {
    if bytes.len() != 32 {
        return Err(Error::WrongLength {
            what: "scalar",
            expected: 32,
            found: bytes.len(),
        });
    }
    let mut le = bytes.to_vec();
    le.reverse();

    Scalar::deserialize_compressed(le.as_slice())
        .map_err(|_| Error::InvalidScalar(hex::encode(bytes)))
}

/// Lift a subgroup scalar into the circuit field.
///
/// The subgroup order is smaller than the field modulus so the integer value is preserved.
pub fn scalar_to_fq(value: &Scalar) -> Fq {
    Fq::from_le_bytes_mod_order(&value.into_bigint().to_bytes_le())
}

/// Sample a uniformly random non-zero scalar
pub fn random_nonzero_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let candidate = Scalar::rand(rng);
        if !candidate.is_zero() {
            return candidate;
        }
    }
}

/// Interpret a field element as a u64, if it fits
pub fn fq_to_u64(value: &Fq) -> Option<u64> {
    let bigint = value.into_bigint();
    if bigint.num_bits() > 64 {
        return None;
    }
    Some(bigint.as_ref()[0])
}
