use crate::*;
use ed25519_dalek::Signature;
use ed25519_dalek::VerifyingKey as PublicKey;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::convert::TryInto;

pub use hex_buffer_serde::Hex;

// a single-purpose type for use in `#[serde(with)]`
pub enum EdPublicKeyHex {}

impl Hex<PublicKey> for EdPublicKeyHex {
    type Error = String;

    fn create_bytes(public_key: &PublicKey) -> Cow<[u8]> {
        public_key.as_bytes().to_vec().into()
    }

    fn from_bytes(bytes: &[u8]) -> Result<PublicKey, String> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "ed25519 public key must be 32 bytes".to_string())?;
        PublicKey::from_bytes(&bytes).map_err(|e| format!("{}", e))
    }
}

// a single-purpose type for use in `#[serde(with)]`
pub enum EdSignatureHex {}

impl Hex<Signature> for EdSignatureHex {
    type Error = String;

    fn create_bytes(sig: &Signature) -> Cow<[u8]> {
        let bytes = sig.to_bytes().to_vec();
        Cow::from(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Signature, String> {
        Signature::from_slice(bytes).map_err(|e| format!("{}", e))
    }
}

// a single-purpose type for use in `#[serde(with)]`
pub enum FieldHex {}

impl Hex<Fq> for FieldHex {
    type Error = Error;

    fn create_bytes(value: &Fq) -> Cow<[u8]> {
        fq_to_bytes(value).to_vec().into()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Fq, Error> {
        fq_from_bytes(bytes)
    }
}

/// `#[serde(with)]` adapter for a list of scalars, each as 32-byte big-endian hex
pub mod scalar_vec_hex {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[Scalar], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = values
            .iter()
            .map(|v| hex::encode(scalar_to_bytes(v)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Scalar>, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let bytes = hex::decode(s).map_err(de::Error::custom)?;
                scalar_from_bytes(&bytes).map_err(de::Error::custom)
            })
            .collect()
    }
}

/// `#[serde(with)]` adapter for a list of ed25519 public keys
pub mod ed_public_key_vec_hex {
    use super::*;

    pub fn serialize<S: Serializer>(
        values: &[PublicKey],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = values.iter().map(|k| hex::encode(k.as_bytes())).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<PublicKey>, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let bytes = hex::decode(s).map_err(de::Error::custom)?;
                EdPublicKeyHex::from_bytes(&bytes).map_err(de::Error::custom)
            })
            .collect()
    }
}

/// `#[serde(with)]` adapter for a list of 32-byte merkle nodes
pub mod node_vec_hex {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[[u8; 32]], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = values.iter().map(hex::encode).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<[u8; 32]>, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let mut node = [0u8; 32];
                hex::decode_to_slice(s, &mut node).map_err(de::Error::custom)?;
                Ok(node)
            })
            .collect()
    }
}

// Points travel as 128 hex characters: x then y, both big-endian
impl Serialize for Point {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(de::Error::custom)?;
        Point::from_bytes(&bytes).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "FieldHex")]
        value: Fq,
        #[serde(with = "scalar_vec_hex")]
        values: Vec<Scalar>,
        point: Point,
    }

    #[test]
    fn hex_fields_round_trip_through_json() {
        let wrapper = Wrapper {
            value: Fq::from(7u64),
            values: vec![Scalar::from(1u64), Scalar::from(2u64)],
            point: Point::generator(),
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert!(json.contains("0000000000000000000000000000000000000000000000000000000000000007"));

        let decoded: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, wrapper);
    }

    #[test]
    fn off_curve_point_fails_to_deserialize() {
        let mut bytes = Point::generator().to_bytes();
        bytes[0] ^= 0x01;
        let json = format!("\"{}\"", hex::encode(bytes));
        assert!(serde_json::from_str::<Point>(&json).is_err());
    }
}
