//! Groth16 over BN254: key generation, proving and fail-closed verification.

use crate::*;
use ark_bn254::Bn254;
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::{CryptoRng, RngCore};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// A Groth16 proving key
#[derive(Clone)]
pub struct CircuitProvingKey(ProvingKey<Bn254>);

impl CircuitProvingKey {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.0.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    /// Decode a proving key produced by [`CircuitProvingKey::to_bytes`].
    ///
    /// Proving keys are local artifacts, so curve-point validation is skipped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(CircuitProvingKey(ProvingKey::deserialize_compressed_unchecked(bytes)?))
    }
}

/// A Groth16 verifying key, serialized as compressed hex
#[derive(Clone, Debug, PartialEq)]
pub struct CircuitVerifyingKey(VerifyingKey<Bn254>);

impl Eq for CircuitVerifyingKey {}

impl CircuitVerifyingKey {
    /// Number of public inputs the key expects
    pub fn num_public_inputs(&self) -> usize {
        self.0.gamma_abc_g1.len().saturating_sub(1)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.0.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(CircuitVerifyingKey(VerifyingKey::deserialize_compressed(bytes)?))
    }
}

// a single-purpose type for use in `#[serde(with)]`
pub enum VerifyingKeyHex {}

impl Hex<CircuitVerifyingKey> for VerifyingKeyHex {
    type Error = Error;

    fn create_bytes(vk: &CircuitVerifyingKey) -> Cow<[u8]> {
        // Serializing into a Vec cannot fail
        vk.to_bytes().unwrap_or_default().into()
    }

    fn from_bytes(bytes: &[u8]) -> Result<CircuitVerifyingKey, Error> {
        CircuitVerifyingKey::from_bytes(bytes)
    }
}

/// Proving and verifying keys for one circuit shape
#[derive(Clone)]
pub struct CircuitKeys {
    pub proving: CircuitProvingKey,
    pub verifying: CircuitVerifyingKey,
}

impl CircuitKeys {
    /// Run the circuit-specific trusted setup
    pub fn setup<C, R>(circuit: C, rng: &mut R) -> Result<Self, Error>
    where
        C: ConstraintSynthesizer<Fq>,
        R: RngCore + CryptoRng,
    {
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)?;
        let keys = CircuitKeys {
            proving: CircuitProvingKey(pk),
            verifying: CircuitVerifyingKey(vk),
        };
        info!(
            public_inputs = keys.verifying.num_public_inputs(),
            "generated groth16 keys"
        );
        Ok(keys)
    }
}

/// One public input: a field element as 32 big-endian bytes.
///
/// Kept as raw bytes so that a non-canonical encoding received from outside is rejected at
/// verification time instead of being silently reduced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PublicSignal(pub [u8; 32]);

impl PublicSignal {
    pub fn to_field(&self) -> Result<Fq, Error> {
        fq_from_bytes(&self.0)
    }
}

impl From<Fq> for PublicSignal {
    fn from(value: Fq) -> Self {
        PublicSignal(fq_to_bytes(&value))
    }
}

impl Serialize for PublicSignal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicSignal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes).map_err(de::Error::custom)?;
        Ok(PublicSignal(bytes))
    }
}

/// A Groth16 proof together with the public signals it was produced for
#[derive(Clone, Debug, PartialEq)]
pub struct ZkProof {
    proof: Proof<Bn254>,
    pub public_signals: Vec<PublicSignal>,
}

impl Eq for ZkProof {}

impl ZkProof {
    pub fn proof_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.proof.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZkProofRepr {
    #[serde(with = "hex")]
    proof: Vec<u8>,
    public_signals: Vec<PublicSignal>,
}

impl Serialize for ZkProof {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let repr = ZkProofRepr {
            proof: self.proof_bytes().map_err(serde::ser::Error::custom)?,
            public_signals: self.public_signals.clone(),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ZkProof {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = ZkProofRepr::deserialize(deserializer)?;
        let proof = Proof::deserialize_compressed(repr.proof.as_slice())
            .map_err(de::Error::custom)?;
        Ok(ZkProof {
            proof,
            public_signals: repr.public_signals,
        })
    }
}

/// Prove that `circuit` is satisfied.
///
/// The witness is checked against the constraints first so that an invalid statement is
/// reported as `Error::UnsatisfiedCircuit` rather than yielding a proof that will not verify.
pub fn prove<C, R>(pk: &CircuitProvingKey, circuit: C, rng: &mut R) -> Result<ZkProof, Error>
where
    C: ConstraintSynthesizer<Fq> + Clone,
    R: RngCore + CryptoRng,
{
    let cs = ConstraintSystem::<Fq>::new_ref();
    circuit.clone().generate_constraints(cs.clone())?;
    if !cs.is_satisfied()? {
        let which = cs.which_is_unsatisfied()?.unwrap_or_default();
        return Err(Error::UnsatisfiedCircuit(which));
    }

    let public_signals: Vec<PublicSignal> = cs
        .borrow()
        .map(|cs| cs.instance_assignment[1..].iter().copied().map(PublicSignal::from).collect())
        .ok_or_else(|| Error::Synthesis("constraint system was dropped".to_string()))?;
    debug!(
        constraints = cs.num_constraints(),
        public_inputs = public_signals.len(),
        "witness satisfies circuit"
    );

    let proof = Groth16::<Bn254>::prove(&pk.0, circuit, rng)?;
    info!("generated groth16 proof");

    Ok(ZkProof {
        proof,
        public_signals,
    })
}

/// Verify `proof` against `public_signals`.
///
/// Any malformed signal (non-canonical encoding, wrong count) fails closed.
pub fn verify(vk: &CircuitVerifyingKey, public_signals: &[PublicSignal], proof: &ZkProof) -> bool {
    if public_signals.len() != vk.num_public_inputs() {
        warn!(
            expected = vk.num_public_inputs(),
            found = public_signals.len(),
            "rejecting proof: wrong number of public signals"
        );
        return false;
    }

    let inputs: Result<Vec<Fq>, Error> = public_signals.iter().map(|s| s.to_field()).collect();
    let inputs = match inputs {
        Ok(inputs) => inputs,
        Err(e) => {
            warn!(error = %e, "rejecting proof: malformed public signal");
            return false;
        }
    };

    match Groth16::<Bn254>::verify(&vk.0, &inputs, &proof.proof) {
        Ok(true) => true,
        Ok(false) => {
            warn!("rejecting proof: pairing check failed");
            false
        }
        Err(e) => {
            warn!(error = %e, "rejecting proof: verifier error");
            false
        }
    }
}

/// Public signals of the vote circuit
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteSignals {
    #[serde(with = "FieldHex")]
    pub commitment: Fq,
    #[serde(with = "FieldHex")]
    pub ciphertext_hash: Fq,
    pub public_key: Point,
}

impl VoteSignals {
    /// `[commitment, ciphertext_hash, pk.x, pk.y]`
    pub fn to_field_elements(&self) -> Vec<Fq> {
        vec![
            self.commitment,
            self.ciphertext_hash,
            self.public_key.x(),
            self.public_key.y(),
        ]
    }

    pub fn from_field_elements(elements: &[Fq]) -> Result<Self, Error> {
        if elements.len() != VOTE_PUBLIC_INPUTS {
            return Err(Error::WrongLength {
                what: "vote public signals",
                expected: VOTE_PUBLIC_INPUTS,
                found: elements.len(),
            });
        }
        Ok(VoteSignals {
            commitment: elements[0],
            ciphertext_hash: elements[1],
            public_key: Point::new(elements[2], elements[3])?,
        })
    }

    pub fn to_public_signals(&self) -> Vec<PublicSignal> {
        self.to_field_elements()
            .into_iter()
            .map(PublicSignal::from)
            .collect()
    }
}

/// Public signals of the tally circuit
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TallySignals {
    pub public_key: Point,
    pub c1_totals: Vec<Point>,
    pub c2_totals: Vec<Point>,
    pub result_points: Vec<Point>,
    pub total_votes: u64,
}

impl TallySignals {
    pub fn num_candidates(&self) -> usize {
        self.result_points.len()
    }

    /// `[pk.x, pk.y, c1.x[N], c1.y[N], c2.x[N], c2.y[N], result.x[N], result.y[N], total_votes]`
    pub fn to_field_elements(&self) -> Vec<Fq> {
        let n = self.num_candidates();
        let mut elements = Vec::with_capacity(tally_public_inputs(n));
        elements.push(self.public_key.x());
        elements.push(self.public_key.y());
        for group in [&self.c1_totals, &self.c2_totals, &self.result_points] {
            elements.extend(group.iter().map(|p| p.x()));
            elements.extend(group.iter().map(|p| p.y()));
        }
        elements.push(Fq::from(self.total_votes));
        elements
    }

    pub fn from_field_elements(elements: &[Fq], num_candidates: usize) -> Result<Self, Error> {
        let expected = tally_public_inputs(num_candidates);
        if elements.len() != expected {
            return Err(Error::WrongLength {
                what: "tally public signals",
                expected,
                found: elements.len(),
            });
        }

        let n = num_candidates;
        let group = |offset: usize| -> Result<Vec<Point>, Error> {
            (0..n)
                .map(|i| Point::new(elements[offset + i], elements[offset + n + i]))
                .collect()
        };

        let total = &elements[expected - 1];
        Ok(TallySignals {
            public_key: Point::new(elements[0], elements[1])?,
            c1_totals: group(2)?,
            c2_totals: group(2 + 2 * n)?,
            result_points: group(2 + 4 * n)?,
            total_votes: fq_to_u64(total)
                .ok_or_else(|| Error::InvalidFieldElement(fq_to_hex(total)))?,
        })
    }

    pub fn to_public_signals(&self) -> Vec<PublicSignal> {
        self.to_field_elements()
            .into_iter()
            .map(PublicSignal::from)
            .collect()
    }
}

/// Ledger-side check of a ballot proof
pub fn verify_vote_proof(vk: &CircuitVerifyingKey, proof: &ZkProof, signals: &VoteSignals) -> bool {
    verify(vk, &signals.to_public_signals(), proof)
}

/// Ledger-side check of a tally proof
pub fn verify_tally_proof(
    vk: &CircuitVerifyingKey,
    proof: &ZkProof,
    signals: &TallySignals,
) -> bool {
    verify(vk, &signals.to_public_signals(), proof)
}

/// Generate keys for the `N`-candidate vote circuit
pub fn setup_vote<const N: usize, R: RngCore + CryptoRng>(rng: &mut R) -> Result<CircuitKeys, Error> {
    check_candidate_count(N)?;
    CircuitKeys::setup(VoteCircuit::<N>::blank(), rng)
}

/// Generate keys for the `N`-candidate tally circuit
pub fn setup_tally<const N: usize, R: RngCore + CryptoRng>(rng: &mut R) -> Result<CircuitKeys, Error> {
    check_candidate_count(N)?;
    CircuitKeys::setup(TallyCircuit::<N>::blank(), rng)
}

pub fn prove_vote<const N: usize, R: RngCore + CryptoRng>(
    pk: &CircuitProvingKey,
    circuit: VoteCircuit<N>,
    rng: &mut R,
) -> Result<ZkProof, Error> {
    prove(pk, circuit, rng)
}

pub fn prove_tally<const N: usize, R: RngCore + CryptoRng>(
    pk: &CircuitProvingKey,
    circuit: TallyCircuit<N>,
    rng: &mut R,
) -> Result<ZkProof, Error> {
    prove(pk, circuit, rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_proof_round_trip() {
        let mut rng = rand::thread_rng();
        let keys = setup_vote::<2, _>(&mut rng).unwrap();
        assert_eq!(keys.verifying.num_public_inputs(), VOTE_PUBLIC_INPUTS);

        let election = KeyPair::generate(&mut rng);
        let randomness = [random_nonzero_scalar(&mut rng), random_nonzero_scalar(&mut rng)];
        let circuit =
            VoteCircuit::<2>::new(election.public, 1, random_salt(&mut rng), randomness).unwrap();
        let signals = circuit.public_signals().unwrap();

        let proof = prove_vote(&keys.proving, circuit, &mut rng).unwrap();
        assert_eq!(proof.public_signals, signals.to_public_signals());
        assert!(verify_vote_proof(&keys.verifying, &proof, &signals));

        // Tampered commitment
        let mut tampered = signals;
        tampered.commitment += Fq::from(1u64);
        assert!(!verify_vote_proof(&keys.verifying, &proof, &tampered));

        // Wrong count
        assert!(!verify(&keys.verifying, &proof.public_signals[..3], &proof));

        // Non-canonical encoding of the same value fails closed
        let mut signals_raw = proof.public_signals.clone();
        signals_raw[0] = PublicSignal([0xff; 32]);
        assert!(!verify(&keys.verifying, &signals_raw, &proof));

        // Serialization round trip
        let json = serde_json::to_string(&proof).unwrap();
        let decoded: ZkProof = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, proof);
        assert!(verify(&keys.verifying, &decoded.public_signals, &decoded));

        let vk_bytes = keys.verifying.to_bytes().unwrap();
        assert_eq!(CircuitVerifyingKey::from_bytes(&vk_bytes).unwrap(), keys.verifying);
    }

    #[test]
    fn unsatisfied_witness_is_not_proven() {
        let mut rng = rand::thread_rng();
        let keys = setup_vote::<2, _>(&mut rng).unwrap();
        let election = KeyPair::generate(&mut rng);

        let mut circuit =
            VoteCircuit::<2>::new(election.public, 0, Fq::from(1u64), [Scalar::from(3u64); 2])
                .unwrap();
        circuit.salt = Some(Fq::from(2u64));

        assert!(matches!(
            prove_vote(&keys.proving, circuit, &mut rng),
            Err(Error::UnsatisfiedCircuit(_))
        ));
    }

    #[test]
    fn tally_signal_layout_round_trips() {
        let g = Point::generator();
        let signals = TallySignals {
            public_key: g.mul_u64(9),
            c1_totals: vec![g.mul_u64(1), g.mul_u64(2)],
            c2_totals: vec![g.mul_u64(3), g.mul_u64(4)],
            result_points: vec![g.mul_u64(5), g.mul_u64(6)],
            total_votes: 11,
        };
        let elements = signals.to_field_elements();
        assert_eq!(elements.len(), tally_public_inputs(2));
        assert_eq!(elements[2], g.mul_u64(1).x());
        assert_eq!(elements[3], g.mul_u64(2).x());
        assert_eq!(elements[4], g.mul_u64(1).y());
        assert_eq!(elements[14], Fq::from(11u64));

        assert_eq!(TallySignals::from_field_elements(&elements, 2).unwrap(), signals);
        assert!(TallySignals::from_field_elements(&elements, 3).is_err());
    }
}
