//! Poseidon hashing over the circuit field, natively and as an R1CS gadget.
//!
//! Both sides are built from the same [`PoseidonConfig`] so that a hash computed by a voter
//! client is bit-for-bit the value the circuits constrain.

use crate::*;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_r1cs_std::fields::FieldVar;
use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

const FULL_ROUNDS: usize = 8;
const PARTIAL_ROUNDS: usize = 57;
const ALPHA: u64 = 5;
const RATE: usize = 2;
const CAPACITY: usize = 1;

lazy_static! {
    static ref POSEIDON_CONFIG: PoseidonConfig<Fq> = {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fq>(
            Fq::MODULUS_BIT_SIZE as u64,
            RATE,
            FULL_ROUNDS as u64,
            PARTIAL_ROUNDS as u64,
            0,
        );
        PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
    };
}

/// The shared width-3 Poseidon parameters
pub fn poseidon_config() -> &'static PoseidonConfig<Fq> {
    &POSEIDON_CONFIG
}

/// Hash a list of field elements.
///
/// The sponge absorbs the input length first so inputs of different arity never collide.
pub fn poseidon_hash(inputs: &[Fq]) -> Result<Fq, Error> {
    if inputs.len() > MAX_HASH_INPUTS {
        return Err(Error::HashArityExceeded(inputs.len()));
    }

    let mut sponge = PoseidonSponge::new(poseidon_config());
    sponge.absorb(&Fq::from(inputs.len() as u64));
    for input in inputs {
        sponge.absorb(input);
    }

    let mut out = sponge.squeeze_native_field_elements(1);
    Ok(out.remove(0))
}

/// In-circuit counterpart of [`poseidon_hash`]
pub fn poseidon_hash_var(
    cs: ConstraintSystemRef<Fq>,
    inputs: &[FpVar<Fq>],
) -> Result<FpVar<Fq>, SynthesisError> {
    if inputs.len() > MAX_HASH_INPUTS {
        return Err(SynthesisError::Unsatisfiable);
    }

    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    sponge.absorb(&FpVar::constant(Fq::from(inputs.len() as u64)))?;
    for input in inputs {
        sponge.absorb(input)?;
    }

    let mut out = sponge.squeeze_field_elements(1)?;
    Ok(out.remove(0))
}
