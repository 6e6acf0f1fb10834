#[macro_use]
extern crate serde;

#[macro_use]
extern crate lazy_static;

mod audit;
mod ballot;
mod commitment;
mod curve;
mod dlog;
mod election;
mod elgamal;
mod error;
mod gadgets;
mod groth16;
mod ledger;
mod merkle;
mod poseidon;
mod serde_hex;
mod store;
mod tally;
mod tally_circuit;
mod transaction;
mod util;
mod vote;
mod vote_circuit;
mod voting_end;
mod voting_start;

pub use audit::*;
pub use ballot::*;
pub use commitment::*;
pub use curve::*;
pub use dlog::*;
pub use election::*;
pub use elgamal::*;
pub use error::*;
pub use gadgets::*;
pub use groth16::*;
pub use ledger::*;
pub use merkle::*;
pub use poseidon::*;
pub use serde_hex::*;
pub use store::*;
pub use tally::*;
pub use tally_circuit::*;
pub use transaction::*;
pub use util::*;
pub use vote::*;
pub use vote_circuit::*;
pub use voting_end::*;
pub use voting_start::*;

/// Largest candidate count the circuits are generated for
pub const MAX_CANDIDATES: usize = 16;

/// Largest number of field elements a single Poseidon hash accepts
pub const MAX_HASH_INPUTS: usize = 64;
