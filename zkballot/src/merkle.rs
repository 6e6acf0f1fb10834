//! Deterministic Merkle tree over 32-byte vote commitments.
//!
//! Leaves are the commitments themselves (not re-hashed), internal nodes are
//! `SHA-256(left || right)` and a layer with an odd number of nodes pairs its last node with
//! itself.

use crate::*;
use sha2::{Digest, Sha256};

pub type Node = [u8; 32];

/// Hash two sibling nodes into their parent
pub fn hash_pair(left: &Node, right: &Node) -> Node {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<Node>>,
}

impl MerkleTree {
    pub fn build(leaves: &[Node]) -> Result<Self, Error> {
        if leaves.is_empty() {
            return Err(Error::EmptyTree);
        }

        let mut layers = vec![leaves.to_vec()];
        while let Some(current) = layers.last().filter(|l| l.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [last] => hash_pair(last, last),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            layers.push(next);
        }

        Ok(MerkleTree { layers })
    }

    pub fn root(&self) -> Node {
        // A built tree always has a single-node top layer
        self.layers[self.layers.len() - 1][0]
    }

    pub fn layers(&self) -> &[Vec<Node>] {
        &self.layers
    }

    pub fn num_leaves(&self) -> usize {
        self.layers[0].len()
    }

    /// Sibling path from the leaf at `index` up to (but excluding) the root
    pub fn get_proof(&self, index: usize) -> Result<Vec<Node>, Error> {
        if index >= self.num_leaves() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.num_leaves(),
            });
        }

        let mut proof = Vec::with_capacity(self.layers.len() - 1);
        let mut position = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = if position % 2 == 0 {
                // The last node of an odd layer is paired with itself
                layer.get(position + 1).unwrap_or(&layer[position])
            } else {
                &layer[position - 1]
            };
            proof.push(*sibling);
            position /= 2;
        }
        Ok(proof)
    }

    /// Fold `leaf` up through `proof` and compare with `root`
    pub fn verify_proof(leaf: &Node, proof: &[Node], root: &Node, index: usize) -> bool {
        let mut current = *leaf;
        let mut position = index;
        for sibling in proof {
            current = if position % 2 == 0 {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
            position /= 2;
        }
        current == *root
    }
}
