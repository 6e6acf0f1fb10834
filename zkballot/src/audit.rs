//! Audit bundles: a Merkle commitment to every accepted ballot, in ledger order, with a
//! per-ballot inclusion proof that voters and auditors can check independently.

use crate::*;
use tracing::{info, warn};

pub const AUDIT_BUNDLE_VERSION: u32 = 1;
pub const LEAF_RULE: &str = "commitment (32-byte big-endian field element, not hashed)";
pub const NODE_RULE: &str = "sha256(left || right)";
pub const ODD_RULE: &str = "duplicate last node";

/// A ballot acceptance recorded by the ledger
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteEvent {
    #[serde(with = "FieldHex")]
    pub commitment: Fq,
    #[serde(with = "FieldHex")]
    pub ciphertext_hash: Fq,
    #[serde(with = "hex")]
    pub tx_hash: [u8; 32],
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
}

impl VoteEvent {
    fn ordering_key(&self) -> (u64, u64, u64) {
        (self.block_number, self.tx_index, self.log_index)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub index: usize,
    #[serde(with = "hex")]
    pub commitment: Node,
    #[serde(with = "node_vec_hex")]
    pub proof: Vec<Node>,
    #[serde(with = "hex")]
    pub tx_hash: [u8; 32],
    pub block_number: u64,
    pub log_index: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditBundle {
    pub version: u32,
    pub leaf_rule: String,
    pub node_rule: String,
    pub odd_rule: String,
    #[serde(with = "hex")]
    pub root: Node,
    pub total_leaves: usize,
    pub entries: Vec<AuditEntry>,
}

impl AuditBundle {
    /// Build a bundle from ledger events, ordered by `(block_number, tx_index, log_index)`
    pub fn build(events: &[VoteEvent]) -> Result<Self, Error> {
        let mut events = events.to_vec();
        events.sort_by_key(VoteEvent::ordering_key);

        let leaves: Vec<Node> = events.iter().map(|e| fq_to_bytes(&e.commitment)).collect();
        let tree = MerkleTree::build(&leaves)?;

        let entries = events
            .iter()
            .zip(&leaves)
            .enumerate()
            .map(|(index, (event, leaf))| {
                Ok(AuditEntry {
                    index,
                    commitment: *leaf,
                    proof: tree.get_proof(index)?,
                    tx_hash: event.tx_hash,
                    block_number: event.block_number,
                    log_index: event.log_index,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        info!(
            leaves = leaves.len(),
            root = %hex::encode(tree.root()),
            "built audit bundle"
        );

        Ok(AuditBundle {
            version: AUDIT_BUNDLE_VERSION,
            leaf_rule: LEAF_RULE.to_string(),
            node_rule: NODE_RULE.to_string(),
            odd_rule: ODD_RULE.to_string(),
            root: tree.root(),
            total_leaves: leaves.len(),
            entries,
        })
    }

    /// Check one entry's inclusion proof against the bundle root
    pub fn verify_entry(&self, index: usize) -> bool {
        match self.entries.get(index) {
            Some(entry) => {
                entry.index == index
                    && MerkleTree::verify_proof(&entry.commitment, &entry.proof, &self.root, index)
            }
            None => false,
        }
    }

    /// Check every entry, and that the entries account for exactly `total_leaves` leaves
    pub fn verify_all(&self) -> bool {
        if self.version != AUDIT_BUNDLE_VERSION || self.entries.len() != self.total_leaves {
            warn!(
                version = self.version,
                entries = self.entries.len(),
                total_leaves = self.total_leaves,
                "audit bundle header is inconsistent"
            );
            return false;
        }

        let failed: Vec<usize> = (0..self.entries.len())
            .filter(|i| !self.verify_entry(*i))
            .collect();
        if !failed.is_empty() {
            warn!(?failed, "audit entries failed verification");
            return false;
        }
        true
    }

    /// Locate a voter's ballot by its commitment
    pub fn find_by_commitment(&self, commitment: &Fq) -> Option<&AuditEntry> {
        let leaf = fq_to_bytes(commitment);
        self.entries.iter().find(|e| e.commitment == leaf)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(commitment: u64, block: u64, tx: u64, log: u64) -> VoteEvent {
        VoteEvent {
            commitment: Fq::from(commitment),
            ciphertext_hash: Fq::from(commitment * 1000),
            tx_hash: [commitment as u8; 32],
            block_number: block,
            tx_index: tx,
            log_index: log,
        }
    }

    #[test]
    fn bundle_orders_by_ledger_position() {
        let events = vec![
            event(3, 2, 0, 0),
            event(1, 1, 0, 0),
            event(2, 1, 1, 0),
            event(4, 2, 0, 1),
        ];
        let bundle = AuditBundle::build(&events).unwrap();

        let order: Vec<Node> = bundle.entries.iter().map(|e| e.commitment).collect();
        let expected: Vec<Node> = [1u64, 2, 3, 4]
            .iter()
            .map(|c| fq_to_bytes(&Fq::from(*c)))
            .collect();
        assert_eq!(order, expected);
        assert_eq!(bundle.total_leaves, 4);
        assert!(bundle.verify_all());
    }

    #[test]
    fn json_round_trip_uses_camel_case() {
        let events: Vec<VoteEvent> = (1..=5).map(|i| event(i, i, 0, 0)).collect();
        let bundle = AuditBundle::build(&events).unwrap();

        let json = bundle.to_json().unwrap();
        for key in [
            "leafRule",
            "nodeRule",
            "oddRule",
            "totalLeaves",
            "txHash",
            "blockNumber",
            "logIndex",
        ] {
            assert!(json.contains(key), "missing {}", key);
        }

        let decoded = AuditBundle::from_json(&json).unwrap();
        assert_eq!(decoded, bundle);
        assert!(decoded.verify_all());
    }

    #[test]
    fn tampering_is_detected() {
        let events: Vec<VoteEvent> = (1..=3).map(|i| event(i, 1, i, 0)).collect();
        let mut bundle = AuditBundle::build(&events).unwrap();
        assert!(bundle.verify_entry(2));
        assert!(!bundle.verify_entry(3));

        bundle.entries[1].commitment[0] ^= 1;
        assert!(!bundle.verify_entry(1));
        assert!(!bundle.verify_all());

        let mut truncated = AuditBundle::build(&events).unwrap();
        truncated.entries.pop();
        assert!(!truncated.verify_all());
    }

    #[test]
    fn lookup_by_commitment() {
        let events: Vec<VoteEvent> = (1..=3).map(|i| event(i, 1, i, 0)).collect();
        let bundle = AuditBundle::build(&events).unwrap();

        let entry = bundle.find_by_commitment(&Fq::from(2u64)).unwrap();
        assert_eq!(entry.index, 1);
        assert!(bundle.find_by_commitment(&Fq::from(9u64)).is_none());
        assert!(AuditBundle::build(&[]).is_err());
    }
}
