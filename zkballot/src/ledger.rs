//! An in-memory append-only ledger.
//!
//! Each block is validated as a whole: if any transaction in it is rejected, none of the
//! block is applied.

use crate::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Default, Clone)]
pub struct Ledger {
    store: MemStore,
    elections: HashMap<[u8; 15], ElectionState>,
    events: Vec<([u8; 15], VoteEvent)>,
    block_number: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single transaction in a block of its own
    pub fn apply(&mut self, tx: SignedTransaction) -> Result<(), ValidationError> {
        self.apply_block(vec![tx])
    }

    /// Apply an ordered block of transactions atomically
    ///
    /// Transactions are applied in place and journaled. If one is rejected, the ones before
    /// it are undone in reverse order.
    pub fn apply_block(&mut self, txs: Vec<SignedTransaction>) -> Result<(), ValidationError> {
        self.block_number += 1;

        let mut applied = Vec::with_capacity(txs.len());
        let mut log_index = 0;
        for (tx_index, tx) in txs.into_iter().enumerate() {
            let id = tx.id();
            if let Err(e) = self.apply_tx(tx, tx_index as u64, &mut log_index) {
                warn!(block = self.block_number, tx_index, error = %e, "block rejected");
                for id in applied.into_iter().rev() {
                    self.rollback_tx(id);
                }
                self.block_number -= 1;
                return Err(e);
            }
            applied.push(id);
        }

        debug!(block = self.block_number, txs = applied.len(), "block applied");
        Ok(())
    }

    fn apply_tx(
        &mut self,
        tx: SignedTransaction,
        tx_index: u64,
        log_index: &mut u64,
    ) -> Result<(), ValidationError> {
        for input in tx.inputs() {
            if self.store.get_transaction(input).is_none() {
                return Err(TransactionNotFound(input).into());
            }
        }

        let election_id = tx.id().election_id;
        tx.validate(&self.store, self.elections.get(&election_id))?;

        match &tx {
            SignedTransaction::Election(election) => {
                self.elections
                    .insert(election_id, ElectionState::new(election));
                info!(election = %election.id, candidates = election.num_candidates(), "election created");
            }
            SignedTransaction::VotingStart(_) => {
                self.state_mut(election_id)?.transition(Phase::Active)?;
                info!(tx = %tx.id(), "voting opened");
            }
            SignedTransaction::Vote(vote) => {
                self.state_mut(election_id)?
                    .record_ballot(&vote.voter_public, &vote.ballot)?;
                let event = VoteEvent {
                    commitment: vote.ballot.commitment,
                    ciphertext_hash: vote.ballot.ciphertext_hash,
                    tx_hash: tx.hash(),
                    block_number: self.block_number,
                    tx_index,
                    log_index: *log_index,
                };
                self.events.push((election_id, event));
                *log_index += 1;
                debug!(vote = %vote.id, "ballot accepted");
            }
            SignedTransaction::VotingEnd(_) => {
                self.state_mut(election_id)?.transition(Phase::Ended)?;
                info!(tx = %tx.id(), "voting closed");
            }
            SignedTransaction::Tally(tally) => {
                self.state_mut(election_id)?
                    .record_results(tally.tally.results.clone())?;
                info!(tx = %tx.id(), results = ?tally.tally.results, "election tallied");
            }
        }

        self.store.set(tx);
        Ok(())
    }

    /// Undo a transaction applied earlier in the current block
    fn rollback_tx(&mut self, id: Identifier) {
        let tx = match self.store.get_transaction(id) {
            Some(tx) => tx,
            None => return,
        };
        let election_id = id.election_id;

        match &tx {
            SignedTransaction::Election(_) => {
                self.elections.remove(&election_id);
            }
            SignedTransaction::VotingStart(_) => self.rollback_phase(election_id, Phase::Created),
            SignedTransaction::VotingEnd(_) => self.rollback_phase(election_id, Phase::Active),
            SignedTransaction::Tally(_) => self.rollback_phase(election_id, Phase::Ended),
            SignedTransaction::Vote(vote) => {
                if let Some(state) = self.elections.get_mut(&election_id) {
                    state.rollback_ballot(&vote.voter_public, &vote.ballot);
                }
                self.events.pop();
            }
        }

        self.store.remove(id);
        debug!(tx = %id, "rolled back");
    }

    fn rollback_phase(&mut self, election_id: [u8; 15], previous: Phase) {
        if let Some(state) = self.elections.get_mut(&election_id) {
            state.rollback_phase(previous);
        }
    }

    fn state_mut(&mut self, election_id: [u8; 15]) -> Result<&mut ElectionState, ValidationError> {
        self.elections
            .get_mut(&election_id)
            .ok_or(ValidationError::ElectionMismatch)
    }

    pub fn state(&self, election: Identifier) -> Option<&ElectionState> {
        self.elections.get(&election.election_id)
    }

    pub fn store(&self) -> &MemStore {
        &self.store
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// The accepted tally for `election`, if there is one
    pub fn tally(&self, election: Identifier) -> Option<Tally> {
        let id = Identifier::new(election, TransactionType::Tally, None);
        self.store.get_tally(id).ok().map(|tx| tx.tx.tally)
    }

    /// Vote events for one election, in ledger order
    pub fn events(&self, election: Identifier) -> Vec<VoteEvent> {
        self.events
            .iter()
            .filter(|(id, _)| *id == election.election_id)
            .map(|(_, event)| *event)
            .collect()
    }

    /// Audit bundle over every ballot accepted for `election`
    pub fn audit_bundle(&self, election: Identifier) -> Result<AuditBundle, Error> {
        AuditBundle::build(&self.events(election))
    }
}
