use crate::*;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("transaction {0} not found")]
pub struct TransactionNotFound(pub Identifier);

/// A transaction store
pub trait Store {
    /// Get a transaction of an unknown type
    fn get_transaction(&self, id: Identifier) -> Option<SignedTransaction>;

    /// Get a transaction of a known type
    fn get<T>(&self, id: Identifier) -> Result<Signed<T>, TransactionNotFound>
    where
        T: Signable,
        Signed<T>: TryFrom<SignedTransaction>,
    {
        self.get_transaction(id)
            .and_then(|tx| Signed::<T>::try_from(tx).ok())
            .ok_or(TransactionNotFound(id))
    }

    /// Get an election transaction
    fn get_election(
        &self,
        id: Identifier,
    ) -> Result<Signed<ElectionTransaction>, TransactionNotFound> {
        self.get(id)
    }

    /// Get a Tally transaction
    fn get_tally(&self, id: Identifier) -> Result<Signed<TallyTransaction>, TransactionNotFound> {
        self.get(id)
    }
}

/// A simple store that uses an in-memory BTreeMap
#[derive(Default, Clone)]
pub struct MemStore {
    inner: BTreeMap<Identifier, SignedTransaction>,
}

impl MemStore {
    pub fn set(&mut self, tx: SignedTransaction) {
        self.inner.insert(tx.id(), tx);
    }

    pub(crate) fn remove(&mut self, id: Identifier) {
        self.inner.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All transactions of one type within an election, in identifier order
    pub fn get_multiple(
        &self,
        election_id: Identifier,
        tx_type: TransactionType,
    ) -> Vec<SignedTransaction> {
        let start = Identifier {
            election_id: election_id.election_id,
            transaction_type: tx_type,
            unique_id: None,
        };
        let end = Identifier {
            unique_id: Some([0xff; 16]),
            ..start
        };

        self.inner
            .range(start..=end)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl Store for MemStore {
    fn get_transaction(&self, id: Identifier) -> Option<SignedTransaction> {
        self.inner.get(&id).cloned()
    }
}

impl From<Vec<SignedTransaction>> for MemStore {
    fn from(item: Vec<SignedTransaction>) -> Self {
        let mut memstore = MemStore::default();
        for tx in item {
            memstore.set(tx);
        }
        memstore
    }
}
