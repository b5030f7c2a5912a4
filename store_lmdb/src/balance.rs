//! LMDB implementation of BalanceStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use shiptrack_store::{BalanceStore, Payout, StoreError};
use shiptrack_types::{AccountId, Amount, ShipmentId};

use crate::LmdbError;

pub struct LmdbBalanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) balances_db: Database<Bytes, Bytes>,
    pub(crate) payouts_db: Database<Bytes, Bytes>,
}

fn decode_amount(bytes: &[u8]) -> Result<Amount, LmdbError> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization("balance has unexpected byte length".to_string()))?;
    Ok(Amount::new(u128::from_be_bytes(arr)))
}

impl BalanceStore for LmdbBalanceStore {
    fn pay(&self, payout: &Payout) -> Result<(), StoreError> {
        let id_key = payout.shipment.to_be_bytes();
        let account_key = payout.payee.to_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .payouts_db
            .get(&wtxn, &id_key[..])
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Ok(());
        }
        let current = match self
            .balances_db
            .get(&wtxn, &account_key[..])
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode_amount(bytes)?,
            None => Amount::ZERO,
        };
        let updated = current
            .checked_add(payout.amount)
            .ok_or_else(|| StoreError::Overflow(format!("balance of {}", payout.payee)))?;
        let record = bincode::serialize(payout).map_err(LmdbError::from)?;
        self.balances_db
            .put(&mut wtxn, &account_key[..], &updated.raw().to_be_bytes()[..])
            .map_err(LmdbError::from)?;
        self.payouts_db
            .put(&mut wtxn, &id_key[..], &record)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn payout_for(&self, shipment: ShipmentId) -> Result<Option<Payout>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .payouts_db
            .get(&rtxn, &shipment.to_be_bytes()[..])
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn balance_of(&self, account: &AccountId) -> Result<Amount, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .balances_db
            .get(&rtxn, &account.to_bytes()[..])
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(decode_amount(bytes)?),
            None => Ok(Amount::ZERO),
        }
    }
}
