//! LMDB implementation of the shipment ledger.
//!
//! Records live in `shipments` keyed by big-endian id, so a plain cursor walk
//! yields creation order. `sender_index` maps `sender ++ local_index` to the
//! id; the highest key under a sender's prefix gives that sender's count
//! without a scan.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use shiptrack_store::shipment::ensure_same_identity;
use shiptrack_store::{Shipment, ShipmentReader, ShipmentSnapshot, ShipmentStore, StoreError};
use shiptrack_types::{AccountId, ShipmentId};

use crate::LmdbError;

const NEXT_ID_KEY: &[u8] = b"next_id";

pub struct LmdbShipmentStore {
    pub(crate) env: Arc<Env>,
    pub(crate) shipments_db: Database<Bytes, Bytes>,
    pub(crate) sender_index_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

/// Build the 28-byte key `sender ++ local_index_be` for `sender_index`.
fn index_key(sender: &AccountId, local_index: u64) -> [u8; 28] {
    let mut key = [0u8; 28];
    key[..20].copy_from_slice(&sender.to_bytes());
    key[20..].copy_from_slice(&local_index.to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8], what: &str) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization(format!("{what} has unexpected byte length")))?;
    Ok(u64::from_be_bytes(arr))
}

impl LmdbShipmentStore {
    fn next_id(&self, txn: &RoTxn) -> Result<ShipmentId, LmdbError> {
        match self.meta_db.get(txn, NEXT_ID_KEY)? {
            Some(bytes) => decode_u64(bytes, "next_id"),
            None => Ok(0),
        }
    }

    fn count_in(&self, txn: &RoTxn, sender: &AccountId) -> Result<u64, LmdbError> {
        let lower = index_key(sender, 0);
        let upper = index_key(sender, u64::MAX);
        let bounds = (
            Bound::Included(&lower[..]),
            Bound::Included(&upper[..]),
        );
        match self.sender_index_db.rev_range(txn, &bounds)?.next() {
            Some(entry) => {
                let (key, _) = entry?;
                Ok(decode_u64(&key[20..], "sender index key")? + 1)
            }
            None => Ok(0),
        }
    }

    fn id_in(&self, txn: &RoTxn, sender: &AccountId, local_index: u64) -> Result<ShipmentId, LmdbError> {
        let key = index_key(sender, local_index);
        let bytes = self
            .sender_index_db
            .get(txn, &key[..])?
            .ok_or_else(|| LmdbError::NotFound(format!("shipment {sender}/{local_index}")))?;
        decode_u64(bytes, "sender index value")
    }

    fn record_in(&self, txn: &RoTxn, id: ShipmentId) -> Result<Shipment, LmdbError> {
        let bytes = self
            .shipments_db
            .get(txn, &id.to_be_bytes()[..])?
            .ok_or_else(|| LmdbError::NotFound(format!("shipment id {id}")))?;
        Ok(bincode::deserialize(bytes)?)
    }
}

impl ShipmentReader for LmdbShipmentStore {
    fn get(&self, sender: &AccountId, local_index: u64) -> Result<Shipment, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let id = self.id_in(&rtxn, sender, local_index)?;
        Ok(self.record_in(&rtxn, id)?)
    }

    fn get_by_id(&self, id: ShipmentId) -> Result<Shipment, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.record_in(&rtxn, id)?)
    }

    fn all(&self) -> Result<ShipmentSnapshot, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut shipments = Vec::new();
        for entry in self.shipments_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            shipments.push(bincode::deserialize(bytes).map_err(LmdbError::from)?);
        }
        Ok(ShipmentSnapshot::new(shipments))
    }

    fn count_for(&self, sender: &AccountId) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.count_in(&rtxn, sender)?)
    }

    fn len(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.shipments_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl ShipmentStore for LmdbShipmentStore {
    fn append(&self, mut shipment: Shipment) -> Result<(ShipmentId, u64), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let id = self.next_id(&wtxn)?;
        let next = id
            .checked_add(1)
            .ok_or_else(|| StoreError::Overflow("shipment id space exhausted".into()))?;
        let local_index = self.count_in(&wtxn, &shipment.sender)?;

        shipment.id = id;
        let bytes = bincode::serialize(&shipment).map_err(LmdbError::from)?;
        self.shipments_db
            .put(&mut wtxn, &id.to_be_bytes()[..], &bytes)
            .map_err(LmdbError::from)?;
        self.sender_index_db
            .put(&mut wtxn, &index_key(&shipment.sender, local_index)[..], &id.to_be_bytes()[..])
            .map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, NEXT_ID_KEY, &next.to_be_bytes()[..])
            .map_err(LmdbError::from)?;

        wtxn.commit().map_err(LmdbError::from)?;
        tracing::trace!(id, local_index, "appended shipment");
        Ok((id, local_index))
    }

    fn update<F>(&self, sender: &AccountId, local_index: u64, mutator: F) -> Result<Shipment, StoreError>
    where
        F: FnOnce(&mut Shipment),
    {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let id = self.id_in(&wtxn, sender, local_index)?;
        let before = self.record_in(&wtxn, id)?;
        let mut after = before.clone();
        mutator(&mut after);
        ensure_same_identity(&before, &after)?;

        let bytes = bincode::serialize(&after).map_err(LmdbError::from)?;
        self.shipments_db
            .put(&mut wtxn, &id.to_be_bytes()[..], &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiptrack_types::{Amount, ShipmentStatus, Timestamp};

    fn account(b: u8) -> AccountId {
        AccountId::from_bytes([b; 20])
    }

    fn shipment(sender: u8) -> Shipment {
        Shipment::pending(account(sender), account(0xee), Timestamp::new(100), 42, Amount::ONE)
    }

    fn open_test_env() -> (tempfile::TempDir, crate::LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = crate::LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        (dir, env)
    }

    #[test]
    fn append_assigns_sequential_ids_and_local_indices() {
        let (_dir, env) = open_test_env();
        let store = env.shipment_store();

        assert_eq!(store.append(shipment(1)).unwrap(), (0, 0));
        assert_eq!(store.append(shipment(2)).unwrap(), (1, 0));
        assert_eq!(store.append(shipment(1)).unwrap(), (2, 1));

        assert_eq!(store.len().unwrap(), 3);
        assert_eq!(store.count_for(&account(1)).unwrap(), 2);
        assert_eq!(store.count_for(&account(2)).unwrap(), 1);
        assert_eq!(store.count_for(&account(3)).unwrap(), 0);
        assert_eq!(store.get(&account(1), 1).unwrap().id, 2);
    }

    #[test]
    fn neighbouring_senders_do_not_share_counts() {
        let (_dir, env) = open_test_env();
        let store = env.shipment_store();
        store.append(shipment(0x10)).unwrap();
        store.append(shipment(0x11)).unwrap();
        store.append(shipment(0x11)).unwrap();

        assert_eq!(store.count_for(&account(0x10)).unwrap(), 1);
        assert_eq!(store.count_for(&account(0x11)).unwrap(), 2);
    }

    #[test]
    fn missing_entries_are_not_found() {
        let (_dir, env) = open_test_env();
        let store = env.shipment_store();
        store.append(shipment(1)).unwrap();

        assert!(matches!(store.get(&account(1), 1), Err(StoreError::NotFound(_))));
        assert!(matches!(store.get(&account(9), 0), Err(StoreError::NotFound(_))));
        assert!(matches!(store.get_by_id(7), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_persists_the_mutation() {
        let (_dir, env) = open_test_env();
        let store = env.shipment_store();
        store.append(shipment(1)).unwrap();

        let updated = store
            .update(&account(1), 0, |s| s.status = ShipmentStatus::InTransit)
            .unwrap();
        assert_eq!(updated.status, ShipmentStatus::InTransit);
        assert_eq!(store.get_by_id(0).unwrap().status, ShipmentStatus::InTransit);
    }

    #[test]
    fn update_refuses_identity_change() {
        let (_dir, env) = open_test_env();
        let store = env.shipment_store();
        store.append(shipment(1)).unwrap();

        assert!(store.update(&account(1), 0, |s| s.id = 5).is_err());
        assert_eq!(store.get_by_id(0).unwrap().id, 0);
    }

    #[test]
    fn snapshot_is_in_creation_order() {
        let (_dir, env) = open_test_env();
        let store = env.shipment_store();
        for sender in [3, 1, 2] {
            store.append(shipment(sender)).unwrap();
        }

        let snapshot = store.all().unwrap();
        let senders: Vec<_> = snapshot.iter().map(|s| s.sender.clone()).collect();
        assert_eq!(senders, vec![account(3), account(1), account(2)]);

        store.append(shipment(4)).unwrap();
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = crate::LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
            let store = env.shipment_store();
            store.append(shipment(1)).unwrap();
            store.append(shipment(1)).unwrap();
        }

        let env = crate::LmdbEnvironment::open(dir.path(), 1 << 20).unwrap();
        let store = env.shipment_store();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.append(shipment(1)).unwrap(), (2, 2));
        assert_eq!(store.get(&account(1), 0).unwrap(), {
            let mut s = shipment(1);
            s.id = 0;
            s
        });
    }
}
