//! The storage collaborator boundary (§4.6).
//!
//! On-disk storage engines are an external collaborator's concern: this
//! trait is the seam a real daemon binary plugs a storage engine into. The
//! handler and auth layers only ever see `RegionStore`, never a concrete
//! engine, mirroring how `hyperbase_kernel::runtime::ReplicatedLog` keeps
//! the coordinator's host out of the kernel crate.

use hyperbase_types::Value;

/// A region's local keyspace, scoped to one `(region_id, virtual_server_id)`
/// the daemon currently hosts. Durability of an individual write is the
/// collaborator's responsibility; this trait only describes the
/// read/write/delete shape the handler drives.
pub trait RegionStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Looks up the secondary attribute values stored for `key`, in schema
    /// order, or `None` if no record exists.
    fn get(&self, key: &Value) -> Result<Option<Vec<Value>>, Self::Error>;

    /// Unconditionally installs `attrs` as the record for `key`, replacing
    /// whatever was stored before.
    fn put(&mut self, key: &Value, attrs: Vec<Value>) -> Result<(), Self::Error>;

    /// Removes the record for `key`, if any. Returns whether a record was
    /// actually present.
    fn delete(&mut self, key: &Value) -> Result<bool, Self::Error>;

    /// Iterates every `(key, attrs)` pair currently stored in the region,
    /// for the search/count/sum/group-* family. Order is unspecified; the
    /// handler applies predicate filtering after this call.
    fn scan(&self) -> Result<Vec<(Value, Vec<Value>)>, Self::Error>;
}

/// An in-memory `RegionStore` used by tests and the loopback daemon
/// harness. Never intended for production use -- the real engine is an
/// external collaborator. `Value` has no `Hash`/`Eq` impl
/// (the `Float` variant can't provide one), so this keeps records in a
/// flat `Vec` and does linear lookups; fine for a test double.
#[derive(Debug, Default)]
pub struct MemoryRegionStore {
    records: Vec<(Value, Vec<Value>)>,
}

impl MemoryRegionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegionStore for MemoryRegionStore {
    type Error = std::convert::Infallible;

    fn get(&self, key: &Value) -> Result<Option<Vec<Value>>, Self::Error> {
        Ok(self.records.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    }

    fn put(&mut self, key: &Value, attrs: Vec<Value>) -> Result<(), Self::Error> {
        match self.records.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = attrs,
            None => self.records.push((key.clone(), attrs)),
        }
        Ok(())
    }

    fn delete(&mut self, key: &Value) -> Result<bool, Self::Error> {
        let before = self.records.len();
        self.records.retain(|(k, _)| k != key);
        Ok(self.records.len() != before)
    }

    fn scan(&self) -> Result<Vec<(Value, Vec<Value>)>, Self::Error> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let mut store = MemoryRegionStore::new();
        let key = Value::String(b"hello".to_vec());
        store.put(&key, vec![Value::Int64(1)]).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(vec![Value::Int64(1)]));
    }

    #[test]
    fn delete_reports_whether_a_record_existed() {
        let mut store = MemoryRegionStore::new();
        let key = Value::String(b"hello".to_vec());
        assert!(!store.delete(&key).unwrap());
        store.put(&key, vec![]).unwrap();
        assert!(store.delete(&key).unwrap());
        assert_eq!(store.get(&key).unwrap(), None);
    }
}
