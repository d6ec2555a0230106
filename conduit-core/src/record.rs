//! Record shapes: domain records and the persistence records stores hold

use std::fmt::Debug;

use crate::identity::KeyValue;

/// A record type the pipeline can carry.
pub trait Record: Clone + Debug + Send + Sync + 'static {
    /// Name used in logs, messages and configuration errors.
    const RECORD_NAME: &'static str;

    /// Whether add/update/delete commands are allowed on this record type.
    const SUPPORTS_COMMANDS: bool = true;
}

/// A record shape a store persists.
pub trait StoreRecord: Record {
    /// Whether the store generates this record's key on insert.
    const STORE_ASSIGNED_KEY: bool = false;

    /// The primary key in its primitive storage form.
    fn key_value(&self) -> KeyValue;

    /// Called by stores that generate keys, before the record is persisted.
    fn assign_key(&mut self, _key: KeyValue) {}
}
