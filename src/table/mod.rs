//! Tables, tablets, and the tablet map.
//!
//! A tablet is a contiguous object-id range within a table assigned to this
//! master. All tablets sharing a `table_id` share one `Table`, which owns
//! the table's object-id and version allocators. The tablet map owns the
//! tables; wire descriptors carry only an opaque `user_data` word.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-table allocators.
///
/// Versions drawn for new objects are monotonically increasing per table,
/// never per object: a re-created object continues from wherever the table
/// allocator stands, so clients never observe a version go backwards across
/// remove/create cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    table_id: u64,
    next_object_id: u64,
    next_version: u64,
}

impl Table {
    /// Create a table with fresh allocators.
    pub fn new(table_id: u64) -> Self {
        Self {
            table_id,
            next_object_id: 0,
            next_version: 1,
        }
    }

    /// The table's id.
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Allocate the next object id (0, 1, 2, …).
    pub fn allocate_object_id(&mut self) -> u64 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    /// Allocate the next version for a write to a previously-absent object.
    pub fn allocate_version(&mut self) -> u64 {
        let version = self.next_version;
        self.next_version += 1;
        version
    }

    /// Ensure no future allocation returns a version below `minimum`.
    ///
    /// Called after an in-place overwrite so a later create on this table
    /// cannot re-issue a version some client already observed.
    pub fn raise_version(&mut self, minimum: u64) {
        if self.next_version < minimum {
            self.next_version = minimum;
        }
    }
}

/// Serving state of a tablet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabletState {
    /// Serving client requests.
    Normal,
    /// Being rebuilt by recovery; not yet serving.
    Recovering,
}

/// Wire representation of a tablet assignment.
///
/// `user_data` is opaque on the wire; locally it carries whatever the
/// sender stashed there (the coordinator uses it for partition ids during
/// recovery).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletDescriptor {
    pub table_id: u64,
    pub start_object_id: u64,
    pub end_object_id: u64,
    pub state: TabletState,
    #[serde(default)]
    pub user_data: u64,
}

/// A tablet owned by this master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tablet {
    pub table_id: u64,
    pub start_object_id: u64,
    pub end_object_id: u64,
    pub state: TabletState,
    pub user_data: u64,
}

impl Tablet {
    /// Whether this tablet covers the given key.
    pub fn contains(&self, table_id: u64, object_id: u64) -> bool {
        self.table_id == table_id
            && self.start_object_id <= object_id
            && object_id <= self.end_object_id
    }

    /// Wire descriptor for this tablet.
    pub fn descriptor(&self) -> TabletDescriptor {
        TabletDescriptor {
            table_id: self.table_id,
            start_object_id: self.start_object_id,
            end_object_id: self.end_object_id,
            state: self.state,
            user_data: self.user_data,
        }
    }
}

impl From<&TabletDescriptor> for Tablet {
    fn from(descriptor: &TabletDescriptor) -> Self {
        Self {
            table_id: descriptor.table_id,
            start_object_id: descriptor.start_object_id,
            end_object_id: descriptor.end_object_id,
            state: descriptor.state,
            user_data: descriptor.user_data,
        }
    }
}

/// The ordered set of tablets this master serves, plus their tables.
#[derive(Debug, Default)]
pub struct TabletMap {
    tablets: Vec<Tablet>,
    tables: HashMap<u64, Table>,
}

impl TabletMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            tablets: Vec::new(),
            tables: HashMap::new(),
        }
    }

    /// Resolve a key to its table by linear search over the tablets.
    pub fn find_table(&self, table_id: u64, object_id: u64) -> Option<&Table> {
        self.tablets
            .iter()
            .find(|t| t.contains(table_id, object_id))
            .map(|t| &self.tables[&t.table_id])
    }

    /// Mutable variant of [`find_table`](Self::find_table).
    pub fn find_table_mut(&mut self, table_id: u64, object_id: u64) -> Option<&mut Table> {
        let owning = self
            .tablets
            .iter()
            .find(|t| t.contains(table_id, object_id))?
            .table_id;
        self.tables.get_mut(&owning)
    }

    /// Resolve a table by id alone, for operations (like create) that have
    /// no object id yet.
    pub fn find_table_by_id_mut(&mut self, table_id: u64) -> Option<&mut Table> {
        if !self.tablets.iter().any(|t| t.table_id == table_id) {
            return None;
        }
        self.tables.get_mut(&table_id)
    }

    /// Atomically replace the tablet set.
    ///
    /// Tables survive for every `table_id` present in both the old and new
    /// sets, allocator state intact; ids that only appear in the new set
    /// get fresh tables; tables whose last tablet disappears are dropped.
    pub fn set_tablets(&mut self, descriptors: &[TabletDescriptor]) {
        let mut old_tables = std::mem::take(&mut self.tables);
        let mut tables = HashMap::new();
        for descriptor in descriptors {
            tables.entry(descriptor.table_id).or_insert_with(|| {
                old_tables
                    .remove(&descriptor.table_id)
                    .unwrap_or_else(|| Table::new(descriptor.table_id))
            });
        }
        self.tables = tables;
        self.tablets = descriptors.iter().map(Tablet::from).collect();
    }

    /// The tablets currently installed, in insertion order.
    pub fn tablets(&self) -> &[Tablet] {
        &self.tablets
    }

    /// Wire descriptors for every installed tablet.
    pub fn descriptors(&self) -> Vec<TabletDescriptor> {
        self.tablets.iter().map(Tablet::descriptor).collect()
    }

    /// Number of distinct tables owned.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
