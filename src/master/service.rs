//! The master's request handlers and segment replay.
//!
//! Handlers run to completion on a single serving context: no two of them
//! ever touch the index or the log concurrently, and no handler suspends
//! in the middle of a mutation. The composition is always the same:
//! resolve the tablet, evaluate reject rules against the index, append to
//! the log on mutation, update the index, return the new version.

use crate::buffer::Buffer;
use crate::config::ServerConfig;
use crate::index::{IndexEntry, ObjectMap};
use crate::log::{EntryKind, Log, LogRef, ObjectRecord, ObjectView, Segment, TombstoneRecord};
use crate::observability::Logger;
use crate::table::{TabletDescriptor, TabletMap};

use super::errors::{MasterError, MasterResult};
use super::recovery::{default_backup_shuffle, BackupShuffle};
use super::reject::{reject_operation, RejectRules};
use super::VERSION_NONEXISTENT;

/// The master's in-memory object store.
pub struct Master {
    pub(super) log: Log,
    pub(super) object_map: ObjectMap,
    pub(super) tablets: TabletMap,
    pub(super) shuffle: BackupShuffle,
}

impl Master {
    /// Create an empty master sized from the configuration.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            log: Log::new(config.segment_bytes, config.log_bytes),
            object_map: ObjectMap::with_capacity_for_bytes(config.hash_table_bytes),
            tablets: TabletMap::new(),
            shuffle: default_backup_shuffle(),
        }
    }

    /// Liveness probe; does nothing.
    pub fn ping(&self) {}

    /// Create a new object in a table, at an id of the table's choosing.
    ///
    /// Ids and first versions are drawn from the table's allocators, so
    /// both increase monotonically per table.
    pub fn create(&mut self, table_id: u64, data: &[u8]) -> MasterResult<(u64, u64)> {
        let table = self
            .tablets
            .find_table_by_id_mut(table_id)
            .ok_or(MasterError::TableDoesntExist { table_id })?;
        let object_id = table.allocate_object_id();
        let version = self.write(table_id, object_id, data, None)?;
        Ok((object_id, version))
    }

    /// Read an object's value and version.
    ///
    /// A tombstoned or never-written object reads as absent. On a
    /// rejection the error still carries the observed version.
    pub fn read(
        &self,
        table_id: u64,
        object_id: u64,
        rules: Option<&RejectRules>,
    ) -> MasterResult<(Buffer<'_>, u64)> {
        self.tablets
            .find_table(table_id, object_id)
            .ok_or(MasterError::TableDoesntExist { table_id })?;

        match self.object_map.lookup(table_id, object_id) {
            Some(IndexEntry::Object(log_ref)) => {
                let view = self.owned_object(*log_ref);
                if let Some(rules) = rules {
                    reject_operation(rules, view.version)?;
                }
                Ok((Buffer::with_chunk(view.data), view.version))
            }
            _ => {
                if let Some(rules) = rules {
                    reject_operation(rules, VERSION_NONEXISTENT)?;
                }
                Err(MasterError::ObjectDoesntExist {
                    version: VERSION_NONEXISTENT,
                })
            }
        }
    }

    /// Write an object's value, allocating its next version.
    ///
    /// Overwrites bump the current version by one; writes to an absent
    /// (or tombstoned) object draw from the table allocator. Either way
    /// the allocator is raised above the written version afterwards, so a
    /// later create cannot re-issue a version a client has already seen.
    pub fn write(
        &mut self,
        table_id: u64,
        object_id: u64,
        data: &[u8],
        rules: Option<&RejectRules>,
    ) -> MasterResult<u64> {
        self.tablets
            .find_table(table_id, object_id)
            .ok_or(MasterError::TableDoesntExist { table_id })?;

        let current = self.live_version(table_id, object_id);
        if let Some(rules) = rules {
            reject_operation(rules, current.unwrap_or(VERSION_NONEXISTENT))?;
        }

        let new_version = match current {
            Some(version) => version + 1,
            None => self
                .tablets
                .find_table_mut(table_id, object_id)
                .expect("tablet resolved above")
                .allocate_version(),
        };

        let record = ObjectRecord::new(table_id, object_id, new_version, data.to_vec());
        let log_ref = self.log.append(EntryKind::Object, &record.serialize())?;
        self.object_map
            .replace(table_id, object_id, IndexEntry::Object(log_ref));
        self.tablets
            .find_table_mut(table_id, object_id)
            .expect("tablet resolved above")
            .raise_version(new_version + 1);
        Ok(new_version)
    }

    /// Remove an object, leaving a tombstone in the log and the index.
    ///
    /// Removing an absent or already-removed object is a no-op that
    /// reports `VERSION_NONEXISTENT` (after the rules get their say).
    pub fn remove(
        &mut self,
        table_id: u64,
        object_id: u64,
        rules: Option<&RejectRules>,
    ) -> MasterResult<u64> {
        self.tablets
            .find_table(table_id, object_id)
            .ok_or(MasterError::TableDoesntExist { table_id })?;

        let object_ref = match self.object_map.lookup(table_id, object_id) {
            Some(IndexEntry::Object(log_ref)) => *log_ref,
            _ => {
                if let Some(rules) = rules {
                    reject_operation(rules, VERSION_NONEXISTENT)?;
                }
                return Ok(VERSION_NONEXISTENT);
            }
        };

        let version = self.owned_object(object_ref).version;
        if let Some(rules) = rules {
            reject_operation(rules, version)?;
        }

        // The tombstone records the deleted version and the segment that
        // held the live object, for the cleaner's bookkeeping.
        let tombstone = TombstoneRecord::new(table_id, object_id, version, object_ref.segment_id);
        let tombstone_ref = self
            .log
            .append(EntryKind::Tombstone, &tombstone.serialize())?;
        self.object_map
            .replace(table_id, object_id, IndexEntry::Tombstone(tombstone_ref));
        Ok(version)
    }

    /// Atomically replace the tablet set this master serves.
    pub fn set_tablets(&mut self, descriptors: &[TabletDescriptor]) {
        self.tablets.set_tablets(descriptors);
        let count = descriptors.len().to_string();
        Logger::info(
            "set_tablets",
            &[("message", "Now serving tablets"), ("count", &count)],
        );
        for tablet in self.tablets.tablets() {
            let table = tablet.table_id.to_string();
            let start = tablet.start_object_id.to_string();
            let end = tablet.end_object_id.to_string();
            Logger::info(
                "set_tablets",
                &[("table", &table), ("start", &start), ("end", &end)],
            );
        }
    }

    /// The tablets currently installed, as wire descriptors.
    pub fn tablets(&self) -> Vec<TabletDescriptor> {
        self.tablets.descriptors()
    }

    /// The object index, for inspection.
    pub fn object_map(&self) -> &ObjectMap {
        &self.object_map
    }

    /// Replay one recovery segment into the index.
    ///
    /// Entries are applied in append order; each one is accepted or
    /// dropped by comparing versions against the current index state:
    ///
    /// - An object beats an existing object or tombstone only with a
    ///   strictly newer version.
    /// - A tombstone beats an existing object at an equal or newer
    ///   version, and an existing tombstone only with a newer one.
    /// - Anything lands on an absent key, including tombstones, so that a
    ///   later segment cannot resurrect an object of equal version.
    ///
    /// The outcome is independent of the order segments arrive in.
    /// Accepted entries are copied into this master's own log and the
    /// index points there.
    pub fn recover_segment(&mut self, segment_id: u64, bytes: &[u8]) -> MasterResult<()> {
        let id = segment_id.to_string();
        let size = bytes.len().to_string();
        Logger::info(
            "recover_segment",
            &[("segment_id", &id), ("size", &size)],
        );

        let segment = Segment::from_bytes(segment_id, bytes.to_vec());
        for entry in segment.entries() {
            let entry = entry.map_err(|e| {
                MasterError::Internal(format!("recovery segment {}: {}", segment_id, e))
            })?;
            match entry.kind {
                EntryKind::Object => {
                    let incoming = ObjectView::parse(entry.payload).map_err(|e| {
                        MasterError::Internal(format!("recovery segment {}: {}", segment_id, e))
                    })?;
                    let accept = match self
                        .object_map
                        .lookup(incoming.table_id, incoming.object_id)
                    {
                        Some(IndexEntry::Object(current)) => {
                            incoming.version > self.owned_object(*current).version
                        }
                        Some(IndexEntry::Tombstone(current)) => {
                            incoming.version > self.owned_tombstone(*current).version
                        }
                        None => true,
                    };
                    if accept {
                        let log_ref = self.log.append(EntryKind::Object, entry.payload)?;
                        self.object_map.replace(
                            incoming.table_id,
                            incoming.object_id,
                            IndexEntry::Object(log_ref),
                        );
                    }
                }
                EntryKind::Tombstone => {
                    let incoming = TombstoneRecord::deserialize(entry.payload).map_err(|e| {
                        MasterError::Internal(format!("recovery segment {}: {}", segment_id, e))
                    })?;
                    let accept = match self
                        .object_map
                        .lookup(incoming.table_id, incoming.object_id)
                    {
                        Some(IndexEntry::Object(current)) => {
                            // A tombstone wins a version tie against an
                            // object: the delete happened after the write.
                            incoming.version >= self.owned_object(*current).version
                        }
                        Some(IndexEntry::Tombstone(current)) => {
                            incoming.version > self.owned_tombstone(*current).version
                        }
                        None => true,
                    };
                    if accept {
                        let log_ref = self.log.append(EntryKind::Tombstone, entry.payload)?;
                        self.object_map.replace(
                            incoming.table_id,
                            incoming.object_id,
                            IndexEntry::Tombstone(log_ref),
                        );
                    }
                }
            }
        }

        let message = format!("Segment {} replay complete", segment_id);
        Logger::info("recover_segment", &[("message", &message)]);
        Ok(())
    }

    /// Sweep every tombstone out of the index.
    ///
    /// Called once after all recovery segments replay, so tombstones that
    /// arbitrated the replay stop shadowing their keys; reads for those
    /// keys report `ObjectDoesntExist` from then on.
    pub fn remove_tombstones(&mut self) -> usize {
        let removed = self.object_map.remove_tombstones();
        let count = removed.to_string();
        Logger::info("remove_tombstones", &[("removed", &count)]);
        removed
    }

    /// Version of the live object at a key, `None` for absent or
    /// tombstoned keys.
    fn live_version(&self, table_id: u64, object_id: u64) -> Option<u64> {
        match self.object_map.lookup(table_id, object_id) {
            Some(IndexEntry::Object(log_ref)) => Some(self.owned_object(*log_ref).version),
            _ => None,
        }
    }

    /// Parse an object record the log owns. The log only ever stores
    /// records this master serialized, so failure here is a programming
    /// error.
    fn owned_object(&self, log_ref: LogRef) -> ObjectView<'_> {
        ObjectView::parse(self.log.entry_payload(log_ref))
            .expect("corrupt object record in owned log")
    }

    /// Parse a tombstone record the log owns.
    fn owned_tombstone(&self, log_ref: LogRef) -> TombstoneRecord {
        TombstoneRecord::deserialize(self.log.entry_payload(log_ref))
            .expect("corrupt tombstone record in owned log")
    }
}
