//! Crash-recovery orchestration.
//!
//! A recovering master starts empty, fetches the crashed master's log
//! segments from backup replicas, replays each one, and finally hands the
//! rebuilt tablets to the coordinator. The advertised backup list is
//! redundant (one segment may be held by several backups) and unordered,
//! so the engine deduplicates segments, spreads load by shuffling each
//! segment's candidates, and fails over to the next backup when a fetch
//! fails. Only exhausting every backup for some segment fails the whole
//! recovery.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;

use crate::backup::{BackupClient, BackupEntry};
use crate::coordinator::CoordinatorClient;
use crate::observability::Logger;
use crate::table::{TabletDescriptor, TabletState};

use super::errors::{MasterError, MasterResult};
use super::service::Master;

/// Reorders the candidate backups for one segment.
///
/// Injectable so tests can pin the fetch order; the default spreads load
/// across equivalent backups at random.
pub type BackupShuffle = Box<dyn FnMut(&mut [usize]) + Send>;

/// The default shuffle: uniformly random.
pub fn default_backup_shuffle() -> BackupShuffle {
    Box::new(|order| order.shuffle(&mut rand::thread_rng()))
}

/// The consumed-protocol endpoints a recovery needs.
pub struct RecoveryTransports<'a> {
    pub backups: &'a mut dyn BackupClient,
    pub coordinator: &'a mut dyn CoordinatorClient,
}

impl Master {
    /// Replace the backup-choice shuffle. Tests install a deterministic
    /// one.
    pub fn set_backup_shuffle(&mut self, shuffle: BackupShuffle) {
        self.shuffle = shuffle;
    }

    /// Recover one partition of a crashed master.
    ///
    /// `tablets` are the partition's tablets (marked Recovering);
    /// `backups` advertises which backup holds which segment, possibly
    /// redundantly. On success the tablets are installed as Normal and
    /// the coordinator is notified.
    pub fn recover(
        &mut self,
        master_id: u64,
        partition_id: u64,
        tablets: &[TabletDescriptor],
        backups: &[BackupEntry],
        transports: &mut RecoveryTransports<'_>,
    ) -> MasterResult<()> {
        let message = format!(
            "Recovering master {}, partition {}, {} hosts",
            master_id,
            partition_id,
            backups.len()
        );
        Logger::info("recover", &[("message", &message)]);

        let mut failed: HashSet<String> = HashSet::new();

        // startReadingData is idempotent on the backup side; a backup that
        // cannot even accept it is marked failed and skipped below.
        let mut contacted: HashSet<&str> = HashSet::new();
        for entry in backups {
            if !contacted.insert(entry.service_locator.as_str()) {
                continue;
            }
            if let Err(e) =
                transports
                    .backups
                    .start_reading_data(&entry.service_locator, master_id, tablets)
            {
                let message = format!(
                    "startReadingData failed on {}; failure was: {}",
                    entry.service_locator, e
                );
                Logger::warn("recover", &[("message", &message)]);
                failed.insert(entry.service_locator.clone());
            }
        }

        // segment_id -> advertised locators, preserving input order and
        // dropping duplicate locators per segment.
        let mut segment_order: Vec<u64> = Vec::new();
        let mut candidates: HashMap<u64, Vec<&str>> = HashMap::new();
        for entry in backups {
            let locators = candidates.entry(entry.segment_id).or_insert_with(|| {
                segment_order.push(entry.segment_id);
                Vec::new()
            });
            if !locators.contains(&entry.service_locator.as_str()) {
                locators.push(&entry.service_locator);
            }
        }

        for segment_id in segment_order {
            let locators = &candidates[&segment_id];
            let mut order: Vec<usize> = (0..locators.len()).collect();
            (self.shuffle)(&mut order);

            let mut replayed = false;
            for index in order {
                let locator = locators[index];
                if failed.contains(locator) {
                    continue;
                }

                let message =
                    format!("Starting getRecoveryData from {} for segment {}", locator, segment_id);
                Logger::info("recover", &[("message", &message)]);
                let message =
                    format!("Waiting on recovery data for segment {} from {}", segment_id, locator);
                Logger::info("recover", &[("message", &message)]);

                match transports.backups.get_recovery_data(
                    locator,
                    master_id,
                    segment_id,
                    partition_id,
                    tablets,
                ) {
                    Ok(bytes) => {
                        let message =
                            format!("Checking {} off the list for {}", locator, segment_id);
                        Logger::info("recover", &[("message", &message)]);
                        let message =
                            format!("Recovering segment {} with size {}", segment_id, bytes.len());
                        Logger::info("recover", &[("message", &message)]);
                        self.recover_segment(segment_id, &bytes)?;
                        replayed = true;
                        break;
                    }
                    Err(e) => {
                        let message = format!(
                            "getRecoveryData failed on {}, trying next backup; failure was: {}",
                            locator, e
                        );
                        Logger::warn("recover", &[("message", &message)]);
                        failed.insert(locator.to_string());
                    }
                }
            }

            if !replayed {
                return Err(MasterError::SegmentRecoveryFailed { segment_id });
            }
        }

        self.remove_tombstones();

        // Hand the partition over: recovered tablets switch to Normal and
        // join whatever this master already serves.
        let mut recovered = Vec::with_capacity(tablets.len());
        for descriptor in tablets {
            let mut descriptor = descriptor.clone();
            descriptor.state = TabletState::Normal;
            let message = format!(
                "set tablet {} {} {}",
                descriptor.table_id, descriptor.start_object_id, descriptor.end_object_id
            );
            Logger::info("recover", &[("message", &message)]);
            recovered.push(descriptor);
        }

        let mut served = self.tablets.descriptors();
        served.extend(recovered.iter().cloned());
        let message = format!("tabletsRecovered: called with {} tablets", recovered.len());
        Logger::info("recover", &[("message", &message)]);
        self.set_tablets(&served);

        transports
            .coordinator
            .tablets_recovered(master_id, &recovered)
            .map_err(|e| MasterError::Transport(e.to_string()))?;
        Ok(())
    }
}
