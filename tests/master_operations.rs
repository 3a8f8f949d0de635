//! Master request-handler scenarios: create, read, write, remove,
//! set_tablets, and reject-rule behavior observed end to end.

use tabletdb::config::ServerConfig;
use tabletdb::master::{Master, MasterError, RejectRules, VERSION_NONEXISTENT};
use tabletdb::table::{TabletDescriptor, TabletState};

// =============================================================================
// Test Utilities
// =============================================================================

fn descriptor(table_id: u64, start: u64, end: u64) -> TabletDescriptor {
    TabletDescriptor {
        table_id,
        start_object_id: start,
        end_object_id: end,
        state: TabletState::Normal,
        user_data: 0,
    }
}

/// A master serving table 0 over the full object-id range.
fn test_master() -> Master {
    let mut master = Master::new(&ServerConfig::default());
    master.set_tablets(&[descriptor(0, 0, u64::MAX)]);
    master
}

fn ne_rules(given_version: u64) -> RejectRules {
    RejectRules {
        version_ne_given: true,
        given_version,
        ..Default::default()
    }
}

// =============================================================================
// create
// =============================================================================

#[test]
fn test_create_basics() {
    let mut master = test_master();

    assert_eq!(master.create(0, b"item0").unwrap(), (0, 1));
    assert_eq!(master.create(0, b"item1").unwrap(), (1, 2));
    assert_eq!(master.create(0, b"item2").unwrap(), (2, 3));

    for (id, expected) in [(0, &b"item0"[..]), (1, b"item1"), (2, b"item2")] {
        let (value, _) = master.read(0, id, None).unwrap();
        assert_eq!(value.to_vec(), expected);
    }
}

#[test]
fn test_create_bad_table() {
    let mut master = test_master();
    let err = master.create(4, b"").unwrap_err();
    assert_eq!(err, MasterError::TableDoesntExist { table_id: 4 });
    // The numeric status for a missing table is part of the wire contract.
    assert_eq!(err.status().code(), 1);
}

// =============================================================================
// ping
// =============================================================================

#[test]
fn test_ping() {
    test_master().ping();
}

// =============================================================================
// read
// =============================================================================

#[test]
fn test_read_basics() {
    let mut master = test_master();
    master.create(0, b"abcdef").unwrap();

    let (value, version) = master.read(0, 0, None).unwrap();
    assert_eq!(version, 1);
    assert_eq!(value.to_vec(), b"abcdef");
}

#[test]
fn test_read_bad_table() {
    let master = test_master();
    assert_eq!(
        master.read(4, 0, None).unwrap_err(),
        MasterError::TableDoesntExist { table_id: 4 }
    );
}

#[test]
fn test_read_no_such_object() {
    let master = test_master();
    assert_eq!(
        master.read(0, 5, None).unwrap_err(),
        MasterError::ObjectDoesntExist {
            version: VERSION_NONEXISTENT
        }
    );
}

#[test]
fn test_read_reject_rules() {
    let mut master = test_master();
    master.create(0, b"abcdef").unwrap();

    let err = master.read(0, 0, Some(&ne_rules(2))).unwrap_err();
    assert_eq!(err, MasterError::WrongVersion { version: 1 });
    // The observed version is reported even on failure.
    assert_eq!(err.version(), Some(1));
}

// =============================================================================
// write
// =============================================================================

#[test]
fn test_write() {
    let mut master = test_master();

    assert_eq!(master.write(0, 3, b"item0", None).unwrap(), 1);
    let (value, version) = master.read(0, 3, None).unwrap();
    assert_eq!(value.to_vec(), b"item0");
    assert_eq!(version, 1);

    assert_eq!(master.write(0, 3, b"item0-v2", None).unwrap(), 2);
    let (value, _) = master.read(0, 3, None).unwrap();
    assert_eq!(value.to_vec(), b"item0-v2");

    assert_eq!(master.write(0, 3, b"item0-v3", None).unwrap(), 3);
    let (value, version) = master.read(0, 3, None).unwrap();
    assert_eq!(value.to_vec(), b"item0-v3");
    assert_eq!(version, 3);
}

#[test]
fn test_write_reject_rules() {
    let mut master = test_master();

    let rules = RejectRules {
        doesnt_exist: true,
        ..Default::default()
    };
    let err = master.write(0, 3, b"item0", Some(&rules)).unwrap_err();
    assert_eq!(
        err,
        MasterError::ObjectDoesntExist {
            version: VERSION_NONEXISTENT
        }
    );
    assert_eq!(err.version(), Some(VERSION_NONEXISTENT));
}

#[test]
fn test_write_versions_strictly_increase() {
    let mut master = test_master();
    let mut last = 0;
    for round in 0..10u8 {
        let version = master.write(0, 7, &[round], None).unwrap();
        assert!(version > last);
        last = version;
    }
}

// =============================================================================
// remove
// =============================================================================

#[test]
fn test_remove_basics() {
    let mut master = test_master();
    master.create(0, b"item0").unwrap();

    assert_eq!(master.remove(0, 0, None).unwrap(), 1);
    assert_eq!(
        master.read(0, 0, None).unwrap_err(),
        MasterError::ObjectDoesntExist {
            version: VERSION_NONEXISTENT
        }
    );
}

#[test]
fn test_remove_bad_table() {
    let mut master = test_master();
    assert_eq!(
        master.remove(4, 0, None).unwrap_err(),
        MasterError::TableDoesntExist { table_id: 4 }
    );
}

#[test]
fn test_remove_reject_rules() {
    let mut master = test_master();
    master.create(0, b"item0").unwrap();

    let err = master.remove(0, 0, Some(&ne_rules(2))).unwrap_err();
    assert_eq!(err, MasterError::WrongVersion { version: 1 });
    assert_eq!(err.version(), Some(1));
}

#[test]
fn test_remove_object_already_deleted_reject_rules() {
    let mut master = test_master();

    let rules = RejectRules {
        doesnt_exist: true,
        ..Default::default()
    };
    let err = master.remove(0, 0, Some(&rules)).unwrap_err();
    assert_eq!(
        err,
        MasterError::ObjectDoesntExist {
            version: VERSION_NONEXISTENT
        }
    );
    assert_eq!(err.version(), Some(VERSION_NONEXISTENT));
}

#[test]
fn test_remove_object_already_deleted() {
    let mut master = test_master();

    // Never-written object: no-op.
    assert_eq!(master.remove(0, 1, None).unwrap(), VERSION_NONEXISTENT);

    // Tombstoned object: also a no-op.
    master.create(0, b"abcdef").unwrap();
    master.remove(0, 0, None).unwrap();
    assert_eq!(master.remove(0, 0, None).unwrap(), VERSION_NONEXISTENT);
}

#[test]
fn test_versions_never_regress_across_remove_create() {
    let mut master = test_master();

    let (id, first) = master.create(0, b"first").unwrap();
    master.remove(0, id, None).unwrap();
    let (_, second) = master.create(0, b"second").unwrap();
    // The re-created object draws from the table allocator; versions keep
    // moving forward.
    assert!(second > first);
}

// =============================================================================
// set_tablets
// =============================================================================

#[test]
fn test_set_tablets_clears() {
    let mut master = test_master();
    master.set_tablets(&[]);
    assert!(master.tablets().is_empty());
    assert_eq!(
        master.create(0, b"x").unwrap_err(),
        MasterError::TableDoesntExist { table_id: 0 }
    );
}

#[test]
fn test_set_tablets_reuses_tables() {
    let mut master = Master::new(&ServerConfig::default());
    master.set_tablets(&[descriptor(1, 0, 1), descriptor(2, 0, 1)]);

    // Burn allocator state on table 2.
    master.write(2, 0, b"a", None).unwrap();
    master.write(2, 1, b"b", None).unwrap();

    // Table 1 departs; table 2 splits into two tablets; table 3 is new.
    master.set_tablets(&[
        descriptor(2, 0, 1),
        descriptor(2, 2, 3),
        descriptor(3, 0, 1),
    ]);

    // Table 2 kept its allocator: the next fresh version continues.
    assert_eq!(master.write(2, 2, b"c", None).unwrap(), 3);
    // Table 3 is brand new.
    assert_eq!(master.write(3, 0, b"d", None).unwrap(), 1);
    // Table 1 is gone.
    assert_eq!(
        master.read(1, 0, None).unwrap_err(),
        MasterError::TableDoesntExist { table_id: 1 }
    );
}

#[test]
fn test_get_table_range_boundaries() {
    let mut master = Master::new(&ServerConfig::default());
    master.set_tablets(&[descriptor(9, 10, 19)]);

    // Inside the range: the object merely doesn't exist.
    assert_eq!(
        master.read(9, 10, None).unwrap_err(),
        MasterError::ObjectDoesntExist {
            version: VERSION_NONEXISTENT
        }
    );
    // Outside the range: no tablet covers the key.
    assert_eq!(
        master.read(9, 20, None).unwrap_err(),
        MasterError::TableDoesntExist { table_id: 9 }
    );
}
