//! Optimistic-concurrency reject rules.
//!
//! A client may attach a `RejectRules` bundle to read, write, and remove
//! requests to make the operation conditional on the object's current
//! state. The evaluator is a pure predicate over the rules and the
//! observed version; `VERSION_NONEXISTENT` stands for an absent object.

use serde::{Deserialize, Serialize};

use super::errors::{MasterError, MasterResult};
use super::VERSION_NONEXISTENT;

/// Conditions under which an operation must be rejected.
///
/// All flags default to false, so an empty bundle accepts everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectRules {
    /// Reject if the object does not exist.
    pub doesnt_exist: bool,
    /// Reject if the object exists.
    pub exists: bool,
    /// Reject if the object's version is less than or equal to
    /// `given_version`.
    pub version_le_given: bool,
    /// Reject if the object's version differs from `given_version`.
    pub version_ne_given: bool,
    /// The version the `version_*` flags compare against.
    pub given_version: u64,
}

/// Evaluate reject rules against the observed version, first match wins.
///
/// Version-based rules are meaningful only when the object is present: an
/// absent object with only `version_*` flags set is accepted.
pub fn reject_operation(rules: &RejectRules, version: u64) -> MasterResult<()> {
    if version == VERSION_NONEXISTENT {
        if rules.doesnt_exist {
            return Err(MasterError::ObjectDoesntExist {
                version: VERSION_NONEXISTENT,
            });
        }
        return Ok(());
    }
    if rules.exists {
        return Err(MasterError::ObjectExists { version });
    }
    if rules.version_le_given && version <= rules.given_version {
        return Err(MasterError::WrongVersion { version });
    }
    if rules.version_ne_given && version != rules.given_version {
        return Err(MasterError::WrongVersion { version });
    }
    Ok(())
}
