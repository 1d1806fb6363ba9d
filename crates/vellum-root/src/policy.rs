//! Replication policy: choosing a minimal multiset of storage drivers
//! that satisfies a replication strategy over driver capability classes.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// Capability classes a storage driver can declare.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    /// Readable without credentials
    ReadPublic,
    /// Writable without access control
    WritePublic,
    /// Readable by the owner only
    ReadPrivate,
    /// Writable by the owner only
    WritePrivate,
    /// Readable on this host only
    ReadLocal,
    /// Writable on this host only
    WriteLocal,
}

/// Replication concerns a strategy can require.
///
/// Each concern binds to a fixed pair of classes; a driver matches a
/// concern when any of its declared classes intersects the pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Concern {
    /// Replicas on this host
    Local,
    /// World-readable, owner-writable replicas
    Publish,
    /// World-readable, world-writable replicas
    Public,
    /// Owner-only replicas
    Private,
}

impl Concern {
    /// All concerns, in the order strategies are evaluated.
    pub const ALL: [Concern; 4] = [
        Concern::Local,
        Concern::Publish,
        Concern::Public,
        Concern::Private,
    ];

    /// The class pair this concern binds to.
    pub const fn classes(self) -> [StorageClass; 2] {
        match self {
            Concern::Local => [StorageClass::ReadLocal, StorageClass::WriteLocal],
            Concern::Publish => [StorageClass::ReadPublic, StorageClass::WritePrivate],
            Concern::Public => [StorageClass::ReadPublic, StorageClass::WritePublic],
            Concern::Private => [StorageClass::ReadPrivate, StorageClass::WritePrivate],
        }
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// A concern → required-replica-count mapping. Absent concerns require
/// nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationStrategy {
    /// Required local replicas
    #[serde(default, skip_serializing_if = "is_zero")]
    pub local: u32,
    /// Required publish replicas
    #[serde(default, skip_serializing_if = "is_zero")]
    pub publish: u32,
    /// Required public replicas
    #[serde(default, skip_serializing_if = "is_zero")]
    pub public: u32,
    /// Required private replicas
    #[serde(default, skip_serializing_if = "is_zero")]
    pub private: u32,
}

impl ReplicationStrategy {
    /// Required replica count for a concern.
    pub const fn requirement(&self, concern: Concern) -> u32 {
        match concern {
            Concern::Local => self.local,
            Concern::Publish => self.publish,
            Concern::Public => self.public,
            Concern::Private => self.private,
        }
    }

    /// Whether the strategy requires nothing.
    pub const fn is_empty(&self) -> bool {
        self.local == 0 && self.publish == 0 && self.public == 0 && self.private == 0
    }
}

/// Which classes each known driver declares.
///
/// Keyed by driver name; iteration (and therefore selection) order is the
/// sorted driver name order, which is stable across runs and processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverClassification(pub BTreeMap<SmolStr, BTreeSet<StorageClass>>);

impl DriverClassification {
    /// Declare a class for a driver.
    pub fn declare(&mut self, driver: impl Into<SmolStr>, class: StorageClass) {
        self.0.entry(driver.into()).or_default().insert(class);
    }

    /// Invert the gateway's wire shape (class → driver list) into the
    /// per-driver classification.
    pub fn from_classes(classes: &BTreeMap<StorageClass, Vec<SmolStr>>) -> Self {
        let mut out = Self::default();
        for (class, drivers) in classes {
            for driver in drivers {
                out.declare(driver.clone(), *class);
            }
        }
        out
    }

    fn matches(&self, driver: &SmolStr, concern: Concern) -> bool {
        let Some(declared) = self.0.get(driver) else {
            return false;
        };
        concern.classes().iter().any(|c| declared.contains(c))
    }
}

/// Replication policy errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum PolicyError {
    /// No subset of the known drivers meets the strategy
    #[error("replication strategy cannot be satisfied; unmet concerns: {concerns:?}")]
    #[diagnostic(help("add drivers declaring the classes these concerns bind to"))]
    UnsatisfiableReplicationStrategy {
        /// Concerns whose counts could not be met
        concerns: Vec<Concern>,
    },
}

/// Select the smallest driver list satisfying `strategy`.
///
/// Single greedy pass over the stable driver enumeration: a driver is
/// picked iff it advances at least one still-unsatisfied concern, and a
/// picked driver counts toward every concern it matches. Selection stops
/// as soon as all concerns are met, so the result is a sublist of the
/// stable enumeration with no duplicates.
pub fn select_drivers(
    strategy: &ReplicationStrategy,
    classification: &DriverClassification,
) -> Result<Vec<SmolStr>, PolicyError> {
    let mut fulfilled: BTreeMap<Concern, u32> = BTreeMap::new();
    let mut selected = Vec::new();

    let satisfied = |fulfilled: &BTreeMap<Concern, u32>| {
        Concern::ALL
            .iter()
            .all(|c| fulfilled.get(c).copied().unwrap_or(0) >= strategy.requirement(*c))
    };

    for driver in classification.0.keys() {
        if satisfied(&fulfilled) {
            break;
        }
        let mut picked = false;
        for concern in Concern::ALL {
            let need = strategy.requirement(concern);
            let have = fulfilled.get(&concern).copied().unwrap_or(0);
            if have < need && classification.matches(driver, concern) {
                *fulfilled.entry(concern).or_insert(0) += 1;
                picked = true;
            }
        }
        if picked {
            selected.push(driver.clone());
        }
    }

    if satisfied(&fulfilled) {
        Ok(selected)
    } else {
        let concerns = Concern::ALL
            .into_iter()
            .filter(|c| fulfilled.get(c).copied().unwrap_or(0) < strategy.requirement(*c))
            .collect();
        Err(PolicyError::UnsatisfiableReplicationStrategy { concerns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(entries: &[(&str, &[StorageClass])]) -> DriverClassification {
        let mut out = DriverClassification::default();
        for (driver, classes) in entries {
            for class in *classes {
                out.declare(*driver, *class);
            }
        }
        out
    }

    #[test]
    fn local_plus_public_picks_both_drivers() {
        let classes = classification(&[
            ("disk", &[StorageClass::ReadLocal, StorageClass::WriteLocal]),
            ("s3", &[StorageClass::ReadPublic, StorageClass::WritePublic]),
        ]);
        let strategy = ReplicationStrategy {
            local: 1,
            public: 1,
            ..Default::default()
        };
        let mut picked = select_drivers(&strategy, &classes).unwrap();
        picked.sort();
        assert_eq!(picked, vec!["disk", "s3"]);
    }

    #[test]
    fn one_driver_can_cover_two_concerns() {
        let classes = classification(&[(
            "s3",
            &[
                StorageClass::ReadPublic,
                StorageClass::WritePublic,
                StorageClass::WritePrivate,
            ],
        )]);
        let strategy = ReplicationStrategy {
            public: 1,
            publish: 1,
            ..Default::default()
        };
        assert_eq!(select_drivers(&strategy, &classes).unwrap(), vec!["s3"]);
    }

    #[test]
    fn selection_stops_once_satisfied() {
        let classes = classification(&[
            ("a", &[StorageClass::ReadLocal]),
            ("b", &[StorageClass::ReadLocal]),
            ("c", &[StorageClass::ReadLocal]),
        ]);
        let strategy = ReplicationStrategy {
            local: 2,
            ..Default::default()
        };
        // stable order: the first two by name, never "c"
        assert_eq!(select_drivers(&strategy, &classes).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn counts_per_concern_are_met() {
        let classes = classification(&[
            ("a", &[StorageClass::WritePrivate]),
            ("b", &[StorageClass::ReadPrivate]),
            ("c", &[StorageClass::ReadPublic]),
        ]);
        let strategy = ReplicationStrategy {
            private: 2,
            ..Default::default()
        };
        let picked = select_drivers(&strategy, &classes).unwrap();
        assert_eq!(picked, vec!["a", "b"]);
    }

    #[test]
    fn unsatisfiable_reports_the_unmet_concerns() {
        let classes = classification(&[("disk", &[StorageClass::ReadLocal])]);
        let strategy = ReplicationStrategy {
            local: 1,
            private: 1,
            ..Default::default()
        };
        let err = select_drivers(&strategy, &classes).unwrap_err();
        assert_eq!(
            err,
            PolicyError::UnsatisfiableReplicationStrategy {
                concerns: vec![Concern::Private]
            }
        );
    }

    #[test]
    fn empty_strategy_selects_nothing() {
        let classes = classification(&[("disk", &[StorageClass::ReadLocal])]);
        let picked = select_drivers(&ReplicationStrategy::default(), &classes).unwrap();
        assert!(picked.is_empty());
    }

    #[test]
    fn wire_shape_inverts() {
        let mut wire: BTreeMap<StorageClass, Vec<SmolStr>> = BTreeMap::new();
        wire.insert(StorageClass::ReadLocal, vec!["disk".into()]);
        wire.insert(StorageClass::WriteLocal, vec!["disk".into()]);
        wire.insert(StorageClass::ReadPublic, vec!["s3".into()]);
        let inverted = DriverClassification::from_classes(&wire);
        assert!(inverted.matches(&"disk".into(), Concern::Local));
        assert!(!inverted.matches(&"disk".into(), Concern::Public));
        assert!(inverted.matches(&"s3".into(), Concern::Public));
    }

    #[test]
    fn class_names_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&StorageClass::ReadPublic).unwrap(),
            "\"read_public\""
        );
        let s: ReplicationStrategy = serde_json::from_str(r#"{"local":1,"public":2}"#).unwrap();
        assert_eq!(s.local, 1);
        assert_eq!(s.public, 2);
        assert_eq!(s.private, 0);
    }
}
