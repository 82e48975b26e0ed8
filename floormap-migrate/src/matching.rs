//! Device matching between the source floor and the destination network
//!
//! Linear join on normalized MAC address:
//! - source device + claimed Meraki device with the same MAC → assignment
//! - source device without a claimed counterpart → skipped (reported)
//! - source device without a parseable MAC → skipped (reported)
//! - Meraki device not on the source floor → untouched (no call, listed)

use std::collections::{HashMap, HashSet};

use crate::mac::Mac;
use crate::models::{NetworkDevice, SourceDevice};

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub mac: Mac,
    pub serial: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidMac,
    NotInNetwork,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidMac => f.write_str("invalid MAC"),
            SkipReason::NotInNetwork => f.write_str("not claimed in destination network"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub raw_mac: String,
    pub name: Option<String>,
    pub reason: SkipReason,
}

/// Claimed Meraki device with no counterpart on the source floor
#[derive(Debug, Clone, PartialEq)]
pub struct Untouched {
    pub serial: String,
    /// Normalized when parseable, as reported by Meraki otherwise
    pub mac: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPlan {
    pub assignments: Vec<Assignment>,
    pub skipped: Vec<Skipped>,
    /// Meraki devices left as they are
    pub untouched: Vec<Untouched>,
}

/// Pair every source device with the claimed network device sharing its MAC.
///
/// Source order is kept; a MAC listed twice on the source floor yields one
/// assignment.
pub fn plan_assignments(source: &[SourceDevice], claimed: &[NetworkDevice]) -> MatchPlan {
    let by_mac: HashMap<Mac, &NetworkDevice> = claimed
        .iter()
        .filter_map(|d| {
            let mac = d.mac.as_deref()?.parse::<Mac>().ok()?;
            Some((mac, d))
        })
        .collect();

    let mut plan = MatchPlan::default();
    let mut seen = HashSet::new();
    let mut matched_serials = HashSet::new();

    for device in source {
        let Some(mac) = device.mac else {
            plan.skipped.push(Skipped {
                raw_mac: device.raw_mac.clone(),
                name: device.name.clone(),
                reason: SkipReason::InvalidMac,
            });
            continue;
        };
        if !seen.insert(mac) {
            continue;
        }
        match by_mac.get(&mac) {
            Some(target) => {
                matched_serials.insert(target.serial.as_str());
                plan.assignments.push(Assignment {
                    mac,
                    serial: target.serial.clone(),
                    name: device.name.clone(),
                });
            }
            None => plan.skipped.push(Skipped {
                raw_mac: mac.to_string(),
                name: device.name.clone(),
                reason: SkipReason::NotInNetwork,
            }),
        }
    }

    plan.untouched = claimed
        .iter()
        .filter(|d| !matched_serials.contains(d.serial.as_str()))
        .map(|d| Untouched {
            serial: d.serial.clone(),
            mac: d.mac.as_deref().map(|raw| match raw.parse::<Mac>() {
                Ok(mac) => mac.to_string(),
                Err(_) => raw.to_string(),
            }),
            name: d.name.clone(),
        })
        .collect();
    plan
}
