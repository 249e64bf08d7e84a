use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of required computation: a (machine, cycle) pair that has raw
/// readings but no computed output yet.
///
/// Field order drives the derived `Ord`, so sorting yields ascending
/// machine id, then ascending cycle id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub machine_id: i64,
    pub cycle_id: i64,
}

impl WorkItem {
    pub fn new(machine_id: i64, cycle_id: i64) -> Self {
        Self { machine_id, cycle_id }
    }
}

impl From<(i64, i64)> for WorkItem {
    fn from((machine_id, cycle_id): (i64, i64)) -> Self {
        Self { machine_id, cycle_id }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "machine {} / cycle {}", self.machine_id, self.cycle_id)
    }
}
