//! Bot tasks as handed to the executor.

use rmfs_core::{PodId, StationId, WaypointId};

use crate::request::{ExtractRequest, InsertRequest};

/// What a bot is doing (or about to do).
///
/// `Extract` and `Insert` carry their request payloads; on-the-fly
/// augmentation appends to them while the task is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    None,
    /// Idle at a resting waypoint.
    Rest { waypoint: WaypointId },
    /// Return a pod to a storage location.
    ParkPod { pod: PodId, destination: WaypointId },
    /// Bring `pod` to `station` and pick the listed requests.
    Extract {
        pod: PodId,
        station: StationId,
        requests: Vec<ExtractRequest>,
    },
    /// Bring `pod` to `station` and store the listed bundles.
    Insert {
        pod: PodId,
        station: StationId,
        requests: Vec<InsertRequest>,
    },
}

/// Discriminant-only view of a [`Task`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    None,
    Rest,
    ParkPod,
    Extract,
    Insert,
}

impl Task {
    #[inline]
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::None => TaskKind::None,
            Task::Rest { .. } => TaskKind::Rest,
            Task::ParkPod { .. } => TaskKind::ParkPod,
            Task::Extract { .. } => TaskKind::Extract,
            Task::Insert { .. } => TaskKind::Insert,
        }
    }

    /// The pod this task moves, if any.
    pub fn pod(&self) -> Option<PodId> {
        match *self {
            Task::ParkPod { pod, .. }
            | Task::Extract { pod, .. }
            | Task::Insert { pod, .. } => Some(pod),
            _ => None,
        }
    }

    /// The station this task serves, if any.
    pub fn station(&self) -> Option<StationId> {
        match *self {
            Task::Extract { station, .. } | Task::Insert { station, .. } => Some(station),
            _ => None,
        }
    }

    /// Whether a bot holding this task counts as bookable by the optimizer.
    #[inline]
    pub fn is_interruptible(&self) -> bool {
        matches!(self, Task::None | Task::Rest { .. } | Task::ParkPod { .. })
    }
}

impl Default for Task {
    fn default() -> Self {
        Task::None
    }
}
