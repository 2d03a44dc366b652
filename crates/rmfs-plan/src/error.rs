use rmfs_core::WaypointId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("reservation overlap at waypoint {node}")]
    Overlap { node: WaypointId },
}

pub type PlanResult<T> = Result<T, PlanError>;
