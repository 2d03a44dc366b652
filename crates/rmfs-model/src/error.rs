use rmfs_core::{ItemId, OrderId, PodId, StationId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("pod {pod} has no available unit of {item} to register")]
    RegisterWithoutStock { pod: PodId, item: ItemId },

    #[error("pod {pod} has no registered unit of {item}")]
    UnregisterWithoutRegistration { pod: PodId, item: ItemId },

    #[error("station {station} is at capacity")]
    CapacityExceeded { station: StationId },

    #[error("station {station} has no reserved slot to release")]
    NoReservedSlot { station: StationId },

    #[error("order {order} is not queued at station {station}")]
    OrderNotQueued { station: StationId, order: OrderId },

    #[error("order {order} is not assigned at station {station}")]
    OrderNotAssigned { station: StationId, order: OrderId },

    #[error("pod {pod} is not inbound at station {station}")]
    UnknownInboundPod { station: StationId, pod: PodId },

    #[error("order {order} has no open unit of {item} to bind")]
    BindExceedsOpen { order: OrderId, item: ItemId },

    #[error("order {order} has no bound unit of {item}")]
    UnbindWithoutBinding { order: OrderId, item: ItemId },

    #[error("pod {pod} is not unused (cannot claim)")]
    PodNotUnused { pod: PodId },

    #[error("pod {pod} is not claimed")]
    PodNotClaimed { pod: PodId },

    #[error("pod {pod} is not carried")]
    PodNotCarried { pod: PodId },
}

pub type ModelResult<T> = Result<T, ModelError>;
