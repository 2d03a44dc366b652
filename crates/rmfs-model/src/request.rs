//! Extract and insert requests: the unit of pick/store work.

use rmfs_core::{ItemId, OrderId, StationId};

/// One unit of `item` to be picked from some pod for `order`.
///
/// The station is `None` while the request sits in a backlog and is pinned
/// once the order is allocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractRequest {
    pub item: ItemId,
    pub order: OrderId,
    pub station: Option<StationId>,
}

impl ExtractRequest {
    pub fn new(item: ItemId, order: OrderId, station: Option<StationId>) -> Self {
        Self { item, order, station }
    }
}

/// A bundle of `count` units of `item` to be stored into some pod.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InsertRequest {
    pub item: ItemId,
    pub count: u32,
    pub station: Option<StationId>,
}

impl InsertRequest {
    pub fn new(item: ItemId, count: u32, station: Option<StationId>) -> Self {
        Self { item, count, station }
    }
}

/// Which of a station's orders may contribute extract requests when
/// materializing the fitting requests for a pod.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestFilter {
    /// Only orders already being picked.
    AssignedOnly,
    /// Assigned orders first, then queued orders position by position.
    AssignedAndQueuedEqually,
    /// Assigned orders first; a queued order joins only if every one of its
    /// open positions fits the pod's remaining availability.
    AssignedAndCompleteQueued,
}
