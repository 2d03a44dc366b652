//! `rmfs-control` — the decision layer of the allocation engine.
//!
//! # Dataflow
//!
//! ```text
//! OrderBook     backlogs; fully-supplied allocation against inbound pods
//!     │
//! PodSelector   which pod a bot should fetch for a station (4 strategies)
//!     │
//! SaOptimizer   periodic joint (station → pod, orders) refinement
//!     │
//! Dispatch      task queues per bot; on-the-fly request augmentation
//!     │
//! ControlEngine facade the simulator talks to
//! ```
//!
//! The engine never drives time itself: the simulator ticks, calls
//! [`ControlEngine::request_task`] for idle bots and
//! [`ControlEngine::update`] each tick, and forwards warehouse events so the
//! dirty-flag machinery can react.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod observer;
pub mod orderbook;
pub mod sa;
pub mod selector;


pub use config::{
    ControlConfig, FullySuppliedConfig, OrderManagerKind, PodSelectionKind, SaConfig,
    ScorerRoles, TieBreaker,
};
pub use dispatch::{ActiveTask, Dispatch};
pub use engine::ControlEngine;
pub use error::{ControlError, ControlResult};
pub use observer::{ControlObserver, NoopObserver};
pub use orderbook::{Backlog, ExtraSupplyOutcome, HadodIndex, OrderBook, SupplyOutcome};
pub use selector::{DecisionCtx, PodSelector, SelectorStats, TaskOutcome};
pub use sa::SaOptimizer;
