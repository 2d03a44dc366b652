//! Engine configuration.
//!
//! One tagged record covers the whole decision layer.  Construction of
//! [`ControlEngine`][crate::ControlEngine] validates it; incompatible
//! combinations (HADOD selection without the HADOD order manager) are fatal.

use rmfs_model::RequestFilter;
use rmfs_plan::PlannerConfig;
use rmfs_score::{DistanceMetric, ScorerKind, WorkValue};

use crate::{ControlError, ControlResult};

// ── Enums ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PodSelectionKind {
    /// Lexicographic scorer tournament over relevant unused pods.
    Default,
    /// Fully-supplied driven selection with pod-set fallback.
    FullyDemand,
    /// Selection from the HADOD station→pod request index.
    Hadod,
    /// Periodic simulated-annealing joint optimization.
    SimulatedAnnealing,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderManagerKind {
    FullySupplied,
    /// Fully-supplied plus the HADOD request index.
    Hadod,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TieBreaker {
    Random,
    EarliestDueTime,
    Fcfs,
}

// ── Sections ──────────────────────────────────────────────────────────────────

/// Simulated-annealing parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaConfig {
    pub init_temp: f64,
    pub min_temp: f64,
    /// Multiplied into the temperature after every iteration; in `(0, 1)`.
    pub cooling_rate: f64,
    /// Early exit once every solution's last delta is below this.
    pub min_difference: f64,
    pub max_iteration: u32,
    /// Candidate pods kept per station search space.
    pub search_pod_num: usize,
    /// Simulated seconds between optimizer runs.
    pub update_period: f64,
    /// Fall back to greedy Fully-Demand selection between updates.
    pub greedy_method: bool,
    /// Replace the Metropolis loop with exhaustive improvement passes.
    pub brute_force_method: bool,
    /// Seed each space with its best point before the loop.
    pub init_solution_method: bool,
    /// Wall-clock budget per update, seconds.  The loop keeps a 10 ms
    /// reserve for the emit phase.
    pub runtime_limit: f64,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            init_temp: 1000.0,
            min_temp: 1.0,
            cooling_rate: 0.97,
            min_difference: 1e-4,
            max_iteration: 1_000,
            search_pod_num: 10,
            update_period: 10.0,
            greedy_method: true,
            brute_force_method: false,
            init_solution_method: true,
            runtime_limit: 0.1,
        }
    }
}

/// Fully-supplied order manager parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FullySuppliedConfig {
    /// Chooses among simultaneously coverable orders.
    pub tie_breaker: TieBreaker,
    pub fast_lane: bool,
    pub fast_lane_tie_breaker: TieBreaker,
    /// Drain the late backlog completely before touching the not-late one.
    pub late_before_match: bool,
}

impl Default for FullySuppliedConfig {
    fn default() -> Self {
        Self {
            tie_breaker: TieBreaker::Fcfs,
            fast_lane: false,
            fast_lane_tie_breaker: TieBreaker::Fcfs,
            late_before_match: true,
        }
    }
}

/// Scorer stacks per selection role: one primary plus two tie-breakers each.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScorerRoles {
    pub pod_for_output_station_bot: Vec<ScorerKind>,
    pub pod_for_input_station_bot: Vec<ScorerKind>,
    pub output_station_for_bot_with_pod: Vec<ScorerKind>,
    pub input_station_for_bot_with_pod: Vec<ScorerKind>,
}

impl Default for ScorerRoles {
    fn default() -> Self {
        Self {
            pod_for_output_station_bot: vec![
                ScorerKind::WorkAmount {
                    value: WorkValue::Picks,
                    filter: RequestFilter::AssignedAndQueuedEqually,
                },
                ScorerKind::Nearest {
                    metric: DistanceMetric::ShortestPath,
                    prefer_same_tier: true,
                    wrong_tier_penalty: 1_000.0,
                },
                ScorerKind::Random { prefer_same_tier: false },
            ],
            pod_for_input_station_bot: vec![
                ScorerKind::Fill {
                    preference: rmfs_score::FillPreference::Emptiest,
                    binary: false,
                    threshold: 0.5,
                },
                ScorerKind::Nearest {
                    metric: DistanceMetric::ShortestPath,
                    prefer_same_tier: true,
                    wrong_tier_penalty: 1_000.0,
                },
                ScorerKind::Random { prefer_same_tier: false },
            ],
            output_station_for_bot_with_pod: vec![
                ScorerKind::WorkAmount {
                    value: WorkValue::Picks,
                    filter: RequestFilter::AssignedAndQueuedEqually,
                },
                ScorerKind::Nearest {
                    metric: DistanceMetric::ShortestTime,
                    prefer_same_tier: true,
                    wrong_tier_penalty: 1_000.0,
                },
                ScorerKind::Random { prefer_same_tier: false },
            ],
            input_station_for_bot_with_pod: vec![
                ScorerKind::Nearest {
                    metric: DistanceMetric::ShortestTime,
                    prefer_same_tier: true,
                    wrong_tier_penalty: 1_000.0,
                },
                ScorerKind::Random { prefer_same_tier: false },
                ScorerKind::Random { prefer_same_tier: false },
            ],
        }
    }
}

// ── Top level ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlConfig {
    pub pod_selection: PodSelectionKind,
    pub order_manager: OrderManagerKind,
    pub planner: PlannerConfig,
    pub sa: SaConfig,
    pub fully_supplied: FullySuppliedConfig,
    pub roles: ScorerRoles,
    /// Seconds one pick at a station takes.
    pub item_pick_time: f64,
    /// Seconds to lift or set down a pod.
    pub pod_transfer_time: f64,
    /// Radius of the neighbor-station search when a carried pod has no more
    /// work at its own station.
    pub extend_radius: f64,
    /// Seed for the engine's deterministic RNG.
    pub seed: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            pod_selection: PodSelectionKind::FullyDemand,
            order_manager: OrderManagerKind::FullySupplied,
            planner: PlannerConfig::default(),
            sa: SaConfig::default(),
            fully_supplied: FullySuppliedConfig::default(),
            roles: ScorerRoles::default(),
            item_pick_time: 3.0,
            pod_transfer_time: 2.0,
            extend_radius: 10.0,
            seed: 0,
        }
    }
}

impl ControlConfig {
    /// Reject incompatible or nonsensical combinations at construction.
    pub fn validate(&self) -> ControlResult<()> {
        if self.pod_selection == PodSelectionKind::Hadod
            && self.order_manager != OrderManagerKind::Hadod
        {
            return Err(ControlError::Config(
                "HADOD pod selection requires the HADOD order manager".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.sa.cooling_rate) {
            return Err(ControlError::Config(format!(
                "cooling_rate must be in (0, 1), got {}",
                self.sa.cooling_rate
            )));
        }
        if self.sa.init_temp < self.sa.min_temp {
            return Err(ControlError::Config(
                "init_temp below min_temp".into(),
            ));
        }
        for (name, stack) in [
            ("pod_for_output_station_bot", &self.roles.pod_for_output_station_bot),
            ("pod_for_input_station_bot", &self.roles.pod_for_input_station_bot),
            ("output_station_for_bot_with_pod", &self.roles.output_station_for_bot_with_pod),
            ("input_station_for_bot_with_pod", &self.roles.input_station_for_bot_with_pod),
        ] {
            if stack.is_empty() {
                return Err(ControlError::Config(format!("empty scorer stack: {name}")));
            }
        }
        if self.item_pick_time <= 0.0 || self.pod_transfer_time < 0.0 {
            return Err(ControlError::Config("non-positive handling times".into()));
        }
        if self.planner.wait_step <= 0.0 || self.planner.window < 0.0 {
            return Err(ControlError::Config("invalid planner window parameters".into()));
        }
        Ok(())
    }
}
