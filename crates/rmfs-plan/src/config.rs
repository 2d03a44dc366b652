//! Planner configuration.

/// Tunables of the windowed cooperative planner.
///
/// Wall-clock budgets are in real seconds; everything else is simulated
/// seconds.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// Duration of one explicit wait action.
    pub wait_step: f64,
    /// Look-ahead window length.  Paths are committed only this far.
    pub window: f64,
    /// Wall-clock budget for one agent's search, including retries.
    pub runtime_limit_per_agent: f64,
    /// Wall-clock budget for one `find_paths` call.
    pub runtime_limit: f64,
    /// Retry ceiling for priority escalation.
    pub max_retries: u32,
    /// Stop re-planning remaining agents after the first unresolvable
    /// conflict instead of working around it.
    pub abort_at_first_conflict: bool,
    /// Detect agents that stand still too long and detour them.
    pub use_deadlock_handler: bool,
    /// Standing time after which the deadlock handler fires.
    pub max_wait_time: f64,
    /// Derive `wait_step` and `window` from the graph's edge lengths at
    /// construction instead of using the values above.
    pub auto_set_parameter: bool,
    /// Record wall-clock planning time per `find_paths` call.
    pub clocking: bool,
    /// Weight the heuristic slightly above 1 to favor deeper, greedier
    /// expansion inside the window.
    pub use_bias: bool,
    /// Fraction of cruise speed a bot keeps while carrying a pod.
    pub carry_speed_factor: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            wait_step: 1.0,
            window: 30.0,
            runtime_limit_per_agent: 0.1,
            runtime_limit: 1.0,
            max_retries: 5,
            abort_at_first_conflict: false,
            use_deadlock_handler: true,
            max_wait_time: 30.0,
            auto_set_parameter: false,
            clocking: false,
            use_bias: false,
            carry_speed_factor: 1.0,
        }
    }
}
