//! The cooperative planner: committed and scheduled reservation tables.
//!
//! # Two tables
//!
//! - **Committed** — rebuilt by every [`Planner::find_paths`] call; binds the
//!   next simulation step.  Bots execute these reservations.
//! - **Scheduled** — a deep copy refreshed by [`Planner::schedule_init`],
//!   mutated speculatively by selection and the annealing optimizer through
//!   [`Planner::schedule_path`] / [`Planner::overwrite_scheduled_path`].
//!   Nothing done here ever leaks into the committed table.
//!
//! # Priority escalation
//!
//! A failed single-agent search is retried with a raised retry-priority `k`,
//! which forces `2^k / 2` wait steps before the first move so higher-priority
//! traffic clears the cell.  Retries stop at the per-agent wall budget.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use rmfs_core::{BotId, SimRng, SimTime, WaypointId};
use rmfs_graph::WaypointGraph;

use crate::agent::{Path, PlanAgent, Reservation};
use crate::config::PlannerConfig;
use crate::interval::{Interval, ReservationTable};
use crate::rra::ReverseResumable;
use crate::search::{space_time_astar, SearchRequest};
use crate::PlanResult;

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of one cooperative planning round.
#[derive(Debug, Default)]
pub struct FindPathsOutcome {
    /// Committed path per agent that found one.  Agents missing here kept
    /// their standing blockage and will retry next round.
    pub paths: HashMap<BotId, Path>,
    /// The wall-clock budget ran out before every agent was served.
    pub timed_out: bool,
}

// ── Planner ───────────────────────────────────────────────────────────────────

pub struct Planner {
    config: PlannerConfig,

    committed: ReservationTable,
    scheduled: ReservationTable,

    /// Reservations currently held per agent in the committed table.
    committed_res: HashMap<BotId, Vec<Reservation>>,
    /// Reservations currently held per agent in the scheduled table.
    scheduled_res: HashMap<BotId, Vec<Reservation>>,

    /// Cached reverse-search state per agent, invalidated on goal or speed
    /// change and by the deadlock handler.
    rra: HashMap<BotId, ReverseResumable>,

    /// Most-recently-scheduled-first sequence of agents touched since the
    /// last `schedule_init`.
    schedule_sequence: Vec<BotId>,
    /// Task fingerprint recorded when an agent's scheduled path was written.
    scheduled_tasks: HashMap<BotId, u64>,
    /// Scheduled priorities derived from the sequence; absent = none.
    priorities: HashMap<BotId, u32>,

    /// Deadlock detection: where each agent has been standing, and since when.
    standing: HashMap<BotId, (WaypointId, SimTime)>,

    timeout_count: u64,
    /// Wall seconds of the last `find_paths` call, when `clocking` is on.
    last_plan_wall: Option<f64>,
}

impl Planner {
    pub fn new(mut config: PlannerConfig, graph: &WaypointGraph) -> Self {
        if config.auto_set_parameter {
            if let Some(step) = graph.min_edge_length() {
                config.wait_step = step;
                config.window = 20.0 * step;
            }
        }
        Self {
            config,
            committed: ReservationTable::new(graph.node_count()),
            scheduled: ReservationTable::new(graph.node_count()),
            committed_res: HashMap::new(),
            scheduled_res: HashMap::new(),
            rra: HashMap::new(),
            schedule_sequence: Vec::new(),
            scheduled_tasks: HashMap::new(),
            priorities: HashMap::new(),
            standing: HashMap::new(),
            timeout_count: 0,
            last_plan_wall: None,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    // ── Committed planning ────────────────────────────────────────────────

    /// Plan collision-free paths for all agents within the look-ahead window.
    ///
    /// Rebuilds the committed table: a fixed-blockage prelude reserves every
    /// agent's current segment, then agents are served in priority order and
    /// their blockage is replaced by path reservations (with a half-infinite
    /// tail at the final waypoint).
    ///
    /// Errors only on a reservation overlap the search should have excluded —
    /// an invariant violation, not a planning failure.
    pub fn find_paths(
        &mut self,
        now: SimTime,
        agents: &[PlanAgent],
        graph: &WaypointGraph,
        rng: &mut SimRng,
    ) -> PlanResult<FindPathsOutcome> {
        let wall_start = Instant::now();
        let overall_deadline = wall_start + Duration::from_secs_f64(self.config.runtime_limit);

        self.committed.clear();
        self.committed_res.clear();

        // ── Fixed-blockage prelude ────────────────────────────────────────
        for a in agents {
            let mut held = Vec::new();
            let iv = Interval::tail(now);
            if self.committed.insert_suppressed(a.next, iv) {
                held.push(Reservation::new(a.next, iv));
            }
            if a.start != a.next && self.committed.insert_suppressed(a.start, iv) {
                held.push(Reservation::new(a.start, iv));
            }
            self.committed_res.insert(a.id, held);
        }

        // ── Service order ─────────────────────────────────────────────────
        //
        // Priority descending, then obstacle-constrained bots first, then
        // closest-to-goal first, then id for determinism.
        let mut order: Vec<&PlanAgent> =
            agents.iter().filter(|a| !a.fixed_position).collect();
        order.sort_by(|a, b| {
            self.effective_priority(b)
                .cmp(&self.effective_priority(a))
                .then(a.can_pass_obstacles.cmp(&b.can_pass_obstacles))
                .then(
                    graph
                        .euclidean(a.next, a.destination)
                        .total_cmp(&graph.euclidean(b.next, b.destination)),
                )
                .then(a.id.cmp(&b.id))
        });

        let mut outcome = FindPathsOutcome::default();

        for a in order {
            if Instant::now() >= overall_deadline {
                outcome.timed_out = true;
                break;
            }

            let goal = self
                .deadlock_goal(a, now, graph, rng)
                .unwrap_or(a.destination);

            // Take out our own blockage; the search must not collide with it.
            let blockage = self.committed_res.remove(&a.id).unwrap_or_default();
            for r in &blockage {
                self.committed.remove(r.node, r.span);
            }

            if a.next == goal {
                // Already standing at the goal: keep the blockage as a tail.
                self.restore_reservations(a.id, blockage);
                continue;
            }

            let speed = self.effective_speed(a.speed, a.carrying_pod);
            self.refresh_rra(a.id, goal, speed, graph);

            let agent_deadline = (Instant::now()
                + Duration::from_secs_f64(self.config.runtime_limit_per_agent))
            .min(overall_deadline);

            let mut found = None;
            for retry in 0..=self.config.max_retries {
                if Instant::now() >= agent_deadline {
                    outcome.timed_out = true;
                    break;
                }
                let forced = (1u32 << retry) / 2;
                let result = space_time_astar(SearchRequest {
                    graph,
                    table: &self.committed,
                    rra: self.rra.get_mut(&a.id).expect("rra refreshed above"),
                    start: a.next,
                    goal,
                    start_time: now,
                    speed,
                    wait_step: self.config.wait_step,
                    window_end: now + self.config.window,
                    forced_wait_steps: forced,
                    use_bias: self.config.use_bias,
                    deadline: Some(agent_deadline),
                });
                match result {
                    Some(o) => {
                        found = Some(o);
                        break;
                    }
                    None => {
                        debug!(bot = a.id.0, retry, "windowed search failed, escalating");
                    }
                }
            }

            match found {
                Some(o) => {
                    self.commit_path_reservations(a.id, &o.path)?;
                    if o.path.steps.len() > 1 {
                        self.standing.remove(&a.id);
                    }
                    outcome.paths.insert(a.id, o.path);
                }
                None => {
                    // Keep standing where we are; try again next round.
                    self.restore_reservations(a.id, blockage);
                    if self.config.abort_at_first_conflict {
                        break;
                    }
                }
            }
        }

        if outcome.timed_out {
            self.timeout_count += 1;
            warn!(
                elapsed_ms = wall_start.elapsed().as_millis() as u64,
                "planning budget exhausted, keeping best known paths"
            );
        }
        if self.config.clocking {
            self.last_plan_wall = Some(wall_start.elapsed().as_secs_f64());
        }

        Ok(outcome)
    }

    /// Single-agent estimator against the committed table.
    ///
    /// Returns `(end_time, found)`: the time the path leaves the window or
    /// reaches the goal, plus the untimed shortest-time estimate from the
    /// window-exit waypoint to the true goal.  Nothing is reserved.
    pub fn find_path(
        &mut self,
        agent: &PlanAgent,
        now: SimTime,
        start: WaypointId,
        goal: WaypointId,
        carrying_pod: bool,
        graph: &WaypointGraph,
    ) -> (SimTime, bool) {
        if start == goal {
            return (now, true);
        }

        // Our own standing blockage must not count as an obstacle.
        let own = self.committed_res.get(&agent.id).cloned().unwrap_or_default();
        for r in &own {
            self.committed.remove(r.node, r.span);
        }

        let speed = self.effective_speed(agent.speed, carrying_pod);
        self.refresh_rra(agent.id, goal, speed, graph);
        let deadline =
            Instant::now() + Duration::from_secs_f64(self.config.runtime_limit_per_agent);

        let result = space_time_astar(SearchRequest {
            graph,
            table: &self.committed,
            rra: self.rra.get_mut(&agent.id).expect("rra refreshed above"),
            start,
            goal,
            start_time: now,
            speed,
            wait_step: self.config.wait_step,
            window_end: now + self.config.window,
            forced_wait_steps: 0,
            use_bias: self.config.use_bias,
            deadline: Some(deadline),
        });

        for r in own {
            self.committed.insert_suppressed(r.node, r.span);
        }

        match result {
            Some(o) => (o.estimated_end_time(), true),
            None => (SimTime::INFINITY, false),
        }
    }

    // ── Scheduled (speculative) planning ──────────────────────────────────

    /// Refresh the scheduled table as a deep copy of the committed one and
    /// forget all scheduled paths.
    pub fn schedule_init(&mut self) {
        self.scheduled = self.committed.clone();
        self.scheduled_res.clear();
        self.schedule_sequence.clear();
        self.scheduled_tasks.clear();
    }

    /// Search against the scheduled table, temporarily ignoring the agent's
    /// own scheduled path and honoring `extra` reservations (e.g. the first
    /// leg of a two-leg trip).  Returns the estimated end time and the new
    /// reservations **without** committing them; use
    /// [`overwrite_scheduled_path`][Self::overwrite_scheduled_path] to commit.
    pub fn schedule_path(
        &mut self,
        agent: &PlanAgent,
        start_time: SimTime,
        start: WaypointId,
        goal: WaypointId,
        carrying_pod: bool,
        extra: &[Reservation],
        graph: &WaypointGraph,
    ) -> (SimTime, Vec<Reservation>, bool) {
        // Trivial leg: already there, nothing new to reserve.
        if start == goal {
            return (start_time, Vec::new(), true);
        }

        let bot = agent.id;
        let prior = self.scheduled_res.get(&bot).cloned().unwrap_or_default();
        for r in &prior {
            self.scheduled.remove(r.node, r.span);
        }
        let mut inserted_extra = Vec::with_capacity(extra.len());
        for r in extra {
            if self.scheduled.insert_suppressed(r.node, r.span) {
                inserted_extra.push(*r);
            }
        }

        let speed = self.effective_speed(agent.speed, carrying_pod);
        self.refresh_rra(bot, goal, speed, graph);
        let deadline =
            Instant::now() + Duration::from_secs_f64(self.config.runtime_limit_per_agent);

        let result = space_time_astar(SearchRequest {
            graph,
            table: &self.scheduled,
            rra: self.rra.get_mut(&bot).expect("rra refreshed above"),
            start,
            goal,
            start_time,
            speed,
            wait_step: self.config.wait_step,
            window_end: start_time + self.config.window,
            forced_wait_steps: 0,
            use_bias: self.config.use_bias,
            deadline: Some(deadline),
        });

        // Restore the table exactly as it was.
        for r in inserted_extra {
            self.scheduled.remove(r.node, r.span);
        }
        for r in prior {
            self.scheduled.insert_suppressed(r.node, r.span);
        }

        match result {
            Some(o) => {
                let res = o.path.reservations();
                (o.estimated_end_time(), res, true)
            }
            None => (SimTime::INFINITY, Vec::new(), false),
        }
    }

    /// Replace `bot`'s scheduled path with `res` and move it to the front of
    /// the schedule sequence (most recent first).
    ///
    /// Overlapping spans are suppressed rather than rejected: the scheduled
    /// table is speculative and tails may legitimately collide.
    pub fn overwrite_scheduled_path(&mut self, bot: BotId, res: Vec<Reservation>) {
        if let Some(old) = self.scheduled_res.remove(&bot) {
            for r in old {
                self.scheduled.remove(r.node, r.span);
            }
        }
        let mut held = Vec::with_capacity(res.len());
        for r in res {
            if self.scheduled.insert_suppressed(r.node, r.span) {
                held.push(r);
            }
        }
        self.scheduled_res.insert(bot, held);

        self.schedule_sequence.retain(|&b| b != bot);
        self.schedule_sequence.insert(0, bot);
    }

    /// Remember which task `bot` held when its scheduled path was written.
    /// [`output_scheduled_priority`][Self::output_scheduled_priority] only
    /// honors bots whose task is still the same.
    pub fn record_scheduled_task(&mut self, bot: BotId, task_fingerprint: u64) {
        self.scheduled_tasks.insert(bot, task_fingerprint);
    }

    /// Derive committed-planning priorities from the schedule sequence.
    ///
    /// The most recently scheduled bot gets the highest priority, but only
    /// bots whose current task (by fingerprint) still equals the one recorded
    /// at scheduling time take part; everyone else is reset to none.
    pub fn output_scheduled_priority(&mut self, current_tasks: &HashMap<BotId, u64>) {
        self.priorities.clear();
        let n = self.schedule_sequence.len() as u32;
        for (i, &bot) in self.schedule_sequence.iter().enumerate() {
            let recorded = self.scheduled_tasks.get(&bot);
            if recorded.is_some() && current_tasks.get(&bot) == recorded {
                self.priorities.insert(bot, n - i as u32);
            }
        }
    }

    /// Manually set an agent's scheduled priority (0 clears it).
    pub fn update_agent_priority(&mut self, bot: BotId, priority: u32) {
        if priority == 0 {
            self.priorities.remove(&bot);
        } else {
            self.priorities.insert(bot, priority);
        }
    }

    pub fn priority_of(&self, bot: BotId) -> u32 {
        self.priorities.get(&bot).copied().unwrap_or(0)
    }

    /// Start of the half-infinite tail reservation at `node`, if any.  Used
    /// to estimate when a parking bot is done parking.
    pub fn find_end_reservation(&self, node: WaypointId) -> Option<SimTime> {
        self.committed.end_reservation_start(node)
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn committed_fingerprint(&self) -> u64 {
        self.committed.fingerprint()
    }

    pub fn scheduled_fingerprint(&self) -> u64 {
        self.scheduled.fingerprint()
    }

    /// Number of `find_paths` rounds that overran their wall budget.
    pub fn timeout_count(&self) -> u64 {
        self.timeout_count
    }

    /// Wall seconds of the last planning round (`clocking` only).
    pub fn last_plan_wall(&self) -> Option<f64> {
        self.last_plan_wall
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn restore_reservations(&mut self, bot: BotId, res: Vec<Reservation>) {
        let mut held = Vec::with_capacity(res.len());
        for r in res {
            if self.committed.insert_suppressed(r.node, r.span) {
                held.push(r);
            }
        }
        self.committed_res.insert(bot, held);
    }

    fn commit_path_reservations(&mut self, bot: BotId, path: &Path) -> PlanResult<()> {
        let res = path.reservations();
        let mut held = Vec::with_capacity(res.len());
        for r in &res {
            if r.span.is_tail() {
                if self.committed.insert_suppressed(r.node, r.span) {
                    held.push(*r);
                }
            } else {
                self.committed.insert(r.node, r.span)?;
                held.push(*r);
            }
        }
        self.committed_res.insert(bot, held);
        Ok(())
    }

    fn effective_priority(&self, a: &PlanAgent) -> u32 {
        a.priority.max(self.priorities.get(&a.id).copied().unwrap_or(0))
    }

    fn effective_speed(&self, speed: f64, carrying_pod: bool) -> f64 {
        if carrying_pod {
            speed * self.config.carry_speed_factor
        } else {
            speed
        }
    }

    fn refresh_rra(&mut self, bot: BotId, goal: WaypointId, speed: f64, graph: &WaypointGraph) {
        let stale = match self.rra.get(&bot) {
            Some(r) => r.goal() != goal || r.speed() != speed,
            None => true,
        };
        if stale {
            self.rra.insert(bot, ReverseResumable::new(graph, goal, speed));
        }
    }

    /// Deadlock detection: an agent standing at one waypoint past
    /// `max_wait_time` gets a random one-hop detour goal and a fresh RRA.
    fn deadlock_goal(
        &mut self,
        a: &PlanAgent,
        now: SimTime,
        graph: &WaypointGraph,
        rng: &mut SimRng,
    ) -> Option<WaypointId> {
        if !self.config.use_deadlock_handler {
            return None;
        }
        match self.standing.get(&a.id) {
            Some(&(wp, since)) if wp == a.next => {
                if now.since(since) <= self.config.max_wait_time {
                    return None;
                }
                let neighbors: Vec<WaypointId> =
                    graph.out_neighbors(a.next).map(|(n, _)| n).collect();
                let detour = *rng.choose(&neighbors)?;
                debug!(bot = a.id.0, to = detour.0, "deadlock handler: one-hop detour");
                self.rra.remove(&a.id);
                self.standing.insert(a.id, (a.next, now));
                Some(detour)
            }
            _ => {
                self.standing.insert(a.id, (a.next, now));
                None
            }
        }
    }
}
