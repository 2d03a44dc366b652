//! The engine facade the simulator consumes.
//!
//! The simulator owns the warehouse, the graph, and the clock.  The engine
//! owns every decision structure — planner, order book, selector, optimizer,
//! dispatch — and exposes four entry points per spec:
//!
//! - [`request_task`][ControlEngine::request_task] when a bot goes idle,
//! - [`update`][ControlEngine::update] once per tick,
//! - [`plan_paths`][ControlEngine::plan_paths] to (re)commit motion,
//! - [`on_event`][ControlEngine::on_event] for externally observed changes
//!   (pod pickups, completions).
//!
//! All stochastic behavior flows through one seeded RNG; identical inputs
//! and seed give identical decisions.

use rmfs_core::{BotId, OrderId, SimRng, SimTime, StationId};
use rmfs_graph::WaypointGraph;
use rmfs_model::{StationKind, Task, Warehouse, WarehouseEvent};
use rmfs_plan::{FindPathsOutcome, PlanAgent, Planner, PlanResult};

use crate::config::{ControlConfig, PodSelectionKind};
use crate::dispatch::{ActiveTask, Dispatch};
use crate::observer::ControlObserver;
use crate::orderbook::OrderBook;
use crate::sa::SaOptimizer;
use crate::selector::{DecisionCtx, PodSelector, TaskOutcome};
use crate::ControlResult;

pub struct ControlEngine {
    config: ControlConfig,
    planner: Planner,
    orders: OrderBook,
    selector: PodSelector,
    dispatch: Dispatch,
    sa: SaOptimizer,
    rng: SimRng,
    /// Events produced by decisions this tick, drained by `update`.
    events: Vec<WarehouseEvent>,
}

impl ControlEngine {
    /// Validate the configuration and assemble the engine.
    pub fn new(
        config: ControlConfig,
        graph: &WaypointGraph,
        bot_count: usize,
    ) -> ControlResult<Self> {
        config.validate()?;
        Ok(Self {
            planner: Planner::new(config.planner.clone(), graph),
            orders: OrderBook::new(
                config.fully_supplied.clone(),
                config.order_manager == crate::config::OrderManagerKind::Hadod,
            ),
            selector: PodSelector::new(&config),
            dispatch: Dispatch::new(bot_count),
            sa: SaOptimizer::new(&config),
            rng: SimRng::new(config.seed),
            events: Vec::new(),
            config,
        })
    }

    // ── Inputs from the simulator ─────────────────────────────────────────

    /// A new order arrived from the generator.
    pub fn submit_order(&mut self, w: &Warehouse, order: OrderId, now: SimTime) {
        self.orders.submit_order(w, order, now);
    }

    /// An externally observed warehouse change (pod pickup, completion).
    pub fn on_event(&mut self, event: WarehouseEvent) {
        self.dispatch.on_event(&event);
    }

    /// The bot finished its current task; promote the next queued one.
    pub fn complete_task(&mut self, w: &mut Warehouse, bot: BotId) -> ActiveTask {
        self.dispatch.complete_current(w, bot)
    }

    // ── Task requests ─────────────────────────────────────────────────────

    /// Find work for an idle bot: output stations nearest-first, then input
    /// stations, then rest in place.
    pub fn request_task(
        &mut self,
        w: &mut Warehouse,
        graph: &WaypointGraph,
        bot: BotId,
        now: SimTime,
        observer: &mut dyn ControlObserver,
    ) -> ControlResult<TaskOutcome> {
        let radius = self.config.extend_radius;
        let bot_wp = w.bot(bot).waypoint;

        let mut stations: Vec<(StationId, StationKind, f64)> = w
            .stations()
            .iter()
            .map(|s| {
                let d = graph
                    .shortest_distance(bot_wp, s.waypoint)
                    .unwrap_or(f64::INFINITY);
                (s.id, s.kind, d)
            })
            .collect();
        stations.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));

        let ControlEngine {
            planner,
            orders,
            selector,
            dispatch,
            rng,
            events,
            ..
        } = self;
        let mut ctx = DecisionCtx {
            warehouse: &mut *w,
            graph,
            planner,
            rng,
            orders,
            dispatch,
            events,
            now,
        };

        for &(st, kind, d) in &stations {
            if !d.is_finite() {
                continue;
            }
            let outcome = match kind {
                StationKind::Output => {
                    selector.do_extract_for_station(&mut ctx, observer, bot, st, true, radius)?
                }
                StationKind::Input => {
                    selector.do_store_for_station(&mut ctx, observer, bot, st, true, radius)?
                }
            };
            if outcome != TaskOutcome::NoTask {
                return Ok(outcome);
            }
        }

        // Nothing anywhere: rest where we stand.
        if matches!(self.dispatch.current_task(bot), Task::None) {
            self.dispatch.enqueue_rest(bot, w.bot(bot).waypoint);
        }
        Ok(TaskOutcome::NoTask)
    }

    // ── Per-tick update ───────────────────────────────────────────────────

    /// Reclassify backlogs, run the optimizer if due, and work off the
    /// dirty-flag augmentation.  Call once per simulation tick.
    pub fn update(
        &mut self,
        w: &mut Warehouse,
        graph: &WaypointGraph,
        now: SimTime,
        observer: &mut dyn ControlObserver,
    ) {
        self.orders.tick(w, now);

        if self.config.pod_selection == PodSelectionKind::SimulatedAnnealing {
            let ControlEngine {
                planner,
                orders,
                selector,
                dispatch,
                sa,
                rng,
                events,
                ..
            } = self;
            let mut ctx = DecisionCtx {
                warehouse: &mut *w,
                graph,
                planner,
                rng,
                orders,
                dispatch,
                events,
                now,
            };
            sa.update(&mut ctx, selector, observer);
        }

        self.drain_events(observer);
        self.dispatch.augment_on_the_fly(w, graph);
    }

    /// Route buffered decision events into the dirty-flag machinery and the
    /// observer.
    fn drain_events(&mut self, observer: &mut dyn ControlObserver) {
        for event in std::mem::take(&mut self.events) {
            self.dispatch.on_event(&event);
            if let WarehouseEvent::OrderAllocated { order, station } = event {
                observer.on_order_allocated(order, station);
            }
        }
    }

    // ── Motion planning ───────────────────────────────────────────────────

    /// Commit collision-free paths for every bot's current task.
    pub fn plan_paths(
        &mut self,
        w: &Warehouse,
        graph: &WaypointGraph,
        now: SimTime,
        observer: &mut dyn ControlObserver,
    ) -> PlanResult<FindPathsOutcome> {
        let mut agents = Vec::with_capacity(w.bots().len());
        for bot in w.bot_ids() {
            let b = w.bot(bot);
            let (destination, fixed) = match self.dispatch.current_task(bot) {
                Task::None => (b.waypoint, true),
                Task::Rest { waypoint } => (*waypoint, b.waypoint == *waypoint),
                Task::ParkPod { destination, .. } => (*destination, false),
                Task::Extract { pod, station, .. } | Task::Insert { pod, station, .. } => {
                    if b.carried_pod == Some(*pod) {
                        (w.station(*station).waypoint, false)
                    } else {
                        (w.pod(*pod).waypoint, false)
                    }
                }
            };
            agents.push(PlanAgent {
                id: bot,
                start: b.waypoint,
                next: b.waypoint,
                destination,
                speed: b.physics.max_speed,
                carrying_pod: b.carried_pod.is_some(),
                can_pass_obstacles: b.physics.can_pass_obstacles,
                fixed_position: fixed,
                priority: self.planner.priority_of(bot),
            });
        }

        let outcome = self.planner.find_paths(now, &agents, graph, &mut self.rng)?;
        if outcome.timed_out {
            observer.on_planner_timeout(now);
        }
        Ok(outcome)
    }

    // ── Event-loop integration ────────────────────────────────────────────

    /// The next simulated time this engine wants control (the optimizer's
    /// period, or never for the reactive strategies).
    pub fn get_next_event_time(&self, _now: SimTime) -> SimTime {
        match self.config.pod_selection {
            PodSelectionKind::SimulatedAnnealing => self.sa.next_update(),
            _ => SimTime::INFINITY,
        }
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut Planner {
        &mut self.planner
    }

    pub fn orders(&self) -> &OrderBook {
        &self.orders
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn dispatch_mut(&mut self) -> &mut Dispatch {
        &mut self.dispatch
    }

    pub fn selector(&self) -> &PodSelector {
        &self.selector
    }
}
