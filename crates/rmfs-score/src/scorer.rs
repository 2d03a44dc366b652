//! The scorer library.
//!
//! All scorers minimize.  Families:
//!
//! | Kind          | Measures                                                  |
//! |---------------|-----------------------------------------------------------|
//! | `Random`      | `±U[0,1)` — sign flips when the tier preference holds     |
//! | `Nearest`     | bot→pod→station distance under a configurable metric      |
//! | `WorkAmount`  | negated value of the requests the pod could serve         |
//! | `Demand`      | negated overlap of pod stock with backlog demand          |
//! | `Completeable`| negated count of orders the pod can finish by itself      |
//! | `Fill`        | pod fill level, toward fullest or emptiest                |
//! | `Congestion`  | planner time estimates bot→pod + pod→station              |

use rmfs_model::{RequestFilter, Warehouse};
use rmfs_plan::PlanAgent;

use crate::context::{Candidate, SelectionEnv};

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
    ShortestPath,
    /// Shortest path divided by the bot's cruise speed.
    ShortestTime,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorkValue {
    /// Number of picks realizable.
    Picks,
    /// Summed backlog age of the orders behind the realizable picks.
    OrderAge,
    /// Summed lateness of those orders; optionally clipped at zero so
    /// not-yet-due orders contribute nothing.
    OrderDueTime { clip_lateness: bool },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FillPreference {
    Fullest,
    Emptiest,
}

/// Tagged scorer configuration.  Each variant carries exactly the payload
/// its closure needs.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScorerKind {
    Random {
        prefer_same_tier: bool,
    },
    Nearest {
        metric: DistanceMetric,
        prefer_same_tier: bool,
        /// Added per mismatched tier adjacency, and as the fallback distance
        /// when no path exists.
        wrong_tier_penalty: f64,
    },
    WorkAmount {
        value: WorkValue,
        filter: RequestFilter,
    },
    Demand,
    Completeable {
        include_queued: bool,
    },
    Fill {
        preference: FillPreference,
        /// Score the threshold indicator instead of the analog level.
        binary: bool,
        threshold: f64,
    },
    Congestion,
}

impl ScorerKind {
    /// Stable name for telemetry records.
    pub fn label(&self) -> &'static str {
        match self {
            ScorerKind::Random { .. } => "random",
            ScorerKind::Nearest { .. } => "nearest",
            ScorerKind::WorkAmount { .. } => "work_amount",
            ScorerKind::Demand => "demand",
            ScorerKind::Completeable { .. } => "completeable",
            ScorerKind::Fill { .. } => "fill",
            ScorerKind::Congestion => "congestion",
        }
    }
}

/// A built scorer: a closure capturing its configuration payload.
pub type Scorer = Box<dyn Fn(&mut SelectionEnv<'_>, Candidate) -> f64>;

// ── Construction ──────────────────────────────────────────────────────────────

/// Build the closure for one configured scorer.
pub fn build_scorer(kind: ScorerKind) -> Scorer {
    match kind {
        ScorerKind::Random { prefer_same_tier } => {
            Box::new(move |env: &mut SelectionEnv<'_>, cand: Candidate| {
                let u = env.rng.uniform();
                if prefer_same_tier && tier_mismatches(env.warehouse, cand) == 0 {
                    -u
                } else {
                    u
                }
            })
        }

        ScorerKind::Nearest { metric, prefer_same_tier, wrong_tier_penalty } => {
            Box::new(move |env: &mut SelectionEnv<'_>, cand: Candidate| {
                let w = env.warehouse;
                let bot = w.bot(cand.bot);
                let pod = w.pod(cand.pod);
                let station = w.station(cand.station);

                let mut d = hop_distance(env, metric, bot.waypoint, pod.waypoint, bot.physics.max_speed, wrong_tier_penalty)
                    + hop_distance(env, metric, pod.waypoint, station.waypoint, bot.physics.max_speed, wrong_tier_penalty);
                if prefer_same_tier {
                    d += wrong_tier_penalty * f64::from(tier_mismatches(w, cand));
                }
                d
            })
        }

        ScorerKind::WorkAmount { value, filter } => Box::new(move |env: &mut SelectionEnv<'_>, cand: Candidate| {
            let reqs = env
                .warehouse
                .possible_extract_requests(cand.pod, cand.station, filter);
            let total: f64 = match value {
                WorkValue::Picks => reqs.len() as f64,
                WorkValue::OrderAge => reqs
                    .iter()
                    .map(|r| env.warehouse.order(r.order).time_stay(env.now))
                    .sum(),
                WorkValue::OrderDueTime { clip_lateness } => reqs
                    .iter()
                    .map(|r| {
                        let lateness = env.now.since(env.warehouse.order(r.order).due_time);
                        if clip_lateness { lateness.max(0.0) } else { lateness }
                    })
                    .sum(),
            };
            -total
        }),

        ScorerKind::Demand => Box::new(|env: &mut SelectionEnv<'_>, cand: Candidate| {
            let pod = env.warehouse.pod(cand.pod);
            let covered: u32 = pod
                .available_items()
                .map(|(item, avail)| avail.min(env.demand.get(&item).copied().unwrap_or(0)))
                .sum();
            -f64::from(covered)
        }),

        ScorerKind::Completeable { include_queued } => Box::new(move |env: &mut SelectionEnv<'_>, cand: Candidate| {
            let w = env.warehouse;
            let station = w.station(cand.station);
            let pod = w.pod(cand.pod);
            let inbound = w.station_inbound_availability(cand.station);

            let orders = station.assigned_orders.iter().chain(
                include_queued
                    .then_some(station.queued_orders.iter())
                    .into_iter()
                    .flatten(),
            );

            let mut count = 0u32;
            for &oid in orders {
                let order = w.order(oid);
                let mut pod_needed = false;
                let mut ok = true;
                for (item, open) in order.open_positions() {
                    let from_inbound = inbound.get(&item).copied().unwrap_or(0).min(open);
                    let rest = open - from_inbound;
                    if rest > 0 {
                        pod_needed = true;
                        if pod.available(item) < rest {
                            ok = false;
                            break;
                        }
                    }
                }
                if ok && pod_needed {
                    count += 1;
                }
            }
            -f64::from(count)
        }),

        ScorerKind::Fill { preference, binary, threshold } => Box::new(move |env: &mut SelectionEnv<'_>, cand: Candidate| {
            let fill = env.warehouse.pod(cand.pod).fill_level();
            match (preference, binary) {
                (FillPreference::Fullest, false) => -fill,
                (FillPreference::Emptiest, false) => fill,
                (FillPreference::Fullest, true) => {
                    if fill >= threshold { -1.0 } else { 0.0 }
                }
                (FillPreference::Emptiest, true) => {
                    if fill <= threshold { -1.0 } else { 0.0 }
                }
            }
        }),

        ScorerKind::Congestion => Box::new(|env: &mut SelectionEnv<'_>, cand: Candidate| {
            let w = env.warehouse;
            let bot = w.bot(cand.bot);
            let agent = PlanAgent {
                id: bot.id,
                start: bot.waypoint,
                next: bot.waypoint,
                destination: w.pod(cand.pod).waypoint,
                speed: bot.physics.max_speed,
                carrying_pod: false,
                can_pass_obstacles: bot.physics.can_pass_obstacles,
                fixed_position: false,
                priority: 0,
            };
            let pod_wp = w.pod(cand.pod).waypoint;
            let station_wp = w.station(cand.station).waypoint;

            let (t1, ok1) =
                env.planner
                    .find_path(&agent, env.now, bot.waypoint, pod_wp, false, env.graph);
            if !ok1 {
                return f64::INFINITY;
            }
            let (t2, ok2) = env
                .planner
                .find_path(&agent, t1, pod_wp, station_wp, true, env.graph);
            if !ok2 {
                return f64::INFINITY;
            }
            t2.since(env.now)
        }),
    }
}

// ── Scorer stacks ─────────────────────────────────────────────────────────────

/// A primary scorer plus tie-breakers for one selection role, built once from
/// configuration and reused every round.
pub struct ScorerStack {
    kinds: Vec<ScorerKind>,
    scorers: Vec<Scorer>,
}

impl ScorerStack {
    pub fn new(kinds: Vec<ScorerKind>) -> Self {
        let scorers = kinds.iter().map(|&k| build_scorer(k)).collect();
        Self { kinds, scorers }
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    /// Evaluate criterion `i` for `cand`.
    #[inline]
    pub fn score(&self, i: usize, env: &mut SelectionEnv<'_>, cand: Candidate) -> f64 {
        (self.scorers[i])(env, cand)
    }

    /// Pair a winning score vector with the criterion names for telemetry.
    pub fn record(&self, scores: &[f64]) -> ScoreRecord {
        ScoreRecord {
            entries: self
                .kinds
                .iter()
                .zip(scores)
                .map(|(k, &s)| (k.label().to_owned(), s))
                .collect(),
        }
    }
}

/// Named winning-score vector, emitted through the statistics observer.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreRecord {
    pub entries: Vec<(String, f64)>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Mismatched tier adjacencies among bot→pod and pod→station.
fn tier_mismatches(w: &Warehouse, cand: Candidate) -> u32 {
    let bot = w.bot(cand.bot).tier;
    let pod = w.pod(cand.pod).tier;
    let station = w.station(cand.station).tier;
    u32::from(bot != pod) + u32::from(pod != station)
}

/// One hop of the Nearest metric.  A missing route falls back to Manhattan
/// plus the wrong-tier penalty distance.
fn hop_distance(
    env: &SelectionEnv<'_>,
    metric: DistanceMetric,
    from: rmfs_core::WaypointId,
    to: rmfs_core::WaypointId,
    speed: f64,
    wrong_tier_penalty: f64,
) -> f64 {
    let g = env.graph;
    match metric {
        DistanceMetric::Euclidean => g.euclidean(from, to),
        DistanceMetric::Manhattan => g.manhattan(from, to),
        DistanceMetric::ShortestPath => g
            .shortest_distance(from, to)
            .unwrap_or_else(|| g.manhattan(from, to) + wrong_tier_penalty),
        DistanceMetric::ShortestTime => {
            let d = g
                .shortest_distance(from, to)
                .unwrap_or_else(|| g.manhattan(from, to) + wrong_tier_penalty);
            d / speed
        }
    }
}
