//! Per-bot task queues and on-the-fly request augmentation.
//!
//! Tasks carry a monotonically increasing id so the planner can recognize
//! "the bot is still doing what it was doing when its scheduled path was
//! written" without comparing payloads (which augmentation mutates).
//!
//! # On-the-fly augmentation
//!
//! When new orders or bundles hit a station, bots already hauling a suitable
//! pod toward it can absorb the extra work without a new trip.  Two dirty
//! flags track whether the extract/store situation needs re-investigation;
//! a generation counter keyed by `(station, bot)` makes "already looked at
//! this pair" an O(1) check and clearing the whole dirty set a counter bump.

use std::collections::{HashMap, VecDeque};

use rmfs_core::{BotId, PodId, StationId};
use rmfs_graph::WaypointGraph;
use rmfs_model::{
    ExtractRequest, InsertRequest, PodState, RequestFilter, Task, Warehouse, WarehouseEvent,
};

use crate::{ControlError, ControlResult};

/// A task plus its dispatch-assigned identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTask {
    pub id: u64,
    pub task: Task,
}

impl ActiveTask {
    fn idle() -> Self {
        Self { id: 0, task: Task::None }
    }
}

pub struct Dispatch {
    current: Vec<ActiveTask>,
    queued: Vec<VecDeque<ActiveTask>>,
    next_id: u64,

    extract_dirty: bool,
    store_dirty: bool,
    generation: u64,
    investigated: HashMap<(StationId, BotId), u64>,
}

impl Dispatch {
    pub fn new(bot_count: usize) -> Self {
        Self {
            current: (0..bot_count).map(|_| ActiveTask::idle()).collect(),
            queued: (0..bot_count).map(|_| VecDeque::new()).collect(),
            next_id: 1,
            extract_dirty: false,
            store_dirty: false,
            generation: 0,
            investigated: HashMap::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn current(&self, bot: BotId) -> &ActiveTask {
        &self.current[bot.index()]
    }

    pub fn current_task(&self, bot: BotId) -> &Task {
        &self.current[bot.index()].task
    }

    pub fn has_queued_tasks(&self, bot: BotId) -> bool {
        !self.queued[bot.index()].is_empty()
    }

    /// `bot → current task id`, consumed by the planner's scheduled-priority
    /// output.
    pub fn task_fingerprints(&self) -> HashMap<BotId, u64> {
        self.current
            .iter()
            .enumerate()
            .filter(|(_, at)| at.task.kind() != rmfs_model::TaskKind::None)
            .map(|(i, at)| (BotId(i as u32), at.id))
            .collect()
    }

    // ── Enqueue operations ────────────────────────────────────────────────

    /// Enqueue an Extract trip: secure the pod for `bot`, register the
    /// requests (unless `preregistered`), mark the pod inbound, and grow the
    /// station's open-request count.
    pub fn enqueue_extract(
        &mut self,
        w: &mut Warehouse,
        bot: BotId,
        station: StationId,
        pod: PodId,
        requests: Vec<ExtractRequest>,
        preregistered: bool,
    ) -> ControlResult<u64> {
        self.secure_pod(w, bot, pod)?;
        if !preregistered {
            let mut done = Vec::new();
            for req in &requests {
                if let Err(e) = w.register_extract(pod, *req) {
                    for d in done {
                        w.unregister_extract(pod, d).ok();
                    }
                    return Err(e.into());
                }
                done.push(*req);
            }
        }
        w.station_mut(station).add_inbound_pod(pod);
        w.station_mut(station).open_requests += requests.len();

        Ok(self.push_task(bot, Task::Extract { pod, station, requests }))
    }

    /// Enqueue an Insert trip.  The listed bundles leave the station's
    /// pending queue; they are now bound to this pod.
    pub fn enqueue_insert(
        &mut self,
        w: &mut Warehouse,
        bot: BotId,
        station: StationId,
        pod: PodId,
        requests: Vec<InsertRequest>,
    ) -> ControlResult<u64> {
        self.secure_pod(w, bot, pod)?;
        let st = w.station_mut(station);
        for req in &requests {
            if let Some(pos) = st.pending_bundles.iter().position(|b| b == req) {
                st.pending_bundles.remove(pos);
            }
        }
        st.add_inbound_pod(pod);
        st.open_requests += requests.len();

        Ok(self.push_task(bot, Task::Insert { pod, station, requests }))
    }

    pub fn enqueue_park_pod(
        &mut self,
        bot: BotId,
        pod: PodId,
        destination: rmfs_core::WaypointId,
    ) -> u64 {
        self.push_task(bot, Task::ParkPod { pod, destination })
    }

    pub fn enqueue_rest(&mut self, bot: BotId, waypoint: rmfs_core::WaypointId) -> u64 {
        self.push_task(bot, Task::Rest { waypoint })
    }

    // ── In-flight mutation ────────────────────────────────────────────────

    /// Register `req` and append it to the bot's in-flight Extract task.
    pub fn add_request(
        &mut self,
        w: &mut Warehouse,
        bot: BotId,
        req: ExtractRequest,
    ) -> ControlResult<()> {
        let Task::Extract { pod, station, .. } = *self.current_task(bot) else {
            return Err(ControlError::NoAugmentableTask { bot });
        };
        w.register_extract(pod, req)?;
        if let Task::Extract { requests, .. } = &mut self.current[bot.index()].task {
            requests.push(req);
        }
        w.station_mut(station).open_requests += 1;
        Ok(())
    }

    /// Append an already-registered request (order-book allocations) to the
    /// in-flight or queued Extract task that hauls `pod`.  Returns whether a
    /// task was found.
    pub fn attach_to_pod_task(&mut self, pod: PodId, req: ExtractRequest) -> bool {
        for at in self
            .current
            .iter_mut()
            .chain(self.queued.iter_mut().flatten())
        {
            if let Task::Extract { pod: p, requests, .. } = &mut at.task {
                if *p == pod {
                    requests.push(req);
                    return true;
                }
            }
        }
        false
    }

    /// Simulator callback: the bot finished its current task.  Promote the
    /// next queued task (or idle).
    pub fn complete_current(&mut self, w: &mut Warehouse, bot: BotId) -> ActiveTask {
        let next = self.queued[bot.index()].pop_front().unwrap_or_else(ActiveTask::idle);
        let done = std::mem::replace(&mut self.current[bot.index()], next);
        if let Task::Extract { station, requests, .. } = &done.task {
            let st = w.station_mut(*station);
            st.open_requests = st.open_requests.saturating_sub(requests.len());
        }
        done
    }

    // ── Dirty-flag machinery ──────────────────────────────────────────────

    pub fn on_event(&mut self, event: &WarehouseEvent) {
        match event {
            WarehouseEvent::OrderAllocated { .. } => {
                self.extract_dirty = true;
                self.generation += 1;
            }
            WarehouseEvent::BundleAllocated { .. } => {
                self.store_dirty = true;
                self.generation += 1;
            }
            WarehouseEvent::PodPickup { .. } => {
                self.extract_dirty = true;
                self.store_dirty = true;
                self.generation += 1;
            }
            WarehouseEvent::OrderCompleted { .. } => {}
        }
    }

    /// Walk carrying bots and grow their in-flight tasks with any requests
    /// that became possible since the flags went dirty.
    ///
    /// Bots closest to their station (queued bots first) are served first so
    /// near-term capacity is used before speculative capacity.
    pub fn augment_on_the_fly(&mut self, w: &mut Warehouse, graph: &WaypointGraph) {
        if !self.extract_dirty && !self.store_dirty {
            return;
        }

        struct Walk {
            bot: BotId,
            station: StationId,
            pod: PodId,
            extract: bool,
            dist: f64,
        }

        let mut walks: Vec<Walk> = Vec::new();
        for (i, at) in self.current.iter().enumerate() {
            let bot = BotId(i as u32);
            let (pod, station, extract) = match &at.task {
                Task::Extract { pod, station, .. } => (*pod, *station, true),
                Task::Insert { pod, station, .. } => (*pod, *station, false),
                _ => continue,
            };
            if w.bot(bot).carried_pod != Some(pod) {
                continue;
            }
            let dist = graph
                .shortest_distance(w.bot(bot).waypoint, w.station(station).waypoint)
                .unwrap_or(f64::INFINITY);
            walks.push(Walk { bot, station, pod, extract, dist });
        }
        walks.sort_by(|a, b| a.dist.total_cmp(&b.dist).then(a.bot.cmp(&b.bot)));

        for walk in walks {
            let key = (walk.station, walk.bot);
            if self.investigated.get(&key) == Some(&self.generation) {
                continue;
            }

            if walk.extract && self.extract_dirty {
                let reqs = w.possible_extract_requests(
                    walk.pod,
                    walk.station,
                    RequestFilter::AssignedAndQueuedEqually,
                );
                for req in reqs {
                    w.register_extract(walk.pod, req)
                        .expect("possible_extract_requests respects availability");
                    if let Task::Extract { requests, .. } =
                        &mut self.current[walk.bot.index()].task
                    {
                        requests.push(req);
                    }
                    w.station_mut(walk.station).open_requests += 1;
                }
            }
            if !walk.extract && self.store_dirty {
                let reqs = w.possible_insert_requests(walk.pod, walk.station);
                let st = w.station_mut(walk.station);
                for req in &reqs {
                    if let Some(pos) = st.pending_bundles.iter().position(|b| b == req) {
                        st.pending_bundles.remove(pos);
                    }
                }
                st.open_requests += reqs.len();
                if let Task::Insert { requests, .. } = &mut self.current[walk.bot.index()].task {
                    requests.extend(reqs);
                }
            }

            self.investigated.insert(key, self.generation);
        }

        self.extract_dirty = false;
        self.store_dirty = false;
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Make sure `bot` owns `pod`: claim it if unused, adopt a bot-less
    /// pod-set claim, accept an existing claim or carry by this same bot.
    fn secure_pod(&self, w: &mut Warehouse, bot: BotId, pod: PodId) -> ControlResult<()> {
        match w.pod(pod).state {
            PodState::Unused => {
                w.claim_pod(pod, Some(bot), rmfs_model::ClaimReason::Extract)?;
                Ok(())
            }
            PodState::Claimed { by: None, reason } => {
                // A pod-set reservation being dispensed to a concrete bot.
                w.pod_mut(pod).state = PodState::Claimed { by: Some(bot), reason };
                Ok(())
            }
            PodState::Claimed { by: Some(b), .. } | PodState::Carried { by: b } if b == bot => {
                Ok(())
            }
            _ => Err(ControlError::PodUnavailable { pod, bot }),
        }
    }

    fn push_task(&mut self, bot: BotId, task: Task) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let at = ActiveTask { id, task };
        let cur = &mut self.current[bot.index()];
        if matches!(cur.task, Task::None | Task::Rest { .. }) {
            *cur = at;
        } else {
            self.queued[bot.index()].push_back(at);
        }
        id
    }
}
