//! Waypoint graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format, twice: once for
//! outgoing edges and once for incoming edges.  Given a `WaypointId n`, its
//! outgoing neighbors occupy the slice:
//!
//! ```text
//! out_to[ out_start[n] .. out_start[n+1] ]
//! ```
//!
//! and symmetrically for `in_from`.  The backward mirror exists because the
//! planner's RRA* heuristic searches the graph in reverse from the goal.
//!
//! Edge lengths are stored per direction; a one-way aisle is a single
//! directed edge.  All arrays are `pub` for direct indexed access on the
//! planner's hot path.

use rmfs_core::WaypointId;

// ── WaypointGraph ─────────────────────────────────────────────────────────────

/// Directed waypoint graph in double-CSR format.
///
/// Do not construct directly; use [`WaypointGraphBuilder`].
pub struct WaypointGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Planar position of each waypoint, in metres.  Indexed by `WaypointId`.
    pub node_x: Vec<f64>,
    pub node_y: Vec<f64>,
    /// Elevation level of each waypoint.  Cross-tier motion is penalized by
    /// the scorers, not the graph.
    pub node_tier: Vec<u16>,

    // ── Forward CSR ───────────────────────────────────────────────────────
    /// CSR row pointer for outgoing edges.  Length = `node_count + 1`.
    pub out_start: Vec<u32>,
    /// Destination waypoint of each outgoing edge, sorted by source.
    pub out_to: Vec<WaypointId>,
    /// Length of each outgoing edge in metres (parallel to `out_to`).
    pub out_len: Vec<f64>,

    // ── Backward CSR ──────────────────────────────────────────────────────
    /// CSR row pointer for incoming edges.  Length = `node_count + 1`.
    pub in_start: Vec<u32>,
    /// Source waypoint of each incoming edge, sorted by destination.
    pub in_from: Vec<WaypointId>,
    /// Length of each incoming edge in metres (parallel to `in_from`).
    pub in_len: Vec<f64>,
}

impl WaypointGraph {
    /// Construct an empty graph with no waypoints or edges.
    pub fn empty() -> Self {
        WaypointGraphBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_x.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_x.is_empty()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over `(neighbor, edge_length)` for all outgoing edges of `node`.
    ///
    /// This is a contiguous index range — no heap allocation.
    #[inline]
    pub fn out_neighbors(&self, node: WaypointId) -> impl Iterator<Item = (WaypointId, f64)> + '_ {
        let start = self.out_start[node.index()] as usize;
        let end   = self.out_start[node.index() + 1] as usize;
        (start..end).map(|i| (self.out_to[i], self.out_len[i]))
    }

    /// Iterator over `(predecessor, edge_length)` for all incoming edges of
    /// `node`.  The RRA* heuristic expands these.
    #[inline]
    pub fn in_neighbors(&self, node: WaypointId) -> impl Iterator<Item = (WaypointId, f64)> + '_ {
        let start = self.in_start[node.index()] as usize;
        let end   = self.in_start[node.index() + 1] as usize;
        (start..end).map(|i| (self.in_from[i], self.in_len[i]))
    }

    #[inline]
    pub fn out_degree(&self, node: WaypointId) -> usize {
        (self.out_start[node.index() + 1] - self.out_start[node.index()]) as usize
    }

    // ── Metrics ───────────────────────────────────────────────────────────

    #[inline]
    pub fn position(&self, node: WaypointId) -> (f64, f64) {
        (self.node_x[node.index()], self.node_y[node.index()])
    }

    #[inline]
    pub fn tier(&self, node: WaypointId) -> u16 {
        self.node_tier[node.index()]
    }

    /// Straight-line distance between two waypoints, ignoring edges and tiers.
    pub fn euclidean(&self, a: WaypointId, b: WaypointId) -> f64 {
        let dx = self.node_x[a.index()] - self.node_x[b.index()];
        let dy = self.node_y[a.index()] - self.node_y[b.index()];
        (dx * dx + dy * dy).sqrt()
    }

    /// Axis-aligned (taxicab) distance between two waypoints.
    pub fn manhattan(&self, a: WaypointId, b: WaypointId) -> f64 {
        (self.node_x[a.index()] - self.node_x[b.index()]).abs()
            + (self.node_y[a.index()] - self.node_y[b.index()]).abs()
    }

    /// Smallest edge length in the graph, or `None` if there are no edges.
    ///
    /// Used by the planner's `auto_set_parameter` to derive a wait step.
    pub fn min_edge_length(&self) -> Option<f64> {
        self.out_len.iter().copied().min_by(f64::total_cmp)
    }
}

// ── WaypointGraphBuilder ──────────────────────────────────────────────────────

/// Construct a [`WaypointGraph`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts waypoints and directed edges in any order.  `build()`
/// sorts edges by source node and constructs both CSR mirrors.
///
/// # Example
///
/// ```
/// use rmfs_graph::WaypointGraphBuilder;
///
/// let mut b = WaypointGraphBuilder::new();
/// let a = b.add_waypoint(0.0, 0.0, 0);
/// let c = b.add_waypoint(1.0, 0.0, 0);
/// b.add_lane(a, c); // both directions, length from positions
/// let g = b.build();
/// assert_eq!(g.node_count(), 2);
/// assert_eq!(g.edge_count(), 2);
/// ```
pub struct WaypointGraphBuilder {
    xs:        Vec<f64>,
    ys:        Vec<f64>,
    tiers:     Vec<u16>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from: WaypointId,
    to:   WaypointId,
    len:  f64,
}

impl WaypointGraphBuilder {
    pub fn new() -> Self {
        Self {
            xs:        Vec::new(),
            ys:        Vec::new(),
            tiers:     Vec::new(),
            raw_edges: Vec::new(),
        }
    }

    /// Add a waypoint and return its `WaypointId` (sequential from 0).
    pub fn add_waypoint(&mut self, x: f64, y: f64, tier: u16) -> WaypointId {
        let id = WaypointId(self.xs.len() as u32);
        self.xs.push(x);
        self.ys.push(y);
        self.tiers.push(tier);
        id
    }

    /// Add a **directed** edge from `from` to `to` with the Euclidean length
    /// of the segment.
    pub fn add_directed_edge(&mut self, from: WaypointId, to: WaypointId) {
        let dx = self.xs[from.index()] - self.xs[to.index()];
        let dy = self.ys[from.index()] - self.ys[to.index()];
        self.raw_edges.push(RawEdge { from, to, len: (dx * dx + dy * dy).sqrt() });
    }

    /// Add a directed edge with an explicit length (elevators, custom lanes).
    pub fn add_directed_edge_with_length(&mut self, from: WaypointId, to: WaypointId, len: f64) {
        self.raw_edges.push(RawEdge { from, to, len });
    }

    /// Convenience: add edges in **both directions** for a two-way lane.
    pub fn add_lane(&mut self, a: WaypointId, b: WaypointId) {
        self.add_directed_edge(a, b);
        self.add_directed_edge(b, a);
    }

    pub fn node_count(&self) -> usize {
        self.xs.len()
    }

    /// Consume the builder and produce a [`WaypointGraph`].
    ///
    /// Time complexity: O(E log E) for the two edge sorts.
    pub fn build(self) -> WaypointGraph {
        let node_count = self.xs.len();

        // Forward CSR: sort by source.
        let mut fwd = self.raw_edges;
        fwd.sort_unstable_by_key(|e| (e.from.0, e.to.0));

        let out_to:  Vec<WaypointId> = fwd.iter().map(|e| e.to).collect();
        let out_len: Vec<f64>        = fwd.iter().map(|e| e.len).collect();
        let out_start = csr_row_pointer(node_count, fwd.iter().map(|e| e.from));

        // Backward CSR: re-sort the same edges by destination.
        let mut bwd: Vec<&RawEdge> = fwd.iter().collect();
        bwd.sort_unstable_by_key(|e| (e.to.0, e.from.0));

        let in_from: Vec<WaypointId> = bwd.iter().map(|e| e.from).collect();
        let in_len:  Vec<f64>        = bwd.iter().map(|e| e.len).collect();
        let in_start = csr_row_pointer(node_count, bwd.iter().map(|e| e.to));

        WaypointGraph {
            node_x: self.xs,
            node_y: self.ys,
            node_tier: self.tiers,
            out_start,
            out_to,
            out_len,
            in_start,
            in_from,
            in_len,
        }
    }
}

impl Default for WaypointGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a CSR row pointer from the (sorted) key of each edge.
fn csr_row_pointer(node_count: usize, keys: impl Iterator<Item = WaypointId>) -> Vec<u32> {
    let mut start = vec![0u32; node_count + 1];
    for k in keys {
        start[k.index() + 1] += 1;
    }
    for i in 1..=node_count {
        start[i] += start[i - 1];
    }
    start
}
