use std::cmp::min;
use std::collections::VecDeque;

use log::{debug, trace};

use crate::error::{Error, Result};

/// A directed edge in the residual graph.
///
/// Every inserted edge is stored together with a paired reverse edge;
/// `rev` is the index of that pair inside `graph[to]`. Pushing `f` units
/// along an edge adds `f` to its flow and subtracts `f` from its pair, so
/// the sum of the two flows is constant for the lifetime of the graph.
#[derive(Debug, Clone)]
struct Edge {
    to: usize,
    rev: usize,
    capacity: i64,
    flow: i64,
}

impl Edge {
    fn residual(&self) -> i64 {
        self.capacity - self.flow
    }
}

/// A capacitated flow network solved with Dinic's blocking-flow algorithm.
///
/// The network is built once by inserting edges, then driven through a
/// single [`max_flow`](FlowNetwork::max_flow) computation. The computation
/// consumes the residual state; reuse of the same instance afterwards is
/// rejected rather than silently returning garbage.
///
/// # Examples
/// ```
/// use flownet::FlowNetwork;
///
/// let mut network = FlowNetwork::new(4, 0, 3).unwrap();
/// network.add_edge(0, 1, 3).unwrap();
/// network.add_edge(1, 3, 2).unwrap();
/// network.add_edge(0, 2, 2).unwrap();
/// network.add_edge(2, 3, 2).unwrap();
/// assert_eq!(network.max_flow().unwrap(), 4);
/// ```
///
/// # Complexity
/// * Time: O(V^2 E) for general integer capacities
/// * Space: O(V + E)
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    graph: Vec<Vec<Edge>>,
    size: usize,
    source: usize,
    sink: usize,
    computed: bool,
}

impl FlowNetwork {
    /// Creates an empty network with `size` nodes and the given source and
    /// sink indices.
    ///
    /// # Errors
    /// * `InvalidVertex` if `source` or `sink` is not in `[0, size)`
    /// * `InvalidInput` if `source` and `sink` coincide
    pub fn new(size: usize, source: usize, sink: usize) -> Result<Self> {
        Error::check_vertex(source, size)?;
        Error::check_vertex(sink, size)?;
        if source == sink {
            return Err(Error::invalid_input("source and sink must be distinct"));
        }
        Ok(FlowNetwork {
            graph: vec![Vec::new(); size],
            size,
            source,
            sink,
            computed: false,
        })
    }

    /// Adds a directed edge `from -> to` with the given capacity.
    ///
    /// The paired reverse edge is inserted with capacity zero, so flow can
    /// be cancelled but never pushed backwards on its own.
    pub fn add_edge(&mut self, from: usize, to: usize, capacity: i64) -> Result<()> {
        self.add_edge_with_reverse(from, to, capacity, 0)
    }

    /// Adds an edge `from -> to` with `capacity`, whose paired reverse edge
    /// `to -> from` carries `reverse_capacity` of its own. Passing the same
    /// capacity both ways models an undirected edge.
    ///
    /// Insertion order is preserved and determines which augmenting path is
    /// discovered first when several exist, so results are reproducible.
    ///
    /// Self-loops are accepted; layer eligibility means they can never carry
    /// flow, but their pair bookkeeping stays consistent like any other edge.
    ///
    /// # Errors
    /// * `InvalidVertex` if either endpoint is out of range
    /// * `InvalidCapacity` if either capacity is negative
    /// * `AlreadyComputed` if [`max_flow`](FlowNetwork::max_flow) already ran
    pub fn add_edge_with_reverse(
        &mut self,
        from: usize,
        to: usize,
        capacity: i64,
        reverse_capacity: i64,
    ) -> Result<()> {
        if self.computed {
            return Err(Error::AlreadyComputed);
        }
        Error::check_vertex(from, self.size)?;
        Error::check_vertex(to, self.size)?;
        Error::check_capacity(capacity)?;
        Error::check_capacity(reverse_capacity)?;

        // When from == to both pair edges land in the same list, with the
        // reverse edge one slot past the forward one.
        let to_len = self.graph[to].len() + usize::from(from == to);
        let from_len = self.graph[from].len();
        self.graph[from].push(Edge {
            to,
            rev: to_len,
            capacity,
            flow: 0,
        });
        self.graph[to].push(Edge {
            to: from,
            rev: from_len,
            capacity: reverse_capacity,
            flow: 0,
        });
        Ok(())
    }

    /// Computes the maximum flow from source to sink.
    ///
    /// Alternates a layering pass with exhaustive blocking-flow search until
    /// the sink becomes unreachable in the residual graph. A disconnected
    /// sink is a valid input yielding zero flow. The residual state is
    /// consumed; a second call returns `AlreadyComputed`.
    pub fn max_flow(&mut self) -> Result<i64> {
        if self.computed {
            return Err(Error::AlreadyComputed);
        }
        self.computed = true;

        let mut total: i64 = 0;
        let mut layers = vec![None; self.size];
        let mut phase = 0u32;
        while self.layer(&mut layers) {
            phase += 1;
            // Per-node scan cursors; they only advance within a phase, so
            // every edge is rescanned at most once and a phase is O(E).
            let mut cursors = vec![0usize; self.size];
            loop {
                let pushed = self.blocking_flow(&layers, &mut cursors, i64::MAX);
                if pushed == 0 {
                    break;
                }
                trace!("augmented {pushed} along a layered path");
                total += pushed;
            }
            debug!("phase {phase}: accumulated flow {total}");
        }
        Ok(total)
    }

    /// Breadth-first layering pass: assigns each node its distance from the
    /// source through edges with positive residual capacity. Returns whether
    /// the sink was reached. Recomputed from scratch at every phase start;
    /// stale layers are never reused.
    fn layer(&self, layers: &mut [Option<u32>]) -> bool {
        layers.fill(None);
        layers[self.source] = Some(0);
        let mut queue = VecDeque::new();
        queue.push_back((self.source, 0u32));

        while let Some((node, depth)) = queue.pop_front() {
            for edge in &self.graph[node] {
                if edge.residual() > 0 && layers[edge.to].is_none() {
                    layers[edge.to] = Some(depth + 1);
                    queue.push_back((edge.to, depth + 1));
                }
            }
        }
        layers[self.sink].is_some()
    }

    /// Depth-first augmenting search confined to edges that descend exactly
    /// one layer. Finds one source-to-sink path, pushes the bottleneck
    /// amount (capped by `limit`) along it, and returns it; returns 0 once
    /// no path remains in the current layered subgraph.
    ///
    /// Implemented with an explicit work stack instead of recursion, so the
    /// call depth on large graphs is bounded by the allocator, not the call
    /// stack. A frame on `path` is (node, index of the edge taken from it);
    /// a node's layer always equals its depth on the path.
    fn blocking_flow(
        &mut self,
        layers: &[Option<u32>],
        cursors: &mut [usize],
        limit: i64,
    ) -> i64 {
        let mut path: Vec<(usize, usize)> = Vec::new();
        let mut node = self.source;

        loop {
            if node == self.sink {
                let mut pushed = limit;
                for &(from, idx) in &path {
                    pushed = min(pushed, self.graph[from][idx].residual());
                }
                for &(from, idx) in &path {
                    let (to, rev) = {
                        let edge = &self.graph[from][idx];
                        (edge.to, edge.rev)
                    };
                    self.graph[from][idx].flow += pushed;
                    self.graph[to][rev].flow -= pushed;
                }
                return pushed;
            }

            let next_layer = path.len() as u32 + 1;
            let mut advanced = false;
            while cursors[node] < self.graph[node].len() {
                let edge = &self.graph[node][cursors[node]];
                if edge.residual() > 0 && layers[edge.to] == Some(next_layer) {
                    path.push((node, cursors[node]));
                    node = edge.to;
                    advanced = true;
                    break;
                }
                cursors[node] += 1;
            }

            if !advanced {
                match path.pop() {
                    // Dead end: step back and skip past the edge that led here.
                    Some((parent, _)) => {
                        cursors[parent] += 1;
                        node = parent;
                    }
                    None => return 0,
                }
            }
        }
    }
}
