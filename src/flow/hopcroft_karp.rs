use std::collections::VecDeque;

use log::debug;

use crate::error::{Error, Result};

/// Sentinel partner meaning "unmatched". Node 0 is reserved for it; real
/// nodes are shifted up by one internally so `pair[v] == NIL` is unambiguous.
const NIL: usize = 0;

/// A unit-capacity bipartite graph matched with the Hopcroft-Karp layered
/// search.
///
/// Same two-pass skeleton as [`FlowNetwork`](crate::flow::dinic::FlowNetwork)
/// but over a partner array instead of generic residual edges: a layering
/// pass seeds every unmatched left node, then an augmenting pass walks
/// left -> right -> current partner chains whose layers increase by exactly
/// one. The unit-capacity structure tightens the phase bound from O(V) to
/// O(sqrt(V)).
///
/// Public indices are 0-based on each side. Internally the left partition
/// occupies `[1, L]` and the right partition `[L+1, L+R]`, with node 0 the
/// shared "no partner" sentinel.
///
/// # Examples
/// ```
/// use flownet::BipartiteGraph;
///
/// let mut graph = BipartiteGraph::new(2, 2);
/// graph.add_edge(0, 0).unwrap();
/// graph.add_edge(0, 1).unwrap();
/// graph.add_edge(1, 0).unwrap();
/// assert_eq!(graph.max_matching().unwrap(), 2);
/// assert_eq!(graph.partner_of_left(1).unwrap(), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct BipartiteGraph {
    left_size: usize,
    right_size: usize,
    // Forward-star adjacency: head[node] points at the most recently added
    // edge, next_edge chains back through older ones.
    head: Vec<Option<usize>>,
    next_edge: Vec<Option<usize>>,
    target: Vec<usize>,
    pair: Vec<usize>,
    computed: bool,
}

impl BipartiteGraph {
    /// Creates an empty bipartite graph with `left_size` and `right_size`
    /// nodes in the two partitions.
    pub fn new(left_size: usize, right_size: usize) -> Self {
        let total = left_size + right_size + 1;
        BipartiteGraph {
            left_size,
            right_size,
            head: vec![None; total],
            next_edge: Vec::new(),
            target: Vec::new(),
            pair: vec![NIL; total],
            computed: false,
        }
    }

    /// Adds an edge between `left` in the left partition and `right` in the
    /// right partition, both 0-based within their side. O(1).
    ///
    /// # Errors
    /// * `InvalidVertex` if either index is out of range for its partition
    /// * `AlreadyComputed` if the matching already ran
    pub fn add_edge(&mut self, left: usize, right: usize) -> Result<()> {
        if self.computed {
            return Err(Error::AlreadyComputed);
        }
        Error::check_vertex(left, self.left_size)?;
        Error::check_vertex(right, self.right_size)?;

        let node = left + 1;
        let edge = self.target.len();
        self.target.push(self.left_size + 1 + right);
        self.next_edge.push(self.head[node]);
        self.head[node] = Some(edge);
        Ok(())
    }

    /// Computes the size of a maximum matching.
    ///
    /// Repeats (layering, exhaustive augmenting search over unmatched left
    /// nodes) phases until layering reports no reachable unmatched right
    /// node; each phase is O(E) and at most O(sqrt(V)) phases run. A graph
    /// with no edges is valid and matches zero pairs. The pair state is
    /// consumed; a second call returns `AlreadyComputed`.
    pub fn max_matching(&mut self) -> Result<usize> {
        if self.computed {
            return Err(Error::AlreadyComputed);
        }
        self.computed = true;

        let mut layers = vec![None; self.pair.len()];
        let mut matched = 0usize;
        let mut phase = 0u32;
        while self.layer(&mut layers) {
            phase += 1;
            for left in 1..=self.left_size {
                if self.pair[left] == NIL && self.try_augment(left, &mut layers) {
                    matched += 1;
                }
            }
            debug!("phase {phase}: {matched} pairs matched");
        }
        Ok(matched)
    }

    /// Returns the right-partition partner of `left`, or `None` if it ended
    /// up unmatched.
    pub fn partner_of_left(&self, left: usize) -> Result<Option<usize>> {
        Error::check_vertex(left, self.left_size)?;
        let partner = self.pair[left + 1];
        Ok((partner != NIL).then(|| partner - self.left_size - 1))
    }

    /// Returns the left-partition partner of `right`, or `None` if it ended
    /// up unmatched.
    pub fn partner_of_right(&self, right: usize) -> Result<Option<usize>> {
        Error::check_vertex(right, self.right_size)?;
        let partner = self.pair[self.left_size + 1 + right];
        Ok((partner != NIL).then(|| partner - 1))
    }

    /// All matched `(left, right)` pairs, in left-index order.
    pub fn matched_pairs(&self) -> Vec<(usize, usize)> {
        (1..=self.left_size)
            .filter(|&left| self.pair[left] != NIL)
            .map(|left| (left - 1, self.pair[left] - self.left_size - 1))
            .collect()
    }

    /// Layering pass: seeds every still-unmatched left node at layer 0 and
    /// walks left -> right -> partner edges breadth-first. The sentinel node
    /// starts unseen; it gets a finite layer exactly when some unmatched
    /// right node is reachable, i.e. an augmenting path exists.
    fn layer(&self, layers: &mut [Option<u32>]) -> bool {
        layers.fill(None);
        let mut queue = VecDeque::new();
        for left in 1..=self.left_size {
            if self.pair[left] == NIL {
                layers[left] = Some(0);
                queue.push_back((left, 0u32));
            }
        }

        while let Some((node, depth)) = queue.pop_front() {
            let mut edge = self.head[node];
            while let Some(e) = edge {
                let partner = self.pair[self.target[e]];
                if layers[partner].is_none() {
                    layers[partner] = Some(depth + 1);
                    queue.push_back((partner, depth + 1));
                }
                edge = self.next_edge[e];
            }
        }
        layers[NIL].is_some()
    }

    /// Augmenting search from an unmatched left node, as an explicit-stack
    /// walk instead of recursion: a frame is (left node, next edge to scan),
    /// and a node's layer always equals its depth on the stack. Reaching the
    /// sentinel completes an augmenting path; the pairs along it are rewired
    /// in one sweep.
    fn try_augment(&mut self, root: usize, layers: &mut [Option<u32>]) -> bool {
        let mut frames: Vec<(usize, Option<usize>)> = vec![(root, self.head[root])];
        // Right node descended through at each depth, for the rewiring sweep.
        let mut rights: Vec<usize> = Vec::new();

        while let Some(depth) = frames.len().checked_sub(1) {
            let (_, mut edge) = frames[depth];
            let mut descend = None;
            while let Some(e) = edge {
                let right = self.target[e];
                let partner = self.pair[right];
                if layers[partner] == Some(depth as u32 + 1) {
                    descend = Some((e, right, partner));
                    break;
                }
                edge = self.next_edge[e];
            }

            match descend {
                Some((e, right, partner)) => {
                    frames[depth].1 = self.next_edge[e];
                    rights.push(right);
                    if partner == NIL {
                        for (frame, &right) in frames.iter().zip(&rights) {
                            self.pair[right] = frame.0;
                            self.pair[frame.0] = right;
                        }
                        return true;
                    }
                    frames.push((partner, self.head[partner]));
                }
                None => {
                    // Every path below this node failed; pin it unseen so the
                    // rest of the phase skips it. This pruning is what yields
                    // the O(sqrt(V)) phase bound.
                    let (node, _) = frames[depth];
                    layers[node] = None;
                    frames.pop();
                    rights.pop();
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::dinic::FlowNetwork;

    #[test]
    fn test_max_matching_chain() {
        let mut graph = BipartiteGraph::new(4, 4);
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(2, 3).unwrap();
        assert_eq!(graph.max_matching().unwrap(), 3);
    }

    #[test]
    fn test_max_matching_shared_targets() {
        let mut graph = BipartiteGraph::new(5, 5);
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(0, 2).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(1, 3).unwrap();
        graph.add_edge(2, 4).unwrap();
        assert_eq!(graph.max_matching().unwrap(), 3);
    }

    #[test]
    fn test_max_matching_requires_augmentation() {
        // A greedy pass would match 0-0 and strand 1; the layered search
        // must reroute 0 to right node 1.
        let mut graph = BipartiteGraph::new(2, 2);
        graph.add_edge(0, 0).unwrap();
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 0).unwrap();
        assert_eq!(graph.max_matching().unwrap(), 2);
        assert_eq!(graph.partner_of_left(0).unwrap(), Some(1));
        assert_eq!(graph.partner_of_left(1).unwrap(), Some(0));
        assert_eq!(graph.partner_of_right(0).unwrap(), Some(1));
        assert_eq!(graph.partner_of_right(1).unwrap(), Some(0));
    }

    #[test]
    fn test_max_matching_empty_graph() {
        let mut graph = BipartiteGraph::new(0, 0);
        assert_eq!(graph.max_matching().unwrap(), 0);
    }

    #[test]
    fn test_max_matching_no_edges() {
        let mut graph = BipartiteGraph::new(3, 3);

        // The very first layering pass finds no augmenting path.
        let mut layers = vec![None; 7];
        assert!(!graph.layer(&mut layers));

        assert_eq!(graph.max_matching().unwrap(), 0);
        assert!(graph.matched_pairs().is_empty());
        assert_eq!(graph.partner_of_left(0).unwrap(), None);
    }

    #[test]
    fn test_partner_of_unmatched_node() {
        let mut graph = BipartiteGraph::new(2, 3);
        graph.add_edge(0, 1).unwrap();
        assert_eq!(graph.max_matching().unwrap(), 1);
        assert_eq!(graph.partner_of_left(0).unwrap(), Some(1));
        assert_eq!(graph.partner_of_right(1).unwrap(), Some(0));
        // Unmatched nodes on either side answer None, never panic.
        assert_eq!(graph.partner_of_left(1).unwrap(), None);
        assert_eq!(graph.partner_of_right(0).unwrap(), None);
        assert_eq!(graph.partner_of_right(2).unwrap(), None);
    }

    #[test]
    fn test_max_matching_unbalanced_sides() {
        let mut graph = BipartiteGraph::new(1, 5);
        for right in 0..5 {
            graph.add_edge(0, right).unwrap();
        }
        assert_eq!(graph.max_matching().unwrap(), 1);
    }

    #[test]
    fn test_max_matching_duplicate_edges() {
        let mut graph = BipartiteGraph::new(2, 2);
        graph.add_edge(0, 0).unwrap();
        graph.add_edge(0, 0).unwrap();
        graph.add_edge(1, 1).unwrap();
        assert_eq!(graph.max_matching().unwrap(), 2);
    }

    #[test]
    fn test_add_edge_rejects_bad_indices() {
        let mut graph = BipartiteGraph::new(2, 3);
        assert!(matches!(
            graph.add_edge(2, 0),
            Err(Error::InvalidVertex { index: 2, size: 2 })
        ));
        assert!(matches!(
            graph.add_edge(0, 3),
            Err(Error::InvalidVertex { index: 3, size: 3 })
        ));
        assert!(matches!(
            graph.partner_of_left(2),
            Err(Error::InvalidVertex { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_computation_consumes_the_graph() {
        let mut graph = BipartiteGraph::new(1, 1);
        graph.add_edge(0, 0).unwrap();
        assert_eq!(graph.max_matching().unwrap(), 1);
        assert_eq!(graph.max_matching(), Err(Error::AlreadyComputed));
        assert_eq!(graph.add_edge(0, 0), Err(Error::AlreadyComputed));
    }

    #[test]
    fn test_matching_is_valid() {
        let edges = [(0, 0), (0, 2), (1, 0), (1, 1), (2, 1), (3, 2), (3, 3)];
        let mut graph = BipartiteGraph::new(4, 4);
        for &(left, right) in &edges {
            graph.add_edge(left, right).unwrap();
        }
        let matched = graph.max_matching().unwrap();
        assert_eq!(matched, 4);

        let pairs = graph.matched_pairs();
        assert_eq!(pairs.len(), matched);
        for &(left, right) in &pairs {
            // Every reported pair is an inserted edge and mutually agreed.
            assert!(edges.contains(&(left, right)));
            assert_eq!(graph.partner_of_left(left).unwrap(), Some(right));
            assert_eq!(graph.partner_of_right(right).unwrap(), Some(left));
        }

        // No node is the partner of two distinct nodes, and the sentinel
        // never gets rewired.
        for node in 1..graph.pair.len() {
            let partner = graph.pair[node];
            if partner != NIL {
                assert_eq!(graph.pair[partner], node);
            }
        }
        assert_eq!(graph.pair[NIL], NIL);
    }

    #[test]
    fn test_matching_agrees_with_max_flow() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..25 {
            let left_size = rng.gen_range(1..8);
            let right_size = rng.gen_range(1..8);
            let mut graph = BipartiteGraph::new(left_size, right_size);

            // Equivalent unit-capacity network: source 0, left nodes
            // 1..=L, right nodes L+1..=L+R, sink last.
            let size = left_size + right_size + 2;
            let (source, sink) = (0, size - 1);
            let mut network = FlowNetwork::new(size, source, sink).unwrap();
            for left in 0..left_size {
                network.add_edge(source, 1 + left, 1).unwrap();
            }
            for right in 0..right_size {
                network.add_edge(1 + left_size + right, sink, 1).unwrap();
            }
            for left in 0..left_size {
                for right in 0..right_size {
                    if rng.gen_bool(0.4) {
                        graph.add_edge(left, right).unwrap();
                        network.add_edge(1 + left, 1 + left_size + right, 1).unwrap();
                    }
                }
            }

            let matched = graph.max_matching().unwrap();
            assert_eq!(matched as i64, network.max_flow().unwrap());
        }
    }
}
