//! Maximum-flow and maximum-bipartite-matching algorithms.
//!
//! Both algorithms share one skeleton: a breadth-first layering pass that
//! partitions the residual graph by distance from the source, alternating
//! with a depth-first augmenting pass confined to strictly increasing
//! layers. [`dinic`] implements the general capacitated case, [`hopcroft_karp`]
//! the unit-capacity bipartite specialization with its tighter phase bound.

pub mod dinic;
pub mod hopcroft_karp;

pub use dinic::FlowNetwork;
pub use hopcroft_karp::BipartiteGraph;
