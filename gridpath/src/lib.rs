//! Cheapest paths across intensity grids.
//!
//! A rectangular [`IntensityField`] is turned into an [`IntensityGraph`] where every cell is a
//! node joined to its four direct neighbors, each move costing the absolute intensity difference
//! of the two cells. [`PathFinder`] then runs an A* search over that graph.
//!
//! ```
//! use gridpath::{shortest_path, IntensityGraph, Point};
//!
//! let graph = IntensityGraph::from_rows(&[vec![0, 10], vec![20, 30]])?;
//! let path = shortest_path(&graph, Point::new(0, 0), Point::new(1, 1))?;
//!
//! assert_eq!(path.len(), 3);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod field;
pub mod find;
pub mod graph;
pub mod util;

pub use field::IntensityField;
pub use find::{
    Heuristic, MapStorage, MapTrait, NodeReference, PathFinder, PathFinderState, PathResult,
    Visited, VisitedItem,
};
pub use graph::{Edge, IntensityGraph, Node, Point};

/// Cheapest path from `start` to `goal`, both included, using the default [`Heuristic`].
///
/// Returns an empty path when the goal cannot be reached, and an error when either end is not a
/// node of the graph.
pub fn shortest_path(
    graph: &IntensityGraph,
    start: impl Into<Point>,
    goal: impl Into<Point>,
) -> Result<Vec<Node>, anyhow::Error> {
    shortest_path_with(graph, start, goal, Heuristic::default())
}

pub fn shortest_path_with(
    graph: &IntensityGraph,
    start: impl Into<Point>,
    goal: impl Into<Point>,
    heuristic: Heuristic,
) -> Result<Vec<Node>, anyhow::Error> {
    let (state, _) = PathFinder::new(graph, start.into(), goal.into(), heuristic)?.finish(graph);

    Ok(state
        .into_path()
        .into_iter()
        .filter_map(|point| graph.node(point))
        .collect())
}
