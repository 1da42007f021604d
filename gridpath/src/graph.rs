use std::collections::HashMap;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use anyhow::anyhow;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::field::IntensityField;
use crate::find::{MapStorage, MapTrait, NodeReference};

/// Grid coordinates, the key every node is identified by
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan (L1) distance, i.e. the number of 4-connected steps between the two points
    pub fn manhattan(self, other: Point) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl NodeReference for Point {}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A grid cell together with its intensity.
///
/// Equality and hashing only look at the coordinates, so a node built from a bare [`Point`]
/// with any intensity matches the one stored in the graph.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub row: usize,
    pub col: usize,
    pub intensity: u8,
}

impl Node {
    pub fn new(row: usize, col: usize, intensity: u8) -> Self {
        Self {
            row,
            col,
            intensity,
        }
    }

    pub fn point(&self) -> Point {
        Point {
            row: self.row,
            col: self.col,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.point() == other.point()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.point().hash(state);
    }
}

impl From<Node> for Point {
    fn from(node: Node) -> Self {
        node.point()
    }
}

/// A directed, weighted connection between two nodes
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Point,
    pub to: Point,
    pub weight: usize,
}

/// Adjacency-list graph over grid nodes.
///
/// Nodes are kept in insertion order and every node owns an ordered list of outgoing edges.
/// Every edge endpoint is guaranteed to be a node of the graph.
#[derive(Debug, Clone, Default)]
pub struct IntensityGraph {
    nodes: Vec<Node>,
    index: HashMap<Point, usize>,
    adjacency: Vec<Vec<Edge>>,
    min_weight: Option<usize>,
    /// Smallest `weight / distance` (floored) over edges joining distinct points
    min_step_cost: Option<usize>,
}

impl IntensityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the 4-connected graph of a field.
    ///
    /// Every cell becomes a node, and every pair of vertically or horizontally adjacent cells is
    /// joined by two directed edges weighted with the absolute intensity difference. The edges
    /// of a node are always inserted in the order up, left, down, right.
    pub fn from_field(field: &IntensityField) -> Self {
        let rows = field.rows();
        let columns = field.columns();

        let mut graph = Self {
            nodes: Vec::with_capacity(rows * columns),
            index: HashMap::with_capacity(rows * columns),
            adjacency: Vec::with_capacity(rows * columns),
            min_weight: None,
            min_step_cost: None,
        };

        for (point, intensity) in field.iter() {
            graph.add_node(Node::new(point.row, point.col, intensity));
        }

        for (i, (point, intensity)) in field.iter().enumerate() {
            let mut neighbors = Vec::with_capacity(4);

            if point.row > 0 {
                neighbors.push(Point {
                    row: point.row - 1,
                    col: point.col,
                });
            }
            if point.col > 0 {
                neighbors.push(Point {
                    row: point.row,
                    col: point.col - 1,
                });
            }
            if point.row < rows - 1 {
                neighbors.push(Point {
                    row: point.row + 1,
                    col: point.col,
                });
            }
            if point.col < columns - 1 {
                neighbors.push(Point {
                    row: point.row,
                    col: point.col + 1,
                });
            }

            for to in neighbors {
                if let Some(other) = field.get(to) {
                    graph.push_edge(
                        i,
                        Edge {
                            from: point,
                            to,
                            weight: intensity.abs_diff(other) as usize,
                        },
                    );
                }
            }
        }

        debug!(
            "built {}x{} graph with {} nodes and {} edges",
            rows,
            columns,
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }

    /// Validate nested rows and build their graph in one go
    pub fn from_rows<T: Copy + Into<i64>>(rows: &[Vec<T>]) -> Result<Self, anyhow::Error> {
        Ok(Self::from_field(&IntensityField::from_rows(rows)?))
    }

    /// Insert a node with no edges. Returns `false` if a node with the same coordinates is
    /// already present, in which case the graph is left unchanged.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.point()) {
            return false;
        }

        self.index.insert(node.point(), self.nodes.len());
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        true
    }

    /// Append a directed edge. Both endpoints must already be nodes of the graph.
    pub fn add_edge(&mut self, from: Point, to: Point, weight: usize) -> Result<(), anyhow::Error> {
        let i = *self
            .index
            .get(&from)
            .ok_or_else(|| anyhow!("edge start {} is not a node of the graph", from))?;
        if !self.contains(to) {
            return Err(anyhow!("edge end {} is not a node of the graph", to));
        }

        self.push_edge(i, Edge { from, to, weight });
        Ok(())
    }

    fn push_edge(&mut self, i: usize, edge: Edge) {
        self.min_weight = Some(self.min_weight.map_or(edge.weight, |w| w.min(edge.weight)));

        // self loops never shorten a path
        let distance = edge.from.manhattan(edge.to);
        if distance > 0 {
            let step_cost = edge.weight / distance;
            self.min_step_cost = Some(self.min_step_cost.map_or(step_cost, |c| c.min(step_cost)));
        }
        self.adjacency[i].push(edge);
    }

    pub fn contains(&self, point: Point) -> bool {
        self.index.contains_key(&point)
    }

    pub fn node(&self, point: Point) -> Option<Node> {
        self.index.get(&point).map(|&i| self.nodes[i])
    }

    /// Outgoing edges of a node, empty for points that are not in the graph
    pub fn edges(&self, point: Point) -> &[Edge] {
        match self.index.get(&point) {
            Some(&i) => &self.adjacency[i],
            None => &[],
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|edges| edges.len()).sum()
    }

    /// The smallest edge weight, `None` for a graph without edges
    pub fn min_weight(&self) -> Option<usize> {
        self.min_weight
    }

    /// The smallest cost per unit of Manhattan distance over all edges, rounded down.
    ///
    /// Edges of a grid built from a field are one step long, so there it equals
    /// [`IntensityGraph::min_weight`]. Hand-added edges may span several steps.
    pub fn min_step_cost(&self) -> Option<usize> {
        self.min_step_cost
    }

    /// Total weight of a walk through the graph, or `None` if two consecutive points are not
    /// joined by an edge. When several parallel edges exist the cheapest one is used.
    pub fn path_cost(&self, path: &[Point]) -> Option<usize> {
        path.windows(2).try_fold(0, |total, pair| {
            self.edges(pair[0])
                .iter()
                .filter(|e| e.to == pair[1])
                .map(|e| e.weight)
                .min()
                .map(|w| total + w)
        })
    }
}

/// A MapStorage keyed by point; points never written read back as `T::default()`
#[derive(Debug)]
pub struct NodeStorage<T>(HashMap<Point, T>);

impl<T: Default + Copy + 'static> MapStorage<T> for NodeStorage<T> {
    type Reference = Point;

    fn get(&self, node: Self::Reference) -> T {
        self.0.get(&node).copied().unwrap_or_default()
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        self.0.entry(node).or_default()
    }
}

impl MapTrait for IntensityGraph {
    type Reference = Point;
    type Storage<T: Default + Copy + 'static> = NodeStorage<T>;

    fn is_valid(&self, node: Self::Reference) -> bool {
        self.contains(node)
    }

    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = (Self::Reference, usize)> {
        self.edges(node).iter().map(|e| (e.to, e.weight))
    }

    fn create_storage<T: Default + Copy + 'static>(&self) -> Self::Storage<T> {
        NodeStorage(HashMap::new())
    }

    fn distance(&self, from: Self::Reference, to: Self::Reference) -> usize {
        from.manhattan(to)
    }

    fn min_cost(&self) -> usize {
        self.min_step_cost.unwrap_or(0)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn edge_weight(graph: &IntensityGraph, from: Point, to: Point) -> Option<usize> {
        graph
            .edges(from)
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.weight)
    }

    #[test]
    fn test_two_by_two() {
        let graph = IntensityGraph::from_rows(&[vec![0, 10], vec![20, 30]]).unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 8);

        let p = |row, col| Point { row, col };
        for (a, b, w) in [
            (p(0, 0), p(0, 1), 10),
            (p(0, 0), p(1, 0), 20),
            (p(0, 1), p(1, 1), 20),
            (p(1, 0), p(1, 1), 10),
        ] {
            assert_eq!(edge_weight(&graph, a, b), Some(w));
            assert_eq!(edge_weight(&graph, b, a), Some(w));
        }

        // no diagonals
        assert_eq!(edge_weight(&graph, p(0, 0), p(1, 1)), None);
        assert_eq!(graph.min_weight(), Some(10));
        assert_eq!(graph.min_step_cost(), Some(10));
    }

    #[test]
    fn test_edge_order() {
        let graph = IntensityGraph::from_rows(&[vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]])
            .unwrap();

        let order: Vec<Point> = graph
            .edges(Point::new(1, 1))
            .iter()
            .map(|e| e.to)
            .collect();
        assert_eq!(
            order,
            vec![
                Point::new(0, 1),
                Point::new(1, 0),
                Point::new(2, 1),
                Point::new(1, 2)
            ]
        );

        // corners skip the out-of-bounds directions but keep the order
        let order: Vec<Point> = graph
            .edges(Point::new(2, 2))
            .iter()
            .map(|e| e.to)
            .collect();
        assert_eq!(order, vec![Point::new(1, 2), Point::new(2, 1)]);

        assert!(graph
            .edges(Point::new(1, 1))
            .iter()
            .all(|e| e.from == Point::new(1, 1)));
    }

    #[test]
    fn test_counts_scale_with_size() {
        for n in [1, 2, 3, 8, 17] {
            let field = IntensityField::random_seeded(n, n, n as u64).unwrap();
            let graph = IntensityGraph::from_field(&field);

            assert_eq!(graph.node_count(), n * n);
            assert_eq!(graph.edge_count(), 2 * (2 * n * n - 2 * n));
        }
    }

    #[test]
    fn test_identical_input_builds_identical_graph() {
        let field = IntensityField::random_seeded(6, 9, 3).unwrap();
        let a = IntensityGraph::from_field(&field);
        let b = IntensityGraph::from_field(&field);

        for node in a.nodes() {
            assert_eq!(a.edges(node.point()), b.edges(node.point()));
        }
    }

    #[test]
    fn test_node_identity_ignores_intensity() {
        let graph = IntensityGraph::from_rows(&[vec![5, 6]]).unwrap();

        let stored = graph.node(Point::new(0, 1)).unwrap();
        assert_eq!(stored.intensity, 6);
        assert_eq!(stored, Node::new(0, 1, 200));
        assert_ne!(stored, Node::new(0, 0, 6));

        let mut seen = std::collections::HashSet::new();
        seen.insert(stored);
        assert!(seen.contains(&Node::new(0, 1, 0)));
    }

    #[test]
    fn test_manual_construction() {
        let mut graph = IntensityGraph::new();
        assert!(graph.add_node(Node::new(0, 0, 1)));
        assert!(graph.add_node(Node::new(0, 1, 9)));
        assert!(!graph.add_node(Node::new(0, 1, 0)));
        assert_eq!(graph.node(Point::new(0, 1)).unwrap().intensity, 9);

        assert!(graph.edges(Point::new(0, 0)).is_empty());
        assert!(graph.edges(Point::new(5, 5)).is_empty());
        assert_eq!(graph.min_weight(), None);

        graph.add_edge(Point::new(0, 0), Point::new(0, 1), 8).unwrap();
        assert!(graph.add_edge(Point::new(0, 0), Point::new(3, 3), 1).is_err());
        assert!(graph.add_edge(Point::new(3, 3), Point::new(0, 0), 1).is_err());

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.min_weight(), Some(8));
        assert_eq!(graph.min_step_cost(), Some(8));

        // a long edge lowers the cost per step, a self loop is ignored
        graph.add_node(Node::new(0, 5, 0));
        graph.add_edge(Point::new(0, 0), Point::new(0, 5), 9).unwrap();
        graph.add_edge(Point::new(0, 5), Point::new(0, 5), 0).unwrap();
        assert_eq!(graph.min_weight(), Some(0));
        assert_eq!(graph.min_step_cost(), Some(1));
    }

    #[test]
    fn test_path_cost() {
        let graph = IntensityGraph::from_rows(&[vec![0, 10], vec![20, 30]]).unwrap();

        assert_eq!(
            graph.path_cost(&[Point::new(0, 0), Point::new(0, 1), Point::new(1, 1)]),
            Some(30)
        );
        assert_eq!(graph.path_cost(&[Point::new(0, 0)]), Some(0));
        assert_eq!(
            graph.path_cost(&[Point::new(0, 0), Point::new(1, 1)]),
            None
        );
    }
}
