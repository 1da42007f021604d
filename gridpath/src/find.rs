use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::{Debug, Display},
    hash::Hash,
    ops::Deref,
};

use anyhow::bail;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable, hashable and not references (hence 'static)
pub trait NodeReference: Copy + Eq + Hash + Debug + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node reference is a node of the map
    fn is_valid(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the neighbors of the provided node and the cost required to go there
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = (Self::Reference, usize)>;

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + 'static>(&self) -> Self::Storage<T>;

    /// Number of unit steps between two nodes, ignoring costs
    fn distance(&self, from: Self::Reference, to: Self::Reference) -> usize;

    /// A lower bound on the cost of a move per unit of [`MapTrait::distance`] it covers
    fn min_cost(&self) -> usize;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// Estimate of the remaining cost used to order the frontier
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Plain step count. Moves can be cheaper than one step (an intensity difference may be 0),
    /// so this can overestimate and the returned path is not guaranteed to be the cheapest.
    Manhattan,
    /// Step count times the cheapest cost per step of the map. Never overestimates, so paths
    /// are optimal.
    #[default]
    ScaledManhattan,
    /// No estimate at all, the search degrades to Dijkstra.
    Zero,
}

impl Heuristic {
    /// Cost charged per unit of distance for this heuristic on the given map
    fn step_cost<M: MapTrait>(&self, map: &M) -> usize {
        match self {
            Heuristic::Manhattan => 1,
            Heuristic::ScaledManhattan => map.min_cost(),
            Heuristic::Zero => 0,
        }
    }
}

impl Display for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Heuristic::Manhattan => "manhattan",
                Heuristic::ScaledManhattan => "scaled_manhattan",
                Heuristic::Zero => "zero",
            }
        )
    }
}

/// The objects that we store in the priority queue
#[derive(Debug)]
struct ToVisit<R> {
    /// g + h, the priority
    estimate: usize,
    /// g at the time the entry was pushed
    cost: usize,
    point: R,
}

impl<R> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.estimate.cmp(&other.estimate).reverse() // reverse for BinaryHeap to be a min-heap
    }
}

impl<R> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R> Eq for ToVisit<R> {}

/// Best known cost of a discovered node and the node it was reached from
#[derive(Clone, Copy, Debug)]
pub struct VisitedItem<R> {
    pub cost: usize,
    pub from: Option<R>,
}

/// `None` until the node is discovered, which stands for an infinite cost
#[derive(Clone, Copy, Debug)]
pub struct Visited<R>(Option<VisitedItem<R>>);

impl<R> Default for Visited<R> {
    fn default() -> Self {
        Visited(None)
    }
}
impl<R> Deref for Visited<R> {
    type Target = Option<VisitedItem<R>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, PartialEq, Clone, Eq, Serialize, Deserialize)]
pub struct PathResult<R> {
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFinderState<R> {
    Computing,
    NoPathFound,
    PathFound(PathResult<R>),
}

impl<R> PathFinderState<R> {
    pub fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }

    /// The found path, or an empty one when the goal could not be reached
    pub fn into_path(self) -> Vec<R> {
        match self {
            PathFinderState::PathFound(result) => result.path,
            _ => Vec::new(),
        }
    }
}

/// Incremental A* search between two nodes of a map.
///
/// Every call to [`PathFinder::step`] pops one entry off the frontier. A node is pushed again
/// each time its cost strictly improves, and entries made obsolete by a later improvement are
/// dropped when popped. Among entries with the same estimate the heap decides which one comes
/// first, so when several cheapest paths exist any of them may be returned.
#[derive(Debug)]
pub struct PathFinder<
    R: NodeReference,
    S: MapStorage<Visited<R>, Reference = R>,
    M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
> {
    start: R,
    goal: R,
    heuristic: Heuristic,
    step_cost: usize,
    visited: S,
    visit_list: BinaryHeap<ToVisit<R>>,
    expanded: usize,
    state: PathFinderState<R>,
    _map: std::marker::PhantomData<M>,
}

impl<
        R: NodeReference,
        S: MapStorage<Visited<R>, Reference = R>,
        M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
    > PathFinder<R, S, M>
{
    /// Prepare a search on `map`. Fails if `start` or `goal` is not a node of the map.
    pub fn new(map: &M, start: R, goal: R, heuristic: Heuristic) -> Result<Self, anyhow::Error> {
        if !map.is_valid(start) {
            bail!("start {:?} is not a node of the map", start);
        }
        if !map.is_valid(goal) {
            bail!("goal {:?} is not a node of the map", goal);
        }

        let step_cost = heuristic.step_cost(map);
        let mut visited: S = map.create_storage::<Visited<R>>();
        *visited.get_mut(start) = Visited(Some(VisitedItem {
            cost: 0,
            from: None,
        }));

        Ok(Self {
            start,
            goal,
            heuristic,
            step_cost,
            visited,
            visit_list: BinaryHeap::from([ToVisit {
                estimate: map.distance(start, goal) * step_cost,
                cost: 0,
                point: start,
            }]),
            expanded: 0,
            state: PathFinderState::Computing,
            _map: std::marker::PhantomData,
        })
    }

    pub fn finish(mut self, map: &M) -> (PathFinderState<R>, S) {
        loop {
            match self.step(map) {
                PathFinderState::Computing => {}
                s => return (s, self.visited),
            }
        }
    }

    pub fn step(&mut self, map: &M) -> PathFinderState<R> {
        if self.state.is_done() {
            return self.state.clone();
        }

        let Some(visit) = self.visit_list.pop() else {
            debug!(
                "no path from {:?} to {:?} after expanding {} nodes",
                self.start, self.goal, self.expanded
            );
            self.state = PathFinderState::NoPathFound;
            return self.state.clone();
        };

        // skip entries superseded by a cheaper one pushed later
        if let Some(item) = self.visited.get(visit.point).0 {
            if item.cost < visit.cost {
                return self.state.clone();
            }
        }

        trace!(
            "expanding {:?} (g={}, f={})",
            visit.point,
            visit.cost,
            visit.estimate
        );

        if visit.point == self.goal {
            self.state = match self.backtrack() {
                Some(path) => {
                    debug!(
                        "found path from {:?} to {:?}: cost={} length={} expanded={} heuristic={}",
                        self.start,
                        self.goal,
                        visit.cost,
                        path.len(),
                        self.expanded,
                        self.heuristic
                    );
                    PathFinderState::PathFound(PathResult {
                        path,
                        total_cost: visit.cost,
                        start: self.start,
                        goal: self.goal,
                    })
                }
                None => PathFinderState::NoPathFound,
            };
            return self.state.clone();
        }

        self.expanded += 1;

        for (point, move_cost) in map.neighbors_of(visit.point) {
            let cost = visit.cost + move_cost;
            let improved = match self.visited.get(point).0 {
                Some(item) => cost < item.cost,
                None => true,
            };

            if improved {
                *self.visited.get_mut(point) = Visited(Some(VisitedItem {
                    cost,
                    from: Some(visit.point),
                }));
                self.visit_list.push(ToVisit {
                    estimate: cost + map.distance(point, self.goal) * self.step_cost,
                    cost,
                    point,
                });
            }
        }

        self.state.clone()
    }

    /// Follow the predecessors from the goal back to the start. Returns `None` if the chain does
    /// not end at the start.
    fn backtrack(&self) -> Option<Vec<R>> {
        let mut path = vec![self.goal];
        let mut current = self.goal;

        while let Some(from) = self.visited.get(current).0.and_then(|item| item.from) {
            path.push(from);
            current = from;
        }

        path.reverse();

        if path[0] == self.start {
            Some(path)
        } else {
            None
        }
    }

    pub fn state(&self) -> &PathFinderState<R> {
        &self.state
    }

    pub fn get_visited(&self) -> &S {
        &self.visited
    }

    /// Number of nodes whose neighbors have been relaxed so far
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn start(&self) -> R {
        self.start
    }

    pub fn goal(&self) -> R {
        self.goal
    }
}
