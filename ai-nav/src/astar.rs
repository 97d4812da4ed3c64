//! Stepped A* over any graph.
//!
//! The solver only sees a graph through [`GraphTraits`], [`HeuristicTraits`] and [`CostTraits`],
//! and keeps its frontier, visited set and per-node scores in pluggable [`OpenList`],
//! [`ClosedList`] and [`NodeContainer`] strategies. Work happens in budgeted
//! [`AStarSolver::update`] calls so an expensive search can be spread over several frames.
//!
//! Improved nodes are pushed onto the open list again instead of being re-keyed; the stale
//! entries are dropped when they are popped after the node was closed.

use core::cmp::Ordering;
use core::fmt;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// Topology of the searched graph.
pub trait GraphTraits {
    type Index: SearchIndex;
    /// Caller-side position, e.g. a world point.
    type Point: Clone;

    fn node_count(&self) -> usize;

    /// Node that best represents `point`, or `None` if the point is off the graph.
    fn best_node(&self, point: &Self::Point) -> Option<Self::Index>;

    fn node_point(&self, node: Self::Index) -> Self::Point;

    /// Appends the nodes reachable in one step from `node` to `out`.
    fn neighbors(&self, node: Self::Index, out: &mut Vec<Self::Index>);
}

pub trait HeuristicTraits<I> {
    /// Estimated cost from `from` to `to`. Never overestimating keeps the result optimal.
    fn estimate(&self, from: I, to: I) -> f32;
}

pub trait CostTraits<I> {
    /// Cost of the single step `from -> to`. Must not be negative.
    fn cost(&self, from: I, to: I) -> f32;
}

/// Index types the solver can key its bookkeeping by.
pub trait SearchIndex: Copy + Ord + fmt::Debug {
    type DefaultClosedList: ClosedList<Self> + Default;
}

/// Indices that map onto a dense bit position.
pub trait BitIndex: Copy {
    fn bit(self) -> usize;
}

impl BitIndex for usize {
    fn bit(self) -> usize {
        self
    }
}

impl BitIndex for u32 {
    fn bit(self) -> usize {
        self as usize
    }
}

impl SearchIndex for usize {
    type DefaultClosedList = BitsetClosedList;
}

impl SearchIndex for u32 {
    type DefaultClosedList = BitsetClosedList;
}

impl SearchIndex for u64 {
    type DefaultClosedList = OrderedClosedList<u64>;
}

impl SearchIndex for (i32, i32) {
    type DefaultClosedList = OrderedClosedList<(i32, i32)>;
}

/// Frontier of the search, ordered by ascending F.
pub trait OpenList<I> {
    fn clear(&mut self);

    fn push(&mut self, node: I, f: f32);

    /// Removes the entry with the lowest F. Equal scores come out in insertion order.
    fn pop(&mut self) -> Option<I>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Like [`OpenList::clear`], but also frees the backing storage.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry<I> {
    f: f32,
    node: I,
}

/// Frontier kept sorted on insertion: O(n) push, O(1) pop.
///
/// Cheapest for the short frontiers of small or well-guided searches.
#[derive(Debug, Clone)]
pub struct SortedOpenList<I> {
    // Descending F, so the best entry sits at the end.
    entries: Vec<OpenEntry<I>>,
}

impl<I> Default for SortedOpenList<I> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<I> OpenList<I> for SortedOpenList<I> {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, node: I, f: f32) {
        let at = self.entries.partition_point(|e| e.f > f);
        self.entries.insert(at, OpenEntry { f, node });
    }

    fn pop(&mut self) -> Option<I> {
        self.entries.pop().map(|e| e.node)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn release(&mut self) {
        self.entries = Vec::new();
    }
}

#[derive(Debug)]
struct HeapEntry<I> {
    f: f32,
    seq: u64,
    node: I,
}

impl<I> PartialEq for HeapEntry<I> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<I> Eq for HeapEntry<I> {}

impl<I> PartialOrd for HeapEntry<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I> Ord for HeapEntry<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Binary-heap frontier: O(log n) push and pop, for large searches.
#[derive(Debug)]
pub struct BinaryHeapOpenList<I> {
    heap: BinaryHeap<HeapEntry<I>>,
    seq: u64,
}

impl<I> Default for BinaryHeapOpenList<I> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }
}

impl<I> OpenList<I> for BinaryHeapOpenList<I> {
    fn clear(&mut self) {
        self.heap.clear();
        self.seq = 0;
    }

    fn push(&mut self, node: I, f: f32) {
        self.heap.push(HeapEntry {
            f,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<I> {
        self.heap.pop().map(|e| e.node)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn release(&mut self) {
        self.heap = BinaryHeap::new();
        self.seq = 0;
    }
}

/// Set of nodes whose best path is final.
pub trait ClosedList<I> {
    /// Forgets every closed node. `node_count` sizes dense storage up front.
    fn reset(&mut self, node_count: usize);

    fn close(&mut self, node: I);

    fn is_closed(&self, node: I) -> bool;

    fn release(&mut self);
}

/// One bit per node index.
#[derive(Debug, Clone, Default)]
pub struct BitsetClosedList {
    words: Vec<u64>,
}

impl<I: BitIndex> ClosedList<I> for BitsetClosedList {
    fn reset(&mut self, node_count: usize) {
        self.words.clear();
        self.words.resize(node_count.div_ceil(64), 0);
    }

    fn close(&mut self, node: I) {
        let bit = node.bit();
        let word = bit / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (bit % 64);
    }

    fn is_closed(&self, node: I) -> bool {
        let bit = node.bit();
        self.words
            .get(bit / 64)
            .is_some_and(|word| word & (1u64 << (bit % 64)) != 0)
    }

    fn release(&mut self) {
        self.words = Vec::new();
    }
}

/// Ordered set, for sparse or non-integer indices.
#[derive(Debug, Clone)]
pub struct OrderedClosedList<I> {
    closed: BTreeSet<I>,
}

impl<I> Default for OrderedClosedList<I> {
    fn default() -> Self {
        Self {
            closed: BTreeSet::new(),
        }
    }
}

impl<I: Ord> ClosedList<I> for OrderedClosedList<I> {
    fn reset(&mut self, _node_count: usize) {
        self.closed.clear();
    }

    fn close(&mut self, node: I) {
        self.closed.insert(node);
    }

    fn is_closed(&self, node: I) -> bool {
        self.closed.contains(&node)
    }

    fn release(&mut self) {
        self.closed = BTreeSet::new();
    }
}

/// Per-node search bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchNode<I> {
    /// Cost of the best known path from the start.
    pub g: f32,
    /// `g` plus the heuristic estimate to the goal.
    pub f: f32,
    pub parent: Option<I>,
}

impl<I> SearchNode<I> {
    pub fn unvisited() -> Self {
        Self {
            g: f32::INFINITY,
            f: f32::INFINITY,
            parent: None,
        }
    }
}

/// Storage for [`SearchNode`]s, created on first touch.
pub trait NodeContainer<I> {
    fn clear(&mut self);

    fn get(&self, node: I) -> Option<&SearchNode<I>>;

    /// Bookkeeping for `node`, created [unvisited](SearchNode::unvisited) if missing.
    fn get_mut(&mut self, node: I) -> &mut SearchNode<I>;

    /// Nodes touched since the last clear.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&mut self);
}

#[derive(Debug, Clone)]
pub struct MapNodeContainer<I> {
    nodes: BTreeMap<I, SearchNode<I>>,
}

impl<I> Default for MapNodeContainer<I> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }
}

impl<I: Ord> NodeContainer<I> for MapNodeContainer<I> {
    fn clear(&mut self) {
        self.nodes.clear();
    }

    fn get(&self, node: I) -> Option<&SearchNode<I>> {
        self.nodes.get(&node)
    }

    fn get_mut(&mut self, node: I) -> &mut SearchNode<I> {
        self.nodes.entry(node).or_insert_with(SearchNode::unvisited)
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn release(&mut self) {
        self.nodes = BTreeMap::new();
    }
}

/// Slot per node index. Faster than the map when most of the graph gets touched.
#[derive(Debug, Clone)]
pub struct DenseNodeContainer<I> {
    nodes: Vec<Option<SearchNode<I>>>,
    touched: usize,
}

impl<I> Default for DenseNodeContainer<I> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            touched: 0,
        }
    }
}

impl<I: BitIndex> NodeContainer<I> for DenseNodeContainer<I> {
    fn clear(&mut self) {
        self.nodes.iter_mut().for_each(|slot| *slot = None);
        self.touched = 0;
    }

    fn get(&self, node: I) -> Option<&SearchNode<I>> {
        self.nodes.get(node.bit())?.as_ref()
    }

    fn get_mut(&mut self, node: I) -> &mut SearchNode<I> {
        let slot = node.bit();
        if slot >= self.nodes.len() {
            self.nodes.resize_with(slot + 1, || None);
        }
        let entry = &mut self.nodes[slot];
        if entry.is_none() {
            self.touched += 1;
        }
        entry.get_or_insert_with(SearchNode::unvisited)
    }

    fn len(&self) -> usize {
        self.touched
    }

    fn release(&mut self) {
        self.nodes = Vec::new();
        self.touched = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchState {
    /// No search started since construction or [`AStarSolver::reset`].
    #[default]
    Idle,
    Searching,
    Found,
    /// The open list ran dry, or an endpoint was off the graph.
    NoPath,
}

/// Budgeted A* search.
///
/// The graph, heuristic and cost are borrowed for `'a` by
/// [`AStarSolver::start_path_find`]; the strategy storage is reused across searches until
/// [`AStarSolver::reset`] frees it.
pub struct AStarSolver<
    'a,
    G,
    H,
    C,
    O = SortedOpenList<<G as GraphTraits>::Index>,
    L = <<G as GraphTraits>::Index as SearchIndex>::DefaultClosedList,
    N = MapNodeContainer<<G as GraphTraits>::Index>,
> where
    G: GraphTraits,
{
    graph: Option<&'a G>,
    heuristic: Option<&'a H>,
    cost: Option<&'a C>,
    open: O,
    closed: L,
    nodes: N,
    goal: Option<G::Index>,
    end_point: Option<G::Point>,
    path: Vec<G::Index>,
    state: SearchState,
    expanded: usize,
    scratch: Vec<G::Index>,
}

impl<G, H, C, O, L, N> fmt::Debug for AStarSolver<'_, G, H, C, O, L, N>
where
    G: GraphTraits,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AStarSolver")
            .field("state", &self.state)
            .field("goal", &self.goal)
            .field("expanded", &self.expanded)
            .field("path", &self.path)
            .finish()
    }
}

impl<'a, G, H, C, O, L, N> Default for AStarSolver<'a, G, H, C, O, L, N>
where
    G: GraphTraits,
    H: HeuristicTraits<G::Index>,
    C: CostTraits<G::Index>,
    O: OpenList<G::Index> + Default,
    L: ClosedList<G::Index> + Default,
    N: NodeContainer<G::Index> + Default,
{
    fn default() -> Self {
        Self::with_strategies(O::default(), L::default(), N::default())
    }
}

impl<'a, G, H, C, O, L, N> AStarSolver<'a, G, H, C, O, L, N>
where
    G: GraphTraits,
    H: HeuristicTraits<G::Index>,
    C: CostTraits<G::Index>,
    O: OpenList<G::Index>,
    L: ClosedList<G::Index>,
    N: NodeContainer<G::Index>,
{
    pub fn new() -> Self
    where
        O: Default,
        L: Default,
        N: Default,
    {
        Self::default()
    }

    pub fn with_strategies(open: O, closed: L, nodes: N) -> Self {
        Self {
            graph: None,
            heuristic: None,
            cost: None,
            open,
            closed,
            nodes,
            goal: None,
            end_point: None,
            path: Vec::new(),
            state: SearchState::Idle,
            expanded: 0,
            scratch: Vec::new(),
        }
    }

    /// Begins a search from `start` to `end`, discarding any previous one.
    ///
    /// Returns [`SearchState::NoPath`] right away when either point is off the graph.
    pub fn start_path_find(
        &mut self,
        graph: &'a G,
        heuristic: &'a H,
        cost: &'a C,
        start: &G::Point,
        end: &G::Point,
    ) -> SearchState {
        self.open.clear();
        self.closed.reset(graph.node_count());
        self.nodes.clear();
        self.path.clear();
        self.expanded = 0;
        self.graph = Some(graph);
        self.heuristic = Some(heuristic);
        self.cost = Some(cost);
        self.end_point = Some(end.clone());
        self.goal = None;

        let (Some(start_node), Some(goal_node)) = (graph.best_node(start), graph.best_node(end))
        else {
            tracing::debug!("A* endpoint is not on the graph");
            self.state = SearchState::NoPath;
            return self.state;
        };

        let f = heuristic.estimate(start_node, goal_node);
        *self.nodes.get_mut(start_node) = SearchNode {
            g: 0.0,
            f,
            parent: None,
        };
        self.open.push(start_node, f);
        self.goal = Some(goal_node);
        self.state = SearchState::Searching;
        self.state
    }

    /// Pops up to `budget` open entries. Returns the part of the budget left unused.
    ///
    /// `0` means the budget ran out; check [`AStarSolver::state`] to tell "still searching"
    /// from "found on the last pop".
    pub fn update(&mut self, budget: usize) -> usize {
        if self.state != SearchState::Searching {
            return budget;
        }
        let (Some(graph), Some(heuristic), Some(cost), Some(goal)) =
            (self.graph, self.heuristic, self.cost, self.goal)
        else {
            return budget;
        };

        let mut neighbors = std::mem::take(&mut self.scratch);
        let mut remaining = budget;
        while remaining > 0 {
            let Some(node) = self.open.pop() else {
                tracing::debug!(expanded = self.expanded, "A* found no path");
                self.state = SearchState::NoPath;
                break;
            };
            remaining -= 1;

            if self.closed.is_closed(node) {
                continue;
            }
            self.closed.close(node);
            self.expanded += 1;

            if node == goal {
                self.reconstruct(goal);
                self.state = SearchState::Found;
                break;
            }

            let g = self.nodes.get(node).map_or(f32::INFINITY, |n| n.g);
            neighbors.clear();
            graph.neighbors(node, &mut neighbors);
            for &next in &neighbors {
                if self.closed.is_closed(next) {
                    continue;
                }
                let next_g = g + cost.cost(node, next);
                let next_f = next_g + heuristic.estimate(next, goal);
                let entry = self.nodes.get_mut(next);
                if next_f < entry.f {
                    *entry = SearchNode {
                        g: next_g,
                        f: next_f,
                        parent: Some(node),
                    };
                    self.open.push(next, next_f);
                }
            }
        }
        self.scratch = neighbors;
        remaining
    }

    fn reconstruct(&mut self, goal: G::Index) {
        self.path.clear();
        let mut current = Some(goal);
        while let Some(node) = current {
            self.path.push(node);
            current = self.nodes.get(node).and_then(|n| n.parent);
        }
        self.path.reverse();
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_searching(&self) -> bool {
        self.state == SearchState::Searching
    }

    pub fn path_found(&self) -> bool {
        self.state == SearchState::Found
    }

    /// Nodes that were closed by the current search.
    pub fn expanded_nodes(&self) -> usize {
        self.expanded
    }

    /// Open-list entries, stale duplicates included.
    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    /// Found path as graph nodes, start first. Empty unless a path was found.
    pub fn path_nodes(&self) -> &[G::Index] {
        &self.path
    }

    pub fn path_cost(&self) -> Option<f32> {
        if !self.path_found() {
            return None;
        }
        let goal = self.goal?;
        self.nodes.get(goal).map(|n| n.g)
    }

    /// Node points from start to goal, followed by the requested end point.
    pub fn get_path(&self) -> Vec<G::Point> {
        let (Some(graph), Some(end)) = (self.graph, self.end_point.as_ref()) else {
            return Vec::new();
        };
        if !self.path_found() {
            return Vec::new();
        }
        let mut points = Vec::with_capacity(self.path.len() + 1);
        points.extend(self.path.iter().map(|&node| graph.node_point(node)));
        points.push(end.clone());
        points
    }

    /// [`AStarSolver::get_path`] back to front: the requested end point comes first.
    pub fn get_path_reversed(&self) -> Vec<G::Point> {
        let mut points = self.get_path();
        points.reverse();
        points
    }

    /// Drops the current search and frees all strategy storage. The solver stays usable.
    pub fn reset(&mut self) {
        self.open.release();
        self.closed.release();
        self.nodes.release();
        self.path = Vec::new();
        self.scratch = Vec::new();
        self.graph = None;
        self.heuristic = None;
        self.cost = None;
        self.goal = None;
        self.end_point = None;
        self.expanded = 0;
        self.state = SearchState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<O: OpenList<u32>>(mut open: O) -> Vec<u32> {
        for (node, f) in [(1, 3.0), (2, 1.0), (3, 2.0), (4, 1.0), (5, 0.5)] {
            open.push(node, f);
        }
        std::iter::from_fn(|| open.pop()).collect()
    }

    #[test]
    fn open_lists_pop_lowest_f_first_and_keep_insertion_order_on_ties() {
        assert_eq!(drain(SortedOpenList::default()), vec![5, 2, 4, 3, 1]);
        assert_eq!(drain(BinaryHeapOpenList::default()), vec![5, 2, 4, 3, 1]);
    }

    #[test]
    fn bitset_closed_list_grows_past_its_reset_size() {
        let mut closed = BitsetClosedList::default();
        ClosedList::<usize>::reset(&mut closed, 10);
        closed.close(3usize);
        closed.close(200usize);
        assert!(closed.is_closed(3usize));
        assert!(closed.is_closed(200usize));
        assert!(!closed.is_closed(4usize));
        assert!(!closed.is_closed(10_000usize));

        ClosedList::<usize>::reset(&mut closed, 10);
        assert!(!closed.is_closed(3usize));
    }

    #[test]
    fn dense_container_counts_touched_nodes() {
        let mut nodes = DenseNodeContainer::<usize>::default();
        assert!(nodes.get(7).is_none());
        nodes.get_mut(7).g = 2.0;
        nodes.get_mut(7).f = 3.0;
        nodes.get_mut(2);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.get(7).map(|n| n.g), Some(2.0));

        nodes.clear();
        assert!(nodes.is_empty());
        assert!(nodes.get(7).is_none());
    }
}
