//! Approximate nearest-neighbour index over angular distance.
//!
//! The index is a forest of random-projection trees. Each internal node splits
//! its items by the hyperplane through the origin orthogonal to the difference
//! of two randomly chosen (normalized) items; leaves hold at most [`LEAF_SIZE`]
//! items. Queries walk all trees best-first, gather candidates, and re-rank
//! them by exact angular distance.


use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::AssistantError;

/// Maximum number of items stored in a single leaf
pub const LEAF_SIZE: usize = 16;

/// Random pairs tried per split before scanning for a distinct item
const SPLIT_ATTEMPTS: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("Index has not been built")]
    NotBuilt,
    #[error("Index contains no items")]
    Empty,
    #[error("Index is already built and is read-only")]
    AlreadyBuilt,
    #[error("Item {0} has already been added")]
    DuplicateId(usize),
    #[error("Vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Tree count must be at least 1")]
    InvalidTreeCount,
}

impl From<IndexError> for AssistantError {
    #[inline]
    fn from(error: IndexError) -> Self {
        Self::IndexState(error.to_string())
    }
}

#[derive(Debug)]
enum Node {
    /// Positions into the item storage
    Leaf(Vec<usize>),
    Split {
        normal: Vec<f32>,
        left: usize,
        right: usize,
    },
}

/// Heap entry for best-first traversal; larger priority is explored first
#[derive(Debug)]
struct Candidate {
    priority: f32,
    node: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

pub struct VectorIndex {
    dimension: usize,
    ids: Vec<usize>,
    vectors: Vec<Vec<f32>>,
    seen_ids: HashSet<usize>,
    nodes: Vec<Node>,
    roots: Vec<usize>,
    built: bool,
    rng: StdRng,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimension", &self.dimension)
            .field("items", &self.ids.len())
            .field("trees", &self.roots.len())
            .field("built", &self.built)
            .finish()
    }
}

impl VectorIndex {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self::with_rng(dimension, StdRng::from_entropy())
    }

    /// Create an index whose tree construction is reproducible
    #[inline]
    pub fn with_seed(dimension: usize, seed: u64) -> Self {
        Self::with_rng(dimension, StdRng::seed_from_u64(seed))
    }

    fn with_rng(dimension: usize, rng: StdRng) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
            seen_ids: HashSet::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
            built: false,
            rng,
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[inline]
    pub fn tree_count(&self) -> usize {
        self.roots.len()
    }

    /// Register `vector` under `id`. Only allowed before [`build`](Self::build).
    #[inline]
    pub fn add(&mut self, id: usize, vector: &[f32]) -> Result<(), IndexError> {
        if self.built {
            return Err(IndexError::AlreadyBuilt);
        }

        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        if !self.seen_ids.insert(id) {
            return Err(IndexError::DuplicateId(id));
        }

        self.ids.push(id);
        self.vectors.push(normalize(vector));
        Ok(())
    }

    /// Build `tree_count` trees over every added item. The index is read-only afterwards.
    ///
    /// More trees improve recall at the cost of memory and build time.
    #[inline]
    pub fn build(&mut self, tree_count: usize) -> Result<(), IndexError> {
        if self.built {
            return Err(IndexError::AlreadyBuilt);
        }

        if tree_count == 0 {
            return Err(IndexError::InvalidTreeCount);
        }

        if self.is_empty() {
            return Err(IndexError::Empty);
        }

        for _ in 0..tree_count {
            let positions: Vec<usize> = (0..self.vectors.len()).collect();
            let root = self.build_node(positions);
            self.roots.push(root);
        }

        self.built = true;

        info!(
            "Built index with {} trees over {} items ({} nodes)",
            tree_count,
            self.len(),
            self.nodes.len()
        );
        Ok(())
    }

    /// Return the ids of the `k` items nearest to `vector`, nearest first.
    ///
    /// When `k` exceeds the item count every id is returned once. Items at equal
    /// distance are ordered by ascending id.
    #[inline]
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<usize>, IndexError> {
        Ok(self
            .query_with_distances(vector, k)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Like [`query`](Self::query) but also returns the angular distance of each hit
    #[inline]
    pub fn query_with_distances(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<(usize, f32)>, IndexError> {
        if !self.built {
            return Err(IndexError::NotBuilt);
        }

        if self.is_empty() {
            return Err(IndexError::Empty);
        }

        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let query = normalize(vector);
        let candidates = self.collect_candidates(&query, k);

        let mut hits: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|position| {
                (
                    self.ids[position],
                    unit_angular_distance(&query, &self.vectors[position]),
                )
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        hits.truncate(k);

        debug!(
            "Query returned {} of {} requested neighbours",
            hits.len(),
            k
        );
        Ok(hits)
    }

    /// Best-first walk over every tree until `k * tree_count` distinct items
    /// (capped at the item count) have been collected
    fn collect_candidates(&self, query: &[f32], k: usize) -> Vec<usize> {
        let target = k.saturating_mul(self.roots.len()).min(self.len());

        let mut heap: BinaryHeap<Candidate> = self
            .roots
            .iter()
            .map(|&node| Candidate {
                priority: f32::INFINITY,
                node,
            })
            .collect();

        let mut visited = vec![false; self.len()];
        let mut candidates = Vec::with_capacity(target);

        while candidates.len() < target {
            let Some(Candidate { priority, node }) = heap.pop() else {
                break;
            };

            match &self.nodes[node] {
                Node::Leaf(positions) => {
                    for &position in positions {
                        if !visited[position] {
                            visited[position] = true;
                            candidates.push(position);
                        }
                    }
                }
                Node::Split {
                    normal,
                    left,
                    right,
                } => {
                    let margin = dot(normal, query);
                    heap.push(Candidate {
                        priority: priority.min(margin),
                        node: *right,
                    });
                    heap.push(Candidate {
                        priority: priority.min(-margin),
                        node: *left,
                    });
                }
            }
        }

        candidates
    }

    fn build_node(&mut self, positions: Vec<usize>) -> usize {
        if positions.len() <= LEAF_SIZE {
            self.nodes.push(Node::Leaf(positions));
            return self.nodes.len() - 1;
        }

        let split = self.split_normal(&positions).and_then(|normal| {
            let (left, right): (Vec<usize>, Vec<usize>) = positions
                .iter()
                .partition(|&&position| dot(&normal, &self.vectors[position]) <= 0.0);
            // Near-identical items can still round onto one side
            (!left.is_empty() && !right.is_empty()).then_some((normal, left, right))
        });

        let (normal, left, right) = match split {
            Some(split) => split,
            None => {
                // No separating plane: the items are identical. Assign sides at
                // random with a zero normal so queries explore both sides equally.
                let (mut left, mut right): (Vec<usize>, Vec<usize>) =
                    positions.iter().partition(|_| self.rng.gen_bool(0.5));
                if left.is_empty() || right.is_empty() {
                    let mid = positions.len() / 2;
                    left = positions[..mid].to_vec();
                    right = positions[mid..].to_vec();
                }
                (vec![0.0; self.dimension], left, right)
            }
        };

        let left = self.build_node(left);
        let right = self.build_node(right);
        self.nodes.push(Node::Split {
            normal,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    /// Normal of the hyperplane separating two distinct items of the node, or
    /// `None` when all of its items are identical
    fn split_normal(&mut self, positions: &[usize]) -> Option<Vec<f32>> {
        let count = positions.len();
        let mut first = 0;
        let mut second = None;

        for _ in 0..SPLIT_ATTEMPTS {
            first = self.rng.gen_range(0..count);
            let mut candidate = self.rng.gen_range(0..count - 1);
            if candidate >= first {
                candidate += 1;
            }
            if self.vectors[positions[first]] != self.vectors[positions[candidate]] {
                second = Some(candidate);
                break;
            }
        }

        // Mostly duplicates: scan for any item that differs from the first pick
        let second = second.or_else(|| {
            let anchor = &self.vectors[positions[first]];
            positions
                .iter()
                .position(|&position| self.vectors[position] != *anchor)
        })?;

        let a = &self.vectors[positions[first]];
        let b = &self.vectors[positions[second]];
        Some(normalize(
            &a.iter().zip(b).map(|(x, y)| x - y).collect::<Vec<_>>(),
        ))
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = dot(vector, vector).sqrt();
    if norm == 0.0 {
        vector.to_vec()
    } else {
        vector.iter().map(|x| x / norm).collect()
    }
}

fn unit_angular_distance(a: &[f32], b: &[f32]) -> f32 {
    (2.0 - 2.0 * dot(a, b)).max(0.0).sqrt()
}

/// Angular distance `sqrt(2 - 2 * cos(a, b))`, in `[0, 2]`.
/// A zero vector is treated as orthogonal to everything.
#[inline]
pub fn angular_distance(a: &[f32], b: &[f32]) -> f32 {
    unit_angular_distance(&normalize(a), &normalize(b))
}
