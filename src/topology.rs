//! Strut topology: which node pairs are connected and by which strut index.
//!
//! Struts are unordered pairs. The pair → index map is keyed by the sorted
//! pair, so `strut_index(i, j) == strut_index(j, i)` holds by construction,
//! and indices are dense in `0..num_struts` in the order struts were listed.

use std::collections::HashMap;

use crate::error::{Result, TrussError};

/// Static strut connectivity of a truss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    num_nodes: usize,
    struts: Vec<[usize; 2]>,
    index: HashMap<(usize, usize), usize>,
}

#[inline]
fn key(i: usize, j: usize) -> (usize, usize) {
    if i <= j {
        (i, j)
    } else {
        (j, i)
    }
}

impl Topology {
    /// Build a topology from `(i, j)` node pairs; strut `k` is `pairs[k]`.
    ///
    /// Rejects out-of-range nodes, self loops and repeated pairs.
    pub fn new(num_nodes: usize, pairs: &[(usize, usize)]) -> Result<Self> {
        let mut struts = Vec::with_capacity(pairs.len());
        let mut index = HashMap::with_capacity(pairs.len());

        for (k, &(i, j)) in pairs.iter().enumerate() {
            if i >= num_nodes || j >= num_nodes {
                return Err(TrussError::InvalidTopology(format!(
                    "strut {k} ({i}, {j}) references a node outside 0..{num_nodes}"
                )));
            }
            if i == j {
                return Err(TrussError::InvalidTopology(format!(
                    "strut {k} connects node {i} to itself"
                )));
            }
            if let Some(existing) = index.insert(key(i, j), k) {
                return Err(TrussError::InvalidTopology(format!(
                    "strut {k} ({i}, {j}) duplicates strut {existing}"
                )));
            }
            struts.push([i, j]);
        }

        Ok(Self {
            num_nodes,
            struts,
            index,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_struts(&self) -> usize {
        self.struts.len()
    }

    pub fn is_strut(&self, i: usize, j: usize) -> bool {
        self.index.contains_key(&key(i, j))
    }

    pub fn strut_index(&self, i: usize, j: usize) -> Option<usize> {
        self.index.get(&key(i, j)).copied()
    }

    /// Node pair of strut `k`, in the order it was configured.
    pub fn strut_nodes(&self, k: usize) -> [usize; 2] {
        self.struts[k]
    }

    pub fn struts(&self) -> &[[usize; 2]] {
        &self.struts
    }
}
