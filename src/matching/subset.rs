//! Bounded search for candidate lines that offset a payment balance

use bigdecimal::BigDecimal;

/// A set of candidate lines whose balances together offset the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    /// Indices into the candidate slice, ascending
    pub indices: Vec<usize>,
    /// Sum of the selected candidate balances
    pub balance: BigDecimal,
}

impl Subset {
    fn new(indices: Vec<usize>, balance: BigDecimal) -> Self {
        Self { indices, balance }
    }

    /// Number of candidate lines in the subset
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Whether `amount` is strictly inside the rounding tolerance
pub fn within_tolerance(amount: &BigDecimal, tolerance: &BigDecimal) -> bool {
    amount.abs() < *tolerance
}

/// Lazily yields every subset of `candidates` that offsets `target`.
///
/// Single lines come first, in candidate order. Then combinations of size
/// 2 up to `max_combination_size`, smallest size first, each size walked
/// in lexicographic index order.
pub struct BalancingSubsets<'a> {
    candidates: &'a [BigDecimal],
    target: BigDecimal,
    tolerance: BigDecimal,
    max_size: usize,
    max_nodes: Option<u64>,
    next_single: usize,
    combination: Option<Vec<usize>>,
    nodes_visited: u64,
    budget_exhausted: bool,
}

impl BalancingSubsets<'_> {
    /// Stop the combination walk after `max_nodes` evaluated subsets
    pub fn with_node_budget(mut self, max_nodes: Option<u64>) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Combinations evaluated so far (single lines are not counted)
    pub fn nodes_visited(&self) -> u64 {
        self.nodes_visited
    }

    /// Whether the walk stopped early because the node budget ran out
    pub fn budget_exhausted(&self) -> bool {
        self.budget_exhausted
    }

    fn offsets(&self, balance: &BigDecimal) -> bool {
        within_tolerance(&(balance + &self.target), &self.tolerance)
    }

    /// Next combination in lexicographic order, moving to the next size
    /// once the current one is exhausted
    fn successor(&self, indices: &[usize]) -> Option<Vec<usize>> {
        let n = self.candidates.len();
        let k = indices.len();
        let mut next = indices.to_vec();

        for i in (0..k).rev() {
            if next[i] < n - k + i {
                next[i] += 1;
                for j in i + 1..k {
                    next[j] = next[j - 1] + 1;
                }
                return Some(next);
            }
        }

        if k < self.max_size {
            Some((0..=k).collect())
        } else {
            None
        }
    }
}

impl Iterator for BalancingSubsets<'_> {
    type Item = Subset;

    fn next(&mut self) -> Option<Subset> {
        while self.next_single < self.candidates.len() {
            let index = self.next_single;
            self.next_single += 1;

            let balance = self.candidates[index].clone();
            if self.offsets(&balance) {
                return Some(Subset::new(vec![index], balance));
            }
        }

        while let Some(indices) = self.combination.take() {
            if let Some(limit) = self.max_nodes {
                if self.nodes_visited >= limit {
                    self.budget_exhausted = true;
                    return None;
                }
            }
            self.nodes_visited += 1;

            let balance: BigDecimal = indices.iter().map(|&i| &self.candidates[i]).sum();
            self.combination = self.successor(&indices);

            if self.offsets(&balance) {
                return Some(Subset::new(indices, balance));
            }
        }

        None
    }
}

/// Iterate all subsets of up to `max_combination_size` candidates whose
/// balance offsets `target` within `tolerance`.
pub fn balancing_subsets<'a>(
    target: &BigDecimal,
    candidates: &'a [BigDecimal],
    max_combination_size: usize,
    tolerance: &BigDecimal,
) -> BalancingSubsets<'a> {
    let max_size = max_combination_size.min(candidates.len());
    let combination = if max_size >= 2 { Some(vec![0, 1]) } else { None };

    BalancingSubsets {
        candidates,
        target: target.clone(),
        tolerance: tolerance.clone(),
        max_size,
        max_nodes: None,
        next_single: 0,
        combination,
        nodes_visited: 0,
        budget_exhausted: false,
    }
}

/// First subset of `candidates` that offsets `target`, if any
pub fn find_balancing_subset(
    target: &BigDecimal,
    candidates: &[BigDecimal],
    max_combination_size: usize,
    tolerance: &BigDecimal,
) -> Option<Subset> {
    balancing_subsets(target, candidates, max_combination_size, tolerance).next()
}
