use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use crate::GraphError;

/// Sort `nodes` so that for every `(a, b)` in `edges` `a` comes before `b`.
///
/// The order is deterministic: every time more than one node is ready, the one that comes first
/// in `nodes` is picked. Therefore the input order is preserved when there are no constraints.
///
/// Fails with `GraphError::NotDag` if the edges contain a cycle, reporting the first node (in
/// input order) that could not be sorted.
pub fn topological_sort<K>(nodes: &[K], edges: &[(K, K)]) -> Result<Vec<K>, GraphError>
where
    K: Clone + Eq + Hash + Display,
{
    let position: HashMap<&K, usize> = nodes.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let mut in_degree = vec![0usize; nodes.len()];
    let mut successors = vec![Vec::new(); nodes.len()];
    for (from, to) in edges {
        let from = *position
            .get(from)
            .ok_or_else(|| GraphError::UnknownNode(from.to_string()))?;
        let to = *position
            .get(to)
            .ok_or_else(|| GraphError::UnknownNode(to.to_string()))?;
        successors[from].push(to);
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(nodes[node].clone());
        for &next in &successors[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if let Some(stuck) = in_degree.iter().position(|d| *d > 0) {
        return Err(GraphError::NotDag(nodes[stuck].to_string()));
    }
    Ok(order)
}
