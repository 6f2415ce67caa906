use std::collections::{BTreeMap, BTreeSet};

use crate::distance::{Levenshtein, Metric};

/// BK-tree over string keys. Every node reachable below the edge labelled `d`
/// of a node with key `k` has distance exactly `d` from `k`.
#[derive(Debug, Clone)]
pub struct MetricIndex<V, M = Levenshtein> {
    metric: M,
    nodes: Vec<Node<V>>,
}

#[derive(Debug, Clone)]
struct Node<V> {
    key: String,
    payload: Vec<V>,
    children: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexNode<'a, V> {
    pub key: &'a str,
    pub payload: &'a [V],
}

impl<V> MetricIndex<V, Levenshtein> {
    pub fn new() -> Self {
        Self::with_metric(Levenshtein)
    }
}

impl<V> Default for MetricIndex<V, Levenshtein> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, M: Metric> MetricIndex<V, M> {
    pub fn with_metric(metric: M) -> Self {
        Self {
            metric,
            nodes: Vec::new(),
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if self.nodes.is_empty() {
            self.nodes.push(Node::leaf(key, value));
            return;
        }

        let mut current = 0;
        loop {
            let distance = self.metric.distance(&key, &self.nodes[current].key);
            if distance == 0 {
                self.nodes[current].payload.push(value);
                return;
            }

            match self.nodes[current].children.get(&distance) {
                Some(&child) => current = child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::leaf(key, value));
                    self.nodes[current].children.insert(distance, child);
                    return;
                }
            }
        }
    }

    /// Nodes whose key is within `threshold` of `term`, paired with that
    /// distance.
    pub fn query_nodes(&self, term: &str, threshold: usize) -> Vec<(usize, IndexNode<'_, V>)> {
        let mut matches = Vec::new();
        if self.nodes.is_empty() {
            return matches;
        }

        let mut pending = vec![0usize];
        while let Some(index) = pending.pop() {
            let node = &self.nodes[index];
            let distance = self.metric.distance(term, &node.key);
            if distance <= threshold {
                matches.push((distance, node.as_view()));
            }

            let lower = distance.saturating_sub(threshold);
            let upper = distance.saturating_add(threshold);
            pending.extend(node.children.range(lower..=upper).map(|(_, &child)| child));
        }

        matches
    }

    pub fn query(&self, term: &str, threshold: usize) -> Vec<&V> {
        self.query_nodes(term, threshold)
            .into_iter()
            .flat_map(|(_, node)| node.payload.iter())
            .collect()
    }

    /// Values matched by any of `terms`. A value stored under several keys
    /// matches when the closest of its keys to the closest term is within
    /// `threshold`.
    pub fn query_any<S>(&self, terms: &[S], threshold: usize) -> BTreeSet<V>
    where
        S: AsRef<str>,
        V: Ord + Clone,
    {
        terms
            .iter()
            .flat_map(|term| self.query(term.as_ref(), threshold))
            .cloned()
            .collect()
    }

    /// Pre-order walk, parents before children.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            nodes: &self.nodes,
            pending: if self.nodes.is_empty() {
                Vec::new()
            } else {
                vec![0]
            },
        }
    }
}

impl<'a, V, M: Metric> IntoIterator for &'a MetricIndex<V, M> {
    type Item = IndexNode<'a, V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, V> {
    nodes: &'a [Node<V>],
    pending: Vec<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = IndexNode<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.pending.pop()?;
        let node = &self.nodes[index];
        self.pending.extend(node.children.values().rev().copied());
        Some(node.as_view())
    }
}

impl<V> Node<V> {
    fn leaf(key: String, value: V) -> Self {
        Self {
            key,
            payload: vec![value],
            children: BTreeMap::new(),
        }
    }

    fn as_view(&self) -> IndexNode<'_, V> {
        IndexNode {
            key: &self.key,
            payload: &self.payload,
        }
    }
}
