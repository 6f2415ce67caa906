pub(crate) type ClusterId = usize;

/// Grow-only clusters over member slots `0..len`. Merging moves the smaller
/// member list into the larger and leaves the absorbed slot empty.
#[derive(Debug, Clone)]
pub(crate) struct ClusterArena {
    clusters: Vec<Vec<usize>>,
    assignment: Vec<Option<ClusterId>>,
}

impl ClusterArena {
    pub(crate) fn new(members: usize) -> Self {
        Self {
            clusters: Vec::new(),
            assignment: vec![None; members],
        }
    }

    pub(crate) fn cluster_of(&self, member: usize) -> Option<ClusterId> {
        self.assignment[member]
    }

    pub(crate) fn same_cluster(&self, left: usize, right: usize) -> bool {
        matches!(
            (self.cluster_of(left), self.cluster_of(right)),
            (Some(a), Some(b)) if a == b
        )
    }

    pub(crate) fn create(&mut self, member: usize) -> ClusterId {
        let cluster = self.clusters.len();
        self.clusters.push(Vec::new());
        self.join(member, cluster);
        cluster
    }

    pub(crate) fn join(&mut self, member: usize, cluster: ClusterId) -> bool {
        if self.assignment[member].is_some() {
            return false;
        }
        self.assignment[member] = Some(cluster);
        self.clusters[cluster].push(member);
        true
    }

    pub(crate) fn link(&mut self, left: usize, right: usize) -> bool {
        match (self.cluster_of(left), self.cluster_of(right)) {
            (None, None) => {
                let cluster = self.create(left);
                self.join(right, cluster);
                left != right
            }
            (Some(cluster), None) => self.join(right, cluster),
            (None, Some(cluster)) => self.join(left, cluster),
            (Some(a), Some(b)) if a == b => false,
            (Some(a), Some(b)) => {
                self.merge(a, b);
                true
            }
        }
    }

    fn merge(&mut self, a: ClusterId, b: ClusterId) -> ClusterId {
        let (keep, absorb) = if self.clusters[a].len() >= self.clusters[b].len() {
            (a, b)
        } else {
            (b, a)
        };

        let moved = std::mem::take(&mut self.clusters[absorb]);
        for &member in &moved {
            self.assignment[member] = Some(keep);
        }
        self.clusters[keep].extend(moved);
        keep
    }

    pub(crate) fn ensure_singletons(&mut self) {
        for member in 0..self.assignment.len() {
            if self.assignment[member].is_none() {
                self.create(member);
            }
        }
    }

    pub(crate) fn into_clusters(self) -> Vec<Vec<usize>> {
        let mut clusters = self
            .clusters
            .into_iter()
            .filter(|members| !members.is_empty())
            .map(|mut members| {
                members.sort_unstable();
                members
            })
            .collect::<Vec<_>>();
        clusters.sort_by_key(|members| members[0]);
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_creates_joins_and_merges() {
        let mut arena = ClusterArena::new(5);

        assert!(arena.link(0, 1));
        assert!(arena.same_cluster(0, 1));
        assert!(arena.link(2, 1));
        assert!(!arena.link(0, 2));

        assert!(arena.link(3, 4));
        assert!(arena.link(4, 0));

        let clusters = arena.into_clusters();
        assert_eq!(clusters, vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn merge_keeps_the_larger_cluster() {
        let mut arena = ClusterArena::new(4);
        arena.link(0, 1);
        arena.link(1, 2);
        let large = arena.cluster_of(0).expect("clustered");
        arena.create(3);

        arena.link(3, 0);
        assert_eq!(arena.cluster_of(3), Some(large));
    }

    #[test]
    fn join_only_absorbs_unclustered_members() {
        let mut arena = ClusterArena::new(3);
        let first = arena.create(0);
        let second = arena.create(1);

        assert!(!arena.join(1, first));
        assert!(arena.join(2, first));
        assert_eq!(arena.cluster_of(1), Some(second));
    }

    #[test]
    fn singletons_cover_every_member() {
        let mut arena = ClusterArena::new(4);
        arena.link(1, 2);
        arena.ensure_singletons();

        let clusters = arena.into_clusters();
        assert_eq!(clusters, vec![vec![0], vec![1, 2], vec![3]]);
        assert_eq!(clusters.iter().map(Vec::len).sum::<usize>(), 4);
    }
}
