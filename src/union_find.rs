//! Union-Find (Disjoint Set Union) over dense point indices.
//!
//! Used by the single-linkage destination clusterer to merge points into
//! connected components.

/// Union-Find with path compression and union by rank.
///
/// # Example
/// ```
/// use stay_locator::union_find::UnionFind;
///
/// let mut uf = UnionFind::new(3);
/// uf.union(0, 1);
/// assert_eq!(uf.find(0), uf.find(1));
/// assert_ne!(uf.find(0), uf.find(2));
/// ```
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Create `len` singleton sets `0..len`.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    /// Find the representative (root) of the set containing `item`.
    pub fn find(&mut self, item: usize) -> usize {
        let mut root = item;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Path compression
        let mut current = item;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    /// Union the sets containing `a` and `b`.
    ///
    /// Returns true if the sets were different (union performed),
    /// false if they were already in the same set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);

        if root_a == root_b {
            return false;
        }

        // Union by rank: attach smaller tree under larger tree
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }

        true
    }

    /// Check if two elements are in the same set.
    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Flat labels `1..=k`, numbered in order of each set's first member.
    pub fn labels(&mut self) -> Vec<i64> {
        let mut root_label: Vec<Option<i64>> = vec![None; self.parent.len()];
        let mut next_label = 1;
        let mut labels = Vec::with_capacity(self.parent.len());

        for item in 0..self.parent.len() {
            let root = self.find(item);
            let label = *root_label[root].get_or_insert_with(|| {
                let label = next_label;
                next_label += 1;
                label
            });
            labels.push(label);
        }

        labels
    }

    /// Get the number of elements in the structure.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Check if the structure is empty.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut uf = UnionFind::new(3);

        assert!(!uf.connected(0, 1));

        assert!(uf.union(0, 1));
        assert!(!uf.union(1, 0));
        assert!(uf.connected(0, 1));
        assert!(!uf.connected(0, 2));
    }

    #[test]
    fn test_path_compression() {
        let mut uf = UnionFind::new(4);

        uf.union(0, 1);
        uf.union(1, 2);
        uf.union(2, 3);

        let root = uf.find(0);
        assert_eq!(uf.find(1), root);
        assert_eq!(uf.find(2), root);
        assert_eq!(uf.find(3), root);
    }

    #[test]
    fn test_labels_in_first_appearance_order() {
        let mut uf = UnionFind::new(5);
        uf.union(4, 1);
        uf.union(0, 3);

        assert_eq!(uf.labels(), vec![1, 2, 3, 1, 2]);
        assert_eq!(uf.len(), 5);
        assert!(UnionFind::new(0).is_empty());
    }
}
