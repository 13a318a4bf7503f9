//! Consensus group selection

use rand::Rng;

/// One member of a consensus group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub node: String,
    pub is_leader: bool,
}

/// A randomly drawn group with exactly one leader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusGroup {
    members: Vec<Member>,
}

impl ConsensusGroup {
    /// Draw `size` members from `node_ids` (with replacement) and name one leader.
    ///
    /// Returns `None` if there are no node ids or `size` is zero.
    pub fn random<R: Rng + ?Sized>(node_ids: &[String], size: usize, rng: &mut R) -> Option<Self> {
        if node_ids.is_empty() || size == 0 {
            return None;
        }

        let leader = rng.gen_range(0..size);
        let members = (0..size)
            .map(|i| Member {
                node: node_ids[rng.gen_range(0..node_ids.len())].clone(),
                is_leader: i == leader,
            })
            .collect();

        Some(Self { members })
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn leader(&self) -> &str {
        self.members
            .iter()
            .find(|m| m.is_leader)
            .map(|m| m.node.as_str())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids() -> Vec<String> {
        (1..=6).map(|i| format!("node-{i:02}")).collect()
    }

    #[test]
    fn test_exactly_one_leader() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let group = ConsensusGroup::random(&ids(), 15, &mut rng).unwrap();
            assert_eq!(group.len(), 15);
            assert_eq!(group.members().iter().filter(|m| m.is_leader).count(), 1);
            assert!(ids().iter().any(|id| id == group.leader()));
        }
    }

    #[test]
    fn test_empty_inputs() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(ConsensusGroup::random(&[], 3, &mut rng).is_none());
        assert!(ConsensusGroup::random(&ids(), 0, &mut rng).is_none());
    }

    #[test]
    fn test_same_seed_same_group() {
        let a = ConsensusGroup::random(&ids(), 5, &mut StdRng::seed_from_u64(42));
        let b = ConsensusGroup::random(&ids(), 5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
