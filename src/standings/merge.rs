// K-way merge of already-ordered child groups into one ordering.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::TeamId;

use super::StandingKey;

// One candidate in the heap: the next team of one child group.
struct Candidate {
    key: StandingKey,
    child: usize,
    position: usize,
    team: TeamId,
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
        // Ties pop in child order so the merge itself is deterministic; the
        // tie-break cascade afterwards decides the real order.
        self.key
            .cmp(&other.key)
            .then_with(|| other.child.cmp(&self.child))
    }
}

// Merge child orderings (each best first) into a single best-first sequence.
// Pops the best remaining candidate and re-inserts that child's next team.
pub fn merge_ordered<F>(children: &[&[TeamId]], key_of: F) -> Vec<TeamId>
where
    F: Fn(TeamId) -> StandingKey,
{
    let mut heap = BinaryHeap::new();
    for (child, order) in children.iter().enumerate() {
        if let Some(&team) = order.first() {
            heap.push(Candidate {
                key: key_of(team),
                child,
                position: 0,
                team,
            });
        }
    }

    let mut merged = Vec::with_capacity(children.iter().map(|c| c.len()).sum());
    while let Some(best) = heap.pop() {
        merged.push(best.team);

        let order = children[best.child];
        let next = best.position + 1;
        if let Some(&team) = order.get(next) {
            heap.push(Candidate {
                key: key_of(team),
                child: best.child,
                position: next,
                team,
            });
        }
    }

    merged
}
