use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sequence::SetupWindow;

/// Tunables shared by the profile computations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Balls ahead used for the event probability projections.
    pub horizon: u32,
    /// Bowlers with this many legal balls or fewer are left out of the scatter.
    pub min_scatter_balls: usize,
    /// Spell progression is reported for this many overs.
    pub max_spell_overs: usize,
    pub setup_window: SetupWindow,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            horizon: 10,
            min_scatter_balls: 10,
            max_spell_overs: 4,
            setup_window: SetupWindow::AcrossMatches,
        }
    }
}

/// A name with a count or run total, used for leaderboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub name: String,
    pub value: usize,
}

/// Highest `n` values, ties broken by name so output is deterministic.
pub fn top_by(counts: HashMap<&str, usize>, n: usize) -> Vec<Tally> {
    let mut rows: Vec<Tally> = counts
        .into_iter()
        .filter(|(_, v)| *v > 0)
        .map(|(name, value)| Tally {
            name: name.to_string(),
            value,
        })
        .collect();
    rows.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    rows.truncate(n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_by_orders_and_truncates() {
        let mut counts = HashMap::new();
        counts.insert("b", 3);
        counts.insert("a", 3);
        counts.insert("c", 5);
        counts.insert("z", 0);
        let top = top_by(counts, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "c");
        assert_eq!(top[1].name, "a");
    }
}
