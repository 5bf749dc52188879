// Strategy selection and win-rate bookkeeping.
//
// Epsilon-greedy over the known generation strategies. The selector is a pure
// function over a stats snapshot; persistence of the counters lives in `db`.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EPSILON: f64 = 0.2;

/// Win rate assumed for a strategy that has never been used.
pub const NEUTRAL_PRIOR: f64 = 0.5;

pub const HUMAN_SOURCE: &str = "human";

/// A named configuration for producing an AI answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyDef {
    pub name: &'static str,
    /// Value stored in `answers.source` for answers produced by this strategy.
    pub source: &'static str,
    /// Label shown when a vote reveals the answer's origin.
    pub label: &'static str,
}

/// Known strategies, in declaration order. Order breaks exploitation ties.
pub const STRATEGIES: [StrategyDef; 2] = [
    StrategyDef {
        name: "gemini_v1",
        source: "gemini",
        label: "GEMINI",
    },
    StrategyDef {
        name: "qwen_v1",
        source: "qwen",
        label: "QWEN",
    },
];

pub fn find_strategy(name: &str) -> Option<&'static StrategyDef> {
    STRATEGIES.iter().find(|s| s.name == name)
}

pub fn find_by_source(source: &str) -> Option<&'static StrategyDef> {
    STRATEGIES.iter().find(|s| s.source == source)
}

/// Snapshot of one strategy's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StrategyStats {
    pub strategy: String,
    pub wins: i64,
    pub uses: i64,
}

impl StrategyStats {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            wins: 0,
            uses: 0,
        }
    }

    /// Empirical win rate in [0, 1], or the neutral prior when unused.
    pub fn empirical_rate(&self) -> f64 {
        if self.uses > 0 {
            self.wins as f64 / self.uses as f64
        } else {
            NEUTRAL_PRIOR
        }
    }
}

/// Whether a selection came from the random or the greedy branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Explore,
    Exploit,
}

impl SelectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionMode::Explore => "explore",
            SelectionMode::Exploit => "exploit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub strategy: String,
    pub mode: SelectionMode,
}

/// Pick a strategy with epsilon-greedy.
///
/// With probability `epsilon` a uniformly random candidate is returned.
/// Otherwise the candidate with the strictly highest empirical rate wins,
/// earlier candidates taking ties. Returns `None` for an empty snapshot.
pub fn select<R: Rng + ?Sized>(
    candidates: &[StrategyStats],
    epsilon: f64,
    rng: &mut R,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }
    let epsilon = clamp_epsilon(epsilon);

    if rng.gen::<f64>() < epsilon {
        let pick = &candidates[rng.gen_range(0..candidates.len())];
        return Some(Selection {
            strategy: pick.strategy.clone(),
            mode: SelectionMode::Explore,
        });
    }

    let mut best = &candidates[0];
    let mut best_rate = best.empirical_rate();
    for c in &candidates[1..] {
        let rate = c.empirical_rate();
        if rate > best_rate {
            best = c;
            best_rate = rate;
        }
    }
    Some(Selection {
        strategy: best.strategy.clone(),
        mode: SelectionMode::Exploit,
    })
}

pub fn clamp_epsilon(epsilon: f64) -> f64 {
    if epsilon.is_nan() {
        DEFAULT_EPSILON
    } else {
        epsilon.clamp(0.0, 1.0)
    }
}

/// Order a stats listing by declaration order, adding zeroed rows for known
/// strategies the store has not seen yet. Unknown rows are dropped.
pub fn known_snapshot(rows: &[StrategyStats]) -> Vec<StrategyStats> {
    STRATEGIES
        .iter()
        .map(|def| {
            rows.iter()
                .find(|r| r.strategy == def.name)
                .cloned()
                .unwrap_or_else(|| StrategyStats::new(def.name))
        })
        .collect()
}

/// Counter increments to apply to one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatDelta {
    pub strategy: String,
    pub uses: i64,
    pub wins: i64,
}

/// Compute the counter changes produced by one vote.
///
/// Arguments are the strategy tags of the winning and losing answers, `None`
/// for human answers. Every tagged participant gains a use; a tagged winner
/// also gains a win. Deltas for the same strategy are merged.
pub fn outcome_deltas(winner: Option<&str>, loser: Option<&str>) -> Vec<StatDelta> {
    let mut deltas: Vec<StatDelta> = Vec::new();
    let mut bump = |strategy: &str, wins: i64| {
        match deltas.iter_mut().find(|d| d.strategy == strategy) {
            Some(d) => {
                d.uses += 1;
                d.wins += wins;
            }
            None => deltas.push(StatDelta {
                strategy: strategy.to_string(),
                uses: 1,
                wins,
            }),
        }
    };
    if let Some(w) = winner {
        bump(w, 1);
    }
    if let Some(l) = loser {
        bump(l, 0);
    }
    deltas
}

/// Percentage of `wins` over `uses`; 0 when nothing was used.
pub fn win_rate(wins: i64, uses: i64) -> f64 {
    if uses > 0 {
        wins as f64 * 100.0 / uses as f64
    } else {
        0.0
    }
}
