use serde::Serialize;
use std::collections::BTreeMap;

/// Counters for one engine instance. Passed explicitly as `&mut Metrics`
/// through resolve/execute, so two engines never share tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub resolutions: u64,
    pub resolved: u64,
    pub unresolved: u64,
    /// Candidates validated against the page.
    pub probes: u64,
    pub ambiguous: u64,
    pub probe_errors: u64,

    pub heals: u64,
    pub original_successes: u64,
    pub alternative_successes: u64,
    pub resolver_successes: u64,
    pub heal_failures: u64,

    pub patterns_recorded: u64,
    pub store_errors: u64,

    /// Winning strategy name -> count, across resolve and execute.
    pub strategy_wins: BTreeMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_win(&mut self, strategy_name: &str) {
        *self
            .strategy_wins
            .entry(strategy_name.to_string())
            .or_insert(0) += 1;
    }

    pub fn resolution_rate(&self) -> f64 {
        ratio(self.resolved, self.resolutions)
    }

    /// Share of executed actions that ended in success, by any route.
    pub fn success_rate(&self) -> f64 {
        ratio(self.heals.saturating_sub(self.heal_failures), self.heals)
    }

    /// Fold another engine's counters into this one.
    pub fn merge(&mut self, other: &Metrics) {
        self.resolutions += other.resolutions;
        self.resolved += other.resolved;
        self.unresolved += other.unresolved;
        self.probes += other.probes;
        self.ambiguous += other.ambiguous;
        self.probe_errors += other.probe_errors;
        self.heals += other.heals;
        self.original_successes += other.original_successes;
        self.alternative_successes += other.alternative_successes;
        self.resolver_successes += other.resolver_successes;
        self.heal_failures += other.heal_failures;
        self.patterns_recorded += other.patterns_recorded;
        self.store_errors += other.store_errors;
        for (name, count) in &other.strategy_wins {
            *self.strategy_wins.entry(name.clone()).or_insert(0) += count;
        }
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
