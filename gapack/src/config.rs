use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Configuration for the GA optimizer
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct GAConfig {
    /// Number of permutations in every generation
    pub population_size: usize,
    /// Number of best permutations carried over unchanged into the next generation, also the breeding pool
    pub elite_count: usize,
    /// Evaluate the permutations of a generation in parallel
    pub threaded: bool,
    /// Seed for the PRNG. If undefined, the algorithm will run in non-deterministic mode using entropy
    pub prng_seed: Option<u64>,
    /// Maximum time a parallel generation may take before outstanding evaluations are abandoned
    pub eval_timeout_secs: u64,
    /// Number of worker threads. If undefined, the available parallelism is used
    pub n_workers: Option<usize>,
}

impl Default for GAConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            elite_count: 10,
            threaded: true,
            prng_seed: Some(0),
            eval_timeout_secs: 180,
            n_workers: None,
        }
    }
}

impl GAConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.elite_count >= 1,
            "elite count must be at least 1, breeding needs parents"
        );
        ensure!(
            self.population_size > self.elite_count,
            "population size ({}) must exceed the elite count ({})",
            self.population_size,
            self.elite_count
        );
        ensure!(
            self.n_workers != Some(0),
            "number of workers must be at least 1"
        );
        ensure!(self.eval_timeout_secs > 0, "evaluation timeout must be positive");
        Ok(())
    }
}
