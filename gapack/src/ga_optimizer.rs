use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use log::{debug, info, warn};
use rand::prelude::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thousands::Separable;

use boxpack::entities::{BinTemplate, Item, Packing};
use boxpack::solvers::Solver;

use crate::Permutation;
use crate::breeding::{Breeder, OrderCrossoverSwap};
use crate::config::GAConfig;
use crate::eval_pool::{EvalPool, run_isolated};
use crate::fitness::{self, Direction};

/// Outcome of a single generation step
#[derive(Debug, Clone)]
pub struct Generation {
    /// Zero-based index of the generation that was evaluated
    pub index: usize,
    /// Best packing among the evaluated permutations
    pub best: Packing,
    pub best_fitness: f64,
    /// Number of permutations that were scored
    pub n_scored: usize,
    /// Number of permutations whose evaluation failed
    pub n_failed: usize,
    /// True if some evaluations failed or were abandoned
    pub degraded: bool,
}

/// A permutation of the population together with its evaluation
struct Scored {
    /// Position in the population
    index: usize,
    fitness: f64,
    packing: Packing,
}

/// Genetic algorithm searching for the order in which the items are handed to a [`Solver`].
///
/// Every generation, all permutations of the population are solved and rated.
/// The best ones (the elite) survive unchanged; the rest of the next generation is bred from the elite.
pub struct GAOptimizer<B: Breeder = OrderCrossoverSwap> {
    solver: Arc<dyn Solver>,
    items: Arc<[Item]>,
    template: BinTemplate,
    config: GAConfig,
    breeder: B,
    /// SmallRng is a fast, non-cryptographic PRNG <https://rust-random.github.io/book/guide-rngs.html>
    rng: SmallRng,
    population: Vec<Permutation>,
    pool: Option<EvalPool>,
    generation: usize,
    best_so_far: Option<f64>,
}

impl GAOptimizer<OrderCrossoverSwap> {
    pub fn new(
        solver: Arc<dyn Solver>,
        items: Vec<Item>,
        template: BinTemplate,
        config: GAConfig,
    ) -> Result<Self> {
        Self::with_breeder(solver, items, template, config, OrderCrossoverSwap)
    }
}

impl<B: Breeder> GAOptimizer<B> {
    /// Validates the configuration and creates the initial population:
    /// `population_size` independent shuffles of the identity ordering.
    pub fn with_breeder(
        solver: Arc<dyn Solver>,
        items: Vec<Item>,
        template: BinTemplate,
        config: GAConfig,
        breeder: B,
    ) -> Result<Self> {
        config.validate().context("invalid GA configuration")?;
        let template = match template.growing {
            Some(axis) => BinTemplate::growing(template.dims, axis),
            None => BinTemplate::new(template.dims),
        }
        .context("invalid bin template")?;

        let mut rng = match config.prng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let identity = (0..items.len()).collect_vec();
        let population = (0..config.population_size)
            .map(|_| {
                let mut order = identity.clone();
                order.shuffle(&mut rng);
                order
            })
            .collect_vec();

        let pool = match config.threaded {
            true => Some(EvalPool::new(
                config.n_workers,
                Duration::from_secs(config.eval_timeout_secs),
            )?),
            false => None,
        };

        info!(
            "[GA] initialized with {} items, population {} (elite {}), solver {}, {}",
            items.len(),
            config.population_size,
            config.elite_count,
            solver.name(),
            match &pool {
                Some(p) => format!("{} workers", p.n_workers()),
                None => "sequential".to_string(),
            }
        );

        Ok(Self {
            solver,
            items: items.into(),
            template,
            config,
            breeder,
            rng,
            population,
            pool,
            generation: 0,
            best_so_far: None,
        })
    }

    /// Evaluates the current population, breeds the next one from it and returns the best packing found.
    ///
    /// Fails only if not a single permutation could be evaluated, in which case the population is left untouched.
    pub fn execute_next_generation(&mut self) -> Result<Generation> {
        let start = Instant::now();
        let direction = self.direction();
        let n = self.population.len();

        let (mut scored, n_failed, timed_out) = self.evaluate();
        if scored.is_empty() {
            bail!(
                "[GA] gen {}: none of the {n} permutations could be evaluated",
                self.generation
            );
        }

        // population order first, so rankings do not depend on completion order
        scored.sort_by_key(|s| s.index);
        scored.sort_by(|a, b| direction.compare(a.fitness, b.fitness));

        let n_elite = usize::min(self.config.elite_count, scored.len());
        if n_elite < self.config.elite_count {
            warn!(
                "[GA] gen {}: only {} permutations scored, fewer than the elite count of {}",
                self.generation,
                scored.len(),
                self.config.elite_count
            );
        }
        let elite = scored[..n_elite]
            .iter()
            .map(|s| self.population[s.index].clone())
            .collect_vec();

        let mut next = elite.clone();
        while next.len() < self.config.population_size {
            let child = match self.rng.random_bool(0.5) {
                true => {
                    let p1 = &elite[self.rng.random_range(0..n_elite)];
                    let p2 = &elite[self.rng.random_range(0..n_elite)];
                    self.breeder.crossover(p1, p2, &mut self.rng)
                }
                false => {
                    let p = &elite[self.rng.random_range(0..n_elite)];
                    self.breeder.mutate(p, &mut self.rng)
                }
            };
            next.push(child);
        }
        self.population = next;

        let n_scored = scored.len();
        let best = scored.swap_remove(0);
        if self
            .best_so_far
            .is_none_or(|b| direction.is_better(best.fitness, b))
        {
            self.best_so_far = Some(best.fitness);
        }

        let degraded = n_failed > 0 || timed_out;
        if degraded {
            warn!(
                "[GA] gen {}: degraded, {} of {n} permutations scored ({} failed{})",
                self.generation,
                n_scored,
                n_failed,
                if timed_out { ", deadline passed" } else { "" }
            );
        }
        info!(
            "[GA] gen {}: best {:.4} ({} bins, {} items placed), best so far {:.4}, {} solves in {:.3}ms",
            self.generation,
            best.fitness,
            best.packing.n_bins(),
            best.packing.n_placed().separate_with_commas(),
            self.best_so_far.unwrap_or(best.fitness),
            n_scored.separate_with_commas(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        let generation = Generation {
            index: self.generation,
            best: best.packing,
            best_fitness: best.fitness,
            n_scored,
            n_failed,
            degraded,
        };
        self.generation += 1;
        Ok(generation)
    }

    /// Solves and rates every permutation, returns the scored ones, the number of failures and whether the deadline passed
    fn evaluate(&self) -> (Vec<Scored>, usize, bool) {
        let score = scorer(
            self.solver.clone(),
            self.items.clone(),
            self.template,
            Arc::new(self.population.clone()),
        );
        let n = self.population.len();

        match &self.pool {
            Some(pool) => {
                let outcome = pool.evaluate(n, score);
                let scored = outcome
                    .results
                    .into_iter()
                    .map(|(index, (fitness, packing))| Scored {
                        index,
                        fitness,
                        packing,
                    })
                    .collect_vec();
                (scored, outcome.n_failed, outcome.timed_out)
            }
            None => {
                let mut n_failed = 0;
                let scored = (0..n)
                    .filter_map(|index| match run_isolated(index, &score) {
                        Some((fitness, packing)) => Some(Scored {
                            index,
                            fitness,
                            packing,
                        }),
                        None => {
                            n_failed += 1;
                            None
                        }
                    })
                    .collect_vec();
                (scored, n_failed, false)
            }
        }
    }

    /// Releases the backend resources of the solver
    pub fn release(self) -> Result<()> {
        debug!("[GA] releasing solver {}", self.solver.name());
        self.solver.release()
    }

    pub fn population(&self) -> &[Permutation] {
        &self.population
    }

    /// Number of generations executed so far
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Best fitness over all generations executed so far
    pub fn best_so_far(&self) -> Option<f64> {
        self.best_so_far
    }

    pub fn direction(&self) -> Direction {
        Direction::of(&self.template)
    }

    pub fn template(&self) -> &BinTemplate {
        &self.template
    }

    pub fn config(&self) -> &GAConfig {
        &self.config
    }
}

/// Solves the items in the order of the `index`th permutation and rates the packing.
/// Pure function of the permutation, so it can run on any thread.
fn scorer(
    solver: Arc<dyn Solver>,
    items: Arc<[Item]>,
    template: BinTemplate,
    population: Arc<Vec<Permutation>>,
) -> impl Fn(usize) -> Result<(f64, Packing)> + Send + Sync + 'static {
    move |index| {
        let ordered = population[index].iter().map(|&i| items[i]).collect_vec();
        let packing = solver
            .solve(&ordered, &template)
            .with_context(|| format!("solving permutation {index} with {}", solver.name()))?;
        Ok((fitness::rate(&packing, &template), packing))
    }
}
