//! Genetic algorithm framework.
//!
//! Problem-specific code implements [`GaProblem`] (evaluation and initial
//! population) and [`Individual`] (crossover and mutation). [`GaRunner`]
//! drives the generational loop:
//!
//! - fitness is **minimised**;
//! - each generation's children are evaluated on a bounded rayon pool and
//!   joined before selection continues;
//! - selection, crossover and mutation run on one seeded RNG, so a fixed
//!   seed reproduces the run exactly regardless of worker count;
//! - the loop stops on the generation budget, a fitness plateau, the time
//!   limit or cancellation, and always returns the best individual seen.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::settings::GeneticSettings;

/// Configuration for the genetic algorithm.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    /// Population size.
    pub population_size: usize,
    /// Maximum number of generations.
    pub max_generations: u32,
    /// Crossover rate (0.0 - 1.0).
    pub crossover_rate: f64,
    /// Mutation rate (0.0 - 1.0).
    pub mutation_rate: f64,
    /// Number of elite individuals to preserve each generation.
    pub elite_count: usize,
    /// Tournament size for selection.
    pub tournament_size: usize,
    /// Maximum time limit (None = unlimited).
    pub time_limit: Option<Duration>,
    /// Generations without improvement before early stop.
    pub stagnation_limit: Option<u32>,
    /// RNG seed (None = entropy).
    pub seed: Option<u64>,
    /// Evaluation threads (0 = hardware parallelism).
    pub threads: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 60,
            max_generations: 150,
            crossover_rate: 0.85,
            mutation_rate: 0.15,
            elite_count: 2,
            tournament_size: 3,
            time_limit: None,
            stagnation_limit: Some(30),
            seed: None,
            threads: 0,
        }
    }
}

impl GaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the maximum generations.
    pub fn with_max_generations(mut self, gen: u32) -> Self {
        self.max_generations = gen;
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_limit(mut self, generations: u32) -> Self {
        self.stagnation_limit = Some(generations);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the evaluation thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

impl From<&GeneticSettings> for GaConfig {
    fn from(s: &GeneticSettings) -> Self {
        Self {
            population_size: s.population_size.max(2),
            max_generations: s.generations,
            crossover_rate: s.crossover_rate.clamp(0.0, 1.0),
            mutation_rate: s.mutation_rate.clamp(0.0, 1.0),
            elite_count: s.elite_count,
            tournament_size: s.tournament_size.max(1),
            time_limit: s.time_limit_ms.map(Duration::from_millis),
            stagnation_limit: (s.plateau_window > 0).then_some(s.plateau_window),
            seed: s.seed,
            threads: s.workers,
        }
    }
}

/// An individual of the population.
pub trait Individual: Clone + Send + Sync {
    /// Cached fitness (lower is better).
    fn fitness(&self) -> f64;

    /// Performs crossover with another individual.
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    /// Mutates this individual in place.
    fn mutate<R: Rng>(&mut self, rng: &mut R);
}

/// Problem-specific GA operations.
pub trait GaProblem: Send + Sync {
    /// The individual type for this problem.
    type Individual: Individual;

    /// Evaluates and caches the fitness of an individual.
    fn evaluate(&self, individual: &mut Self::Individual);

    /// Evaluates multiple individuals in parallel on the current rayon pool.
    fn evaluate_parallel(&self, individuals: &mut [Self::Individual]) {
        individuals.par_iter_mut().for_each(|ind| {
            self.evaluate(ind);
        });
    }

    /// Creates the initial population.
    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual>;

    /// Called once per completed generation with the best individual so far.
    fn on_generation(&self, _generation: u32, _best: &Self::Individual) {}
}

/// Progress information during GA execution.
#[derive(Debug, Clone)]
pub struct GaProgress {
    /// Current generation number.
    pub generation: u32,
    /// Maximum generations configured.
    pub max_generations: u32,
    /// Best fitness so far.
    pub best_fitness: f64,
    /// Average fitness of the current population.
    pub avg_fitness: f64,
    /// Elapsed time since start.
    pub elapsed: Duration,
    /// Whether the algorithm is still running.
    pub running: bool,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I: Individual> {
    /// The best individual found.
    pub best: I,
    /// Generations completed.
    pub generations: u32,
    /// Total elapsed time.
    pub elapsed: Duration,
    /// Whether the run was stopped by the cancel flag.
    pub cancelled: bool,
    /// Best fitness per generation.
    pub history: Vec<f64>,
}

/// Genetic algorithm runner.
pub struct GaRunner<P: GaProblem> {
    config: GaConfig,
    problem: P,
    cancelled: Arc<AtomicBool>,
}

impl<P: GaProblem> GaRunner<P> {
    /// Creates a new GA runner.
    pub fn new(config: GaConfig, problem: P) -> Self {
        Self {
            config,
            problem,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an external cancel flag with this runner.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Returns a handle to cancel the algorithm.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// The problem being solved.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs the genetic algorithm.
    ///
    /// Returns `None` only if the problem produced an empty population.
    pub fn run(&self) -> Option<GaResult<P::Individual>> {
        self.run_with_progress(None::<fn(GaProgress)>)
    }

    /// Runs the genetic algorithm with an optional progress callback.
    pub fn run_with_progress<F>(&self, progress_callback: Option<F>) -> Option<GaResult<P::Individual>>
    where
        F: Fn(GaProgress) + Sync,
    {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build();
        match pool {
            Ok(pool) => pool.install(|| self.evolve(&mut rng, progress_callback.as_ref())),
            Err(e) => {
                log::warn!("GA worker pool unavailable ({e}); using the global pool");
                self.evolve(&mut rng, progress_callback.as_ref())
            }
        }
    }

    fn evolve<F>(&self, rng: &mut StdRng, progress_callback: Option<&F>) -> Option<GaResult<P::Individual>>
    where
        F: Fn(GaProgress) + Sync,
    {
        let start = Instant::now();
        let size = self.config.population_size.max(2);
        let mut history = Vec::new();

        let mut population = self.problem.initialize_population(size, rng);
        if population.is_empty() {
            return None;
        }
        self.problem.evaluate_parallel(&mut population);
        sort_by_fitness(&mut population);

        let mut best = population[0].clone();
        let mut stagnation_count = 0u32;
        let mut generation = 0u32;
        let mut cancelled = false;

        while generation < self.config.max_generations {
            if self.cancelled.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            if let Some(limit) = self.config.time_limit {
                if start.elapsed() > limit {
                    break;
                }
            }

            history.push(best.fitness());

            let elite = self.config.elite_count.clamp(1, population.len());
            let mut next: Vec<P::Individual> = population.iter().take(elite).cloned().collect();

            let mut children = Vec::with_capacity(size.saturating_sub(next.len()));
            while children.len() + next.len() < size {
                let parent1 = self.tournament_select(&population, rng);
                let parent2 = self.tournament_select(&population, rng);

                let mut child = if rng.gen::<f64>() < self.config.crossover_rate {
                    parent1.crossover(parent2, rng)
                } else {
                    parent1.clone()
                };
                if rng.gen::<f64>() < self.config.mutation_rate {
                    child.mutate(rng);
                }
                children.push(child);
            }

            // join point: every child is scored before selection resumes
            self.problem.evaluate_parallel(&mut children);
            next.extend(children);
            sort_by_fitness(&mut next);

            if next[0].fitness() < best.fitness() - 1e-12 {
                best = next[0].clone();
                stagnation_count = 0;
            } else {
                stagnation_count += 1;
            }

            log::debug!(
                "GA generation {}: best={:.6} stagnation={}",
                generation,
                best.fitness(),
                stagnation_count
            );
            self.problem.on_generation(generation, &best);

            if let Some(callback) = progress_callback {
                callback(GaProgress {
                    generation,
                    max_generations: self.config.max_generations,
                    best_fitness: best.fitness(),
                    avg_fitness: average_fitness(&next),
                    elapsed: start.elapsed(),
                    running: true,
                });
            }

            population = next;
            generation += 1;

            if let Some(limit) = self.config.stagnation_limit {
                if stagnation_count >= limit {
                    log::debug!("GA plateau after {} generations", generation);
                    break;
                }
            }
        }

        history.push(best.fitness());

        if let Some(callback) = progress_callback {
            callback(GaProgress {
                generation,
                max_generations: self.config.max_generations,
                best_fitness: best.fitness(),
                avg_fitness: average_fitness(&population),
                elapsed: start.elapsed(),
                running: false,
            });
        }

        Some(GaResult {
            best,
            generations: generation,
            elapsed: start.elapsed(),
            cancelled,
            history,
        })
    }

    fn tournament_select<'a, R: Rng>(
        &self,
        population: &'a [P::Individual],
        rng: &mut R,
    ) -> &'a P::Individual {
        let mut best_idx = rng.gen_range(0..population.len());
        for _ in 1..self.config.tournament_size {
            let idx = rng.gen_range(0..population.len());
            if population[idx].fitness() < population[best_idx].fitness() {
                best_idx = idx;
            }
        }
        &population[best_idx]
    }
}

fn sort_by_fitness<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| a.fitness().total_cmp(&b.fitness()));
}

fn average_fitness<I: Individual>(population: &[I]) -> f64 {
    let finite: Vec<f64> = population
        .iter()
        .map(Individual::fitness)
        .filter(|f| f.is_finite())
        .collect();
    if finite.is_empty() {
        f64::INFINITY
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

/// Permutation genome with one rotation flag per item.
///
/// `genes` is a placement order over item indices; `rotations[i]` belongs
/// to item `i` (not to position `i`), so reordering never detaches a flag
/// from its item.
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationChromosome {
    /// Item order.
    pub genes: Vec<usize>,
    /// Rotation flag per item.
    pub rotations: Vec<bool>,
    fitness: f64,
}

impl PermutationChromosome {
    /// Identity order, no rotations.
    pub fn new(size: usize) -> Self {
        Self::from_order((0..size).collect(), vec![false; size])
    }

    /// Chromosome with the given order and rotation flags.
    pub fn from_order(genes: Vec<usize>, rotations: Vec<bool>) -> Self {
        Self {
            genes,
            rotations,
            fitness: f64::INFINITY,
        }
    }

    /// Random order and random rotation flags.
    pub fn random<R: Rng>(size: usize, rng: &mut R) -> Self {
        let mut genes: Vec<usize> = (0..size).collect();
        genes.shuffle(rng);
        let rotations = (0..size).map(|_| rng.gen_bool(0.5)).collect();
        Self::from_order(genes, rotations)
    }

    /// Sets the fitness value.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Returns the number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Order crossover (OX) on the permutation, uniform crossover on rotations.
    pub fn order_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let n = self.genes.len();
        if n < 2 {
            return self.clone();
        }

        let (mut p1, mut p2) = (rng.gen_range(0..n), rng.gen_range(0..n));
        if p1 > p2 {
            std::mem::swap(&mut p1, &mut p2);
        }

        let mut child_genes = vec![usize::MAX; n];
        let mut used = vec![false; n];
        for i in p1..=p2 {
            child_genes[i] = self.genes[i];
            used[self.genes[i]] = true;
        }

        let mut j = (p2 + 1) % n;
        for i in 0..n {
            let idx = (p2 + 1 + i) % n;
            if child_genes[idx] == usize::MAX {
                while used[other.genes[j]] {
                    j = (j + 1) % n;
                }
                child_genes[idx] = other.genes[j];
                used[other.genes[j]] = true;
                j = (j + 1) % n;
            }
        }

        let rotations = self
            .rotations
            .iter()
            .zip(&other.rotations)
            .map(|(&a, &b)| if rng.gen() { a } else { b })
            .collect();

        Self::from_order(child_genes, rotations)
    }

    /// Swap mutation.
    pub fn swap_mutate<R: Rng>(&mut self, rng: &mut R) {
        if self.genes.len() < 2 {
            return;
        }
        let i = rng.gen_range(0..self.genes.len());
        let j = rng.gen_range(0..self.genes.len());
        self.genes.swap(i, j);
        self.fitness = f64::INFINITY;
    }

    /// Flips the rotation flag of one item.
    pub fn rotation_mutate<R: Rng>(&mut self, rng: &mut R) {
        if self.rotations.is_empty() {
            return;
        }
        let idx = rng.gen_range(0..self.rotations.len());
        self.rotations[idx] = !self.rotations[idx];
        self.fitness = f64::INFINITY;
    }

    /// Inversion mutation (reverses a segment).
    pub fn inversion_mutate<R: Rng>(&mut self, rng: &mut R) {
        let n = self.genes.len();
        if n < 2 {
            return;
        }
        let (mut p1, mut p2) = (rng.gen_range(0..n), rng.gen_range(0..n));
        if p1 > p2 {
            std::mem::swap(&mut p1, &mut p2);
        }
        self.genes[p1..=p2].reverse();
        self.fitness = f64::INFINITY;
    }
}

impl Individual for PermutationChromosome {
    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        self.order_crossover(other, rng)
    }

    fn mutate<R: Rng>(&mut self, rng: &mut R) {
        let roll = rng.gen::<f64>();
        if roll < 0.45 {
            self.swap_mutate(rng);
        } else if roll < 0.65 {
            self.inversion_mutate(rng);
        } else {
            self.rotation_mutate(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct SimpleIndividual {
        value: f64,
    }

    impl Individual for SimpleIndividual {
        fn fitness(&self) -> f64 {
            // minimum at x = 3
            (self.value - 3.0) * (self.value - 3.0)
        }

        fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
            let t = rng.gen::<f64>();
            Self {
                value: self.value * t + other.value * (1.0 - t),
            }
        }

        fn mutate<R: Rng>(&mut self, rng: &mut R) {
            self.value += rng.gen_range(-1.0..1.0);
        }
    }

    struct SimpleProblem;

    impl GaProblem for SimpleProblem {
        type Individual = SimpleIndividual;

        fn evaluate(&self, _individual: &mut Self::Individual) {}

        fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<SimpleIndividual> {
            (0..size)
                .map(|_| SimpleIndividual {
                    value: rng.gen_range(-100.0..100.0),
                })
                .collect()
        }
    }

    fn config() -> GaConfig {
        GaConfig::default()
            .with_population_size(40)
            .with_max_generations(80)
            .with_seed(42)
            .with_threads(2)
    }

    #[test]
    fn test_ga_minimises() {
        let result = GaRunner::new(config(), SimpleProblem).run().expect("population");
        assert!((result.best.value - 3.0).abs() < 1.0);
        assert!(!result.cancelled);
        // best fitness never gets worse
        for pair in result.history.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_ga_seed_reproducible() {
        let a = GaRunner::new(config(), SimpleProblem).run().expect("population");
        let b = GaRunner::new(config().with_threads(1), SimpleProblem)
            .run()
            .expect("population");
        assert_eq!(a.best.value, b.best.value);
        assert_eq!(a.generations, b.generations);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_ga_cancelled_returns_best_so_far() {
        let runner = GaRunner::new(config(), SimpleProblem);
        runner.cancel_handle().store(true, Ordering::Relaxed);
        let result = runner.run().expect("population");
        assert!(result.cancelled);
        assert_eq!(result.generations, 0);
        assert!(result.best.fitness().is_finite());
    }

    #[test]
    fn test_ga_plateau_stops_early() {
        let cfg = config().with_max_generations(10_000).with_stagnation_limit(5);
        let result = GaRunner::new(cfg, SimpleProblem).run().expect("population");
        assert!(result.generations < 10_000);
    }

    #[test]
    fn test_ga_progress_callback() {
        let calls = std::sync::Mutex::new(Vec::new());
        let runner = GaRunner::new(config().with_max_generations(5), SimpleProblem);
        runner.run_with_progress(Some(|p: GaProgress| {
            if let Ok(mut c) = calls.lock() {
                c.push(p.running);
            }
        }));
        let calls = calls.into_inner().expect("lock");
        assert!(!calls.is_empty());
        assert_eq!(calls.last(), Some(&false));
    }

    struct CountingProblem {
        generations: std::sync::atomic::AtomicU32,
    }

    impl GaProblem for CountingProblem {
        type Individual = SimpleIndividual;

        fn evaluate(&self, _individual: &mut Self::Individual) {}

        fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<SimpleIndividual> {
            SimpleProblem.initialize_population(size, rng)
        }

        fn on_generation(&self, _generation: u32, _best: &SimpleIndividual) {
            self.generations.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_ga_generation_hook_once_per_generation() {
        let problem = CountingProblem {
            generations: std::sync::atomic::AtomicU32::new(0),
        };
        let runner = GaRunner::new(config().with_max_generations(7), problem);
        let result = runner.run().expect("population");
        assert_eq!(
            runner.problem().generations.load(Ordering::Relaxed),
            result.generations
        );
    }

    #[test]
    fn test_config_from_settings() {
        let settings = GeneticSettings::default()
            .with_seed(9)
            .with_plateau_window(0)
            .with_time_limit_ms(250);
        let cfg = GaConfig::from(&settings);
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(cfg.stagnation_limit, None);
        assert_eq!(cfg.time_limit, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_permutation_crossover() {
        let mut rng = StdRng::seed_from_u64(1);
        let parent1 = PermutationChromosome::random(10, &mut rng);
        let parent2 = PermutationChromosome::random(10, &mut rng);

        let child = parent1.order_crossover(&parent2, &mut rng);

        assert_eq!(child.genes.len(), 10);
        assert_eq!(child.rotations.len(), 10);
        let mut sorted = child.genes.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_permutation_mutation() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut chromosome = PermutationChromosome::random(10, &mut rng);
        for _ in 0..20 {
            chromosome.mutate(&mut rng);
        }
        let mut sorted = chromosome.genes.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
        assert!(chromosome.fitness().is_infinite());
    }
}
