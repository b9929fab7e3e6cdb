//! Population search over placement order and rotation.
//!
//! A genome is a [`PermutationChromosome`]: an order over part instances plus
//! one rotation flag per instance. Decoding replays the guillotine placement
//! with that order.
//!
//! The rotation flag is relative, not an absolute 0°/90° choice: a clear flag
//! keeps the orientation best-area-fit picks for the free rectangle at hand,
//! a set flag asks for the other allowed orientation and falls back to the
//! best-fit one when that does not fit (or grain forbids it). The same flag
//! can therefore yield different rotations on different sheets.
//!
//! The deterministic guillotine order, with every flag clear, is always
//! seeded into the initial population, so the search never returns a layout
//! worse than the guillotine packer's.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::prelude::*;
use u_cutlist_core::ga::{GaConfig, GaProblem, GaProgress, GaRunner, Individual, PermutationChromosome};
use u_cutlist_core::{
    Algorithm, ObjectiveWeights, OptimizationResult, Packer, Part, ProgressCallback, ProgressInfo,
    Result, Settings, StockSheet,
};

use crate::guillotine::{LayoutBuilder, Packing};
use crate::objective::layout_fitness;

/// Packing problem handed to the GA runner.
pub struct PackingProblem<'a> {
    builder: LayoutBuilder<'a>,
    weights: ObjectiveWeights,
    feed_rate: f64,
    seed_order: Vec<usize>,
}

impl<'a> PackingProblem<'a> {
    /// Creates the problem for one optimization run.
    pub fn new(parts: &'a [Part], stocks: &'a [StockSheet], settings: &Settings) -> Self {
        let builder = LayoutBuilder::new(parts, stocks, settings);
        let seed_order = builder.priority_order();
        Self {
            builder,
            weights: settings.weights,
            feed_rate: settings.tool.feed_rate,
            seed_order,
        }
    }

    /// Number of part instances (genome length).
    pub fn num_instances(&self) -> usize {
        self.builder.instances().len()
    }

    /// The guillotine packer's genome.
    pub fn seed_chromosome(&self) -> PermutationChromosome {
        PermutationChromosome::from_order(self.seed_order.clone(), vec![false; self.num_instances()])
    }

    /// Decodes a genome into sheets.
    pub fn decode(&self, chromosome: &PermutationChromosome) -> Packing {
        self.builder
            .build(&chromosome.genes, Some(chromosome.rotations.as_slice()))
    }

    fn score(&self, packing: &Packing) -> f64 {
        layout_fitness(
            &packing.sheets,
            packing.unplaced.len(),
            &self.weights,
            self.feed_rate,
        )
    }
}

impl GaProblem for PackingProblem<'_> {
    type Individual = PermutationChromosome;

    fn evaluate(&self, individual: &mut PermutationChromosome) {
        let packing = self.decode(individual);
        individual.set_fitness(self.score(&packing));
    }

    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<PermutationChromosome> {
        let n = self.num_instances();
        let mut population = Vec::with_capacity(size);
        population.push(self.seed_chromosome());
        while population.len() < size {
            population.push(PermutationChromosome::random(n, rng));
        }
        population
    }

    fn on_generation(&self, generation: u32, best: &PermutationChromosome) {
        log::debug!(
            "packing generation {}: fitness={:.4}",
            generation,
            best.fitness()
        );
    }
}

/// Population-search packer.
pub struct GeneticPacker {
    cancelled: Arc<AtomicBool>,
}

impl GeneticPacker {
    /// Creates a packer with its own cancel flag.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a packer sharing an external cancel flag.
    pub fn with_cancel_flag(cancelled: Arc<AtomicBool>) -> Self {
        Self { cancelled }
    }

    fn run(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
        callback: Option<&ProgressCallback>,
    ) -> OptimizationResult {
        let start = Instant::now();
        let problem = PackingProblem::new(parts, stocks, settings);

        // nothing to permute
        if problem.num_instances() < 2 {
            let packing = problem.decode(&problem.seed_chromosome());
            let mut result = packing.into_result(Algorithm::GeneticSearch, settings);
            result.elapsed_ms = start.elapsed().as_millis() as u64;
            result.cancelled = self.cancelled.load(Ordering::Relaxed);
            return result;
        }

        let config = GaConfig::from(&settings.genetic);
        let runner = GaRunner::new(config, problem).with_cancel_flag(self.cancelled.clone());

        let forward = |p: GaProgress| {
            if let Some(cb) = callback {
                let info = ProgressInfo::new()
                    .with_generation(p.generation, p.max_generations)
                    .with_fitness(p.best_fitness)
                    .with_elapsed(p.elapsed.as_millis() as u64)
                    .with_phase("genetic");
                cb(if p.running { info } else { info.finished() });
            }
        };

        let Some(ga) = runner.run_with_progress(Some(forward)) else {
            let problem = runner.problem();
            let packing = problem.decode(&problem.seed_chromosome());
            return packing.into_result(Algorithm::GeneticSearch, settings);
        };

        let packing = runner.problem().decode(&ga.best);
        let mut result = packing.into_result(Algorithm::GeneticSearch, settings);
        result.generations = ga.generations;
        result.fitness_history = ga.history;
        result.cancelled = ga.cancelled;
        result.elapsed_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "genetic: {} generation(s), fitness {:.4}, {} sheet(s), {} unplaced{}",
            result.generations,
            result.best_fitness,
            result.summary.sheets_used,
            result.summary.parts_unplaced,
            if result.cancelled { " (cancelled)" } else { "" }
        );
        result
    }
}

impl Default for GeneticPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl Packer for GeneticPacker {
    fn pack(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
    ) -> Result<OptimizationResult> {
        Ok(self.run(parts, stocks, settings, None))
    }

    fn pack_with_progress(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
        callback: ProgressCallback,
    ) -> Result<OptimizationResult> {
        Ok(self.run(parts, stocks, settings, Some(&callback)))
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}
