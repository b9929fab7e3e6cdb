//! Packer trait and progress reporting.

use crate::part::{Part, StockSheet};
use crate::result::OptimizationResult;
use crate::settings::Settings;
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Packing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Algorithm {
    /// Deterministic best-area-fit guillotine packing (fast).
    #[default]
    Guillotine,
    /// Population search over placement order and rotation (slower, better).
    GeneticSearch,
}

impl Algorithm {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Guillotine => "guillotine",
            Algorithm::GeneticSearch => "genetic",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "guillotine" => Ok(Algorithm::Guillotine),
            "genetic" | "geneticsearch" | "ga" => Ok(Algorithm::GeneticSearch),
            other => Err(crate::Error::invalid(format!("unknown algorithm '{other}'"))),
        }
    }
}

/// Progress callback for long-running operations.
pub type ProgressCallback = Box<dyn Fn(ProgressInfo) + Send + Sync>;

/// Progress information during packing.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    /// Current generation.
    pub generation: u32,
    /// Generation budget (0 if not applicable).
    pub total_generations: u32,
    /// Best fitness so far (lower is better).
    pub best_fitness: f64,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Current phase description.
    pub phase: String,
    /// Whether the packer is still running.
    pub running: bool,
}

impl ProgressInfo {
    /// Creates a running progress record.
    pub fn new() -> Self {
        Self {
            running: true,
            ..Default::default()
        }
    }

    /// Sets the generation info.
    pub fn with_generation(mut self, current: u32, total: u32) -> Self {
        self.generation = current;
        self.total_generations = total;
        self
    }

    /// Sets the best fitness.
    pub fn with_fitness(mut self, fitness: f64) -> Self {
        self.best_fitness = fitness;
        self
    }

    /// Sets the elapsed time.
    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Sets the phase description.
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    /// Marks the packer as finished.
    pub fn finished(mut self) -> Self {
        self.running = false;
        self
    }

    /// Progress fraction (0.0 to 1.0).
    pub fn progress_percent(&self) -> f64 {
        if self.total_generations > 0 {
            (self.generation as f64 / self.total_generations as f64).min(1.0)
        } else {
            0.0
        }
    }
}

/// A packing strategy.
///
/// Implementations receive validated input. Parts that cannot be placed go
/// to [`OptimizationResult::unplaced`]; only malformed input is an error.
pub trait Packer {
    /// Packs `parts` onto `stocks`.
    fn pack(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
    ) -> Result<OptimizationResult>;

    /// Packs with a progress callback.
    fn pack_with_progress(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        settings: &Settings,
        callback: ProgressCallback,
    ) -> Result<OptimizationResult>;

    /// Requests cancellation of an ongoing run.
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("Guillotine".parse::<Algorithm>().ok(), Some(Algorithm::Guillotine));
        assert_eq!("genetic".parse::<Algorithm>().ok(), Some(Algorithm::GeneticSearch));
        assert!("nfp".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::GeneticSearch.to_string(), "genetic");
    }

    #[test]
    fn test_progress_info() {
        let info = ProgressInfo::new()
            .with_generation(25, 100)
            .with_fitness(1.5)
            .with_phase("evolving");
        assert!(info.running);
        assert!((info.progress_percent() - 0.25).abs() < 1e-9);
        assert!(!info.finished().running);
    }
}
