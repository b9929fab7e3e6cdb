//! Validated entry point dispatching to the selected packer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use u_cutlist_core::{
    Algorithm, Error, OptimizationResult, Packer, Part, ProgressCallback, Result, Settings,
    StockSheet,
};

use crate::genetic::GeneticPacker;
use crate::guillotine::GuillotinePacker;

/// Cutting-stock optimizer.
pub struct Optimizer {
    settings: Settings,
    cancelled: Arc<AtomicBool>,
}

impl Optimizer {
    /// Creates an optimizer for the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates an optimizer with default settings.
    pub fn default_config() -> Self {
        Self::new(Settings::default())
    }

    /// The settings in use.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shared flag; storing `true` stops a running search.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Requests cancellation of the running optimization.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn packer(&self) -> Box<dyn Packer> {
        match self.settings.algorithm {
            Algorithm::Guillotine => {
                Box::new(GuillotinePacker::with_cancel_flag(self.cancelled.clone()))
            }
            Algorithm::GeneticSearch => {
                Box::new(GeneticPacker::with_cancel_flag(self.cancelled.clone()))
            }
        }
    }

    /// Validates the input and packs it.
    pub fn optimize(&self, parts: &[Part], stocks: &[StockSheet]) -> Result<OptimizationResult> {
        validate_input(parts, stocks, &self.settings)?;

        // Reset cancellation flag
        self.cancelled.store(false, Ordering::Relaxed);

        log::info!(
            "optimizing {} part type(s) on {} stock type(s) with {}",
            parts.len(),
            stocks.len(),
            self.settings.algorithm
        );
        self.packer().pack(parts, stocks, &self.settings)
    }

    /// Like [`Optimizer::optimize`], reporting progress through `callback`.
    pub fn optimize_with_progress(
        &self,
        parts: &[Part],
        stocks: &[StockSheet],
        callback: ProgressCallback,
    ) -> Result<OptimizationResult> {
        validate_input(parts, stocks, &self.settings)?;

        // Reset cancellation flag
        self.cancelled.store(false, Ordering::Relaxed);

        self.packer()
            .pack_with_progress(parts, stocks, &self.settings, callback)
    }
}

/// Packs `parts` onto `stocks` with the algorithm selected in `settings`.
///
/// Non-positive dimensions or quantities, empty lists and out-of-range search
/// parameters are rejected with [`Error::InvalidInput`] before any packing
/// runs. Parts that cannot be placed are reported in the result, not as an
/// error.
pub fn optimize(
    parts: &[Part],
    stocks: &[StockSheet],
    settings: &Settings,
) -> Result<OptimizationResult> {
    Optimizer::new(settings.clone()).optimize(parts, stocks)
}

fn validate_input(parts: &[Part], stocks: &[StockSheet], settings: &Settings) -> Result<()> {
    if parts.is_empty() {
        return Err(Error::invalid("no parts given"));
    }
    if stocks.is_empty() {
        return Err(Error::invalid("no stock sheets given"));
    }
    for part in parts {
        part.validate()?;
    }
    for stock in stocks {
        stock.validate()?;
    }
    settings.validate_packing()
}
