//! Settings for one optimization and toolpath pass.
//!
//! [`Settings`] groups every knob by concern; each group has a `Default`
//! suited to a 6 mm router bit in 18 mm sheet goods.

use crate::error::{Error, Result};
use crate::geometry::{Rect, EPS};
use crate::solver::Algorithm;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weights of the population-search objective. Lower fitness is better.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ObjectiveWeights {
    /// Weight of waste area normalised by used sheet area.
    pub waste: f64,
    /// Weight of the sheet count.
    pub sheets: f64,
    /// Weight of the total cut length, in metres.
    pub cut_length: f64,
    /// Weight of the estimated job time, in minutes.
    pub job_time: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            waste: 1.0,
            sheets: 1.0,
            cut_length: 0.05,
            job_time: 0.05,
        }
    }
}

/// Parameters of the population search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneticSettings {
    /// Population size.
    pub population_size: usize,
    /// Generation budget.
    pub generations: u32,
    /// Crossover probability (0.0 - 1.0).
    pub crossover_rate: f64,
    /// Mutation probability (0.0 - 1.0).
    pub mutation_rate: f64,
    /// Individuals copied unchanged into the next generation.
    pub elite_count: usize,
    /// Tournament size for selection.
    pub tournament_size: usize,
    /// Stop after this many generations without improvement (0 = never).
    pub plateau_window: u32,
    /// Wall-clock budget in milliseconds.
    pub time_limit_ms: Option<u64>,
    /// Random seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Fitness worker threads (0 = hardware parallelism).
    pub workers: usize,
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            population_size: 60,
            generations: 150,
            crossover_rate: 0.85,
            mutation_rate: 0.15,
            elite_count: 2,
            tournament_size: 3,
            plateau_window: 30,
            time_limit_ms: None,
            seed: None,
            workers: 0,
        }
    }
}

impl GeneticSettings {
    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the generation budget.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations;
        self
    }

    /// Sets the plateau window.
    pub fn with_plateau_window(mut self, window: u32) -> Self {
        self.plateau_window = window;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Cutter and motion parameters. Depths are positive distances below the stock top.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ToolSettings {
    /// Cutter diameter.
    pub diameter: f64,
    /// Cutting feed rate (mm/min).
    pub feed_rate: f64,
    /// Plunge feed rate (mm/min).
    pub plunge_rate: f64,
    /// Rapid traverse rate used for time estimates (mm/min).
    pub rapid_rate: f64,
    /// Spindle speed (rpm).
    pub spindle_speed: f64,
    /// Retract height above the stock top.
    pub safe_z: f64,
    /// Total cut depth.
    pub cut_depth: f64,
    /// Maximum depth per pass.
    pub pass_depth: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            diameter: 6.0,
            feed_rate: 3000.0,
            plunge_rate: 800.0,
            rapid_rate: 10000.0,
            spindle_speed: 18000.0,
            safe_z: 5.0,
            cut_depth: 18.0,
            pass_depth: 6.0,
        }
    }
}

impl ToolSettings {
    /// Cutter radius.
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Number of depth passes needed to reach `depth`.
    pub fn pass_count(&self, depth: f64) -> usize {
        if depth <= 0.0 || self.pass_depth <= 0.0 {
            return 0;
        }
        (depth / self.pass_depth - 1e-9).ceil().max(1.0) as usize
    }
}

/// Lead-in/out arc parameters. A zero radius disables the arcs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LeadSettings {
    /// Arc radius.
    pub radius: f64,
    /// Arc sweep in degrees.
    pub angle_deg: f64,
}

impl Default for LeadSettings {
    fn default() -> Self {
        Self {
            radius: 5.0,
            angle_deg: 90.0,
        }
    }
}

/// How the cutter descends into the material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlungeStrategy {
    /// Vertical plunge.
    #[default]
    Straight,
    /// Inclined descent along the lead-in and the contour.
    Ramp,
    /// Helical descent beside the entry point.
    Helix,
}

/// Plunge-entry parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlungeSettings {
    /// Entry strategy.
    pub strategy: PlungeStrategy,
    /// Ramp angle from horizontal, in degrees.
    pub ramp_angle_deg: f64,
    /// Helix diameter (tool path, not bore).
    pub helix_diameter: f64,
    /// Depth descended per helix revolution.
    pub helix_depth_per_rev: f64,
}

impl Default for PlungeSettings {
    fn default() -> Self {
        Self {
            strategy: PlungeStrategy::Straight,
            ramp_angle_deg: 5.0,
            helix_diameter: 8.0,
            helix_depth_per_rev: 1.5,
        }
    }
}

/// Relief motion at interior corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CornerOvercut {
    /// Leave the tool-radius fillet.
    #[default]
    None,
    /// Overcut along the corner bisector.
    DogBone,
    /// Overcut perpendicular to the incoming edge.
    TBone,
}

/// Onion-skin parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OnionSkinSettings {
    /// Leave a skin on the final pass.
    pub enabled: bool,
    /// Skin thickness.
    pub thickness: f64,
    /// Append a full-depth cleanup pass per part at the end of the sheet.
    pub cleanup_pass: bool,
}

impl Default for OnionSkinSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            thickness: 0.3,
            cleanup_pass: true,
        }
    }
}

/// Holding-tab parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TabSettings {
    /// Insert tabs.
    pub enabled: bool,
    /// Tab length along the contour.
    pub width: f64,
    /// Tab height above the cut floor.
    pub height: f64,
    /// Tabs per contour side.
    pub count_per_side: usize,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 8.0,
            height: 3.0,
            count_per_side: 1,
        }
    }
}

/// Bands along each sheet edge that the cutter never cuts through.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StockTabPadding {
    /// Band width along the left edge.
    pub left: f64,
    /// Band width along the right edge.
    pub right: f64,
    /// Band width along the bottom edge.
    pub bottom: f64,
    /// Band width along the top edge.
    pub top: f64,
}

impl StockTabPadding {
    /// Same width on every edge.
    pub fn uniform(width: f64) -> Self {
        Self {
            left: width,
            right: width,
            bottom: width,
            top: width,
        }
    }

    /// Returns true if no band is set.
    pub fn is_empty(&self) -> bool {
        self.left <= 0.0 && self.right <= 0.0 && self.bottom <= 0.0 && self.top <= 0.0
    }

    /// Padding zones for a `width × height` sheet.
    pub fn zones(&self, width: f64, height: f64) -> Vec<Rect> {
        let mut zones = Vec::new();
        if self.left > 0.0 {
            zones.push(Rect::new(0.0, 0.0, self.left, height));
        }
        if self.right > 0.0 {
            zones.push(Rect::new(width - self.right, 0.0, self.right, height));
        }
        if self.bottom > 0.0 {
            zones.push(Rect::new(0.0, 0.0, width, self.bottom));
        }
        if self.top > 0.0 {
            zones.push(Rect::new(0.0, height - self.top, width, self.top));
        }
        zones
    }
}

/// A fixture region the dust shoe must clear.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClampZone {
    /// Display label.
    pub label: String,
    /// Footprint in sheet coordinates.
    pub rect: Rect,
    /// Height of the fixture above the stock top.
    pub clearance_height: f64,
}

impl ClampZone {
    /// Creates a clamp zone.
    pub fn new(label: impl Into<String>, rect: Rect, clearance_height: f64) -> Self {
        Self {
            label: label.into(),
            rect,
            clearance_height,
        }
    }
}

/// Dust-shoe footprint used for the collision check.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DustShoeSettings {
    /// Run the collision check.
    pub enabled: bool,
    /// Side length of the square footprint centred on the tool.
    pub width: f64,
    /// Height of the shoe bottom above the tool tip.
    pub clearance: f64,
}

impl Default for DustShoeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 100.0,
            clearance: 10.0,
        }
    }
}

/// Cut ordering flags.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrderingSettings {
    /// Reorder cuts to shorten rapid travel.
    pub optimize_order: bool,
    /// Cut parts nearest sheet edges and clamps first.
    pub structural_order: bool,
    /// Candidate entry points tried per contour.
    pub nesting_rotations: usize,
}

impl Default for OrderingSettings {
    fn default() -> Self {
        Self {
            optimize_order: true,
            structural_order: false,
            nesting_rotations: 4,
        }
    }
}

/// Configuration for one optimization and toolpath pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// Width of material removed by a cut.
    pub kerf_width: f64,
    /// Margin removed from every sheet edge.
    pub edge_trim: f64,
    /// Packing algorithm.
    pub algorithm: Algorithm,
    /// Keep free space strictly guillotine (no free-rectangle merging).
    pub guillotine_only: bool,
    /// Population-search objective weights.
    pub weights: ObjectiveWeights,
    /// Population-search parameters.
    pub genetic: GeneticSettings,
    /// Cutter parameters.
    pub tool: ToolSettings,
    /// Lead-in/out parameters.
    pub lead: LeadSettings,
    /// Plunge-entry parameters.
    pub plunge: PlungeSettings,
    /// Interior-corner relief.
    pub corner_overcut: CornerOvercut,
    /// Onion-skin parameters.
    pub onion_skin: OnionSkinSettings,
    /// Holding tabs.
    pub tabs: TabSettings,
    /// Uncut bands along the sheet edges.
    pub stock_tabs: StockTabPadding,
    /// Fixture regions.
    pub clamp_zones: Vec<ClampZone>,
    /// Dust-shoe collision parameters.
    pub dust_shoe: DustShoeSettings,
    /// Cut ordering.
    pub ordering: OrderingSettings,
    /// Machine profile name.
    pub gcode_profile: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kerf_width: 6.0,
            edge_trim: 0.0,
            algorithm: Algorithm::Guillotine,
            guillotine_only: true,
            weights: ObjectiveWeights::default(),
            genetic: GeneticSettings::default(),
            tool: ToolSettings::default(),
            lead: LeadSettings::default(),
            plunge: PlungeSettings::default(),
            corner_overcut: CornerOvercut::None,
            onion_skin: OnionSkinSettings::default(),
            tabs: TabSettings::default(),
            stock_tabs: StockTabPadding::default(),
            clamp_zones: Vec::new(),
            dust_shoe: DustShoeSettings::default(),
            ordering: OrderingSettings::default(),
            gcode_profile: "Generic".to_string(),
        }
    }
}

impl Settings {
    /// Creates settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the kerf width.
    pub fn with_kerf(mut self, kerf: f64) -> Self {
        self.kerf_width = kerf;
        self
    }

    /// Sets the edge trim.
    pub fn with_edge_trim(mut self, trim: f64) -> Self {
        self.edge_trim = trim;
        self
    }

    /// Sets the packing algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the guillotine-only constraint.
    pub fn with_guillotine_only(mut self, guillotine_only: bool) -> Self {
        self.guillotine_only = guillotine_only;
        self
    }

    /// Sets the population-search parameters.
    pub fn with_genetic(mut self, genetic: GeneticSettings) -> Self {
        self.genetic = genetic;
        self
    }

    /// Sets the objective weights.
    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the cutter parameters.
    pub fn with_tool(mut self, tool: ToolSettings) -> Self {
        self.tool = tool;
        self
    }

    /// Sets the lead-in/out parameters.
    pub fn with_lead(mut self, lead: LeadSettings) -> Self {
        self.lead = lead;
        self
    }

    /// Sets the plunge parameters.
    pub fn with_plunge(mut self, plunge: PlungeSettings) -> Self {
        self.plunge = plunge;
        self
    }

    /// Sets the corner overcut style.
    pub fn with_corner_overcut(mut self, style: CornerOvercut) -> Self {
        self.corner_overcut = style;
        self
    }

    /// Sets the onion-skin parameters.
    pub fn with_onion_skin(mut self, onion_skin: OnionSkinSettings) -> Self {
        self.onion_skin = onion_skin;
        self
    }

    /// Sets the holding-tab parameters.
    pub fn with_tabs(mut self, tabs: TabSettings) -> Self {
        self.tabs = tabs;
        self
    }

    /// Sets the stock padding bands.
    pub fn with_stock_tabs(mut self, padding: StockTabPadding) -> Self {
        self.stock_tabs = padding;
        self
    }

    /// Adds a clamp zone.
    pub fn with_clamp_zone(mut self, zone: ClampZone) -> Self {
        self.clamp_zones.push(zone);
        self
    }

    /// Sets the dust-shoe parameters.
    pub fn with_dust_shoe(mut self, dust_shoe: DustShoeSettings) -> Self {
        self.dust_shoe = dust_shoe;
        self
    }

    /// Sets the ordering flags.
    pub fn with_ordering(mut self, ordering: OrderingSettings) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the machine profile name.
    pub fn with_gcode_profile(mut self, name: impl Into<String>) -> Self {
        self.gcode_profile = name.into();
        self
    }

    /// Rejects negative or non-finite packing parameters.
    pub fn validate_packing(&self) -> Result<()> {
        if !(self.kerf_width >= 0.0 && self.kerf_width.is_finite()) {
            return Err(Error::invalid(format!(
                "kerf width must be non-negative, got {}",
                self.kerf_width
            )));
        }
        if !(self.edge_trim >= 0.0 && self.edge_trim.is_finite()) {
            return Err(Error::invalid(format!(
                "edge trim must be non-negative, got {}",
                self.edge_trim
            )));
        }
        let g = &self.genetic;
        if matches!(self.algorithm, Algorithm::GeneticSearch) {
            if g.population_size < 2 {
                return Err(Error::invalid("population size must be at least 2"));
            }
            if !(0.0..=1.0).contains(&g.crossover_rate) || !(0.0..=1.0).contains(&g.mutation_rate) {
                return Err(Error::invalid("crossover and mutation rates must lie in [0, 1]"));
            }
        }
        Ok(())
    }

    /// Rejects tool parameters that cannot produce a toolpath.
    pub fn validate_tooling(&self) -> Result<()> {
        let t = &self.tool;
        let positive = [
            ("tool diameter", t.diameter),
            ("feed rate", t.feed_rate),
            ("plunge rate", t.plunge_rate),
            ("cut depth", t.cut_depth),
            ("pass depth", t.pass_depth),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.onion_skin.enabled && self.onion_skin.thickness >= t.cut_depth {
            return Err(Error::invalid("onion skin is thicker than the cut depth"));
        }
        Ok(())
    }

    /// Checks that the kerf between packed parts fits the tool.
    ///
    /// Tool paths run outside each part, so a kerf narrower than the tool
    /// diameter makes neighbouring cuts overlap the finished parts.
    pub fn validate_clearance(&self) -> Result<()> {
        if self.kerf_width + EPS < self.tool.diameter {
            return Err(Error::invalid(format!(
                "kerf {} is narrower than the {} tool diameter",
                self.kerf_width, self.tool.diameter
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.algorithm, Algorithm::Guillotine);
        assert!(settings.guillotine_only);
        assert_eq!(settings.gcode_profile, "Generic");
        assert!((settings.tool.radius() - 3.0).abs() < 1e-9);
        assert!(settings.validate_packing().is_ok());
        assert!(settings.validate_tooling().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let settings = Settings::new()
            .with_kerf(3.0)
            .with_edge_trim(10.0)
            .with_algorithm(Algorithm::GeneticSearch)
            .with_genetic(GeneticSettings::default().with_seed(7).with_workers(2))
            .with_clamp_zone(ClampZone::new("clamp", Rect::new(0.0, 0.0, 50.0, 50.0), 20.0));
        assert_eq!(settings.kerf_width, 3.0);
        assert_eq!(settings.edge_trim, 10.0);
        assert_eq!(settings.genetic.seed, Some(7));
        assert_eq!(settings.clamp_zones.len(), 1);
    }

    #[test]
    fn test_packing_validation() {
        assert!(Settings::new().with_kerf(-1.0).validate_packing().is_err());
        assert!(Settings::new().with_edge_trim(f64::NAN).validate_packing().is_err());

        let mut settings = Settings::new().with_algorithm(Algorithm::GeneticSearch);
        settings.genetic.mutation_rate = 1.5;
        assert!(settings.validate_packing().is_err());
    }

    #[test]
    fn test_tooling_validation() {
        let mut settings = Settings::new();
        settings.tool.pass_depth = 0.0;
        assert!(settings.validate_tooling().is_err());

        let settings = Settings::new().with_onion_skin(OnionSkinSettings {
            enabled: true,
            thickness: 20.0,
            cleanup_pass: false,
        });
        assert!(settings.validate_tooling().is_err());
    }

    #[test]
    fn test_kerf_must_fit_tool() {
        assert!(Settings::new().validate_clearance().is_ok());
        assert!(Settings::new().with_kerf(12.0).validate_clearance().is_ok());
        let err = Settings::new().with_kerf(3.0).validate_clearance().unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_pass_count() {
        let tool = ToolSettings::default();
        assert_eq!(tool.pass_count(18.0), 3);
        assert_eq!(tool.pass_count(17.7), 3);
        assert_eq!(tool.pass_count(4.0), 1);
        assert_eq!(tool.pass_count(0.0), 0);
    }

    #[test]
    fn test_stock_padding_zones() {
        let padding = StockTabPadding {
            left: 10.0,
            top: 5.0,
            ..Default::default()
        };
        let zones = padding.zones(1000.0, 500.0);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0], Rect::new(0.0, 0.0, 10.0, 500.0));
        assert_eq!(zones[1], Rect::new(0.0, 495.0, 1000.0, 5.0));
        assert!(StockTabPadding::default().is_empty());
        assert!(!StockTabPadding::uniform(2.0).is_empty());
    }
}
