//! U-Cutlist command-line front end.
//!
//! Jobs are JSON files of the form `{ "parts": [...], "stocks": [...],
//! "settings": {...} }`; `settings` may be omitted or partial.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use u_cutlist_core::{Algorithm, OptimizationResult, Part, Settings, StockSheet};
use u_cutlist_cutting::{plan_all, PlannedSheet};
use u_cutlist_gcode::{builtin, builtin_names, resolve, Emitter, GCodeProfile};
use u_cutlist_packing::{detect_offcuts_with, OffcutConfig, Optimizer};

#[derive(Parser)]
#[command(name = "u-cutlist")]
#[command(about = "Sheet cutting optimizer and CNC program generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack the job's parts onto its stock sheets
    Optimize {
        /// Job file (JSON)
        job: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Output file for the layout (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List reusable remnants left by the layout
    Offcuts {
        /// Job file (JSON)
        job: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Minimum remnant width
        #[arg(long, default_value = "100")]
        min_width: f64,

        /// Minimum remnant height
        #[arg(long, default_value = "100")]
        min_height: f64,

        /// Output file for the remnants (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Plan toolpaths and write machine programs
    Gcode {
        /// Job file (JSON)
        job: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Built-in profile name (defaults to the job's setting)
        #[arg(short, long)]
        profile: Option<String>,

        /// Custom profile file (JSON), overrides --profile
        #[arg(long)]
        profile_file: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "gcode")]
        output: PathBuf,

        /// Write all sheets into one program
        #[arg(long)]
        combined: bool,

        /// Number blocks with N words
        #[arg(long)]
        line_numbers: bool,

        /// Home all axes before the first sheet
        #[arg(long)]
        home: bool,

        /// Fail when the dust shoe hits a clamp zone
        #[arg(long)]
        strict: bool,
    },

    /// List built-in machine profiles
    Profiles {
        /// Print one profile as JSON
        #[arg(short, long)]
        show: Option<String>,
    },
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Packing algorithm (defaults to the job's setting)
    #[arg(short, long, value_enum)]
    algorithm: Option<AlgorithmArg>,

    /// Random seed for the genetic search
    #[arg(long)]
    seed: Option<u64>,

    /// Time limit for the genetic search in seconds
    #[arg(short, long)]
    time_limit: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// Best-area-fit guillotine packing
    Guillotine,
    /// Population search over order and rotation
    Genetic,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Guillotine => Algorithm::Guillotine,
            AlgorithmArg::Genetic => Algorithm::GeneticSearch,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Job {
    parts: Vec<Part>,
    stocks: Vec<StockSheet>,
    #[serde(default)]
    settings: Settings,
}

impl Job {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let job: Job =
            serde_json::from_str(&text).with_context(|| format!("parsing job {}", path.display()))?;
        log::info!(
            "loaded job {}: {} part kinds, {} stock kinds",
            path.display(),
            job.parts.len(),
            job.stocks.len()
        );
        Ok(job)
    }

    fn apply(&mut self, search: &SearchArgs) {
        if let Some(algorithm) = search.algorithm {
            self.settings.algorithm = algorithm.into();
        }
        if let Some(seed) = search.seed {
            self.settings.genetic.seed = Some(seed);
        }
        if let Some(seconds) = search.time_limit {
            self.settings.genetic.time_limit_ms = Some(seconds * 1000);
        }
    }

    fn optimize(&self) -> anyhow::Result<OptimizationResult> {
        let optimizer = Optimizer::new(self.settings.clone());
        let result = optimizer
            .optimize(&self.parts, &self.stocks)
            .context("optimization failed")?;
        Ok(result)
    }
}

fn load_and_optimize(path: &Path, search: &SearchArgs) -> anyhow::Result<(Job, OptimizationResult)> {
    let mut job = Job::load(path)?;
    job.apply(search);
    let result = job.optimize()?;
    print_summary(&result);
    Ok((job, result))
}

fn print_summary(result: &OptimizationResult) {
    let s = &result.summary;
    println!("Layout ({}, {} ms)", result.algorithm, result.elapsed_ms);
    println!("{:-<48}", "");
    println!("  sheets used      {}", s.sheets_used);
    println!("  parts placed     {}", s.parts_placed);
    println!("  utilization      {:.1}%", s.utilization * 100.0);
    println!("  waste area       {:.0}", s.total_waste);
    println!("  kerf loss        {:.0}", s.total_kerf_loss);
    println!("  cut length       {:.0}", s.total_cut_length);
    println!("  cost             {:.2}", s.total_cost);
    println!("  estimated time   {:.1} min", s.estimated_minutes);
    if result.cancelled {
        println!("  (search cancelled, best layout so far)");
    }
    if !result.unplaced.is_empty() {
        println!("\nUnplaced ({}):", result.unplaced.len());
        for u in &result.unplaced {
            println!("  {} #{}: {:?}", u.part_id, u.instance + 1, u.reason);
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {} bytes to {}", text.len(), path.display());
    println!("Saved to: {}", path.display());
    Ok(())
}

fn load_profile(name: Option<&str>, file: Option<&Path>, settings: &Settings) -> anyhow::Result<GCodeProfile> {
    if let Some(path) = file {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let profile: GCodeProfile =
            serde_json::from_str(&text).with_context(|| format!("parsing profile {}", path.display()))?;
        log::info!("using profile '{}' from {}", profile.name, path.display());
        return Ok(profile);
    }
    let profile = resolve(name.unwrap_or(&settings.gcode_profile))?;
    log::info!("using built-in profile '{}'", profile.name);
    Ok(profile)
}

fn write_programs(
    planned: &[PlannedSheet],
    emitter: &Emitter<'_>,
    output: &Path,
    combined: bool,
) -> anyhow::Result<()> {
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    if combined {
        let path = output.join("job.nc");
        fs::write(&path, emitter.combined(planned)?)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {} sheets to {}", planned.len(), path.display());
        println!("Wrote {}", path.display());
        return Ok(());
    }
    for sheet in planned {
        let path = output.join(format!("sheet_{:02}.nc", sheet.sheet_index + 1));
        fs::write(&path, emitter.sheet(sheet)?).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote sheet {} to {}", sheet.sheet_index + 1, path.display());
        println!(
            "Wrote {} ({} cuts, {:.0} mm feed, {:.1} min)",
            path.display(),
            sheet.cuts.len(),
            sheet.stats.feed_length,
            sheet.stats.estimated_seconds / 60.0
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize { job, search, output } => {
            let (_, result) = load_and_optimize(&job, &search)?;
            if let Some(path) = output {
                write_json(&path, &result)?;
            }
        }

        Commands::Offcuts {
            job,
            search,
            min_width,
            min_height,
            output,
        } => {
            let (job, result) = load_and_optimize(&job, &search)?;
            let config = OffcutConfig::new().with_min_size(min_width, min_height);
            let offcuts = detect_offcuts_with(&result, job.settings.kerf_width, &config);

            println!("\nOffcuts ({}):", offcuts.len());
            for o in &offcuts {
                println!(
                    "  sheet {:<3} {:>7.0} x {:<7.0} at ({:.0}, {:.0})  value {:.2}",
                    o.sheet_index + 1,
                    o.width(),
                    o.height(),
                    o.rect.x,
                    o.rect.y,
                    o.price
                );
            }
            if let Some(path) = output {
                write_json(&path, &offcuts)?;
            }
        }

        Commands::Gcode {
            job,
            search,
            profile,
            profile_file,
            output,
            combined,
            line_numbers,
            home,
            strict,
        } => {
            let (job, result) = load_and_optimize(&job, &search)?;
            let profile = load_profile(profile.as_deref(), profile_file.as_deref(), &job.settings)?;
            let planned = plan_all(&result, &job.parts, &job.settings)?;

            let failed: Vec<&PlannedSheet> = planned.iter().filter(|p| !p.collision.passed()).collect();
            for sheet in &failed {
                log::warn!("sheet {} failed the clamp clearance check", sheet.sheet_index + 1);
                eprintln!(
                    "sheet {}: dust shoe hits clamp zone(s) {}",
                    sheet.sheet_index + 1,
                    sheet.collision.offending_zones().join(", ")
                );
            }
            if strict && !failed.is_empty() {
                bail!("{} sheet(s) failed the clamp clearance check", failed.len());
            }

            let emitter = Emitter::new(&profile)?
                .with_line_numbers(line_numbers)
                .with_home_first(home);
            println!("\nProfile: {}", profile.name);
            write_programs(&planned, &emitter, &output, combined)?;
        }

        Commands::Profiles { show } => match show {
            Some(name) => {
                let Some(profile) = builtin(&name) else {
                    bail!("unknown profile '{}'", name);
                };
                println!("{}", serde_json::to_string_pretty(&profile)?);
            }
            None => {
                println!("Built-in profiles:");
                for name in builtin_names() {
                    println!("  - {}", name);
                }
                println!("\nUse 'u-cutlist profiles --show <NAME>' to print one as JSON");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_json(settings: Option<serde_json::Value>) -> serde_json::Value {
        let mut value = serde_json::json!({
            "parts": serde_json::to_value(vec![Part::new("shelf", 400.0, 250.0).with_quantity(3)]).unwrap(),
            "stocks": serde_json::to_value(vec![StockSheet::new("ply", 1220.0, 2440.0)]).unwrap(),
        });
        if let Some(settings) = settings {
            value["settings"] = settings;
        }
        value
    }

    #[test]
    fn test_job_without_settings_uses_defaults() {
        let job: Job = serde_json::from_value(job_json(None)).unwrap();
        assert_eq!(job.parts.len(), 1);
        assert_eq!(job.settings.gcode_profile, Settings::default().gcode_profile);
        assert!((job.settings.kerf_width - Settings::default().kerf_width).abs() < 1e-12);
    }

    #[test]
    fn test_search_args_override_settings() {
        let mut job: Job = serde_json::from_value(job_json(None)).unwrap();
        job.apply(&SearchArgs {
            algorithm: Some(AlgorithmArg::Genetic),
            seed: Some(11),
            time_limit: Some(2),
        });
        assert_eq!(job.settings.algorithm, Algorithm::GeneticSearch);
        assert_eq!(job.settings.genetic.seed, Some(11));
        assert_eq!(job.settings.genetic.time_limit_ms, Some(2000));
    }

    #[test]
    fn test_job_optimizes() {
        let job: Job = serde_json::from_value(job_json(None)).unwrap();
        let result = job.optimize().unwrap();
        assert_eq!(result.summary.parts_placed, 3);
    }

    #[test]
    fn test_load_profile_by_name() {
        let settings = Settings::default();
        let profile = load_profile(Some("grbl"), None, &settings).unwrap();
        assert_eq!(profile.name, GCodeProfile::grbl().name);
        let fallback = load_profile(None, None, &settings).unwrap();
        assert_eq!(fallback.name, GCodeProfile::generic().name);
        assert!(load_profile(Some("no-such-machine"), None, &settings).is_err());
    }
}
