//! Command stream emission.
//!
//! The emitter walks the moves of a planned sheet and writes one block per
//! motion using the profile's move words. Axis words are modal: a block only
//! carries the axes whose formatted value changed, and `F` only appears when
//! the feed rate changes.

use u_cutlist_core::{Error, Result};
use u_cutlist_cutting::{CutKind, Move, MoveKind, PlannedCut, PlannedSheet};

use crate::format::{feed_decimals, format_number};
use crate::profile::{GCodeProfile, Units};

/// Modal state carried across blocks.
#[derive(Debug, Clone, Default)]
struct EmitState {
    /// Last written X/Y/Z text; `None` until first written.
    axes: [Option<String>; 3],
    /// Last commanded Z in millimetres.
    z: Option<f64>,
    /// Last written feed text.
    feed: Option<String>,
    /// Next block number.
    line_number: u32,
}

impl EmitState {
    /// Forgets the position after a command that moves the machine.
    fn forget_position(&mut self) {
        self.axes = Default::default();
        self.z = None;
    }
}

const AXES: [char; 3] = ['X', 'Y', 'Z'];

/// Renders planned sheets with one machine profile.
#[derive(Debug, Clone)]
pub struct Emitter<'a> {
    profile: &'a GCodeProfile,
    home_first: bool,
    line_numbers: bool,
}

impl<'a> Emitter<'a> {
    /// Creates an emitter after checking the profile's templates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileMismatch`] for an empty or malformed template.
    pub fn new(profile: &'a GCodeProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            home_first: false,
            line_numbers: false,
        })
    }

    /// Emits the profile's home-all command before the first sheet.
    pub fn with_home_first(mut self, home_first: bool) -> Self {
        self.home_first = home_first;
        self
    }

    /// Prefixes blocks with `N` numbers in steps of 10.
    pub fn with_line_numbers(mut self, line_numbers: bool) -> Self {
        self.line_numbers = line_numbers;
        self
    }

    /// Complete program for one sheet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for non-finite coordinates or rates.
    pub fn sheet(&self, sheet: &PlannedSheet) -> Result<String> {
        self.program(std::slice::from_ref(sheet))
    }

    /// One program running every sheet, pausing for a stock change between
    /// sheets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty sheet list, non-finite
    /// coordinates or rates.
    pub fn combined(&self, sheets: &[PlannedSheet]) -> Result<String> {
        if sheets.is_empty() {
            return Err(Error::invalid("no sheets to emit"));
        }
        self.program(sheets)
    }

    fn program(&self, sheets: &[PlannedSheet]) -> Result<String> {
        let mut w = Writer::new(self.profile, self.line_numbers);
        for line in &self.profile.start_lines {
            w.raw(line);
        }
        for (i, sheet) in sheets.iter().enumerate() {
            if i > 0 {
                w.comment(&format!("Load sheet {} of {}", i + 1, sheets.len()));
                w.block(&self.profile.program_pause);
                w.state.forget_position();
            }
            self.write_sheet(&mut w, sheet, i == 0)?;
        }
        for line in &self.profile.end_lines {
            w.raw(line);
        }
        log::info!(
            "emitted {} sheet(s) with profile '{}': {} lines",
            sheets.len(),
            self.profile.name,
            w.lines
        );
        Ok(w.out)
    }

    fn write_sheet(&self, w: &mut Writer<'_>, sheet: &PlannedSheet, first: bool) -> Result<()> {
        let p = self.profile;
        let tool = &sheet.tool;
        for (name, rate) in [
            ("feed rate", tool.feed_rate),
            ("plunge rate", tool.plunge_rate),
            ("spindle speed", tool.spindle_speed),
        ] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::invalid(format!("{} must be positive, got {}", name, rate)));
            }
        }

        w.comment(&format!(
            "Sheet {}: {} {}x{}",
            sheet.sheet_index + 1,
            sheet.stock_label,
            format_number(sheet.width, 1, true),
            format_number(sheet.height, 1, true)
        ));
        w.block(p.units.command());
        w.block(&p.absolute_mode);
        w.block(&p.feed_mode);
        if first && self.home_first {
            w.block(&p.home_all);
            w.state.forget_position();
        }
        w.block(&p.render(&p.spindle_start, tool.spindle_speed));

        for cut in &sheet.cuts {
            w.comment(&cut_label(cut));
            for m in &cut.moves {
                let rate = match m.kind {
                    MoveKind::Rapid => None,
                    MoveKind::Plunge => Some(tool.plunge_rate),
                    MoveKind::Cut => Some(tool.feed_rate),
                };
                w.motion(m, rate)?;
            }
        }

        w.block(&p.spindle_stop);
        w.block(&p.home_xy);
        w.state.forget_position();
        Ok(())
    }
}

fn cut_label(cut: &PlannedCut) -> String {
    let suffix = match cut.kind {
        CutKind::Profile => "",
        CutKind::Cleanup => " cleanup",
    };
    format!("Part {} #{}{}", cut.part_id, cut.instance + 1, suffix)
}

/// Output buffer with modal state.
struct Writer<'p> {
    profile: &'p GCodeProfile,
    numbered: bool,
    state: EmitState,
    out: String,
    lines: usize,
}

impl<'p> Writer<'p> {
    fn new(profile: &'p GCodeProfile, numbered: bool) -> Self {
        Self {
            profile,
            numbered,
            state: EmitState {
                line_number: 10,
                ..Default::default()
            },
            out: String::new(),
            lines: 0,
        }
    }

    /// Line written verbatim.
    fn raw(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
        self.lines += 1;
    }

    /// Numbered command; empty commands are skipped.
    fn block(&mut self, command: &str) {
        if command.trim().is_empty() {
            return;
        }
        if self.numbered {
            let numbered = format!("N{} {}", self.state.line_number, command);
            self.state.line_number += 10;
            self.raw(&numbered);
        } else {
            self.raw(command);
        }
    }

    fn comment(&mut self, text: &str) {
        if let Some(line) = self.profile.comment(text) {
            self.raw(&line);
        }
    }

    /// Writes one motion. `rate` is `None` for rapids.
    ///
    /// A rapid that climbs, or starts from an unknown height, retracts in Z
    /// before travelling in X and Y.
    fn motion(&mut self, m: &Move, rate: Option<f64>) -> Result<()> {
        let units = self.profile.units;
        let mut texts: [String; 3] = Default::default();
        for (axis, value) in [m.x, m.y, m.z].into_iter().enumerate() {
            if !value.is_finite() {
                return Err(Error::invalid(format!("non-finite {} coordinate {}", AXES[axis], value)));
            }
            texts[axis] = format_number(
                units.from_mm(value),
                self.profile.decimal_places,
                self.profile.leading_zeros,
            );
        }

        let rising = self.state.z.map_or(true, |z| m.z > z);
        if rate.is_none() && rising {
            let words = self.changed_words(&texts, &[2]);
            if !words.is_empty() {
                self.block(&format!("{}{}", self.profile.rapid_move, words));
            }
        }
        self.state.z = Some(m.z);

        let mut words = self.changed_words(&texts, &[0, 1, 2]);
        if words.is_empty() {
            return Ok(());
        }
        let word = match rate {
            None => self.profile.rapid_move.clone(),
            Some(feed) => {
                let text = format_number(
                    units.from_mm(feed),
                    feed_decimals(units == Units::Inches),
                    self.profile.leading_zeros,
                );
                if self.state.feed.as_deref() != Some(text.as_str()) {
                    words.push_str(" F");
                    words.push_str(&text);
                    self.state.feed = Some(text);
                }
                self.profile.feed_move.clone()
            }
        };
        self.block(&format!("{}{}", word, words));
        Ok(())
    }

    /// Axis words among `axes` whose text differs from the modal state.
    fn changed_words(&mut self, texts: &[String; 3], axes: &[usize]) -> String {
        let mut words = String::new();
        for &axis in axes {
            if self.state.axes[axis].as_deref() != Some(texts[axis].as_str()) {
                words.push(' ');
                words.push(AXES[axis]);
                words.push_str(&texts[axis]);
                self.state.axes[axis] = Some(texts[axis].clone());
            }
        }
        words
    }
}

/// Program for one sheet.
///
/// # Errors
///
/// Returns [`Error::ProfileMismatch`] for a malformed profile and
/// [`Error::InvalidInput`] for non-finite motion.
pub fn generate_sheet_code(sheet: &PlannedSheet, profile: &GCodeProfile) -> Result<String> {
    Emitter::new(profile)?.sheet(sheet)
}

/// One standalone program per sheet, in sheet order.
///
/// # Errors
///
/// See [`generate_sheet_code`].
pub fn generate_all_code(sheets: &[PlannedSheet], profile: &GCodeProfile) -> Result<Vec<String>> {
    let emitter = Emitter::new(profile)?;
    sheets.iter().map(|sheet| emitter.sheet(sheet)).collect()
}

/// All sheets in one program with a pause between sheets.
///
/// # Errors
///
/// See [`Emitter::combined`].
pub fn generate_combined_code(sheets: &[PlannedSheet], profile: &GCodeProfile) -> Result<String> {
    Emitter::new(profile)?.combined(sheets)
}
