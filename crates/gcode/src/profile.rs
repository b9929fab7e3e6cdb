//! Machine profiles.
//!
//! A profile holds the command vocabulary and number formatting of one
//! controller dialect. Built-ins are constructed on demand; callers that
//! customize one work on their own copy.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use u_cutlist_core::{Error, Result};

/// Placeholders a template may reference.
const PLACEHOLDERS: &[&str] = &["{speed}"];

/// Highest supported number of decimal places.
pub const MAX_DECIMALS: usize = 6;

/// Output length unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Units {
    /// Millimetres (G21).
    #[default]
    Millimeters,
    /// Inches (G20); planner millimetres are converted.
    Inches,
}

impl Units {
    /// Unit-selection command.
    pub fn command(&self) -> &'static str {
        match self {
            Units::Millimeters => "G21",
            Units::Inches => "G20",
        }
    }

    /// Converts a millimetre value into this unit.
    pub fn from_mm(&self, value: f64) -> f64 {
        match self {
            Units::Millimeters => value,
            Units::Inches => value / 25.4,
        }
    }
}

/// Command templates and formatting rules of one controller dialect.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GCodeProfile {
    /// Display name.
    pub name: String,
    /// Rapid move word (e.g. `G0`).
    pub rapid_move: String,
    /// Feed move word (e.g. `G1`).
    pub feed_move: String,
    /// Absolute positioning command (e.g. `G90`).
    pub absolute_mode: String,
    /// Feed-rate mode command (e.g. `G94`); empty to omit.
    pub feed_mode: String,
    /// Spindle start; `{speed}` is replaced by the spindle speed.
    pub spindle_start: String,
    /// Spindle stop.
    pub spindle_stop: String,
    /// Home all axes; empty to omit.
    pub home_all: String,
    /// Return to the XY origin; empty to omit.
    pub home_xy: String,
    /// Program pause between sheets; empty to omit.
    pub program_pause: String,
    /// Digits after the decimal point.
    pub decimal_places: usize,
    /// Write `0.5` rather than `.5`.
    pub leading_zeros: bool,
    /// Output unit.
    pub units: Units,
    /// Text opening a comment; empty disables comments.
    pub comment_open: String,
    /// Text closing a comment.
    pub comment_close: String,
    /// Lines written before anything else.
    pub start_lines: Vec<String>,
    /// Lines written after everything else.
    pub end_lines: Vec<String>,
}

impl Default for GCodeProfile {
    fn default() -> Self {
        Self::generic()
    }
}

impl GCodeProfile {
    /// Plain RS-274 dialect.
    pub fn generic() -> Self {
        Self {
            name: "Generic".into(),
            rapid_move: "G0".into(),
            feed_move: "G1".into(),
            absolute_mode: "G90".into(),
            feed_mode: "G94".into(),
            spindle_start: "M3 S{speed}".into(),
            spindle_stop: "M5".into(),
            home_all: "G28".into(),
            home_xy: "G0 X0 Y0".into(),
            program_pause: "M0".into(),
            decimal_places: 3,
            leading_zeros: true,
            units: Units::Millimeters,
            comment_open: "(".into(),
            comment_close: ")".into(),
            start_lines: Vec::new(),
            end_lines: vec!["M30".into()],
        }
    }

    /// GRBL hobby controllers.
    pub fn grbl() -> Self {
        Self {
            name: "GRBL".into(),
            home_all: "$H".into(),
            program_pause: "M0".into(),
            end_lines: vec!["M2".into()],
            ..Self::generic()
        }
    }

    /// Mach3.
    pub fn mach3() -> Self {
        Self {
            name: "Mach3".into(),
            decimal_places: 4,
            leading_zeros: false,
            home_all: "G28.1 Z0".into(),
            program_pause: "M1".into(),
            start_lines: vec!["%".into()],
            end_lines: vec!["M30".into(), "%".into()],
            ..Self::generic()
        }
    }

    /// LinuxCNC.
    pub fn linuxcnc() -> Self {
        Self {
            name: "LinuxCNC".into(),
            decimal_places: 4,
            home_all: "G28".into(),
            home_xy: "G53 G0 X0 Y0".into(),
            start_lines: vec!["%".into(), "G17 G40 G49 G80".into()],
            end_lines: vec!["M2".into(), "%".into()],
            ..Self::generic()
        }
    }

    /// Sets the number of decimal places.
    pub fn with_decimal_places(mut self, decimals: usize) -> Self {
        self.decimal_places = decimals;
        self
    }

    /// Sets the output unit.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Sets the feed move word.
    pub fn with_feed_move(mut self, word: impl Into<String>) -> Self {
        self.feed_move = word.into();
        self
    }

    /// Sets the leading-zero rule.
    pub fn with_leading_zeros(mut self, leading_zeros: bool) -> Self {
        self.leading_zeros = leading_zeros;
        self
    }

    /// Rejects empty or malformed templates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileMismatch`] naming the offending template.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("rapid move", &self.rapid_move),
            ("feed move", &self.feed_move),
            ("absolute mode", &self.absolute_mode),
            ("spindle start", &self.spindle_start),
            ("spindle stop", &self.spindle_stop),
        ];
        for (name, template) in required {
            if template.trim().is_empty() {
                return Err(Error::profile(format!("{} template of '{}' is empty", name, self.name)));
            }
        }
        let optional = [
            ("feed mode", &self.feed_mode),
            ("home all", &self.home_all),
            ("home XY", &self.home_xy),
            ("program pause", &self.program_pause),
        ];
        for (name, template) in required.iter().chain(optional.iter()) {
            check_placeholders(name, template)?;
        }
        for word in [&self.rapid_move, &self.feed_move] {
            if word.contains('{') || word.contains('\n') {
                return Err(Error::profile(format!("move word '{}' must be a plain command", word)));
            }
        }
        if self.decimal_places > MAX_DECIMALS {
            return Err(Error::profile(format!(
                "{} decimal places exceed the supported {}",
                self.decimal_places, MAX_DECIMALS
            )));
        }
        if !self.comment_open.is_empty() && self.comment_open == self.comment_close && self.comment_open.len() > 1 {
            return Err(Error::profile("comment delimiters are ambiguous"));
        }
        Ok(())
    }

    /// Renders a template, substituting `{speed}`.
    pub fn render(&self, template: &str, spindle_speed: f64) -> String {
        template.replace("{speed}", &format!("{:.0}", spindle_speed))
    }

    /// Wraps `text` in the comment delimiters; `None` when comments are off.
    pub fn comment(&self, text: &str) -> Option<String> {
        if self.comment_open.is_empty() {
            return None;
        }
        let mut clean: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        for delimiter in [&self.comment_open, &self.comment_close] {
            if !delimiter.trim().is_empty() {
                clean = clean.replace(delimiter.trim(), "");
            }
        }
        Some(format!("{}{}{}", self.comment_open, clean, self.comment_close))
    }
}

fn check_placeholders(name: &str, template: &str) -> Result<()> {
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            return Err(Error::profile(format!("{} template has an unclosed '{{'", name)));
        };
        let placeholder = &rest[open..open + len + 1];
        if !PLACEHOLDERS.contains(&placeholder) {
            return Err(Error::profile(format!(
                "{} template uses unknown placeholder {}",
                name, placeholder
            )));
        }
        rest = &rest[open + len + 1..];
    }
    if rest.contains('}') {
        return Err(Error::profile(format!("{} template has a stray '}}'", name)));
    }
    Ok(())
}

/// Names of the built-in profiles.
pub fn builtin_names() -> &'static [&'static str] {
    &["Generic", "GRBL", "Mach3", "LinuxCNC"]
}

/// Built-in profile by case-insensitive name.
pub fn builtin(name: &str) -> Option<GCodeProfile> {
    match name.to_ascii_lowercase().as_str() {
        "generic" => Some(GCodeProfile::generic()),
        "grbl" => Some(GCodeProfile::grbl()),
        "mach3" => Some(GCodeProfile::mach3()),
        "linuxcnc" => Some(GCodeProfile::linuxcnc()),
        _ => None,
    }
}

/// Built-in profile by name.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an unknown name.
pub fn resolve(name: &str) -> Result<GCodeProfile> {
    builtin(name).ok_or_else(|| {
        Error::invalid(format!(
            "unknown machine profile '{}' (built-ins: {})",
            name,
            builtin_names().join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_valid() {
        for name in builtin_names() {
            let profile = builtin(name).expect("builtin");
            assert_eq!(profile.name, *name);
            assert!(profile.validate().is_ok(), "{} invalid", name);
        }
        assert!(builtin("grbl").is_some());
        assert!(builtin("Fanuc").is_none());
        assert!(resolve("Fanuc").unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_empty_template_rejected() {
        let mut profile = GCodeProfile::generic();
        profile.feed_move = "  ".into();
        let err = profile.validate().unwrap_err();
        assert!(matches!(err, Error::ProfileMismatch(_)));
        assert!(err.to_string().contains("feed move"));
    }

    #[test]
    fn test_malformed_placeholders_rejected() {
        let mut profile = GCodeProfile::generic();
        profile.spindle_start = "M3 S{rpm}".into();
        assert!(profile.validate().is_err());
        profile.spindle_start = "M3 S{speed".into();
        assert!(profile.validate().is_err());
        profile.spindle_start = "M3 S}".into();
        assert!(profile.validate().is_err());
        profile.spindle_start = "M3 S{speed}".into();
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_too_many_decimals_rejected() {
        let profile = GCodeProfile::generic().with_decimal_places(9);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_render_and_comment() {
        let profile = GCodeProfile::grbl();
        assert_eq!(profile.render(&profile.spindle_start, 18000.0), "M3 S18000");
        assert_eq!(profile.comment("part (A)").as_deref(), Some("(part A)"));

        let mut silent = GCodeProfile::generic();
        silent.comment_open.clear();
        assert!(silent.comment("x").is_none());
    }

    #[test]
    fn test_inch_conversion() {
        assert!((Units::Inches.from_mm(25.4) - 1.0).abs() < 1e-12);
        assert_eq!(Units::Millimeters.command(), "G21");
        assert_eq!(Units::Inches.command(), "G20");
    }
}
