//! Enumerations and field types for countdown tasks.
//!
//! This module defines the repeat rule that drives recurrence, and the colour
//! palette offered when creating tasks.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How often a task recurs once its due instant has passed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatRule {
    #[default]
    #[serde(alias = "Off")]
    Off,
    #[serde(alias = "Daily")]
    Daily,
    #[serde(alias = "Weekly")]
    Weekly,
    #[serde(alias = "Monthly")]
    Monthly,
    #[serde(alias = "Yearly")]
    Yearly,
}

impl RepeatRule {
    /// Whether tasks with this rule roll over to a next occurrence.
    pub fn is_recurring(self) -> bool {
        self != RepeatRule::Off
    }

    /// Display name of the rule, empty for `Off`.
    pub fn display(self) -> &'static str {
        match self {
            RepeatRule::Off => "",
            RepeatRule::Daily => "Daily",
            RepeatRule::Weekly => "Weekly",
            RepeatRule::Monthly => "Monthly",
            RepeatRule::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatRule::Off => f.write_str("Off"),
            other => f.write_str(other.display()),
        }
    }
}

/// Colour assigned to new tasks when none is chosen.
pub const DEFAULT_COLOR: &str = "#f44336";

/// Colour shown for stored tasks that carry no colour at all.
pub const FALLBACK_COLOR: &str = "#f9f9f9";

/// Palette offered by the `add` and `edit` commands.
pub const COLOR_OPTIONS: [&str; 18] = [
    "#f44336", "#ff9800", "#ffeb3b", "#483D8B", "#009688", "#9c27b0",
    "#3CB371", "#000000", "#FF10F0", "#4169E1", "#556B2F", "#f1c40f",
    "#DC143C", "#ff69b4", "#34495e", "#B8860B", "#4682B4", "#d35400",
];

/// Normalise a colour argument: palette index (`1`..=`18`) or `#rrggbb`.
pub fn parse_color(s: &str) -> Option<String> {
    let s = s.trim();
    if let Ok(idx) = s.parse::<usize>() {
        return COLOR_OPTIONS.get(idx.checked_sub(1)?).map(|c| c.to_string());
    }
    let hex = s.strip_prefix('#')?;
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", hex))
    } else {
        None
    }
}

/// Split a `#rrggbb` colour into its components.
pub fn color_rgb(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some((r, g, b))
}
