// crates/core/src/modifiers.rs
//! Scenario families and name-modifier parsing.
//!
//! Scenario variants are usually published as a base name plus a suffix,
//! e.g. `Gridshot` → `Gridshot 120s`, `Gridshot Smooth 120`,
//! `Gridshot 50% Small`. The suffix is tokenized and paired into
//! `axis → value` modifiers so a caller can line up variants that differ
//! along exactly one axis.
//!
//! Parsing is all-or-nothing: if any token is left unexplained, the variant
//! gets no modifiers at all.

use crate::types::Run;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// Axis name used for bare percentage tokens.
pub const PERCENT_AXIS: &str = "Percent";

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d.]*%?[a-zA-Z]*|[A-Za-z]+").expect("static token pattern"))
}

/// Axis implied by a unit suffix.
fn unit_axis(unit: &str) -> Option<&'static str> {
    match unit {
        "s" | "sec" => Some("Duration"),
        "m" => Some("Distance"),
        "hp" => Some("Health"),
        _ => None,
    }
}

/// How a modifier appeared in the scenario name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// `Smooth 120`
    WordValue,
    /// `120 Smooth`
    ValueWord,
    /// `120s`, `50%`
    Standalone,
}

/// One parsed modifier: the raw token and how it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub raw: String,
    pub kind: ModifierKind,
}

impl Modifier {
    fn new(raw: &str, kind: ModifierKind) -> Self {
        Self {
            raw: raw.to_string(),
            kind,
        }
    }
}

/// Axis name → modifier.
pub type Modifiers = BTreeMap<String, Modifier>;

/// A numeric-like token split into its number (with optional `%`) and unit.
struct NumericParts<'a> {
    has_percent: bool,
    unit: &'a str,
}

fn numeric_parts(token: &str) -> Option<NumericParts<'_>> {
    let digits_end = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    if digits_end == 0 {
        return None;
    }
    let rest = &token[digits_end..];
    let (has_percent, unit) = match rest.strip_prefix('%') {
        Some(unit) => (true, unit),
        None => (false, rest),
    };
    Some(NumericParts { has_percent, unit })
}

/// A bare number or percentage, or a number with a known unit.
fn is_value(token: &str) -> bool {
    match numeric_parts(token) {
        Some(parts) if parts.unit.is_empty() => true,
        Some(parts) => unit_axis(parts.unit).is_some(),
        None => false,
    }
}

/// Parse the modifiers in `scenario` relative to `base`.
///
/// Returns an empty map when `scenario` is the base itself, does not start
/// with it, or leaves any token unexplained.
pub fn parse_modifiers(base: &str, scenario: &str) -> Modifiers {
    let Some(residual) = scenario.strip_prefix(base) else {
        return Modifiers::new();
    };
    let residual = residual.trim();
    if residual.is_empty() {
        return Modifiers::new();
    }

    let tokens: Vec<&str> = token_regex().find_iter(residual).map(|m| m.as_str()).collect();
    let values: Vec<bool> = tokens.iter().map(|t| is_value(t)).collect();
    let mut consumed = vec![false; tokens.len()];
    let mut modifiers = Modifiers::new();

    // Adjacent word/value pairs, left to right
    let mut i = 0;
    while i + 1 < tokens.len() {
        if !consumed[i] && !consumed[i + 1] {
            let pair = match (values[i], values[i + 1]) {
                (false, true) => Some((tokens[i], tokens[i + 1], ModifierKind::WordValue)),
                (true, false) => Some((tokens[i + 1], tokens[i], ModifierKind::ValueWord)),
                _ => None,
            };
            if let Some((axis, raw, kind)) = pair {
                modifiers.insert(axis.to_string(), Modifier::new(raw, kind));
                consumed[i] = true;
                consumed[i + 1] = true;
                i += 2;
                continue;
            }
        }
        i += 1;
    }

    // Leftover unit or percent tokens stand on their own
    for (idx, token) in tokens.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        let Some(parts) = numeric_parts(token) else {
            continue;
        };
        if !parts.unit.is_empty() {
            if let Some(axis) = unit_axis(parts.unit) {
                modifiers.insert(axis.to_string(), Modifier::new(token, ModifierKind::Standalone));
                consumed[idx] = true;
            }
        } else if parts.has_percent {
            modifiers.insert(
                PERCENT_AXIS.to_string(),
                Modifier::new(token, ModifierKind::Standalone),
            );
            consumed[idx] = true;
        }
    }

    if consumed.iter().all(|&c| c) {
        modifiers
    } else {
        Modifiers::new()
    }
}

/// A run of the family together with its parsed modifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyMember {
    pub run: Run,
    pub modifiers: Modifiers,
}

/// All runs whose scenario name starts with `base`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioFamily {
    pub base: String,
    pub members: Vec<FamilyMember>,
}

/// Collect the family of `base` from `history`, parsing each distinct
/// scenario name once.
pub fn scenario_family(history: &[Run], base: &str) -> ScenarioFamily {
    let mut memo: HashMap<&str, Modifiers> = HashMap::new();
    let members = history
        .iter()
        .filter(|run| run.scenario.starts_with(base))
        .map(|run| {
            let modifiers = memo
                .entry(run.scenario.as_str())
                .or_insert_with(|| parse_modifiers(base, &run.scenario))
                .clone();
            FamilyMember {
                run: run.clone(),
                modifiers,
            }
        })
        .collect();

    ScenarioFamily {
        base: base.to_string(),
        members,
    }
}

impl ScenarioFamily {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Axis names present anywhere in the family, sorted.
    pub fn axes(&self) -> Vec<String> {
        self.members
            .iter()
            .flat_map(|m| m.modifiers.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// How `axis` was written across the family.
    pub fn kinds_for_axis(&self, axis: &str) -> BTreeSet<ModifierKind> {
        self.members
            .iter()
            .filter_map(|m| m.modifiers.get(axis).map(|modifier| modifier.kind))
            .collect()
    }

    /// Base runs plus runs whose only modifier is `axis`.
    ///
    /// With `kinds`, variants written in other forms are left out. Variants
    /// whose parse was rejected are never included.
    pub fn along_axis(&self, axis: &str, kinds: Option<&BTreeSet<ModifierKind>>) -> Vec<&FamilyMember> {
        self.members
            .iter()
            .filter(|m| {
                if m.run.scenario == self.base {
                    return true;
                }
                match m.modifiers.get(axis) {
                    Some(modifier) if m.modifiers.len() == 1 => {
                        kinds.map_or(true, |allowed| allowed.contains(&modifier.kind))
                    }
                    _ => false,
                }
            })
            .collect()
    }
}
