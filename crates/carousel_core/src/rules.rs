//! Canvas selection rules.
//!
//! One rule per line, `condition => action`:
//!
//! ```text
//! 1 => 1
//! 2 => 2
//! 3-10 => random(2-last-1)
//! 11+ => last
//! ```
//!
//! Conditions test the canvas count (`N`, `A-B`, `N+`); actions pick a
//! 1-based canvas (`K`, `last`, `random`, `random(A-B)`, `random(A-last[-O])`).
//! Rules are tried top to bottom and the first one that yields a canvas wins.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use carousel_logging::carousel_debug;

pub const DEFAULT_RULES: &str = "1 => 1\n2 => 2\n3+ => random(2-last-1)";

const SEPARATOR: &str = "=>";

// ASCII hyphen plus the dash variants people paste from word processors.
const DASH: &str = r"[-\x{2010}\x{2011}\x{2012}\x{2013}\x{2014}\x{2212}\x{FF0D}]";

static AT_LEAST: Lazy<Regex> = Lazy::new(|| compile(r"^(\d+)\s*\+$"));
static RANGE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^(\d+)\s*{DASH}\s*(\d+)$")));
static NUMBER: Lazy<Regex> = Lazy::new(|| compile(r"^(\d+)$"));
static RANDOM_RANGE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(?i)^random\s*\(\s*(\d+)\s*{DASH}\s*(\d+)\s*\)$"
    ))
});
static RANDOM_TO_LAST: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(?i)^random\s*\(\s*(\d+)\s*{DASH}\s*last(?:\s*{DASH}\s*(\d+))?\s*\)$"
    ))
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("selection rule pattern is valid")
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("missing `=>` separator")]
    MissingSeparator,
    #[error("unrecognized condition `{0}`")]
    Condition(String),
    #[error("unrecognized action `{0}`")]
    Action(String),
}

/// Which canvas counts a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Exact(usize),
    /// Inclusive on both ends.
    Range { min: usize, max: usize },
    AtLeast(usize),
}

impl Condition {
    pub fn matches(&self, count: usize) -> bool {
        match *self {
            Condition::Exact(n) => count == n,
            Condition::Range { min, max } => min <= count && count <= max,
            Condition::AtLeast(n) => count >= n,
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = RuleParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let invalid = || RuleParseError::Condition(text.to_string());
        if let Some(caps) = AT_LEAST.captures(text) {
            return Ok(Condition::AtLeast(number(&caps[1]).ok_or_else(invalid)?));
        }
        if let Some(caps) = RANGE.captures(text) {
            return Ok(Condition::Range {
                min: number(&caps[1]).ok_or_else(invalid)?,
                max: number(&caps[2]).ok_or_else(invalid)?,
            });
        }
        if NUMBER.is_match(text) {
            return Ok(Condition::Exact(number(text).ok_or_else(invalid)?));
        }
        Err(invalid())
    }
}

/// How a canvas is picked once a condition matched. Positions are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Last,
    Random,
    RandomRange { start: usize, end: usize },
    /// `random(start-last-offset)`
    RandomToLast { start: usize, offset: usize },
    Index(usize),
}

impl Action {
    /// Zero-based index for `count` canvases, or `None` when the action cannot
    /// be satisfied for that count.
    pub fn pick<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Option<usize> {
        if count == 0 {
            return None;
        }
        match *self {
            Action::Last => Some(count - 1),
            Action::Random => Some(rng.random_range(0..count)),
            Action::RandomRange { start, end } => {
                pick_between(start.max(1), end.min(count), rng)
            }
            Action::RandomToLast { start, offset } => {
                pick_between(start.max(1), count.checked_sub(offset)?, rng)
            }
            Action::Index(k) => (1..=count).contains(&k).then(|| k - 1),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = RuleParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let invalid = || RuleParseError::Action(text.to_string());
        if text.eq_ignore_ascii_case("last") {
            return Ok(Action::Last);
        }
        if text.eq_ignore_ascii_case("random") {
            return Ok(Action::Random);
        }
        if let Some(caps) = RANDOM_RANGE.captures(text) {
            return Ok(Action::RandomRange {
                start: number(&caps[1]).ok_or_else(invalid)?,
                end: number(&caps[2]).ok_or_else(invalid)?,
            });
        }
        if let Some(caps) = RANDOM_TO_LAST.captures(text) {
            let offset = match caps.get(2) {
                Some(m) => number(m.as_str()).ok_or_else(invalid)?,
                None => 0,
            };
            return Ok(Action::RandomToLast {
                start: number(&caps[1]).ok_or_else(invalid)?,
                offset,
            });
        }
        if NUMBER.is_match(text) {
            return Ok(Action::Index(number(text).ok_or_else(invalid)?));
        }
        Err(invalid())
    }
}

/// Uniform pick over the 1-based inclusive range, returned 0-based.
fn pick_between<R: Rng + ?Sized>(start: usize, end: usize, rng: &mut R) -> Option<usize> {
    (start <= end).then(|| rng.random_range(start - 1..end))
}

fn number(digits: &str) -> Option<usize> {
    digits.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRule {
    pub condition: Condition,
    pub action: Action,
}

impl SelectionRule {
    /// Parses a single `condition => action` line. Only the first separator splits.
    pub fn parse_line(line: &str) -> Result<Self, RuleParseError> {
        let (condition, action) = line
            .split_once(SEPARATOR)
            .ok_or(RuleParseError::MissingSeparator)?;
        Ok(Self {
            condition: condition.parse()?,
            action: action.parse()?,
        })
    }
}

/// Parsed selection rules in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<SelectionRule>,
}

impl RuleSet {
    /// Parses rule text. Malformed lines are dropped; the rest still apply.
    pub fn parse(text: &str) -> Self {
        let rules = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match SelectionRule::parse_line(line) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    carousel_debug!("Dropping selection rule {:?}: {}", line, err);
                    None
                }
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[SelectionRule] {
        &self.rules
    }

    /// Zero-based canvas index for `canvas_count` canvases.
    ///
    /// Returns `None` only when there are no canvases; when no rule yields an
    /// index, any canvas is picked uniformly.
    pub fn select<R: Rng + ?Sized>(&self, canvas_count: usize, rng: &mut R) -> Option<usize> {
        if canvas_count == 0 {
            return None;
        }
        self.rules
            .iter()
            .filter(|rule| rule.condition.matches(canvas_count))
            .find_map(|rule| rule.action.pick(canvas_count, rng))
            .or_else(|| Some(rng.random_range(0..canvas_count)))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::parse(DEFAULT_RULES)
    }
}
