use crate::error::DeckError;
use crate::prompt::{FIRST_SLIDE, LAST_SLIDE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One schedulable batch: a contiguous slide range generated by a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub range_start: u32,
    pub range_end: u32,
    pub label: String,
    /// 1-based run counter
    pub attempt: u32,
}

impl Unit {
    pub fn new(range_start: u32, range_end: u32, label: impl Into<String>) -> Result<Self, DeckError> {
        if range_start < 1 {
            return Err(DeckError::InvalidUnit(format!(
                "range start must be at least 1, got {}",
                range_start
            )));
        }
        if range_start > range_end {
            return Err(DeckError::InvalidUnit(format!(
                "range start {} is after range end {}",
                range_start, range_end
            )));
        }
        Ok(Self {
            range_start,
            range_end,
            label: label.into(),
            attempt: 1,
        })
    }

    /// Same range and label, attempt incremented.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    pub fn expected_count(&self) -> usize {
        (self.range_end - self.range_start + 1) as usize
    }

    pub fn slide_indices(&self) -> impl Iterator<Item = u32> {
        self.range_start..=self.range_end
    }

    pub fn range_label(&self) -> String {
        format!("{}-{}", self.range_start, self.range_end)
    }

    /// Fallback identifier for dumps about this unit, e.g. `batch1-3_call`.
    pub fn dump_identifier(&self, suffix: &str) -> String {
        format!("batch{}-{}_{}", self.range_start, self.range_end, suffix)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "slides {}-{}", self.range_start, self.range_end)
        } else {
            write!(f, "{} (slides {}-{})", self.label, self.range_start, self.range_end)
        }
    }
}

const DEFAULT_BATCHES: [(u32, u32, &str); 7] = [
    (1, 3, "cover + motivation + need"),
    (4, 5, "TAM/SAM/SOM + market analysis"),
    (6, 8, "solution + core value + development plan"),
    (9, 10, "customer validation + competitors"),
    (11, 14, "business model + revenue + market strategy + performance"),
    (15, 16, "roadmap + funding"),
    (17, 18, "team + vision"),
];

/// The seven batches covering the full eighteen-slide deck.
pub fn default_plan() -> Vec<Unit> {
    DEFAULT_BATCHES
        .iter()
        .map(|(start, end, label)| Unit {
            range_start: *start,
            range_end: *end,
            label: label.to_string(),
            attempt: 1,
        })
        .collect()
}

/// Parse `START-END` or `START-END:LABEL`. A single index `N` means `N-N`.
pub fn parse_batch(text: &str) -> Result<Unit, DeckError> {
    let text = text.trim();
    let (range, label) = match text.split_once(':') {
        Some((range, label)) => (range.trim(), label.trim()),
        None => (text, ""),
    };

    let parse_index = |s: &str| {
        s.trim().parse::<u32>().map_err(|_| {
            DeckError::InvalidUnit(format!("'{}' is not a slide index in batch '{}'", s, text))
        })
    };

    let (start, end) = match range.split_once('-') {
        Some((start, end)) => (parse_index(start)?, parse_index(end)?),
        None => {
            let index = parse_index(range)?;
            (index, index)
        }
    };

    Unit::new(start, end, label)
}

/// A plan must be non-empty, stay inside the slide catalog and never cover a slide twice.
pub fn validate_plan(units: &[Unit]) -> Result<(), DeckError> {
    if units.is_empty() {
        return Err(DeckError::InvalidUnit(
            "Plan must contain at least one batch".to_string(),
        ));
    }

    for unit in units {
        if unit.range_start < FIRST_SLIDE || unit.range_end > LAST_SLIDE {
            return Err(DeckError::InvalidUnit(format!(
                "{} is outside slides {}-{}",
                unit, FIRST_SLIDE, LAST_SLIDE
            )));
        }
    }

    let mut sorted: Vec<&Unit> = units.iter().collect();
    sorted.sort_by_key(|unit| unit.range_start);
    for pair in sorted.windows(2) {
        if pair[1].range_start <= pair[0].range_end {
            return Err(DeckError::InvalidUnit(format!(
                "{} overlaps {}",
                pair[1], pair[0]
            )));
        }
    }

    Ok(())
}
