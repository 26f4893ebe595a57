//! Shape transfer functions
//!
//! A shaper bends the linear ramp of each segment into a curve chosen by
//! the shape parameter. Two strategies exist: cross-faded lookup tables and
//! closed-form power curves split into threshold bands.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::phase::Segment;
use super::table::CurveTables;

/// Which shaper an engine is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaperKind {
    /// Lookup tables cross-faded between curve families
    #[default]
    Table,
    /// Power curves picked by threshold bands
    Formula,
}

impl ShaperKind {
    /// Instantiate the strategy
    pub fn build(self, tables: Arc<CurveTables>) -> Box<dyn Shaper> {
        match self {
            ShaperKind::Table => Box::new(TableShaper::new(tables)),
            ShaperKind::Formula => Box::new(FormulaShaper::new()),
        }
    }
}

/// Trait for shape strategies
pub trait Shaper: Send + Sync {
    /// Strategy identifier
    fn kind(&self) -> ShaperKind;

    /// Unipolar curve value for a segment position, 0 at 0 and 1 at 1
    fn curve(&self, position: f64, shape: f64) -> f64;

    /// Bipolar output: rising segments run -1 to +1, falling ones +1 to -1
    fn apply(&self, position: f64, segment: Segment, shape: f64) -> f64 {
        let value = self.curve(position.clamp(0.0, 1.0), shape.clamp(0.0, 1.0));
        match segment {
            Segment::Rising => value * 2.0 - 1.0,
            Segment::Falling => (1.0 - value) * 2.0 - 1.0,
        }
    }
}

/// Cross-fades between the two curve tables adjacent to the shape value
pub struct TableShaper {
    tables: Arc<CurveTables>,
}

impl TableShaper {
    pub fn new(tables: Arc<CurveTables>) -> Self {
        Self { tables }
    }
}

impl Shaper for TableShaper {
    fn kind(&self) -> ShaperKind {
        ShaperKind::Table
    }

    fn curve(&self, position: f64, shape: f64) -> f64 {
        let last = self.tables.len() - 1;
        let scaled = shape * last as f64;
        let a = (scaled as usize).min(last);
        let b = (a + 1).min(last);
        let mix = scaled - a as f64;

        let from = self.tables.lookup(a, position);
        let to = self.tables.lookup(b, position);
        from + (to - from) * mix
    }
}

/// Below this shape value the curve is linear
const LOW_THRESHOLD: f64 = 0.1;
/// Boundary between the exponential and logarithmic bands
const HIGH_THRESHOLD: f64 = 0.5;
/// Largest extra exponent applied inside a band
const MAX_BEND: f64 = 2.0;

/// Closed-form power curves in three bands
///
/// Linear below 0.1, `x^(1+k)` up to 0.5 and `1 - (1-x)^(1+k)` above. In the
/// exponential band `k` rises and falls back to zero so both band edges meet
/// the neighbouring linear curve. The strongest exponential bend is therefore
/// at shape 0.3, and shapes just under 0.5 are close to linear again.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaShaper;

impl FormulaShaper {
    pub fn new() -> Self {
        Self
    }
}

impl Shaper for FormulaShaper {
    fn kind(&self) -> ShaperKind {
        ShaperKind::Formula
    }

    fn curve(&self, position: f64, shape: f64) -> f64 {
        if shape < LOW_THRESHOLD {
            position
        } else if shape < HIGH_THRESHOLD {
            let t = (shape - LOW_THRESHOLD) / (HIGH_THRESHOLD - LOW_THRESHOLD);
            let bend = MAX_BEND * (1.0 - (2.0 * t - 1.0).abs());
            position.powf(1.0 + bend)
        } else {
            let t = (shape - HIGH_THRESHOLD) / (1.0 - HIGH_THRESHOLD);
            let bend = MAX_BEND * t;
            1.0 - (1.0 - position).powf(1.0 + bend)
        }
    }
}
