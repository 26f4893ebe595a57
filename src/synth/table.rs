//! Curve lookup tables
//!
//! Each curve maps a segment position in [0, 1] onto [0, 1], starting at 0
//! and ending at 1. Tables are built once and only read afterwards, so one
//! set can back any number of engines.

use std::f64::consts::PI;

use crate::error::EngineError;

/// Entries per curve table
pub const TABLE_SIZE: usize = 1024;

/// Steepness of the exponential and logarithmic curves
const CURVE_FACTOR: f64 = 4.0;

/// Curve families, in shape-parameter order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    Exponential,
    Logarithmic,
    Sine,
    Arcsine,
}

impl Curve {
    pub const ALL: [Curve; 5] = [
        Curve::Linear,
        Curve::Exponential,
        Curve::Logarithmic,
        Curve::Sine,
        Curve::Arcsine,
    ];

    /// Evaluate the curve directly
    pub fn eval(self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match self {
            Curve::Linear => x,
            // (exp(k*x) - 1) / (exp(k) - 1): slow start, fast finish
            Curve::Exponential => ((CURVE_FACTOR * x).exp() - 1.0) / (CURVE_FACTOR.exp() - 1.0),
            // Mirror image of the exponential curve
            Curve::Logarithmic => {
                1.0 - ((CURVE_FACTOR * (1.0 - x)).exp() - 1.0) / (CURVE_FACTOR.exp() - 1.0)
            }
            Curve::Sine => 0.5 - 0.5 * (PI * x).cos(),
            Curve::Arcsine => 0.5 + (2.0 * x - 1.0).asin() / PI,
        }
    }
}

/// Precomputed tables for every curve family
#[derive(Debug, Clone)]
pub struct CurveTables {
    tables: Vec<Vec<f64>>,
}

impl CurveTables {
    /// Build all tables, reporting allocation failure instead of aborting
    pub fn build() -> Result<Self, EngineError> {
        let mut tables = Vec::new();
        tables
            .try_reserve_exact(Curve::ALL.len())
            .map_err(|_| EngineError::TableAllocation {
                entries: Curve::ALL.len(),
            })?;

        for curve in Curve::ALL {
            let mut table = Vec::new();
            table
                .try_reserve_exact(TABLE_SIZE)
                .map_err(|_| EngineError::TableAllocation {
                    entries: TABLE_SIZE,
                })?;
            let last = (TABLE_SIZE - 1) as f64;
            table.extend((0..TABLE_SIZE).map(|i| curve.eval(i as f64 / last)));
            tables.push(table);
        }

        Ok(Self { tables })
    }

    /// Number of curve families
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Raw table data for one curve
    pub fn table(&self, curve: Curve) -> &[f64] {
        &self.tables[curve as usize]
    }

    /// Linearly interpolated lookup of table `index` at `position` in [0, 1]
    pub fn lookup(&self, index: usize, position: f64) -> f64 {
        let table = &self.tables[index.min(self.tables.len() - 1)];
        let last = table.len() - 1;

        let scaled = position.clamp(0.0, 1.0) * last as f64;
        let i = scaled as usize;
        if i >= last {
            return table[last];
        }
        let frac = scaled - i as f64;

        table[i] + (table[i + 1] - table[i]) * frac
    }
}
