//! Slope generation core
//!
//! Contains the phase accumulator, shape tables and shapers, and the
//! smoothness stage (swept low-pass or wavefolder).

mod filter;
mod phase;
mod shape;
mod smoothness;
mod table;

pub use filter::LowPass;
pub use phase::{GateFlags, PhaseAccumulator, Ramp, RunMode, Segment, Stage};
pub use shape::{FormulaShaper, Shaper, ShaperKind, TableShaper};
pub use smoothness::{fold, SmoothingSettings, SmoothnessStage, MIDPOINT};
pub use table::{Curve, CurveTables, TABLE_SIZE};
