//! ZigZag proximity-zone strategy
//!
//! Pivot detection, zone bookkeeping, entry confirmation, risk
//! management, and the facade that wires them to order execution.

mod bars;
mod config;
mod engine;
mod entry;
mod risk;
mod zigzag;
mod zones;

pub use bars::{Bar, Tick};
pub use config::{EntryMode, EntryProtocol, StrategyConfig};
pub use engine::{RunStats, RunSummary, ZigZagStrategy};
pub use entry::{Direction, EntryEngine, EntrySignal, LimitTarget};
pub use risk::{CalendarRoll, PositionRiskManager, RiskAccumulators};
pub use zigzag::{Pivot, PivotKind, TrendDirection, ZigZagTracker};
pub use zones::{InvalidatedPivot, PivotLevel, ZoneBook};
