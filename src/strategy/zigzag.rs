//! Non-repainting ZigZag pivot detection
//!
//! Unlike lookback-window swing indicators, a pivot here is confirmed only
//! once price has reversed by the full deviation threshold, and its price
//! and bar index never change afterwards.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bars::Bar;

/// Direction of the leg currently being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Unknown,
    Up,
    Down,
}

/// Which side of price a confirmed pivot sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

impl std::fmt::Display for PivotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// A confirmed swing point. Immutable once emitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pivot {
    pub kind: PivotKind,
    pub price: f64,
    /// Bar where the extremum printed
    pub detected_bar: usize,
    /// Bar where the reversal threshold was met
    pub confirmed_bar: usize,
}

/// Trend state machine that confirms swing highs/lows by absolute deviation
#[derive(Debug)]
pub struct ZigZagTracker {
    deviation: f64,
    trend: TrendDirection,
    extremum: f64,
    extremum_bar: usize,
}

impl ZigZagTracker {
    pub fn new(deviation: f64) -> Self {
        Self {
            deviation,
            trend: TrendDirection::Unknown,
            extremum: 0.0,
            extremum_bar: 0,
        }
    }

    pub fn trend(&self) -> TrendDirection {
        self.trend
    }

    /// Restore the tracker to its pre-run state
    pub fn reset(&mut self) {
        self.trend = TrendDirection::Unknown;
        self.extremum = 0.0;
        self.extremum_bar = 0;
    }

    /// Process a closed bar from the primary series.
    /// Returns the pivot confirmed by this bar, if any.
    pub fn process_bar(&mut self, bar_index: usize, bar: &Bar) -> Option<Pivot> {
        // Seed the initial trend from the first usable bar's candle direction,
        // then fall through so this bar also extends the fresh extremum.
        if self.trend == TrendDirection::Unknown {
            if bar_index < 2 {
                return None;
            }
            self.trend = if bar.is_up() {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            };
            self.extremum = match self.trend {
                TrendDirection::Up => bar.low,
                _ => bar.high,
            };
            self.extremum_bar = bar_index;
            debug!(
                "Trend seeded {:?} at bar {} (extremum {:.2})",
                self.trend, bar_index, self.extremum
            );
        }

        match self.trend {
            TrendDirection::Up => {
                if bar.high > self.extremum {
                    self.extremum = bar.high;
                    self.extremum_bar = bar_index;
                } else if self.extremum - bar.low >= self.deviation {
                    let pivot = Pivot {
                        kind: PivotKind::High,
                        price: self.extremum,
                        detected_bar: self.extremum_bar,
                        confirmed_bar: bar_index,
                    };
                    info!(
                        "HIGH confirmed at bar {}: {:.2} (peak bar {})",
                        bar_index, pivot.price, pivot.detected_bar
                    );
                    self.trend = TrendDirection::Down;
                    self.extremum = bar.low;
                    self.extremum_bar = bar_index;
                    return Some(pivot);
                }
            }
            TrendDirection::Down => {
                if bar.low < self.extremum {
                    self.extremum = bar.low;
                    self.extremum_bar = bar_index;
                } else if bar.high - self.extremum >= self.deviation {
                    let pivot = Pivot {
                        kind: PivotKind::Low,
                        price: self.extremum,
                        detected_bar: self.extremum_bar,
                        confirmed_bar: bar_index,
                    };
                    info!(
                        "LOW confirmed at bar {}: {:.2} (trough bar {})",
                        bar_index, pivot.price, pivot.detected_bar
                    );
                    self.trend = TrendDirection::Up;
                    self.extremum = bar.high;
                    self.extremum_bar = bar_index;
                    return Some(pivot);
                }
            }
            TrendDirection::Unknown => unreachable!("trend seeded above"),
        }

        None
    }
}
