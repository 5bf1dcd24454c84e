//! Bar and tick event types for the two price streams

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed bar from the coarse (primary) series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// Bar closed below its open (bearish reversal candle)
    pub fn is_down(&self) -> bool {
        self.close < self.open
    }

    /// Bar closed above its open (bullish reversal candle)
    pub fn is_up(&self) -> bool {
        self.close > self.open
    }
}

/// A price event from the fine (secondary) series
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}
