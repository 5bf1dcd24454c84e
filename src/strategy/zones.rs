//! Proximity-zone bookkeeping for confirmed pivots
//!
//! Each live pivot owns an asymmetric zone: the "below" distance sits on
//! the approach side (where price returns from), the "above" distance on
//! the far side (beyond the pivot). A pivot is tradable only after its
//! activation bar and only once price has left the zone on the approach
//! side at least once. Piercing the far side invalidates it, except on
//! the very bar the left-zone flag was set: a single wide bar may straddle
//! both bounds and still reverse into a valid entry.

use std::collections::HashSet;

use tracing::{debug, info};

use super::bars::Bar;
use super::zigzag::{Pivot, PivotKind};

/// A live pivot with zone and support/resistance line state
#[derive(Debug, Clone)]
pub struct PivotLevel {
    pub pivot: Pivot,
    /// First bar on which the zone may be evaluated
    pub activation_bar: usize,
    /// Price has exited the zone on the approach side at least once
    pub has_left_zone: bool,
    /// Bar on which `has_left_zone` flipped (guards same-bar invalidation)
    pub left_zone_bar: Option<usize>,
    /// The horizontal S/R line at the pivot price is unbroken
    pub line_active: bool,
    pub line_start_bar: usize,
    pub line_end_bar: usize,
}

impl PivotLevel {
    fn new(pivot: Pivot) -> Self {
        Self {
            pivot,
            activation_bar: pivot.confirmed_bar + 1,
            has_left_zone: false,
            left_zone_bar: None,
            line_active: true,
            line_start_bar: pivot.confirmed_bar,
            line_end_bar: pivot.confirmed_bar,
        }
    }

    /// Upper zone bound. For a high pivot the far side is above the
    /// pivot; for a low pivot the approach side is above it.
    pub fn zone_top(&self, above: f64, below: f64) -> f64 {
        match self.pivot.kind {
            PivotKind::High => self.pivot.price + above,
            PivotKind::Low => self.pivot.price + below,
        }
    }

    /// Lower zone bound, mirror of `zone_top`.
    pub fn zone_bottom(&self, above: f64, below: f64) -> f64 {
        match self.pivot.kind {
            PivotKind::High => self.pivot.price - below,
            PivotKind::Low => self.pivot.price - above,
        }
    }
}

/// A pivot invalidated this bar (price passed through without reversing)
#[derive(Debug, Clone, Copy)]
pub struct InvalidatedPivot {
    pub kind: PivotKind,
    pub price: f64,
}

/// Owns the live pivot set, traded markers, and zone transitions
#[derive(Debug)]
pub struct ZoneBook {
    zone_above: f64,
    zone_below: f64,
    tick_size: f64,
    /// Oldest-first; removals happen in a separate pass after iteration
    highs: Vec<PivotLevel>,
    lows: Vec<PivotLevel>,
    /// Tick-quantized prices already consumed by a fill; permanent
    traded_highs: HashSet<i64>,
    traded_lows: HashSet<i64>,
}

impl ZoneBook {
    pub fn new(zone_above: f64, zone_below: f64, tick_size: f64) -> Self {
        Self {
            zone_above,
            zone_below,
            tick_size,
            highs: Vec::new(),
            lows: Vec::new(),
            traded_highs: HashSet::new(),
            traded_lows: HashSet::new(),
        }
    }

    pub fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
        self.traded_highs.clear();
        self.traded_lows.clear();
    }

    /// The single definition of price identity for this book
    fn quantize(price: f64, tick_size: f64) -> i64 {
        (price / tick_size).round() as i64
    }

    fn key(&self, price: f64) -> i64 {
        Self::quantize(price, self.tick_size)
    }

    /// Register a freshly confirmed pivot
    pub fn add_pivot(&mut self, pivot: Pivot) {
        let level = PivotLevel::new(pivot);
        match pivot.kind {
            PivotKind::High => self.highs.push(level),
            PivotKind::Low => self.lows.push(level),
        }
    }

    pub fn highs(&self) -> &[PivotLevel] {
        &self.highs
    }

    pub fn lows(&self) -> &[PivotLevel] {
        &self.lows
    }

    pub fn zone_above(&self) -> f64 {
        self.zone_above
    }

    pub fn zone_below(&self) -> f64 {
        self.zone_below
    }

    /// Has this pivot price already been consumed by a fill?
    pub fn is_traded(&self, kind: PivotKind, price: f64) -> bool {
        let key = self.key(price);
        match kind {
            PivotKind::High => self.traded_highs.contains(&key),
            PivotKind::Low => self.traded_lows.contains(&key),
        }
    }

    /// Mark a pivot price as consumed for the rest of the run
    pub fn mark_traded(&mut self, kind: PivotKind, price: f64) {
        let key = self.key(price);
        match kind {
            PivotKind::High => self.traded_highs.insert(key),
            PivotKind::Low => self.traded_lows.insert(key),
        };
    }

    /// A pivot eligible for entry checks on `bar_index`
    pub fn is_active(&self, level: &PivotLevel, bar_index: usize) -> bool {
        bar_index >= level.activation_bar
            && level.has_left_zone
            && !self.is_traded(level.pivot.kind, level.pivot.price)
    }

    /// The untraded, activated pivot on `kind`'s side nearest to `price`
    /// (limit-chase targeting; has_left_zone is not required here)
    pub fn closest_untraded(
        &self,
        kind: PivotKind,
        price: f64,
        bar_index: usize,
    ) -> Option<&PivotLevel> {
        let side = match kind {
            PivotKind::High => &self.highs,
            PivotKind::Low => &self.lows,
        };
        side.iter()
            .filter(|l| bar_index >= l.activation_bar)
            .filter(|l| !self.is_traded(kind, l.pivot.price))
            .min_by(|a, b| {
                let da = (a.pivot.price - price).abs();
                let db = (b.pivot.price - price).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Per-bar zone maintenance. Must run AFTER entry checks: a zone
    /// pierced and reversed within one bar is still tradable on that bar.
    /// Returns the pivots dropped this bar.
    pub fn update_zones(&mut self, bar_index: usize, bar: &Bar) -> Vec<InvalidatedPivot> {
        let mut invalidated = Vec::new();
        let (above, below) = (self.zone_above, self.zone_below);

        let traded_highs = &self.traded_highs;
        let tick = self.tick_size;
        self.highs.retain_mut(|level| {
            if traded_highs.contains(&Self::quantize(level.pivot.price, tick)) {
                return true;
            }
            if bar_index < level.activation_bar {
                return true;
            }

            let zone_top = level.zone_top(above, below);
            let zone_bottom = level.zone_bottom(above, below);

            if bar.low < zone_bottom && !level.has_left_zone {
                level.has_left_zone = true;
                level.left_zone_bar = Some(bar_index);
                debug!(
                    "HIGH zone left at bar {}: pivot {:.2} low {:.2}",
                    bar_index, level.pivot.price, bar.low
                );
            }

            if bar.high > zone_top && level.left_zone_bar != Some(bar_index) {
                info!(
                    "HIGH zone invalidated at bar {}: pivot {:.2} high {:.2}",
                    bar_index, level.pivot.price, bar.high
                );
                invalidated.push(InvalidatedPivot {
                    kind: PivotKind::High,
                    price: level.pivot.price,
                });
                return false;
            }
            true
        });

        let traded_lows = &self.traded_lows;
        self.lows.retain_mut(|level| {
            if traded_lows.contains(&Self::quantize(level.pivot.price, tick)) {
                return true;
            }
            if bar_index < level.activation_bar {
                return true;
            }

            let zone_top = level.zone_top(above, below);
            let zone_bottom = level.zone_bottom(above, below);

            if bar.high > zone_top && !level.has_left_zone {
                level.has_left_zone = true;
                level.left_zone_bar = Some(bar_index);
                debug!(
                    "LOW zone left at bar {}: pivot {:.2} high {:.2}",
                    bar_index, level.pivot.price, bar.high
                );
            }

            if bar.low < zone_bottom && level.left_zone_bar != Some(bar_index) {
                info!(
                    "LOW zone invalidated at bar {}: pivot {:.2} low {:.2}",
                    bar_index, level.pivot.price, bar.low
                );
                invalidated.push(InvalidatedPivot {
                    kind: PivotKind::Low,
                    price: level.pivot.price,
                });
                return false;
            }
            true
        });

        invalidated
    }

    /// Track support/resistance line breaks at the pivot price.
    /// A high pivot's line breaks when price trades above it, a low
    /// pivot's when price trades below. Active lines extend to this bar.
    pub fn update_lines(&mut self, bar_index: usize, bar: &Bar) {
        for level in &mut self.highs {
            if !level.line_active {
                continue;
            }
            if bar.high > level.pivot.price {
                level.line_active = false;
                level.line_end_bar = bar_index;
                info!(
                    "Support broken at bar {}: level {:.2} high {:.2}",
                    bar_index, level.pivot.price, bar.high
                );
            } else {
                level.line_end_bar = bar_index;
            }
        }
        for level in &mut self.lows {
            if !level.line_active {
                continue;
            }
            if bar.low < level.pivot.price {
                level.line_active = false;
                level.line_end_bar = bar_index;
                info!(
                    "Resistance broken at bar {}: level {:.2} low {:.2}",
                    bar_index, level.pivot.price, bar.low
                );
            } else {
                level.line_end_bar = bar_index;
            }
        }
    }
}
