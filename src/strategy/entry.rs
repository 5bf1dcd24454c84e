//! Entry signal generation
//!
//! Three mutually exclusive confirmation protocols over the zone book:
//! bar-close reversal candles, tick-level reversal distance from an
//! in-zone extremum, and resting limit orders chasing the nearest
//! untraded pivot.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bars::Bar;
use super::zigzag::PivotKind;
use super::zones::ZoneBook;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "Long"),
            Direction::Short => write!(f, "Short"),
        }
    }
}

impl Direction {
    /// The pivot side this direction trades against
    pub fn pivot_kind(&self) -> PivotKind {
        match self {
            Direction::Short => PivotKind::High,
            Direction::Long => PivotKind::Low,
        }
    }
}

/// A confirmed entry opportunity
#[derive(Debug, Clone, Copy)]
pub struct EntrySignal {
    pub direction: Direction,
    /// Pivot that produced the signal (to be marked traded)
    pub pivot_price: f64,
    /// Price at confirmation time
    pub entry_price: f64,
}

/// Desired resting limit order for the limit-chase protocol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitTarget {
    pub direction: Direction,
    pub pivot_price: f64,
    pub limit_price: f64,
}

/// Evaluates entry conditions against the zone book.
///
/// Owns the transient tick-protocol tracking state: one in-zone flag and
/// extremum per side, shared across pivots. Leaving a zone on the wrong
/// side or firing a signal clears the tracking with no partial memory.
#[derive(Debug, Default)]
pub struct EntryEngine {
    in_zone_for_high: bool,
    in_zone_for_low: bool,
    zone_high_extremum: f64,
    zone_low_extremum: f64,
}

impl EntryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.in_zone_for_high = false;
        self.in_zone_for_low = false;
        self.zone_high_extremum = 0.0;
        self.zone_low_extremum = 0.0;
    }

    /// Bar-close reversal protocol. Highs are checked before lows; the
    /// first qualifying pivot fires and the scan stops (one order at a
    /// time).
    pub fn check_bar_close(
        &self,
        bar_index: usize,
        bar: &Bar,
        book: &ZoneBook,
    ) -> Option<EntrySignal> {
        let (above, below) = (book.zone_above(), book.zone_below());

        // Shorts against untraded swing highs
        for level in book.highs() {
            if !book.is_active(level, bar_index) {
                continue;
            }
            let zone_top = level.zone_top(above, below);
            let zone_bottom = level.zone_bottom(above, below);

            if bar.high >= zone_bottom && bar.high <= zone_top && bar.is_down() {
                info!(
                    "Bar-close SHORT at bar {}: pivot {:.2} high {:.2} close {:.2}",
                    bar_index, level.pivot.price, bar.high, bar.close
                );
                return Some(EntrySignal {
                    direction: Direction::Short,
                    pivot_price: level.pivot.price,
                    entry_price: bar.close,
                });
            }
        }

        // Longs against untraded swing lows
        for level in book.lows() {
            if !book.is_active(level, bar_index) {
                continue;
            }
            let zone_top = level.zone_top(above, below);
            let zone_bottom = level.zone_bottom(above, below);

            if bar.low >= zone_bottom && bar.low <= zone_top && bar.is_up() {
                info!(
                    "Bar-close LONG at bar {}: pivot {:.2} low {:.2} close {:.2}",
                    bar_index, level.pivot.price, bar.low, bar.close
                );
                return Some(EntrySignal {
                    direction: Direction::Long,
                    pivot_price: level.pivot.price,
                    entry_price: bar.close,
                });
            }
        }

        None
    }

    /// Tick reversal-distance protocol. While price sits inside (or
    /// beyond, on the trade side of) a zone, the adverse extremum is
    /// tracked; a retracement of `reversal_distance` from it fires.
    pub fn check_tick(
        &mut self,
        bar_index: usize,
        price: f64,
        reversal_distance: f64,
        book: &ZoneBook,
    ) -> Option<EntrySignal> {
        let (above, below) = (book.zone_above(), book.zone_below());

        for level in book.highs() {
            if !book.is_active(level, bar_index) {
                continue;
            }
            let zone_top = level.zone_top(above, below);
            let zone_bottom = level.zone_bottom(above, below);

            if price >= zone_bottom && price <= zone_top && !self.in_zone_for_high {
                self.in_zone_for_high = true;
                self.zone_high_extremum = price;
                debug!("Tick entered HIGH zone {:.2} at {:.2}", level.pivot.price, price);
            }

            if self.in_zone_for_high && price <= zone_top {
                if price > self.zone_high_extremum {
                    self.zone_high_extremum = price;
                } else if self.zone_high_extremum - price >= reversal_distance {
                    info!(
                        "Tick SHORT reversal at bar {}: pivot {:.2} extremum {:.2} price {:.2}",
                        bar_index, level.pivot.price, self.zone_high_extremum, price
                    );
                    let signal = EntrySignal {
                        direction: Direction::Short,
                        pivot_price: level.pivot.price,
                        entry_price: price,
                    };
                    self.reset();
                    return Some(signal);
                }
            } else if self.in_zone_for_high && price > zone_top {
                // Wrong-side exit: no partial memory is kept
                self.in_zone_for_high = false;
                self.zone_high_extremum = 0.0;
            }
        }

        for level in book.lows() {
            if !book.is_active(level, bar_index) {
                continue;
            }
            let zone_top = level.zone_top(above, below);
            let zone_bottom = level.zone_bottom(above, below);

            if price >= zone_bottom && price <= zone_top && !self.in_zone_for_low {
                self.in_zone_for_low = true;
                self.zone_low_extremum = price;
                debug!("Tick entered LOW zone {:.2} at {:.2}", level.pivot.price, price);
            }

            if self.in_zone_for_low && price >= zone_bottom {
                if price < self.zone_low_extremum {
                    self.zone_low_extremum = price;
                } else if price - self.zone_low_extremum >= reversal_distance {
                    info!(
                        "Tick LONG reversal at bar {}: pivot {:.2} extremum {:.2} price {:.2}",
                        bar_index, level.pivot.price, self.zone_low_extremum, price
                    );
                    let signal = EntrySignal {
                        direction: Direction::Long,
                        pivot_price: level.pivot.price,
                        entry_price: price,
                    };
                    self.reset();
                    return Some(signal);
                }
            } else if self.in_zone_for_low && price < zone_bottom {
                self.in_zone_for_low = false;
                self.zone_low_extremum = 0.0;
            }
        }

        None
    }

    /// Resting limit-chase protocol: the desired limit order for one
    /// side, targeting the closest untraded pivot. Returns None when no
    /// target exists or the limit would sit on the wrong side of the
    /// market (and fill immediately).
    pub fn desired_limit(
        &self,
        direction: Direction,
        current_price: f64,
        bar_index: usize,
        book: &ZoneBook,
    ) -> Option<LimitTarget> {
        let level = book.closest_untraded(direction.pivot_kind(), current_price, bar_index)?;
        let limit_price = match direction {
            // Sell limit at the zone bottom of the swing high
            Direction::Short => level.pivot.price - book.zone_below(),
            // Buy limit at the zone top of the swing low
            Direction::Long => level.pivot.price + book.zone_below(),
        };

        let correct_side = match direction {
            Direction::Short => limit_price > current_price,
            Direction::Long => limit_price < current_price,
        };
        if !correct_side {
            return None;
        }

        Some(LimitTarget {
            direction,
            pivot_price: level.pivot.price,
            limit_price,
        })
    }
}
