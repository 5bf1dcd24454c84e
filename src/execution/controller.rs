//! Order lifecycle controller
//!
//! Owns one slot per order role (entry, stop, target, and one resting
//! entry limit per side) and turns asynchronous order updates from the
//! host into fill outcomes the strategy layer acts on. Updates for ids
//! no slot is tracking are ignored, so late callbacks from a previous
//! trade cannot corrupt the current one.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::order::{
    BrokerRequest, OrderKind, OrderSide, OrderState, OrderTicket, OrderUpdate, Position,
};

/// Events emitted by the order lifecycle
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Entry order submitted
    EntrySubmitted { side: OrderSide, quantity: i32 },
    /// Entry order filled
    EntryFilled { side: OrderSide, fill_price: f64 },
    /// Exit order filled (stop or target)
    ExitFilled {
        kind: OrderKind,
        fill_price: f64,
        pnl_points: f64,
    },
    /// Trailing or breakeven stop moved
    StopMoved { new_stop: f64 },
    /// Resting entry limit placed or replaced
    LimitPlaced { side: OrderSide, price: f64 },
    /// Resting entry limit cancelled
    LimitCancelled { side: OrderSide },
    /// Daily loss halt reached
    DailyHaltReached { pnl_points: f64 },
    /// Weekly loss halt reached
    WeeklyHaltReached { pnl_points: f64 },
    /// Working exit orders cancelled because the position was flat
    OrdersReconciled,
}

/// What an order update meant for the trade in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillOutcome {
    EntryFilled {
        side: OrderSide,
        avg_price: f64,
        quantity: i32,
    },
    ExitFilled {
        kind: OrderKind,
        avg_price: f64,
        exit_is_sell: bool,
    },
    /// A resting entry limit filled; carries the pivot it was resting at
    PendingLimitFilled {
        side: OrderSide,
        avg_price: f64,
        pivot_price: f64,
    },
    /// Entry cancelled or rejected before filling
    EntryFailed,
    /// An exit order left the book without filling
    ExitCleared { kind: OrderKind },
    /// A resting entry limit left the book without filling
    PendingCleared { side: OrderSide },
}

#[derive(Debug, Clone, Copy)]
struct EntrySlot {
    id: Uuid,
    side: OrderSide,
    quantity: i32,
}

#[derive(Debug, Clone, Copy)]
struct ExitSlot {
    id: Uuid,
    side: OrderSide,
    price: f64,
}

#[derive(Debug, Clone, Copy)]
struct PendingLimit {
    id: Uuid,
    pivot_price: f64,
    limit_price: f64,
}

/// Tracks working orders and routes updates to outcomes
pub struct OrderLifecycleController {
    entry: Option<EntrySlot>,
    stop: Option<ExitSlot>,
    target: Option<ExitSlot>,
    limit_long: Option<PendingLimit>,
    limit_short: Option<PendingLimit>,
    outbox: Vec<BrokerRequest>,
    event_tx: broadcast::Sender<ExecutionEvent>,
}

impl OrderLifecycleController {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self {
            entry: None,
            stop: None,
            target: None,
            limit_long: None,
            limit_short: None,
            outbox: Vec::new(),
            event_tx,
        }
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_tx.subscribe()
    }

    /// Sender handle for layers above that emit their own events
    pub fn event_sender(&self) -> broadcast::Sender<ExecutionEvent> {
        self.event_tx.clone()
    }

    /// Drain requests queued since the last call
    pub fn take_requests(&mut self) -> Vec<BrokerRequest> {
        std::mem::take(&mut self.outbox)
    }

    pub fn has_working_entry(&self) -> bool {
        self.entry.is_some()
    }

    pub fn has_working_exits(&self) -> bool {
        self.stop.is_some() || self.target.is_some()
    }

    pub fn stop_price(&self) -> Option<f64> {
        self.stop.map(|s| s.price)
    }

    pub fn pending_limit(&self, side: OrderSide) -> Option<(f64, f64)> {
        self.limit_slot(side).map(|l| (l.pivot_price, l.limit_price))
    }

    fn limit_slot(&self, side: OrderSide) -> Option<&PendingLimit> {
        match side {
            OrderSide::Buy => self.limit_long.as_ref(),
            OrderSide::Sell => self.limit_short.as_ref(),
        }
    }

    fn limit_slot_mut(&mut self, side: OrderSide) -> &mut Option<PendingLimit> {
        match side {
            OrderSide::Buy => &mut self.limit_long,
            OrderSide::Sell => &mut self.limit_short,
        }
    }

    /// Submit a market entry. Refused while another entry is working.
    pub fn submit_entry(&mut self, side: OrderSide, quantity: i32) -> bool {
        if self.entry.is_some() {
            debug!("Entry already working, new {} entry skipped", side);
            return false;
        }
        let ticket = OrderTicket::market(OrderKind::Entry, side, quantity);
        self.entry = Some(EntrySlot {
            id: ticket.id,
            side,
            quantity,
        });
        info!("Entry submitted: {} {} @ market", side, quantity);
        self.outbox.push(BrokerRequest::Submit(ticket));
        let _ = self
            .event_tx
            .send(ExecutionEvent::EntrySubmitted { side, quantity });
        true
    }

    /// Place protective stop and profit target after an entry fill.
    /// `position_side` is the side that entered; exits go the other way.
    pub fn place_exit_orders(
        &mut self,
        position_side: OrderSide,
        quantity: i32,
        stop_price: Option<f64>,
        target_price: Option<f64>,
    ) {
        let exit_side = position_side.opposite();
        if let Some(price) = stop_price {
            let ticket = OrderTicket::stop(OrderKind::Stop, exit_side, quantity, price);
            self.stop = Some(ExitSlot {
                id: ticket.id,
                side: exit_side,
                price,
            });
            self.outbox.push(BrokerRequest::Submit(ticket));
        }
        if let Some(price) = target_price {
            let ticket = OrderTicket::limit(OrderKind::Target, exit_side, quantity, price);
            self.target = Some(ExitSlot {
                id: ticket.id,
                side: exit_side,
                price,
            });
            self.outbox.push(BrokerRequest::Submit(ticket));
        }
        info!(
            "Exit orders placed: stop {:?}, target {:?}",
            stop_price, target_price
        );
    }

    /// Move the working stop. No-op if none is working.
    pub fn modify_stop(&mut self, new_price: f64) -> bool {
        let Some(stop) = self.stop.as_mut() else {
            return false;
        };
        stop.price = new_price;
        let id = stop.id;
        self.outbox.push(BrokerRequest::Modify {
            id,
            price: new_price,
        });
        let _ = self
            .event_tx
            .send(ExecutionEvent::StopMoved { new_stop: new_price });
        true
    }

    /// Place a resting entry limit at a pivot, replacing any limit
    /// already resting on that side.
    pub fn place_pending_limit(
        &mut self,
        side: OrderSide,
        quantity: i32,
        pivot_price: f64,
        limit_price: f64,
    ) {
        self.cancel_pending_limit(side);
        let kind = match side {
            OrderSide::Buy => OrderKind::PendingLimitLong,
            OrderSide::Sell => OrderKind::PendingLimitShort,
        };
        let ticket = OrderTicket::limit(kind, side, quantity, limit_price);
        *self.limit_slot_mut(side) = Some(PendingLimit {
            id: ticket.id,
            pivot_price,
            limit_price,
        });
        info!(
            "Resting {} limit @ {:.2} (pivot {:.2})",
            side, limit_price, pivot_price
        );
        self.outbox.push(BrokerRequest::Submit(ticket));
        let _ = self.event_tx.send(ExecutionEvent::LimitPlaced {
            side,
            price: limit_price,
        });
    }

    /// Cancel the resting entry limit on one side, if any
    pub fn cancel_pending_limit(&mut self, side: OrderSide) {
        if let Some(limit) = self.limit_slot_mut(side).take() {
            self.outbox.push(BrokerRequest::Cancel(limit.id));
            let _ = self.event_tx.send(ExecutionEvent::LimitCancelled { side });
        }
    }

    /// Cancel resting entry limits on both sides
    pub fn cancel_all_pending_limits(&mut self) {
        self.cancel_pending_limit(OrderSide::Buy);
        self.cancel_pending_limit(OrderSide::Sell);
    }

    /// Route an order update to the slot tracking it. Updates for
    /// unknown ids return None.
    pub fn handle_update(&mut self, update: &OrderUpdate) -> Option<FillOutcome> {
        if let Some(entry) = self.entry {
            if entry.id == update.id {
                return self.on_entry_update(entry, update);
            }
        }
        if let Some(stop) = self.stop {
            if stop.id == update.id {
                return self.on_exit_update(OrderKind::Stop, stop, update);
            }
        }
        if let Some(target) = self.target {
            if target.id == update.id {
                return self.on_exit_update(OrderKind::Target, target, update);
            }
        }
        for side in [OrderSide::Buy, OrderSide::Sell] {
            if let Some(limit) = self.limit_slot(side).copied() {
                if limit.id == update.id {
                    return self.on_limit_update(side, limit, update);
                }
            }
        }
        debug!("Order update for untracked id {} ignored", update.id);
        None
    }

    fn on_entry_update(&mut self, entry: EntrySlot, update: &OrderUpdate) -> Option<FillOutcome> {
        match update.state {
            OrderState::Filled => {
                self.entry = None;
                info!(
                    "Entry filled: {} {} @ {:.2}",
                    entry.side, update.filled_quantity, update.avg_fill_price
                );
                let _ = self.event_tx.send(ExecutionEvent::EntryFilled {
                    side: entry.side,
                    fill_price: update.avg_fill_price,
                });
                Some(FillOutcome::EntryFilled {
                    side: entry.side,
                    avg_price: update.avg_fill_price,
                    quantity: entry.quantity,
                })
            }
            OrderState::Cancelled | OrderState::Rejected => {
                self.entry = None;
                warn!("Entry order {} {}", update.id, update.state);
                Some(FillOutcome::EntryFailed)
            }
            OrderState::Submitted => None,
        }
    }

    fn on_exit_update(
        &mut self,
        kind: OrderKind,
        slot: ExitSlot,
        update: &OrderUpdate,
    ) -> Option<FillOutcome> {
        match update.state {
            OrderState::Filled => {
                // Cancel the surviving sibling before clearing slots
                let sibling = match kind {
                    OrderKind::Stop => self.target.take(),
                    _ => self.stop.take(),
                };
                if let Some(sibling) = sibling {
                    self.outbox.push(BrokerRequest::Cancel(sibling.id));
                }
                self.stop = None;
                self.target = None;
                info!("{} filled @ {:.2}", kind, update.avg_fill_price);
                Some(FillOutcome::ExitFilled {
                    kind,
                    avg_price: update.avg_fill_price,
                    exit_is_sell: slot.side == OrderSide::Sell,
                })
            }
            OrderState::Cancelled | OrderState::Rejected => {
                match kind {
                    OrderKind::Stop => self.stop = None,
                    _ => self.target = None,
                }
                Some(FillOutcome::ExitCleared { kind })
            }
            OrderState::Submitted => None,
        }
    }

    fn on_limit_update(
        &mut self,
        side: OrderSide,
        limit: PendingLimit,
        update: &OrderUpdate,
    ) -> Option<FillOutcome> {
        match update.state {
            OrderState::Filled => {
                // Pivot price must be read before the slot is cleared
                let pivot_price = limit.pivot_price;
                *self.limit_slot_mut(side) = None;
                self.cancel_pending_limit(side.opposite());
                info!(
                    "Resting {} limit filled @ {:.2} (pivot {:.2})",
                    side, update.avg_fill_price, pivot_price
                );
                let _ = self.event_tx.send(ExecutionEvent::EntryFilled {
                    side,
                    fill_price: update.avg_fill_price,
                });
                Some(FillOutcome::PendingLimitFilled {
                    side,
                    avg_price: update.avg_fill_price,
                    pivot_price,
                })
            }
            OrderState::Cancelled | OrderState::Rejected => {
                *self.limit_slot_mut(side) = None;
                Some(FillOutcome::PendingCleared { side })
            }
            OrderState::Submitted => None,
        }
    }

    /// Cancel working exits when the position is flat but exit orders
    /// remain on the book. Returns true if anything was cancelled.
    pub fn reconcile_flat(&mut self, position: &Position) -> bool {
        if !position.is_flat() || !self.has_working_exits() {
            return false;
        }
        warn!("Position flat with working exit orders, cancelling");
        if let Some(stop) = self.stop.take() {
            self.outbox.push(BrokerRequest::Cancel(stop.id));
        }
        if let Some(target) = self.target.take() {
            self.outbox.push(BrokerRequest::Cancel(target.id));
        }
        let _ = self.event_tx.send(ExecutionEvent::OrdersReconciled);
        true
    }

    pub fn reset(&mut self) {
        self.entry = None;
        self.stop = None;
        self.target = None;
        self.limit_long = None;
        self.limit_short = None;
        self.outbox.clear();
    }
}

impl Default for OrderLifecycleController {
    fn default() -> Self {
        Self::new()
    }
}
