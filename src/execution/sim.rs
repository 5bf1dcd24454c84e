//! Replay broker
//!
//! Minimal single-symbol matching for offline runs: market orders fill
//! at the last observed price, limits and stops rest until a price
//! crosses them. Positions net into a single signed quantity. Bracket
//! delegation requests are refused so the unmanaged path is exercised.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::atm::AtmOutcome;
use super::order::{
    BrokerRequest, OrderSide, OrderState, OrderTicket, OrderType, OrderUpdate, Position,
    PositionSide,
};

/// In-memory order book and netting position for replay runs
pub struct SimBroker {
    working: Vec<OrderTicket>,
    last_price: f64,
    net_quantity: i32,
    avg_price: f64,
    updates: Vec<OrderUpdate>,
}

impl SimBroker {
    pub fn new() -> Self {
        Self {
            working: Vec::new(),
            last_price: 0.0,
            net_quantity: 0,
            avg_price: 0.0,
            updates: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        if self.net_quantity == 0 {
            Position::flat()
        } else {
            Position {
                side: if self.net_quantity > 0 {
                    PositionSide::Long
                } else {
                    PositionSide::Short
                },
                avg_price: self.avg_price,
                quantity: self.net_quantity.abs(),
            }
        }
    }

    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    pub fn working_count(&self) -> usize {
        self.working.len()
    }

    /// Drain fills and cancellations produced since the last call
    pub fn drain_updates(&mut self) -> Vec<OrderUpdate> {
        std::mem::take(&mut self.updates)
    }

    /// Apply a batch of requests from the strategy
    pub fn apply(&mut self, requests: Vec<BrokerRequest>) {
        for request in requests {
            match request {
                BrokerRequest::Submit(ticket) => self.submit(ticket),
                BrokerRequest::Cancel(id) => self.cancel(id),
                BrokerRequest::Modify { id, price } => self.modify(id, price),
                BrokerRequest::AtmCreate(req) => {
                    let _ = req.completion.send(AtmOutcome {
                        request_id: req.request_id,
                        error: Some("bracket delegation unavailable in replay".to_string()),
                    });
                }
            }
        }
    }

    fn submit(&mut self, ticket: OrderTicket) {
        match ticket.order_type {
            OrderType::Market => self.fill(&ticket, self.last_price),
            _ => {
                // Marketable orders fill against the last price at once
                if let Some(price) = self.trigger_price(&ticket, self.last_price) {
                    self.fill(&ticket, price);
                } else {
                    self.working.push(ticket);
                }
            }
        }
    }

    fn cancel(&mut self, id: Uuid) {
        if let Some(pos) = self.working.iter().position(|t| t.id == id) {
            let ticket = self.working.remove(pos);
            self.updates.push(OrderUpdate {
                id: ticket.id,
                state: OrderState::Cancelled,
                avg_fill_price: 0.0,
                filled_quantity: 0,
                timestamp: Utc::now(),
            });
        } else {
            debug!("Cancel for unknown order {} ignored", id);
        }
    }

    fn modify(&mut self, id: Uuid, price: f64) {
        if let Some(ticket) = self.working.iter_mut().find(|t| t.id == id) {
            ticket.price = Some(price);
        } else {
            debug!("Modify for unknown order {} ignored", id);
        }
    }

    /// Advance the price and fill whatever it crosses
    pub fn on_price(&mut self, price: f64) {
        self.last_price = price;
        loop {
            let Some(pos) = self
                .working
                .iter()
                .position(|t| self.trigger_price(t, price).is_some())
            else {
                break;
            };
            let ticket = self.working.remove(pos);
            let fill_price = self
                .trigger_price(&ticket, price)
                .unwrap_or(price);
            self.fill(&ticket, fill_price);
        }
    }

    fn trigger_price(&self, ticket: &OrderTicket, price: f64) -> Option<f64> {
        let level = ticket.price?;
        let triggered = match (ticket.order_type, ticket.side) {
            (OrderType::Limit, OrderSide::Buy) => price <= level,
            (OrderType::Limit, OrderSide::Sell) => price >= level,
            (OrderType::StopMarket, OrderSide::Buy) => price >= level,
            (OrderType::StopMarket, OrderSide::Sell) => price <= level,
            (OrderType::Market, _) => true,
        };
        triggered.then_some(level)
    }

    fn fill(&mut self, ticket: &OrderTicket, price: f64) {
        let signed = match ticket.side {
            OrderSide::Buy => ticket.quantity,
            OrderSide::Sell => -ticket.quantity,
        };
        let opening = self.net_quantity == 0 || self.net_quantity.signum() == signed.signum();
        self.net_quantity += signed;
        if opening {
            self.avg_price = price;
        } else if self.net_quantity == 0 {
            self.avg_price = 0.0;
        }
        self.updates.push(OrderUpdate {
            id: ticket.id,
            state: OrderState::Filled,
            avg_fill_price: price,
            filled_quantity: ticket.quantity,
            timestamp: Utc::now(),
        });
    }
}

impl Default for SimBroker {
    fn default() -> Self {
        Self::new()
    }
}
