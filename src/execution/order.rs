//! Order tickets, states, and the fire-and-forget request/callback types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
}

/// Which slot of the lifecycle an order occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Entry,
    Stop,
    Target,
    PendingLimitLong,
    PendingLimitShort,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "ENTRY"),
            Self::Stop => write!(f, "STOP"),
            Self::Target => write!(f, "TARGET"),
            Self::PendingLimitLong => write!(f, "LIMIT-LONG"),
            Self::PendingLimitShort => write!(f, "LIMIT-SHORT"),
        }
    }
}

/// Broker-reported order state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Submitted,
    Filled,
    Cancelled,
    Rejected,
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A new order to submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicket {
    /// Client-side order id; callbacks reference it
    pub id: Uuid,
    pub kind: OrderKind,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: i32,
    /// Limit or stop price for non-market orders
    pub price: Option<f64>,
}

impl OrderTicket {
    pub fn market(kind: OrderKind, side: OrderSide, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
        }
    }

    pub fn limit(kind: OrderKind, side: OrderSide, quantity: i32, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
        }
    }

    pub fn stop(kind: OrderKind, side: OrderSide, quantity: i32, price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            side,
            order_type: OrderType::StopMarket,
            quantity,
            price: Some(price),
        }
    }
}

/// Fire-and-forget request toward the host order router
#[derive(Debug)]
pub enum BrokerRequest {
    Submit(OrderTicket),
    Cancel(Uuid),
    Modify { id: Uuid, price: f64 },
    AtmCreate(super::atm::AtmCreateRequest),
}

/// Asynchronous order-state notification from the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: Uuid,
    pub state: OrderState,
    pub avg_fill_price: f64,
    pub filled_quantity: i32,
    pub timestamp: DateTime<Utc>,
}

/// Current market position, externally owned and read-only for the core
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub avg_price: f64,
    pub quantity: i32,
}

impl Position {
    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            avg_price: 0.0,
            quantity: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "FLAT"),
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_constructors() {
        let entry = OrderTicket::market(OrderKind::Entry, OrderSide::Buy, 1);
        assert_eq!(entry.order_type, OrderType::Market);
        assert_eq!(entry.price, None);

        let stop = OrderTicket::stop(OrderKind::Stop, OrderSide::Sell, 1, 90.0);
        assert_eq!(stop.order_type, OrderType::StopMarket);
        assert_eq!(stop.price, Some(90.0));

        let limit = OrderTicket::limit(OrderKind::Target, OrderSide::Sell, 1, 115.0);
        assert_eq!(limit.order_type, OrderType::Limit);
        assert_ne!(entry.id, stop.id);
        assert_ne!(stop.id, limit.id);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }
}
