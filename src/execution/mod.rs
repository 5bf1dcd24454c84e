//! Order execution module
//!
//! This module provides the order lifecycle plumbing for the pivot-zone
//! strategy: tickets and updates, slot tracking, bracket delegation, and
//! a replay broker for offline runs.

mod atm;
mod controller;
mod order;
mod sim;

pub use atm::{AtmBracket, AtmCreateRequest, AtmOutcome};
pub use controller::{ExecutionEvent, FillOutcome, OrderLifecycleController};
pub use order::{
    BrokerRequest, OrderKind, OrderSide, OrderState, OrderTicket, OrderType, OrderUpdate,
    Position, PositionSide,
};
pub use sim::SimBroker;
