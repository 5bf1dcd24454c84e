// Library crate - exports the strategy core and execution plumbing

pub mod execution;
pub mod strategy;

// Re-export commonly used types
pub use execution::{OrderSide, OrderUpdate, Position, SimBroker};
pub use strategy::{Bar, StrategyConfig, Tick, ZigZagStrategy};
