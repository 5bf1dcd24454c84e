//! ATM bracket-strategy delegation
//!
//! When a template name is configured and the run is live, entries are
//! handed to the host's bracket subsystem instead of the unmanaged order
//! path. Creation is asynchronous: the request carries a one-shot
//! completion channel keyed by the request id, resolved exactly once by
//! the host. On failure both id fields are cleared so the next signal
//! retries creation.

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::order::OrderSide;

/// Result of an asynchronous bracket creation
#[derive(Debug, Clone)]
pub struct AtmOutcome {
    pub request_id: Uuid,
    /// None = created successfully
    pub error: Option<String>,
}

/// Request handed to the host's bracket subsystem
#[derive(Debug)]
pub struct AtmCreateRequest {
    pub request_id: Uuid,
    pub order_id: Uuid,
    pub template: String,
    pub side: OrderSide,
    pub quantity: i32,
    pub entry_price: f64,
    /// Resolved exactly once by the host
    pub completion: oneshot::Sender<AtmOutcome>,
}

/// Tracks one delegated bracket strategy at a time
#[derive(Debug, Default)]
pub struct AtmBracket {
    template: String,
    strategy_id: Option<Uuid>,
    order_id: Option<Uuid>,
    created: bool,
    pending: Option<oneshot::Receiver<AtmOutcome>>,
}

impl AtmBracket {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            ..Self::default()
        }
    }

    /// A non-empty template name enables delegation
    pub fn is_configured(&self) -> bool {
        !self.template.is_empty()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Whether a new bracket entry may be requested
    pub fn can_create(&self) -> bool {
        self.strategy_id.is_none() && self.order_id.is_none()
    }

    /// Build a creation request for a new entry. Guarded by both id
    /// fields being empty, which makes retry after failure idempotent.
    pub fn create(&mut self, side: OrderSide, quantity: i32, entry_price: f64) -> Option<AtmCreateRequest> {
        if !self.can_create() {
            return None;
        }
        let strategy_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        self.created = false;
        self.strategy_id = Some(strategy_id);
        self.order_id = Some(order_id);

        let (tx, rx) = oneshot::channel();
        self.pending = Some(rx);

        info!(
            "ATM create requested: {} {} @ {:.2} (template {})",
            side, quantity, entry_price, self.template
        );
        Some(AtmCreateRequest {
            request_id: strategy_id,
            order_id,
            template: self.template.clone(),
            side,
            quantity,
            entry_price,
            completion: tx,
        })
    }

    /// Poll the pending completion, if any. Safe to call every event.
    pub fn poll(&mut self) {
        let Some(rx) = self.pending.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(outcome) => {
                self.pending = None;
                if outcome.request_id != self.strategy_id.unwrap_or_default() {
                    debug!("Stale ATM completion {} ignored", outcome.request_id);
                    return;
                }
                match outcome.error {
                    None => {
                        self.created = true;
                        info!("ATM strategy created: {}", outcome.request_id);
                    }
                    Some(err) => {
                        warn!("ATM creation failed: {} ({})", outcome.request_id, err);
                        self.strategy_id = None;
                        self.order_id = None;
                        self.created = false;
                    }
                }
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                // Host dropped the completion; treat as failure and retry
                warn!("ATM completion channel closed without an outcome");
                self.pending = None;
                self.strategy_id = None;
                self.order_id = None;
                self.created = false;
            }
        }
    }

    /// The delegated entry order reached a terminal state
    pub fn on_entry_terminal(&mut self) {
        self.order_id = None;
    }

    /// The delegated strategy's position went flat
    pub fn on_strategy_flat(&mut self) {
        if self.order_id.is_none() {
            self.strategy_id = None;
            self.created = false;
        }
    }

    pub fn reset(&mut self) {
        self.strategy_id = None;
        self.order_id = None;
        self.created = false;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_guarded_by_empty_ids() {
        let mut atm = AtmBracket::new("Scalp15");
        assert!(atm.is_configured());

        let request = atm.create(OrderSide::Buy, 1, 21500.0).unwrap();
        assert_eq!(request.template, "Scalp15");

        // A second create while one is outstanding is refused
        assert!(atm.create(OrderSide::Buy, 1, 21500.0).is_none());
    }

    #[test]
    fn test_success_resolves_once() {
        let mut atm = AtmBracket::new("Scalp15");
        let request = atm.create(OrderSide::Sell, 1, 21500.0).unwrap();
        let request_id = request.request_id;

        atm.poll();
        assert!(!atm.is_created());

        request
            .completion
            .send(AtmOutcome { request_id, error: None })
            .unwrap();
        atm.poll();
        assert!(atm.is_created());

        // Idle polls after resolution are no-ops
        atm.poll();
        assert!(atm.is_created());
    }

    #[test]
    fn test_failure_allows_retry() {
        let mut atm = AtmBracket::new("Scalp15");
        let request = atm.create(OrderSide::Buy, 1, 21500.0).unwrap();
        let request_id = request.request_id;

        request
            .completion
            .send(AtmOutcome {
                request_id,
                error: Some("rejected by host".to_string()),
            })
            .unwrap();
        atm.poll();

        assert!(!atm.is_created());
        assert!(atm.can_create());
        assert!(atm.create(OrderSide::Buy, 1, 21500.0).is_some());
    }

    #[test]
    fn test_dropped_completion_allows_retry() {
        let mut atm = AtmBracket::new("Scalp15");
        let request = atm.create(OrderSide::Buy, 1, 21500.0).unwrap();
        drop(request);

        atm.poll();
        assert!(atm.can_create());
    }

    #[test]
    fn test_lifecycle_teardown() {
        let mut atm = AtmBracket::new("Scalp15");
        let request = atm.create(OrderSide::Buy, 1, 21500.0).unwrap();
        let request_id = request.request_id;
        request
            .completion
            .send(AtmOutcome { request_id, error: None })
            .unwrap();
        atm.poll();

        // Entry terminal then flat clears both ids for the next signal
        atm.on_entry_terminal();
        assert!(!atm.can_create());
        atm.on_strategy_flat();
        assert!(atm.can_create());
        assert!(!atm.is_created());
    }
}
