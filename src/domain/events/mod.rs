//! Domain events published after order state changes
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: i64, user_id: i64, total_cost: Decimal },
    OrderPaid { order_id: i64, session_id: String, amount_paid: Decimal },
    OrderStatusChanged { order_id: i64, status: String },
}

impl DomainEvent {
    /// Subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "shopit.orders.placed",
            Self::OrderPaid { .. } => "shopit.orders.paid",
            Self::OrderStatusChanged { .. } => "shopit.orders.status_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_tag() {
        let e = DomainEvent::OrderStatusChanged { order_id: 4, status: "delivered".into() };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "order_status_changed");
        assert_eq!(v["order_id"], 4);
        assert_eq!(e.subject(), "shopit.orders.status_changed");
    }
}
