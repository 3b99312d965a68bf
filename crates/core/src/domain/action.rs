use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Order,
    Info,
    Booking,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Info => "info",
            Self::Booking => "booking",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub pickup_eta: String,
}

impl Order {
    pub fn new(items: Vec<LineItem>, pickup_eta: impl Into<String>) -> Self {
        let total = items.iter().map(LineItem::line_total).sum();
        Self { items, total, pickup_eta: pickup_eta.into() }
    }

    /// Folds `other` into this order by item name: new items are appended,
    /// known items take the newer quantity, items `other` does not mention are
    /// kept. Returns whether anything changed.
    pub fn merge(&mut self, other: &Order) -> bool {
        let mut changed = false;
        for incoming in &other.items {
            match self.items.iter_mut().find(|item| item.name == incoming.name) {
                Some(existing) if existing.quantity != incoming.quantity => {
                    existing.quantity = incoming.quantity;
                    changed = true;
                }
                Some(_) => {}
                None => {
                    self.items.push(incoming.clone());
                    changed = true;
                }
            }
        }

        if changed {
            self.total = self.items.iter().map(LineItem::line_total).sum();
        }
        changed
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub customer_name: String,
    pub service: String,
    pub date_time: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Action {
    Order(Order),
    Booking(Booking),
}
