use serde::{Deserialize, Serialize};

/// Item status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Held against an outstanding loan
    Pawned,
    /// Forfeited by a confiscated loan, available as inventory
    ForSale,
    Sold,
    /// Handed back to the customer after payoff
    Returned,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pawned => "pawned",
            ItemStatus::ForSale => "for_sale",
            ItemStatus::Sold => "sold",
            ItemStatus::Returned => "returned",
        }
    }
}
