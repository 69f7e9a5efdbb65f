//! Domain types for orders and their line items.
//!
//! Orders arrive from the persistence layer with their shop and each item's
//! coffee already joined. Line item bag counts mirror the persisted columns:
//! nullable integers, some of which only exist on rows written after a schema
//! change (the espresso/filter split, then medium bags).

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the inner string value
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a coffee
    CoffeeId
);
string_id!(
    /// Identifier of a shop
    ShopId
);
string_id!(
    /// Identifier of an order
    OrderId
);

/// The coffee a line item refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoffeeRef {
    /// Coffee identifier
    pub id: CoffeeId,
    /// Display name
    pub name: String,
    /// Quality grade, when one has been assigned
    pub grade: Option<String>,
}

impl CoffeeRef {
    /// Creates a coffee reference without a grade
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CoffeeId::new(id),
            name: name.into(),
            grade: None,
        }
    }

    /// Sets the grade
    #[must_use]
    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }
}

/// The shop an order was placed by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopRef {
    /// Shop identifier
    pub id: ShopId,
    /// Display name
    pub name: String,
}

impl ShopRef {
    /// Creates a shop reference
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ShopId::new(id),
            name: name.into(),
        }
    }
}

/// Status of an order in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, not yet acted on
    Pending,
    /// Accepted by the roastery
    Confirmed,
    /// Sent to the shop
    Shipped,
    /// Received by the shop and credited to its inventory
    Delivered,
    /// Withdrawn
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse a status name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownStatus`] if the name is not a known status.
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::UnknownStatus(s.to_string()))
    }

    /// Delivered and cancelled orders never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order, as persisted.
///
/// Counts are nullable: rows written before a column existed read back as
/// `None`. `total_quantity_kg` is stored separately and is not guaranteed to
/// agree with the counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    /// Coffee ordered; `None` when the reference is missing
    pub coffee: Option<CoffeeRef>,
    /// 200g bags under the pre-split scheme
    #[serde(default)]
    pub small_bags_legacy: Option<i32>,
    /// 200g espresso bags
    #[serde(default)]
    pub small_bags_espresso: Option<i32>,
    /// 200g filter bags
    #[serde(default)]
    pub small_bags_filter: Option<i32>,
    /// 500g espresso bags
    #[serde(default)]
    pub medium_bags_espresso: Option<i32>,
    /// 500g filter bags
    #[serde(default)]
    pub medium_bags_filter: Option<i32>,
    /// 1kg bags
    #[serde(default)]
    pub large_bags: Option<i32>,
    /// Precomputed total stored with the row
    #[serde(default)]
    pub total_quantity_kg: Option<f64>,
}

impl OrderLineItem {
    /// Creates an empty line item for a coffee
    #[must_use]
    pub fn for_coffee(coffee: CoffeeRef) -> Self {
        Self {
            coffee: Some(coffee),
            ..Self::default()
        }
    }
}

/// An order with its shop and line items joined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Current status
    pub status: OrderStatus,
    /// Ordering shop
    pub shop: ShopRef,
    /// Line items
    pub items: Vec<OrderLineItem>,
}
