//! Status and classification enums.
//!
//! Each enum maps to a Postgres enum type in the `storefront` schema (with the
//! `postgres` feature) and to the string form the HTTP API speaks.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the enums in this module fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Account role. Admins may mutate the catalog and move orders through
/// their lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Whether this role carries admin privileges.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// Catalog category a sticker is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.sticker_category", rename_all = "snake_case")
)]
pub enum StickerCategory {
    Trending,
    New,
    Animals,
    Food,
    Cute,
    Funny,
}

impl StickerCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 6] = [
        Self::Trending,
        Self::New,
        Self::Animals,
        Self::Food,
        Self::Cute,
        Self::Funny,
    ];

    /// The label used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trending => "Trending",
            Self::New => "New",
            Self::Animals => "Animals",
            Self::Food => "Food",
            Self::Cute => "Cute",
            Self::Funny => "Funny",
        }
    }
}

impl fmt::Display for StickerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StickerCategory {
    type Err = ParseEnumError;

    /// Case-insensitive match on the category label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseEnumError::new("category", s))
    }
}

/// Lifecycle of a placed order.
///
/// ```text
/// pending -> processing -> shipped -> delivered
///    |            |
///    +------------+--> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses reachable in one step from `self`.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Whether an admin may move an order from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }

    /// The label used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError::new("order status", s)),
        }
    }
}

/// How the customer intends to pay. `Online` is recorded but never settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_method", rename_all = "snake_case")
)]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    #[serde(rename = "COD")]
    Cod,
    Online,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cod => write!(f, "COD"),
            Self::Online => write!(f, "Online"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(Self::Cod),
            "online" => Ok(Self::Online),
            _ => Err(ParseEnumError::new("payment method", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_cancellation_window() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!(
            "Shipped".parse::<OrderStatus>().unwrap(),
            OrderStatus::Shipped
        );
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(
            "animals".parse::<StickerCategory>().unwrap(),
            StickerCategory::Animals
        );
        assert_eq!(
            "FUNNY".parse::<StickerCategory>().unwrap(),
            StickerCategory::Funny
        );
        assert!("Vehicles".parse::<StickerCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_capitalized() {
        let json = serde_json::to_string(&StickerCategory::Trending).unwrap();
        assert_eq!(json, "\"Trending\"");
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Cod).unwrap(), "\"COD\"");
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Online).unwrap(),
            "\"Online\""
        );
        assert_eq!("cod".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cod);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cod);
    }

    #[test]
    fn test_role_roundtrip() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::User.is_admin());
    }
}
