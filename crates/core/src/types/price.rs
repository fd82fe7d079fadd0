//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input could not be read as a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// Zero or negative amounts are not sellable.
    #[error("price must be greater than zero")]
    NotPositive,
    /// More than two fractional digits.
    #[error("price cannot have more than {max} decimal places")]
    TooPrecise {
        /// Maximum allowed scale.
        max: u32,
    },
    /// Larger than the price column can hold.
    #[error("price must be at most {max}")]
    TooLarge {
        /// Largest accepted amount.
        max: Decimal,
    },
}

/// A strictly positive unit price in the shop's single currency.
///
/// Stored as `NUMERIC(10,2)`; serialized as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of fractional digits.
    pub const MAX_SCALE: u32 = 2;

    /// Largest amount `NUMERIC(10,2)` stores: `99999999.99`.
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, exceeds [`Price::MAX`]
    /// or has more than two decimal places.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        let amount = amount.normalize();
        if amount.scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max: Self::MAX_SCALE,
            });
        }
        Ok(Self(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // CHECK (price > 0) holds in the table
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!("100".parse::<Price>().unwrap().amount(), Decimal::from(100));
        assert_eq!(
            " 4.99 ".parse::<Price>().unwrap().amount(),
            Decimal::new(499, 2)
        );
        assert_eq!(
            "2.50".parse::<Price>().unwrap().amount(),
            Decimal::new(25, 1)
        );
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert_eq!("0".parse::<Price>(), Err(PriceError::NotPositive));
        assert_eq!("-3".parse::<Price>(), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("ten".parse::<Price>(), Err(PriceError::NotANumber));
        assert_eq!("".parse::<Price>(), Err(PriceError::NotANumber));
    }

    #[test]
    fn test_parse_rejects_sub_cent() {
        assert!(matches!(
            "1.005".parse::<Price>(),
            Err(PriceError::TooPrecise { max: 2 })
        ));
    }

    #[test]
    fn test_parse_bounded_by_column() {
        assert_eq!(Price::MAX.to_string(), "99999999.99");
        assert_eq!(
            "99999999.99".parse::<Price>().unwrap().amount(),
            Price::MAX
        );
        assert_eq!(
            "100000000".parse::<Price>(),
            Err(PriceError::TooLarge { max: Price::MAX })
        );
        assert!(serde_json::from_str::<Price>("\"1000000000.00\"").is_err());
    }

    #[test]
    fn test_times() {
        let price: Price = "100".parse().unwrap();
        assert_eq!(price.times(2), Decimal::from(200));
        assert_eq!(price.times(0), Decimal::ZERO);
    }

    #[test]
    fn test_display_two_places() {
        let price: Price = "5".parse().unwrap();
        assert_eq!(price.to_string(), "5.00");
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Price>("\"12.50\"").is_ok());
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}
