//! Row ids.
//!
//! Every table uses a `SERIAL` key. Wrapping each in its own type keeps a
//! sticker id from being passed where an order id is expected.

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Key of `storefront.user`.
    UserId
);
row_id!(
    /// Key of `storefront.sticker`.
    StickerId
);
row_id!(
    /// Key of `storefront.customer_order`.
    OrderId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_bare_number() {
        let id = StickerId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let parsed: StickerId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_conversions() {
        let id = OrderId::from(7);
        assert_eq!(id.as_i32(), 7);
        assert_eq!(i32::from(id), 7);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_ids_order_numerically() {
        let mut ids = vec![UserId::new(10), UserId::new(2), UserId::new(7)];
        ids.sort();
        assert_eq!(ids, [UserId::new(2), UserId::new(7), UserId::new(10)]);
    }
}
