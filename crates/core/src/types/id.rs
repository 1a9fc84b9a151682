//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_str_id!` macro to create type-safe wrappers around the
//! string identifiers handed out by external systems (the print provider's
//! product/variant ids, Solana transaction signatures, wallet addresses).
//! The wrappers prevent accidentally mixing identifiers from different
//! systems.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
/// - `Display`
///
/// # Example
///
/// ```rust
/// # use dinero_store_core::define_str_id;
/// define_str_id!(ProductId);
/// define_str_id!(TxSignature);
///
/// let product = ProductId::new("5d39b159e7c48c000728c89f");
/// let sig = TxSignature::new("5wHu1qwD7q5ifaN5nwdcDqNFo53GJqa7nLp2BeeEpcHCusb4GzARz4GjgzsEHMkBMgCJMuKGEh24Kfq2bcWVKdnc");
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = sig;
/// ```
#[macro_export]
macro_rules! define_str_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_str_id!(ProductId);
define_str_id!(VariantId);
define_str_id!(TxSignature);
define_str_id!(WalletAddress);

impl TxSignature {
    /// Short form used as a human-facing order number (first 8 characters).
    #[must_use]
    pub fn order_number(&self) -> &str {
        let end = self.as_str().len().min(8);
        self.as_str().get(..end).unwrap_or_default()
    }
}
