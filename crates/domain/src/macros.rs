//! Macro for implementing Display and FromStr for closed domain enums
//!
//! Configuration values such as the auth mode or deployment environment are
//! read from strings. This macro provides both conversions from a single
//! variant table, with case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use pricelink_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Region {
//!     Emea,
//!     Americas,
//! }
//!
//! impl_domain_enum_conversions!(Region {
//!     Emea => "emea",
//!     Americas => "americas",
//! });
//!
//! assert_eq!("EMEA".parse::<Region>(), Ok(Region::Emea));
//! assert_eq!(Region::Americas.to_string(), "americas");
//! ```

/// Implements Display and FromStr traits for closed domain enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their canonical lowercase string
/// - FromStr trait: parses case-insensitive, whitespace-trimmed strings
///
/// Parsing failures return a `String` naming the enum and the rejected
/// value; callers wrap it into their own error type.
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
