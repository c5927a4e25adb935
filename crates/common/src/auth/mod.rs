//! Authentication infrastructure
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  AuthStrategy   │  Basic | OAuth2 | Unsupported
//! └────────┬────────┘
//!          │
//!          └──► TokenManager       (cache + single-flight refresh)
//!                    │
//!                    └──► TokenSource  (client-credentials grant, stubs)
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `TokenSet`, `TokenResponse`
//! - **[`traits`]**: `TokenSource`
//! - **[`token_manager`]**: token lifecycle with expiry margin
//! - **[`strategy`]**: per-request header production

pub mod strategy;
pub mod token_manager;
pub mod traits;
pub mod types;

pub use strategy::{AuthHeaders, AuthStrategy, BasicCredentials};
pub use token_manager::TokenManager;
pub use traits::TokenSource;
pub use types::{TokenResponse, TokenSet};
