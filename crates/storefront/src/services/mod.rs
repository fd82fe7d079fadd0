//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Signup, passcode and password login, Google sign-in, bearer tokens
//! - `email` - OTP mail delivery with the in-response fallback
//! - `google` - Google ID token verification
//! - `media` - Sticker image upload and deletion on the CDN
//! - `catalog` - Sticker CRUD
//! - `cart` - Per-user cart lines
//! - `orders` - Order placement and status lifecycle
//!
//! Services borrow the pool (and whichever integrations they need) for the
//! duration of one request.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod google;
pub mod media;
pub mod orders;
