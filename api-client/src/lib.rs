//! REST client for the bookmark server
//!
//! The bookmark store only depends on the [`BookmarkApi`] and
//! [`SessionProvider`] traits; [`HttpBookmarkApi`] is the production
//! implementation.

pub mod traits;
pub mod session;
pub mod http;

pub use traits::*;
pub use session::TokenSession;
pub use http::HttpBookmarkApi;
