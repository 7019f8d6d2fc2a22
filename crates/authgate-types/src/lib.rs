//! Data model for Authgate.
//!
//! This crate defines the values that the session layer stores in the cache
//! and hands back to callers:
//!
//! - **Identity** ([`UserId`], [`Platform`], [`SessionId`]): who is logged
//!   in, and from where.
//! - **Records** ([`SessionInfo`], [`ResetTicket`]): what lives behind each
//!   cache key.
//! - **Results** ([`TokenInfo`], [`TokenVerify`]): what the coordinator
//!   returns after issuing or checking a token.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how records become cache
//!   bytes and back.
//!
//! # Architecture
//!
//! ```text
//! Cache (bytes) → Types (SessionInfo, ResetTicket) → Session (coordinator)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::CodecError;
pub use types::{
    BlockState, Platform, ResetTicket, SessionId, SessionInfo, TokenInfo,
    TokenVerify, UserBaseInfo, UserId,
};
