//! Identity notification source adapters.

mod channel_source;

pub use channel_source::{ChannelIdentitySource, IdentityEvent, IdentityFeed};
