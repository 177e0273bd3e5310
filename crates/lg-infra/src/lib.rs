pub mod identity;
pub mod kv;
pub mod time;

pub use identity::{ChannelIdentitySource, IdentityEvent, IdentityFeed};
pub use kv::{FileKeyValueStore, InMemoryKeyValueStore};
pub use time::SystemClock;
