//! Long-running devnet tasks.

mod events;
mod producer;
mod shard_feed;

pub use events::EventLogHandler;
pub use producer::DevnetProducer;
pub use shard_feed::ShardFeed;
