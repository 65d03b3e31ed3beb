//! # Beacon Events
//!
//! Every notification the beacon chain core emits after a commit.

use serde::{Deserialize, Serialize};
use shared_types::{BeaconBlockSummary, BestStateSummary, CommitteeSnapshot, Hash, ShardId};
use std::collections::BTreeMap;

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeaconEvent {
    /// A beacon block was committed. Consumed by gossip and relays.
    NewBeaconBlock(BeaconBlockSummary),

    /// The canonical best state advanced.
    NewBestState(BestStateSummary),

    /// Committee or pending membership changed in the committed block.
    /// Consumed by the network layer to re-key its committee views.
    CommitteeChanged(CommitteeSnapshot),

    /// Shard summaries up to these heights were folded into a committed
    /// block and may be dropped from the shard-to-beacon pool.
    ShardBlocksConsumed {
        beacon_height: u64,
        heights: BTreeMap<ShardId, u64>,
    },

    /// A candidate block failed validation.
    BlockRejected {
        hash: Hash,
        height: u64,
        /// Error kind label, e.g. `"structural"`.
        kind: String,
        reason: String,
    },
}

impl BeaconEvent {
    /// Topic used for subscription filtering.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::NewBeaconBlock(_) => EventTopic::BeaconBlock,
            Self::NewBestState(_) => EventTopic::BestState,
            Self::CommitteeChanged(_) => EventTopic::Committee,
            Self::ShardBlocksConsumed { .. } => EventTopic::ShardPool,
            Self::BlockRejected { .. } => EventTopic::Rejection,
        }
    }

    /// Beacon height the event refers to.
    pub fn height(&self) -> u64 {
        match self {
            Self::NewBeaconBlock(summary) => summary.height,
            Self::NewBestState(summary) => summary.height,
            Self::CommitteeChanged(snapshot) => snapshot.height,
            Self::ShardBlocksConsumed { beacon_height, .. } => *beacon_height,
            Self::BlockRejected { height, .. } => *height,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    BeaconBlock,
    BestState,
    Committee,
    ShardPool,
    Rejection,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Only events at or above this beacon height.
    pub min_height: Option<u64>,
}

impl EventFilter {
    /// Accept every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept events of the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            min_height: None,
        }
    }

    /// Drop events below `height`.
    #[must_use]
    pub fn from_height(mut self, height: u64) -> Self {
        self.min_height = Some(height);
        self
    }

    #[must_use]
    pub fn matches(&self, event: &BeaconEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let height_match = self.min_height.map_or(true, |min| event.height() >= min);

        topic_match && height_match
    }
}
