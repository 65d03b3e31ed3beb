//! Bus event logging.

use shared_bus::{BeaconEvent, Subscription};
use shared_types::to_hex;
use tracing::{debug, info, warn};

/// Logs every beacon event it receives until the bus goes away.
pub struct EventLogHandler {
    subscription: Subscription,
}

impl EventLogHandler {
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Returns the number of events handled.
    pub async fn run(mut self) -> u64 {
        let mut handled = 0;
        while let Some(event) = self.subscription.recv().await {
            log_event(&event);
            handled += 1;
        }
        if self.subscription.lagged() > 0 {
            warn!(lagged = self.subscription.lagged(), "Event log fell behind the bus");
        }
        debug!(handled, "Event bus closed");
        handled
    }
}

fn log_event(event: &BeaconEvent) {
    match event {
        BeaconEvent::NewBeaconBlock(summary) => info!(
            height = summary.height,
            epoch = summary.epoch,
            hash = %to_hex(&summary.hash),
            producer = %summary.producer,
            instructions = summary.instruction_count,
            "[bus] New beacon block"
        ),
        BeaconEvent::NewBestState(best) => debug!(
            height = best.height,
            random = best.current_random_number,
            committee = best.beacon_committee_size,
            pending = best.beacon_pending_size,
            "[bus] Best state advanced"
        ),
        BeaconEvent::CommitteeChanged(snapshot) => info!(
            height = snapshot.height,
            beacon_committee = snapshot.beacon_committee.len(),
            beacon_pending = snapshot.beacon_pending.len(),
            shard_pending = snapshot.shard_pending.values().map(Vec::len).sum::<usize>(),
            "[bus] Committee changed"
        ),
        BeaconEvent::ShardBlocksConsumed {
            beacon_height,
            heights,
        } => debug!(beacon_height, ?heights, "[bus] Shard blocks consumed"),
        BeaconEvent::BlockRejected {
            height,
            kind,
            reason,
            ..
        } => warn!(height, kind = %kind, reason = %reason, "[bus] Block rejected"),
    }
}
