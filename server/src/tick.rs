use crate::hub::Hub;
use pong_shared::protocol::ServerMsg;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Delivery counts for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub rooms: usize,
    pub delivered: usize,
    /// Snapshots dropped because a recipient's outbox was full or closed
    pub dropped: usize,
}

/// Advance every active room by `dt` and push each snapshot to its occupants.
///
/// The room list is copied out of the hub first, so matchmaking is never
/// blocked behind simulation. Delivery never waits on a slow recipient.
pub fn tick_rooms(hub: &Hub, dt: f64, now: Instant) -> TickStats {
    let rooms = hub.rooms();
    let mut stats = TickStats {
        rooms: rooms.len(),
        ..Default::default()
    };

    for room in rooms {
        let out = room.advance(dt, now);
        let msg = Arc::new(ServerMsg::State(out.state));
        for recipient in &out.recipients {
            if recipient.send(msg.clone()) {
                stats.delivered += 1;
            } else {
                stats.dropped += 1;
            }
        }
    }

    stats
}

/// Run the fixed-rate tick loop forever.
pub async fn run_tick_driver(hub: Arc<Hub>) {
    let tick_rate_hz = hub.config().tick_rate_hz;
    let dt = hub.config().fixed_dt();
    let mut tick_interval = tokio::time::interval(Duration::from_secs_f64(dt));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!("Tick driver running at {} Hz", tick_rate_hz);

    loop {
        tick_interval.tick().await;
        let stats = tick_rooms(&hub, dt, Instant::now());
        if stats.dropped > 0 {
            tracing::trace!("Dropped {} snapshots for slow consumers", stats.dropped);
        }
    }
}
