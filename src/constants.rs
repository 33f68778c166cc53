//! Tunable constants shared across the core.

/// Hard ceiling on seats in any Room, independent of a room's configured `max_players`.
pub const MAX_PLAYERS: usize = 8;

/// Default per-turn think time before the Scheduler auto-acts for a seat.
pub const DEFAULT_TURN_SECONDS: u64 = 30;

/// Wall-clock gap between a hand settling and the next hand's deal.
pub const HAND_GAP_SECONDS: u64 = 5;

/// A `waiting` room with no activity for this long is reaped.
pub const DEFAULT_IDLE_LIMIT_MINUTES: i64 = 30;

/// Reaper warns members once inside this window before expiry.
pub const EXPIRY_WARNING_MINUTES: i64 = 5;

/// Registry reaper sweep interval.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Registry snapshot interval.
pub const DEFAULT_SAVE_INTERVAL_SECS: u64 = 30;

/// Broadcast scheduler sampling rate.
pub const SCHEDULER_TICK_MILLIS: u64 = 1000;

/// Number of completed-hand summaries a Room keeps for `get_game_history`.
pub const HAND_HISTORY_RING_SIZE: usize = 50;

/// Minor-unit scale: chips are tracked as integers in hundredths to avoid float drift.
pub const MINOR_UNITS_PER_CHIP: i64 = 100;

pub fn hand_gap_duration() -> std::time::Duration {
    std::time::Duration::from_secs(HAND_GAP_SECONDS)
}
