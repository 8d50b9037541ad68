//! Clock time-sync handshake
//!
//! `<` marks the board synced straight away. The `,` acknowledgement goes out
//! [`ACK_DELAY`] later, and [`ARM_DELAY`] after that the next sample packet is
//! flagged as the sync-set packet.

use std::time::Duration;

use tokio::time::Instant;

/// Delay from the set-sync-time command to the `,` acknowledgement
pub const ACK_DELAY: Duration = Duration::from_millis(10);
/// Delay from the acknowledgement to arming the sync-set packet
pub const ARM_DELAY: Duration = Duration::from_millis(2);

/// Sync handshake state
#[derive(Debug, Default)]
pub struct TimeSync {
    synced: bool,
    sync_set_armed: bool,
    ack_at: Option<Instant>,
    arm_at: Option<Instant>,
}

impl TimeSync {
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn is_armed(&self) -> bool {
        self.sync_set_armed
    }

    pub fn ack_deadline(&self) -> Option<Instant> {
        self.ack_at
    }

    pub fn arm_deadline(&self) -> Option<Instant> {
        self.arm_at
    }

    /// Handle set-sync-time
    pub fn request(&mut self, now: Instant) {
        self.synced = true;
        self.ack_at = Some(now + ACK_DELAY);
    }

    /// Acknowledgement is due; start the arm timer
    pub fn fire_ack(&mut self) -> bool {
        let Some(ack_at) = self.ack_at.take() else {
            return false;
        };
        self.arm_at = Some(ack_at + ARM_DELAY);
        true
    }

    /// Arm timer is due
    pub fn fire_arm(&mut self) -> bool {
        if self.arm_at.take().is_none() {
            return false;
        }
        self.sync_set_armed = true;
        true
    }

    /// Consume the sync-set flag for the packet being built
    pub fn take_sync_set(&mut self) -> bool {
        std::mem::take(&mut self.sync_set_armed)
    }

    /// Drop pending timers, keeping the synced state
    pub fn cancel(&mut self) {
        self.ack_at = None;
        self.arm_at = None;
    }

    /// Back to unsynced, as on a fresh connection
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
