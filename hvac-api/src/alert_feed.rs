//! In-process fan-out of newly raised alerts.
//!
//! One broadcast channel is shared by every workspace; subscribers filter on
//! `workspace_id`. Nothing is persisted here, a subscriber only sees alerts
//! raised after it subscribed.

use rocket::tokio::sync::broadcast::{self, Receiver, Sender};

use crate::models::Alert;

const FEED_CAPACITY: usize = 256;

pub struct AlertFeed {
    sender: Sender<Alert>,
}

impl AlertFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        AlertFeed { sender }
    }

    /// Returns how many subscribers received the alert.
    pub fn publish(&self, alert: Alert) -> usize {
        // Err only means nobody is listening
        self.sender.send(alert).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Receiver<Alert> {
        self.sender.subscribe()
    }
}

impl Default for AlertFeed {
    fn default() -> Self {
        Self::new()
    }
}
