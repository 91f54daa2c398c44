//! Session signals
//!
//! The host app publishes identity changes, demo toggles and lifecycle
//! events on a [`SignalHub`]. The entitlements facade subscribes and runs a
//! resolution pass for each one (see
//! [`UnifiedEntitlements::spawn_signal_listener`](crate::UnifiedEntitlements::spawn_signal_listener)).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

use crate::identity::Identity;

/// Something happened that may change what the user is entitled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionSignal {
    /// Signed in, signed out or switched user
    IdentityChanged {
        /// New identity; `None` on sign-out
        identity: Option<Identity>,
    },

    /// Demo mode switched on or off
    DemoModeToggled {
        /// Whether demo mode is now on
        enabled: bool,
    },

    /// The native app returned to the foreground
    AppForegrounded,

    /// Something outside the engine asked for fresh entitlements,
    /// e.g. a checkout completing
    RefreshRequested,
}

impl SessionSignal {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionSignal::IdentityChanged { .. } => "identity_changed",
            SessionSignal::DemoModeToggled { .. } => "demo_mode_toggled",
            SessionSignal::AppForegrounded => "app_foregrounded",
            SessionSignal::RefreshRequested => "refresh_requested",
        }
    }
}

/// Signal hub statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalHubStats {
    /// Signals published
    pub signals_published: u64,
    /// Deliveries to subscribers, summed over signals
    pub signals_delivered: u64,
    /// Current subscribers
    pub active_subscribers: usize,
}

/// In-process broadcast of [`SessionSignal`]s.
pub struct SignalHub {
    sender: broadcast::Sender<SessionSignal>,
    published: AtomicU64,
    delivered: AtomicU64,
    capacity: usize,
}

impl std::fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalHub")
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl SignalHub {
    /// Create a hub with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            capacity,
        }
    }

    /// Publish a signal, returning how many subscribers received it.
    ///
    /// Publishing with no subscribers is not an error; the signal is dropped.
    pub fn publish(&self, signal: SessionSignal) -> usize {
        self.published.fetch_add(1, Ordering::SeqCst);
        let kind = signal.kind();

        let receivers = self.sender.send(signal).unwrap_or(0);
        self.delivered.fetch_add(receivers as u64, Ordering::SeqCst);

        debug!(signal = kind, receivers, "Published session signal");
        receivers
    }

    /// Subscribe to signals published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.sender.subscribe()
    }

    /// Get hub stats.
    pub fn stats(&self) -> SignalHubStats {
        SignalHubStats {
            signals_published: self.published.load(Ordering::SeqCst),
            signals_delivered: self.delivered.load(Ordering::SeqCst),
            active_subscribers: self.sender.receiver_count(),
        }
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}
