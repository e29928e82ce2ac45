use std::sync::{Arc, Mutex};
use std::time::Instant;

use auv_hw::lock;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

#[derive(Debug, Clone)]
pub struct LinkStatus {
    pub state: LinkState,
    pub last_ping_at: Instant,
    /// Wall-clock time of the last state change, for status reports.
    pub changed_at: OffsetDateTime,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }
}

/// Writable link state. Only the connection supervisor holds one.
#[derive(Debug)]
pub struct LinkHandle {
    inner: Arc<Mutex<LinkStatus>>,
}

/// Read-only view of the link state.
#[derive(Debug, Clone)]
pub struct LinkWatch {
    inner: Arc<Mutex<LinkStatus>>,
}

impl LinkHandle {
    pub fn new(boot: Instant) -> Self {
        let status = LinkStatus {
            state: LinkState::Disconnected,
            last_ping_at: boot,
            changed_at: OffsetDateTime::now_utc(),
        };
        Self { inner: Arc::new(Mutex::new(status)) }
    }

    pub fn watch(&self) -> LinkWatch {
        LinkWatch { inner: self.inner.clone() }
    }

    pub fn snapshot(&self) -> LinkStatus {
        lock(&self.inner).clone()
    }

    pub(crate) fn record_ping(&self, now: Instant) {
        lock(&self.inner).last_ping_at = now;
    }

    /// Returns the previous state.
    pub(crate) fn set_state(&self, state: LinkState) -> LinkState {
        let mut st = lock(&self.inner);
        let prev = st.state;
        if prev != state {
            st.state = state;
            st.changed_at = OffsetDateTime::now_utc();
        }
        prev
    }
}

impl LinkWatch {
    pub fn snapshot(&self) -> LinkStatus {
        lock(&self.inner).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.inner).is_connected()
    }
}
