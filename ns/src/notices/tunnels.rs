//! Tunnel Tracker - connect/disconnect transitions from `Tunnels` notices

use tracing::debug;

use super::envelope::extract_tunnel_count;

/// A change in connectivity observed on the notice stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TunnelTransition {
    /// At least one tunnel is active
    Connected { count: usize },
    /// No tunnel is active
    Disconnected,
}

/// Follows the `Tunnels` count across records
#[derive(Debug, Default)]
pub struct TunnelTracker {
    last_count: Option<usize>,
}

impl TunnelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one record; returns a transition when connectivity changes
    ///
    /// The first `Tunnels` record always reports its state. Other records are ignored.
    pub fn observe(&mut self, record: &[u8]) -> Option<TunnelTransition> {
        let count = extract_tunnel_count(record)?;
        let was_connected = self.last_count.map(|last| last > 0);
        self.last_count = Some(count);

        let connected = count > 0;
        if was_connected == Some(connected) {
            return None;
        }

        debug!(count, "TunnelTracker::observe: connectivity changed");
        Some(if connected {
            TunnelTransition::Connected { count }
        } else {
            TunnelTransition::Disconnected
        })
    }

    /// Most recent tunnel count, if any `Tunnels` record has been seen
    pub fn last_count(&self) -> Option<usize> {
        self.last_count
    }

    pub fn is_connected(&self) -> bool {
        self.last_count.is_some_and(|count| count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnels(count: usize) -> Vec<u8> {
        format!(r#"{{"noticeType":"Tunnels","showUser":false,"data":{{"count":{count}}},"timestamp":"t"}}"#).into_bytes()
    }

    #[test]
    fn test_first_observation_reports_state() {
        let mut tracker = TunnelTracker::new();
        assert_eq!(tracker.observe(&tunnels(0)), Some(TunnelTransition::Disconnected));

        let mut tracker = TunnelTracker::new();
        assert_eq!(tracker.observe(&tunnels(3)), Some(TunnelTransition::Connected { count: 3 }));
    }

    #[test]
    fn test_disconnect_then_connect() {
        let mut tracker = TunnelTracker::new();
        tracker.observe(&tunnels(0));
        assert!(!tracker.is_connected());
        assert_eq!(tracker.observe(&tunnels(2)), Some(TunnelTransition::Connected { count: 2 }));
        assert!(tracker.is_connected());
        assert_eq!(tracker.observe(&tunnels(0)), Some(TunnelTransition::Disconnected));
    }

    #[test]
    fn test_count_change_while_connected_is_not_a_transition() {
        let mut tracker = TunnelTracker::new();
        tracker.observe(&tunnels(1));
        assert_eq!(tracker.observe(&tunnels(2)), None);
        assert_eq!(tracker.last_count(), Some(2));
    }

    #[test]
    fn test_other_records_ignored() {
        let mut tracker = TunnelTracker::new();
        assert_eq!(tracker.observe(br#"{"noticeType":"Info","data":{"message":"x"}}"#), None);
        assert_eq!(tracker.observe(b"garbage"), None);
        assert_eq!(tracker.last_count(), None);
    }
}
