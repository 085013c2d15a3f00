//! Application state types.

use chrono::{DateTime, Utc};

use super::actions::AppAction;
use crate::db::models::HomeSnapshot;
use crate::history::RingBuffer;
use crate::profiles::ConnectionProfile;

/// Transient UI feedback: status messages, errors, and pending actions
#[derive(Debug, Default)]
pub struct UiFeedback {
    pub status_message: Option<String>,
    /// Successful refreshes the status message outlives.
    status_grace: u8,
    pub last_error: Option<String>,
    pub pending_action: Option<AppAction>,
}

impl UiFeedback {
    /// Show `msg` through the next successful refresh; the one after clears it.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_grace = 1;
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
        self.status_grace = 0;
    }

    /// Called on every successful refresh.
    pub fn expire_status(&mut self) {
        if self.status_grace > 0 {
            self.status_grace -= 1;
        } else {
            self.status_message = None;
        }
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.last_error = Some(msg.into());
    }
}

/// Connection information (read-only after construction)
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    pub profile: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub ssl_mode: Option<String>,
    pub server_version: Option<String>,
}

impl ConnectionInfo {
    pub fn from_profile(profile: &ConnectionProfile) -> Self {
        Self {
            profile: profile.name.clone(),
            host: profile.host.clone(),
            port: profile.port,
            database: profile.database.clone(),
            user: profile.user.clone(),
            ssl_mode: None,
            server_version: None,
        }
    }

    /// `host:port/database`
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Lightweight copy of the counters needed for the next delta
struct PrevCommits {
    timestamp: DateTime<Utc>,
    total_commits: i64,
}

/// Commit throughput history behind the Home sparkline
pub struct Throughput {
    pub samples: RingBuffer<u64>,
    pub current: Option<f64>,
    prev: Option<PrevCommits>,
}

impl Throughput {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: RingBuffer::new(capacity.max(1)),
            current: None,
            prev: None,
        }
    }

    /// Fold one Home refresh into the rate history. The first sample only
    /// primes the counter; a counter that went backwards re-primes it.
    pub fn record(&mut self, snap: &HomeSnapshot) {
        if let Some(prev) = &self.prev {
            let secs = snap
                .timestamp
                .signed_duration_since(prev.timestamp)
                .num_milliseconds() as f64
                / 1000.0;
            let commits = snap.total_commits - prev.total_commits;
            // Guard against stats reset
            if secs > 0.0 && commits >= 0 {
                let tps = commits as f64 / secs;
                self.current = Some(tps);
                self.samples.push(tps as u64);
            }
        }
        self.prev = Some(PrevCommits {
            timestamp: snap.timestamp,
            total_commits: snap.total_commits,
        });
    }

    pub const fn has_rate(&self) -> bool {
        self.current.is_some()
    }
}
