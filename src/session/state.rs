use std::fmt;

use super::history::AnnounceHistory;
use crate::emulation::Reported;

pub const DEFAULT_NUM_WANT: u32 = 200;

/// Announce state machine. `Update` goes on the wire as an empty event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceStatus {
    Started,
    Update,
    Completed,
    Stopped,
}

impl AnnounceStatus {
    pub fn as_event(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Update => "",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for AnnounceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Update => "update",
            other => other.as_event(),
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnounceEntry {
    pub sequence: u64,
    pub status: AnnounceStatus,
    pub downloaded: u64,
    pub uploaded: u64,
    pub left: u64,
    pub percent_downloaded: f64,
}

impl AnnounceEntry {
    pub fn new(sequence: u64, status: AnnounceStatus, reported: Reported, total_size: u64) -> Self {
        Self {
            sequence,
            status,
            downloaded: reported.downloaded,
            uploaded: reported.uploaded,
            left: reported.left,
            percent_downloaded: if total_size == 0 {
                0.0
            } else {
                reported.downloaded as f64 / total_size as f64 * 100.0
            },
        }
    }

    pub fn reported(&self) -> Reported {
        Reported {
            downloaded: self.downloaded,
            uploaded: self.uploaded,
            left: self.left,
        }
    }
}

/// Everything the session knows, shared between the scheduler, the
/// shutdown path and the display. Clones are used as read-only snapshots.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Status of the last announce the tracker accepted.
    pub status: AnnounceStatus,
    pub announce_interval: u64,
    pub seeders: u64,
    pub leechers: u64,
    pub num_want: u32,
    pub last_message: Option<String>,
    pub history: AnnounceHistory,
    /// The next announce, computed but not yet delivered.
    pub pending: Option<AnnounceEntry>,
    pub next_announce_at: Option<tokio::time::Instant>,
    pub started_at: tokio::time::Instant,
    pub display_enabled: bool,
}

impl SessionState {
    pub fn new(first: AnnounceEntry) -> Self {
        Self {
            status: first.status,
            announce_interval: 0,
            seeders: 0,
            leechers: 0,
            num_want: DEFAULT_NUM_WANT,
            last_message: None,
            history: AnnounceHistory::new(),
            pending: Some(first),
            next_announce_at: None,
            started_at: tokio::time::Instant::now(),
            display_enabled: true,
        }
    }

    /// Moves the pending entry into the history once its announce went out.
    pub fn commit_pending(&mut self) -> Option<AnnounceEntry> {
        let entry = self.pending.take()?;
        self.status = entry.status;
        self.history.push(entry);
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_is_empty_on_the_wire() {
        assert_eq!(AnnounceStatus::Update.as_event(), "");
        assert_eq!(AnnounceStatus::Update.to_string(), "update");
        assert_eq!(AnnounceStatus::Completed.as_event(), "completed");
        assert_eq!(AnnounceStatus::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_entry_percent() {
        let reported = Reported {
            downloaded: 102400,
            uploaded: 0,
            left: 102400,
        };
        let entry = AnnounceEntry::new(1, AnnounceStatus::Started, reported, 204800);
        assert_eq!(entry.percent_downloaded, 50.0);
        assert_eq!(entry.reported(), reported);
    }

    #[test]
    fn test_commit_pending() {
        let first = AnnounceEntry::new(
            1,
            AnnounceStatus::Started,
            Reported {
                downloaded: 0,
                uploaded: 0,
                left: 10,
            },
            10,
        );
        let mut state = SessionState::new(first);
        assert!(state.history.is_empty());
        assert_eq!(state.commit_pending(), Some(first));
        assert_eq!(state.history.back().map(|e| e.sequence), Some(1));
        assert!(state.pending.is_none());
        assert_eq!(state.commit_pending(), None);
    }
}
