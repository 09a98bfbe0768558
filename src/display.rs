use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::session::state::SessionState;

const REFRESH: Duration = Duration::from_secs(1);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Console view of a running session, redrawn every second.
pub struct Display {
    header: String,
    state: Arc<Mutex<SessionState>>,
    clear_screen: bool,
}

impl Display {
    /// With `debug` set the screen is never cleared, so log lines stay visible.
    pub fn new(header: String, state: Arc<Mutex<SessionState>>, debug: bool) -> Self {
        Self {
            header,
            state,
            clear_screen: !debug,
        }
    }

    /// Redraws until the session disables the display.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(REFRESH);
        loop {
            ticker.tick().await;
            let snapshot = self.state.lock().clone();
            if !snapshot.display_enabled {
                break;
            }
            let frame = render(&self.header, &snapshot, Instant::now());
            if self.clear_screen {
                print!("{}", CLEAR_SCREEN);
            }
            println!("{}", frame);
        }
    }
}

pub fn render(header: &str, state: &SessionState, now: Instant) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(
        out,
        "seeders: {}  leechers: {}  interval: {}s",
        state.seeders, state.leechers, state.announce_interval
    );
    let elapsed = now.saturating_duration_since(state.started_at).as_secs();
    let _ = writeln!(out, "seeding for {}", format_elapsed(elapsed));
    match state.next_announce_at {
        Some(at) => {
            let remaining = at.saturating_duration_since(now).as_secs();
            let _ = writeln!(out, "next announce in {}", format_countdown(remaining));
        }
        None => {
            let _ = writeln!(out, "next announce: pending");
        }
    }
    let _ = writeln!(out);
    if state.history.is_empty() {
        let _ = writeln!(out, "waiting for the first announce");
    }
    for entry in state.history.iter() {
        let _ = writeln!(
            out,
            "#{:<4} {:<10} down {:>12} ({:>6.2}%)  up {:>12}  left {:>12}",
            entry.sequence,
            entry.status.to_string(),
            format_bytes(entry.downloaded),
            entry.percent_downloaded,
            format_bytes(entry.uploaded),
            format_bytes(entry.left),
        );
    }
    if let Some(message) = &state.last_message {
        let _ = writeln!(out, "\n{}", message);
    }
    out
}

fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::Reported;
    use crate::session::state::{AnnounceEntry, AnnounceStatus};

    fn state() -> SessionState {
        let first = AnnounceEntry::new(
            1,
            AnnounceStatus::Started,
            Reported {
                downloaded: 1536,
                uploaded: 0,
                left: 1536,
            },
            3072,
        );
        let mut state = SessionState::new(first);
        state.commit_pending();
        state.seeders = 12;
        state.leechers = 3;
        state.announce_interval = 1800;
        state
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GiB");
    }

    #[test]
    fn test_render_lists_history_and_counts() {
        let frame = render("sample.bin", &state(), Instant::now());
        assert!(frame.starts_with("sample.bin\n"));
        assert!(frame.contains("seeders: 12  leechers: 3  interval: 1800s"));
        assert!(frame.contains("next announce: pending"));
        assert!(frame.contains("started"));
        assert!(frame.contains("50.00%"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_seeding_time() {
        let state = state();
        tokio::time::advance(Duration::from_secs(3 * 3600 + 61)).await;
        let frame = render("t", &state, Instant::now());
        assert!(frame.contains("seeding for 03:01:01"));
    }

    #[test]
    fn test_render_before_first_announce() {
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
        let frame = render("t", &SessionState::new(first), Instant::now());
        assert!(frame.contains("waiting for the first announce"));
        assert!(frame.contains("seeding for 00:00:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_countdown_and_message() {
        let mut state = state();
        let now = Instant::now();
        state.next_announce_at = Some(now + Duration::from_secs(125));
        state.last_message = Some("tracker says hi".to_string());

        let frame = render("t", &state, now);
        assert!(frame.contains("next announce in 02:05"));
        assert!(frame.ends_with("\ntracker says hi\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_disabled() {
        let mut state = state();
        state.display_enabled = false;
        let display = Display::new("t".to_string(), Arc::new(Mutex::new(state)), true);
        tokio::time::timeout(Duration::from_secs(5), display.run())
            .await
            .unwrap();
    }
}
