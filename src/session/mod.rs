//! The announce loop: state machine, simulated progress and shutdown.

pub mod history;
pub mod progress;
pub mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::emulation::{Emulation, Reported};
use crate::error::{Result, SpoofError};
use crate::torrent_file::TorrentFile;
use crate::tracker::Announcer;
use progress::{compute_next_tick, TickInput};
use state::{AnnounceEntry, AnnounceStatus, SessionState};

pub struct Session<A> {
    torrent: TorrentFile,
    config: SessionConfig,
    emulation: Emulation,
    tracker: A,
    state: Arc<Mutex<SessionState>>,
    rng: Mutex<StdRng>,
}

impl<A: Announcer + 'static> Session<A> {
    /// The first announce carries the configured amounts as-is.
    pub fn new(
        torrent: TorrentFile,
        config: SessionConfig,
        emulation: Emulation,
        tracker: A,
        rng: StdRng,
    ) -> Self {
        let downloaded = config.initial_downloaded.min(torrent.total_size);
        let first = AnnounceEntry::new(
            1,
            AnnounceStatus::Started,
            Reported {
                downloaded,
                uploaded: config.initial_uploaded,
                left: torrent.total_size - downloaded,
            },
            torrent.total_size,
        );

        Self {
            torrent,
            config,
            emulation,
            tracker,
            state: Arc::new(Mutex::new(SessionState::new(first))),
            rng: Mutex::new(rng),
        }
    }

    pub fn torrent(&self) -> &TorrentFile {
        &self.torrent
    }

    pub fn emulation(&self) -> &Emulation {
        &self.emulation
    }

    /// Handle for readers that only need snapshots.
    pub fn shared_state(&self) -> Arc<Mutex<SessionState>> {
        Arc::clone(&self.state)
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Runs until `shutdown` resolves or a fatal error occurs.
    ///
    /// On shutdown the scheduler task is aborted and joined before a
    /// best-effort `stopped` announce is sent. The worker must not touch the
    /// state once the stopped entry is queued.
    pub async fn run<S>(self: Arc<Self>, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        self.fire_announce(true).await?;

        let mut worker = tokio::spawn(Arc::clone(&self).schedule_loop());
        tokio::select! {
            joined = &mut worker => match joined {
                Ok(result) => result,
                Err(e) => Err(SpoofError::Scheduler(e.to_string())),
            },
            _ = shutdown => {
                worker.abort();
                if let Err(e) = (&mut worker).await {
                    if !e.is_cancelled() {
                        warn!(error = %e, "Announce worker failed during shutdown");
                    }
                }
                self.shutdown().await;
                Ok(())
            }
        }
    }

    async fn schedule_loop(self: Arc<Self>) -> Result<()> {
        loop {
            let interval = self.prepare_next_tick();
            tokio::time::sleep(Duration::from_secs(interval)).await;
            self.fire_announce(true).await?;
        }
    }

    /// Computes the next announce and queues it as pending. Returns the
    /// interval to wait before sending it.
    pub fn prepare_next_tick(&self) -> u64 {
        let mut state = self.state.lock();
        let previous = match state.history.back() {
            Some(entry) => *entry,
            None => return state.announce_interval,
        };

        let input = TickInput {
            previous_downloaded: previous.downloaded,
            total_size: self.torrent.total_size,
            piece_size: self.torrent.piece_size,
            download_speed: self.config.download_speed,
            upload_speed: self.config.upload_speed,
            interval_secs: state.announce_interval,
            leechers: state.leechers,
            wait_for_leechers: self.config.wait_for_leechers,
        };
        let candidate = compute_next_tick(&input, &mut *self.rng.lock());
        let reported = self.emulation.round(
            candidate.downloaded,
            candidate.uploaded,
            candidate.left,
            self.torrent.piece_size,
        );
        debug!(?candidate, ?reported, "Computed next announce");

        let total = self.torrent.total_size;
        let status = if reported.downloaded == total && previous.downloaded < total {
            AnnounceStatus::Completed
        } else if matches!(state.status, AnnounceStatus::Started | AnnounceStatus::Completed) {
            AnnounceStatus::Update
        } else {
            state.status
        };

        if let Some(advisory) = candidate.advisory {
            warn!("{}", advisory);
        }
        state.last_message = candidate.advisory.map(str::to_string);
        state.pending = Some(AnnounceEntry::new(
            previous.sequence + 1,
            status,
            reported,
            total,
        ));
        state.next_announce_at =
            tokio::time::Instant::now().checked_add(Duration::from_secs(state.announce_interval));
        state.announce_interval
    }

    /// Sends the pending announce and, once the tracker took it, records it.
    pub async fn fire_announce(&self, retry: bool) -> Result<()> {
        let (query, entry) = {
            let state = self.state.lock();
            let entry = match state.pending {
                Some(entry) => entry,
                None => return Ok(()),
            };
            (self.build_query(&entry, state.num_want), entry)
        };

        info!(
            sequence = entry.sequence,
            event = %entry.status,
            downloaded = entry.downloaded,
            uploaded = entry.uploaded,
            left = entry.left,
            "Announcing"
        );
        let response = self
            .tracker
            .announce(&query, self.emulation.headers(), retry)
            .await?;

        let mut state = self.state.lock();
        state.commit_pending();
        if let Some(response) = response {
            info!(
                interval = response.interval,
                seeders = response.seeders,
                leechers = response.leechers,
                "Tracker responded"
            );
            state.seeders = response.seeders;
            state.leechers = response.leechers;
            state.announce_interval = response.interval;
            if let Some(warning) = response.warning {
                warn!(%warning, "Tracker warning");
                state.last_message = Some(warning);
            }
        }
        Ok(())
    }

    /// Substitutes the profile's query placeholders for `entry`.
    pub fn build_query(&self, entry: &AnnounceEntry, num_want: u32) -> String {
        let replacements = [
            ("{infohash}", self.torrent.info_hash_url_encoded()),
            ("{port}", self.config.port.to_string()),
            ("{peerid}", urlencoding::encode(self.emulation.peer_id()).into_owned()),
            ("{uploaded}", entry.uploaded.to_string()),
            ("{downloaded}", entry.downloaded.to_string()),
            ("{left}", entry.left.to_string()),
            ("{key}", urlencoding::encode(self.emulation.session_key()).into_owned()),
            ("{event}", entry.status.as_event().to_string()),
            ("{numwant}", num_want.to_string()),
        ];
        substitute(self.emulation.query_template(), &replacements)
    }

    /// Sends the terminal `stopped` announce. Failures are logged and ignored.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            state.display_enabled = false;
            state.num_want = 0;
            state.next_announce_at = None;
            let last = match state.history.back() {
                Some(entry) => *entry,
                None => return,
            };
            state.pending = Some(AnnounceEntry::new(
                last.sequence + 1,
                AnnounceStatus::Stopped,
                last.reported(),
                self.torrent.total_size,
            ));
        }

        info!("Sending stopped announce");
        if let Err(e) = self.fire_announce(false).await {
            error!(error = %e, "Stopped announce failed");
        }
    }
}

// Single left-to-right pass so substituted values are never re-scanned.
fn substitute(template: &str, replacements: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + 128);
    let mut rest = template;
    'scan: while !rest.is_empty() {
        if rest.starts_with('{') {
            for (placeholder, value) in replacements {
                if let Some(tail) = rest.strip_prefix(placeholder) {
                    out.push_str(value);
                    rest = tail;
                    continue 'scan;
                }
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}
