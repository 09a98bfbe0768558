//! Presents one client profile's wire fingerprint to the session.

pub mod generator;
pub mod profile;

use rand::Rng;
use std::collections::HashMap;

pub use generator::{Reported, RoundingPolicy};
pub use profile::{ClientProfile, ProfileRegistry, DEFAULT_CLIENT};

/// An emulated client for one session.
///
/// The peer id and key are drawn once at construction and reused for every
/// announce; trackers tie a session to them.
#[derive(Debug, Clone)]
pub struct Emulation {
    profile: ClientProfile,
    peer_id: String,
    key: String,
}

impl Emulation {
    pub fn new<R: Rng + ?Sized>(profile: ClientProfile, rng: &mut R) -> Self {
        let peer_id = profile.peer_id.generate(rng);
        let key = profile.key.generate(rng);
        Self {
            profile,
            peer_id,
            key,
        }
    }

    pub fn code(&self) -> &str {
        &self.profile.code
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn session_key(&self) -> &str {
        &self.key
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.profile.headers
    }

    pub fn query_template(&self) -> &str {
        &self.profile.query_template
    }

    pub fn round(&self, downloaded: u64, uploaded: u64, left: u64, piece_size: u64) -> Reported {
        self.profile
            .rounding
            .round(downloaded, uploaded, left, piece_size)
    }
}
