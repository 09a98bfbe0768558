use rand::Rng;

pub const NO_LEECHERS_MESSAGE: &str = "no leechers detected; upload withheld until leechers appear";

const MAX_LEECHER_FACTOR: f64 = 1.5;

/// Inputs to one step of the simulated transfer.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub previous_downloaded: u64,
    pub total_size: u64,
    pub piece_size: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub interval_secs: u64,
    pub leechers: u64,
    pub wait_for_leechers: bool,
}

/// Unrounded amounts for the next announce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickCandidate {
    pub downloaded: u64,
    pub uploaded: u64,
    pub left: u64,
    pub advisory: Option<&'static str>,
}

pub fn compute_next_tick<R: Rng + ?Sized>(input: &TickInput, rng: &mut R) -> TickCandidate {
    let downloaded = next_download_candidate(input, rng);

    let base = input.upload_speed.saturating_mul(input.interval_secs) as f64;
    let fluctuation: f64 = rng.gen_range(0.8..=1.2);
    let (factor, advisory) = leecher_factor(input.leechers, input.wait_for_leechers);
    let uploaded = (base * fluctuation * factor).floor() as u64;

    TickCandidate {
        downloaded,
        uploaded,
        left: input.total_size - downloaded,
        advisory,
    }
}

fn next_download_candidate<R: Rng + ?Sized>(input: &TickInput, rng: &mut R) -> u64 {
    if input.previous_downloaded >= input.total_size {
        return input.total_size;
    }
    if input.download_speed == 0 {
        return input.previous_downloaded;
    }
    let random_pieces: u64 = rng.gen_range(1..=9);
    input
        .previous_downloaded
        .saturating_add(input.download_speed.saturating_mul(input.interval_secs))
        .saturating_add(input.piece_size.saturating_mul(random_pieces))
        .min(input.total_size)
}

/// More leechers means more upload, capped at +50%.
pub fn leecher_factor(leechers: u64, wait_for_leechers: bool) -> (f64, Option<&'static str>) {
    match (leechers, wait_for_leechers) {
        (0, true) => (0.0, Some(NO_LEECHERS_MESSAGE)),
        (0, false) => (1.0, None),
        (n, _) => ((1.0 + n as f64 / 100.0).min(MAX_LEECHER_FACTOR), None),
    }
}
