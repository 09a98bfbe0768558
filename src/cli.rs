use clap::Parser;
use std::path::PathBuf;

use crate::emulation::DEFAULT_CLIENT;
use crate::error::{Result, SpoofError};

#[derive(Parser, Debug, Clone)]
#[command(name = "ratio-spoof")]
#[command(about = "Announces believable torrent progress to a tracker without transferring data")]
pub struct Args {
    /// Torrent file to announce
    #[arg(short = 't', long = "torrent", required_unless_present = "list_clients")]
    pub torrent: Option<PathBuf>,

    /// Initial downloaded percentage and download speed, e.g. 50%:1mbps
    #[arg(short = 'd', long = "download", default_value = "100%:0kbps")]
    pub download: String,

    /// Initial uploaded percentage and upload speed, e.g. 0%:512kbps
    #[arg(short = 'u', long = "upload", default_value = "0%:0kbps")]
    pub upload: String,

    /// Client to emulate
    #[arg(short = 'c', long = "client", default_value = DEFAULT_CLIENT)]
    pub client: String,

    /// Port reported to the tracker
    #[arg(short = 'p', long = "port", default_value_t = 8999, allow_negative_numbers = true)]
    pub port: i64,

    /// Withhold upload while the tracker reports no leechers
    #[arg(long = "wait-leechers")]
    pub wait_for_leechers: bool,

    #[arg(long = "debug")]
    pub debug: bool,

    /// Failed announce attempts tolerated before giving up
    #[arg(long = "max-attempts", default_value_t = 10)]
    pub max_attempts: u32,

    /// Seed for the progress jitter and identifier generation
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Print the available client codes and exit
    #[arg(long = "list-clients")]
    pub list_clients: bool,
}

/// Splits `<percentage>:<speed>`. A bare speed takes `default_percentage`.
pub fn split_rate_argument<'a>(
    param: &'a str,
    default_percentage: &'a str,
) -> Result<(&'a str, &'a str)> {
    let parts: Vec<&str> = param.split(':').collect();
    match parts.as_slice() {
        [speed] if is_speed(speed) => Ok((default_percentage, *speed)),
        [percentage, speed] => Ok((*percentage, *speed)),
        _ => Err(SpoofError::Configuration(format!(
            "invalid parameter format: {}",
            param
        ))),
    }
}

fn is_speed(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.ends_with("kbps") || lower.ends_with("mbps")
}
