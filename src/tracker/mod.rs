mod http;
mod retry;

pub use http::HttpTracker;
pub use retry::RetryPolicy;

use crate::bencode_parser::{parse_bencode, BencodeValue};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Performs one announce exchange with a tracker.
///
/// With `retry` set, transient failures are retried until the policy's budget
/// runs out. Without it, any failure yields `Ok(None)`.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(
        &self,
        query: &str,
        headers: &HashMap<String, String>,
        retry: bool,
    ) -> Result<Option<TrackerResponse>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerResponse {
    /// Seconds until the next announce, already raised to `min interval`.
    pub interval: u64,
    pub seeders: u64,
    pub leechers: u64,
    pub warning: Option<String>,
}

pub(crate) fn parse_tracker_response(response_bytes: &[u8]) -> std::result::Result<TrackerResponse, String> {
    let (bencode_response, _) = parse_bencode(response_bytes)
        .map_err(|e| format!("Undecodable tracker response: {}", e))?;

    let response_dict = match bencode_response {
        BencodeValue::Dictionary(dict) => dict,
        _ => return Err("Invalid tracker response format".to_string()),
    };

    if let Some(reason) = response_dict.get("failure reason") {
        let reason = reason.as_string().unwrap_or_default();
        return Err(format!("Tracker rejected announce: {}", reason));
    }

    let interval = match response_dict.get("interval").and_then(BencodeValue::as_integer) {
        Some(interval) if interval > 0 => interval as u64,
        _ => return Err("Invalid or missing interval in tracker response".to_string()),
    };
    let min_interval = response_dict
        .get("min interval")
        .and_then(BencodeValue::as_integer)
        .filter(|&v| v > 0)
        .map(|v| v as u64)
        .unwrap_or(0);
    let count = |key: &str| {
        response_dict
            .get(key)
            .and_then(BencodeValue::as_integer)
            .map(|v| v.max(0) as u64)
            .unwrap_or(0)
    };

    Ok(TrackerResponse {
        interval: interval.max(min_interval),
        seeders: count("complete"),
        leechers: count("incomplete"),
        warning: response_dict
            .get("warning message")
            .and_then(BencodeValue::as_string),
    })
}
