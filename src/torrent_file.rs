use crate::bencode_parser::{parse_bencode, raw_dictionary_value, BencodeValue};
use crate::error::{Result, SpoofError};
use sha1::{Digest, Sha1};
use std::{collections::HashMap, fmt, path::Path};
use url::Url;

/// The parts of a torrent's metadata needed to announce it.
#[derive(Debug, Clone)]
pub struct TorrentFile {
    pub name: String,
    pub total_size: u64,
    pub piece_size: u64,
    /// Announce URLs in preference order, `announce` first.
    pub announce_urls: Vec<String>,
    pub info_hash: [u8; 20],
}

impl TorrentFile {
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bencoded(&data)
    }

    pub fn from_bencoded(data: &[u8]) -> Result<Self> {
        let (bencode, _) = parse_bencode(data).map_err(SpoofError::Torrent)?;
        let dict = match bencode {
            BencodeValue::Dictionary(dict) => dict,
            _ => return Err(torrent_error("Invalid torrent file format")),
        };

        let info_dict = match dict.get("info") {
            Some(BencodeValue::Dictionary(dict)) => dict,
            _ => return Err(torrent_error("Missing or invalid info dictionary")),
        };

        let piece_size = extract_positive(info_dict, "piece length")?;
        let total_size = total_size(info_dict)?;
        let name = info_dict
            .get("name")
            .and_then(BencodeValue::as_string)
            .unwrap_or_default();

        let announce_urls = announce_urls(&dict)?;

        let raw_info = raw_dictionary_value(data, "info").map_err(SpoofError::Torrent)?;
        let info_hash = Sha1::digest(raw_info).into();

        Ok(Self {
            name,
            total_size,
            piece_size,
            announce_urls,
            info_hash,
        })
    }

    pub fn info_hash_url_encoded(&self) -> String {
        urlencoding::encode_binary(&self.info_hash).into_owned()
    }

    pub fn info_hash_hex(&self) -> String {
        hex::encode(self.info_hash)
    }
}

fn torrent_error(message: &str) -> SpoofError {
    SpoofError::Torrent(message.to_string())
}

fn extract_positive(dict: &HashMap<String, BencodeValue>, key: &str) -> Result<u64> {
    match dict.get(key).and_then(BencodeValue::as_integer) {
        Some(value) if value > 0 => Ok(value as u64),
        _ => Err(SpoofError::Torrent(format!("Missing or invalid {}", key))),
    }
}

fn total_size(info: &HashMap<String, BencodeValue>) -> Result<u64> {
    if info.contains_key("length") {
        return extract_positive(info, "length");
    }
    let files = match info.get("files") {
        Some(BencodeValue::List(files)) if !files.is_empty() => files,
        _ => return Err(torrent_error("Missing length and files")),
    };
    let mut total: u64 = 0;
    for file in files {
        let length = match file {
            BencodeValue::Dictionary(file) => file.get("length").and_then(BencodeValue::as_integer),
            _ => None,
        };
        match length {
            Some(length) if length >= 0 => total += length as u64,
            _ => return Err(torrent_error("Invalid file entry length")),
        }
    }
    if total == 0 {
        return Err(torrent_error("Torrent has no content"));
    }
    Ok(total)
}

fn announce_urls(dict: &HashMap<String, BencodeValue>) -> Result<Vec<String>> {
    let mut candidates = Vec::new();
    if let Some(announce) = dict.get("announce").and_then(BencodeValue::as_string) {
        candidates.push(announce);
    }
    if let Some(BencodeValue::List(tiers)) = dict.get("announce-list") {
        for tier in tiers {
            if let BencodeValue::List(urls) = tier {
                candidates.extend(urls.iter().filter_map(BencodeValue::as_string));
            }
        }
    }

    let mut urls: Vec<String> = Vec::new();
    for candidate in candidates {
        let supported = Url::parse(&candidate)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);
        if supported && !urls.contains(&candidate) {
            urls.push(candidate);
        }
    }

    if urls.is_empty() {
        return Err(torrent_error("No HTTP(S) announce URL found"));
    }
    Ok(urls)
}

impl fmt::Display for TorrentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Torrent: {}\n\
             Total size: {} bytes\n\
             Piece size: {} bytes\n\
             Trackers: {}\n\
             Info hash: {}",
            self.name,
            self.total_size,
            self.piece_size,
            self.announce_urls.join(", "),
            self.info_hash_hex()
        )
    }
}
