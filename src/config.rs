use crate::cli::{split_rate_argument, Args};
use crate::error::{Result, SpoofError};

const MIN_PORT: i64 = 1;
const MAX_PORT: i64 = 65535;

/// User settings with every value resolved against the torrent's size.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub initial_downloaded: u64,
    pub initial_uploaded: u64,
    /// Bytes per second.
    pub download_speed: u64,
    pub upload_speed: u64,
    pub port: u16,
    pub client_code: String,
    pub wait_for_leechers: bool,
    pub debug: bool,
}

impl SessionConfig {
    pub fn resolve(args: &Args, total_size: u64) -> Result<Self> {
        let (downloaded, download_speed) = split_rate_argument(&args.download, "100%")?;
        let (uploaded, upload_speed) = split_rate_argument(&args.upload, "0%")?;

        Ok(Self {
            initial_downloaded: parse_initial_bytes(downloaded, total_size)?,
            initial_uploaded: parse_initial_bytes(uploaded, total_size)?,
            download_speed: parse_speed(download_speed)?,
            upload_speed: parse_speed(upload_speed)?,
            port: validate_port(args.port)?,
            client_code: args.client.clone(),
            wait_for_leechers: args.wait_for_leechers,
            debug: args.debug,
        })
    }
}

fn config_error(message: &str) -> SpoofError {
    SpoofError::Configuration(message.to_string())
}

/// `"50%"` of `total_bytes`, floored.
pub fn parse_initial_bytes(input: &str, total_bytes: u64) -> Result<u64> {
    let percent = input
        .strip_suffix('%')
        .ok_or_else(|| config_error("initial value must be in percentage"))?;
    let percent: f64 = percent
        .parse()
        .map_err(|_| config_error("invalid percentage value"))?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(config_error("percentage must be between 0 and 100"));
    }
    Ok((total_bytes as f64 * percent / 100.0) as u64)
}

/// `"1kbps"` is 1024 bytes per second, `"1mbps"` is 1024 * 1024.
pub fn parse_speed(input: &str) -> Result<u64> {
    let lower = input.to_ascii_lowercase();
    let (value, multiplier) = if let Some(value) = lower.strip_suffix("kbps") {
        (value, 1024.0)
    } else if let Some(value) = lower.strip_suffix("mbps") {
        (value, 1024.0 * 1024.0)
    } else {
        return Err(config_error("speed must be in [kbps mbps]"));
    };
    let value: f64 = value
        .parse()
        .map_err(|_| config_error("invalid speed number"))?;
    if value < 0.0 {
        return Err(config_error("speed can not be negative"));
    }
    Ok((value * multiplier) as u64)
}

pub fn validate_port(port: i64) -> Result<u16> {
    if !(MIN_PORT..=MAX_PORT).contains(&port) {
        return Err(SpoofError::Configuration(format!(
            "port number must be between {} and {}",
            MIN_PORT, MAX_PORT
        )));
    }
    Ok(port as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn message(result: Result<u64>) -> String {
        match result {
            Err(SpoofError::Configuration(m)) => m,
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_initial_bytes() {
        assert_eq!(parse_initial_bytes("50%", 204800).unwrap(), 102400);
        assert_eq!(parse_initial_bytes("0%", 204800).unwrap(), 0);
        assert_eq!(parse_initial_bytes("100%", 204800).unwrap(), 204800);
        assert_eq!(parse_initial_bytes("12.5%", 1000).unwrap(), 125);
    }

    #[test]
    fn test_initial_bytes_errors() {
        assert_eq!(
            message(parse_initial_bytes("150%", 204800)),
            "percentage must be between 0 and 100"
        );
        assert_eq!(
            message(parse_initial_bytes("-50%", 204800)),
            "percentage must be between 0 and 100"
        );
        assert_eq!(
            message(parse_initial_bytes("50kb", 204800)),
            "initial value must be in percentage"
        );
        assert_eq!(
            message(parse_initial_bytes("abc%", 204800)),
            "invalid percentage value"
        );
    }

    #[test]
    fn test_speed() {
        assert_eq!(parse_speed("1kbps").unwrap(), 1024);
        assert_eq!(parse_speed("1mbps").unwrap(), 1024 * 1024);
        assert_eq!(parse_speed("1.5MBPS").unwrap(), 1572864);
        assert_eq!(parse_speed("0kbps").unwrap(), 0);
    }

    #[test]
    fn test_speed_errors() {
        assert_eq!(message(parse_speed("100")), "speed must be in [kbps mbps]");
        assert_eq!(message(parse_speed("xkbps")), "invalid speed number");
        assert_eq!(message(parse_speed("-1kbps")), "speed can not be negative");
    }

    #[test]
    fn test_port_range() {
        assert_eq!(validate_port(8999).unwrap(), 8999);
        assert!(validate_port(0).is_err());
        assert!(validate_port(65536).is_err());
    }

    #[test]
    fn test_resolve_from_args() {
        let args = Args::try_parse_from([
            "ratio-spoof", "-t", "x.torrent", "-d", "50%:1kbps", "-u", "2mbps",
        ])
        .unwrap();
        let config = SessionConfig::resolve(&args, 204800).unwrap();
        assert_eq!(config.initial_downloaded, 102400);
        assert_eq!(config.download_speed, 1024);
        assert_eq!(config.initial_uploaded, 0);
        assert_eq!(config.upload_speed, 2 * 1024 * 1024);
        assert_eq!(config.port, 8999);
    }

    #[test]
    fn test_resolve_rejects_bad_port() {
        let args = Args::try_parse_from(["ratio-spoof", "-t", "x.torrent", "-p", "0"]).unwrap();
        assert!(matches!(
            SessionConfig::resolve(&args, 100),
            Err(SpoofError::Configuration(_))
        ));
    }
}
