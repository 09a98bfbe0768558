pub mod bencode_parser;
pub mod cli;
pub mod config;
pub mod display;
pub mod emulation;
pub mod error;
pub mod session;
pub mod torrent_file;
pub mod tracker;

pub use error::{Result, SpoofError};
