//! Wire encoding for event batches
//!
//! JSON array of events, zlib-compressed, then standard base64.

use crate::{ChangeEvent, Result};
use base64::prelude::*;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Encode events into the `msg` field of a file-changes POST
pub fn encode_events(events: &[ChangeEvent]) -> Result<String> {
    let json = serde_json::to_vec(events)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    Ok(BASE64_STANDARD.encode(compressed))
}

/// Decode the `msg` field of a file-changes POST
pub fn decode_events(msg: &str) -> Result<Vec<ChangeEvent>> {
    let compressed = BASE64_STANDARD.decode(msg.trim())?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;

    Ok(serde_json::from_slice(&json)?)
}
