//! Local audio duration extraction
//!
//! Decoding happens on the client before the upload finishes; a file lofty cannot parse
//! simply yields no duration.

use std::io::Cursor;

use bytes::Bytes;
use lofty::error::LoftyResult;
use lofty::prelude::*;
use lofty::probe::Probe;

/// Duration in seconds, or `None` if the bytes cannot be decoded
pub fn audio_duration(data: &[u8]) -> Option<f64> {
    match read_duration(data) {
        Ok(duration) => duration,
        Err(e) => {
            tracing::debug!(error = %e, size_bytes = data.len(), "Could not read audio duration");
            None
        }
    }
}

/// Reads the duration on the blocking pool
pub async fn audio_duration_blocking(data: Bytes) -> Option<f64> {
    tokio::task::spawn_blocking(move || audio_duration(&data))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Audio duration task failed");
            None
        })
}

fn read_duration(data: &[u8]) -> LoftyResult<Option<f64>> {
    let tagged_file = Probe::new(Cursor::new(data)).guess_file_type()?.read()?;
    let duration = tagged_file.properties().duration();
    if duration.is_zero() {
        return Ok(None);
    }
    Ok(Some(duration.as_secs_f64()))
}
