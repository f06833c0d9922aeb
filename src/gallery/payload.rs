//! Self-contained `data:` URIs for artifact payloads

use crate::error::{BoothError, BoothResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// MIME type of a data URI, without parameters (`video/webm;codecs=vp9` -> `video/webm`)
pub fn mime_of(uri: &str) -> Option<&str> {
    let header = uri.strip_prefix("data:")?.split(',').next()?;
    let mime = header.split(';').next()?.trim();
    (!mime.is_empty()).then_some(mime)
}

/// Split a data URI into its full media type and decoded bytes
pub fn decode_data_uri(uri: &str) -> BoothResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| BoothError::invalid_payload("missing 'data:' prefix"))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| BoothError::invalid_payload("missing ',' separator"))?;

    let Some(media_type) = header.strip_suffix(";base64") else {
        return Err(BoothError::invalid_payload(
            "only base64 data URIs are supported",
        ));
    };

    let bytes = STANDARD
        .decode(data)
        .map_err(|e| BoothError::invalid_payload(format!("bad base64 data: {e}")))?;

    Ok((media_type.to_string(), bytes))
}

/// File extension for a MIME type
pub fn extension_for(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or(mime).trim() {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}
