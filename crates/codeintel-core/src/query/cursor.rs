//! Opaque pagination cursors and relay-style upload identifiers.
//!
//! A cursor token is `base64url(crc32_be(json) ++ json)` where `json` is a
//! versioned [`CursorState`]. The checksum makes arbitrary or truncated
//! strings fail to decode with overwhelming probability instead of parsing
//! into some unrelated state. The page size is never part of the state.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::errors::{CodeIntelError, CodeIntelResult};
use crate::models::UploadFilter;
use crate::query::guards::MAX_CURSOR_LENGTH;

pub const CURSOR_VERSION: u32 = 1;

const CHECKSUM_LEN: usize = 4;
const UPLOAD_ID_PREFIX: &str = "LSIFUpload:";

/// Everything needed to resume an upload listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "f")]
    pub filter: UploadFilter,
    /// Id of the last upload already returned; the next page starts below it.
    #[serde(rename = "a")]
    pub after_id: i64,
}

impl CursorState {
    pub fn new(filter: UploadFilter, after_id: i64) -> Self {
        Self {
            version: CURSOR_VERSION,
            filter,
            after_id,
        }
    }
}

pub fn encode_cursor(state: &CursorState) -> CodeIntelResult<String> {
    let json = serde_json::to_vec(state)?;
    let mut payload = Vec::with_capacity(CHECKSUM_LEN + json.len());
    payload.extend_from_slice(&crc32fast::hash(&json).to_be_bytes());
    payload.extend_from_slice(&json);
    Ok(URL_SAFE_NO_PAD.encode(payload))
}

pub fn decode_cursor(token: &str) -> CodeIntelResult<CursorState> {
    let invalid = |reason: &str| CodeIntelError::InvalidCursor(reason.to_string());

    if token.len() > MAX_CURSOR_LENGTH {
        return Err(invalid("token too long"));
    }
    let payload = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| invalid("not base64"))?;
    if payload.len() <= CHECKSUM_LEN {
        return Err(invalid("truncated"));
    }
    let (checksum, json) = payload.split_at(CHECKSUM_LEN);
    let mut expected = [0u8; CHECKSUM_LEN];
    expected.copy_from_slice(checksum);
    if crc32fast::hash(json) != u32::from_be_bytes(expected) {
        return Err(invalid("checksum mismatch"));
    }
    let state: CursorState =
        serde_json::from_slice(json).map_err(|e| invalid(&format!("malformed state: {e}")))?;
    if state.version != CURSOR_VERSION {
        return Err(invalid(&format!("unsupported version {}", state.version)));
    }
    Ok(state)
}

/// Opaque id handed to clients for an upload: `base64("LSIFUpload:<id>")`.
pub fn marshal_upload_id(id: i64) -> String {
    STANDARD.encode(format!("{UPLOAD_ID_PREFIX}{id}"))
}

pub fn unmarshal_upload_id(token: &str) -> CodeIntelResult<i64> {
    let invalid = |reason: &str| CodeIntelError::InvalidUploadId(reason.to_string());
    let raw = STANDARD.decode(token.trim()).map_err(|_| invalid("not base64"))?;
    let text = String::from_utf8(raw).map_err(|_| invalid("not utf-8"))?;
    let id = text
        .strip_prefix(UPLOAD_ID_PREFIX)
        .ok_or_else(|| invalid("wrong kind"))?;
    id.parse::<i64>().map_err(|_| invalid("id is not a number"))
}
