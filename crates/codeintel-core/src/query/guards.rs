//! Shared guardrails for query payload bounds and traversal limits.

pub const MAX_QUERY_LENGTH: usize = 256;
pub const DEFAULT_UPLOAD_PAGE_SIZE: i64 = 50;
pub const MAX_UPLOAD_PAGE_SIZE: i64 = 1000;
pub const MAX_TRAVERSAL_DISTANCE: u32 = 500;
pub const MAX_CURSOR_LENGTH: usize = 4096;

pub fn clamp_int(value: i64, minimum: i64, maximum: i64) -> i64 {
    value.max(minimum).min(maximum)
}

pub fn clamp_limit(value: i64, maximum: i64) -> i64 {
    clamp_int(value, 1, maximum)
}

/// Trim a free-text query and cut it to [`MAX_QUERY_LENGTH`] bytes without
/// splitting a character. Blank queries become `None`.
pub fn truncate_query(query: &str) -> Option<String> {
    let stripped = query.trim();
    if stripped.is_empty() {
        return None;
    }
    if stripped.len() <= MAX_QUERY_LENGTH {
        return Some(stripped.to_string());
    }
    let mut end = MAX_QUERY_LENGTH;
    while !stripped.is_char_boundary(end) {
        end -= 1;
    }
    Some(stripped[..end].to_string())
}
