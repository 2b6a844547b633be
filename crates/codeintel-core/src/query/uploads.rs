//! Cursor-paginated upload listing.

use tracing::debug;

use crate::config::Config;
use crate::errors::CodeIntelResult;
use crate::models::{UploadFilter, UploadPage};
use crate::query::cursor::{decode_cursor, encode_cursor, CursorState};
use crate::query::guards::{clamp_limit, MAX_UPLOAD_PAGE_SIZE};
use crate::store::database::Database;

/// List uploads newest-first.
///
/// When `after` is given, the filter stored in the cursor replaces `filter`;
/// only `limit` is taken from the current request. Rows inserted after a
/// cursor was issued have larger ids and therefore never show up on later
/// pages of that traversal.
pub fn list_uploads(
    db: &Database,
    config: &Config,
    filter: &UploadFilter,
    limit: Option<i64>,
    after: Option<&str>,
) -> CodeIntelResult<UploadPage> {
    let max_page_size = config.max_page_size.min(MAX_UPLOAD_PAGE_SIZE);
    let limit = clamp_limit(limit.unwrap_or(config.default_page_size), max_page_size);

    let (filter, before_id) = match after {
        Some(token) => {
            let state = decode_cursor(token)?;
            if &state.filter != filter {
                debug!("cursor filter differs from request filter, using cursor filter");
            }
            (state.filter, Some(state.after_id))
        }
        None => (filter.clone(), None),
    };

    let total_count = db.count_uploads(&filter)?;
    // One extra row tells us whether another page exists.
    let mut uploads = db.select_upload_page(&filter, before_id, limit.saturating_add(1))?;
    let has_more = uploads.len() as i64 > limit;
    uploads.truncate(limit as usize);

    let next_cursor = match (has_more, uploads.last()) {
        (true, Some(last)) => Some(encode_cursor(&CursorState::new(filter.clone(), last.id))?),
        _ => None,
    };

    debug!(
        returned = uploads.len(),
        total_count,
        has_more,
        "listed uploads"
    );
    Ok(UploadPage {
        uploads,
        next_cursor,
        total_count,
    })
}
