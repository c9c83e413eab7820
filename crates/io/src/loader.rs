//! Per-source loaders. Thin orchestration over the canonicalizer: every
//! failure mode degrades to an empty table so the engine stays usable with
//! 0, 1, 2, or 3 sources present.

use std::path::Path;

use tracing::warn;

use dialsight_recon::model::FeedKind;
use dialsight_recon::schema::{
    canonicalize_call_log, canonicalize_roster, canonicalize_validation,
};
use dialsight_recon::{CallLogTable, RawTable, RosterTable, ValidationTable};

use crate::table::read_raw_table;

pub fn load_call_log(path: &Path) -> CallLogTable {
    let Some(raw) = read_source(path) else {
        return CallLogTable::default();
    };
    match canonicalize_call_log(&raw) {
        Ok(table) => table,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "call log rejected, using empty table");
            CallLogTable::default()
        }
    }
}

pub fn load_roster(path: &Path) -> RosterTable {
    let Some(raw) = read_source(path) else {
        return RosterTable::default();
    };
    match canonicalize_roster(&raw) {
        Ok(table) => table,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "roster rejected, using empty table");
            RosterTable::default()
        }
    }
}

/// Load both validation feeds and concatenate them. No dedup: the same
/// number in both feeds stays duplicated, and the join fans out over it.
pub fn load_validation(with_live_path: &Path, without_live_path: &Path) -> ValidationTable {
    let mut table = ValidationTable::default();
    let feeds = [
        (with_live_path, FeedKind::WithLive),
        (without_live_path, FeedKind::WithoutLive),
    ];
    for (path, feed) in feeds {
        let Some(raw) = read_source(path) else { continue };
        match canonicalize_validation(&raw, feed) {
            Ok(feed_table) => table.records.extend(feed_table.records),
            Err(e) => {
                warn!(path = %path.display(), %feed, error = %e, "validation feed rejected, skipping");
            }
        }
    }
    table
}

/// Shared read policy: missing, empty, or unreadable files all yield `None`.
fn read_source(path: &Path) -> Option<RawTable> {
    if !path.exists() {
        warn!(path = %path.display(), "source file missing, using empty table");
        return None;
    }
    match read_raw_table(path) {
        Ok(raw) if raw.is_empty() => {
            warn!(path = %path.display(), "source file empty, using empty table");
            None
        }
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "source file unreadable, using empty table");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
