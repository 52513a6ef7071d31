//! Deterministic text rendering of a block's header and event lines.
//!
//! Layout (UTF-8, every line `\n`-terminated):
//!
//! ```text
//! Hash of previous block : <previous hash>
//! Block created at <yyyy-MM-dd HH:mm:ss>
//! <arrival ms>|<arrival yyyy-MM-dd HH:mm:ss>|<source>|<doc id>|<doc rev>|<ordinal>
//! ...
//! ```
//!
//! The digest line appended by [`crate::chain::seal`] is not part of this
//! output.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use chainlog_contracts::event::{EpochMillis, Event};

pub const PREVIOUS_HASH_PREFIX: &str = "Hash of previous block : ";
pub const CREATED_AT_PREFIX: &str = "Block created at ";

const FIELD_SEPARATOR: char = '|';
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the header and one line per event, in the order given.
pub fn render(previous_hash: &str, created_at: EpochMillis, events: &[Event], timezone: Tz) -> Vec<u8> {
    let mut out = String::new();

    out.push_str(PREVIOUS_HASH_PREFIX);
    out.push_str(previous_hash);
    out.push('\n');

    out.push_str(CREATED_AT_PREFIX);
    out.push_str(&format_timestamp(created_at, timezone));
    out.push('\n');

    for event in events {
        out.push_str(&render_event_line(event, timezone));
        out.push('\n');
    }

    out.into_bytes()
}

/// One event as a `|`-joined line, without the trailing newline.
pub fn render_event_line(event: &Event, timezone: Tz) -> String {
    let fields = [
        event.arrival_timestamp.to_string(),
        format_timestamp(event.arrival_timestamp, timezone),
        event.source_id.clone().unwrap_or_default(),
        event.document_id.clone().unwrap_or_default(),
        event.document_revision.clone().unwrap_or_default(),
        event.ordinal().to_string(),
    ];
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// `yyyy-MM-dd HH:mm:ss` in `timezone`, second precision.
///
/// Millisecond values outside chrono's representable range render as an
/// empty string.
pub fn format_timestamp(millis: EpochMillis, timezone: Tz) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|utc| utc.with_timezone(&timezone).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}
