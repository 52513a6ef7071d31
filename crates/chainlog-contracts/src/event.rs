//! Audit events as delivered by the upstream source.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type EpochMillis = i64;

/// One audit record pulled from the event source.
///
/// Every string attribute is optional: the source does not guarantee that
/// an event carries all of them, and absent values render as empty fields
/// in the block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// When the source first saw the record.
    pub arrival_timestamp: EpochMillis,

    #[serde(default)]
    pub source_id: Option<String>,

    #[serde(default)]
    pub document_id: Option<String>,

    #[serde(default)]
    pub document_revision: Option<String>,

    /// `"<ordinal>-<opaque-suffix>"`. The suffix is not comparable across
    /// restarts of the source and is discarded.
    #[serde(default)]
    pub sequence_token: Option<String>,
}

impl Event {
    /// The portion of `sequence_token` before the first `-`.
    ///
    /// A token without `-` is returned whole. An absent token yields `""`.
    pub fn ordinal(&self) -> &str {
        let token = self.sequence_token.as_deref().unwrap_or_default();
        match token.split_once('-') {
            Some((ordinal, _)) => ordinal,
            None => token,
        }
    }
}
