/// Identifier of the synthetic root unit, created before any other unit
pub const ROOT_UNIT_ID: &str = "root";

/// Submission-mode value marking a unit as no longer accepting material
pub const SUBMISSIONS_RETIRED: &str = "retired";

/// Open/close markers delimiting one record fragment in the stream
pub const FRAGMENT_OPEN: &str = "<document";
pub const FRAGMENT_CLOSE: &str = "</document>";

/// Defaults applied when a record omits the corresponding field
pub const DEFAULT_STATUS: &str = "unknown";
pub const DEFAULT_RIGHTS: &str = "public";
pub const DEFAULT_DATE: &str = "1900-01-01";

/// Base ordering for inherited unit-item rows, so they always sort after
/// direct rows. Opaque tie-break carried over from the legacy exporter;
/// not meant to be interpreted beyond "comes after".
pub const INDIRECT_ORDER_BASE: i64 = 1000;

/// Progress update interval (tick every N records)
pub const PROGRESS_INTERVAL: u64 = 1000;
