/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Shift and modification times as reported by the scheduling source.
///
/// The source works in prison-local wall-clock time with no offset, so
/// every timestamp in the pipeline is naive.
pub type LocalTimestamp = chrono::NaiveDateTime;

/// Identifier of a staff member (the source's "quantum id").
pub type UserId = String;

/// Identifier the external source assigns to each modified-detail record.
pub type SourceId = i64;

/// Partition of the external source, polled independently.
pub type Region = u32;
