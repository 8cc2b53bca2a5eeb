//! # Read-Modify-Write
//!
//! Serializes concurrent writers of the same record (the coordinator's
//! driving task, the reconciler, operators) through optimistic concurrency.

use crate::domain::{StoreError, TransactionRecord};
use crate::ports::TransactionStore;
use shared_types::RecordId;
use tracing::debug;

/// Attempts before a persistent conflict is surfaced.
pub const MAX_MODIFY_ATTEMPTS: u32 = 8;

/// Load `id`, apply `f`, and write back; on a version conflict re-read and
/// try again.
///
/// `f` sees the freshest stored copy on every attempt and may return an
/// error to abort without writing. Returns the stored record and `f`'s
/// value.
pub fn modify<T, F>(
    store: &dyn TransactionStore,
    id: RecordId,
    mut f: F,
) -> Result<(TransactionRecord, T), StoreError>
where
    F: FnMut(&mut TransactionRecord) -> Result<T, StoreError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut record = store.get(id)?.ok_or(StoreError::NotFound(id))?;
        let value = f(&mut record)?;

        match store.update(&record) {
            Ok(stored) => return Ok((stored, value)),
            Err(e) if e.is_conflict() && attempt < MAX_MODIFY_ATTEMPTS => {
                debug!(record_id = %id, attempt, "[sl-02] Version conflict, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}
