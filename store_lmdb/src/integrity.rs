//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the platform begins
//! serving operations.

use heed::Env;
use tradefin_store::Table;

use crate::LmdbError;

/// Summary of an integrity check run.
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub missing: Vec<&'static str>,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected and every table exists.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty() && self.missing.is_empty()
    }
}

/// Check LMDB database integrity on startup.
///
/// Opens the named database of every [`Table`] and counts its entries. Read
/// failures and missing databases are recorded in the report rather than
/// causing a hard error.
pub fn check_integrity(env: &Env) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        missing: Vec::new(),
        errors: Vec::new(),
    };

    let rtxn = env.read_txn()?;

    for table in Table::ALL {
        let name = table.name();
        match env.open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", name, e)),
                }
            }
            Ok(None) => report.missing.push(name),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", name, e)),
        }
    }

    if !report.is_healthy() {
        tracing::warn!(
            missing = report.missing.len(),
            errors = report.errors.len(),
            "LMDB integrity check found problems"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbStore;

    #[test]
    fn fresh_store_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
        let report = check_integrity(store.env()).unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.databases_checked as usize, Table::ALL.len());
        // schema version entry
        assert_eq!(report.total_entries, 1);
    }

    #[test]
    fn unhealthy_report() {
        let report = IntegrityReport {
            databases_checked: 5,
            total_entries: 100,
            missing: vec!["escrows"],
            errors: Vec::new(),
        };
        assert!(!report.is_healthy());
    }
}
