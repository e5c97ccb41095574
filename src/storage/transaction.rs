//! Transaction Scope (C2): a guarded BEGIN/COMMIT/ROLLBACK bracket.
//!
//! Grounded on the upstream `Transaction` class, which issues `BEGIN` (or a
//! flavor of it) on construction and releases on `commit()`/`end()` or,
//! failing that, on scope exit. Rust's `Drop` is the natural replacement for
//! the upstream's destructor-does-cleanup pattern (§9: "prefer a result type
//! with a dedicated fatal vs recoverable distinction; reserve unwinding for
//! true invariants" — so the fallback rollback-on-drop swallows errors
//! rather than panicking, matching the non-fatal default, while callers who
//! need to observe a release failure should call `commit()`/`end()`
//! explicitly).
//!
//! Nested transactions are not supported; the async worker's single-writer
//! thread enforces this naturally (§4.2).

use rusqlite::Connection;

use crate::error::{DbError, Result};

/// Which transaction bracket a [`Transaction`] opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionMode {
    /// `BEGIN` — acquires a write lock lazily, on first write statement.
    Default,
    /// `BEGIN IMMEDIATE` — acquires the write lock immediately.
    Immediate,
    /// `BEGIN EXCLUSIVE` — acquires an exclusive lock, blocking other readers.
    Exclusive,
    /// Read-only: no write lock is ever requested; released with `END`
    /// rather than `COMMIT`/`ROLLBACK`.
    Selection,
}

impl TransactionMode {
    fn begin_sql(self) -> &'static str {
        match self {
            Self::Default => "BEGIN",
            Self::Immediate => "BEGIN IMMEDIATE",
            Self::Exclusive => "BEGIN EXCLUSIVE",
            Self::Selection => "BEGIN",
        }
    }
}

/// A scoped transaction bracket over a [`rusqlite::Connection`].
///
/// The bracket is opened on construction and released exactly once, either
/// explicitly via [`Transaction::commit`] / [`Transaction::end`], or
/// implicitly on drop (`ROLLBACK` for write modes, `END` for `Selection`).
/// An implicit release that itself fails is logged; it cannot propagate
/// through `Drop`, so callers that must observe release failures should
/// call `commit()`/`end()` explicitly.
pub struct Transaction<'conn> {
    conn: &'conn Connection,
    mode: TransactionMode,
    released: bool,
}

impl<'conn> Transaction<'conn> {
    /// Opens a new transaction bracket in the given mode.
    pub fn begin(conn: &'conn Connection, mode: TransactionMode) -> Result<Self> {
        conn.execute_batch(mode.begin_sql())
            .map_err(|e| DbError::transaction(e.to_string()))?;
        Ok(Self {
            conn,
            mode,
            released: false,
        })
    }

    /// Commits the mutation set. Legal only for non-`Selection` modes.
    pub fn commit(mut self) -> Result<()> {
        assert_ne!(
            self.mode,
            TransactionMode::Selection,
            "commit() is not legal on a Selection (read-only) transaction; use end()"
        );
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::transaction(e.to_string()))?;
        self.released = true;
        Ok(())
    }

    /// Releases a read-only lock. Legal only for `Selection` mode.
    pub fn end(mut self) -> Result<()> {
        assert_eq!(
            self.mode,
            TransactionMode::Selection,
            "end() is only legal on a Selection (read-only) transaction; use commit()"
        );
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::transaction(e.to_string()))?;
        self.released = true;
        Ok(())
    }

    /// The mode this transaction was opened in.
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let sql = match self.mode {
            TransactionMode::Selection => "COMMIT",
            _ => "ROLLBACK",
        };
        if let Err(err) = self.conn.execute_batch(sql) {
            tracing::error!(error = %err, mode = ?self.mode, "failed to release transaction on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_memory() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn commit_persists_writes() {
        let conn = open_memory();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        let txn = Transaction::begin(&conn, TransactionMode::Immediate).unwrap();
        conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
        txn.commit().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn drop_without_commit_rolls_back() {
        let conn = open_memory();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        {
            let _txn = Transaction::begin(&conn, TransactionMode::Immediate).unwrap();
            conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
        }
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn selection_mode_releases_with_end() {
        let conn = open_memory();
        let txn = Transaction::begin(&conn, TransactionMode::Selection).unwrap();
        assert_eq!(txn.mode(), TransactionMode::Selection);
        txn.end().unwrap();
    }
}
