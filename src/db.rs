use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::parser::symbols::{Kind, SymbolTable};

/// Dash looks the index up by this file name.
pub const INDEX_FILE: &str = "docSet.dsidx";

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    Ok(conn)
}

/// Table and index names are fixed by the docset format. No `IF NOT EXISTS`:
/// the store must be fresh, and an existing table aborts the run.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE searchIndex(id INTEGER PRIMARY KEY, name TEXT, type TEXT, path TEXT);
        CREATE UNIQUE INDEX anchor ON searchIndex (name, type, path);
        ",
    )
    .context("Failed to create searchIndex (does the index already exist?)")?;
    Ok(())
}

/// Insert all symbols in one transaction. Duplicate (name, type, path)
/// triples are ignored. Returns the number of rows actually written.
pub fn insert_symbols(conn: &Connection, table: &SymbolTable) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO searchIndex(name, type, path) VALUES (?1, ?2, ?3)")?;
        for sym in table.iter() {
            count += stmt.execute(rusqlite::params![sym.name, sym.kind.as_str(), sym.location])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Stats ──

pub fn count_rows(conn: &Connection) -> Result<usize> {
    let n: usize = conn.query_row("SELECT COUNT(*) FROM searchIndex", [], |r| r.get(0))?;
    Ok(n)
}

/// Row count per kind, in `Kind::ALL` order. Types Dash knows but this tool
/// never writes are not reported.
pub fn kind_counts(conn: &Connection) -> Result<Vec<(Kind, usize)>> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM searchIndex WHERE type = ?1")?;
    let mut counts = Vec::with_capacity(Kind::ALL.len());
    for kind in Kind::ALL {
        let n: usize = stmt.query_row([kind.as_str()], |r| r.get(0))?;
        counts.push((kind, n));
    }
    Ok(counts)
}
