pub mod content;
pub mod dom;
pub mod index_page;
pub mod symbols;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::Settings;
use crate::db;
use symbols::SymbolTable;

#[derive(Debug, Default)]
pub struct IndexCounts {
    pub symbols: usize,
    pub pages: usize,
    pub anchors: usize,
    pub refined: usize,
    pub rows: usize,
}

/// Build the search index for the HTML pages in `html_dir`, annotating the
/// content pages in place.
///
/// Order matters: the schema is created first so a stale index aborts the run
/// before any page is touched, and the symbol table is complete before the
/// first content page is scanned.
pub fn index_documents(conn: &Connection, html_dir: &Path, settings: &Settings) -> Result<IndexCounts> {
    db::create_schema(conn)?;

    let mut table = index_page::load(&html_dir.join(&settings.index_page))?;
    if table.is_empty() {
        warn!("No symbols found in {}", settings.index_page);
    } else {
        info!("Found {} symbols in {}", table.len(), settings.index_page);
    }

    let pages = content_pages(html_dir, &settings.content_pattern)?;
    let mut counts = annotate_pages(&pages, &mut table)?;

    counts.symbols = table.len();
    counts.rows = db::insert_symbols(conn, &table)?;
    Ok(counts)
}

/// Only `pattern` is glob syntax; the directory part is matched literally.
fn content_pages(html_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = Path::new(&glob::Pattern::escape(&html_dir.to_string_lossy())).join(pattern);
    let pattern = full.to_string_lossy();
    let mut pages = glob::glob(&pattern)
        .with_context(|| format!("Bad content page pattern {:?}", pattern))?
        .collect::<Result<Vec<_>, _>>()?;
    pages.sort();
    Ok(pages)
}

fn annotate_pages(pages: &[PathBuf], table: &mut SymbolTable) -> Result<IndexCounts> {
    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut counts = IndexCounts {
        pages: pages.len(),
        ..Default::default()
    };
    for page in pages {
        if let Some(name) = page.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        let report = content::annotate_file(page, table)?;
        counts.anchors += report.injected;
        counts.refined += report.refined;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Annotated {} pages ({} anchors, {} kinds refined)",
        counts.pages, counts.anchors, counts.refined
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy_fixtures(dir: &Path) {
        for entry in std::fs::read_dir("tests/fixtures/html").unwrap() {
            let path = entry.unwrap().path();
            std::fs::copy(&path, dir.join(path.file_name().unwrap())).unwrap();
        }
    }

    fn rows(conn: &Connection) -> Vec<(String, String, String)> {
        let mut stmt = conn
            .prepare("SELECT name, type, path FROM searchIndex ORDER BY id")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn fixture_index_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        copy_fixtures(dir.path());
        let conn = Connection::open_in_memory().unwrap();

        let counts = index_documents(&conn, dir.path(), &Settings::default()).unwrap();
        assert_eq!(counts.symbols, 6);
        assert_eq!(counts.pages, 3);
        assert_eq!(counts.anchors, 6);
        assert_eq!(counts.rows, 6);

        let got = rows(&conn);
        let kind = |name: &str| got.iter().find(|r| r.0 == name).map(|r| r.1.as_str());
        assert_eq!(kind("igraph_add_edge"), Some("Function"));
        assert_eq!(kind("igraph_neimode_t"), Some("Enum"));
        assert_eq!(kind("igraph_vector_t"), Some("Struct"));
        assert_eq!(kind("igraph_vector_init"), Some("Function"));
        assert_eq!(kind("IGRAPH_VECTOR_NULL"), Some("Define"));
        assert_eq!(kind("igraph_rngtype_mt19937"), Some("Type"));

        // the index page itself is not a content page
        let ix = std::fs::read_to_string(dir.path().join("ix01.html")).unwrap();
        assert!(!ix.contains("dashAnchor"));
    }

    #[test]
    fn directory_name_with_glob_characters() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("docs [v1]*?");
        std::fs::create_dir(&dir).unwrap();
        copy_fixtures(&dir);
        let conn = Connection::open_in_memory().unwrap();

        let counts = index_documents(&conn, &dir, &Settings::default()).unwrap();
        assert_eq!(counts.pages, 3);
        assert_eq!(counts.anchors, 6);
    }

    #[test]
    fn two_symbol_scenario() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ix01.html"),
            r#"<dl><dt> <a href="a.html#igraph_vector_t">igraph_vector_t</a></dt>
               <dt> <a href="b.html#igraph_add_edge">igraph_add_edge</a></dt></dl>"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.html"),
            "<div class=\"section\"><div class=\"titlepage\"><div><div><h3>\
             <a name=\"igraph_vector_t\"></a></h3></div></div></div>\
             <pre>typedef struct { double *stor; } igraph_vector_t;</pre></div>",
        )
        .unwrap();

        let settings = Settings {
            content_pattern: "*.html".into(),
            ..Settings::default()
        };
        let conn = Connection::open_in_memory().unwrap();
        index_documents(&conn, dir.path(), &settings).unwrap();

        assert_eq!(
            rows(&conn),
            [
                (
                    "igraph_vector_t".to_string(),
                    "Struct".to_string(),
                    "a.html#igraph_vector_t".to_string()
                ),
                (
                    "igraph_add_edge".to_string(),
                    "Function".to_string(),
                    "b.html#igraph_add_edge".to_string()
                ),
            ]
        );
    }

    #[test]
    fn stale_index_aborts_before_pages_change() {
        let dir = tempfile::tempdir().unwrap();
        copy_fixtures(dir.path());
        let conn = Connection::open_in_memory().unwrap();
        db::create_schema(&conn).unwrap();

        assert!(index_documents(&conn, dir.path(), &Settings::default()).is_err());
        let page = std::fs::read_to_string(dir.path().join("igraph-Basic.html")).unwrap();
        assert!(!page.contains("dashAnchor"));
    }
}
