use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Settings;
use crate::db;
use crate::error::Error;
use crate::parser::{self, IndexCounts};

/// Paths inside `<name>.docset`.
pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new(root: PathBuf) -> Self {
        Layout { root }
    }

    pub fn contents(&self) -> PathBuf {
        self.root.join("Contents")
    }

    pub fn resources(&self) -> PathBuf {
        self.contents().join("Resources")
    }

    pub fn documents(&self) -> PathBuf {
        self.resources().join("Documents")
    }

    pub fn index(&self) -> PathBuf {
        self.resources().join(db::INDEX_FILE)
    }
}

/// Assemble `<work_dir>/<name>.docset` from the HTML in `html_dir` and index
/// it. An existing docset is deleted first.
pub fn create(settings: &Settings, html_dir: &Path) -> Result<IndexCounts> {
    if !html_dir.is_dir() {
        return Err(Error::MissingDocs(html_dir.to_path_buf()).into());
    }
    info!("Creating docset ...");

    let layout = Layout::new(settings.docset_dir());
    if layout.root.is_dir() {
        warn!("Deleting existing docset {:?}", layout.root);
        std::fs::remove_dir_all(&layout.root)
            .with_context(|| format!("Failed to remove {:?}", layout.root))?;
    }

    let documents = layout.documents();
    std::fs::create_dir_all(&documents)
        .with_context(|| format!("Failed to create {:?}", documents))?;
    let copied = copy_files(html_dir, &documents)?;
    info!("Copied {} files into {:?}", copied, documents);

    copy_asset(settings, "Info.plist", &layout.contents())?;
    copy_asset(settings, "icon.png", &layout.root)?;

    let conn = db::connect(&layout.index())?;
    let counts = parser::index_documents(&conn, &documents, settings)
        .context("Failed to build the search index")?;
    info!("Indexed {} symbols into {:?}", counts.rows, layout.index());
    Ok(counts)
}

/// Copy the regular files directly inside `from` (no recursion).
fn copy_files(from: &Path, to: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(from).with_context(|| format!("Failed to read {:?}", from))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            std::fs::copy(&path, to.join(name))
                .with_context(|| format!("Failed to copy {:?}", path))?;
            count += 1;
        }
    }
    Ok(count)
}

pub(crate) fn copy_asset(settings: &Settings, name: &str, dest_dir: &Path) -> Result<()> {
    let src = settings.assets_dir.join(name);
    std::fs::copy(&src, dest_dir.join(name))
        .with_context(|| format!("Failed to copy {:?} into {:?}", src, dest_dir))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(work: &Path) -> Settings {
        Settings {
            work_dir: work.to_path_buf(),
            assets_dir: PathBuf::from("tests/fixtures/assets"),
            ..Settings::default()
        }
    }

    #[test]
    fn builds_layout_and_index() {
        let work = tempfile::tempdir().unwrap();
        let s = settings(work.path());
        let counts = create(&s, Path::new("tests/fixtures/html")).unwrap();
        assert_eq!(counts.rows, 6);

        let layout = Layout::new(s.docset_dir());
        assert!(layout.contents().join("Info.plist").is_file());
        assert!(layout.root.join("icon.png").is_file());
        assert!(layout.documents().join("style.css").is_file());
        assert!(layout.documents().join("ix01.html").is_file());

        let conn = db::connect(&layout.index()).unwrap();
        assert_eq!(db::count_rows(&conn).unwrap(), 6);

        // source pages stay pristine, the copies carry the anchors
        let src = std::fs::read_to_string("tests/fixtures/html/igraph-Basic.html").unwrap();
        assert!(!src.contains("dashAnchor"));
        let copy = std::fs::read_to_string(layout.documents().join("igraph-Basic.html")).unwrap();
        assert!(copy.contains("//apple_ref/cpp/Enum/igraph_neimode_t"));
    }

    #[test]
    fn rebuild_replaces_existing_docset() {
        let work = tempfile::tempdir().unwrap();
        let s = settings(work.path());
        create(&s, Path::new("tests/fixtures/html")).unwrap();
        let marker = Layout::new(s.docset_dir()).documents().join("leftover.txt");
        std::fs::write(&marker, "x").unwrap();

        let counts = create(&s, Path::new("tests/fixtures/html")).unwrap();
        assert_eq!(counts.rows, 6);
        assert!(!marker.exists());
    }

    #[test]
    fn missing_html_dir() {
        let work = tempfile::tempdir().unwrap();
        assert!(create(&settings(work.path()), &work.path().join("nope")).is_err());
    }
}
