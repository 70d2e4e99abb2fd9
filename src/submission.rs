use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::config::Settings;
use crate::docset::copy_asset;
use crate::error::Error;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\})").unwrap()
});

/// Substitute `$name` / `${name}` placeholders; `$$` is a literal `$`.
/// Unknown names are an error, a `$` not followed by a name is kept as is.
pub fn render_template(template: &str, version: &str, revision: u32) -> Result<String, Error> {
    let revision = revision.to_string();
    let mut unknown = None;
    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures| {
        if caps.get(1).is_some() {
            return "$".to_string();
        }
        let name = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        match name {
            "version" => version.to_string(),
            "revision" => revision.clone(),
            other => {
                unknown.get_or_insert_with(|| other.to_string());
                String::new()
            }
        }
    });
    match unknown {
        Some(placeholder) => Err(Error::Template { placeholder }),
        None => Ok(rendered.into_owned()),
    }
}

/// Lay out a Dash-User-Contributions submission in `<work_dir>/submission`.
/// The docset must already exist.
pub fn create(settings: &Settings, version: &str, revision: u32) -> Result<PathBuf> {
    info!("Creating Dash submission ...");

    let dir = settings.submission_dir();
    if dir.is_dir() {
        warn!("Deleting existing submission directory {:?}", dir);
        std::fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {:?}", dir))?;
    }
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let template_path = settings.assets_dir.join("docset.json");
    let template = std::fs::read_to_string(&template_path)
        .with_context(|| format!("Failed to read {:?}", template_path))?;
    let manifest = render_template(&template, version, revision)
        .with_context(|| format!("Failed to render {:?}", template_path))?;
    std::fs::write(dir.join("docset.json"), manifest)?;

    let archive = dir.join(format!("{}.tgz", settings.docset_name));
    archive_docset(&settings.docset_dir(), &archive)?;

    copy_asset(settings, "README.md", &dir)?;
    copy_asset(settings, "icon.png", &dir)?;
    Ok(dir)
}

/// gzip tar of the docset directory, entries rooted at `<name>.docset/`.
fn archive_docset(docset_dir: &Path, archive: &Path) -> Result<()> {
    let root_name = docset_dir
        .file_name()
        .with_context(|| format!("Invalid docset path {:?}", docset_dir))?;
    let file = File::create(archive).with_context(|| format!("Failed to create {:?}", archive))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(root_name, docset_dir)
        .with_context(|| format!("Failed to archive {:?}", docset_dir))?;
    builder.into_inner()?.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_placeholder_forms() {
        let out = render_template("v=${version}/r$revision cost $$5 $", "0.10.13", 2).unwrap();
        assert_eq!(out, "v=0.10.13/r2 cost $5 $");
    }

    #[test]
    fn unknown_placeholder_fails() {
        let err = render_template("$name", "1", 0).unwrap_err();
        assert!(matches!(err, Error::Template { ref placeholder } if placeholder == "name"));
    }

    #[test]
    fn submission_layout() {
        let work = tempfile::tempdir().unwrap();
        let settings = Settings {
            work_dir: work.path().to_path_buf(),
            assets_dir: PathBuf::from("tests/fixtures/assets"),
            ..Settings::default()
        };
        let docs = settings.docset_dir().join("Contents/Resources/Documents");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("index.html"), "<html></html>").unwrap();

        let dir = create(&settings, "0.10.13", 0).unwrap();
        let manifest = std::fs::read_to_string(dir.join("docset.json")).unwrap();
        assert!(manifest.contains("\"version\": \"0.10.13/r0\""));
        assert!(dir.join("README.md").is_file());
        assert!(dir.join("icon.png").is_file());

        let tgz = File::open(dir.join("igraph.tgz")).unwrap();
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(tgz));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names
            .iter()
            .any(|n| n == "igraph.docset/Contents/Resources/Documents/index.html"));
    }
}
