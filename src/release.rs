use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub browser_download_url: String,
}

/// First stable release in listing order. The releases API lists newest
/// first; nothing here re-checks that against `published_at`.
pub fn select_release(releases: &[Release]) -> Option<&Release> {
    releases.iter().find(|r| !r.draft && !r.prerelease)
}

fn client(settings: &Settings) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(&settings.user_agent)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Find the newest stable release, unpack its tarball into the work
/// directory and leave its HTML manual in `<work_dir>/html`.
/// Returns the release version.
pub fn download(settings: &Settings) -> Result<String> {
    let client = client(settings)?;

    info!("Looking for latest igraph release ...");
    let releases: Vec<Release> = client
        .get(&settings.releases_url)
        .send()
        .and_then(|r| r.error_for_status())
        .context("Failed to fetch release list")?
        .json()
        .context("Failed to parse release list")?;

    let release = select_release(&releases).ok_or_else(|| Error::NoRelease {
        url: settings.releases_url.clone(),
    })?;
    let version = release.tag_name.clone();
    let asset = release.assets.first().ok_or_else(|| Error::NoAssets {
        version: version.clone(),
    })?;
    info!(
        "Found version {} ({}). Downloading ...",
        version,
        release.published_at.as_deref().unwrap_or("unknown date")
    );

    let response = client
        .get(&asset.browser_download_url)
        .send()
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Failed to download {}", asset.browser_download_url))?;
    unpack_tarball(response, &settings.work_dir)?;

    let source_dir = settings
        .work_dir
        .join(format!("{}-{}", settings.docset_name, version));
    move_html(&source_dir, &settings.html_dir())?;
    std::fs::remove_dir_all(&source_dir)
        .with_context(|| format!("Failed to remove {:?}", source_dir))?;

    Ok(version)
}

/// Unpack a gzip-compressed tar stream into `dest`.
pub fn unpack_tarball(stream: impl std::io::Read, dest: &Path) -> Result<()> {
    let decoder = flate2::read::GzDecoder::new(stream);
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(dest)
        .with_context(|| format!("Failed to extract release archive into {:?}", dest))?;
    Ok(())
}

/// Move `<source_dir>/doc/html` to `html_dir`, replacing what is there.
pub fn move_html(source_dir: &Path, html_dir: &Path) -> Result<PathBuf> {
    let docs = source_dir.join("doc").join("html");
    if !docs.is_dir() {
        return Err(Error::MissingDocs(docs).into());
    }
    if html_dir.is_dir() {
        warn!("Removing existing {:?}", html_dir);
        std::fs::remove_dir_all(html_dir)
            .with_context(|| format!("Failed to remove {:?}", html_dir))?;
    }
    std::fs::rename(&docs, html_dir)
        .with_context(|| format!("Failed to move {:?} to {:?}", docs, html_dir))?;
    Ok(html_dir.to_path_buf())
}
