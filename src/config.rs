use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "IGRAPH_DOCSET";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base name of the bundle: `<docset_name>.docset`, `<docset_name>.tgz`.
    pub docset_name: String,
    pub releases_url: String,
    pub user_agent: String,
    /// File name of the generated symbol index inside the HTML directory.
    pub index_page: String,
    /// Glob (relative to the HTML directory) selecting content pages.
    pub content_pattern: String,
    /// Where the release is unpacked and the docset / submission are written.
    pub work_dir: PathBuf,
    /// Holds Info.plist, icon.png, docset.json and README.md.
    pub assets_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            docset_name: "igraph".into(),
            releases_url: "https://api.github.com/repos/igraph/igraph/releases".into(),
            user_agent: format!("igraph_docset/{}", env!("CARGO_PKG_VERSION")),
            index_page: "ix01.html".into(),
            content_pattern: "igraph-*.html".into(),
            work_dir: PathBuf::from("."),
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl Settings {
    /// Defaults overlaid with `IGRAPH_DOCSET_*` environment variables.
    pub fn load() -> Result<Settings> {
        let d = Settings::default();
        let settings = Config::builder()
            .set_default("docset_name", d.docset_name)?
            .set_default("releases_url", d.releases_url)?
            .set_default("user_agent", d.user_agent)?
            .set_default("index_page", d.index_page)?
            .set_default("content_pattern", d.content_pattern)?
            .set_default("work_dir", d.work_dir.to_string_lossy().into_owned())?
            .set_default("assets_dir", d.assets_dir.to_string_lossy().into_owned())?
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?;
        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn html_dir(&self) -> PathBuf {
        self.work_dir.join("html")
    }

    pub fn docset_dir(&self) -> PathBuf {
        self.work_dir.join(format!("{}.docset", self.docset_name))
    }

    pub fn submission_dir(&self) -> PathBuf {
        self.work_dir.join("submission")
    }
}
