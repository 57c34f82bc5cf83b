use anyhow::{anyhow, Result};
use serde_yaml::Mapping;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the site configuration file under the project root.
pub const CONFIG_FILE: &str = "config.yaml";

const CONTENT_DIR: &str = "content";
const TEMPLATE_DIR: &str = "templates";
const IMAGES_ROOT: &str = "assets/images";
const CACHE_DIR: &str = ".cache";
const SLUG_CACHE_FILE: &str = ".cache/page-slugs.json";
const IMAGE_MANIFEST_FILE: &str = ".cache/image-manifest.json";
const DEFAULT_LAYOUT: &str = "post";

/// Immutable build configuration, constructed once in `main` and threaded by
/// reference through every component call. The path fields mirror the fixed
/// project layout; `site` is the free-form mapping parsed from `config.yaml`
/// and handed to templates as the `site` value.
pub struct Config {
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Marker segment identifying manifest-eligible image paths, e.g.
    /// `assets/images`.
    pub images_root: String,
    pub slug_cache_path: PathBuf,
    pub hash_cache_dir: PathBuf,
    pub image_manifest_path: PathBuf,
    /// Template applied to pages that don't declare a `layout`.
    pub default_layout: String,
    pub site: Mapping,
}

impl Config {
    /// Builds the configuration for a project rooted at `root`. The project
    /// root doubles as the output root: generated pages land next to the
    /// source directories, which is why the cleaner works from an allow-list.
    ///
    /// A missing `config.yaml` leaves the site mapping empty with a warning;
    /// a malformed one is the only startup error this crate treats as fatal.
    pub fn from_root(root: &Path) -> Result<Config> {
        let site = load_site(&root.join(CONFIG_FILE))?;
        Ok(Config {
            content_dir: root.join(CONTENT_DIR),
            output_dir: root.to_owned(),
            templates_dir: root.join(TEMPLATE_DIR),
            images_root: IMAGES_ROOT.to_owned(),
            slug_cache_path: root.join(SLUG_CACHE_FILE),
            hash_cache_dir: root.join(CACHE_DIR),
            image_manifest_path: root.join(IMAGE_MANIFEST_FILE),
            default_layout: DEFAULT_LAYOUT.to_owned(),
            site,
        })
    }
}

fn load_site(path: &Path) -> Result<Mapping> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            crate::log!("warn"; "no {} found; site context will be empty", path.display());
            return Ok(Mapping::new());
        }
        Err(e) => return Err(anyhow!("reading {}: {}", path.display(), e)),
    };

    if raw.trim().is_empty() {
        return Ok(Mapping::new());
    }

    match serde_yaml::from_str::<serde_yaml::Value>(&raw) {
        Ok(serde_yaml::Value::Mapping(site)) => Ok(site),
        Ok(_) => {
            crate::log!("warn"; "{} is not a mapping; site context will be empty", path.display());
            Ok(Mapping::new())
        }
        Err(e) => Err(anyhow!("parsing {}: {}", path.display(), e)),
    }
}
