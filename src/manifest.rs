//! Serde model and loader for the external image-variant manifest.
//!
//! The manifest is produced by the asset pipeline, not by this crate: it
//! maps an original image basename to the encoded variants that exist on
//! disk, per format. The rewriter ([`crate::images`]) treats it as
//! read-only truth about which `<picture>` sources can be offered.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One encoded rendition of an original image.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Variant {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub width: Option<u64>,
}

impl Variant {
    /// Variants missing a path or a usable width are ignored by the
    /// rewriter, mirroring how manifest authors mark placeholders.
    pub fn is_usable(&self) -> bool {
        self.path.as_deref().map_or(false, |p| !p.is_empty())
            && self.width.map_or(false, |w| w > 0)
    }
}

/// Format name → variants for one original image.
pub type ManifestEntry = HashMap<String, Vec<Variant>>;

/// The whole manifest: original image basename → per-format variants.
#[derive(Debug, Default, Deserialize)]
pub struct ImageManifest(HashMap<String, ManifestEntry>);

impl ImageManifest {
    /// Loads the manifest. An absent file is normal (no images processed
    /// yet); an unreadable or unparseable one degrades to an empty manifest
    /// with a warning.
    pub fn load(path: &Path) -> ImageManifest {
        if !path.exists() {
            return ImageManifest::default();
        }
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                crate::log!("warn"; "unable to read image manifest {}: {}", path.display(), e);
                return ImageManifest::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(e) => {
                crate::log!("warn"; "unable to parse image manifest {}: {}", path.display(), e);
                ImageManifest::default()
            }
        }
    }

    pub fn get(&self, basename: &str) -> Option<&ManifestEntry> {
        self.0.get(basename)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn from_json(json: &str) -> ImageManifest {
        serde_json::from_str(json).unwrap()
    }
}
