//! Exports the [`full_build`] and [`incremental_build`] functions which
//! stitch together the high-level steps of building the site.
//!
//! A full build runs in two strictly ordered phases. Phase one scans the
//! content tree: every markdown file is parsed into a [`Page`], drafts are
//! dropped, slug keys are recorded, and collections and the tag index are
//! accumulated. Phase two renders: only once the scan has completed does any
//! template run, so every page sees complete collections. Between the
//! phases the slug cache is diffed against the previous build and stale
//! output directories are pruned.
//!
//! The incremental path short-circuits all of that for one changed file:
//! the file is parsed and rendered with the site context alone (collections
//! are not recomputed — a full build reconciles the difference), and a
//! deleted source removes its output directory and invalidates the slug
//! cache so the next full build starts from scratch.

use crate::cache::{FileChangeCache, SlugCache};
use crate::collections::Collections;
use crate::config::Config;
use crate::manifest::ImageManifest;
use crate::page::Page;
use crate::render::{Renderer, TemplateStore};
use crate::report::{BuildReport, SkipReason};
use crate::sitemap;
use anyhow::Result;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const CONTENT_EXTENSION: &str = "md";

/// Slug of the site root page; its output must never be pruned.
const ROOT_SLUG: &str = "index";

/// Top-level entries the output cleaner leaves alone: version control,
/// dependency and cache directories, source/config/template directories,
/// and named project files. Everything else at the output root belongs to a
/// previous build. Dotfiles not named here are preserved too.
const PRESERVED_ROOTS: [&str; 27] = [
    ".git",
    ".github",
    ".cache",
    ".venv",
    "assets",
    "content",
    "dist",
    "node_modules",
    "src",
    "target",
    "templates",
    "scripts",
    "config.yaml",
    "Cargo.toml",
    "Cargo.lock",
    "package.json",
    "package-lock.json",
    "requirements.txt",
    "vite.config.mjs",
    "README.md",
    "LICENSE.md",
    "CONTRIBUTING.md",
    ".env",
    ".env.example",
    ".gitignore",
    ".dockerignore",
    "Dockerfile",
];

/// Deletes everything at the output root that isn't on the allow-list.
/// Individual deletion failures are logged and skipped.
pub fn clean_output(config: &Config) {
    crate::log!("build"; "cleaning old build files");
    let entries = match fs::read_dir(&config.output_dir) {
        Ok(entries) => entries,
        Err(e) => {
            crate::log!("warn"; "could not read {}: {}", config.output_dir.display(), e);
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if PRESERVED_ROOTS.contains(&name.as_str()) || name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let is_real_dir = entry
            .file_type()
            .map(|t| t.is_dir() && !t.is_symlink())
            .unwrap_or(false);
        let result = if is_real_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = result {
            crate::log!("error"; "failed to delete {}: {}", path.display(), e);
        }
    }
}

/// Builds the whole site: clean, scan, prune, render, tag pages, sitemap.
pub fn full_build(config: &Config) -> Result<BuildReport> {
    let templates = TemplateStore::load(&config.templates_dir);
    let manifest = ImageManifest::load(&config.image_manifest_path);

    clean_output(config);

    let slug_cache = SlugCache::new(&config.slug_cache_path);
    let previous = slug_cache.load();

    let mut report = BuildReport::default();
    let mut current: BTreeSet<String> = BTreeSet::new();
    let mut pages: Vec<Page> = Vec::new();
    let mut sitemap_urls: Vec<String> = Vec::new();
    let mut collections = Collections::new();

    // Phase one: scan. Collections and the tag index must be complete
    // before anything renders.
    for entry in WalkDir::new(&config.content_dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(CONTENT_EXTENSION) {
            continue;
        }

        let page = match Page::from_source(path, config) {
            Ok(page) => page,
            Err(e) => {
                crate::log!("error"; "{}", e);
                report.skip(path.to_string_lossy(), SkipReason::Read(e.to_string()));
                continue;
            }
        };
        if page.is_draft() {
            report.skip(path.to_string_lossy(), SkipReason::Draft);
            continue;
        }

        current.insert(page.slug.clone());
        sitemap_urls.push(page.url.clone());
        collections.add(&page, config);
        pages.push(page);
    }

    prune_stale(config, &previous, &current);
    slug_cache.save(&current);

    collections.sort();
    let collections_ctx = collections.context();

    // Phase two: render.
    let renderer = Renderer {
        config,
        templates: &templates,
        manifest: &manifest,
    };
    for page in &pages {
        match renderer.render_page(page, &collections_ctx) {
            Ok(()) => report.wrote(),
            Err(reason) => report.skip(page.source.to_string_lossy(), reason),
        }
    }
    renderer.render_tag_pages(collections.tags(), &mut report);

    if let Err(e) = sitemap::write_sitemap(&sitemap_urls, config) {
        crate::log!("error"; "failed to write sitemap.xml: {}", e);
    }

    Ok(report)
}

/// Rebuilds a single content file, or handles its deletion.
pub fn incremental_build(config: &Config, file: &Path) -> Result<BuildReport> {
    let mut report = BuildReport::default();
    crate::log!("build"; "change detected in {}, proceeding to rebuild", file.display());

    if !file.exists() {
        remove_deleted_output(config, file);
        SlugCache::new(&config.slug_cache_path).invalidate();
        return Ok(report);
    }

    match FileChangeCache::new(&config.hash_cache_dir).changed(file) {
        Ok(true) => {}
        Ok(false) => {
            crate::log!(
                "build";
                "no changes detected in {} based on cache; rebuilding anyway",
                file.display()
            );
        }
        Err(e) => {
            crate::log!("warn"; "could not update change cache for {}: {}", file.display(), e);
        }
    }

    let templates = TemplateStore::load(&config.templates_dir);
    let manifest = ImageManifest::load(&config.image_manifest_path);

    let page = match Page::from_source(file, config) {
        Ok(page) => page,
        Err(e) => {
            crate::log!("error"; "{}", e);
            report.skip(file.to_string_lossy(), SkipReason::Read(e.to_string()));
            return Ok(report);
        }
    };

    // Collections from other files are not recomputed in this mode; the
    // page renders against the site context only.
    let renderer = Renderer {
        config,
        templates: &templates,
        manifest: &manifest,
    };
    match renderer.render_page(&page, &HashMap::new()) {
        Ok(()) => report.wrote(),
        Err(reason) => report.skip(file.to_string_lossy(), reason),
    }
    Ok(report)
}

fn remove_deleted_output(config: &Config, file: &Path) {
    let slug = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if slug.is_empty() || slug == ROOT_SLUG {
        return;
    }
    let out_dir = config.output_dir.join(&slug);
    if out_dir.is_dir() {
        match fs::remove_dir_all(&out_dir) {
            Ok(()) => {
                crate::log!("build"; "removed deleted page output: {}", out_dir.display());
            }
            Err(e) => {
                crate::log!("warn"; "could not remove {}: {}", out_dir.display(), e);
            }
        }
    }
}

// previous − current is exactly the set of pages deleted since the last
// build; their output directories go, everything else stays.
fn prune_stale(config: &Config, previous: &BTreeSet<String>, current: &BTreeSet<String>) {
    for slug in previous.difference(current) {
        if slug == ROOT_SLUG {
            continue;
        }
        let dir = config.output_dir.join(slug);
        if dir.is_dir() {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    crate::log!("build"; "removed stale page directory: {}", dir.display());
                }
                Err(e) => {
                    crate::log!("warn"; "could not remove {}: {}", dir.display(), e);
                }
            }
        }
    }
}
