//! Defines the [`Page`] type and the logic for deriving a page's canonical
//! identity from its source file: site-relative URL, slug key, and a
//! normalized date.
//!
//! A page is parsed fresh on every build and discarded at process exit; the
//! only part of its identity that survives across runs is the slug key,
//! which the slug cache persists to detect deletions (see [`crate::cache`]).

use crate::config::Config;
use crate::{frontmatter, markdown};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One parsed content file.
pub struct Page {
    /// Frontmatter metadata, in declaration order. Also carries the derived
    /// `url` and the normalized `date` so templates see them as plain fields.
    pub metadata: Mapping,

    /// Canonical site-relative URL, e.g. `/`, `/a/`, or `/posts/hello`.
    pub url: String,

    /// Stable identifier for the page's source position: the relative path
    /// without extension, `/`-separated. Persisted across builds to detect
    /// deletions.
    pub slug: String,

    /// Hypertext produced by the markdown converter.
    pub body_html: String,

    /// The source file this page was parsed from.
    pub source: PathBuf,
}

impl Page {
    /// Parses a content file into a [`Page`]. Malformed frontmatter and
    /// unparseable dates degrade with a warning ([`crate::frontmatter`]);
    /// only an unreadable file is an error, and the caller treats that as a
    /// per-item skip.
    pub fn from_source(path: &Path, config: &Config) -> Result<Page> {
        let raw = fs::read_to_string(path).map_err(|err| Error::Read {
            path: path.to_owned(),
            err,
        })?;

        let (mut metadata, body) = frontmatter::split(&raw, path);
        let body_html = markdown::to_html(body);

        let slug = slug_from_path(path, &config.content_dir);
        let url = url_from_slug(&slug);

        normalize_date(&mut metadata, path);
        metadata.insert(
            Value::String("url".to_owned()),
            Value::String(url.clone()),
        );

        Ok(Page {
            metadata,
            url,
            slug,
            body_html,
            source: path.to_owned(),
        })
    }

    /// The template this page renders with, falling back to the configured
    /// default when the metadata has no usable `layout`.
    pub fn layout<'a>(&'a self, config: &'a Config) -> &'a str {
        self.declared_layout().unwrap_or(&config.default_layout)
    }

    /// The layout explicitly declared in frontmatter, if any. Only declared
    /// layouts join collections.
    pub fn declared_layout(&self) -> Option<&str> {
        meta_get(&self.metadata, "layout")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Whether the page is flagged as a draft. Accepts `true`, `1`, and
    /// `yes` case-insensitively, whatever the YAML scalar type.
    pub fn is_draft(&self) -> bool {
        match meta_get(&self.metadata, "draft").and_then(scalar_to_string) {
            Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            None => false,
        }
    }

    /// The page's declared tags. Only meaningful for `post` pages; callers
    /// enforce that.
    pub fn tags(&self) -> Vec<String> {
        match meta_get(&self.metadata, "tags") {
            Some(Value::Sequence(seq)) => seq.iter().filter_map(scalar_to_string).collect(),
            _ => Vec::new(),
        }
    }
}

/// Looks up a string key in a metadata mapping.
pub(crate) fn meta_get<'a>(metadata: &'a Mapping, key: &str) -> Option<&'a Value> {
    metadata.get(&Value::String(key.to_owned()))
}

/// Renders a YAML scalar as a string; sequences and mappings yield `None`.
pub(crate) fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Derives the slug key for a source file: its path relative to the content
/// root, minus extension, `/`-separated. Files outside the content root
/// fall back to a slug derived solely from the basename.
pub fn slug_from_path(path: &Path, content_root: &Path) -> String {
    match path.strip_prefix(content_root) {
        Ok(rel) => rel
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Maps a slug key to its canonical URL: `index` is the site root, an
/// `…/index` slug is its parent directory with a trailing slash, everything
/// else is the slug itself.
pub fn url_from_slug(slug: &str) -> String {
    const INDEX: &str = "index";
    if slug == INDEX {
        "/".to_owned()
    } else if slug.ends_with("/index") {
        format!("/{}", &slug[..slug.len() - INDEX.len()])
    } else {
        format!("/{}", slug)
    }
}

fn normalize_date(metadata: &mut Mapping, origin: &Path) {
    let raw = match meta_get(metadata, "date").and_then(scalar_to_string) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return,
    };
    match parse_date_value(&raw) {
        Some(date) => {
            metadata.insert(
                Value::String("date".to_owned()),
                Value::String(date.format("%Y-%m-%d").to_string()),
            );
        }
        None => {
            crate::log!("warn"; "{}: could not parse date: {}", origin.display(), raw);
        }
    }
}

/// Permissive multi-format date parser. Accepts a calendar date, a full
/// timestamp with optional fractional seconds and either `T` or space as the
/// separator, slashed and day-first orderings, year-month, a bare year, and
/// finally RFC 3339.
pub fn parse_date_value(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    // Year-month and bare-year forms carry no day; pin them to the first.
    if raw.len() == 7 && raw.as_bytes()[4] == b'-' {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d") {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(year) = raw.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_local())
}

/// The result of a page-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Page`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the source file cannot be read.
    Read { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "reading `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { path: _, err } => Some(err),
        }
    }
}
