//! Template loading and page rendering.
//!
//! [`TemplateStore`] walks the template directory once and parses every
//! template file up front; [`Renderer`] applies a page's layout template to
//! the `{site, page, content, collections…}` context, pipes the result
//! through the responsive-image rewriter, and writes it under the page's
//! URL. Every failure here is a per-page skip: an unknown layout, a
//! template execution error, or an unwritable output file never stops the
//! rest of the build.

use crate::config::Config;
use crate::images::rewrite_images;
use crate::manifest::ImageManifest;
use crate::page::Page;
use crate::report::{BuildReport, SkipReason};
use crate::value::mapping_to_value;
use gtmpl::Template;
use gtmpl_value::Value;
use serde_yaml::Mapping;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Template file extensions the store will parse.
const TEMPLATE_EXTENSIONS: [&str; 2] = ["html", "tmpl"];

/// Name of the template used for tag index pages.
const TAGS_TEMPLATE: &str = "tags";

/// Parsed templates, addressable by relative path, relative path without
/// extension, and basename (first registration wins).
pub struct TemplateStore {
    templates: Vec<Template>,
    index: HashMap<String, usize>,
}

impl TemplateStore {
    /// Walks `dir` and parses every template file. Files that fail to parse
    /// are skipped with a logged error; a missing directory yields an empty
    /// store, which surfaces later as per-page missing-template skips.
    pub fn load(dir: &Path) -> TemplateStore {
        let mut store = TemplateStore {
            templates: Vec::new(),
            index: HashMap::new(),
        };

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !TEMPLATE_EXTENSIONS.contains(&extension) {
                continue;
            }

            let contents = match fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(e) => {
                    crate::log!("error"; "skipping template {}: {}", path.display(), e);
                    continue;
                }
            };
            let mut template = Template::default();
            if let Err(e) = template.parse(&contents) {
                crate::log!("error"; "skipping template {}: {}", path.display(), e);
                continue;
            }

            let rel = path.strip_prefix(dir).unwrap_or(path);
            let rel_key = join_components(rel);
            let stem_key = join_components(&rel.with_extension(""));
            let base_key = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let slot = store.templates.len();
            store.templates.push(template);
            for key in [rel_key, stem_key, base_key].iter() {
                if !key.is_empty() {
                    store.index.entry(key.clone()).or_insert(slot);
                }
            }
        }
        store
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.index.get(name).map(|&slot| &self.templates[slot])
    }

    /// Registered template names, sorted, for error messages.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.index.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn join_components(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Applies templates to pages and writes the results to disk.
pub struct Renderer<'a> {
    pub config: &'a Config,
    pub templates: &'a TemplateStore,
    pub manifest: &'a ImageManifest,
}

impl Renderer<'_> {
    /// Renders one page with the given collection context. Returns the skip
    /// reason instead of erroring so the orchestrator can aggregate and
    /// continue.
    pub fn render_page(
        &self,
        page: &Page,
        collections_ctx: &HashMap<String, Value>,
    ) -> Result<(), SkipReason> {
        let layout = page.layout(self.config);
        let template = match self.templates.get(layout) {
            Some(template) => template,
            None => {
                crate::log!(
                    "error";
                    "template '{}' not found (available: {}); skipping {}",
                    layout,
                    self.available(),
                    page.source.display()
                );
                return Err(SkipReason::MissingTemplate(layout.to_owned()));
            }
        };

        let mut ctx = collections_ctx.clone();
        ctx.insert("site".to_owned(), mapping_to_value(&self.config.site));
        ctx.insert("page".to_owned(), mapping_to_value(&page.metadata));
        ctx.insert("content".to_owned(), Value::from(page.body_html.as_str()));

        let html = self.execute(template, Value::Object(ctx)).map_err(|e| {
            crate::log!("error"; "rendering {}: {}", page.source.display(), e);
            SkipReason::Template(e)
        })?;
        let html = rewrite_images(&html, self.manifest, &self.config.images_root);

        let out_path = self.output_path(&page.url);
        write_output(&out_path, &html).map_err(|e| {
            crate::log!("error"; "failed to write {}: {}", out_path.display(), e);
            SkipReason::Write(e.to_string())
        })?;
        crate::log!("build"; "generated {}", page.url);
        Ok(())
    }

    /// Renders one tag index page per tag. A missing tags template skips
    /// the whole group with a single warning.
    pub fn render_tag_pages(
        &self,
        tags: &BTreeMap<String, Vec<Mapping>>,
        report: &mut BuildReport,
    ) {
        if tags.is_empty() {
            return;
        }
        let template = match self.templates.get(TAGS_TEMPLATE) {
            Some(template) => template,
            None => {
                crate::log!("warn"; "tags template not found; skipping tag page generation");
                return;
            }
        };

        for (name, posts) in tags {
            let mut page_meta: HashMap<String, Value> = HashMap::new();
            page_meta.insert("title".to_owned(), Value::from(format!("Tag: {}", name)));

            let mut ctx: HashMap<String, Value> = HashMap::new();
            ctx.insert("site".to_owned(), mapping_to_value(&self.config.site));
            ctx.insert("tag_name".to_owned(), Value::from(name.as_str()));
            ctx.insert(
                "posts".to_owned(),
                Value::Array(posts.iter().map(mapping_to_value).collect()),
            );
            ctx.insert("page".to_owned(), Value::Object(page_meta));

            let subject = format!("tags/{}.html", name);
            let html = match self.execute(template, Value::Object(ctx)) {
                Ok(html) => html,
                Err(e) => {
                    crate::log!("error"; "rendering tag page {}: {}", name, e);
                    report.skip(subject, SkipReason::Template(e));
                    continue;
                }
            };
            let html = rewrite_images(&html, self.manifest, &self.config.images_root);

            let out_path = self.config.output_dir.join("tags").join(format!("{}.html", name));
            match write_output(&out_path, &html) {
                Ok(()) => {
                    crate::log!("build"; "generated tag page: {}", subject);
                    report.wrote();
                }
                Err(e) => {
                    crate::log!("error"; "failed to write {}: {}", out_path.display(), e);
                    report.skip(subject, SkipReason::Write(e.to_string()));
                }
            }
        }
    }

    fn execute(&self, template: &Template, root: Value) -> Result<String, String> {
        let context = gtmpl::Context::from(root).map_err(|e| e.to_string())?;
        let mut buf: Vec<u8> = Vec::new();
        template.execute(&mut buf, &context)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn output_path(&self, url: &str) -> PathBuf {
        if url == "/" {
            self.config.output_dir.join("index.html")
        } else {
            self.config
                .output_dir
                .join(url.trim_start_matches('/'))
                .join("index.html")
        }
    }

    fn available(&self) -> String {
        let names = self.templates.names();
        if names.is_empty() {
            "none".to_owned()
        } else {
            names.join(", ")
        }
    }
}

fn write_output(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
