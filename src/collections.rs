//! Groups pages into per-layout collections and the tag index.
//!
//! Collections hold page *metadata* only (never the rendered body) and are
//! filled during the scan phase; rendering reads them only after the scan
//! has fully completed, so every template sees complete collections.

use crate::config::Config;
use crate::page::{meta_get, parse_date_value, scalar_to_string, Page};
use crate::value::mapping_to_value;
use chrono::NaiveDateTime;
use gtmpl_value::Value;
use serde_yaml::Mapping;
use std::collections::{BTreeMap, HashMap};

/// Layout whose pages feed the tag index.
const POST_LAYOUT: &str = "post";

/// Accumulates pages by declared layout, plus the tag index for posts.
#[derive(Default)]
pub struct Collections {
    by_layout: BTreeMap<String, Vec<Mapping>>,
    tags: BTreeMap<String, Vec<Mapping>>,
}

impl Collections {
    pub fn new() -> Collections {
        Collections::default()
    }

    /// Accumulates a page. Only pages that explicitly declare a `layout`
    /// join a collection; `post` pages additionally join the tag index once
    /// per declared tag.
    pub fn add(&mut self, page: &Page, _config: &Config) {
        let layout = match page.declared_layout() {
            Some(layout) => layout.to_owned(),
            None => return,
        };
        self.by_layout
            .entry(layout.clone())
            .or_insert_with(Vec::new)
            .push(page.metadata.clone());

        if layout == POST_LAYOUT {
            for tag in page.tags() {
                self.tags
                    .entry(tag)
                    .or_insert_with(Vec::new)
                    .push(page.metadata.clone());
            }
        }
    }

    /// Applies the sort policy to every collection independently: date
    /// descending when any member carries a date (undated members last),
    /// else ascending by explicit `order` (missing order sorts last), else
    /// discovery order. Tag groups always sort reverse-chronologically.
    pub fn sort(&mut self) {
        for items in self.by_layout.values_mut() {
            sort_collection(items);
        }
        for posts in self.tags.values_mut() {
            sort_by_date_descending(posts);
        }
    }

    /// Exposes each collection to templates as `<layout>s`, hyphens mapped
    /// to underscores.
    pub fn context(&self) -> HashMap<String, Value> {
        let mut ctx = HashMap::new();
        for (layout, items) in &self.by_layout {
            let name = format!("{}s", layout.replace('-', "_"));
            ctx.insert(
                name,
                Value::Array(items.iter().map(mapping_to_value).collect()),
            );
        }
        ctx
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<Mapping>> {
        &self.tags
    }

    #[cfg(test)]
    fn collection(&self, layout: &str) -> Option<&Vec<Mapping>> {
        self.by_layout.get(layout)
    }
}

fn sort_collection(items: &mut Vec<Mapping>) {
    let has_date = items.iter().any(|m| {
        meta_get(m, "date")
            .and_then(scalar_to_string)
            .map_or(false, |s| !s.is_empty())
    });
    if has_date {
        sort_by_date_descending(items);
        return;
    }

    let has_order = items
        .iter()
        .any(|m| meta_get(m, "order").map_or(false, |v| !v.is_null()));
    if has_order {
        items.sort_by_key(|m| order_key(m));
    }
}

fn sort_by_date_descending(items: &mut Vec<Mapping>) {
    items.sort_by(|a, b| date_key(b).cmp(&date_key(a)));
}

// `None` compares below every parsed date, so descending order puts undated
// members last while the stable sort keeps their discovery order.
fn date_key(m: &Mapping) -> Option<NaiveDateTime> {
    meta_get(m, "date")
        .and_then(scalar_to_string)
        .and_then(|s| parse_date_value(&s))
}

fn order_key(m: &Mapping) -> i64 {
    meta_get(m, "order")
        .and_then(serde_yaml::Value::as_i64)
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_yaml::Value as Yaml;

    fn meta(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn titles(items: &[Mapping]) -> Vec<&str> {
        items
            .iter()
            .filter_map(|m| meta_get(m, "title").and_then(Yaml::as_str))
            .collect()
    }

    fn collections_of(metas: Vec<Mapping>) -> Collections {
        let mut c = Collections::new();
        for m in metas {
            c.by_layout
                .entry(
                    meta_get(&m, "layout")
                        .and_then(Yaml::as_str)
                        .unwrap()
                        .to_owned(),
                )
                .or_insert_with(Vec::new)
                .push(m);
        }
        c
    }

    #[test]
    fn test_date_sort_reverse_chronological_undated_last() {
        let mut c = collections_of(vec![
            meta("layout: post\ntitle: early\ndate: 2024-01-01"),
            meta("layout: post\ntitle: late\ndate: 2024-06-01"),
            meta("layout: post\ntitle: undated"),
        ]);
        c.sort();
        assert_eq!(
            titles(c.collection("post").unwrap()),
            vec!["late", "early", "undated"]
        );
    }

    #[test]
    fn test_order_sort_when_no_dates() {
        let mut c = collections_of(vec![
            meta("layout: doc\ntitle: third\norder: 30"),
            meta("layout: doc\ntitle: first\norder: 10"),
            meta("layout: doc\ntitle: unordered"),
            meta("layout: doc\ntitle: second\norder: 20"),
        ]);
        c.sort();
        assert_eq!(
            titles(c.collection("doc").unwrap()),
            vec!["first", "second", "third", "unordered"]
        );
    }

    #[test]
    fn test_discovery_order_preserved_without_keys() {
        let mut c = collections_of(vec![
            meta("layout: page\ntitle: one"),
            meta("layout: page\ntitle: two"),
            meta("layout: page\ntitle: three"),
        ]);
        c.sort();
        assert_eq!(
            titles(c.collection("page").unwrap()),
            vec!["one", "two", "three"]
        );
    }

    #[test]
    fn test_one_dated_member_switches_whole_collection_to_date_sort() {
        let mut c = collections_of(vec![
            meta("layout: page\ntitle: undated\norder: 1"),
            meta("layout: page\ntitle: dated\ndate: 2023-05-05"),
        ]);
        c.sort();
        assert_eq!(
            titles(c.collection("page").unwrap()),
            vec!["dated", "undated"]
        );
    }

    #[test]
    fn test_context_pluralizes_and_underscores() {
        let c = collections_of(vec![
            meta("layout: post\ntitle: a"),
            meta("layout: case-study\ntitle: b"),
        ]);
        let ctx = c.context();
        assert!(ctx.contains_key("posts"));
        assert!(ctx.contains_key("case_studys"));
        match ctx.get("posts") {
            Some(Value::Array(items)) => assert_eq!(items.len(), 1),
            other => panic!("unexpected posts value: {:?}", other),
        }
    }

    #[test]
    fn test_tag_index_only_for_posts() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_root(dir.path()).unwrap();
        let make_page = |rel: &str, contents: &str| {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, contents).unwrap();
            Page::from_source(&path, &config).unwrap()
        };

        let post = make_page(
            "content/p.md",
            "---\nlayout: post\ntags: [rust]\n---\nx\n",
        );
        let page = make_page(
            "content/q.md",
            "---\nlayout: page\ntags: [rust]\n---\nx\n",
        );

        let mut c = Collections::new();
        c.add(&post, &config);
        c.add(&page, &config);

        assert_eq!(c.tags().get("rust").map(Vec::len), Some(1));
        assert_eq!(c.collection("page").map(Vec::len), Some(1));
    }

    #[test]
    fn test_undeclared_layout_joins_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_root(dir.path()).unwrap();
        let path = dir.path().join("content/bare.md");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "no frontmatter\n").unwrap();
        let page = Page::from_source(&path, &config).unwrap();

        let mut c = Collections::new();
        c.add(&page, &config);
        assert!(c.context().is_empty());
    }

    #[test]
    fn test_tag_groups_sort_reverse_chronological() {
        let mut c = Collections::new();
        c.tags.insert(
            "rust".to_owned(),
            vec![
                meta("title: old\ndate: 2022-01-01"),
                meta("title: new\ndate: 2024-01-01"),
            ],
        );
        c.sort();
        assert_eq!(titles(c.tags().get("rust").unwrap()), vec!["new", "old"]);
    }
}
