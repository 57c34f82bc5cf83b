//! Sitemap generation.
//!
//! Writes a `sitemap.xml` at the output root listing every page URL
//! produced by the scan. When the site mapping carries a string `url`, page
//! paths are joined onto it so `<loc>` entries are absolute.

use crate::config::Config;
use crate::page::meta_get;
use std::fs;
use std::io;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Writes the sitemap for the given page URLs.
pub fn write_sitemap(urls: &[String], config: &Config) -> io::Result<()> {
    let base = base_url(config);
    let xml = build_xml(urls, base.as_deref());
    let path = config.output_dir.join("sitemap.xml");
    fs::write(&path, xml)?;
    crate::log!("build"; "generated sitemap.xml");
    Ok(())
}

fn base_url(config: &Config) -> Option<String> {
    meta_get(&config.site, "url")
        .and_then(serde_yaml::Value::as_str)
        .map(|s| s.trim_end_matches('/').to_owned())
        .filter(|s| !s.is_empty())
}

fn build_xml(urls: &[String], base: Option<&str>) -> String {
    let mut xml = String::with_capacity(256 + urls.len() * 64);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{}">"#, SITEMAP_NS));
    xml.push('\n');

    for url in urls {
        let loc = match base {
            Some(base) => format!("{}{}", base, url),
            None => url.clone(),
        };
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&loc)));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("hello"), "hello");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<x>"), "&lt;x&gt;");
    }

    #[test]
    fn test_build_xml_structure() {
        let xml = build_xml(
            &["/".to_owned(), "/posts/hello".to_owned()],
            Some("https://example.com"),
        );
        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert!(lines[1].starts_with("<urlset"));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/posts/hello</loc>"));
        assert_eq!(xml.matches("<url>").count(), 2);
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn test_build_xml_without_base_keeps_paths() {
        let xml = build_xml(&["/a/".to_owned()], None);
        assert!(xml.contains("<loc>/a/</loc>"));
    }

    #[test]
    fn test_build_xml_escapes_loc() {
        let xml = build_xml(&["/search?q=a&b=c".to_owned()], None);
        assert!(xml.contains("<loc>/search?q=a&amp;b=c</loc>"));
    }

    #[test]
    fn test_write_sitemap_uses_site_url() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "url: https://example.com/\n",
        )
        .unwrap();
        let config = Config::from_root(dir.path()).unwrap();
        write_sitemap(&["/".to_owned()], &config).unwrap();
        let xml = fs::read_to_string(dir.path().join("sitemap.xml")).unwrap();
        assert!(xml.contains("<loc>https://example.com/</loc>"));
    }
}
