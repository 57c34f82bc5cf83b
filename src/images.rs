//! The responsive-image rewriting pass.
//!
//! [`rewrite_images`] is a pure function over rendered hypertext: every
//! `<img>` whose source resolves into the image manifest is replaced with a
//! `<picture>` element offering the manifest's format and width variants;
//! *everything* else — text, comments, other tags, references, even markup
//! the parser can't make sense of — is passed through byte-for-byte.
//!
//! The pass is a single forward scan with a streaming tag parser. Output is
//! assembled from raw byte spans of the input keyed off the parser's
//! position, which is what makes the byte-for-byte guarantee hold even for
//! markup quick-xml would reserialize differently. A parse error ends the
//! scan and the remainder of the input is copied through unchanged; this
//! function cannot fail.

use crate::manifest::{ImageManifest, ManifestEntry, Variant};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

/// Formats offered as `<source>` elements, most modern first.
const FORMAT_PRIORITY: [&str; 5] = ["avif", "webp", "jpg", "jpeg", "png"];

/// Fallback `<img>` format preference, most compatible first.
const FALLBACK_PRIORITY: [&str; 5] = ["jpg", "jpeg", "png", "webp", "avif"];

const DEFAULT_SIZES: &str = "100vw";

/// Replaces manifest-eligible `<img>` tags in `html` with `<picture>`
/// blocks. `images_root` is the marker segment (e.g. `assets/images`) that
/// identifies manifest-managed image paths.
pub fn rewrite_images(html: &str, manifest: &ImageManifest, images_root: &str) -> String {
    if html.is_empty() || manifest.is_empty() {
        return html.to_owned();
    }

    let mut reader = Reader::from_reader(html.as_bytes());
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);

    let mut out = String::with_capacity(html.len());
    let mut last = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref elem)) | Ok(Event::Empty(ref elem))
                if elem.name().as_ref().eq_ignore_ascii_case(b"img") =>
            {
                let pos = reader.buffer_position() as usize;
                match replace_img(elem, manifest, images_root) {
                    Some(picture) => out.push_str(&picture),
                    None => out.push_str(&html[last..pos]),
                }
                last = pos;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {
                let pos = reader.buffer_position() as usize;
                out.push_str(&html[last..pos]);
                last = pos;
            }
            // Unparseable remainder flows through untouched.
            Err(_) => break,
        }
    }
    out.push_str(&html[last..]);
    out
}

/// Builds the `<picture>` replacement for one `<img>` tag, or `None` when
/// the tag must be left alone.
fn replace_img(
    elem: &BytesStart<'_>,
    manifest: &ImageManifest,
    images_root: &str,
) -> Option<String> {
    let attrs = decode_attributes(elem);
    let src = attr_ci(&attrs, "src")?;
    let entry = lookup(src, manifest, images_root)?;
    build_picture(&attrs, entry)
}

/// Resolves an `src` value into its manifest entry: strips query/fragment,
/// a leading `./` and leading slashes, requires the images-root marker, and
/// looks up the basename of whatever follows it.
fn lookup<'m>(
    src: &str,
    manifest: &'m ImageManifest,
    images_root: &str,
) -> Option<&'m ManifestEntry> {
    let trimmed = src.split('?').next().unwrap_or(src);
    let trimmed = trimmed.split('#').next().unwrap_or(trimmed);
    let trimmed = trimmed.trim_start_matches('/');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);

    let marker = format!("{}/", images_root);
    let idx = trimmed.find(&marker)?;
    let relative = &trimmed[idx + marker.len()..];
    let basename = relative.rsplit('/').next().unwrap_or(relative);
    if basename.is_empty() {
        return None;
    }
    manifest.get(basename)
}

fn build_picture(attrs: &[(String, String)], entry: &ManifestEntry) -> Option<String> {
    let sizes = attr_ci(attrs, "data-img-sizes")
        .or_else(|| attr_ci(attrs, "sizes"))
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SIZES);

    // The fallback format is settled first: its variants are fully expressed
    // by the fallback <img>'s srcset, so it never doubles as a <source>.
    let fallback_format = *FALLBACK_PRIORITY
        .iter()
        .find(|f| entry.get(**f).map_or(false, |v| !v.is_empty()))?;

    let mut sources = String::new();
    for format in FORMAT_PRIORITY.iter().filter(|f| **f != fallback_format) {
        let variants = match entry.get(*format) {
            Some(variants) => sorted_usable(variants),
            None => continue,
        };
        if variants.is_empty() {
            continue;
        }
        sources.push_str(&format!(
            r#"<source type="{}" srcset="{}" sizes="{}">"#,
            media_type(format),
            escape_attr(&srcset_of(&variants)),
            escape_attr(sizes),
        ));
    }
    if sources.is_empty() {
        return None;
    }

    let fallback = sorted_usable(entry.get(fallback_format)?);
    let (largest_path, _) = *fallback.last()?;

    let mut img = String::from("<img");
    push_attr(&mut img, "src", &variant_url(largest_path));
    for (name, value) in attrs {
        if matches!(
            name.to_ascii_lowercase().as_str(),
            "src" | "srcset" | "sizes" | "data-img-sizes"
        ) {
            continue;
        }
        push_attr(&mut img, name, value);
    }
    push_attr(&mut img, "srcset", &srcset_of(&fallback));
    push_attr(&mut img, "sizes", sizes);
    img.push('>');

    Some(format!("<picture>{}{}</picture>", sources, img))
}

fn decode_attributes(elem: &BytesStart<'_>) -> Vec<(String, String)> {
    elem.html_attributes()
        .filter_map(|a| a.ok())
        .map(|attr| {
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (name, value)
        })
        .collect()
}

fn attr_ci<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Usable variants sorted ascending by width. The manifest does not promise
/// pre-sorted variant lists.
fn sorted_usable(variants: &[Variant]) -> Vec<(&str, u64)> {
    let mut usable: Vec<(&str, u64)> = variants
        .iter()
        .filter(|v| v.is_usable())
        .map(|v| (v.path.as_deref().unwrap_or_default(), v.width.unwrap_or_default()))
        .collect();
    usable.sort_by_key(|(_, width)| *width);
    usable
}

fn srcset_of(variants: &[(&str, u64)]) -> String {
    variants
        .iter()
        .map(|(path, width)| format!("{} {}w", variant_url(path), width))
        .collect::<Vec<_>>()
        .join(", ")
}

// Manifest paths that already carry a scheme are used verbatim; everything
// else is treated as root-relative.
fn variant_url(path: &str) -> String {
    if Url::parse(path).is_ok() {
        path.to_owned()
    } else {
        format!("/{}", path)
    }
}

fn media_type(format: &str) -> String {
    match format {
        "jpg" | "jpeg" => "image/jpeg".to_owned(),
        other => format!("image/{}", other),
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
