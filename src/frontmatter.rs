//! Splits a content file into frontmatter metadata and body text.
//!
//! A content file may begin with a `---`-fenced YAML block. Anything that
//! keeps this from parsing — no opening fence, no closing fence, YAML that
//! fails to deserialize, a block that isn't a mapping — degrades to "the
//! whole file is body text" with a logged warning. One bad header must never
//! keep the rest of the site from building, so [`split`] cannot fail.

use serde_yaml::Mapping;
use std::path::Path;

const FENCE: &str = "---";

/// Splits `raw` into `(metadata, body)`. `origin` is only used for warning
/// messages.
pub fn split<'a>(raw: &'a str, origin: &Path) -> (Mapping, &'a str) {
    if !raw.starts_with(FENCE) {
        return (Mapping::new(), raw);
    }

    let after_open = &raw[FENCE.len()..];
    let close = match after_open.find(FENCE) {
        Some(offset) => offset,
        None => {
            crate::log!("warn"; "{}: unterminated frontmatter fence", origin.display());
            return (Mapping::new(), raw);
        }
    };

    let block = &after_open[..close];
    let body = &after_open[close + FENCE.len()..];

    if block.trim().is_empty() {
        return (Mapping::new(), body);
    }

    match serde_yaml::from_str::<serde_yaml::Value>(block) {
        Ok(serde_yaml::Value::Mapping(metadata)) => (metadata, body),
        Ok(_) => {
            crate::log!("warn"; "{}: frontmatter is not a mapping; ignoring it", origin.display());
            (Mapping::new(), body)
        }
        Err(e) => {
            crate::log!("warn"; "{}: invalid frontmatter: {}", origin.display(), e);
            (Mapping::new(), raw)
        }
    }
}
