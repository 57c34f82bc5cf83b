//! Console reporting with colored module prefixes.
//!
//! Every recoverable failure in the pipeline is reported through [`log`]
//! (usually via the `log!` macro) and the build carries on; nothing in this
//! module can itself fail.

use colored::{ColoredString, Colorize};

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("build"; "generated {}", url);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::log::log($module, &format!($($arg)*))
    }};
}

/// Write one prefixed line. Errors and warnings go to stderr, everything
/// else to stdout.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    if module.eq_ignore_ascii_case("error") || module.eq_ignore_ascii_case("warn") {
        eprintln!("{} {}", prefix, message);
    } else {
        println!("{} {}", prefix, message);
    }
}

fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{}]", module);
    match module.to_ascii_lowercase().as_str() {
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_yellow().bold(),
        "build" => prefix.bright_green().bold(),
        _ => prefix.bright_blue().bold(),
    }
}
