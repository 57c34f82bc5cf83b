use clap::{App, Arg};
use std::path::{Path, PathBuf};
use stela::cache::SlugCache;
use stela::config::Config;
use stela::{build, log};

fn main() {
    let matches = App::new("stela")
        .version(clap::crate_version!())
        .about("Markdown static site generator")
        .arg(
            Arg::with_name("file")
                .long("file")
                .value_name("PATH")
                .takes_value(true)
                .help("Rebuild only the given content file"),
        )
        .arg(
            Arg::with_name("clean")
                .long("clean")
                .help("Delete generated output and the slug cache, then exit"),
        )
        .arg(
            Arg::with_name("generate-styles")
                .long("generate-styles")
                .help("Regenerate stylesheet assets"),
        )
        .get_matches();

    let config = match Config::from_root(Path::new(".")) {
        Ok(config) => config,
        Err(e) => {
            log!("error"; "{}", e);
            return;
        }
    };

    if matches.is_present("clean") {
        build::clean_output(&config);
        SlugCache::new(&config.slug_cache_path).invalidate();
        log!("build"; "generated files are deleted");
        return;
    }

    if matches.is_present("generate-styles") {
        // Theme, font, and syntax CSS come out of the asset pipeline, not
        // this binary.
        log!("build"; "stylesheets are produced by the asset pipeline; nothing to do");
        return;
    }

    let result = match matches.value_of("file") {
        Some(file) => build::incremental_build(&config, &PathBuf::from(file)),
        None => {
            log!("build"; "running a full build");
            build::full_build(&config)
        }
    };

    match result {
        Ok(report) => {
            for skip in &report.skipped {
                log!("warn"; "skipped {}: {}", skip.subject, skip.reason);
            }
            log!("build"; "{}", report.summary());
        }
        Err(e) => log!("error"; "build failed: {}", e),
    }
}
