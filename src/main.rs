// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::{self, Read, Write};
use std::process;

use pico_args::Arguments;

use svgbridge::svgbridge_dom::Document;
use svgbridge::update::UpdateDispatcher;
use svgbridge::{BridgeContext, BridgeError, Dynamic, Options, SecurityPolicy, TreeWriting};

const HELP: &str = "\
svgbridge builds a graphics node tree from an SVG document and prints it.

USAGE:
  svgbridge [OPTIONS] <in-svg>   # from file
  svgbridge [OPTIONS] -          # from stdin

OPTIONS:
  -h, --help                        Prints help information
  -V, --version                     Prints version information

  --dpi DPI                         Sets the resolution
                                    [default: 96] [possible values: 10..4000 (inclusive)]
  --languages LANG                  Sets a comma-separated list of languages that
                                    will be used during the 'systemLanguage'
                                    attribute resolving
                                    Examples: 'en-US', 'en-US, ru-RU', 'en, ru'
                                    [default: en]
  --default-width LENGTH            Sets the default width of the SVG viewport
                                    [values: 1..4294967295 (inclusive)] [default: 100]
  --default-height LENGTH           Sets the default height of the SVG viewport
                                    [values: 1..4294967295 (inclusive)] [default: 100]
  --security POLICY                 Selects which external resources can be loaded
                                    [default: same-origin]
                                    [possible values: none, embedded, same-origin, all]
  --dynamic MODE                    Selects the document processing mode
                                    [default: static]
                                    [possible values: static, interactive, dynamic]
  --set ID:ATTR=VALUE               Sets an attribute after the tree was built
                                    and applies the change to the tree.
                                    Implies the dynamic mode.
                                    This option can be set multiple times
  --no-bbox                         Do not print bounding boxes
  --quiet                           Disables warnings
  --verbose                         Enables debug messages

ARGS:
  <in-svg>                          Input file
";

#[derive(Debug)]
struct Args {
    dpi: u32,
    languages: Vec<String>,
    default_width: u32,
    default_height: u32,
    security: SecurityPolicy,
    dynamic: Dynamic,
    sets: Vec<AttributeSet>,
    no_bbox: bool,
    quiet: bool,
    verbose: bool,
    input: String,
}

#[derive(Clone, PartialEq, Debug)]
struct AttributeSet {
    id: String,
    name: String,
    value: String,
}

fn collect_args() -> Result<Args, pico_args::Error> {
    let mut input = Arguments::from_env();

    if input.contains(["-h", "--help"]) {
        print!("{}", HELP);
        process::exit(0);
    }

    if input.contains(["-V", "--version"]) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    Ok(Args {
        dpi: input.opt_value_from_fn("--dpi", parse_dpi)?.unwrap_or(96),
        languages: input
            .opt_value_from_fn("--languages", parse_languages)?
            .unwrap_or_else(|| vec!["en".to_string()]),
        default_width: input
            .opt_value_from_fn("--default-width", parse_length)?
            .unwrap_or(100),
        default_height: input
            .opt_value_from_fn("--default-height", parse_length)?
            .unwrap_or(100),
        security: input.opt_value_from_str("--security")?.unwrap_or_default(),
        dynamic: input.opt_value_from_str("--dynamic")?.unwrap_or_default(),
        sets: input.values_from_fn("--set", parse_set)?,
        no_bbox: input.contains("--no-bbox"),
        quiet: input.contains("--quiet"),
        verbose: input.contains("--verbose"),
        input: input.free_from_str()?,
    })
}

fn parse_dpi(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid number")?;

    if (10..=4000).contains(&n) {
        Ok(n)
    } else {
        Err("DPI out of bounds".to_string())
    }
}

fn parse_languages(s: &str) -> Result<Vec<String>, String> {
    let langs: Vec<String> = s
        .split(',')
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
        .collect();

    if langs.is_empty() {
        return Err("languages list cannot be empty".to_string());
    }

    Ok(langs)
}

fn parse_length(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid length")?;

    if n > 0 {
        Ok(n)
    } else {
        Err("LENGTH cannot be zero".to_string())
    }
}

fn parse_set(s: &str) -> Result<AttributeSet, String> {
    let (id, rest) = s.split_once(':').ok_or("expected ID:ATTR=VALUE")?;
    let (name, value) = rest.split_once('=').ok_or("expected ID:ATTR=VALUE")?;

    if id.is_empty() || name.is_empty() {
        return Err("ID and ATTR cannot be empty".to_string());
    }

    let name = match name {
        "xlink:href" => "href",
        _ => name,
    };

    Ok(AttributeSet {
        id: id.to_string(),
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn main() {
    let args = match collect_args() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}.", e);
            process::exit(1);
        }
    };

    if !args.quiet {
        if let Ok(()) = log::set_logger(&LOGGER) {
            let level = if args.verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Warn
            };
            log::set_max_level(level);
        }
    }

    if let Err(e) = process(args) {
        eprintln!("Error: {}.", e);
        process::exit(1);
    }
}

fn process(args: Args) -> Result<(), String> {
    let (data, url, resources_dir) = if args.input == "-" {
        (load_stdin()?, None, None)
    } else {
        let data = std::fs::read(&args.input).map_err(|e| e.to_string())?;
        let path = std::fs::canonicalize(&args.input).ok();
        let url = path
            .as_ref()
            .and_then(|p| url::Url::from_file_path(p).ok())
            .map(|u| u.to_string());
        let dir = path.and_then(|p| p.parent().map(|p| p.to_path_buf()));
        (data, url, dir)
    };

    let mut doc = Document::from_data(&data).map_err(|e| e.to_string())?;
    doc.set_url(url);

    let default_size =
        svgbridge::svgbridge_gvt::Size::from_wh(args.default_width as f32, args.default_height as f32)
            .ok_or("invalid default size")?;

    let opt = Options {
        resources_dir,
        dpi: args.dpi as f32,
        languages: args.languages,
        default_size,
        dynamic: args.dynamic,
        security: args.security,
        ..Options::default()
    };

    let write_opt = svgbridge::WriteOptions {
        bounding_boxes: !args.no_bbox,
        ..svgbridge::WriteOptions::default()
    };

    let ctx = BridgeContext::new(opt);
    let text = if args.sets.is_empty() {
        let mut ctx = ctx;
        let tree = svgbridge::build_document(&mut ctx, &mut doc).map_err(|e| e.to_string())?;
        print_errors(ctx.errors());
        tree.to_string(&write_opt)
    } else {
        let mut dispatcher = UpdateDispatcher::new(ctx, doc).map_err(|e| e.to_string())?;
        print_errors(dispatcher.context().errors());
        let build_errors = dispatcher.context().errors().len();

        for set in &args.sets {
            let element = dispatcher
                .document()
                .element_by_id(&set.id)
                .map(|node| node.id())
                .ok_or_else(|| format!("no element with id '{}'", set.id))?;

            dispatcher
                .document_mut()
                .set_attribute(element, &set.name, &set.value);
        }

        let report = dispatcher.process();
        print_errors(&dispatcher.context().errors()[build_errors..]);
        eprintln!(
            "Applied {} mutations: {} updated, {} rebuilt, {} unchanged.",
            report.mutations,
            report.updated.len(),
            report.rebuilt.len(),
            report.unchanged
        );

        dispatcher.tree().to_string(&write_opt)
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .and_then(|_| handle.write_all(b"\n"))
        .map_err(|_| "failed to write to the stdout".to_string())?;

    Ok(())
}

fn print_errors(errors: &[BridgeError]) {
    for e in errors {
        eprintln!("[{}] {}", e.code(), e);
    }
}

fn load_stdin() -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    let stdin = io::stdin();
    let mut handle = stdin.lock();

    handle
        .read_to_end(&mut buf)
        .map_err(|_| "failed to read from stdin".to_string())?;

    Ok(buf)
}

/// A simple stderr logger.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;
impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let target = if !record.target().is_empty() {
                record.target()
            } else {
                record.module_path().unwrap_or_default()
            };

            let line = record.line().unwrap_or(0);
            let args = record.args();

            match record.level() {
                log::Level::Error => eprintln!("Error (in {}:{}): {}", target, line, args),
                log::Level::Warn => eprintln!("Warning (in {}:{}): {}", target, line, args),
                log::Level::Info => eprintln!("Info (in {}:{}): {}", target, line, args),
                log::Level::Debug => eprintln!("Debug (in {}:{}): {}", target, line, args),
                log::Level::Trace => eprintln!("Trace (in {}:{}): {}", target, line, args),
            }
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_parsed() {
        let set = parse_set("r1:width=20").unwrap();
        assert_eq!(set.id, "r1");
        assert_eq!(set.name, "width");
        assert_eq!(set.value, "20");

        let set = parse_set("u:xlink:href=#a").unwrap();
        assert_eq!(set.name, "href");
        assert_eq!(set.value, "#a");

        let set = parse_set("g:transform=translate(1 2)").unwrap();
        assert_eq!(set.value, "translate(1 2)");
    }

    #[test]
    fn malformed_set_is_rejected() {
        assert!(parse_set("width=20").is_err());
        assert!(parse_set(":width=20").is_err());
        assert!(parse_set("r1:width").is_err());
    }
}
