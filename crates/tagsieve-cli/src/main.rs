use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use tagsieve_core::{FilterEngine, FilterOptions, RuleSet};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    let mut input: Option<String> = None;
    let mut rules_path: Option<String> = None;
    let mut allows: Vec<String> = Vec::new();
    let mut options = FilterOptions::default();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--debug" => options.debug = true,
            "--trim" => options.trim = true,
            "--rules" => rules_path = Some(expect_value(&mut args, "--rules")),
            "--allow" => allows.push(expect_value(&mut args, "--allow")),
            "--strip-content" => options
                .strip_enclosed_content
                .push(expect_value(&mut args, "--strip-content").to_ascii_lowercase()),
            _ if arg.starts_with("--") => {
                eprintln!("unknown option: {}", arg);
                print_usage();
                process::exit(2);
            }
            _ => {
                if input.is_none() {
                    input = Some(arg);
                } else {
                    eprintln!("unexpected argument: {}", arg);
                    print_usage();
                    process::exit(2);
                }
            }
        }
    }

    init_logging(options.debug);

    let mut rules = match &rules_path {
        Some(path) => load_rules(path),
        None => RuleSet::new(),
    };
    for spec in &allows {
        let (tag, attrs) = parse_allow(spec).unwrap_or_else(|| {
            eprintln!("--allow expects: tag or tag=attr,attr,/ (got {:?})", spec);
            print_usage();
            process::exit(2);
        });
        rules.extend(tag, attrs);
    }
    debug!(tags = rules.len(), "rules ready");

    let source = match input {
        Some(path) => fs::read(&path).unwrap_or_else(|err| {
            eprintln!("failed to read {}: {}", path, err);
            process::exit(1);
        }),
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer).unwrap_or_else(|err| {
                eprintln!("failed to read stdin: {}", err);
                process::exit(1);
            });
            buffer
        }
    };

    let engine = FilterEngine::new(rules, options);
    match engine.process(&source) {
        Ok(filtered) => print!("{}", filtered),
        Err(err) => {
            eprintln!("{} {}", err.code(), err);
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: tagsieve-cli [--rules FILE] [--allow TAG[=ATTR,...]]... [--strip-content TAG]... [--trim] [--debug] [input]"
    );
}

fn expect_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    args.next().unwrap_or_else(|| {
        eprintln!("{} expects a value", flag);
        print_usage();
        process::exit(2);
    })
}

fn init_logging(debug: bool) {
    let level = if debug {
        "tagsieve_core=debug,tagsieve_cli=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn load_rules(path: &str) -> RuleSet {
    let source = fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("failed to read {}: {}", path, err);
        process::exit(1);
    });
    RuleSet::from_json(&source).unwrap_or_else(|err| {
        eprintln!("{} {}: {}", err.code(), path, err);
        process::exit(1);
    })
}

/// Splits `tag` or `tag=attr,attr` into a tag and its attribute list.
fn parse_allow(spec: &str) -> Option<(String, Vec<String>)> {
    let (tag, attrs) = match spec.split_once('=') {
        Some((tag, attrs)) => (tag, attrs),
        None => (spec, ""),
    };
    let tag = tag.trim();
    if tag.is_empty() || tag.contains(char::is_whitespace) {
        return None;
    }
    let attrs = attrs
        .split(',')
        .map(str::trim)
        .filter(|attr| !attr.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    Some((tag.to_ascii_lowercase(), attrs))
}

#[cfg(test)]
mod tests {
    use super::parse_allow;

    #[test]
    fn allow_without_attributes() {
        assert_eq!(parse_allow("br"), Some(("br".to_string(), Vec::new())));
        assert_eq!(parse_allow("br="), Some(("br".to_string(), Vec::new())));
    }

    #[test]
    fn allow_with_attributes_keeps_order() {
        assert_eq!(
            parse_allow("IMG=src, Alt,/"),
            Some((
                "img".to_string(),
                vec!["src".to_string(), "alt".to_string(), "/".to_string()]
            ))
        );
    }

    #[test]
    fn allow_rejects_missing_tag() {
        assert_eq!(parse_allow("=href"), None);
        assert_eq!(parse_allow(""), None);
        assert_eq!(parse_allow("a b=href"), None);
    }
}
