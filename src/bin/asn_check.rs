//! Check plain-syntax value files against a registered NDN type.
//!
//! Usage:
//!   asn_check --type NAME [OPTIONS] [FILE ...]
//!   asn_check --type NAME < value.txt
//!   asn_check --list-types
//!
//! Each input must hold exactly one value of the type. Errors are reported as
//! `path:line:column: message`.
//!
//! Options:
//!   --type, -t NAME   Type to parse as (see --list-types)
//!   --fix, -f         With files: rewrite them in canonical layout. With stdin: print it.
//!   --human, -H       Human-readable output
//!   --list-types      Print registered type names and exit
//!
//! Set `RUST_LOG=debug` to trace parsing.

use anyhow::{anyhow, bail, Context};
use ndn_asn::{codec, ndn, Error, TypeRef};
use std::io::{self, Read, Write};
use std::path::Path;

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

/// 1-based line and column of the symbol at `offset`.
fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for c in src.chars().take(offset) {
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn report(name: &str, src: &str, err: &Error, style: OutputStyle) {
    let (line, col) = line_col(src, err.consumed().unwrap_or(0));
    match style {
        OutputStyle::Compact => println!("{}:{}:{}: error: {}", name, line, col, err),
        OutputStyle::Human => {
            println!("  {} line {}, column {}:", name, line, col);
            println!("    {}", err);
        }
    }
}

/// Parse `src`; on success return the canonical text.
fn check(name: &str, src: &str, ty: &TypeRef, style: OutputStyle) -> Option<String> {
    let text = codec::parse_complete(src, ty).and_then(|v| codec::to_text(&v));
    match text {
        Ok(mut text) => {
            text.push('\n');
            Some(text)
        }
        Err(e) => {
            report(name, src, &e, style);
            None
        }
    }
}

fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    match args.iter().position(|a| names.contains(&a.as_str())) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn take_option(args: &mut Vec<String>, names: &[&str]) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| names.contains(&a.as_str())) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} needs an argument", args[pos]);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let registry = ndn::registry();

    if take_flag(&mut args, &["--list-types"]) {
        for name in registry.type_names() {
            println!("{}", name);
        }
        return Ok(());
    }
    let fix = take_flag(&mut args, &["--fix", "-f"]);
    let style = if take_flag(&mut args, &["--human", "-H"]) {
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };
    let type_name = take_option(&mut args, &["--type", "-t"])?.ok_or_else(|| anyhow!("--type NAME is required"))?;
    let ty = registry
        .get(&type_name)
        .ok_or_else(|| anyhow!("unknown type '{}' (try --list-types)", type_name))?;

    let mut failed = 0usize;

    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        match check("<stdin>", &src, &ty, style) {
            Some(text) if fix => io::stdout().write_all(text.as_bytes())?,
            Some(_) => {}
            None => failed += 1,
        }
    } else {
        for path in &args {
            let path = Path::new(path);
            let src = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    failed += 1;
                    continue;
                }
            };
            let name = path.display().to_string();
            match check(&name, &src, &ty, style) {
                Some(text) if fix && text != src => {
                    std::fs::write(path, &text).with_context(|| format!("{}: write failed", name))?;
                    if let OutputStyle::Human = style {
                        println!("  {} rewritten", name);
                    }
                }
                Some(_) => {}
                None => failed += 1,
            }
        }
    }

    if let OutputStyle::Human = style {
        println!("{} input(s) failed", failed);
    }
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
