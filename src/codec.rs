//! Plain-syntax text codec: parse, print, size estimation and file persistence.
//!
//! The round-trip law holds for every value produced by [`parse`]:
//! `parse(print(v), T) == v` (structural equality, see [`Value`]'s `PartialEq`).

use crate::error::{Error, Result};
use crate::parser;
use crate::print::{Counter, Printer};
use crate::types::TypeRef;
use crate::value::Value;
use log::debug;
use std::fs;
use std::path::Path as FsPath;

pub use crate::print::PrintOptions;

/// Parse the leading value of `text` as `ty`.
///
/// Returns the value and the number of symbols it spans. On failure the error
/// carries the number of symbols accepted before it ([`Error::consumed`]).
pub fn parse(text: &str, ty: &TypeRef) -> Result<(Value, usize)> {
    parser::parse_value(text, ty).map_err(|e| {
        debug!("parse as {} failed: {}", ty.name, e);
        e
    })
}

/// Parse `text` as exactly one value of `ty`, allowing only trailing whitespace
/// and comments.
pub fn parse_complete(text: &str, ty: &TypeRef) -> Result<Value> {
    parser::parse_complete(text, ty)
        .map(|(v, _)| v)
        .map_err(|e| {
            debug!("parse as {} failed: {}", ty.name, e);
            e
        })
}

/// Read a UTF-8 file holding one value of `ty`.
pub fn parse_from_file(path: impl AsRef<FsPath>, ty: &TypeRef) -> Result<Value> {
    let path = path.as_ref();
    debug!("reading {} from {}", ty.name, path.display());
    let text = fs::read_to_string(path)?;
    parse_complete(&text, ty)
}

/// Render `value` in plain syntax. Fails with `Overflow` when the text would exceed
/// `opts.max_len` symbols, and with `IncompleteValue` when a CHOICE that must be
/// printed has no variant selected.
pub fn print(value: &Value, opts: &PrintOptions) -> Result<String> {
    if let Some(max) = opts.max_len {
        let needed = estimate_text_length(value, opts)?;
        if needed > max {
            debug!("print of {} needs {} symbols, {} allowed", value.type_name(), needed, max);
            return Err(Error::Overflow { needed, max });
        }
    }
    let mut out = String::new();
    Printer::new(&mut out).value(value, opts.indent)?;
    Ok(out)
}

/// Print with default options.
pub fn to_text(value: &Value) -> Result<String> {
    print(value, &PrintOptions::default())
}

/// Exact length in symbols of what [`print`] would produce with `opts`.
pub fn estimate_text_length(value: &Value, opts: &PrintOptions) -> Result<usize> {
    let mut counter = Counter::default();
    Printer::new(&mut counter).value(value, opts.indent)?;
    Ok(counter.0)
}

/// Print `value` and write it, newline-terminated, to `path`.
pub fn save_to_file(value: &Value, path: impl AsRef<FsPath>) -> Result<()> {
    let path = path.as_ref();
    let mut text = to_text(value)?;
    text.push('\n');
    debug!("writing {} ({} bytes) to {}", value.type_name(), text.len(), path.display());
    fs::write(path, text)?;
    Ok(())
}
