//! Utility functions for file output and argument parsing

use crate::error::{Error, Result};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `contents` to `path` via a sibling temporary file and a rename
///
/// Readers never observe a half-written file: either the old contents or the
/// new contents are visible. The temporary file is removed if any step fails.
///
/// # Examples
///
/// ```no_run
/// use flowq::utils::write_atomic;
/// use std::path::Path;
///
/// write_atomic(Path::new("results.json"), br#"{"data": {}}"#).unwrap();
/// ```
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = temp_sibling(path);

    let result = (|| {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Parse a filter argument given on the command line
///
/// Accepts inline JSON (`{"ipAddresses": {"includes": ["10.0.0.1"]}}`) or
/// `@path` to read the JSON from a file.
///
/// # Examples
///
/// ```
/// use flowq::utils::parse_filter_arg;
///
/// let filter = parse_filter_arg("subject", r#"{"hostGroups": {"includes": [1]}}"#).unwrap();
/// assert_eq!(filter["hostGroups"]["includes"][0], 1);
/// ```
pub fn parse_filter_arg(name: &str, raw: &str) -> Result<Value> {
    let (source, text) = match raw.strip_prefix('@') {
        Some(file) => {
            let text = std::fs::read_to_string(file).map_err(|e| {
                Error::config(format!("cannot read {name} filter file {file}: {e}"), name)
            })?;
            (file.to_string(), text)
        }
        None => ("argument".to_string(), raw.to_string()),
    };

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| Error::config(format!("invalid JSON in {name} {source}: {e}"), name))?;
    if !value.is_object() {
        return Err(Error::config(
            format!("{name} filter must be a JSON object"),
            name,
        ));
    }
    Ok(value)
}
