use std::{
    fs,
    io::{self, Write},
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::debug;

/// Replace the contents of `path` by writing a sibling temporary file and renaming it into
/// place, readers never observe a truncated file
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;

    // keep the mode of the file being replaced
    if let Ok(metadata) = fs::metadata(path) {
        file.as_file().set_permissions(metadata.permissions())?;
    }

    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;

    Ok(())
}

/// Rewrite every line starting with `key:` to `<indent>key: rate`, all other lines are kept
/// verbatim. Returns the number of rewritten lines.
pub fn rewrite_rate(contents: &str, key: &str, rate: u32, indent: usize) -> (String, usize) {
    let prefix = format!("{key}:");
    let mut replaced = 0;
    let mut output = String::with_capacity(contents.len());

    for line in contents.split_inclusive('\n') {
        if line.trim().starts_with(&prefix) {
            output.push_str(&format!("{:indent$}{key}: {rate}\n", ""));
            replaced += 1;
        } else {
            output.push_str(line);
        }
    }

    (output, replaced)
}

/// Set the target rate inside a benchmark config
pub fn update_rate(path: &Path, key: &str, rate: u32, indent: usize) -> io::Result<usize> {
    let contents = fs::read_to_string(path)?;
    let (updated, replaced) = rewrite_rate(&contents, key, rate, indent);

    if replaced == 0 {
        debug!(path = ?path, "No {key} line found, config left unchanged");
    }

    write_atomic(path, updated.as_bytes())?;

    Ok(replaced)
}

#[cfg(test)]
mod mutator_test;
