use std::path::Path;

use anyhow::{Result, bail};

/// Fails when the output path exists but is not a directory.
pub(crate) fn ensure_output_dir_usable(output_dir: Option<&Path>) -> Result<()> {
    let Some(dir) = output_dir else {
        return Ok(());
    };
    if dir.exists() && !dir.is_dir() {
        bail!(
            "Output path '{}' exists and is not a directory.\n  \
             Pass a directory with -o DIR",
            dir.display()
        );
    }
    Ok(())
}

/// Fails when a cookie file was given but cannot be found.
pub(crate) fn ensure_cookie_file_exists(cookie_file: Option<&Path>) -> Result<()> {
    let Some(path) = cookie_file else {
        return Ok(());
    };
    if !path.is_file() {
        bail!(
            "Cookie file '{}' not found.\n  \
             Export cookies in Netscape format and pass the file with --cookies FILE",
            path.display()
        );
    }
    Ok(())
}

/// Fails when URLs are given both as arguments and through `--input`.
pub(crate) fn reject_mixed_url_sources(urls: &[String], input: Option<&Path>) -> Result<()> {
    if !urls.is_empty() && input.is_some() {
        bail!(
            "URLs were given both as arguments and with --input.\n  \
             Use one source per run"
        );
    }
    Ok(())
}
