use std::path::Path;

use anyhow::{Context, Result};

/// Open a written report in the user's default browser
///
/// # Errors
/// Returns error if the path cannot be resolved or no browser is available
pub fn open_report(path: &Path) -> Result<()> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve report path {}", path.display()))?;
    let target = absolute.to_string_lossy();
    webbrowser::open(&target)
        .with_context(|| format!("Failed to open browser for {}", target))?;
    Ok(())
}
