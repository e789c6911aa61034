//! Case file importers.
//!
//! A case lists the nodes, the lines between them, each node's generation
//! offer and each node's demand. Files are TOML or JSON with the same layout
//! (see [`case`]). Importing never validates physics: run
//! [`crate::helpers::validate_network`] on the result for that.
//!
//! ```no_run
//! use lmp_io::importers::load_case;
//!
//! let result = load_case("cases/three_node.toml")?;
//! println!("{}: {} nodes", result.case.name, result.case.network.node_count());
//! for issue in &result.diagnostics.issues {
//!     eprintln!("{issue}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod case;
pub mod format;

use std::path::Path;

use anyhow::{Context, Result};
use lmp_core::Diagnostics;

pub use case::{Case, CaseError, CaseFile, GenerationSpec, ImportResult, LineSpec};
pub use format::CaseFormat;

/// Read a case file, picking the format from its extension (TOML otherwise).
pub fn load_case(path: impl AsRef<Path>) -> Result<ImportResult> {
    let path = path.as_ref();
    let format = CaseFormat::detect(path).unwrap_or(CaseFormat::Toml);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading case file '{}'", path.display()))?;
    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("case");

    let result = format
        .parse_str(&text, default_name)
        .with_context(|| format!("parsing {} '{}'", format, path.display()))?;
    tracing::debug!(
        path = %path.display(),
        nodes = result.case.network.node_count(),
        lines = result.case.network.line_count(),
        issues = result.diagnostics.issues.len(),
        "loaded case"
    );
    Ok(result)
}

/// Write `case` to `path` in the format implied by its extension.
pub fn save_case(case: &Case, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = CaseFormat::detect(path).unwrap_or(CaseFormat::Toml);
    let text = format
        .render(&CaseFile::from_case(case))
        .with_context(|| format!("serializing case '{}'", case.name))?;
    std::fs::write(path, text).with_context(|| format!("writing case to {}", path.display()))
}

pub(crate) fn build_case(file: &CaseFile, default_name: &str) -> Result<ImportResult> {
    let mut diagnostics = Diagnostics::new();
    let case = file.build(default_name, &mut diagnostics)?;
    Ok(ImportResult { case, diagnostics })
}
