//! CLI command implementations

pub mod check;
pub mod explain;
pub mod init;
pub mod transform;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use easythread_diagnostics::{
    DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache, TerminalEmitter,
};
use easythread_transform::TransformOptions;
use walkdir::WalkDir;

use crate::{Output, OutputFormat};

/// Modules under `input` the transform would touch, in a stable order.
///
/// A file given directly is accepted whenever its extension is configured.
/// Directory walks skip `node_modules`, hidden directories and `.d.ts`
/// declaration files.
pub fn collect_sources(input: &Path, options: &TransformOptions) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        if options.is_candidate(&input.to_string_lossy()) {
            return Ok(vec![input.to_path_buf()]);
        }
        anyhow::bail!(
            "{} does not have one of the configured extensions ({})",
            input.display(),
            options.extensions.join(", ")
        );
    }
    if !input.is_dir() {
        anyhow::bail!("{} does not exist", input.display());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(input)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || {
                let name = entry.file_name().to_string_lossy();
                name != "node_modules" && !name.starts_with('.')
            }
        });
    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        let name = path.to_string_lossy();
        if entry.file_type().is_file() && !name.ends_with(".d.ts") && options.is_candidate(&name) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Print collected diagnostics: human-readable on stderr, or one JSON
/// object per line on stdout.
pub fn emit_diagnostics(
    diagnostics: &Diagnostics,
    cache: &SourceCache,
    output: Output,
) -> Result<()> {
    match output.format {
        OutputFormat::Text => {
            let mut emitter = TerminalEmitter::new(std::io::stderr().lock(), output.use_color);
            for diagnostic in diagnostics.iter().filter(|d| !output.quiet || d.is_error()) {
                emitter.emit(diagnostic, cache)?;
            }
            if !output.quiet && !diagnostics.is_empty() {
                emitter.emit_summary(diagnostics)?;
            }
        }
        OutputFormat::Json => {
            let mut stdout = std::io::stdout().lock();
            let mut emitter = JsonEmitter::new(&mut stdout);
            emitter.emit_all(diagnostics, cache)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("easythread-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_collect_sources_skips_dependencies() {
        let root = scratch("collect");
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(root.join("src/main.ts"), "").unwrap();
        fs::write(root.join("src/nested/view.tsx"), "").unwrap();
        fs::write(root.join("src/types.d.ts"), "").unwrap();
        fs::write(root.join("src/style.css"), "").unwrap();
        fs::write(root.join("node_modules/dep/index.js"), "").unwrap();

        let files = collect_sources(&root, &TransformOptions::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, ["src/main.ts", "src/nested/view.tsx"]);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_collect_sources_rejects_other_files() {
        let root = scratch("single");
        let css = root.join("a.css");
        fs::write(&css, "").unwrap();
        assert!(collect_sources(&css, &TransformOptions::default()).is_err());

        let js = root.join("a.js");
        fs::write(&js, "").unwrap();
        assert_eq!(collect_sources(&js, &TransformOptions::default()).unwrap(), [js]);
        fs::remove_dir_all(&root).unwrap();
    }
}
