//! Transform command - rewrite modules on disk or print the result

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use easythread_diagnostics::{Diagnostics, SourceCache};
use easythread_parser::{Dialect, SwcHost};
use easythread_transform::{CaptureMode, DeclarationReport, TransformOptions, Transformer};
use indicatif::{ProgressBar, ProgressStyle};
use similar::{ChangeTag, TextDiff};

use super::{collect_sources, emit_diagnostics};
use crate::config::ProjectConfig;
use crate::{Output, OutputFormat};

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input module or directory
    pub input: PathBuf,

    /// Output file (single input) or directory (directory input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a unified diff instead of writing output
    #[arg(long)]
    pub diff: bool,

    /// Override how captured variables are handled (forward, none)
    #[arg(long)]
    pub capture: Option<CaptureMode>,

    /// Override the marker token
    #[arg(long)]
    pub marker: Option<String>,
}

impl TransformArgs {
    fn options(&self, config: ProjectConfig) -> TransformOptions {
        let mut options = config.transform;
        if let Some(capture) = self.capture {
            options.capture = capture;
        }
        if let Some(marker) = &self.marker {
            options.marker = marker.clone();
        }
        options
    }
}

/// Where the transformed text of one module goes.
#[derive(Debug, PartialEq, Eq)]
enum Sink {
    Stdout,
    File(PathBuf),
    Diff,
}

fn sink_for(args: &TransformArgs, file: &Path) -> Result<Sink> {
    if args.diff {
        return Ok(Sink::Diff);
    }
    match &args.output {
        None if args.input.is_file() => Ok(Sink::Stdout),
        None => Err(anyhow!(
            "transforming a directory needs --output <dir> or --diff"
        )),
        Some(out) if args.input.is_file() => Ok(Sink::File(out.clone())),
        Some(out) => {
            let relative = file.strip_prefix(&args.input).unwrap_or(file);
            Ok(Sink::File(out.join(relative)))
        }
    }
}

fn unified_diff(path: &Path, before: &str, after: &str, use_color: bool) -> String {
    let name = path.display().to_string();
    let diff = TextDiff::from_lines(before, after);
    if !use_color {
        return diff
            .unified_diff()
            .context_radius(3)
            .header(&name, &name)
            .to_string();
    }

    let mut out = format!(
        "{}\n{}\n",
        console::style(format!("--- {}", name)).bold(),
        console::style(format!("+++ {}", name)).bold()
    );
    for group in diff.grouped_ops(3) {
        for op in group {
            for change in diff.iter_changes(&op) {
                let styled = match change.tag() {
                    ChangeTag::Delete => console::style(format!("-{}", change.value())).red().to_string(),
                    ChangeTag::Insert => console::style(format!("+{}", change.value())).green().to_string(),
                    ChangeTag::Equal => format!(" {}", change.value()),
                };
                out.push_str(&styled);
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
    }
    out
}

pub fn run(args: TransformArgs, config: ProjectConfig, output: Output) -> Result<()> {
    let options = args.options(config);
    let files = collect_sources(&args.input, &options)?;
    log::info!(
        "transforming {} module(s), marker `{}`, capture {}",
        files.len(),
        options.marker,
        options.capture
    );

    let progress = if files.len() > 1 && output.format == OutputFormat::Text && !output.quiet {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
                .map(|s| s.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut cache = SourceCache::new();
    let mut diagnostics = Diagnostics::new();
    let mut reports: Vec<(PathBuf, Vec<DeclarationReport>)> = Vec::new();
    let mut failed = 0usize;
    let mut written = 0usize;
    let mut printed = None;

    for file in &files {
        progress.set_message(file.display().to_string());
        let source = fs::read_to_string(file)
            .with_context(|| format!("could not read {}", file.display()))?;
        let file_id = cache.add_file(file, source.clone());
        let host = SwcHost::new(Dialect::for_path(file));
        let transformer = Transformer::new(&host, options.clone());

        match transformer.transform_file(&source, file_id) {
            Ok(result) => {
                diagnostics.extend(result.diagnostics);
                match sink_for(&args, file)? {
                    Sink::Stdout if output.format == OutputFormat::Json => {
                        printed = Some(result.code.clone())
                    }
                    Sink::Stdout => print!("{}", result.code),
                    Sink::Diff => {
                        if result.code != source {
                            progress.suspend(|| {
                                print!("{}", unified_diff(file, &source, &result.code, output.use_color))
                            });
                        }
                    }
                    Sink::File(target) => {
                        if let Some(parent) = target.parent() {
                            fs::create_dir_all(parent)?;
                        }
                        fs::write(&target, &result.code)
                            .with_context(|| format!("could not write {}", target.display()))?;
                        log::debug!("wrote {}", target.display());
                        written += 1;
                    }
                }
                if !result.declarations.is_empty() {
                    reports.push((file.clone(), result.declarations));
                }
            }
            Err(err) => {
                log::debug!("{}: {}", file.display(), err);
                diagnostics.push(err.to_diagnostic(file_id));
                failed += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    emit_diagnostics(&diagnostics, &cache, output)?;

    let relocated: usize = reports.iter().map(|(_, r)| r.len()).sum();
    match output.format {
        OutputFormat::Text => {
            if !output.quiet && written > 0 {
                let line = format!(
                    "Transformed {} module(s), relocated {} declaration(s)",
                    written, relocated
                );
                if output.use_color {
                    eprintln!("{}", console::style(line).green().bold());
                } else {
                    eprintln!("{}", line);
                }
            }
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "type": "summary",
                "success": failed == 0,
                "files": files.len(),
                "failed": failed,
                "written": written,
                "code": printed,
                "declarations": reports
                    .iter()
                    .map(|(path, decls)| serde_json::json!({
                        "file": path.to_string_lossy(),
                        "declarations": decls,
                    }))
                    .collect::<Vec<_>>(),
                "errors": diagnostics.error_count(),
                "warnings": diagnostics.warning_count(),
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    if failed > 0 {
        Err(anyhow!("{} module(s) could not be transformed", failed))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str, output: Option<&str>, diff: bool) -> TransformArgs {
        TransformArgs {
            input: PathBuf::from(input),
            output: output.map(PathBuf::from),
            diff,
            capture: None,
            marker: None,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut a = args("src", None, true);
        a.capture = Some(CaptureMode::Disabled);
        a.marker = Some("@offload".into());
        let options = a.options(ProjectConfig::default());
        assert_eq!(options.capture, CaptureMode::Disabled);
        assert_eq!(options.marker, "@offload");
        assert_eq!(options.extensions.len(), 4);
    }

    #[test]
    fn test_directory_output_mirrors_tree() {
        let a = args("does-not-exist-src", Some("out"), false);
        let sink = sink_for(&a, Path::new("does-not-exist-src/lib/a.ts")).unwrap();
        assert_eq!(sink, Sink::File(PathBuf::from("out/lib/a.ts")));
        assert_eq!(sink_for(&args("x", Some("out"), true), Path::new("x/a.ts")).unwrap(), Sink::Diff);
        assert!(sink_for(&args("missing-dir", None, false), Path::new("missing-dir/a.ts")).is_err());
    }

    #[test]
    fn test_plain_diff() {
        let diff = unified_diff(Path::new("a.js"), "let a = 1;\nlet b = 2;\n", "let a = 1;\nlet b = 3;\n", false);
        assert!(diff.contains("--- a.js"));
        assert!(diff.contains("-let b = 2;"));
        assert!(diff.contains("+let b = 3;"));
        assert!(diff.contains(" let a = 1;"));
    }
}
