//! Check command - report annotated declarations without writing files

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use easythread_diagnostics::{Diagnostics, SourceCache, Span};
use easythread_parser::{Dialect, SwcHost};
use easythread_transform::{DeclarationReport, FunctionReport, Transformer};

use super::{collect_sources, emit_diagnostics};
use crate::config::ProjectConfig;
use crate::{Output, OutputFormat};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input module or directory
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

fn describe(function: &FunctionReport) -> String {
    let name = function.binding.as_deref().unwrap_or("<anonymous>");
    if function.captured.is_empty() {
        format!("`{}`", name)
    } else {
        format!("`{}` captures {}", name, function.captured.join(", "))
    }
}

fn print_report(
    cache: &SourceCache,
    file_id: easythread_diagnostics::FileId,
    report: &DeclarationReport,
    use_color: bool,
) {
    let position = cache
        .location(Span::from_range(file_id, report.range.clone()))
        .map(|l| format!("{}:{}", l.line, l.column))
        .unwrap_or_default();
    let functions: Vec<String> = report.functions.iter().map(describe).collect();
    if use_color {
        println!(
            "  {:>7}  {}  {}",
            console::style(position).dim(),
            console::style(report.shape).cyan(),
            functions.join("; ")
        );
    } else {
        println!("  {:>7}  {}  {}", position, report.shape, functions.join("; "));
    }
}

pub fn run(args: CheckArgs, config: ProjectConfig, output: Output) -> Result<()> {
    let options = config.transform;
    let files = collect_sources(&args.input, &options)?;

    if files.is_empty() {
        match output.format {
            OutputFormat::Text => {
                if !output.quiet {
                    println!("No modules found.");
                }
            }
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({ "type": "summary", "success": true, "files": 0 })
            ),
        }
        return Ok(());
    }

    let mut cache = SourceCache::new();
    let mut diagnostics = Diagnostics::new();
    let mut modules = Vec::new();
    let mut total = 0usize;

    for file in &files {
        let source = fs::read_to_string(file)
            .with_context(|| format!("could not read {}", file.display()))?;
        let file_id = cache.add_file(file, source.clone());
        let host = SwcHost::new(Dialect::for_path(file));

        match Transformer::new(&host, options.clone()).transform_file(&source, file_id) {
            Ok(result) => {
                diagnostics.extend(result.diagnostics);
                if result.declarations.is_empty() {
                    continue;
                }
                total += result.declarations.len();
                if output.format == OutputFormat::Text && !output.quiet {
                    println!("{}", file.display());
                    for report in &result.declarations {
                        print_report(&cache, file_id, report, output.use_color);
                    }
                }
                modules.push(serde_json::json!({
                    "file": file.to_string_lossy(),
                    "declarations": result.declarations,
                }));
            }
            Err(err) => diagnostics.push(err.to_diagnostic(file_id)),
        }
    }

    emit_diagnostics(&diagnostics, &cache, output)?;

    let errors = diagnostics.error_count();
    let warnings = diagnostics.warning_count();
    let success = errors == 0 && (!args.strict || warnings == 0);
    match output.format {
        OutputFormat::Text => {
            if !output.quiet {
                println!(
                    "\nChecked {} module(s): {} declaration(s) would move to workers",
                    files.len(),
                    total
                );
            }
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "type": "summary",
                "success": success,
                "files": files.len(),
                "modules": modules,
                "errors": errors,
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    if success {
        Ok(())
    } else {
        Err(anyhow!("check failed"))
    }
}
