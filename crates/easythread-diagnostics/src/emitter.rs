//! Diagnostic emitters for terminal and JSON output.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use console::Style;
use std::io::Write;

/// Something that can render diagnostics.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag, cache)?;
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// Human-readable output with a source snippet and caret underline.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn style(&self, style: Style) -> Style {
        style.force_styling(self.colored)
    }

    fn severity_style(&self, severity: Severity) -> Style {
        let style = match severity {
            Severity::Error => Style::new().red(),
            Severity::Warning => Style::new().yellow(),
            Severity::Hint => Style::new().blue(),
        };
        self.style(style)
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let sev = self.severity_style(diagnostic.severity);
        let gutter = self.style(Style::new().cyan());

        // error[P001]: message
        writeln!(
            self.writer,
            "{}: {}",
            sev.clone().bold().apply_to(format!(
                "{}[{}]",
                diagnostic.severity,
                diagnostic.code
            )),
            diagnostic.message
        )?;

        if let Some(loc) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {} {}", gutter.apply_to("-->"), loc)?;

            let snippet = cache
                .get_file(diagnostic.span.file_id)
                .and_then(|file| file.line_text(loc.line));
            if let Some(line_text) = snippet {
                let number = loc.line.to_string();
                let pad = " ".repeat(number.len());
                let col = (loc.column - 1) as usize;
                let room = line_text.len().saturating_sub(col).max(1);
                let carets = "^".repeat((diagnostic.span.len() as usize).clamp(1, room));

                writeln!(self.writer, "{} {}", pad, gutter.apply_to("|"))?;
                writeln!(self.writer, "{} {} {}", gutter.apply_to(&number), gutter.apply_to("|"), line_text)?;
                writeln!(
                    self.writer,
                    "{} {} {}{}",
                    pad,
                    gutter.apply_to("|"),
                    " ".repeat(col),
                    sev.apply_to(carets)
                )?;
            }
        }

        for note in &diagnostic.notes {
            writeln!(self.writer, "  {} {}", gutter.apply_to("= note:"), note)?;
        }
        if let Some(help) = &diagnostic.help {
            writeln!(self.writer, "  {} {}", gutter.apply_to("= help:"), help)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();
        if errors == 0 && warnings == 0 {
            return Ok(());
        }

        let plural = |n: usize| if n == 1 { "" } else { "s" };
        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(format!("{} error{}", errors, plural(errors)));
        }
        if warnings > 0 {
            parts.push(format!("{} warning{}", warnings, plural(warnings)));
        }
        let severity = if errors > 0 {
            Severity::Error
        } else {
            Severity::Warning
        };
        writeln!(
            self.writer,
            "{}",
            self.severity_style(severity)
                .apply_to(format!("{} emitted", parts.join(" and ")))
        )
    }
}

/// One JSON object per line, for editor and CI integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let json = serde_json::json!({
            "type": "diagnostic",
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": cache.location(diagnostic.span),
            "span": if diagnostic.span.is_dummy() {
                serde_json::Value::Null
            } else {
                serde_json::json!({
                    "start": diagnostic.span.start,
                    "end": diagnostic.span.end,
                })
            },
            "help": diagnostic.help,
            "notes": diagnostic.notes,
        });
        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)
    }
}
