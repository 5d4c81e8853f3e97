//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use easythread_diagnostics::DiagnosticCode;

use crate::{Output, OutputFormat};

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., A001, S002)
    pub code: String,
}

struct Explanation {
    code: DiagnosticCode,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [DiagnosticCode],
}

const EXPLANATIONS: &[Explanation] = &[
    Explanation {
        code: DiagnosticCode::ParseError,
        title: "Parse Error",
        description: "The module could not be parsed, so nothing in it was transformed.",
        example: Some("// @easythread\nfunction sum(a, b { return a + b; }"),
        suggestion: Some("Fix the syntax error. TypeScript modules are parsed with decorators and, for .tsx/.jsx, JSX enabled."),
        related: &[DiagnosticCode::OutputParseError],
    },
    Explanation {
        code: DiagnosticCode::OutputParseError,
        title: "Generated Code Does Not Parse",
        description: "After the proxies were spliced in, the module no longer parsed.\n\nThis usually means a relocated function contains syntax the proxy templates do not expect.",
        example: None,
        suggestion: Some("Run `easythread transform --diff -vv` on the file and report the output."),
        related: &[DiagnosticCode::InternalError],
    },
    Explanation {
        code: DiagnosticCode::TypeStripFailed,
        title: "Type Stripping Failed",
        description: "The marked function was cut out of the module, but removing its type annotations failed.",
        example: Some("// @easythread\nfunction f<T extends>(x: T) { return x; }"),
        suggestion: Some("Simplify the function's type annotations or move them to a separate type alias."),
        related: &[DiagnosticCode::NotAFunctionLiteral],
    },
    Explanation {
        code: DiagnosticCode::NotAFunctionLiteral,
        title: "Not a Function Literal",
        description: "After type stripping, the relocated text is not a single function expression, so it cannot be embedded in a worker script.",
        example: Some("// @easythread\nconst f = cond ? () => 1 : () => 2;"),
        suggestion: Some("Bind the function directly: `const f = () => ...` or `function f() { ... }`."),
        related: &[DiagnosticCode::UnclassifiedDeclaration],
    },
    Explanation {
        code: DiagnosticCode::UnclassifiedDeclaration,
        title: "Marked Statement Left Unchanged",
        description: "The marker is on a statement whose shape cannot be relocated. The statement is kept as written.\n\nSupported shapes:\n- function declarations (optionally exported)\n- variables initialised with a function or arrow (optionally exported)\n- immediately-invoked functions without arguments",
        example: Some("// @easythread\n(function (n) { return n * 2; })(21);  // invoked with an argument"),
        suggestion: Some("Remove the arguments from the invocation, or wrap the work in a named function."),
        related: &[DiagnosticCode::UnsupportedMarkerTarget],
    },
    Explanation {
        code: DiagnosticCode::UnsupportedMarkerTarget,
        title: "Marker on Unsupported Statement",
        description: "The marker comment precedes a statement that is never a function, such as a class, an import or an `if` statement.",
        example: Some("// @easythread\nclass Heavy {}"),
        suggestion: Some("Move the marker to the function you want to run in a worker."),
        related: &[DiagnosticCode::UnclassifiedDeclaration],
    },
    Explanation {
        code: DiagnosticCode::CapturedVariables,
        title: "Captured Variables",
        description: "The relocated function reads variables from enclosing scopes. Their current values are copied into the worker with every call.\n\nOnly structured-clonable values survive the copy: functions, DOM nodes and class instances with methods do not. Assignments inside the worker never reach the main thread.",
        example: Some("const rate = 0.2;\n// @easythread\nfunction tax(x) { return x * rate; }"),
        suggestion: Some("Pass the value as an argument, or set `capture = \"none\"` to forward nothing."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::InternalError,
        title: "Internal Error",
        description: "The transform produced inconsistent intermediate results, such as overlapping replacements or an unfilled template slot.",
        example: None,
        suggestion: Some("Please report the module that triggers this error."),
        related: &[DiagnosticCode::OutputParseError],
    },
];

fn find(code: &str) -> Result<&'static Explanation> {
    let code = DiagnosticCode::parse(code.trim())
        .ok_or_else(|| anyhow!("Unknown diagnostic code: {}", code.to_uppercase()))?;
    EXPLANATIONS
        .iter()
        .find(|e| e.code == code)
        .ok_or_else(|| anyhow!("No explanation for {}", code))
}

pub fn run(args: ExplainArgs, output: Output) -> Result<()> {
    let explanation = find(&args.code)?;
    let code = explanation.code.as_str();
    let related: Vec<&str> = explanation.related.iter().map(|c| c.as_str()).collect();

    match output.format {
        OutputFormat::Text => {
            let underline = "=".repeat(code.len() + explanation.title.len() + 2);
            if output.use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    underline
                );
            } else {
                println!("\n{}: {}\n{}", code, explanation.title, underline);
            }
            println!("\n{}\n", explanation.description);

            let sections = [("Example", explanation.example), ("Suggestion", explanation.suggestion)];
            for (heading, body) in sections {
                let Some(body) = body else { continue };
                if output.use_color {
                    println!("{}:", console::style(heading).bold());
                } else {
                    println!("{}:", heading);
                }
                for line in body.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !related.is_empty() {
                if output.use_color {
                    println!("{}: {}", console::style("Related").dim(), related.join(", "));
                } else {
                    println!("Related: {}", related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "code": code,
                "severity": explanation.code.default_severity().to_string(),
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": related,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_is_explained() {
        for code in DiagnosticCode::ALL {
            assert!(find(code.as_str()).is_ok(), "{} has no explanation", code);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(find("a003").unwrap().code, DiagnosticCode::CapturedVariables);
        assert!(find("T001").is_err());
    }
}
