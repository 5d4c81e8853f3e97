//! Build-tool entry point.
//!
//! Bundlers call [`transform_module`] for every module they load. Modules
//! outside the configured extensions are declined with `Ok(None)` so the
//! bundler keeps its own copy.

use easythread_parser::{Dialect, SwcHost};
use serde::Serialize;

use crate::error::TransformError;
use crate::options::{module_path, TransformOptions};
use crate::Transformer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookOutput {
    pub code: String,
    /// Source map; not produced yet, bundlers fall back to the input map
    pub map: Option<String>,
}

/// Transform one module loaded by a bundler.
///
/// `id` may carry a `?query` or `#fragment`; the dialect is picked from the
/// path part.
pub fn transform_module(
    id: &str,
    code: &str,
    options: &TransformOptions,
) -> Result<Option<HookOutput>, TransformError> {
    if !options.is_candidate(id) {
        log::trace!("skipping {}", id);
        return Ok(None);
    }

    let host = SwcHost::new(Dialect::for_path(module_path(id)));
    let output = Transformer::new(&host, options.clone()).transform(code)?;
    for diagnostic in output.diagnostics.iter() {
        log::warn!("{}: {}[{}] {}", id, diagnostic.severity, diagnostic.code, diagnostic.message);
    }
    log::debug!("{}: relocated {} declaration(s)", id, output.declarations.len());

    Ok(Some(HookOutput {
        code: output.code,
        map: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declines_other_modules() {
        let options = TransformOptions::default();
        assert_eq!(transform_module("style.css", "body {}", &options).unwrap(), None);
        assert_eq!(transform_module("\0virtual:x.ts", "", &options).unwrap(), None);
    }

    #[test]
    fn test_transforms_with_query_suffix() {
        let options = TransformOptions::default();
        let out = transform_module(
            "src/math.ts?v=3",
            "// @easythread\nexport function twice(n: number) { return <number>n * 2; }\n",
            &options,
        )
        .unwrap()
        .unwrap();
        assert!(out.code.contains("export function twice(...__easythread_args)"));
        assert!(out.map.is_none());
    }

    #[test]
    fn test_tsx_module() {
        let options = TransformOptions::default();
        let out = transform_module(
            "src/View.tsx",
            "export const View = () => <div />;\n// @easythread\nconst sum = (a: number, b: number) => a + b;\n",
            &options,
        )
        .unwrap()
        .unwrap();
        assert!(out.code.contains("<div/>"));
        assert!(out.code.contains("const sum = (...__easythread_args)=>"));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let options = TransformOptions::default();
        let err = transform_module("a.js", "let = ;", &options).unwrap_err();
        assert!(matches!(err, TransformError::Parse(_)));
    }
}
