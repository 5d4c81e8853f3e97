//! Replaces byte ranges of the original text and reprints the result.

use std::ops::Range;

use easythread_parser::SyntaxHost;

use crate::error::TransformError;

/// Text that replaces `range` of the original module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementSpan {
    pub range: Range<usize>,
    pub text: String,
}

/// Assemble `source` with each range swapped for its replacement.
///
/// Ranges must be ordered and disjoint. Text between them is copied
/// byte-for-byte.
pub fn splice(source: &str, replacements: &[ReplacementSpan]) -> Result<String, TransformError> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for replacement in replacements {
        let Range { start, end } = replacement.range;
        if start < cursor {
            return Err(TransformError::OverlappingReplacement {
                start,
                previous_end: cursor,
            });
        }
        let gap = source
            .get(cursor..start)
            .filter(|_| source.get(start..end).is_some())
            .ok_or(TransformError::ReplacementOutOfBounds {
                start,
                end,
                len: source.len(),
            })?;
        out.push_str(gap);
        out.push_str(&replacement.text);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Parse the assembled text and print it back. A parse failure here means
/// the generated code is broken, which is fatal.
pub(crate) fn regenerate(host: &dyn SyntaxHost, assembled: &str) -> Result<String, TransformError> {
    let parsed = host.parse(assembled).map_err(TransformError::Regenerate)?;
    host.print(&parsed).map_err(TransformError::Print)
}
