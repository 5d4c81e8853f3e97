//! Source templates for the worker script and the main-thread proxy.
//!
//! Templates are plain text with `{{key}}` placeholders. Rendering fails if
//! a placeholder has no value, so a renamed key cannot silently produce
//! broken JavaScript.

use crate::error::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    name: &'static str,
    text: &'static str,
}

impl Template {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Placeholder keys in order of appearance, duplicates included.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        let mut rest = self.text;
        while let Some(open) = rest.find("{{") {
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    keys.push(&after[..close]);
                    rest = &after[close + 2..];
                }
                None => break,
            }
        }
        keys
    }

    /// Substitute every placeholder. Extra values are ignored.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TransformError> {
        let mut out = String::with_capacity(self.text.len() * 2);
        let mut rest = self.text;
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                out.push_str(&rest[open..]);
                return Ok(out);
            };
            let key = &after[..close];
            let value = values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or_else(|| TransformError::Template {
                    template: self.name,
                    key: key.to_string(),
                })?;
            out.push_str(value);
            rest = &after[close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Script evaluated inside the worker. Runs the function once per message
/// and always answers with exactly one reply; a result that cannot be
/// posted is reported as an error.
pub const WORKER_SCRIPT: Template = Template::new(
    "worker script",
    r#"const {{function}} = {{literal}};
{{capture_declarations}}self.onmessage = function ({{event}}) {
  const { args: {{args}}, messageId: {{message_id}}, externalVars: {{external}} } = {{event}}.data;
{{capture_assignment}}  Promise.resolve()
    .then(() => {{function}}.apply(null, {{args}}))
    .then((result) => self.postMessage({ result, messageId: {{message_id}} }))
    .catch((error) => self.postMessage({ error: error instanceof Error ? error.message : String(error), messageId: {{message_id}} }));
};
"#,
);

/// Top-level slots for captured values inside the worker.
pub const CAPTURE_DECLARATIONS: Template = Template::new("capture declarations", "let {{names}};\n");

/// Copies forwarded values into the capture slots before the call.
pub const CAPTURE_ASSIGNMENT: Template = Template::new(
    "capture assignment",
    "  if ({{external}}) ({ {{names}} } = {{external}});\n",
);

/// Extra field on the call message carrying captured values.
pub const EXTERNAL_VARS: Template = Template::new("external vars", ", externalVars: { {{names}} }");

/// Proxy body: one worker per call, settled by the reply whose `messageId`
/// matches this call. The worker is torn down on settle, including when the
/// call message itself cannot be posted.
pub const CALL_BODY: Template = Template::new(
    "call body",
    r#"  {{counter}} = ({{counter}} || 0) + 1;
  const {{message_id}} = {{prefix}} + {{counter}};
  return new Promise(({{resolve}}, {{reject}}) => {
    const {{url}} = URL.createObjectURL(new Blob([{{script}}], { type: "text/javascript" }));
    const {{worker}} = new Worker({{url}});
    const {{handler}} = ({{event}}) => {
      const {{reply}} = {{event}}.data;
      if (!{{reply}} || {{reply}}.messageId !== {{message_id}}) return;
      {{worker}}.removeEventListener("message", {{handler}});
      {{worker}}.terminate();
      URL.revokeObjectURL({{url}});
      if ("error" in {{reply}}) {{reject}}(new Error({{reply}}.error));
      else {{resolve}}({{reply}}.result);
    };
    {{worker}}.addEventListener("message", {{handler}});
    try {
      {{worker}}.postMessage({ args: {{args}}, messageId: {{message_id}}{{external_vars}} });
    } catch ({{failure}}) {
      {{worker}}.removeEventListener("message", {{handler}});
      {{worker}}.terminate();
      URL.revokeObjectURL({{url}});
      {{reject}}({{failure}});
    }
  });
"#,
);

/// Proxy for a function declaration; stays a hoisted declaration.
pub const FUNCTION_PROXY: Template = Template::new(
    "function proxy",
    "var {{counter}};\n{{export}}function {{name}}(...{{args}}) {\n{{body}}}\n",
);

/// Proxy for a variable bound to a function; keeps the declaration keyword.
pub const VARIABLE_PROXY: Template = Template::new(
    "variable proxy",
    "var {{counter}};\n{{export}}{{kind}} {{name}} = (...{{args}}) => {\n{{body}}};\n",
);

/// Proxy for an immediately-invoked function; still invoked on the spot.
pub const INVOCATION_PROXY: Template = Template::new(
    "invocation proxy",
    "var {{counter}};\n(function (...{{args}}) {\n{{body}}})();\n",
);

/// A declarator that shared a statement with a relocated function.
pub const KEPT_DECLARATOR: Template = Template::new(
    "kept declarator",
    "{{export}}{{kind}} {{declarator}};\n",
);
