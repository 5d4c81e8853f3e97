//! Runs transformed modules in V8 against an in-memory worker host.
//!
//! `Worker`, `Blob` and object URLs are replaced by a small shim that
//! evaluates the worker script in the same isolate and delivers messages on
//! microtasks. Messages are copied the way structured clone copies them, so
//! functions fail to post exactly as they do in a browser.

use deno_core::{v8, JsRuntime, RuntimeOptions};
use easythread_parser::SwcHost;
use serde_json::{json, Value};

use crate::{TransformOptions, Transformer};

const WORKER_HOST: &str = r#"
globalThis.host = { workers: [], urls: new Map(), nextUrl: 0, holdReplies: false, held: [] };

function cloneForPost(value) {
  if (typeof value === "function" || typeof value === "symbol") {
    throw new Error("DataCloneError: " + typeof value + " could not be cloned.");
  }
  if (Array.isArray(value)) return value.map(cloneForPost);
  if (value && typeof value === "object") {
    const out = {};
    for (const key of Object.keys(value)) out[key] = cloneForPost(value[key]);
    return out;
  }
  return value;
}

globalThis.Blob = class {
  constructor(parts) { this.text = parts.join(""); }
};

globalThis.URL = {
  createObjectURL(blob) {
    const url = "blob:" + host.nextUrl++;
    host.urls.set(url, blob.text);
    return url;
  },
  revokeObjectURL(url) { host.urls.delete(url); },
};

host.deliver = (worker, data) => {
  if (worker.terminated) return;
  for (const listener of [...worker.listeners]) listener({ data });
};

globalThis.Worker = class {
  constructor(url) {
    this.terminated = false;
    this.posted = 0;
    this.listeners = new Set();
    const worker = this;
    const scope = {
      onmessage: null,
      postMessage(data) {
        const copy = cloneForPost(data);
        worker.posted++;
        if (host.holdReplies) host.held.push({ worker, data: copy });
        else Promise.resolve().then(() => host.deliver(worker, copy));
      },
    };
    this.scope = scope;
    new Function("self", host.urls.get(url))(scope);
    host.workers.push(this);
  }
  addEventListener(type, listener) { if (type === "message") this.listeners.add(listener); }
  removeEventListener(type, listener) { if (type === "message") this.listeners.delete(listener); }
  postMessage(data) {
    const copy = cloneForPost(data);
    Promise.resolve().then(() => {
      if (!this.terminated && this.scope.onmessage) this.scope.onmessage({ data: copy });
    });
  }
  terminate() { this.terminated = true; }
};

globalThis.settle = async () => {
  for (let i = 0; i < 100; i++) await null;
};
"#;

fn transformed(source: &str) -> String {
    let host = SwcHost::default();
    Transformer::new(&host, TransformOptions::default())
        .transform(source)
        .unwrap()
        .code
}

/// Evaluate `module` after the host shim, then the async `scenario` body.
/// Returns the scenario's value, or `{ uncaught }` if it threw.
fn run(module: &str, scenario: &str) -> Value {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());
    runtime
        .execute_script("<worker-host>", WORKER_HOST.to_string())
        .unwrap();
    runtime
        .execute_script("<module>", transformed(module))
        .unwrap();
    runtime
        .execute_script(
            "<scenario>",
            format!(
                "(async () => {{\n{}\n}})().then((v) => {{ globalThis.outcome = v; }}, \
                 (e) => {{ globalThis.outcome = {{ uncaught: String(e) }}; }});",
                scenario
            ),
        )
        .unwrap();

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(runtime.run_event_loop(Default::default()))
        .unwrap();

    let outcome = runtime
        .execute_script(
            "<outcome>",
            "JSON.stringify(globalThis.outcome ?? { pending: true })".to_string(),
        )
        .unwrap();
    let scope = &mut runtime.handle_scope();
    let text = v8::Local::new(scope, outcome).to_rust_string_lossy(scope);
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_replies_settle_by_message_id() {
    let got = run(
        "// @easythread\nfunction square(x) { return x * x; }\n",
        r#"
        host.holdReplies = true;
        const first = square(2);
        const second = square(3);
        await settle();
        const held = host.held.splice(0);
        host.deliver(host.workers[0], { result: -1, messageId: "square:0:999" });
        for (const { worker, data } of held.reverse()) host.deliver(worker, data);
        return {
          results: await Promise.all([first, second]),
          terminated: host.workers.map((w) => w.terminated),
          posted: host.workers.map((w) => w.posted),
          urls: host.urls.size,
        };
        "#,
    );
    assert_eq!(
        got,
        json!({ "results": [4, 9], "terminated": [true, true], "posted": [1, 1], "urls": 0 })
    );
}

#[test]
fn test_thrown_error_rejects_the_call() {
    let got = run(
        "// @easythread\nfunction fail() { throw new Error(\"boom\"); }\n",
        r#"
        try {
          await fail();
          return { resolved: true };
        } catch (e) {
          return { message: e.message, terminated: host.workers[0].terminated, urls: host.urls.size };
        }
        "#,
    );
    assert_eq!(got, json!({ "message": "boom", "terminated": true, "urls": 0 }));
}

#[test]
fn test_uncloneable_result_rejects_instead_of_hanging() {
    let got = run(
        "// @easythread\nfunction giveFn() { return () => 1; }\n",
        r#"
        try {
          await giveFn();
          return { resolved: true };
        } catch (e) {
          return { message: e.message, posted: host.workers[0].posted, terminated: host.workers[0].terminated };
        }
        "#,
    );
    assert!(
        got["message"].as_str().unwrap_or_default().contains("could not be cloned"),
        "{}",
        got
    );
    assert_eq!(got["posted"], 1);
    assert_eq!(got["terminated"], true);
}

#[test]
fn test_failed_call_post_tears_down_worker() {
    let got = run(
        "function helper() { return 1; }\n// @easythread\nfunction useHelper() { return helper(); }\n",
        r#"
        try {
          await useHelper();
          return { resolved: true };
        } catch (e) {
          const worker = host.workers[0];
          return {
            message: e.message,
            terminated: worker.terminated,
            listeners: worker.listeners.size,
            urls: host.urls.size,
          };
        }
        "#,
    );
    assert!(
        got["message"].as_str().unwrap_or_default().contains("could not be cloned"),
        "{}",
        got
    );
    assert_eq!(got["terminated"], true);
    assert_eq!(got["listeners"], 0);
    assert_eq!(got["urls"], 0);
}

#[test]
fn test_captured_values_reach_the_worker() {
    let got = run(
        "const rate = 3;\n// @easythread\nconst scale = (x) => x * rate;\n",
        "return { scaled: await scale(5), again: await scale(2), calls: host.workers.length };",
    );
    assert_eq!(got, json!({ "scaled": 15, "again": 6, "calls": 2 }));
}
