//! Globals available in both the page and a dedicated worker.
//!
//! A relocated function that names one of these reads the worker's own
//! binding, so it is never forwarded as a captured variable.

use once_cell::sync::Lazy;
use std::collections::HashSet;

static BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Language values and namespaces
        "undefined", "NaN", "Infinity", "globalThis", "arguments",
        "Math", "JSON", "Reflect", "Atomics", "Intl", "WebAssembly", "console",
        // Constructors
        "Object", "Function", "Array", "String", "Number", "Boolean", "Symbol", "BigInt",
        "Date", "RegExp", "Map", "Set", "WeakMap", "WeakSet", "WeakRef",
        "FinalizationRegistry", "Promise", "Proxy", "Error", "TypeError", "RangeError",
        "SyntaxError", "ReferenceError", "EvalError", "URIError", "AggregateError",
        "ArrayBuffer", "SharedArrayBuffer", "DataView", "Int8Array", "Uint8Array",
        "Uint8ClampedArray", "Int16Array", "Uint16Array", "Int32Array", "Uint32Array",
        "Float32Array", "Float64Array", "BigInt64Array", "BigUint64Array",
        // Global functions
        "parseInt", "parseFloat", "isNaN", "isFinite", "encodeURI", "encodeURIComponent",
        "decodeURI", "decodeURIComponent", "escape", "unescape", "eval",
        "structuredClone", "queueMicrotask", "reportError",
        // Timers
        "setTimeout", "clearTimeout", "setInterval", "clearInterval",
        "requestAnimationFrame", "cancelAnimationFrame",
        // Networking
        "fetch", "Request", "Response", "Headers", "AbortController", "AbortSignal",
        "WebSocket", "EventSource", "XMLHttpRequest", "FormData",
        "URL", "URLSearchParams",
        // Encoding and binary data
        "TextEncoder", "TextDecoder", "atob", "btoa", "Blob", "File", "FileReader",
        "FileReaderSync", "ReadableStream", "WritableStream", "TransformStream",
        "CompressionStream", "DecompressionStream",
        // Storage
        "indexedDB", "IDBKeyRange", "caches", "CacheStorage",
        // Messaging and workers
        "self", "postMessage", "onmessage", "close", "importScripts",
        "MessageChannel", "MessagePort", "BroadcastChannel", "Worker", "SharedWorker",
        "Event", "EventTarget", "CustomEvent", "MessageEvent",
        // Environment
        "navigator", "location", "performance", "crypto", "origin",
        "isSecureContext", "OffscreenCanvas", "ImageData", "createImageBitmap",
    ]
    .into_iter()
    .collect()
});

/// Whether `name` is a global the worker provides itself.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_globals_are_builtin() {
        for name in ["self", "Promise", "String", "Error", "Worker", "URL", "Blob"] {
            assert!(is_builtin(name), "{} should be builtin", name);
        }
    }

    #[test]
    fn test_common_globals() {
        assert!(is_builtin("setTimeout"));
        assert!(is_builtin("fetch"));
        assert!(is_builtin("TextEncoder"));
        assert!(is_builtin("indexedDB"));
        assert!(!is_builtin("document"));
        assert!(!is_builtin("window"));
        assert!(!is_builtin("config"));
    }
}
