//! The message protocol spoken between a proxy and its worker.
//!
//! The generated JavaScript is the real implementation. These types mirror
//! it for hosts that want to drive or inspect the exchange from Rust, and
//! [`CallLedger`] reproduces the proxy's correlation rules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Proxy to worker: one per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMessage {
    pub args: Vec<Value>,
    pub message_id: String,
    /// Captured variables, present when capture forwarding is on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_vars: Option<Map<String, Value>>,
}

/// Worker to proxy: exactly one per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMessage {
    Failure {
        error: String,
        #[serde(rename = "messageId")]
        message_id: String,
    },
    Success {
        #[serde(default)]
        result: Value,
        #[serde(rename = "messageId")]
        message_id: String,
    },
}

impl ReplyMessage {
    pub fn message_id(&self) -> &str {
        match self {
            ReplyMessage::Failure { message_id, .. } | ReplyMessage::Success { message_id, .. } => {
                message_id
            }
        }
    }
}

/// Error text thrown inside the worker, surfaced as a rejected call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkerError {
    pub message: String,
}

/// Lifecycle of one proxied call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Created,
    Posted,
    AwaitingReply,
    Resolved,
    Rejected,
    Terminated,
}

/// A call whose reply has arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub message_id: String,
    pub outcome: Result<Value, WorkerError>,
    /// States the call passed through after being posted
    pub states: Vec<InvocationState>,
}

/// Issues call messages for one relocated function and matches replies to
/// them by `messageId`, the way the generated proxy does.
#[derive(Debug)]
pub struct CallLedger {
    prefix: String,
    counter: u64,
    pending: HashMap<String, Vec<InvocationState>>,
}

impl CallLedger {
    /// `prefix` is the function's correlation prefix, e.g. `"sum:0:"`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            pending: HashMap::new(),
        }
    }

    /// Start a call and return the message to post to its worker.
    pub fn call(
        &mut self,
        args: Vec<Value>,
        external_vars: Option<Map<String, Value>>,
    ) -> CallMessage {
        self.counter += 1;
        let message_id = format!("{}{}", self.prefix, self.counter);
        self.pending.insert(
            message_id.clone(),
            vec![
                InvocationState::Created,
                InvocationState::Posted,
                InvocationState::AwaitingReply,
            ],
        );
        CallMessage {
            args,
            message_id,
            external_vars,
        }
    }

    /// Settle the call a reply belongs to. Replies for unknown or already
    /// settled ids are ignored, as the proxy's listener ignores them.
    pub fn deliver(&mut self, reply: ReplyMessage) -> Option<Settled> {
        let mut states = self.pending.remove(reply.message_id())?;
        let (message_id, outcome) = match reply {
            ReplyMessage::Success { result, message_id } => {
                states.push(InvocationState::Resolved);
                (message_id, Ok(result))
            }
            ReplyMessage::Failure { error, message_id } => {
                states.push(InvocationState::Rejected);
                (message_id, Err(WorkerError { message: error }))
            }
        };
        states.push(InvocationState::Terminated);
        Some(Settled {
            message_id,
            outcome,
            states,
        })
    }

    /// Current state of a call, `None` once it has settled.
    pub fn state(&self, message_id: &str) -> Option<InvocationState> {
        self.pending.get(message_id).and_then(|s| s.last().copied())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{CALL_BODY, EXTERNAL_VARS, WORKER_SCRIPT};
    use serde_json::json;

    #[test]
    fn test_call_message_wire_format() {
        let mut ledger = CallLedger::new("sum:0:");
        let mut external = Map::new();
        external.insert("limit".into(), json!(10));
        let msg = ledger.call(vec![json!(1), json!([2, 3])], Some(external));

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "args": [1, [2, 3]], "messageId": "sum:0:1", "externalVars": { "limit": 10 } })
        );

        let bare = ledger.call(vec![], None);
        assert_eq!(
            serde_json::to_value(&bare).unwrap(),
            json!({ "args": [], "messageId": "sum:0:2" })
        );
    }

    #[test]
    fn test_reply_parsing() {
        let ok: ReplyMessage = serde_json::from_value(json!({ "result": 42, "messageId": "a" })).unwrap();
        assert_eq!(
            ok,
            ReplyMessage::Success {
                result: json!(42),
                message_id: "a".into()
            }
        );

        let err: ReplyMessage =
            serde_json::from_value(json!({ "error": "boom", "messageId": "b" })).unwrap();
        assert!(matches!(err, ReplyMessage::Failure { ref error, .. } if error == "boom"));

        let undefined_result: ReplyMessage =
            serde_json::from_value(json!({ "messageId": "c" })).unwrap();
        assert_eq!(
            undefined_result,
            ReplyMessage::Success {
                result: Value::Null,
                message_id: "c".into()
            }
        );
    }

    #[test]
    fn test_replies_in_reverse_order() {
        let mut ledger = CallLedger::new("square:0:");
        let first = ledger.call(vec![json!(2)], None);
        let second = ledger.call(vec![json!(3)], None);
        assert_eq!(ledger.state(&first.message_id), Some(InvocationState::AwaitingReply));

        let settled_second = ledger
            .deliver(ReplyMessage::Success {
                result: json!(9),
                message_id: second.message_id.clone(),
            })
            .unwrap();
        let settled_first = ledger
            .deliver(ReplyMessage::Success {
                result: json!(4),
                message_id: first.message_id.clone(),
            })
            .unwrap();

        assert_eq!(settled_first.message_id, first.message_id);
        assert_eq!(settled_first.outcome, Ok(json!(4)));
        assert_eq!(settled_second.outcome, Ok(json!(9)));
        assert_eq!(ledger.pending(), 0);
    }

    #[test]
    fn test_error_surfaces_message() {
        let mut ledger = CallLedger::new("explode:0:");
        let call = ledger.call(vec![], None);
        let settled = ledger
            .deliver(ReplyMessage::Failure {
                error: "boom".into(),
                message_id: call.message_id,
            })
            .unwrap();

        assert_eq!(settled.outcome.unwrap_err().to_string(), "boom");
        assert_eq!(
            settled.states,
            [
                InvocationState::Created,
                InvocationState::Posted,
                InvocationState::AwaitingReply,
                InvocationState::Rejected,
                InvocationState::Terminated,
            ]
        );
    }

    #[test]
    fn test_foreign_and_duplicate_replies_are_ignored() {
        let mut ledger = CallLedger::new("f:0:");
        let call = ledger.call(vec![], None);
        let reply = ReplyMessage::Success {
            result: json!(1),
            message_id: call.message_id.clone(),
        };

        assert!(ledger
            .deliver(ReplyMessage::Success {
                result: json!(0),
                message_id: "g:1:1".into()
            })
            .is_none());
        assert!(ledger.deliver(reply.clone()).is_some());
        assert!(ledger.deliver(reply).is_none());
        assert_eq!(ledger.state(&call.message_id), None);
    }

    #[test]
    fn test_templates_speak_the_protocol() {
        let msg = serde_json::to_value(CallMessage {
            args: vec![],
            message_id: "x".into(),
            external_vars: Some(Map::new()),
        })
        .unwrap();
        for field in msg.as_object().unwrap().keys() {
            let in_call = CALL_BODY.text().contains(&format!("{}:", field))
                || EXTERNAL_VARS.text().contains(&format!("{}:", field));
            assert!(in_call, "proxy never sends `{}`", field);
            assert!(WORKER_SCRIPT.text().contains(&format!("{}:", field)), "worker never reads `{}`", field);
        }

        let reply_fields = ["result", "error", "messageId"];
        for field in reply_fields {
            assert!(WORKER_SCRIPT.text().contains(field));
            assert!(CALL_BODY.text().contains(field));
        }
    }
}
