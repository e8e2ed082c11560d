//! NLU client adapter — intent detection against the provider.
//!
//! # Public API
//!
//! - [`IntentDetector`] — the seam handlers depend on
//! - [`dialogflow::DialogflowClient`] — Dialogflow ES v2 implementation
//! - [`process_message`] — detect an intent, degrading to an empty result on error
//! - [`SessionId`] — provider session identifier derived from the caller

pub mod dialogflow;

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error};

/// Number of hex digits kept from the hashed caller address.
const SESSION_ID_LEN: usize = 32;

/// Errors that can occur while talking to the NLU provider.
#[derive(Debug, Error)]
pub enum NluError {
    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Intent detection result relayed to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NluResult {
    /// Display name of the matched intent, empty when none matched.
    pub intent: String,
    /// Provider-supplied detection confidence.
    pub confidence: f32,
    /// Parameter name → flattened value.
    pub entities: BTreeMap<String, String>,
    /// Provider fulfillment messages, passed through untouched.
    pub fulfillment_messages: Vec<serde_json::Value>,
}

/// Identifier that correlates conversational turns with one provider session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Derive a session id from the caller's network address.
    ///
    /// Provider session ids are limited to 36 path-safe characters, so the
    /// address is hashed rather than embedded.
    pub fn from_remote_addr(addr: &SocketAddr) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(addr.to_string().as_bytes());
        let mut digest = format!("{:x}", hasher.finalize());
        digest.truncate(SESSION_ID_LEN);
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Detects intents in free text.
///
/// Implementations are shared across in-flight requests.
#[async_trait]
pub trait IntentDetector: Send + Sync {
    async fn detect_intent(
        &self,
        text: &str,
        session_id: &SessionId,
    ) -> Result<NluResult, NluError>;
}

/// Detect the intent of `text`, returning an empty result on any failure.
///
/// Failures are logged; callers cannot tell "no intent matched" from
/// "request failed".
pub async fn process_message(
    detector: &dyn IntentDetector,
    text: &str,
    session_id: &SessionId,
) -> NluResult {
    match detector.detect_intent(text, session_id).await {
        Ok(result) => {
            debug!(
                session = %session_id,
                intent = %result.intent,
                confidence = result.confidence,
                entities = result.entities.len(),
                "intent detected"
            );
            result
        }
        Err(e) => {
            error!(session = %session_id, "Error in communication with Dialogflow: {e}");
            NluResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingDetector;

    #[async_trait]
    impl IntentDetector for FailingDetector {
        async fn detect_intent(&self, _: &str, _: &SessionId) -> Result<NluResult, NluError> {
            Err(NluError::Transport("connection refused".into()))
        }
    }

    struct EchoDetector;

    #[async_trait]
    impl IntentDetector for EchoDetector {
        async fn detect_intent(
            &self,
            text: &str,
            session_id: &SessionId,
        ) -> Result<NluResult, NluError> {
            let mut entities = BTreeMap::new();
            entities.insert("session".to_string(), session_id.to_string());
            Ok(NluResult {
                intent: text.to_string(),
                confidence: 0.5,
                entities,
                fulfillment_messages: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn failure_degrades_to_empty_result() {
        let sid = SessionId::from("s1".to_string());
        let result = process_message(&FailingDetector, "hello", &sid).await;
        assert_eq!(result, NluResult::default());
        assert!(result.intent.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert!(result.entities.is_empty());
    }

    #[tokio::test]
    async fn success_is_passed_through() {
        let sid = SessionId::from("s2".to_string());
        let result = process_message(&EchoDetector, "greeting", &sid).await;
        assert_eq!(result.intent, "greeting");
        assert_eq!(result.entities["session"], "s2");
    }

    #[test]
    fn session_id_is_stable_and_bounded() {
        let addr: SocketAddr = "203.0.113.7:51234".parse().unwrap();
        let a = SessionId::from_remote_addr(&addr);
        let b = SessionId::from_remote_addr(&addr);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), SESSION_ID_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn session_id_differs_per_address() {
        let a: SocketAddr = "203.0.113.7:51234".parse().unwrap();
        let b: SocketAddr = "[2001:db8::1]:51234".parse().unwrap();
        assert_ne!(SessionId::from_remote_addr(&a), SessionId::from_remote_addr(&b));
    }

    #[test]
    fn result_serializes_with_wire_names() {
        let json = serde_json::to_value(NluResult::default()).unwrap();
        assert_eq!(json["intent"], "");
        assert_eq!(json["confidence"], 0.0);
        assert!(json["entities"].as_object().unwrap().is_empty());
        assert!(json["fulfillmentMessages"].as_array().unwrap().is_empty());
    }
}
