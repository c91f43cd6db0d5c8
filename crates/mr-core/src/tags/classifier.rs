//! External text classifier boundary.
//!
//! The classifier is optional and untrusted: every call runs on its own thread
//! with a hard deadline, and every failure degrades to "no suggestions".

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Errors from an external classifier call.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("classifier transport error: {0}")]
    Transport(String),

    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),

    #[error("classifier worker exited without a result")]
    Disconnected,
}

impl From<ClassifierError> for mr_common::Error {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Timeout { millis } => mr_common::Error::ClassifierTimeout { millis },
            other => mr_common::Error::ClassifierFailed(other.to_string()),
        }
    }
}

/// Suggests tag codes for a piece of ability text.
pub trait TextClassifier: Send + Sync {
    /// Return candidate tag codes. `timeout` is advisory for implementations
    /// that can bound their own I/O; [`classify_with_deadline`] enforces it.
    fn classify(&self, text: &str, timeout: Duration) -> Result<Vec<String>, ClassifierError>;
}

/// Run a classifier call with a hard deadline.
///
/// The call runs on a worker thread. On timeout the worker is abandoned and
/// its eventual result discarded, so a hung classifier never blocks the caller
/// for longer than `timeout`.
pub fn classify_with_deadline(
    classifier: Arc<dyn TextClassifier>,
    text: &str,
    timeout: Duration,
) -> Result<Vec<String>, ClassifierError> {
    let (tx, rx) = mpsc::channel();
    let text = text.to_string();

    thread::Builder::new()
        .name("mr-classifier".to_string())
        .spawn(move || {
            let _ = tx.send(classifier.classify(&text, timeout));
        })
        .map_err(|e| ClassifierError::Transport(format!("failed to spawn worker: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ClassifierError::Timeout {
            millis: timeout.as_millis() as u64,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ClassifierError::Disconnected),
    }
}

#[cfg(feature = "http-classifier")]
pub use http::HttpTextClassifier;

#[cfg(feature = "http-classifier")]
mod http {
    use super::{ClassifierError, TextClassifier};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize)]
    struct ClassifyRequest<'a> {
        text: &'a str,
    }

    #[derive(Deserialize)]
    struct ClassifyResponse {
        tags: Vec<String>,
    }

    /// Classifier reached over HTTP: POSTs `{"text": ...}` and expects
    /// `{"tags": [...]}` back.
    pub struct HttpTextClassifier {
        endpoint: String,
        api_key: Option<String>,
    }

    impl HttpTextClassifier {
        pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
            Self {
                endpoint: endpoint.into(),
                api_key,
            }
        }

        /// Build from settings, reading the API key from the configured
        /// environment variable if any.
        pub fn from_settings(settings: &mr_config::ClassifierSettings) -> Option<Self> {
            let endpoint = settings.endpoint.as_ref()?;
            let api_key = settings
                .api_key_env
                .as_ref()
                .and_then(|var| std::env::var(var).ok());
            Some(Self::new(endpoint.clone(), api_key))
        }
    }

    impl TextClassifier for HttpTextClassifier {
        fn classify(&self, text: &str, timeout: Duration) -> Result<Vec<String>, ClassifierError> {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            let mut request = agent.post(&self.endpoint);
            if let Some(key) = &self.api_key {
                request = request.set("Authorization", &format!("Bearer {}", key));
            }
            let response = request
                .send_json(ClassifyRequest { text })
                .map_err(|e| ClassifierError::Transport(e.to_string()))?;
            let body: ClassifyResponse = response
                .into_json()
                .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;
            Ok(body.tags)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingClassifier, SlowClassifier, StaticClassifier};
    use std::time::Instant;

    #[test]
    fn test_result_passes_through() {
        let classifier = Arc::new(StaticClassifier::new(&["buff_heal"]));
        let tags = classify_with_deadline(classifier, "Heals", Duration::from_secs(5)).unwrap();
        assert_eq!(tags, vec!["buff_heal".to_string()]);
    }

    #[test]
    fn test_deadline_enforced() {
        let classifier = Arc::new(SlowClassifier::new(Duration::from_secs(5)));
        let start = Instant::now();
        let err = classify_with_deadline(classifier, "text", Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, ClassifierError::Timeout { millis: 50 }));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_error_maps_to_unified_code() {
        let classifier = Arc::new(FailingClassifier);
        let err = classify_with_deadline(classifier, "text", Duration::from_secs(1)).unwrap_err();
        let unified: mr_common::Error = err.into();
        assert_eq!(unified.code(), 41);

        let unified: mr_common::Error = ClassifierError::Timeout { millis: 10 }.into();
        assert_eq!(unified.code(), 40);
    }
}
