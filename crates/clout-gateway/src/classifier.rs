use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Ordinal verdict scale used by the safe-content classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    /// "likely" or worse: the threshold at which a signal counts toward
    /// the heat score.
    pub fn at_least_likely(self) -> bool {
        self >= Likelihood::Likely
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SafeSearchVerdict {
    #[serde(default)]
    pub adult: Likelihood,
    #[serde(default)]
    pub racy: Likelihood,
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier transport error: {0}")]
    Transport(String),
    #[error("classifier returned status {0}")]
    Provider(u16),
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait SafeSearchClassifier: Send + Sync {
    async fn safe_search(&self, image_uri: &str) -> Result<SafeSearchVerdict, ClassifierError>;
}

/// Vision-API-shaped HTTP classifier: one `images:annotate` call per image
/// asking only for safe-search detection.
pub struct HttpSafeSearchClassifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSafeSearchClassifier {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    safe_search_annotation: Option<SafeSearchVerdict>,
}

#[async_trait]
impl SafeSearchClassifier for HttpSafeSearchClassifier {
    async fn safe_search(&self, image_uri: &str) -> Result<SafeSearchVerdict, ClassifierError> {
        let body = json!({
            "requests": [{
                "image": { "source": { "imageUri": image_uri } },
                "features": [{ "type": "SAFE_SEARCH_DETECTION" }]
            }]
        });

        let resp = self
            .http
            .post(format!("{}/v1/images:annotate", self.endpoint))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClassifierError::Provider(resp.status().as_u16()));
        }

        let parsed: AnnotateResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        parsed
            .responses
            .into_iter()
            .next()
            .and_then(|r| r.safe_search_annotation)
            .ok_or_else(|| ClassifierError::Malformed("missing safeSearchAnnotation".into()))
    }
}
