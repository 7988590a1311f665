//! Request, result and feedback types exchanged with the classifier service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::normalize::NormalizedTensor;

/// Which remote model classifies the drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Convolutional network.
    #[default]
    Cnn,
    /// Recurrent network.
    Rnn,
    /// Logistic regression baseline.
    LogisticRegression,
}

impl ModelKind {
    /// Path segment of the inference endpoint for this model.
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Cnn => "cnninfer",
            Self::Rnn => "rnninfer",
            Self::LogisticRegression => "lrinfer",
        }
    }

    /// Human readable name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Cnn => "CNN",
            Self::Rnn => "RNN",
            Self::LogisticRegression => "Logistic Regression",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ModelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cnn" | "cnninfer" => Ok(Self::Cnn),
            "rnn" | "rnninfer" => Ok(Self::Rnn),
            "lr" | "lrinfer" | "logistic-regression" | "logistic_regression" => {
                Ok(Self::LogisticRegression)
            }
            _ => Err(CoreError::UnknownModel(s.to_string())),
        }
    }
}

/// A normalized drawing bound for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    /// Normalized pixels in wire order.
    pub pixels: NormalizedTensor,
    /// Target model.
    pub model: ModelKind,
}

impl InferenceRequest {
    /// JSON body for the inference endpoint.
    #[must_use]
    pub fn body(&self) -> InferenceBody<'_> {
        InferenceBody {
            pixels: self.pixels.as_slice(),
        }
    }
}

/// Wire body of an inference call: `{"pixels": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceBody<'a> {
    /// Flattened pixel values.
    pub pixels: &'a [f32],
}

/// Prediction returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Predicted character.
    pub label: String,
    /// Opaque correlation token, echoed verbatim in feedback.
    #[serde(rename = "img_name")]
    pub correlation_token: String,
}

/// The user's judgement of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The label matched what was drawn.
    Correct,
    /// The label was wrong.
    Incorrect,
}

impl Verdict {
    /// Wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "correct" | "yes" | "y" => Ok(Self::Correct),
            "incorrect" | "no" | "n" => Ok(Self::Incorrect),
            _ => Err(CoreError::UnknownVerdict(s.to_string())),
        }
    }
}

/// Feedback for one prediction, keyed by its correlation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Token from the prediction being judged.
    #[serde(rename = "img_name")]
    pub correlation_token: String,
    /// The user's verdict.
    #[serde(rename = "user_feedback")]
    pub verdict: Verdict,
}
