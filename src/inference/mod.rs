// 情感推理模块
// 文本清洗 → 分词补齐 → LSTM 前向 → softmax

pub mod label_encoder;
pub mod model;
pub mod preprocess;
pub mod tokenizer;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use label_encoder::LabelEncoder;
pub use model::{LstmClassifier, LstmWeights};
pub use preprocess::clean_text;
pub use tokenizer::WordTokenizer;

pub const DEFAULT_MAX_LEN: usize = 100;
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const MODEL_FILE: &str = "lstm_sentiment_model.safetensors";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed artifact json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed safetensors file: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),
    #[error("tensor shape mismatch: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
    #[error("token index {index} outside vocabulary of {vocab}")]
    TokenOutOfRange { index: u32, vocab: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub sentiment: String,
    pub confidence: f64,
}

/// Outcome of one prediction; stored verbatim as the review's result payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentResult {
    pub text: String,
    pub predicted_sentiment: String,
    /// label → confidence in percent
    pub confidences: BTreeMap<String, f64>,
    pub chart_data: Vec<ChartPoint>,
}

/// Tokenizer, label encoder and network loaded once and shared read-only.
#[derive(Debug)]
pub struct SentimentClassifier {
    tokenizer: WordTokenizer,
    labels: LabelEncoder,
    model: LstmClassifier,
    max_len: usize,
}

impl SentimentClassifier {
    pub fn new(
        mut tokenizer: WordTokenizer,
        labels: LabelEncoder,
        model: LstmClassifier,
        max_len: usize,
    ) -> Result<Self, ModelError> {
        if max_len == 0 {
            return Err(ModelError::Invalid("max sequence length must be positive".into()));
        }
        if labels.len() != model.num_classes() {
            return Err(ModelError::Invalid(format!(
                "label encoder has {} classes but the model outputs {}",
                labels.len(),
                model.num_classes()
            )));
        }
        tokenizer.clamp_vocab(model.vocab_size())?;

        Ok(Self {
            tokenizer,
            labels,
            model,
            max_len,
        })
    }

    pub fn load(dir: &Path, max_len: usize) -> Result<Self, ModelError> {
        tracing::info!("Loading sentiment model artifacts from {}", dir.display());

        let tokenizer = WordTokenizer::from_file(&dir.join(TOKENIZER_FILE))?;
        let labels = LabelEncoder::from_file(&dir.join(LABEL_ENCODER_FILE))?;
        let model = LstmClassifier::from_safetensors(&dir.join(MODEL_FILE))?;

        tracing::info!(
            vocab = model.vocab_size(),
            hidden = model.hidden_size(),
            classes = ?labels.classes(),
            "Sentiment model loaded"
        );
        Self::new(tokenizer, labels, model, max_len)
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn predict(&self, text: &str) -> Result<SentimentResult, ModelError> {
        let cleaned = clean_text(text);
        let tokens = self.tokenizer.encode(&cleaned, self.max_len);
        let logits = self.model.forward(&tokens)?;
        let probs = model::softmax(&logits);

        let best = model::argmax(&probs)
            .ok_or_else(|| ModelError::Invalid("model produced no class scores".into()))?;
        let predicted = self
            .labels
            .inverse_transform(best)
            .ok_or_else(|| ModelError::Invalid(format!("no label for class index {best}")))?;

        let chart_data: Vec<ChartPoint> = self
            .labels
            .classes()
            .iter()
            .zip(probs.iter())
            .map(|(label, &p)| ChartPoint {
                sentiment: label.clone(),
                confidence: f64::from(p) * 100.0,
            })
            .collect();
        let confidences = chart_data
            .iter()
            .map(|point| (point.sentiment.clone(), point.confidence))
            .collect();

        Ok(SentimentResult {
            text: text.to_string(),
            predicted_sentiment: predicted.to_string(),
            confidences,
            chart_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn classifier() -> SentimentClassifier {
        let index: HashMap<String, u32> = ["<OOV>", "great", "app", "terrible", "slow", "okay"]
            .iter()
            .enumerate()
            .map(|(i, w)| (w.to_string(), i as u32 + 1))
            .collect();
        let tokenizer = WordTokenizer::new(index, Some(10_000), Some("<OOV>")).unwrap();
        let labels = LabelEncoder::new(vec![
            "negative".into(),
            "neutral".into(),
            "positive".into(),
        ])
        .unwrap();
        let model = LstmClassifier::new(model::tests::synthetic_weights(10, 4, 6, 3)).unwrap();
        SentimentClassifier::new(tokenizer, labels, model, 20).unwrap()
    }

    #[test]
    fn prediction_is_a_known_label_with_full_confidence_mass() {
        let clf = classifier();
        for text in ["Great app!", "terrible, SLOW <br> app", "", "okay http://a.b", "ünïcödé only"] {
            let result = clf.predict(text).unwrap();
            assert!(clf.labels().classes().contains(&result.predicted_sentiment));
            let total: f64 = result.confidences.values().sum();
            assert!((total - 100.0).abs() < 1e-3, "total {total} for {text:?}");
            assert_eq!(result.chart_data.len(), 3);
            assert_eq!(result.text, text);
        }
    }

    #[test]
    fn predicted_label_has_highest_confidence() {
        let result = classifier().predict("the app is great").unwrap();
        let best = result
            .chart_data
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .unwrap();
        assert_eq!(best.sentiment, result.predicted_sentiment);
        assert_eq!(result.confidences[&best.sentiment], best.confidence);
    }

    #[test]
    fn prediction_is_deterministic() {
        let clf = classifier();
        assert_eq!(clf.predict("slow app").unwrap(), clf.predict("slow app").unwrap());
    }

    #[test]
    fn vocabulary_is_clamped_to_embedding_rows() {
        let index = HashMap::from([("<OOV>".to_string(), 1), ("huge".to_string(), 500)]);
        let tokenizer = WordTokenizer::new(index, None, Some("<OOV>")).unwrap();
        let labels = LabelEncoder::new(vec!["a".into(), "b".into()]).unwrap();
        let model = LstmClassifier::new(model::tests::synthetic_weights(4, 2, 2, 2)).unwrap();
        let clf = SentimentClassifier::new(tokenizer, labels, model, 5).unwrap();
        assert!(clf.predict("huge").is_ok());
    }

    #[test]
    fn label_count_must_match_model_output() {
        let tokenizer = WordTokenizer::new(HashMap::new(), None, None).unwrap();
        let labels = LabelEncoder::new(vec!["a".into(), "b".into()]).unwrap();
        let model = LstmClassifier::new(model::tests::synthetic_weights(4, 2, 2, 3)).unwrap();
        assert!(SentimentClassifier::new(tokenizer, labels, model, 5).is_err());
    }
}
