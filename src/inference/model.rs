use std::path::Path;

use ndarray::{Array1, Array2, s};
use safetensors::{Dtype, SafeTensors};

use super::ModelError;

/// Parameters of the embedding → LSTM → two dense layers classifier,
/// laid out like a PyTorch state dict.
#[derive(Debug, Clone)]
pub struct LstmWeights {
    /// `[vocab, embed]`
    pub embedding: Array2<f32>,
    /// `[4 * hidden, embed]`, gate order input, forget, cell, output
    pub weight_ih: Array2<f32>,
    /// `[4 * hidden, hidden]`
    pub weight_hh: Array2<f32>,
    pub bias_ih: Array1<f32>,
    pub bias_hh: Array1<f32>,
    /// `[dense, hidden]`
    pub fc1_weight: Array2<f32>,
    pub fc1_bias: Array1<f32>,
    /// `[classes, dense]`
    pub fc2_weight: Array2<f32>,
    pub fc2_bias: Array1<f32>,
}

#[derive(Debug, Clone)]
pub struct LstmClassifier {
    weights: LstmWeights,
    // bias_ih + bias_hh, summed once
    gate_bias: Array1<f32>,
}

impl LstmClassifier {
    pub fn new(weights: LstmWeights) -> Result<Self, ModelError> {
        let (_, embed) = weights.embedding.dim();
        let (gates, ih_cols) = weights.weight_ih.dim();
        if gates == 0 || gates % 4 != 0 {
            return Err(shape_error("lstm.weight_ih_l0 rows must be 4 * hidden"));
        }
        let hidden = gates / 4;
        if ih_cols != embed {
            return Err(shape_error("lstm.weight_ih_l0 columns must match embedding size"));
        }
        if weights.weight_hh.dim() != (gates, hidden) {
            return Err(shape_error("lstm.weight_hh_l0 must be [4 * hidden, hidden]"));
        }
        if weights.bias_ih.len() != gates || weights.bias_hh.len() != gates {
            return Err(shape_error("lstm biases must have 4 * hidden entries"));
        }
        let (dense, fc1_cols) = weights.fc1_weight.dim();
        if fc1_cols != hidden || weights.fc1_bias.len() != dense {
            return Err(shape_error("fc1 must map hidden state to its bias width"));
        }
        let (classes, fc2_cols) = weights.fc2_weight.dim();
        if classes == 0 || fc2_cols != dense || weights.fc2_bias.len() != classes {
            return Err(shape_error("fc2 must map fc1 output to the class scores"));
        }

        let gate_bias = &weights.bias_ih + &weights.bias_hh;
        Ok(Self { weights, gate_bias })
    }

    pub fn from_safetensors(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path)?;
        let tensors = SafeTensors::deserialize(&bytes)?;

        let weights = LstmWeights {
            embedding: matrix(&tensors, "embedding.weight")?,
            weight_ih: matrix(&tensors, "lstm.weight_ih_l0")?,
            weight_hh: matrix(&tensors, "lstm.weight_hh_l0")?,
            bias_ih: vector(&tensors, "lstm.bias_ih_l0")?,
            bias_hh: vector(&tensors, "lstm.bias_hh_l0")?,
            fc1_weight: matrix(&tensors, "fc1.weight")?,
            fc1_bias: vector(&tensors, "fc1.bias")?,
            fc2_weight: matrix(&tensors, "fc2.weight")?,
            fc2_bias: vector(&tensors, "fc2.bias")?,
        };
        Self::new(weights)
    }

    pub fn vocab_size(&self) -> usize {
        self.weights.embedding.nrows()
    }

    pub fn hidden_size(&self) -> usize {
        self.weights.weight_hh.ncols()
    }

    pub fn num_classes(&self) -> usize {
        self.weights.fc2_bias.len()
    }

    /// Unnormalised class scores for one padded index sequence.
    pub fn forward(&self, tokens: &[u32]) -> Result<Array1<f32>, ModelError> {
        let w = &self.weights;
        let hidden = self.hidden_size();
        let mut h = Array1::<f32>::zeros(hidden);
        let mut c = Array1::<f32>::zeros(hidden);

        for &token in tokens {
            let idx = token as usize;
            if idx >= self.vocab_size() {
                return Err(ModelError::TokenOutOfRange {
                    index: token,
                    vocab: self.vocab_size(),
                });
            }
            let x = w.embedding.row(idx);
            let gates = w.weight_ih.dot(&x) + w.weight_hh.dot(&h) + &self.gate_bias;

            let i = gates.slice(s![0..hidden]).mapv(sigmoid);
            let f = gates.slice(s![hidden..2 * hidden]).mapv(sigmoid);
            let g = gates.slice(s![2 * hidden..3 * hidden]).mapv(f32::tanh);
            let o = gates.slice(s![3 * hidden..]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f32::tanh);
        }

        // dropout layers are identity at inference
        let dense = (w.fc1_weight.dot(&h) + &w.fc1_bias).mapv(|v| v.max(0.0));
        Ok(w.fc2_weight.dot(&dense) + &w.fc2_bias)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax.
pub fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// Index of the largest value, first one on ties.
pub fn argmax(values: &Array1<f32>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

fn shape_error(msg: &str) -> ModelError {
    ModelError::Invalid(msg.to_string())
}

fn tensor_f32(tensors: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<f32>), ModelError> {
    let view = tensors.tensor(name)?;
    if view.dtype() != Dtype::F32 {
        return Err(ModelError::Invalid(format!(
            "{name} has dtype {:?}, expected F32",
            view.dtype()
        )));
    }
    let data = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((view.shape().to_vec(), data))
}

fn matrix(tensors: &SafeTensors<'_>, name: &str) -> Result<Array2<f32>, ModelError> {
    let (shape, data) = tensor_f32(tensors, name)?;
    match shape.as_slice() {
        &[rows, cols] => Ok(Array2::from_shape_vec((rows, cols), data)?),
        _ => Err(ModelError::Invalid(format!("{name} must be 2-dimensional, got {shape:?}"))),
    }
}

fn vector(tensors: &SafeTensors<'_>, name: &str) -> Result<Array1<f32>, ModelError> {
    let (shape, data) = tensor_f32(tensors, name)?;
    if shape.len() != 1 {
        return Err(ModelError::Invalid(format!("{name} must be 1-dimensional, got {shape:?}")));
    }
    Ok(Array1::from(data))
}
