use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use ndarray::{aview1, s, Array1, Array2};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::error::{LearnError, Result};
use crate::services::algo_helper::activation::Activation;

/// Output of the synthetic bias unit appended to every non-output layer.
pub const BIAS: f64 = 1.0;

/// Neuron count and training parameters of one layer.
///
/// `momentum` and `learning_rate` govern the weights feeding *into* this
/// layer; for the input layer they are accepted but never used, and neither is
/// its activation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub neurons: usize,
    pub activation: Activation,
    pub momentum: f64,
    pub learning_rate: f64,
}

/// Fully connected feed-forward network trained online by backpropagation
/// with classical momentum.
///
/// `weights[i]` connects layer `i` to layer `i + 1` and has shape
/// `(neurons(i) + 1, neurons(i + 1))`; the last row holds the bias weights.
#[derive(Clone, Debug, PartialEq)]
pub struct Perceptron {
    layers: Vec<LayerSpec>,
    weights: Vec<Array2<f64>>,
    weight_deltas: Vec<Array2<f64>>,
    corrections: Vec<Array2<f64>>,
    outputs: Vec<Array1<f64>>,
    errors: Vec<Array1<f64>>,
}

impl Perceptron {
    /// Every layer shares one activation, momentum and learning rate.
    pub fn new(neuron_counts: &[usize], activation: Activation, momentum: f64, learning_rate: f64) -> Result<Self> {
        let n = neuron_counts.len();
        Self::with_layers(neuron_counts, &vec![activation; n], &vec![momentum; n], &vec![learning_rate; n])
    }

    pub fn with_layers(
        neuron_counts: &[usize],
        activations: &[Activation],
        momentums: &[f64],
        learning_rates: &[f64],
    ) -> Result<Self> {
        let n = neuron_counts.len();
        if n < 2 {
            return Err(LearnError::ConfigMismatch(format!("a network needs at least two layers, got {n}")));
        }
        if activations.len() != n || momentums.len() != n || learning_rates.len() != n {
            return Err(LearnError::ConfigMismatch(format!(
                "per-layer arrays disagree: {n} layers, {} activations, {} momentums, {} learning rates",
                activations.len(),
                momentums.len(),
                learning_rates.len()
            )));
        }
        if let Some(layer) = neuron_counts.iter().position(|&c| c == 0) {
            return Err(LearnError::ConfigMismatch(format!("layer {layer} has no neurons")));
        }

        let layers: Vec<LayerSpec> = (0..n)
            .map(|i| LayerSpec {
                neurons: neuron_counts[i],
                activation: activations[i],
                momentum: momentums[i],
                learning_rate: learning_rates[i],
            })
            .collect();
        let shapes: Vec<Array2<f64>> = neuron_counts
            .windows(2)
            .map(|pair| Array2::zeros((pair[0] + 1, pair[1])))
            .collect();

        Ok(Self {
            layers,
            weights: shapes.clone(),
            weight_deltas: shapes.clone(),
            corrections: shapes,
            outputs: neuron_counts.iter().map(|&c| Array1::zeros(c)).collect(),
            errors: neuron_counts.iter().map(|&c| Array1::zeros(c)).collect(),
        })
    }

    pub fn layers(&self) -> &[LayerSpec] { &self.layers }

    pub fn input_width(&self) -> usize { self.layers[0].neurons }

    pub fn output_width(&self) -> usize { self.layers[self.layers.len() - 1].neurons }

    /// Draws every weight uniformly from `[-0.5, 0.5)`, row by row, and clears
    /// the momentum terms.
    pub fn initialize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let between = Uniform::new(-0.5, 0.5);
        for m in &mut self.weights {
            *m = Array2::from_shape_fn(m.raw_dim(), |_| between.sample(rng));
        }
        for m in self.weight_deltas.iter_mut().chain(self.corrections.iter_mut()) {
            m.fill(0.0);
        }
    }

    pub fn zero_weights(&mut self) {
        for m in self.weights.iter_mut().chain(&mut self.weight_deltas).chain(&mut self.corrections) {
            m.fill(0.0);
        }
    }

    /// Weight of link `row -> col` between layer `layer` and `layer + 1`;
    /// `row == neurons(layer)` addresses the bias weight.
    pub fn weight(&self, layer: usize, row: usize, col: usize) -> Result<f64> {
        self.check_link(layer, row, col)?;
        Ok(self.weights[layer][[row, col]])
    }

    pub fn set_weight(&mut self, layer: usize, row: usize, col: usize, value: f64) -> Result<()> {
        self.check_link(layer, row, col)?;
        self.weights[layer][[row, col]] = value;
        Ok(())
    }

    /// Previous update step of a link, the momentum memory.
    pub fn weight_delta(&self, layer: usize, row: usize, col: usize) -> Result<f64> {
        self.check_link(layer, row, col)?;
        Ok(self.weight_deltas[layer][[row, col]])
    }

    fn check_link(&self, layer: usize, row: usize, col: usize) -> Result<()> {
        let m = self.weights.get(layer).ok_or_else(|| LearnError::Range {
            what: "weight layer".into(),
            index: layer,
            bound: self.weights.len(),
        })?;
        let (rows, cols) = m.dim();
        if row >= rows {
            return Err(LearnError::Range { what: "weight row".into(), index: row, bound: rows });
        }
        if col >= cols {
            return Err(LearnError::Range { what: "weight column".into(), index: col, bound: cols });
        }
        Ok(())
    }

    /// Forward pass. Refreshes the per-neuron output caches but never touches
    /// the weights.
    pub fn output_for(&mut self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.input_width() {
            return Err(LearnError::Dimension {
                what: "network input".into(),
                expected: self.input_width(),
                actual: x.len(),
            });
        }
        self.outputs[0].assign(&aview1(x));
        for i in 1..self.layers.len() {
            let activation = self.layers[i].activation;
            let source = &self.outputs[i - 1];
            let w = &self.weights[i - 1];
            let bias_row = source.len();
            let next = Array1::from_shape_fn(w.ncols(), |j| {
                let column = w.column(j);
                activation.apply(BIAS * column[bias_row] + column.slice(s![..bias_row]).dot(source))
            });
            self.outputs[i] = next;
        }
        Ok(self.outputs[self.layers.len() - 1].to_vec())
    }

    /// One online backpropagation step towards `target`.
    ///
    /// Returns the output observed *before* the weights moved.
    pub fn train(&mut self, x: &[f64], target: &[f64]) -> Result<Vec<f64>> {
        if target.len() != self.output_width() {
            return Err(LearnError::Dimension {
                what: "network target".into(),
                expected: self.output_width(),
                actual: target.len(),
            });
        }
        let observed = self.output_for(x)?;
        let last = self.layers.len() - 1;

        let output_activation = self.layers[last].activation;
        self.errors[last] = Array1::from_shape_fn(observed.len(), |j| {
            (target[j] - observed[j]) * output_activation.derivative(observed[j])
        });

        // Deltas for every hidden layer are taken from the pre-update weights.
        for i in (1..last).rev() {
            let activation = self.layers[i].activation;
            let own = self.layers[i].neurons;
            let weighted = self.weights[i].slice(s![..own, ..]).dot(&self.errors[i + 1]);
            let outputs = &self.outputs[i];
            self.errors[i] = Array1::from_shape_fn(own, |k| activation.derivative(outputs[k]) * weighted[k]);
        }

        for i in 0..last {
            let LayerSpec { learning_rate, momentum, .. } = self.layers[i + 1];
            let source = &self.outputs[i];
            let downstream = &self.errors[i + 1];
            let bias_row = source.len();
            let correction = Array2::from_shape_fn(self.weights[i].raw_dim(), |(row, col)| {
                let input = if row < bias_row { source[row] } else { BIAS };
                learning_rate * downstream[col] * input
            });
            let step = &correction + &self.weight_deltas[i].mapv(|d| momentum * d);
            self.weights[i] += &step;
            self.weight_deltas[i] = step;
            self.corrections[i] = correction;
        }
        Ok(observed)
    }

    fn value_count(&self) -> usize {
        3 * self.weights.iter().map(|m| m.len()).sum::<usize>()
            + 2 * self.layers.iter().map(|l| l.neurons).sum::<usize>()
    }

    /// Writes weights, momentum terms, pending corrections and the
    /// output/delta caches, one real per line. Matrices are walked row by row.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        for ((w, d), c) in self.weights.iter().zip(&self.weight_deltas).zip(&self.corrections) {
            for ((w, d), c) in w.iter().zip(d.iter()).zip(c.iter()) {
                writeln!(out, "{w}")?;
                writeln!(out, "{d}")?;
                writeln!(out, "{c}")?;
            }
        }
        for (outputs, errors) in self.outputs.iter().zip(&self.errors) {
            for (o, e) in outputs.iter().zip(errors.iter()) {
                writeln!(out, "{o}")?;
                writeln!(out, "{e}")?;
            }
        }
        out.flush()?;
        info!(path = %path.display(), values = self.value_count(), "saved network");
        Ok(())
    }

    /// Restores a network saved by [`save`](Self::save) into this topology.
    /// Nothing is overwritten unless the whole file parses.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let values = match parse_exact(&text, self.value_count()) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rejected network file");
                return Err(e);
            }
        };

        let mut next = values.into_iter();
        let mut weights = self.weights.clone();
        let mut weight_deltas = self.weight_deltas.clone();
        let mut corrections = self.corrections.clone();
        for ((w, d), c) in weights.iter_mut().zip(weight_deltas.iter_mut()).zip(corrections.iter_mut()) {
            for ((w, d), c) in w.iter_mut().zip(d.iter_mut()).zip(c.iter_mut()) {
                *w = next.next().unwrap_or_default();
                *d = next.next().unwrap_or_default();
                *c = next.next().unwrap_or_default();
            }
        }
        let mut outputs = self.outputs.clone();
        let mut errors = self.errors.clone();
        for (o_layer, e_layer) in outputs.iter_mut().zip(errors.iter_mut()) {
            for (o, e) in o_layer.iter_mut().zip(e_layer.iter_mut()) {
                *o = next.next().unwrap_or_default();
                *e = next.next().unwrap_or_default();
            }
        }

        self.weights = weights;
        self.weight_deltas = weight_deltas;
        self.corrections = corrections;
        self.outputs = outputs;
        self.errors = errors;
        info!(path = %path.display(), "loaded network");
        Ok(())
    }
}

/// Parses exactly `expected` reals, one per line. Blank lines at the end of
/// the file are tolerated, anything else past `expected` is not.
pub(crate) fn parse_exact(text: &str, expected: usize) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(expected);
    for (n, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if values.len() == expected {
            if trimmed.is_empty() {
                continue;
            }
            return Err(LearnError::format(n + 1, format!("trailing data, expected only {expected} values")));
        }
        let value = trimmed
            .parse::<f64>()
            .map_err(|e| LearnError::format(n + 1, format!("'{trimmed}' is not a real number: {e}")))?;
        values.push(value);
    }
    if values.len() < expected {
        return Err(LearnError::format(
            values.len() + 1,
            format!("file ends after {} of {expected} values", values.len()),
        ));
    }
    Ok(values)
}
