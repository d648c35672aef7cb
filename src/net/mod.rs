//! Evolvable multi-layer perceptron substrate
//!
//! This module implements the network representation the mutation engine
//! operates on: a stack of dense layers stored as flattened row-major weight
//! matrices, pure Rust with no libtorch dependency. It supports:
//!
//! - forward passes and minibatch gradient accumulation
//! - structural edits (add/remove layers, grow/shrink layers) that preserve
//!   overlapping weights and freshly initialize the rest
//! - per-layer activation swaps and magnitude-scaled weight noise
//! - momentum-based optimizer state sized to the topology
//! - JSON/bincode checkpointing with shape validation on load
//!
//! The output layer is always linear; its dimension is fixed by the action
//! space and never changes under mutation.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::EvolveError;

/// Nonlinearity applied after a layer's affine transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified linear unit
    ReLU,
    /// Hyperbolic tangent
    Tanh,
    /// Exponential linear unit (alpha = 1)
    Elu,
    /// Identity, used for output layers
    Linear,
}

impl Activation {
    /// Candidate set for activation mutation (output layers excluded)
    pub const MUTABLE: [Activation; 3] = [Activation::ReLU, Activation::Tanh, Activation::Elu];

    /// Apply the activation to a pre-activation value
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Elu => {
                if x >= 0.0 {
                    x
                } else {
                    x.exp() - 1.0
                }
            }
            Activation::Linear => x,
        }
    }

    /// Derivative with respect to the pre-activation value
    pub fn derivative(self, x: f32) -> f32 {
        match self {
            Activation::ReLU => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Activation::Elu => {
                if x >= 0.0 {
                    1.0
                } else {
                    x.exp()
                }
            }
            Activation::Linear => 1.0,
        }
    }
}

/// One dense layer: flattened row-major weights plus biases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Weight matrix, `weights[i * in_features + j]`
    pub weights: Vec<f32>,

    /// Bias vector, one entry per output feature
    pub biases: Vec<f32>,

    /// Input dimension
    pub in_features: usize,

    /// Output dimension
    pub out_features: usize,

    /// Nonlinearity applied after the affine transform
    pub activation: Activation,
}

impl Layer {
    /// Create a layer with uniform `[-1/sqrt(in), 1/sqrt(in)]` initialization
    pub fn random(
        in_features: usize,
        out_features: usize,
        activation: Activation,
        rng: &mut StdRng,
    ) -> Self {
        let bound = 1.0 / (in_features as f32).sqrt();
        let weights = (0..in_features * out_features)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let biases = (0..out_features).map(|_| rng.gen_range(-bound..bound)).collect();
        Self { weights, biases, in_features, out_features, activation }
    }

    /// Affine transform without the activation
    pub fn affine(&self, input: &[f32]) -> Vec<f32> {
        assert_eq!(input.len(), self.in_features, "input size mismatch");
        let mut output = vec![0.0; self.out_features];
        for i in 0..self.out_features {
            let row = i * self.in_features;
            let mut sum = self.biases[i];
            for j in 0..self.in_features {
                sum += self.weights[row + j] * input[j];
            }
            output[i] = sum;
        }
        output
    }

    /// Full forward pass: affine transform followed by the activation
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.affine(input);
        for v in &mut out {
            *v = self.activation.apply(*v);
        }
        out
    }

    /// Copy the overlapping region of `src` into this layer
    ///
    /// Preserved rows/columns keep their trained weights; entries outside the
    /// overlap keep their fresh initialization.
    fn copy_overlap(&mut self, src: &Layer) {
        let rows = self.out_features.min(src.out_features);
        let cols = self.in_features.min(src.in_features);
        for i in 0..rows {
            for j in 0..cols {
                self.weights[i * self.in_features + j] = src.weights[i * src.in_features + j];
            }
            self.biases[i] = src.biases[i];
        }
    }

    fn validate_shapes(&self) -> Result<(), EvolveError> {
        if self.weights.len() != self.in_features * self.out_features {
            return Err(EvolveError::ShapeMismatch(format!(
                "layer declares {}x{} but holds {} weights",
                self.out_features,
                self.in_features,
                self.weights.len()
            )));
        }
        if self.biases.len() != self.out_features {
            return Err(EvolveError::ShapeMismatch(format!(
                "layer declares {} outputs but holds {} biases",
                self.out_features,
                self.biases.len()
            )));
        }
        Ok(())
    }
}

/// Architecture bounds and initial layout for an evolvable MLP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlpConfig {
    /// Initial hidden layer widths
    pub hidden_sizes: Vec<usize>,

    /// Activation for freshly created hidden layers
    pub activation: Activation,

    /// Minimum number of hidden layers under mutation
    pub min_hidden_layers: usize,

    /// Maximum number of hidden layers under mutation
    pub max_hidden_layers: usize,

    /// Minimum nodes per hidden layer under mutation
    pub min_nodes: usize,

    /// Maximum nodes per hidden layer under mutation
    pub max_nodes: usize,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![64, 64],
            activation: Activation::ReLU,
            min_hidden_layers: 1,
            max_hidden_layers: 3,
            min_nodes: 16,
            max_nodes: 256,
        }
    }
}

impl MlpConfig {
    /// Validate architecture bounds before the run starts
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.hidden_sizes.is_empty() {
            return Err(EvolveError::Configuration(
                "at least one hidden layer is required".into(),
            ));
        }
        if self.min_hidden_layers == 0 || self.min_hidden_layers > self.max_hidden_layers {
            return Err(EvolveError::Configuration(format!(
                "hidden layer bounds [{}, {}] are invalid",
                self.min_hidden_layers, self.max_hidden_layers
            )));
        }
        if self.min_nodes == 0 || self.min_nodes > self.max_nodes {
            return Err(EvolveError::Configuration(format!(
                "node bounds [{}, {}] are invalid",
                self.min_nodes, self.max_nodes
            )));
        }
        let layers_ok = (self.min_hidden_layers..=self.max_hidden_layers)
            .contains(&self.hidden_sizes.len());
        if !layers_ok {
            return Err(EvolveError::Configuration(format!(
                "{} initial hidden layers outside [{}, {}]",
                self.hidden_sizes.len(),
                self.min_hidden_layers,
                self.max_hidden_layers
            )));
        }
        for &width in &self.hidden_sizes {
            if !(self.min_nodes..=self.max_nodes).contains(&width) {
                return Err(EvolveError::Configuration(format!(
                    "hidden width {} outside [{}, {}]",
                    width, self.min_nodes, self.max_nodes
                )));
            }
        }
        Ok(())
    }
}

/// Per-layer gradient accumulator matching a network's topology
#[derive(Debug, Clone)]
pub struct MlpGradients {
    /// Weight gradients, one flattened matrix per layer
    pub weights: Vec<Vec<f32>>,

    /// Bias gradients, one vector per layer
    pub biases: Vec<Vec<f32>>,
}

impl MlpGradients {
    /// Create zeroed gradients shaped like `net`
    pub fn zeros(net: &EvolvableMlp) -> Self {
        Self {
            weights: net.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            biases: net.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect(),
        }
    }
}

/// Momentum buffers for gradient descent, sized to one network topology
///
/// Architecture mutation invalidates these buffers; [`SgdMomentum::reset`]
/// reinitializes them to the new shape instead of carrying stale values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdMomentum {
    velocity_w: Vec<Vec<f32>>,
    velocity_b: Vec<Vec<f32>>,
    momentum: f32,
}

impl SgdMomentum {
    /// Create zeroed velocity buffers shaped like `net`
    pub fn new(net: &EvolvableMlp, momentum: f32) -> Self {
        Self {
            velocity_w: net.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            velocity_b: net.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect(),
            momentum,
        }
    }

    /// Check whether the buffers match the network's current topology
    pub fn matches(&self, net: &EvolvableMlp) -> bool {
        self.velocity_w.len() == net.layers.len()
            && net
                .layers
                .iter()
                .zip(&self.velocity_w)
                .all(|(l, v)| l.weights.len() == v.len())
    }

    /// Reinitialize buffers for a (possibly new) topology
    pub fn reset(&mut self, net: &EvolvableMlp) {
        self.velocity_w = net.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect();
        self.velocity_b = net.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect();
    }
}

/// Feedforward network whose architecture is subject to mutation
///
/// Hidden layers carry a mutable activation each; the final layer is linear
/// and its output dimension is pinned to the action space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolvableMlp {
    input_dim: usize,
    output_dim: usize,
    layers: Vec<Layer>,
    config: MlpConfig,
}

impl EvolvableMlp {
    /// Build a network from an architecture config
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        config: MlpConfig,
        rng: &mut StdRng,
    ) -> Result<Self, EvolveError> {
        config.validate()?;
        if input_dim == 0 || output_dim == 0 {
            return Err(EvolveError::Configuration(
                "input and output dimensions must be positive".into(),
            ));
        }

        let mut layers = Vec::with_capacity(config.hidden_sizes.len() + 1);
        let mut in_features = input_dim;
        for &width in &config.hidden_sizes {
            layers.push(Layer::random(in_features, width, config.activation, rng));
            in_features = width;
        }
        layers.push(Layer::random(in_features, output_dim, Activation::Linear, rng));

        Ok(Self { input_dim, output_dim, layers, config })
    }

    /// Input dimension
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Output dimension (action-space determined, never mutated)
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Number of hidden layers
    pub fn num_hidden_layers(&self) -> usize {
        self.layers.len() - 1
    }

    /// Current hidden layer widths
    pub fn hidden_sizes(&self) -> Vec<usize> {
        self.layers[..self.layers.len() - 1].iter().map(|l| l.out_features).collect()
    }

    /// Activations of the hidden layers
    pub fn hidden_activations(&self) -> Vec<Activation> {
        self.layers[..self.layers.len() - 1].iter().map(|l| l.activation).collect()
    }

    /// Architecture bounds this network mutates within
    pub fn arch_config(&self) -> &MlpConfig {
        &self.config
    }

    /// Read access to the layer stack
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Forward pass through all layers
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut x = input.to_vec();
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        x
    }

    /// Greedy argmax over the network output
    pub fn argmax(&self, input: &[f32]) -> i64 {
        let out = self.forward(input);
        let mut best = 0;
        for (i, &v) in out.iter().enumerate() {
            if v > out[best] {
                best = i;
            }
        }
        best as i64
    }

    /// Insert a fresh hidden layer before the output layer
    ///
    /// The new layer is square on the last hidden width so downstream shapes
    /// are untouched. Returns `false` when the layer bound is already met.
    pub fn add_layer(&mut self, rng: &mut StdRng) -> bool {
        if self.num_hidden_layers() >= self.config.max_hidden_layers {
            return false;
        }
        let width = self.layers[self.layers.len() - 2].out_features;
        let layer = Layer::random(width, width, self.config.activation, rng);
        let output_idx = self.layers.len() - 1;
        self.layers.insert(output_idx, layer);
        true
    }

    /// Remove the last hidden layer
    ///
    /// The output layer is rebuilt against the new preceding width, copying
    /// the overlapping weights. Returns `false` at the lower layer bound.
    pub fn remove_layer(&mut self, rng: &mut StdRng) -> bool {
        if self.num_hidden_layers() <= self.config.min_hidden_layers {
            return false;
        }
        let removed_idx = self.layers.len() - 2;
        self.layers.remove(removed_idx);

        let new_in = self.layers[self.layers.len() - 2].out_features;
        let old_output = self.layers.remove(self.layers.len() - 1);
        let mut output = Layer::random(new_in, self.output_dim, Activation::Linear, rng);
        output.copy_overlap(&old_output);
        self.layers.push(output);
        true
    }

    /// Grow hidden layer `idx` by `count` nodes, clamped to the node bound
    ///
    /// The grown layer and its successor are rebuilt with overlap-preserving
    /// copies; new rows and columns keep their fresh initialization. Returns
    /// `false` when clamping leaves the width unchanged.
    pub fn add_nodes(&mut self, idx: usize, count: usize, rng: &mut StdRng) -> bool {
        let max_nodes = self.config.max_nodes;
        self.resize_hidden(idx, move |width| (width + count).min(max_nodes), rng)
    }

    /// Shrink hidden layer `idx` by `count` nodes, clamped to the node bound
    pub fn remove_nodes(&mut self, idx: usize, count: usize, rng: &mut StdRng) -> bool {
        let min_nodes = self.config.min_nodes;
        self.resize_hidden(
            idx,
            move |width| width.saturating_sub(count).max(min_nodes),
            rng,
        )
    }

    fn resize_hidden<F>(&mut self, idx: usize, new_width: F, rng: &mut StdRng) -> bool
    where
        F: Fn(usize) -> usize,
    {
        assert!(idx < self.num_hidden_layers(), "hidden layer index out of bounds");
        let old_width = self.layers[idx].out_features;
        let width = new_width(old_width);
        if width == old_width {
            return false;
        }

        let activation = self.layers[idx].activation;
        let mut grown = Layer::random(self.layers[idx].in_features, width, activation, rng);
        grown.copy_overlap(&self.layers[idx]);
        self.layers[idx] = grown;

        let next = &self.layers[idx + 1];
        let mut successor =
            Layer::random(width, next.out_features, next.activation, rng);
        successor.copy_overlap(next);
        self.layers[idx + 1] = successor;
        true
    }

    /// Swap the activation of hidden layer `idx`, keeping all weights
    ///
    /// The output layer is action-space determined and cannot be retargeted;
    /// passing its index returns `false`.
    pub fn set_layer_activation(&mut self, idx: usize, activation: Activation) -> bool {
        if idx >= self.num_hidden_layers() {
            return false;
        }
        self.layers[idx].activation = activation;
        true
    }

    /// Add magnitude-scaled Gaussian noise to one layer's weights
    ///
    /// Each weight receives `N(0, sd) * |w|`; shapes are unchanged.
    pub fn perturb_layer(&mut self, idx: usize, sd: f32, rng: &mut StdRng) {
        assert!(idx < self.layers.len(), "layer index out of bounds");
        for w in &mut self.layers[idx].weights {
            let noise: f32 = rng.sample(StandardNormal);
            *w += noise * sd * w.abs();
        }
    }

    /// Accumulate gradients for one sample into `grads`
    ///
    /// `output_grad` is the loss gradient with respect to the network output.
    pub fn accumulate_gradients(
        &self,
        input: &[f32],
        output_grad: &[f32],
        grads: &mut MlpGradients,
    ) {
        assert_eq!(output_grad.len(), self.output_dim, "output gradient size mismatch");

        // Forward pass, caching layer inputs and pre-activations.
        let mut inputs: Vec<Vec<f32>> = Vec::with_capacity(self.layers.len());
        let mut pres: Vec<Vec<f32>> = Vec::with_capacity(self.layers.len());
        let mut x = input.to_vec();
        for layer in &self.layers {
            let pre = layer.affine(&x);
            let post: Vec<f32> = pre.iter().map(|&v| layer.activation.apply(v)).collect();
            inputs.push(x);
            pres.push(pre);
            x = post;
        }

        let last = self.layers.len() - 1;
        let mut delta: Vec<f32> = output_grad
            .iter()
            .zip(&pres[last])
            .map(|(&g, &p)| g * self.layers[last].activation.derivative(p))
            .collect();

        for l in (0..self.layers.len()).rev() {
            let layer = &self.layers[l];
            let x_in = &inputs[l];
            for i in 0..layer.out_features {
                grads.biases[l][i] += delta[i];
                let row = i * layer.in_features;
                for j in 0..layer.in_features {
                    grads.weights[l][row + j] += delta[i] * x_in[j];
                }
            }
            if l > 0 {
                let prev_act = self.layers[l - 1].activation;
                let mut next_delta = vec![0.0; layer.in_features];
                for (j, nd) in next_delta.iter_mut().enumerate() {
                    let mut sum = 0.0;
                    for i in 0..layer.out_features {
                        sum += layer.weights[i * layer.in_features + j] * delta[i];
                    }
                    *nd = sum * prev_act.derivative(pres[l - 1][j]);
                }
                delta = next_delta;
            }
        }
    }

    /// Apply accumulated gradients with momentum
    pub fn apply_gradients(&mut self, grads: &MlpGradients, opt: &mut SgdMomentum, lr: f32) {
        assert!(opt.matches(self), "optimizer state does not match topology");
        let momentum = opt.momentum;
        for (l, layer) in self.layers.iter_mut().enumerate() {
            for (w, (v, g)) in layer
                .weights
                .iter_mut()
                .zip(opt.velocity_w[l].iter_mut().zip(&grads.weights[l]))
            {
                *v = momentum * *v - lr * g;
                *w += *v;
            }
            for (b, (v, g)) in layer
                .biases
                .iter_mut()
                .zip(opt.velocity_b[l].iter_mut().zip(&grads.biases[l]))
            {
                *v = momentum * *v - lr * g;
                *b += *v;
            }
        }
    }

    /// Polyak-average another network's weights into this one
    ///
    /// `w = tau * other + (1 - tau) * w`. Both networks must share a
    /// topology; differing shapes fail with [`EvolveError::ShapeMismatch`].
    pub fn soft_update_from(&mut self, other: &EvolvableMlp, tau: f32) -> Result<(), EvolveError> {
        if self.layers.len() != other.layers.len() {
            return Err(EvolveError::ShapeMismatch(format!(
                "cannot blend {} layers into {}",
                other.layers.len(),
                self.layers.len()
            )));
        }
        for (mine, theirs) in self.layers.iter_mut().zip(&other.layers) {
            if mine.in_features != theirs.in_features || mine.out_features != theirs.out_features {
                return Err(EvolveError::ShapeMismatch(format!(
                    "layer shapes {}x{} vs {}x{} differ",
                    mine.out_features, mine.in_features, theirs.out_features, theirs.in_features
                )));
            }
            for (w, t) in mine.weights.iter_mut().zip(&theirs.weights) {
                *w = tau * t + (1.0 - tau) * *w;
            }
            for (b, t) in mine.biases.iter_mut().zip(&theirs.biases) {
                *b = tau * t + (1.0 - tau) * *b;
            }
        }
        Ok(())
    }

    fn validate_shapes(&self) -> Result<(), EvolveError> {
        for layer in &self.layers {
            layer.validate_shapes()?;
        }
        let mut expected = self.input_dim;
        for layer in &self.layers {
            if layer.in_features != expected {
                return Err(EvolveError::ShapeMismatch(format!(
                    "layer expects {} inputs but receives {}",
                    layer.in_features, expected
                )));
            }
            expected = layer.out_features;
        }
        if expected != self.output_dim {
            return Err(EvolveError::ShapeMismatch(format!(
                "network ends in {} outputs, declared {}",
                expected, self.output_dim
            )));
        }
        Ok(())
    }

    /// Save the network to a JSON checkpoint
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Load a network from a JSON checkpoint, validating weight shapes
    pub fn load_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let net: Self = serde_json::from_str(&contents)?;
        net.validate_shapes()?;
        Ok(net)
    }

    /// Save the network to a binary checkpoint
    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let encoded = bincode::serialize(self)?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    /// Load a network from a binary checkpoint, validating weight shapes
    pub fn load_bincode<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut buffer = Vec::new();
        File::open(path)?.read_to_end(&mut buffer)?;
        let net: Self = bincode::deserialize(&buffer)?;
        net.validate_shapes()?;
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    fn small_net(rng: &mut StdRng) -> EvolvableMlp {
        let config = MlpConfig {
            hidden_sizes: vec![32],
            min_nodes: 16,
            max_nodes: 64,
            ..Default::default()
        };
        EvolvableMlp::new(4, 2, config, rng).unwrap()
    }

    #[test]
    fn test_forward_dimensions() {
        let mut rng = rng();
        let net = small_net(&mut rng);
        let out = net.forward(&[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut rng = rng();
        let config = MlpConfig { min_nodes: 128, max_nodes: 64, ..Default::default() };
        assert!(EvolvableMlp::new(4, 2, config, &mut rng).is_err());

        let config = MlpConfig { hidden_sizes: vec![], ..Default::default() };
        assert!(EvolvableMlp::new(4, 2, config, &mut rng).is_err());
    }

    #[test]
    fn test_add_remove_layer_bounds() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        assert_eq!(net.num_hidden_layers(), 1);

        // min_hidden_layers = 1: removal refused.
        assert!(!net.remove_layer(&mut rng));

        assert!(net.add_layer(&mut rng));
        assert!(net.add_layer(&mut rng));
        assert_eq!(net.num_hidden_layers(), 3);

        // max_hidden_layers = 3: growth refused.
        assert!(!net.add_layer(&mut rng));

        assert!(net.remove_layer(&mut rng));
        assert_eq!(net.num_hidden_layers(), 2);
    }

    #[test]
    fn test_structural_edits_preserve_output_dim() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        let obs = [1.0, -1.0, 0.5, 0.0];

        net.add_layer(&mut rng);
        assert_eq!(net.forward(&obs).len(), 2);

        net.add_nodes(0, 16, &mut rng);
        assert_eq!(net.forward(&obs).len(), 2);

        net.remove_nodes(1, 16, &mut rng);
        assert_eq!(net.forward(&obs).len(), 2);

        net.remove_layer(&mut rng);
        assert_eq!(net.forward(&obs).len(), 2);
    }

    #[test]
    fn test_add_nodes_preserves_overlap() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        let before = net.layers()[0].clone();

        assert!(net.add_nodes(0, 16, &mut rng));
        let after = &net.layers()[0];
        assert_eq!(after.out_features, 48);

        for i in 0..before.out_features {
            for j in 0..before.in_features {
                assert_eq!(
                    after.weights[i * after.in_features + j],
                    before.weights[i * before.in_features + j]
                );
            }
            assert_eq!(after.biases[i], before.biases[i]);
        }
    }

    #[test]
    fn test_node_bounds_clamp() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);

        // max_nodes = 64: growing by a large count clamps there.
        assert!(net.add_nodes(0, 512, &mut rng));
        assert_eq!(net.hidden_sizes(), vec![64]);
        assert!(!net.add_nodes(0, 16, &mut rng));

        // min_nodes = 16: shrinking clamps there.
        assert!(net.remove_nodes(0, 512, &mut rng));
        assert_eq!(net.hidden_sizes(), vec![16]);
        assert!(!net.remove_nodes(0, 4, &mut rng));
    }

    #[test]
    fn test_activation_swap_keeps_weights() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        let weights_before = net.layers()[0].weights.clone();

        assert!(net.set_layer_activation(0, Activation::Tanh));
        assert_eq!(net.hidden_activations(), vec![Activation::Tanh]);
        assert_eq!(net.layers()[0].weights, weights_before);

        // Output layer refuses activation changes.
        assert!(!net.set_layer_activation(1, Activation::ReLU));
        assert_eq!(net.layers()[1].activation, Activation::Linear);
    }

    #[test]
    fn test_perturb_changes_weights_not_shape() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        let before = net.layers()[0].weights.clone();

        net.perturb_layer(0, 0.1, &mut rng);
        let after = &net.layers()[0].weights;
        assert_eq!(after.len(), before.len());
        assert!(before.iter().zip(after).any(|(b, a)| b != a));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        let snapshot = net.clone();

        net.perturb_layer(0, 0.5, &mut rng);
        net.add_nodes(0, 16, &mut rng);

        assert_ne!(net, snapshot);
        assert_eq!(snapshot.hidden_sizes(), vec![32]);
    }

    #[test]
    fn test_gradient_descent_reduces_error() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        let mut opt = SgdMomentum::new(&net, 0.9);
        let input = [0.5, -0.5, 1.0, 0.0];
        let target = [1.0, -1.0];

        let loss = |net: &EvolvableMlp| {
            let out = net.forward(&input);
            (out[0] - target[0]).powi(2) + (out[1] - target[1]).powi(2)
        };

        let initial = loss(&net);
        for _ in 0..50 {
            let out = net.forward(&input);
            let grad = [2.0 * (out[0] - target[0]), 2.0 * (out[1] - target[1])];
            let mut grads = MlpGradients::zeros(&net);
            net.accumulate_gradients(&input, &grad, &mut grads);
            net.apply_gradients(&grads, &mut opt, 0.01);
        }
        assert!(loss(&net) < initial);
    }

    #[test]
    fn test_optimizer_detects_stale_topology() {
        let mut rng = rng();
        let mut net = small_net(&mut rng);
        let opt = SgdMomentum::new(&net, 0.9);

        assert!(opt.matches(&net));
        net.add_nodes(0, 16, &mut rng);
        assert!(!opt.matches(&net));

        let mut opt = opt;
        opt.reset(&net);
        assert!(opt.matches(&net));
    }

    #[test]
    fn test_soft_update_shape_mismatch() {
        let mut rng = rng();
        let mut a = small_net(&mut rng);
        let mut b = small_net(&mut rng);
        b.add_layer(&mut rng);

        assert!(matches!(
            a.soft_update_from(&b, 0.1),
            Err(EvolveError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_soft_update_blends() {
        let mut rng = rng();
        let mut a = small_net(&mut rng);
        let b = a.clone();

        a.perturb_layer(0, 0.5, &mut rng);
        a.soft_update_from(&b, 1.0).unwrap();
        assert_eq!(a.layers()[0].weights, b.layers()[0].weights);
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut rng = rng();
        let net = small_net(&mut rng);
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("net.json");
        net.save_json(&json_path).unwrap();
        let loaded = EvolvableMlp::load_json(&json_path).unwrap();
        assert_eq!(net, loaded);

        let bin_path = dir.path().join("net.bin");
        net.save_bincode(&bin_path).unwrap();
        let loaded = EvolvableMlp::load_bincode(&bin_path).unwrap();
        assert_eq!(net, loaded);
    }

    #[test]
    fn test_checkpoint_rejects_corrupt_shapes() {
        let mut rng = rng();
        let net = small_net(&mut rng);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");

        let mut json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&net).unwrap()).unwrap();
        json["layers"][0]["weights"]
            .as_array_mut()
            .unwrap()
            .pop();
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        assert!(EvolvableMlp::load_json(&path).is_err());
    }
}
