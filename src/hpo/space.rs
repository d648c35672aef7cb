//! Declarative descriptors for mutable RL hyperparameters
//!
//! Every hyperparameter subject to mutation is declared once with bounds,
//! dtype, and optional grow/shrink factors. The mutation engine and trainer
//! consult these descriptors rather than hardcoded bounds, so the engine
//! generalizes to new hyperparameters by declaration alone.

use serde::{Deserialize, Serialize};

use crate::error::EvolveError;

/// Value domain of a mutable hyperparameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamDtype {
    /// Whole-valued (batch size, learn step); rounded after clamping
    Integer,
    /// Real-valued (learning rate)
    Continuous,
}

/// Descriptor for one mutable scalar hyperparameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlParameter {
    /// Name the agent resolves values by (e.g. `"lr"`, `"batch_size"`)
    pub name: String,

    /// Inclusive lower bound
    pub min: f64,

    /// Inclusive upper bound
    pub max: f64,

    /// Value domain
    pub dtype: ParamDtype,

    /// Multiplier applied on a positive mutation draw, when declared
    pub grow_factor: Option<f64>,

    /// Multiplier applied on a negative mutation draw, when declared
    pub shrink_factor: Option<f64>,
}

impl RlParameter {
    /// Declare a continuous hyperparameter
    pub fn continuous(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            dtype: ParamDtype::Continuous,
            grow_factor: None,
            shrink_factor: None,
        }
    }

    /// Declare an integer hyperparameter
    pub fn integer(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            dtype: ParamDtype::Integer,
            grow_factor: None,
            shrink_factor: None,
        }
    }

    /// Attach grow/shrink factors controlling the mutation step magnitude
    pub fn with_factors(mut self, grow: f64, shrink: f64) -> Self {
        self.grow_factor = Some(grow);
        self.shrink_factor = Some(shrink);
        self
    }

    /// Validate bounds and factors before the run starts
    pub fn validate(&self) -> Result<(), EvolveError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(EvolveError::Configuration(format!(
                "hyperparameter '{}' has invalid bounds [{}, {}]",
                self.name, self.min, self.max
            )));
        }
        if let Some(grow) = self.grow_factor {
            if grow < 1.0 {
                return Err(EvolveError::Configuration(format!(
                    "hyperparameter '{}' grow factor {} must be >= 1",
                    self.name, grow
                )));
            }
        }
        if let Some(shrink) = self.shrink_factor {
            if shrink <= 0.0 || shrink > 1.0 {
                return Err(EvolveError::Configuration(format!(
                    "hyperparameter '{}' shrink factor {} must be in (0, 1]",
                    self.name, shrink
                )));
            }
        }
        Ok(())
    }

    /// Clamp to bounds and cast to the declared dtype
    pub fn clamp_cast(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        match self.dtype {
            ParamDtype::Integer => clamped.round(),
            ParamDtype::Continuous => clamped,
        }
    }

    /// Mutate a current value given one sampled Gaussian draw
    ///
    /// With no factors declared, the value is multiplied by `1 + noise`.
    /// When grow/shrink factors are declared they replace the noise
    /// multiplier: the sign of the draw selects `value * grow_factor` or
    /// `value * shrink_factor`. Either way the result is clamped to the
    /// declared bounds and cast to the dtype. Integer results that round
    /// back onto the original value are nudged one step in the direction of
    /// the draw when the range allows, so a mutation is never a disguised
    /// no-op.
    pub fn mutate(&self, value: f64, noise: f64) -> f64 {
        let raw = match (self.grow_factor, self.shrink_factor) {
            (Some(grow), Some(shrink)) => {
                if noise >= 0.0 {
                    value * grow
                } else {
                    value * shrink
                }
            }
            _ => value * (1.0 + noise),
        };
        let mut result = self.clamp_cast(raw);

        if self.dtype == ParamDtype::Integer && result == value.round() {
            let original = value.round();
            result = if noise >= 0.0 && original + 1.0 <= self.max {
                original + 1.0
            } else if original - 1.0 >= self.min {
                original - 1.0
            } else if original + 1.0 <= self.max {
                original + 1.0
            } else {
                original
            };
        }
        result
    }
}

/// Ordered set of mutable hyperparameter descriptors for one agent family
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HyperparamConfig {
    parameters: Vec<RlParameter>,
}

impl HyperparamConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor
    pub fn with(mut self, parameter: RlParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Standard off-policy set: learning rate, batch size, learn step
    ///
    /// The learn step carries 1.5x/0.75x grow/shrink factors, matching the
    /// usual coarse search over learning frequency.
    pub fn standard(
        lr_min: f64,
        lr_max: f64,
        batch_min: usize,
        batch_max: usize,
        learn_step_min: usize,
        learn_step_max: usize,
    ) -> Self {
        Self::new()
            .with(RlParameter::continuous("lr", lr_min, lr_max))
            .with(RlParameter::integer("batch_size", batch_min as f64, batch_max as f64))
            .with(
                RlParameter::integer(
                    "learn_step",
                    learn_step_min as f64,
                    learn_step_max as f64,
                )
                .with_factors(1.5, 0.75),
            )
    }

    /// Validate every descriptor before the run starts
    pub fn validate(&self) -> Result<(), EvolveError> {
        for parameter in &self.parameters {
            parameter.validate()?;
        }
        Ok(())
    }

    /// All declared descriptors, in declaration order
    pub fn parameters(&self) -> &[RlParameter] {
        &self.parameters
    }

    /// Number of declared descriptors
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check whether no descriptors are declared
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Look up a descriptor by name
    pub fn get(&self, name: &str) -> Option<&RlParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn test_invalid_bounds_rejected() {
        let param = RlParameter::continuous("lr", 1e-2, 1e-4);
        assert!(matches!(param.validate(), Err(EvolveError::Configuration(_))));

        let config = HyperparamConfig::new().with(param);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_factors_rejected() {
        let param = RlParameter::integer("learn_step", 1.0, 16.0).with_factors(0.5, 0.75);
        assert!(param.validate().is_err());

        let param = RlParameter::integer("learn_step", 1.0, 16.0).with_factors(1.5, 1.5);
        assert!(param.validate().is_err());
    }

    #[test]
    fn test_mutation_respects_bounds() {
        // lr in [1e-4, 1e-2], current 1e-3, sd 0.1: always in bounds and
        // moving on average, across many randomized trials.
        let param = RlParameter::continuous("lr", 1e-4, 1e-2);
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Normal::new(0.0, 0.1).unwrap();

        let mut total_change = 0.0;
        for _ in 0..10_000 {
            let noise = normal.sample(&mut rng);
            let mutated = param.mutate(1e-3, noise);
            assert!((1e-4..=1e-2).contains(&mutated));
            total_change += (mutated - 1e-3).abs();
        }
        assert!(total_change / 10_000.0 > 0.0);
    }

    #[test]
    fn test_extreme_noise_clamps() {
        let param = RlParameter::continuous("lr", 1e-4, 1e-2);
        assert_eq!(param.mutate(1e-3, 1000.0), 1e-2);
        assert_eq!(param.mutate(1e-3, -1000.0), 1e-4);
    }

    #[test]
    fn test_integer_mutation_never_a_noop() {
        let param = RlParameter::integer("batch_size", 16.0, 256.0);
        let mut rng = StdRng::seed_from_u64(8);
        let normal = Normal::new(0.0, 0.001).unwrap();

        // Tiny sd would round back onto the original without the nudge.
        for _ in 0..1000 {
            let noise = normal.sample(&mut rng);
            let mutated = param.mutate(64.0, noise);
            assert_ne!(mutated, 64.0);
            assert!((16.0..=256.0).contains(&mutated));
        }
    }

    #[test]
    fn test_integer_noop_allowed_at_degenerate_range() {
        let param = RlParameter::integer("batch_size", 64.0, 64.0);
        assert_eq!(param.mutate(64.0, 0.5), 64.0);
    }

    #[test]
    fn test_grow_shrink_factors() {
        let param = RlParameter::integer("learn_step", 1.0, 100.0).with_factors(1.5, 0.75);
        // Positive draw grows by the factor, negative shrinks, one-shot.
        assert_eq!(param.mutate(8.0, 0.3), 12.0);
        assert_eq!(param.mutate(8.0, -0.3), 6.0);
        // Clamped at the bounds.
        assert_eq!(param.mutate(90.0, 2.0), 100.0);
    }

    #[test]
    fn test_standard_config() {
        let config = HyperparamConfig::standard(1e-4, 1e-2, 16, 256, 1, 16);
        assert!(config.validate().is_ok());
        assert_eq!(config.len(), 3);
        assert!(config.get("lr").is_some());
        assert!(config.get("batch_size").is_some());
        assert_eq!(config.get("learn_step").unwrap().grow_factor, Some(1.5));
        assert!(config.get("gamma").is_none());
    }
}
