//! TOML configuration.
//!
//! - `QuipConfig::from_toml_str(text)` parses and validates a config
//! - missing sections and keys take their default values
//! - the documented defaults ship as `default_config.toml`
//!
//! A config is a plain value handed to whoever needs it; there is no
//! process-wide instance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::builder::{ModelBuilder, normalize_orders};
use crate::model::params::GenerationParams;
use crate::model::selector::{Generator, GeneratorConfig};
use crate::tokenizer::{DEFAULT_BLOCKED_SUBSTRINGS, Tokenizer};

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct QuipConfig {
	pub build: BuildConfig,
	pub generation: GenerationParams,
	pub generator: GeneratorConfig,
}

/// How models are built.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BuildConfig {
	pub orders: Vec<usize>,
	/// Minimum total observations for a highest-order key to survive.
	pub prune_threshold: u64,
	/// Tokens containing one of these are dropped.
	pub blocked_substrings: Vec<String>,
}

impl Default for BuildConfig {
	fn default() -> Self {
		Self {
			orders: vec![3, 2, 1],
			prune_threshold: 2,
			blocked_substrings: DEFAULT_BLOCKED_SUBSTRINGS.iter().map(|s| (*s).to_owned()).collect(),
		}
	}
}

impl QuipConfig {
	/// Parses and validates TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		let config: QuipConfig = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::from_toml_str(&crate::io::read_text(path)?)
	}

	pub fn validate(&self) -> Result<()> {
		normalize_orders(&self.build.orders)?;
		self.generation.validate()?;
		self.generator.weights.validate()
	}

	/// Model builder following the `[build]` section.
	pub fn builder<'a>(&self) -> Result<ModelBuilder<'a>> {
		Ok(ModelBuilder::new(&self.build.orders, self.build.prune_threshold)?
			.with_tokenizer(Tokenizer::new(self.build.blocked_substrings.clone())))
	}

	/// Generator following the `[generator]` section, without a tagger.
	pub fn generator(&self) -> Generator {
		Generator::new(self.generator.clone())
	}
}
