use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QuipError, Result};

/// Largest accepted `max_words`.
pub const MAX_WORDS: usize = 64;

/// Largest accepted `candidate_count`.
pub const MAX_CANDIDATES: usize = 64;

/// Largest accepted `max_attempts`.
pub const MAX_ATTEMPTS: usize = 100;

/// Strategy used to select the starting context of a phrase.
///
/// # Variants
/// - `Random`: a random key from the start registry of the highest order
///   that has one.
/// - `Custom(String)`: the given words. When their trailing context is
///   unknown to every chain, generation falls back to a random start.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartSeed {
	#[default]
	Random,
	Custom(String),
}

/// Terminal punctuation of a rendered phrase.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
	#[default]
	Statement,
	Question,
	Exclaim,
}

impl Theme {
	pub fn terminal(self) -> char {
		match self {
			Theme::Statement => '.',
			Theme::Question => '?',
			Theme::Exclaim => '!',
		}
	}
}

impl FromStr for Theme {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"statement" | "default" => Ok(Theme::Statement),
			"question" => Ok(Theme::Question),
			"exclaim" => Ok(Theme::Exclaim),
			other => Err(format!("Unknown theme: {other}")),
		}
	}
}

/// Parameters of one generation request.
///
/// Word bounds, candidate count and attempts are plain fields; the
/// probabilities and the temperature go through setters that reject out of
/// range values. Values coming from configuration or a query string should
/// be checked with [`GenerationParams::validate`].
///
/// # Invariants (after validation)
/// - `1 <= min_words <= max_words <= MAX_WORDS`
/// - `1 <= candidate_count <= MAX_CANDIDATES`, `1 <= max_attempts <= MAX_ATTEMPTS`
/// - `temperature > 0`
/// - every probability lies in `[0, 1]`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
	/// Minimum number of words, inclusive.
	pub min_words: usize,

	/// Maximum number of words, inclusive.
	pub max_words: usize,

	/// Number of sampler calls per generation.
	pub candidate_count: usize,

	/// Sampling attempts allowed per sampler call before giving up.
	pub max_attempts: usize,

	/// Backoff orders used while sampling, highest first. Empty means the
	/// orders the model was built with.
	pub orders: Vec<usize>,

	pub start_seed: StartSeed,

	pub theme: Theme,

	/// Sampling sharpness (1.0 = raw counts).
	temperature: f64,

	/// Chance, per step, of jumping to an unrelated context.
	teleport_probability: f64,

	/// Chance, per step once `min_words` is reached, of stopping.
	stop_probability: f64,

	/// Chance for each tagged word of the chosen phrase to be swapped with
	/// another vocabulary word of the same part of speech.
	pos_swap_probability: f64,
}

impl Default for GenerationParams {
	fn default() -> Self {
		Self {
			min_words: 5,
			max_words: 8,
			candidate_count: 8,
			max_attempts: 10,
			orders: Vec::new(),
			start_seed: StartSeed::Random,
			theme: Theme::Statement,
			temperature: 1.0,
			teleport_probability: 0.05,
			stop_probability: 0.4,
			pos_swap_probability: 0.0,
		}
	}
}

impl GenerationParams {
	/// Creates parameters with the given word bounds and defaults elsewhere.
	///
	/// # Errors
	/// Returns an error if the bounds are empty or reversed.
	pub fn with_bounds(min_words: usize, max_words: usize) -> Result<Self> {
		let params = Self { min_words, max_words, ..Self::default() };
		params.check_bounds()?;
		Ok(params)
	}

	pub fn temperature(&self) -> f64 {
		self.temperature
	}

	pub fn teleport_probability(&self) -> f64 {
		self.teleport_probability
	}

	pub fn stop_probability(&self) -> f64 {
		self.stop_probability
	}

	pub fn pos_swap_probability(&self) -> f64 {
		self.pos_swap_probability
	}

	/// Midpoint of the word bounds, preferred by the scorer.
	pub fn midpoint(&self) -> f64 {
		(self.min_words + self.max_words) as f64 / 2.0
	}

	/// Sets the temperature (> 0).
	///
	/// # Errors
	/// Returns an error if the value is not strictly positive and finite.
	pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
		check_temperature(temperature)?;
		self.temperature = temperature;
		Ok(())
	}

	/// Sets the teleport probability (0.0..=1.0).
	pub fn set_teleport_probability(&mut self, probability: f64) -> Result<()> {
		check_probability("teleport_probability", probability)?;
		self.teleport_probability = probability;
		Ok(())
	}

	/// Sets the early stop probability (0.0..=1.0).
	pub fn set_stop_probability(&mut self, probability: f64) -> Result<()> {
		check_probability("stop_probability", probability)?;
		self.stop_probability = probability;
		Ok(())
	}

	/// Sets the part-of-speech swap probability (0.0..=1.0).
	pub fn set_pos_swap_probability(&mut self, probability: f64) -> Result<()> {
		check_probability("pos_swap_probability", probability)?;
		self.pos_swap_probability = probability;
		Ok(())
	}

	/// Checks every field.
	///
	/// # Errors
	/// Returns `InvalidParameter` naming the first offending field.
	pub fn validate(&self) -> Result<()> {
		self.check_bounds()?;
		check_temperature(self.temperature)?;
		check_probability("teleport_probability", self.teleport_probability)?;
		check_probability("stop_probability", self.stop_probability)?;
		check_probability("pos_swap_probability", self.pos_swap_probability)?;
		if !(1..=MAX_CANDIDATES).contains(&self.candidate_count) {
			return Err(QuipError::invalid("candidate_count", format!("must be between 1 and {MAX_CANDIDATES}")));
		}
		if !(1..=MAX_ATTEMPTS).contains(&self.max_attempts) {
			return Err(QuipError::invalid("max_attempts", format!("must be between 1 and {MAX_ATTEMPTS}")));
		}
		if self.orders.contains(&0) {
			return Err(QuipError::invalid("orders", "orders must be >= 1"));
		}
		Ok(())
	}

	fn check_bounds(&self) -> Result<()> {
		if self.min_words == 0 {
			return Err(QuipError::invalid("min_words", "must be >= 1"));
		}
		if self.min_words > self.max_words {
			return Err(QuipError::invalid(
				"max_words",
				format!("{} is below min_words {}", self.max_words, self.min_words),
			));
		}
		if self.max_words > MAX_WORDS {
			return Err(QuipError::invalid("max_words", format!("must be <= {MAX_WORDS}")));
		}
		Ok(())
	}
}

fn check_temperature(temperature: f64) -> Result<()> {
	if !(temperature.is_finite() && temperature > 0.0) {
		return Err(QuipError::invalid("temperature", format!("must be > 0, got {temperature}")));
	}
	Ok(())
}

fn check_probability(field: &'static str, probability: f64) -> Result<()> {
	if !(0.0..=1.0).contains(&probability) {
		return Err(QuipError::invalid(field, format!("must be between 0.0 and 1.0, got {probability}")));
	}
	Ok(())
}
