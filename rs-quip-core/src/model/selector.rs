use std::collections::BTreeSet;
use std::sync::Arc;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::history::RecentHistory;
use super::language_model::LanguageModel;
use super::params::{GenerationParams, StartSeed};
use super::sampler::{DEFAULT_STOP_WORDS, Sampler};
use super::scorer::{ScoreWeights, Scorer};
use super::swap::swap_words;
use crate::pos::{NoTagger, PosTagger};

pub const DEFAULT_FALLBACK: &str = "Embrace uncertainty, iterate with coffee.";

/// Settings fixed for the lifetime of a [`Generator`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
	/// How many recent phrases must not be repeated.
	pub history_limit: usize,
	/// Returned when no fresh valid phrase could be produced.
	pub fallback: String,
	/// Words stripped from the end of a phrase.
	pub stop_words: Vec<String>,
	pub weights: ScoreWeights,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			history_limit: 12,
			fallback: DEFAULT_FALLBACK.to_owned(),
			stop_words: DEFAULT_STOP_WORDS.iter().map(|w| (*w).to_owned()).collect(),
			weights: ScoreWeights::default(),
		}
	}
}

/// High-level phrase generator.
///
/// # Responsibilities
/// - Sample several candidates from a model
/// - Rank them with the composite score
/// - Return the best one not seen recently, and remember it
///
/// The tagger is resolved at construction ([`NoTagger`] unless one is
/// given); the model and the random source are passed to every call.
/// Generation never fails: when nothing fresh comes out, the configured
/// fallback phrase is returned and the history is left as it was.
pub struct Generator {
	tagger: Arc<dyn PosTagger + Send + Sync>,
	weights: ScoreWeights,
	stop_words: BTreeSet<String>,
	fallback: String,
	history: RecentHistory,
}

impl Default for Generator {
	fn default() -> Self {
		Self::new(GeneratorConfig::default())
	}
}

impl Generator {
	pub fn new(config: GeneratorConfig) -> Self {
		Self {
			tagger: Arc::new(NoTagger),
			weights: config.weights,
			stop_words: config.stop_words.into_iter().map(|w| w.to_lowercase()).collect(),
			fallback: config.fallback,
			history: RecentHistory::new(config.history_limit),
		}
	}

	pub fn with_tagger(mut self, tagger: Arc<dyn PosTagger + Send + Sync>) -> Self {
		self.tagger = tagger;
		self
	}

	pub fn history(&self) -> &RecentHistory {
		&self.history
	}

	pub fn fallback(&self) -> &str {
		&self.fallback
	}

	/// Generates one phrase.
	///
	/// # Behavior
	/// - Calls the sampler `candidate_count` times (each call retries up to
	///   `max_attempts` on its own).
	/// - Scores every valid candidate and sorts them best first; ties keep
	///   sampling order.
	/// - Walks that list and returns the first rendering absent from the
	///   recent history, pushing it there.
	/// - Returns the fallback if there is no candidate or all are recent.
	pub fn generate<R: Rng + ?Sized>(&mut self, model: &LanguageModel, params: &GenerationParams, rng: &mut R) -> String {
		let ranked = self.ranked_candidates(model, params, rng);
		if ranked.is_empty() {
			debug!("no valid candidate, answering with the fallback");
			return self.fallback.clone();
		}

		for (mut candidate, score) in ranked {
			swap_words(&mut candidate, model, &*self.tagger, params.pos_swap_probability(), rng);
			let text = candidate.render(params.theme);
			if self.history.contains(&text) {
				continue;
			}
			debug!("selected {text:?} (score {score:.3})");
			self.history.push(text.clone());
			return text;
		}

		debug!("every candidate was recently used, answering with the fallback");
		self.fallback.clone()
	}

	/// Generates `sentences` phrases joined by single spaces.
	///
	/// A custom start seed opens the first phrase only; the following ones
	/// start at random.
	pub fn generate_paragraph<R: Rng + ?Sized>(
		&mut self,
		model: &LanguageModel,
		params: &GenerationParams,
		sentences: usize,
		rng: &mut R,
	) -> String {
		if sentences == 0 {
			return String::new();
		}

		let mut phrases = Vec::with_capacity(sentences);
		phrases.push(self.generate(model, params, rng));

		let mut rest = params.clone();
		rest.start_seed = StartSeed::Random;
		for _ in 1..sentences {
			phrases.push(self.generate(model, &rest, rng));
		}
		phrases.join(" ")
	}

	/// Valid candidates with their scores, best first.
	pub fn ranked_candidates<R: Rng + ?Sized>(
		&self,
		model: &LanguageModel,
		params: &GenerationParams,
		rng: &mut R,
	) -> Vec<(Candidate, f64)> {
		let sampler = Sampler::new(params, &self.stop_words);
		let scorer = Scorer::new(&self.weights, &*self.tagger);
		let midpoint = params.midpoint();

		let mut ranked: Vec<(Candidate, f64)> = (0..params.candidate_count)
			.filter_map(|_| sampler.sample(model, rng))
			.map(|candidate| {
				let score = scorer.score(&candidate, model, midpoint);
				(candidate, score)
			})
			.collect();

		// Stable: equal scores keep sampling order.
		ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
		ranked
	}
}
