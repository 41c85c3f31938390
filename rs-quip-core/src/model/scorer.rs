use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::language_model::LanguageModel;
use crate::error::{QuipError, Result};
use crate::pos::{PartOfSpeech, PosTagger};

/// Tunable magnitudes of the composite score.
///
/// Only their relative roles matter: the verb bonus outweighs the noun
/// bonus, backoff costs probability, unknown transitions cost a fixed
/// amount, and the length penalty grows with the distance to the middle of
/// the word bounds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ScoreWeights {
	/// Probability multiplier applied once per backoff level (0..=1).
	pub backoff_penalty: f64,
	/// Added for a transition unknown at every order (<= 0).
	pub unknown_penalty: f64,
	pub verb_bonus: f64,
	pub noun_bonus: f64,
	pub alliteration_bonus: f64,
	pub rhyme_bonus: f64,
	/// Subtracted per word of distance to the midpoint.
	pub length_penalty: f64,
}

impl Default for ScoreWeights {
	fn default() -> Self {
		Self {
			backoff_penalty: 0.5,
			unknown_penalty: -5.0,
			verb_bonus: 1.5,
			noun_bonus: 1.0,
			alliteration_bonus: 0.5,
			rhyme_bonus: 0.5,
			length_penalty: 0.3,
		}
	}
}

impl ScoreWeights {
	pub fn validate(&self) -> Result<()> {
		if !(self.backoff_penalty > 0.0 && self.backoff_penalty <= 1.0) {
			return Err(QuipError::invalid("backoff_penalty", "must be in (0, 1]"));
		}
		if self.unknown_penalty > 0.0 {
			return Err(QuipError::invalid("unknown_penalty", "must be <= 0"));
		}
		if self.length_penalty < 0.0 {
			return Err(QuipError::invalid("length_penalty", "must be >= 0"));
		}
		Ok(())
	}
}

/// Composite quality score of a candidate; higher is better.
///
/// Pure function of the candidate, the model and the weights.
pub struct Scorer<'a> {
	weights: &'a ScoreWeights,
	tagger: &'a dyn PosTagger,
}

impl<'a> Scorer<'a> {
	pub fn new(weights: &'a ScoreWeights, tagger: &'a dyn PosTagger) -> Self {
		Self { weights, tagger }
	}

	/// Sum of every component for a phrase expected to be `midpoint` words.
	pub fn score(&self, candidate: &Candidate, model: &LanguageModel, midpoint: f64) -> f64 {
		let words = candidate.words();
		self.log_likelihood(&words, model)
			+ self.pos_bonus(&words)
			+ self.style_bonus(&words)
			- self.weights.length_penalty * (words.len() as f64 - midpoint).abs()
	}

	/// Add-one smoothed log-likelihood with backoff.
	///
	/// Every word after the first is predicted from the longest context the
	/// model's orders allow (`order <= position`). Each step down an order
	/// multiplies the probability by `backoff_penalty`; a word unknown at
	/// every order adds `unknown_penalty`.
	pub fn log_likelihood(&self, words: &[String], model: &LanguageModel) -> f64 {
		let mut total = 0.0;
		for position in 1..words.len() {
			let next = &words[position];
			let usable = model.orders().iter().filter(|order| **order <= position);

			let mut found = None;
			for (level, order) in usable.enumerate() {
				let key = words[position - order..position].join(" ");
				let Some(continuations) = model.chain(*order).and_then(|chain| chain.get(&key)) else {
					continue;
				};
				let smoothed = (f64::from(continuations.count_word(next)) + 1.0)
					/ (continuations.total() as f64 + continuations.distinct() as f64);
				found = Some(smoothed.ln() + level as f64 * self.weights.backoff_penalty.ln());
				break;
			}

			total += found.unwrap_or(self.weights.unknown_penalty);
		}
		total
	}

	/// Verb bonus plus noun bonus, each granted at most once.
	pub fn pos_bonus(&self, words: &[String]) -> f64 {
		let tags: Vec<PartOfSpeech> = words.iter().flat_map(|w| self.tagger.tags(w)).collect();
		let mut bonus = 0.0;
		if tags.contains(&PartOfSpeech::Verb) {
			bonus += self.weights.verb_bonus;
		}
		if tags.contains(&PartOfSpeech::Noun) {
			bonus += self.weights.noun_bonus;
		}
		bonus
	}

	/// Alliteration anywhere plus a rhyme on the last two words.
	pub fn style_bonus(&self, words: &[String]) -> f64 {
		let mut bonus = 0.0;
		if has_alliteration(words) {
			bonus += self.weights.alliteration_bonus;
		}
		if has_rhyme(words) {
			bonus += self.weights.rhyme_bonus;
		}
		bonus
	}
}

/// Two adjacent words sharing their first letter.
fn has_alliteration(words: &[String]) -> bool {
	words
		.windows(2)
		.any(|pair| matches!((pair[0].chars().next(), pair[1].chars().next()), (Some(a), Some(b)) if a == b))
}

/// Last two words sharing their last two letters.
fn has_rhyme(words: &[String]) -> bool {
	let [.., a, b] = words else {
		return false;
	};
	match (last_two(a), last_two(b)) {
		(Some(x), Some(y)) => x == y,
		_ => false,
	}
}

fn last_two(word: &str) -> Option<[char; 2]> {
	let mut chars = word.chars().rev();
	let last = chars.next()?;
	let before = chars.next()?;
	Some([before, last])
}
