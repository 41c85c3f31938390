use std::collections::BTreeSet;

use log::trace;
use rand::Rng;

use super::builder::normalize_orders;
use super::candidate::{Candidate, capitalize};
use super::continuations::Next;
use super::language_model::LanguageModel;
use super::params::{GenerationParams, StartSeed};

/// Words that make a poor ending: dangling articles, prepositions and
/// conjunctions.
pub const DEFAULT_STOP_WORDS: [&str; 32] = [
	"a", "an", "and", "as", "at", "but", "by", "for", "from", "her", "his", "if", "in", "into", "is",
	"its", "my", "nor", "of", "on", "or", "our", "so", "than", "that", "the", "their", "to", "upon",
	"which", "with", "your",
];

/// Produces candidate phrases by walking a model's chains.
///
/// # Behavior
/// - Seeds from the start registry (or the custom seed words).
/// - Extends the phrase one word at a time with temperature-scaled sampling,
///   backing off to lower orders when the trailing context is unknown.
/// - Occasionally teleports to a random context key.
/// - Once `min_words` is reached, stops early with `stop_probability`.
/// - Cleans the phrase up and rejects it when it breaks the word bounds or
///   ends on something that is not a plain word.
///
/// All randomness is drawn from the `Rng` passed in.
pub struct Sampler<'a> {
	params: &'a GenerationParams,
	stop_words: &'a BTreeSet<String>,
	orders: Vec<usize>,
}

impl<'a> Sampler<'a> {
	pub fn new(params: &'a GenerationParams, stop_words: &'a BTreeSet<String>) -> Self {
		let orders = normalize_orders(&params.orders).unwrap_or_default();
		Self { params, stop_words, orders }
	}

	/// Samples until a valid candidate comes out or `max_attempts` runs out.
	pub fn sample<R: Rng + ?Sized>(&self, model: &LanguageModel, rng: &mut R) -> Option<Candidate> {
		for attempt in 0..self.params.max_attempts.max(1) {
			if let Some(candidate) = self.sample_once(model, rng) {
				return Some(candidate);
			}
			trace!("sampling attempt {} rejected", attempt + 1);
		}
		None
	}

	/// A single walk, post-processed and validated.
	pub fn sample_once<R: Rng + ?Sized>(&self, model: &LanguageModel, rng: &mut R) -> Option<Candidate> {
		let words = self.walk(model, rng)?;
		let tokens = post_process(words, self.stop_words, self.params.min_words);
		self.is_valid(&tokens).then(|| Candidate::new(tokens))
	}

	/// Raw walk through the chains, lowercase, no cleanup.
	pub fn walk<R: Rng + ?Sized>(&self, model: &LanguageModel, rng: &mut R) -> Option<Vec<String>> {
		let max_words = self.params.max_words;
		let mut words = self.seed(model, rng)?;

		while words.len() < max_words {
			if rng.random::<f64>() < self.params.teleport_probability() {
				let Some(key) = model.random_key(rng) else {
					break;
				};
				let room = max_words - words.len();
				words.extend(key.split(' ').take(room).map(str::to_owned));
			} else {
				match self.next_word(model, &words, rng) {
					Some(word) => words.push(word),
					None => break,
				}
			}

			if words.len() >= self.params.min_words && rng.random::<f64>() < self.params.stop_probability() {
				break;
			}
		}

		Some(words)
	}

	fn seed<R: Rng + ?Sized>(&self, model: &LanguageModel, rng: &mut R) -> Option<Vec<String>> {
		if let StartSeed::Custom(text) = &self.params.start_seed {
			let mut words: Vec<String> = text
				.split_whitespace()
				.map(|w| w.to_lowercase().trim_matches(|c: char| !c.is_alphabetic()).to_owned())
				.filter(|w| !w.is_empty())
				.collect();
			words.truncate(self.params.max_words);
			if self.knows_context(model, &words) {
				return Some(words);
			}
			trace!("custom seed {text:?} unknown, using a random start");
		}

		let key = model.random_start(rng)?;
		Some(key.split(' ').map(str::to_owned).collect())
	}

	fn knows_context(&self, model: &LanguageModel, words: &[String]) -> bool {
		self.backoff_orders(model).iter().any(|order| {
			trailing_key(words, *order)
				.and_then(|key| model.chain(*order).map(|chain| chain.contains_key(&key)))
				.unwrap_or(false)
		})
	}

	/// Next word after `words`, trying each order from the highest down.
	/// `None` on a dead end or when the chain says the corpus ended here.
	fn next_word<R: Rng + ?Sized>(&self, model: &LanguageModel, words: &[String], rng: &mut R) -> Option<String> {
		for order in self.backoff_orders(model) {
			let Some(chain) = model.chain(*order) else {
				continue;
			};
			let Some(key) = trailing_key(words, *order) else {
				continue;
			};
			if let Some(continuations) = chain.get(&key) {
				return match continuations.sample(self.params.temperature(), rng)? {
					Next::Word(word) => Some(word.clone()),
					Next::End => None,
				};
			}
		}
		trace!("dead end after {:?}", words.last());
		None
	}

	fn backoff_orders<'m>(&'m self, model: &'m LanguageModel) -> &'m [usize] {
		if self.orders.is_empty() { model.orders() } else { &self.orders }
	}

	fn is_valid(&self, tokens: &[String]) -> bool {
		let len_ok = (self.params.min_words..=self.params.max_words).contains(&tokens.len());
		len_ok
			&& tokens
				.last()
				.is_some_and(|last| last.chars().count() >= 2 && last.chars().all(char::is_alphabetic))
	}
}

/// Last `order` words joined into a chain key.
fn trailing_key(words: &[String], order: usize) -> Option<String> {
	if order == 0 || words.len() < order {
		return None;
	}
	Some(words[words.len() - order..].join(" "))
}

/// Cleans a raw walk.
///
/// - pops trailing stop words while the phrase is longer than `min_words`
/// - collapses immediately repeated words
/// - capitalizes the first word and every standalone "i"
pub fn post_process(mut words: Vec<String>, stop_words: &BTreeSet<String>, min_words: usize) -> Vec<String> {
	while words.len() > min_words && words.last().is_some_and(|w| stop_words.contains(w)) {
		words.pop();
	}

	words.dedup();

	for word in words.iter_mut() {
		if word == "i" {
			*word = "I".to_owned();
		}
	}
	if let Some(first) = words.first_mut() {
		*first = capitalize(first);
	}

	words
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::builder::build_model;
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	const CATS: &str = "The cat sat. The cat ran. The dog sat.";

	fn stop_words() -> BTreeSet<String> {
		DEFAULT_STOP_WORDS.iter().map(|w| (*w).to_owned()).collect()
	}

	fn strings(words: &[&str]) -> Vec<String> {
		words.iter().map(|w| (*w).to_owned()).collect()
	}

	fn quiet_params(min: usize, max: usize) -> GenerationParams {
		let mut params = GenerationParams::with_bounds(min, max).unwrap();
		params.set_teleport_probability(0.0).unwrap();
		params
	}

	#[test]
	fn post_process_strips_stop_tail() {
		let out = post_process(strings(&["trust", "thyself", "and", "the"]), &stop_words(), 2);
		assert_eq!(out, strings(&["Trust", "thyself"]));
	}

	#[test]
	fn post_process_respects_min_words() {
		let out = post_process(strings(&["go", "to", "the"]), &stop_words(), 3);
		assert_eq!(out, strings(&["Go", "to", "the"]));
		let out = post_process(strings(&["go", "to", "the"]), &stop_words(), 2);
		assert_eq!(out, strings(&["Go", "to"]));
	}

	#[test]
	fn post_process_collapses_and_capitalizes() {
		let out = post_process(strings(&["i", "think", "think", "that", "i", "am"]), &stop_words(), 1);
		assert_eq!(out, strings(&["I", "think", "that", "I", "am"]));
	}

	#[test]
	fn scenario_draws_only_observed_continuations() {
		let model = build_model(CATS, &[2, 1], 1).unwrap();
		let mut params = quiet_params(3, 5);
		params.start_seed = StartSeed::Custom("the cat".into());
		params.set_stop_probability(1.0).unwrap();
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);

		let mut rng = SmallRng::seed_from_u64(17);
		let (mut sat, mut ran) = (0, 0);
		for _ in 0..400 {
			let words = sampler.walk(&model, &mut rng).unwrap();
			assert_eq!(&words[..2], &["the", "cat"]);
			match words[2].as_str() {
				"sat" => sat += 1,
				"ran" => ran += 1,
				other => panic!("unexpected continuation {other}"),
			}
		}
		// count 1 each: roughly even
		assert!(sat > 140 && ran > 140, "sat={sat} ran={ran}");
	}

	#[test]
	fn random_seed_comes_from_start_registry() {
		let model = build_model(CATS, &[2, 1], 1).unwrap();
		let params = quiet_params(3, 5);
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		let mut rng = SmallRng::seed_from_u64(2);
		for _ in 0..50 {
			let words = sampler.walk(&model, &mut rng).unwrap();
			assert_eq!(words[0], "the");
			assert!(words[1] == "cat" || words[1] == "dog");
		}
	}

	#[test]
	fn unknown_custom_seed_falls_back() {
		let model = build_model(CATS, &[2, 1], 1).unwrap();
		let mut params = quiet_params(3, 5);
		params.start_seed = StartSeed::Custom("purple elephants".into());
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		let words = sampler.walk(&model, &mut SmallRng::seed_from_u64(1)).unwrap();
		assert_eq!(words[0], "the");
	}

	#[test]
	fn candidates_stay_within_bounds() {
		let model = build_model(CATS, &[2, 1], 1).unwrap();
		let mut params = GenerationParams::with_bounds(3, 5).unwrap();
		params.set_teleport_probability(0.3).unwrap();
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		let mut rng = SmallRng::seed_from_u64(99);
		let mut produced = 0;
		for _ in 0..200 {
			if let Some(candidate) = sampler.sample(&model, &mut rng) {
				assert!((3..=5).contains(&candidate.len()));
				produced += 1;
			}
		}
		assert!(produced > 0);
	}

	#[test]
	fn walk_never_exceeds_max_words() {
		let model = build_model(CATS, &[2, 1], 1).unwrap();
		let mut params = GenerationParams::with_bounds(1, 4).unwrap();
		params.set_teleport_probability(0.9).unwrap();
		params.set_stop_probability(0.0).unwrap();
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		let mut rng = SmallRng::seed_from_u64(5);
		for _ in 0..100 {
			assert!(sampler.walk(&model, &mut rng).unwrap().len() <= 4);
		}
	}

	#[test]
	fn backs_off_to_order_one() {
		let model = build_model("alpha beta gamma delta. alpha gamma beta delta.", &[1], 1).unwrap();
		let mut params = quiet_params(3, 4);
		params.orders = vec![3, 2, 1];
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		let mut rng = SmallRng::seed_from_u64(8);
		let candidate = sampler.sample(&model, &mut rng).expect("order 1 fallback");
		assert!((3..=4).contains(&candidate.len()));
	}

	#[test]
	fn end_of_corpus_stops_the_walk() {
		let model = build_model("lonely words here", &[2], 1).unwrap();
		let mut params = quiet_params(1, 10);
		params.set_stop_probability(0.0).unwrap();
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		let words = sampler.walk(&model, &mut SmallRng::seed_from_u64(3)).unwrap();
		assert_eq!(words, strings(&["lonely", "words", "here"]));
	}

	#[test]
	fn too_short_model_yields_nothing() {
		let model = build_model("lonely words here", &[2], 1).unwrap();
		let params = quiet_params(5, 8);
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		assert!(sampler.sample(&model, &mut SmallRng::seed_from_u64(3)).is_none());
	}

	#[test]
	fn seeded_sampling_is_reproducible() {
		let model = build_model(CATS, &[2, 1], 1).unwrap();
		let params = GenerationParams::with_bounds(3, 5).unwrap();
		let stops = stop_words();
		let sampler = Sampler::new(&params, &stops);
		let run = || {
			let mut rng = SmallRng::seed_from_u64(1234);
			(0..10).map(|_| sampler.sample(&model, &mut rng)).collect::<Vec<_>>()
		};
		assert_eq!(run(), run());
	}
}
