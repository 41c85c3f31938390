use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, mpsc};
use std::thread;

use log::{debug, info};

use super::chain::Chain;
use super::continuations::Next;
use super::language_model::{LanguageModel, ModelHandle};
use crate::error::{QuipError, Result};
use crate::io::{build_output_path, read_text};
use crate::pos::{PartOfSpeech, PosTagger};
use crate::tokenizer::{Token, Tokenizer};

/// Below this many tokens the corpus is counted on the calling thread.
const PARALLEL_THRESHOLD: usize = 4096;

/// Builds a model from raw corpus text with the default tokenizer.
///
/// # Errors
/// - `InvalidOrders` if `orders` is empty or holds a zero
/// - `EmptyCorpus` if tokenization yields nothing
/// - `NoStartKeys` if no start key survives pruning
pub fn build_model(corpus: &str, orders: &[usize], prune_threshold: u64) -> Result<ModelHandle> {
	ModelBuilder::new(orders, prune_threshold)?.build(corpus)
}

/// Configurable model construction.
///
/// # Behavior
/// - Tokenizes the corpus.
/// - Counts every order-k window (`i + k <= len`), the continuation being
///   the following token or `Next::End` past the last one.
/// - Registers a start key wherever a window opens the corpus or follows a
///   sentence end.
/// - Prunes the highest order only, then drops start keys that lost their
///   chain entry.
///
/// Counting is split across threads for large corpora; the partial counts
/// are merged, so the result never depends on the thread count.
pub struct ModelBuilder<'a> {
	orders: Vec<usize>,
	prune_threshold: u64,
	tokenizer: Tokenizer,
	tagger: Option<&'a dyn PosTagger>,
}

/// Counts gathered by one worker over a range of positions.
struct PartialCounts {
	chains: BTreeMap<usize, Chain>,
	starts: BTreeMap<usize, BTreeSet<String>>,
}

impl<'a> ModelBuilder<'a> {
	/// # Errors
	/// Returns `InvalidOrders` if `orders` is empty or contains a zero.
	pub fn new(orders: &[usize], prune_threshold: u64) -> Result<Self> {
		Ok(Self {
			orders: normalize_orders(orders)?,
			prune_threshold,
			tokenizer: Tokenizer::default(),
			tagger: None,
		})
	}

	pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
		self.tokenizer = tokenizer;
		self
	}

	/// Collects part-of-speech buckets from the vocabulary with `tagger`.
	pub fn with_tagger(mut self, tagger: &'a dyn PosTagger) -> Self {
		self.tagger = Some(tagger);
		self
	}

	pub fn orders(&self) -> &[usize] {
		&self.orders
	}

	pub fn build(&self, corpus: &str) -> Result<ModelHandle> {
		let tokens = self.tokenizer.tokenize(corpus);
		self.build_from_tokens(&tokens)
	}

	pub fn build_from_tokens(&self, tokens: &[Token]) -> Result<ModelHandle> {
		if tokens.is_empty() {
			return Err(QuipError::EmptyCorpus);
		}

		let counts = self.count(tokens)?;
		let mut chains = counts.chains;
		let mut starts = counts.starts;

		if let Some(highest) = self.orders.first() {
			if let Some(chain) = chains.get_mut(highest) {
				let removed = chain.prune(self.prune_threshold);
				debug!("pruned {removed} keys from order {highest} (threshold {})", self.prune_threshold);
			}
		}

		let starts: BTreeMap<usize, Vec<String>> = self
			.orders
			.iter()
			.map(|order| {
				let chain = chains.entry(*order).or_insert_with(|| Chain::new(*order));
				let keys = starts
					.remove(order)
					.unwrap_or_default()
					.into_iter()
					.filter(|key| chain.contains_key(key))
					.collect::<Vec<_>>();
				(*order, keys)
			})
			.collect();

		if starts.values().all(Vec::is_empty) {
			return Err(QuipError::NoStartKeys);
		}

		let teleport_keys: Vec<String> = self
			.orders
			.iter()
			.filter_map(|order| chains.get(order))
			.find(|chain| !chain.is_empty())
			.map(|chain| chain.keys().map(str::to_owned).collect())
			.unwrap_or_default();

		let vocabulary: Vec<String> = tokens
			.iter()
			.map(|t| t.text.as_str())
			.collect::<BTreeSet<_>>()
			.into_iter()
			.map(str::to_owned)
			.collect();
		let pos_buckets = self.pos_buckets(&vocabulary);

		let model = LanguageModel {
			orders: self.orders.clone(),
			prune_threshold: self.prune_threshold,
			token_count: tokens.len(),
			chains,
			starts,
			teleport_keys,
			blocked_substrings: self.tokenizer.blocked().to_vec(),
			vocabulary,
			pos_buckets,
		};
		info!(
			"built model from {} tokens: {:?}",
			model.token_count,
			model.stats().chains
		);
		Ok(Arc::new(model))
	}

	/// Reads a corpus file and builds its model, reusing a `.bin` snapshot
	/// stored next to it when that snapshot was built with the same orders,
	/// threshold and block list. A fresh build refreshes the snapshot.
	///
	/// Part-of-speech buckets of a reused snapshot are retagged from its
	/// vocabulary with this builder's tagger.
	pub fn load_or_build<P: AsRef<Path>>(&self, corpus_path: P) -> Result<ModelHandle> {
		let snapshot_path = build_output_path(&corpus_path, "bin")?;
		if snapshot_path.exists() {
			match LanguageModel::load(&snapshot_path) {
				Ok(mut model) if self.reuses(&model) => {
					model.pos_buckets = self.pos_buckets(&model.vocabulary);
					info!("loaded snapshot {}", snapshot_path.display());
					return Ok(Arc::new(model));
				}
				Ok(_) => debug!("snapshot {} has other settings, rebuilding", snapshot_path.display()),
				Err(e) => debug!("ignoring unreadable snapshot {}: {e}", snapshot_path.display()),
			}
		}

		let corpus = read_text(&corpus_path)?;
		let model = self.build(&corpus)?;
		model.save(&snapshot_path)?;
		Ok(model)
	}

	/// Whether a snapshot holds exactly what a fresh build would count.
	fn reuses(&self, model: &LanguageModel) -> bool {
		model.orders == self.orders
			&& model.prune_threshold == self.prune_threshold
			&& model.blocked_substrings == self.tokenizer.blocked()
	}

	fn pos_buckets(&self, vocabulary: &[String]) -> BTreeMap<PartOfSpeech, Vec<String>> {
		let Some(tagger) = self.tagger else {
			return BTreeMap::new();
		};
		let mut buckets: BTreeMap<PartOfSpeech, Vec<String>> = BTreeMap::new();
		for word in vocabulary {
			for tag in tagger.tags(word) {
				buckets.entry(tag).or_default().push(word.clone());
			}
		}
		buckets
	}

	fn count(&self, tokens: &[Token]) -> Result<PartialCounts> {
		if tokens.len() < PARALLEL_THRESHOLD {
			return Ok(count_range(tokens, &self.orders, 0..tokens.len()));
		}

		let chunks = num_cpus::get().max(1) * 8;
		let chunk_size = tokens.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for start in (0..tokens.len()).step_by(chunk_size) {
				let tx = tx.clone();
				let range = start..(start + chunk_size).min(tokens.len());
				let orders = &self.orders;
				scope.spawn(move || {
					// The receiver outlives the scope, sending cannot fail.
					let _ = tx.send(count_range(tokens, orders, range));
				});
			}
		});
		drop(tx);

		let mut total = PartialCounts::new(&self.orders);
		for partial in rx.iter() {
			total.merge(partial)?;
		}
		Ok(total)
	}
}

impl PartialCounts {
	fn new(orders: &[usize]) -> Self {
		Self {
			chains: orders.iter().map(|o| (*o, Chain::new(*o))).collect(),
			starts: orders.iter().map(|o| (*o, BTreeSet::new())).collect(),
		}
	}

	fn merge(&mut self, other: PartialCounts) -> Result<()> {
		for (order, chain) in other.chains {
			match self.chains.get_mut(&order) {
				Some(existing) => existing.merge(&chain)?,
				None => {
					self.chains.insert(order, chain);
				}
			}
		}
		for (order, keys) in other.starts {
			self.starts.entry(order).or_default().extend(keys);
		}
		Ok(())
	}
}

/// Counts the windows opening at positions in `range`.
fn count_range(tokens: &[Token], orders: &[usize], range: Range<usize>) -> PartialCounts {
	let mut counts = PartialCounts::new(orders);

	for &order in orders {
		let (Some(chain), Some(starts)) = (counts.chains.get_mut(&order), counts.starts.get_mut(&order)) else {
			continue;
		};
		for i in range.clone() {
			if i + order > tokens.len() {
				break;
			}
			let key = join_key(&tokens[i..i + order]);
			let next = tokens
				.get(i + order)
				.map(|t| Next::Word(t.text.clone()))
				.unwrap_or(Next::End);

			if i == 0 || tokens[i - 1].ends_sentence {
				starts.insert(key.clone());
			}
			chain.add(key, next);
		}
	}

	counts
}

fn join_key(tokens: &[Token]) -> String {
	tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ")
}

/// Sorts orders highest first and removes duplicates.
pub(crate) fn normalize_orders(orders: &[usize]) -> Result<Vec<usize>> {
	if orders.is_empty() {
		return Err(QuipError::InvalidOrders("at least one order is required".to_owned()));
	}
	if orders.contains(&0) {
		return Err(QuipError::InvalidOrders("orders must be >= 1".to_owned()));
	}
	let unique: BTreeSet<usize> = orders.iter().copied().collect();
	Ok(unique.into_iter().rev().collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	const CORPUS: &str = "The cat sat. The cat ran. The dog sat.";

	fn word(w: &str) -> Next {
		Next::Word(w.to_owned())
	}

	#[test]
	fn scenario_start_keys_and_continuations() {
		let model = build_model(CORPUS, &[2, 1], 1).unwrap();
		assert_eq!(model.starts(2), &["the cat".to_owned(), "the dog".to_owned()]);

		let after = model.chain(2).unwrap().get("the cat").unwrap();
		assert_eq!(after.count(&word("sat")), 1);
		assert_eq!(after.count(&word("ran")), 1);
		assert_eq!(after.distinct(), 2);
	}

	#[test]
	fn last_window_ends_with_terminal() {
		let model = build_model(CORPUS, &[2, 1], 1).unwrap();
		let dog_sat = model.chain(2).unwrap().get("dog sat").unwrap();
		assert_eq!(dog_sat.count(&Next::End), 1);
		let sat = model.chain(1).unwrap().get("sat").unwrap();
		assert_eq!(sat.count(&word("the")), 1);
		assert_eq!(sat.count(&Next::End), 1);
	}

	#[test]
	fn orders_are_sorted_and_deduplicated() {
		let builder = ModelBuilder::new(&[1, 3, 2, 3], 2).unwrap();
		assert_eq!(builder.orders(), &[3, 2, 1]);
	}

	#[test]
	fn invalid_orders() {
		assert!(matches!(ModelBuilder::new(&[], 1), Err(QuipError::InvalidOrders(_))));
		assert!(matches!(ModelBuilder::new(&[2, 0], 1), Err(QuipError::InvalidOrders(_))));
	}

	#[test]
	fn empty_corpus_fails() {
		assert!(matches!(build_model("", &[2, 1], 1), Err(QuipError::EmptyCorpus)));
		assert!(matches!(build_model("1 2 3 ! http://a", &[2, 1], 1), Err(QuipError::EmptyCorpus)));
	}

	#[test]
	fn no_start_keys_after_pruning() {
		let result = build_model("alpha beta gamma", &[2], 5);
		assert!(matches!(result, Err(QuipError::NoStartKeys)));
	}

	#[test]
	fn lower_orders_are_not_pruned() {
		let model = build_model(CORPUS, &[2, 1], 2).unwrap();
		let order2 = model.chain(2).unwrap();
		assert_eq!(order2.keys().collect::<Vec<_>>(), vec!["the cat"]);
		assert_eq!(model.starts(2), &["the cat".to_owned()]);
		assert!(model.chain(1).unwrap().contains_key("dog"));
	}

	#[test]
	fn short_corpus_leaves_high_orders_empty() {
		let model = build_model("hello world", &[3, 1], 1).unwrap();
		assert!(model.chain(3).unwrap().is_empty());
		assert!(model.starts(3).is_empty());
		assert_eq!(model.starts(1), &["hello".to_owned()]);
	}

	#[test]
	fn build_is_deterministic() {
		let a = build_model(CORPUS, &[3, 2, 1], 1).unwrap();
		let b = build_model(CORPUS, &[3, 2, 1], 1).unwrap();
		assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
	}

	#[test]
	fn parallel_counting_matches_sequential() {
		let sentence = "trust thyself every heart vibrates to that iron string. ";
		let corpus = sentence.repeat(PARALLEL_THRESHOLD / 4);
		let tokens = Tokenizer::default().tokenize(&corpus);
		assert!(tokens.len() >= PARALLEL_THRESHOLD);

		let orders = vec![3, 2, 1];
		let sequential = count_range(&tokens, &orders, 0..tokens.len());
		let builder = ModelBuilder::new(&orders, 1).unwrap();
		let parallel = builder.count(&tokens).unwrap();
		assert_eq!(sequential.chains, parallel.chains);
		assert_eq!(sequential.starts, parallel.starts);
	}

	#[test]
	fn tagger_fills_buckets() {
		let tagger = |w: &str| match w {
			"cat" | "dog" => vec![PartOfSpeech::Noun],
			"sat" | "ran" => vec![PartOfSpeech::Verb],
			_ => Vec::new(),
		};
		let model = ModelBuilder::new(&[2, 1], 1).unwrap().with_tagger(&tagger).build(CORPUS).unwrap();
		assert_eq!(model.pos_bucket(PartOfSpeech::Noun), &["cat".to_owned(), "dog".to_owned()]);
		assert_eq!(model.pos_bucket(PartOfSpeech::Verb), &["ran".to_owned(), "sat".to_owned()]);
		assert!(model.pos_bucket(PartOfSpeech::Adverb).is_empty());
	}

	#[test]
	fn load_or_build_writes_and_reuses_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let corpus_path = dir.path().join("cats.txt");
		std::fs::write(&corpus_path, CORPUS).unwrap();

		let builder = ModelBuilder::new(&[2, 1], 1).unwrap();
		let built = builder.load_or_build(&corpus_path).unwrap();
		assert!(dir.path().join("cats.bin").exists());

		// Corpus changes are not noticed while the snapshot matches.
		std::fs::write(&corpus_path, "completely different words here").unwrap();
		let cached = builder.load_or_build(&corpus_path).unwrap();
		assert_eq!(built, cached);

		// Other settings rebuild from the current corpus.
		let rebuilt = ModelBuilder::new(&[2, 1], 0).unwrap().load_or_build(&corpus_path).unwrap();
		assert!(rebuilt.chain(2).unwrap().contains_key("completely different"));
	}

	#[test]
	fn cached_snapshot_is_retagged_with_current_tagger() {
		let dir = tempfile::tempdir().unwrap();
		let corpus_path = dir.path().join("cats.txt");
		std::fs::write(&corpus_path, CORPUS).unwrap();

		let untagged = ModelBuilder::new(&[2, 1], 1).unwrap().load_or_build(&corpus_path).unwrap();
		assert!(untagged.pos_bucket(PartOfSpeech::Noun).is_empty());

		let tagger = |w: &str| match w {
			"cat" | "dog" => vec![PartOfSpeech::Noun],
			_ => Vec::new(),
		};
		let tagged = ModelBuilder::new(&[2, 1], 1).unwrap().with_tagger(&tagger).load_or_build(&corpus_path).unwrap();
		assert_eq!(tagged.pos_bucket(PartOfSpeech::Noun), &["cat".to_owned(), "dog".to_owned()]);
		assert_eq!(tagged.chains, untagged.chains);

		// And back: no tagger, no buckets.
		let again = ModelBuilder::new(&[2, 1], 1).unwrap().load_or_build(&corpus_path).unwrap();
		assert!(again.pos_bucket(PartOfSpeech::Noun).is_empty());
	}

	#[test]
	fn changed_block_list_rebuilds_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let corpus_path = dir.path().join("notes.txt");
		std::fs::write(&corpus_path, "keep the secret safe. keep the door shut.").unwrap();

		let open = ModelBuilder::new(&[2, 1], 1).unwrap().load_or_build(&corpus_path).unwrap();
		assert!(open.chain(1).unwrap().contains_key("secret"));

		let blocked = ModelBuilder::new(&[2, 1], 1)
			.unwrap()
			.with_tokenizer(Tokenizer::new(vec!["SECRET".into()]))
			.load_or_build(&corpus_path)
			.unwrap();
		assert!(!blocked.chain(1).unwrap().contains_key("secret"));
		assert!(!blocked.vocabulary().iter().any(|w| w == "secret"));
		assert_eq!(blocked.blocked_substrings(), &["secret".to_owned()]);

		// The refreshed snapshot now carries the new list.
		let reloaded = LanguageModel::load(dir.path().join("notes.bin")).unwrap();
		assert_eq!(reloaded, *blocked);
	}
}
