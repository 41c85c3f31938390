use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chain::Chain;
use crate::error::{QuipError, Result};
use crate::pos::PartOfSpeech;

/// Shared, read-only reference to a built model.
///
/// Rebuilding never mutates a published model: a new one is built and the
/// handle is replaced in one step.
pub type ModelHandle = Arc<LanguageModel>;

/// Backoff n-gram language model.
///
/// This struct holds:
/// - `orders`: the configured orders, highest first
/// - `chains`: one `Chain` per order
/// - `starts`: per order, the sorted keys that may seed a generation
/// - `teleport_keys`: the sorted keys of the highest non-empty chain
/// - `blocked_substrings`: the tokenizer block list used at build time
/// - `vocabulary`: every distinct token, sorted
/// - `pos_buckets`: vocabulary words grouped by part of speech (empty when
///   the model was built without a tagger)
///
/// # Invariants
/// - Every key of `starts[k]` exists in `chains[k]`
/// - `teleport_keys` equals the key set of the highest non-empty chain
/// - At least one start registry is non-empty
/// - Only the highest order has been pruned
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LanguageModel {
	pub(crate) orders: Vec<usize>,
	pub(crate) prune_threshold: u64,
	pub(crate) token_count: usize,
	pub(crate) chains: BTreeMap<usize, Chain>,
	pub(crate) starts: BTreeMap<usize, Vec<String>>,
	pub(crate) teleport_keys: Vec<String>,
	pub(crate) blocked_substrings: Vec<String>,
	pub(crate) vocabulary: Vec<String>,
	pub(crate) pos_buckets: BTreeMap<PartOfSpeech, Vec<String>>,
}

/// Summary figures, mostly for logs and the HTTP front-end.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelStats {
	pub orders: Vec<usize>,
	pub prune_threshold: u64,
	pub tokens: usize,
	/// `(order, keys, start keys)` per order, highest first.
	pub chains: Vec<(usize, usize, usize)>,
}

impl LanguageModel {
	/// Orders this model was built with, highest first.
	pub fn orders(&self) -> &[usize] {
		&self.orders
	}

	pub fn highest_order(&self) -> usize {
		self.orders.first().copied().unwrap_or(0)
	}

	pub fn prune_threshold(&self) -> u64 {
		self.prune_threshold
	}

	/// Number of corpus tokens the model was built from.
	pub fn token_count(&self) -> usize {
		self.token_count
	}

	/// Chain of the given order, `None` if the model was not built with it.
	pub fn chain(&self, order: usize) -> Option<&Chain> {
		self.chains.get(&order)
	}

	/// Start keys registered for `order` (empty if none).
	pub fn starts(&self, order: usize) -> &[String] {
		self.starts.get(&order).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Picks a uniformly random start key from the highest order whose
	/// registry is non-empty.
	pub fn random_start<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
		let starts = self
			.orders
			.iter()
			.map(|order| self.starts(*order))
			.find(|keys| !keys.is_empty())?;
		let index = rng.random_range(0..starts.len());
		Some(starts[index].as_str())
	}

	/// Picks a uniformly random key (start or not) from the highest
	/// non-empty chain. Used by teleports.
	pub fn random_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
		if self.teleport_keys.is_empty() {
			return None;
		}
		let index = rng.random_range(0..self.teleport_keys.len());
		Some(self.teleport_keys[index].as_str())
	}

	/// Substrings the tokenizer rejected when this model was built.
	pub fn blocked_substrings(&self) -> &[String] {
		&self.blocked_substrings
	}

	/// Distinct corpus words, sorted.
	pub fn vocabulary(&self) -> &[String] {
		&self.vocabulary
	}

	/// Vocabulary words tagged with `tag` at build time.
	pub fn pos_bucket(&self, tag: PartOfSpeech) -> &[String] {
		self.pos_buckets.get(&tag).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn stats(&self) -> ModelStats {
		ModelStats {
			orders: self.orders.clone(),
			prune_threshold: self.prune_threshold,
			tokens: self.token_count,
			chains: self
				.orders
				.iter()
				.map(|order| {
					let keys = self.chain(*order).map(Chain::len).unwrap_or(0);
					(*order, keys, self.starts(*order).len())
				})
				.collect(),
		}
	}

	/// Encodes the model with `postcard`.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		Ok(postcard::from_bytes(bytes)?)
	}

	/// Writes a snapshot to `path`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = self.to_bytes()?;
		std::fs::write(&path, bytes).map_err(|e| QuipError::io(e, Some(path.as_ref().to_path_buf())))
	}

	/// Reads a snapshot written by [`LanguageModel::save`].
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(&path).map_err(|e| QuipError::io(e, Some(path.as_ref().to_path_buf())))?;
		Self::from_bytes(&bytes)
	}
}
