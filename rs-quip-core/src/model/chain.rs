use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::continuations::{Continuations, Next};
use crate::error::{QuipError, Result};

/// Order-k Markov chain over words.
///
/// Maps a context key (k tokens joined by single spaces) to the counted
/// continuations observed after it.
///
/// # Invariants
/// - `order` is always >= 1
/// - Every key holds exactly `order` space-separated words
/// - Every stored `Continuations` is non-empty
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Chain {
	order: usize,
	entries: BTreeMap<String, Continuations>,
}

impl Chain {
	pub fn new(order: usize) -> Self {
		Self { order, entries: BTreeMap::new() }
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Records `next` after `key`.
	pub fn add(&mut self, key: String, next: Next) {
		self.entries.entry(key).or_default().add(next);
	}

	pub fn get(&self, key: &str) -> Option<&Continuations> {
		self.entries.get(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Continuations)> {
		self.entries.iter().map(|(k, c)| (k.as_str(), c))
	}

	/// Drops every key observed fewer than `min_observations` times in total.
	///
	/// Whole keys go, never single continuations. Returns how many keys were
	/// removed; a second call with the same threshold removes nothing.
	pub fn prune(&mut self, min_observations: u64) -> usize {
		let before = self.entries.len();
		self.entries.retain(|_, continuations| continuations.total() >= min_observations);
		before - self.entries.len()
	}

	/// Merges another chain of the same order into this one.
	///
	/// # Errors
	/// Returns `InvalidOrders` if the orders differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(QuipError::InvalidOrders(format!(
				"cannot merge order {} into order {}",
				other.order, self.order
			)));
		}

		for (key, continuations) in &other.entries {
			if let Some(existing) = self.entries.get_mut(key) {
				existing.merge(continuations);
			} else {
				self.entries.insert(key.clone(), continuations.clone());
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn word(w: &str) -> Next {
		Next::Word(w.to_owned())
	}

	fn sample_chain() -> Chain {
		let mut chain = Chain::new(2);
		chain.add("the cat".into(), word("sat"));
		chain.add("the cat".into(), word("ran"));
		chain.add("the dog".into(), word("sat"));
		chain.add("dog sat".into(), Next::End);
		chain
	}

	#[test]
	fn add_and_lookup() {
		let chain = sample_chain();
		assert_eq!(chain.len(), 3);
		assert_eq!(chain.get("the cat").map(Continuations::total), Some(2));
		assert!(chain.get("a cat").is_none());
	}

	#[test]
	fn prune_removes_whole_keys() {
		let mut chain = sample_chain();
		assert_eq!(chain.prune(2), 2);
		assert_eq!(chain.keys().collect::<Vec<_>>(), vec!["the cat"]);
		assert_eq!(chain.get("the cat").map(Continuations::distinct), Some(2));
	}

	#[test]
	fn prune_is_idempotent() {
		let mut once = sample_chain();
		once.prune(2);
		let mut twice = once.clone();
		assert_eq!(twice.prune(2), 0);
		assert_eq!(once, twice);
	}

	#[test]
	fn prune_threshold_one_keeps_everything() {
		let mut chain = sample_chain();
		assert_eq!(chain.prune(1), 0);
		assert_eq!(chain.prune(0), 0);
		assert_eq!(chain.len(), 3);
	}

	#[test]
	fn merge_checks_order() {
		let mut a = sample_chain();
		assert!(matches!(a.merge(&Chain::new(3)), Err(QuipError::InvalidOrders(_))));
		assert_eq!(a, sample_chain());

		let mut b = Chain::new(2);
		b.add("the cat".into(), word("sat"));
		b.add("cat sat".into(), word("down"));
		a.merge(&b).unwrap();
		assert_eq!(a.get("the cat").unwrap().count_word("sat"), 2);
		assert!(a.contains_key("cat sat"));
	}
}
