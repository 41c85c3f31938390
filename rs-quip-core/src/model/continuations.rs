use std::collections::BTreeMap;

use rand::Rng;

use serde::{Deserialize, Serialize};

/// What was observed right after a context key.
///
/// `End` is recorded once, after the very last token of the corpus.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Next {
	Word(String),
	End,
}

impl Next {
	pub fn word(&self) -> Option<&str> {
		match self {
			Next::Word(w) => Some(w),
			Next::End => None,
		}
	}
}

/// Counted multiset of the continuations seen after one context key.
///
/// Conceptually, this is a node of a Markov chain whose outgoing edges are
/// weighted by their number of observations.
///
/// ## Invariants
/// - Each stored count is strictly positive
/// - Iteration order is the ordering of `Next`, so sampling with a seeded
///   RNG is reproducible
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Continuations {
	/// Example: { Word("sat") => 2, Word("ran") => 1, End => 1 }
	counts: BTreeMap<Next, u32>,
}

impl Continuations {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one more occurrence of `next`.
	pub fn add(&mut self, next: Next) {
		*self.counts.entry(next).or_insert(0) += 1;
	}

	/// Occurrences of `next`, zero when never observed.
	pub fn count(&self, next: &Next) -> u32 {
		self.counts.get(next).copied().unwrap_or(0)
	}

	pub fn count_word(&self, word: &str) -> u32 {
		self.count(&Next::Word(word.to_owned()))
	}

	/// Sum of every continuation count.
	pub fn total(&self) -> u64 {
		self.counts.values().map(|c| u64::from(*c)).sum()
	}

	/// Number of distinct continuations.
	pub fn distinct(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Next, u32)> {
		self.counts.iter().map(|(next, count)| (next, *count))
	}

	/// Draws a continuation with temperature-scaled weights.
	///
	/// Each continuation weighs `count^(1/temperature)`: temperatures above 1
	/// flatten the distribution, below 1 sharpen it toward the most frequent
	/// continuations.
	///
	/// Returns `None` if there are no continuations or `temperature` is not
	/// strictly positive.
	pub fn sample<R: Rng + ?Sized>(&self, temperature: f64, rng: &mut R) -> Option<&Next> {
		if self.counts.is_empty() || !(temperature > 0.0) {
			return None;
		}

		let exponent = 1.0 / temperature;
		let weights: Vec<f64> = self.counts.values().map(|c| f64::from(*c).powf(exponent)).collect();
		let total: f64 = weights.iter().sum();
		if !total.is_finite() || total <= 0.0 {
			return None;
		}

		let mut r = rng.random::<f64>() * total;
		let mut fallback = None;
		for (next, weight) in self.counts.keys().zip(&weights) {
			if r < *weight {
				return Some(next);
			}
			r -= weight;
			fallback = Some(next);
		}

		// Floating point leftovers land on the last bucket.
		fallback
	}

	/// Adds the counts of `other` into this multiset.
	///
	/// Used to combine partial counts built on separate threads.
	pub fn merge(&mut self, other: &Self) {
		for (next, count) in &other.counts {
			*self.counts.entry(next.clone()).or_insert(0) += *count;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	fn word(w: &str) -> Next {
		Next::Word(w.to_owned())
	}

	fn counted(pairs: &[(&str, u32)]) -> Continuations {
		let mut c = Continuations::new();
		for (w, n) in pairs {
			for _ in 0..*n {
				c.add(word(w));
			}
		}
		c
	}

	#[test]
	fn counts_and_totals() {
		let mut c = counted(&[("sat", 2), ("ran", 1)]);
		c.add(Next::End);
		assert_eq!(c.count_word("sat"), 2);
		assert_eq!(c.count_word("flew"), 0);
		assert_eq!(c.count(&Next::End), 1);
		assert_eq!(c.total(), 4);
		assert_eq!(c.distinct(), 3);
	}

	#[test]
	fn sample_empty_or_bad_temperature() {
		let mut rng = SmallRng::seed_from_u64(1);
		assert!(Continuations::new().sample(1.0, &mut rng).is_none());
		let c = counted(&[("a", 1)]);
		assert!(c.sample(0.0, &mut rng).is_none());
		assert!(c.sample(-1.0, &mut rng).is_none());
	}

	#[test]
	fn sample_only_observed() {
		let c = counted(&[("sat", 1), ("ran", 1)]);
		let mut rng = SmallRng::seed_from_u64(7);
		for _ in 0..200 {
			let next = c.sample(1.0, &mut rng).unwrap();
			assert!(next == &word("sat") || next == &word("ran"));
		}
	}

	#[test]
	fn low_temperature_favours_frequent() {
		let c = counted(&[("common", 9), ("rare", 1)]);
		let mut rng = SmallRng::seed_from_u64(3);
		let sharp = (0..2000)
			.filter(|_| c.sample(0.25, &mut rng) == Some(&word("common")))
			.count();
		let flat = (0..2000)
			.filter(|_| c.sample(8.0, &mut rng) == Some(&word("common")))
			.count();
		// 9^4 : 1 against 9^(1/8) : 1
		assert!(sharp > 1950);
		assert!(flat < 1400);
	}

	#[test]
	fn sample_is_reproducible() {
		let c = counted(&[("a", 3), ("b", 2), ("c", 1)]);
		let draw = |seed| {
			let mut rng = SmallRng::seed_from_u64(seed);
			(0..20).map(|_| c.sample(1.3, &mut rng).cloned()).collect::<Vec<_>>()
		};
		assert_eq!(draw(11), draw(11));
	}

	#[test]
	fn merge_sums_counts() {
		let mut a = counted(&[("x", 1), ("y", 2)]);
		let b = counted(&[("y", 3), ("z", 1)]);
		a.merge(&b);
		assert_eq!(a.count_word("x"), 1);
		assert_eq!(a.count_word("y"), 5);
		assert_eq!(a.count_word("z"), 1);
		assert_eq!(a.total(), 7);
	}
}
