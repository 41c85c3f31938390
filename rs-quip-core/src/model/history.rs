use std::collections::VecDeque;

/// Bounded FIFO of the last accepted phrases, compared by exact text.
///
/// # Invariants
/// - `len() <= limit()` at all times
/// - pushing into a full buffer evicts the oldest entry
#[derive(Clone, Debug, Default)]
pub struct RecentHistory {
	limit: usize,
	entries: VecDeque<String>,
}

impl RecentHistory {
	pub fn new(limit: usize) -> Self {
		Self { limit, entries: VecDeque::with_capacity(limit) }
	}

	pub fn limit(&self) -> usize {
		self.limit
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn contains(&self, text: &str) -> bool {
		self.entries.iter().any(|e| e == text)
	}

	/// Records `text`; with a limit of zero nothing is kept.
	pub fn push(&mut self, text: String) {
		if self.limit == 0 {
			return;
		}
		while self.entries.len() >= self.limit {
			self.entries.pop_front();
		}
		self.entries.push_back(text);
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	/// Oldest first.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(String::as_str)
	}
}
