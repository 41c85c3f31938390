//! Part-of-speech collaborator.
//!
//! The generator never tags words itself: it asks an injected [`PosTagger`]
//! and treats a missing answer as "no tags". [`NoTagger`] is the default,
//! [`LexiconTagger`] reads a small tab-separated lexicon.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QuipError, Result};

/// Lexical categories the scorer and the word swapper care about.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartOfSpeech {
	Noun,
	Verb,
	Adjective,
	Adverb,
}

impl PartOfSpeech {
	pub const ALL: [PartOfSpeech; 4] = [
		PartOfSpeech::Noun,
		PartOfSpeech::Verb,
		PartOfSpeech::Adjective,
		PartOfSpeech::Adverb,
	];
}

impl fmt::Display for PartOfSpeech {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			PartOfSpeech::Noun => "Noun",
			PartOfSpeech::Verb => "Verb",
			PartOfSpeech::Adjective => "Adjective",
			PartOfSpeech::Adverb => "Adverb",
		};
		f.write_str(name)
	}
}

impl FromStr for PartOfSpeech {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"noun" | "n" => Ok(PartOfSpeech::Noun),
			"verb" | "v" => Ok(PartOfSpeech::Verb),
			"adjective" | "adj" => Ok(PartOfSpeech::Adjective),
			"adverb" | "adv" => Ok(PartOfSpeech::Adverb),
			other => Err(format!("Unknown part of speech: {other}")),
		}
	}
}

/// Black-box word classifier.
///
/// Must be pure: the same word always yields the same tags. An empty
/// vector means "unknown".
pub trait PosTagger {
	fn tags(&self, word: &str) -> Vec<PartOfSpeech>;

	fn has_tag(&self, word: &str, tag: PartOfSpeech) -> bool {
		self.tags(word).contains(&tag)
	}
}

/// Tagger that knows nothing; every bonus depending on tags stays off.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTagger;

impl PosTagger for NoTagger {
	fn tags(&self, _word: &str) -> Vec<PartOfSpeech> {
		Vec::new()
	}
}

impl<F> PosTagger for F
where
	F: Fn(&str) -> Vec<PartOfSpeech>,
{
	fn tags(&self, word: &str) -> Vec<PartOfSpeech> {
		self(word)
	}
}

/// Dictionary-backed tagger.
///
/// Lexicon format, one entry per line:
/// ```text
/// # comment
/// river	Noun,Verb
/// swiftly	Adverb
/// ```
#[derive(Clone, Debug, Default)]
pub struct LexiconTagger {
	entries: HashMap<String, Vec<PartOfSpeech>>,
}

impl LexiconTagger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, word: &str, tags: Vec<PartOfSpeech>) {
		self.entries.insert(word.to_lowercase(), tags);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Parses lexicon text.
	///
	/// # Errors
	/// Returns `Config` on a line without tags or with an unknown tag.
	pub fn parse(text: &str) -> Result<Self> {
		let mut tagger = Self::new();
		for (number, line) in text.lines().enumerate() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let (word, tags) = line
				.split_once(char::is_whitespace)
				.ok_or_else(|| QuipError::Config(format!("lexicon line {}: missing tags", number + 1)))?;
			let tags = tags
				.split(',')
				.filter(|t| !t.trim().is_empty())
				.map(PartOfSpeech::from_str)
				.collect::<std::result::Result<Vec<_>, _>>()
				.map_err(|e| QuipError::Config(format!("lexicon line {}: {e}", number + 1)))?;
			tagger.insert(word, tags);
		}
		Ok(tagger)
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let text = crate::io::read_text(&path)?;
		Self::parse(&text)
	}
}

impl PosTagger for LexiconTagger {
	fn tags(&self, word: &str) -> Vec<PartOfSpeech> {
		self.entries.get(&word.to_lowercase()).cloned().unwrap_or_default()
	}
}
