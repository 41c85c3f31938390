use serde::{Deserialize, Serialize};

/// Characters that close a sentence when they trail a chunk.
const SENTENCE_TERMINALS: [char; 3] = ['.', '!', '?'];

/// Substrings that mark a chunk as a URL, an email or a handle.
pub const DEFAULT_BLOCKED_SUBSTRINGS: [&str; 4] = ["http", "www", ".com", "@"];

/// A normalized corpus word.
///
/// `text` is lowercase and never starts or ends with a non-alphabetic
/// character. `ends_sentence` is set when the chunk it came from (or a
/// discarded chunk right after it) carried terminal punctuation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Token {
	pub text: String,
	pub ends_sentence: bool,
}

impl Token {
	pub fn new(text: &str, ends_sentence: bool) -> Self {
		Self { text: text.to_owned(), ends_sentence }
	}
}

/// Turns raw corpus text into a cleaned token stream.
///
/// # Rules (per whitespace-delimited chunk)
/// - lowercase, then strip leading/trailing non-alphabetic characters
/// - drop the result if it is shorter than two characters, holds a numeral,
///   or contains one of the blocked substrings
/// - a chunk ending in `.`, `!` or `?` (possibly followed by quotes or
///   brackets) flags the last emitted token as ending a sentence
///
/// Tokenization is pure: identical input always yields identical output.
#[derive(Clone, Debug)]
pub struct Tokenizer {
	blocked: Vec<String>,
}

impl Default for Tokenizer {
	fn default() -> Self {
		Self::new(DEFAULT_BLOCKED_SUBSTRINGS.iter().map(|s| (*s).to_owned()).collect())
	}
}

impl Tokenizer {
	/// Creates a tokenizer with a custom block list (matched lowercase).
	pub fn new(blocked: Vec<String>) -> Self {
		Self {
			blocked: blocked.into_iter().map(|s| s.to_lowercase()).collect(),
		}
	}

	/// Lowercased block list.
	pub fn blocked(&self) -> &[String] {
		&self.blocked
	}

	pub fn tokenize(&self, text: &str) -> Vec<Token> {
		let mut tokens: Vec<Token> = Vec::new();

		for chunk in text.split_whitespace() {
			let lower = chunk.to_lowercase();
			let terminal = ends_with_terminal(&lower);

			let cleaned = lower.trim_matches(|c: char| !c.is_alphabetic());
			if self.accepts(cleaned) {
				tokens.push(Token::new(cleaned, false));
			}

			if terminal {
				if let Some(last) = tokens.last_mut() {
					last.ends_sentence = true;
				}
			}
		}

		tokens
	}

	fn accepts(&self, word: &str) -> bool {
		word.chars().count() >= 2
			&& !word.chars().any(char::is_numeric)
			&& !self.blocked.iter().any(|b| word.contains(b.as_str()))
	}
}

/// Looks at the non-alphanumeric tail of a chunk (`sat.`, `ran!")`) for
/// a sentence terminal.
fn ends_with_terminal(chunk: &str) -> bool {
	chunk
		.chars()
		.rev()
		.take_while(|c| !c.is_alphanumeric())
		.any(|c| SENTENCE_TERMINALS.contains(&c))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn texts(tokens: &[Token]) -> Vec<&str> {
		tokens.iter().map(|t| t.text.as_str()).collect()
	}

	#[test]
	fn lowercases_and_strips_edges() {
		let tokens = Tokenizer::default().tokenize("\"Hello,\" (World) --Trust--");
		assert_eq!(texts(&tokens), vec!["hello", "world", "trust"]);
	}

	#[test]
	fn flags_sentence_ends() {
		let tokens = Tokenizer::default().tokenize("The cat sat. The dog ran!\nWhy?");
		let flags: Vec<bool> = tokens.iter().map(|t| t.ends_sentence).collect();
		assert_eq!(flags, vec![false, false, true, false, false, true, true]);
	}

	#[test]
	fn terminal_behind_closing_quote() {
		let tokens = Tokenizer::default().tokenize("he said \"enough.\" then left");
		assert!(tokens[2].ends_sentence);
		assert!(!tokens[3].ends_sentence);
	}

	#[test]
	fn dropped_chunk_marks_preceding_token() {
		let tokens = Tokenizer::default().tokenize("it was in 1841. later on");
		assert_eq!(texts(&tokens), vec!["it", "was", "in", "later", "on"]);
		assert!(tokens[2].ends_sentence);
	}

	#[test]
	fn standalone_punctuation_marks_preceding_token() {
		let tokens = Tokenizer::default().tokenize("trust thyself . every heart");
		assert!(tokens[1].ends_sentence);
		assert_eq!(tokens.len(), 4);
	}

	#[test]
	fn filters_short_digits_and_blocked() {
		let text = "a I ok r2d2 http://x.org www.site mail@host.net shop.com fine";
		let tokens = Tokenizer::default().tokenize(text);
		assert_eq!(texts(&tokens), vec!["ok", "fine"]);
	}

	#[test]
	fn drops_any_numeral() {
		let tokens = Tokenizer::default().tokenize("a٣b pa²ge plain");
		assert_eq!(texts(&tokens), vec!["plain"]);
	}

	#[test]
	fn custom_block_list() {
		let tokenizer = Tokenizer::new(vec!["FOO".to_owned()]);
		let tokens = tokenizer.tokenize("food bar http");
		assert_eq!(texts(&tokens), vec!["bar", "http"]);
	}

	#[test]
	fn keeps_inner_apostrophes() {
		let tokens = Tokenizer::default().tokenize("Don't 'quote'");
		assert_eq!(texts(&tokens), vec!["don't", "quote"]);
	}

	#[test]
	fn empty_and_blank_input() {
		assert!(Tokenizer::default().tokenize("").is_empty());
		assert!(Tokenizer::default().tokenize("  \n\t 42 ! ").is_empty());
	}
}
