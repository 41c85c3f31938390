use super::params::Theme;

/// One sampled phrase, already cleaned and capitalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
	tokens: Vec<String>,
}

impl Candidate {
	pub fn new(tokens: Vec<String>) -> Self {
		Self { tokens }
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	pub(crate) fn tokens_mut(&mut self) -> &mut Vec<String> {
		&mut self.tokens
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Tokens lowercased, the form chain keys are stored in.
	pub fn words(&self) -> Vec<String> {
		self.tokens.iter().map(|t| t.to_lowercase()).collect()
	}

	/// Display text: tokens joined by spaces plus the theme's terminal mark.
	pub fn render(&self, theme: Theme) -> String {
		let mut text = self.tokens.join(" ");
		text.push(theme.terminal());
		text
	}
}

/// Uppercases the first character of `word`.
pub fn capitalize(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn candidate(words: &[&str]) -> Candidate {
		Candidate::new(words.iter().map(|w| (*w).to_owned()).collect())
	}

	#[test]
	fn render_appends_terminal() {
		let c = candidate(&["The", "cat", "sat"]);
		assert_eq!(c.render(Theme::Statement), "The cat sat.");
		assert_eq!(c.render(Theme::Question), "The cat sat?");
		assert_eq!(c.render(Theme::Exclaim), "The cat sat!");
	}

	#[test]
	fn words_are_lowercase() {
		assert_eq!(candidate(&["The", "I", "cat"]).words(), vec!["the", "i", "cat"]);
	}

	#[test]
	fn capitalize_words() {
		assert_eq!(capitalize("emerson"), "Emerson");
		assert_eq!(capitalize("école"), "École");
		assert_eq!(capitalize(""), "");
	}
}
