use rand::Rng;

use super::candidate::{Candidate, capitalize};
use super::language_model::LanguageModel;
use crate::pos::{PartOfSpeech, PosTagger};

/// Replaces tagged words of `candidate` with random vocabulary words of the
/// same part of speech.
///
/// Tags are tried in the order Noun, Verb, Adjective, Adverb; each one the
/// word carries gets its own roll against `probability`, and the first
/// success picks a replacement from the model's bucket for that tag. A
/// capitalized word gets a capitalized replacement. Standalone "I" is never
/// touched.
pub fn swap_words<R: Rng + ?Sized>(
	candidate: &mut Candidate,
	model: &LanguageModel,
	tagger: &dyn PosTagger,
	probability: f64,
	rng: &mut R,
) {
	if probability <= 0.0 {
		return;
	}

	for token in candidate.tokens_mut().iter_mut() {
		if token == "I" {
			continue;
		}
		let lower = token.to_lowercase();
		let tags = tagger.tags(&lower);

		for tag in PartOfSpeech::ALL {
			if !tags.contains(&tag) || rng.random::<f64>() >= probability {
				continue;
			}
			let bucket = model.pos_bucket(tag);
			if bucket.is_empty() {
				continue;
			}
			let replacement = &bucket[rng.random_range(0..bucket.len())];
			let capitalized = token.chars().next().is_some_and(char::is_uppercase);
			*token = if capitalized { capitalize(replacement) } else { replacement.clone() };
			break;
		}
	}
}
