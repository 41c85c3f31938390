//! N-gram-based phrase generation library.
//!
//! This crate provides a constrained word-level generator:
//! - Corpus tokenization with sentence boundaries
//! - Multi-order n-gram chains with a start registry and pruning
//! - Temperature-scaled sampling with backoff and random teleports
//! - Composite scoring and recent-history deduplication
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//! use rs_quip_core::{GenerationParams, Generator, build_model};
//!
//! let model = build_model("The cat sat. The cat ran. The dog sat.", &[2, 1], 1)?;
//! let mut generator = Generator::default();
//! let params = GenerationParams::with_bounds(3, 5)?;
//! let phrase = generator.generate(&model, &params, &mut SmallRng::seed_from_u64(7));
//! println!("{phrase}");
//! # Ok::<(), rs_quip_core::QuipError>(())
//! ```

/// Configuration file support.
pub mod config;

/// Error types.
pub mod error;

/// File helpers (corpus, lexicon and snapshot paths).
pub mod io;

/// Core n-gram model and generation pipeline.
pub mod model;

/// Part-of-speech collaborator.
pub mod pos;

/// Corpus tokenizer.
pub mod tokenizer;

pub use config::QuipConfig;
pub use error::{QuipError, Result};
pub use model::builder::{ModelBuilder, build_model};
pub use model::language_model::{LanguageModel, ModelHandle, ModelStats};
pub use model::params::{GenerationParams, StartSeed, Theme};
pub use model::scorer::ScoreWeights;
pub use model::selector::{Generator, GeneratorConfig};
pub use pos::{LexiconTagger, NoTagger, PartOfSpeech, PosTagger};
pub use tokenizer::{Token, Tokenizer};
