//! Top-level module for the phrase generation pipeline.
//!
//! This module provides:
//! - Counted continuations and order-k chains (`Continuations`, `Chain`)
//! - Model construction with pruning (`ModelBuilder`, `build_model`)
//! - The immutable model and its shared handle (`LanguageModel`, `ModelHandle`)
//! - Candidate sampling with backoff and teleports (`Sampler`)
//! - Composite scoring (`Scorer`, `ScoreWeights`)
//! - Selection with recent-history deduplication (`Generator`)

/// Model construction: tokenizing, counting, pruning, start registry.
pub mod builder;

/// Sampled phrase and its rendering.
pub mod candidate;

/// Fixed-order chain of context keys to counted continuations.
pub mod chain;

/// Counted multiset of continuations with temperature-scaled sampling.
pub mod continuations;

/// Bounded FIFO of recently returned phrases.
pub mod history;

/// Immutable backoff model, snapshots and statistics.
pub mod language_model;

/// Per-request generation parameters.
pub mod params;

/// Chain walk producing one candidate.
pub mod sampler;

/// Composite quality score.
pub mod scorer;

/// Candidate ranking, deduplication and fallback.
pub mod selector;

/// Part-of-speech word swapping.
pub mod swap;
