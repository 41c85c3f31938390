//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = QuipError> = std::result::Result<T, E>;

/// Failures raised while building models, loading configuration or snapshots.
///
/// Generation itself never returns one of these: a call that runs out of
/// valid candidates answers with the configured fallback phrase instead.
#[derive(Debug, Error)]
pub enum QuipError {
	/// Tokenization produced no usable token.
	#[error("corpus contains no usable tokens")]
	EmptyCorpus,
	/// Every start registry is empty once pruning is done.
	#[error("no start keys left for any order after pruning")]
	NoStartKeys,
	/// The order list is empty or contains a zero.
	#[error("invalid orders: {0}")]
	InvalidOrders(String),
	/// A generation or scoring parameter is out of range.
	#[error("invalid value for {field}: {reason}")]
	InvalidParameter { field: &'static str, reason: String },
	/// Filesystem error, with the offending path when known.
	#[error("io error while processing {path:?}: {source}")]
	Io {
		source: std::io::Error,
		path: Option<PathBuf>,
	},
	/// Snapshot encoding or decoding failed.
	#[error("serialization error: {0}")]
	Serialization(String),
	/// Configuration could not be parsed.
	#[error("config error: {0}")]
	Config(String),
}

impl QuipError {
	/// Wraps an IO error together with the path it concerns.
	pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
		Self::Io { source, path }
	}

	pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidParameter { field, reason: reason.into() }
	}
}

impl From<postcard::Error> for QuipError {
	fn from(err: postcard::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

impl From<toml::de::Error> for QuipError {
	fn from(err: toml::de::Error) -> Self {
		Self::Config(err.to_string())
	}
}
