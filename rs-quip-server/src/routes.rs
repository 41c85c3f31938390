use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use actix_web::{HttpResponse, Responder, get, put, web};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;

use rs_quip_core::io::{get_filename, list_files, read_text};
use rs_quip_core::{GenerationParams, Generator, ModelHandle, PosTagger, QuipConfig, QuipError, StartSeed, Theme};

/// Upper bound on `sentences` for one request.
const MAX_SENTENCES: usize = 10;

/// Query parameters of `/v1/generate`. Anything left out comes from the
/// `[generation]` section of the server configuration.
#[derive(Deserialize, Default)]
pub struct GenerateQuery {
	min_words: Option<usize>,
	max_words: Option<usize>,
	temperature: Option<f64>,
	teleport: Option<f64>,
	stop: Option<f64>,
	swap: Option<f64>,
	candidates: Option<usize>,
	attempts: Option<usize>,
	start: Option<String>,
	theme: Option<String>,
	seed: Option<u64>,
	sentences: Option<usize>,
}

#[derive(Deserialize)]
pub struct CorpusQuery {
	names: Option<String>,
}

impl GenerateQuery {
	/// Applies the query on top of `base` and validates the result.
	fn params(&self, base: &GenerationParams) -> Result<GenerationParams, String> {
		let mut params = base.clone();
		if let Some(min_words) = self.min_words {
			params.min_words = min_words;
		}
		if let Some(max_words) = self.max_words {
			params.max_words = max_words;
		}
		if let Some(candidates) = self.candidates {
			params.candidate_count = candidates;
		}
		if let Some(attempts) = self.attempts {
			params.max_attempts = attempts;
		}
		if let Some(temperature) = self.temperature {
			params.set_temperature(temperature).map_err(|e| e.to_string())?;
		}
		if let Some(teleport) = self.teleport {
			params.set_teleport_probability(teleport).map_err(|e| e.to_string())?;
		}
		if let Some(stop) = self.stop {
			params.set_stop_probability(stop).map_err(|e| e.to_string())?;
		}
		if let Some(swap) = self.swap {
			params.set_pos_swap_probability(swap).map_err(|e| e.to_string())?;
		}
		if let Some(start) = &self.start {
			params.start_seed = match start.trim() {
				"" => StartSeed::Random,
				words => StartSeed::Custom(words.to_owned()),
			};
		}
		if let Some(theme) = &self.theme {
			params.theme = theme.parse::<Theme>()?;
		}
		params.validate().map_err(|e| e.to_string())?;
		Ok(params)
	}

	fn sentences(&self) -> Result<usize, String> {
		match self.sentences.unwrap_or(1) {
			n @ 1..=MAX_SENTENCES => Ok(n),
			n => Err(format!("sentences must be between 1 and {MAX_SENTENCES}, got {n}")),
		}
	}
}

/// Model currently served, with the corpus names it was built from.
#[derive(Clone)]
struct Loaded {
	names: Vec<String>,
	model: ModelHandle,
}

/// State shared by every worker.
///
/// The model is replaced wholesale on reload: readers clone the handle and
/// never see a half-built model. The generator owns the recent history, so
/// it sits behind its own lock.
pub struct AppState {
	loaded: RwLock<Option<Loaded>>,
	generator: Mutex<Generator>,
	config: QuipConfig,
	tagger: Arc<dyn PosTagger + Send + Sync>,
	data_dir: PathBuf,
	cache: bool,
}

impl AppState {
	pub fn new(config: QuipConfig, tagger: Arc<dyn PosTagger + Send + Sync>, data_dir: PathBuf, cache: bool) -> Self {
		let generator = config.generator().with_tagger(tagger.clone());
		Self {
			loaded: RwLock::new(None),
			generator: Mutex::new(generator),
			config,
			tagger,
			data_dir,
			cache,
		}
	}

	/// Builds a model from `names` and starts serving it.
	pub fn load(&self, names: Vec<String>) -> Result<(), QuipError> {
		let model = build_corpora(&self.data_dir, &names, &self.config, &*self.tagger, self.cache)?;
		self.swap(Loaded { names, model });
		Ok(())
	}

	fn swap(&self, loaded: Loaded) {
		match self.loaded.write() {
			Ok(mut guard) => *guard = Some(loaded),
			Err(poisoned) => *poisoned.into_inner() = Some(loaded),
		}
	}

	fn current(&self) -> Option<Loaded> {
		match self.loaded.read() {
			Ok(guard) => guard.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}
}

/// Reads and concatenates the named corpora, then builds one model.
///
/// A single corpus goes through the snapshot cache when `cache` is set.
fn build_corpora(
	data_dir: &Path,
	names: &[String],
	config: &QuipConfig,
	tagger: &dyn PosTagger,
	cache: bool,
) -> Result<ModelHandle, QuipError> {
	let builder = config.builder()?.with_tagger(tagger);

	if let [name] = names {
		let path = corpus_path(data_dir, name);
		return if cache { builder.load_or_build(&path) } else { builder.build(&read_text(&path)?) };
	}

	let mut corpus = String::new();
	for name in names {
		corpus.push_str(&read_text(corpus_path(data_dir, name))?);
		corpus.push('\n');
	}
	builder.build(&corpus)
}

fn corpus_path(data_dir: &Path, name: &str) -> PathBuf {
	data_dir.join(format!("{name}.txt"))
}

/// Comma-separated corpus names, rejecting anything that is not a bare name.
fn parse_names(raw: Option<&str>) -> Result<Vec<String>, String> {
	let raw = match raw {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return Err("Missing or empty corpus name".into()),
	};

	let names: Vec<String> = raw
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_owned)
		.collect();

	if let Some(bad) = names.iter().find(|n| n.contains(['/', '\\']) || n.contains("..")) {
		return Err(format!("Invalid corpus name: {bad}"));
	}
	if names.is_empty() {
		return Err("Missing or empty corpus name".into());
	}
	Ok(names)
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates one quip (or `sentences` of them joined by spaces) from the
/// loaded model. `seed` makes the random draws reproducible; the recent
/// history still applies across requests.
#[get("/v1/generate")]
async fn get_generated(state: web::Data<AppState>, query: web::Query<GenerateQuery>) -> impl Responder {
	let params = match query.params(&state.config.generation) {
		Ok(p) => p,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let sentences = match query.sentences() {
		Ok(n) => n,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let Some(loaded) = state.current() else {
		return HttpResponse::ServiceUnavailable().body("No corpus loaded");
	};

	let mut generator = match state.generator.lock() {
		Ok(g) => g,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};

	let text = match query.seed {
		Some(seed) => {
			let mut rng = SmallRng::seed_from_u64(seed);
			generator.generate_paragraph(&loaded.model, &params, sentences, &mut rng)
		}
		None => generator.generate_paragraph(&loaded.model, &params, sentences, &mut rand::rng()),
	};
	HttpResponse::Ok().body(text)
}

#[get("/v1/corpora")]
async fn get_corpora(state: web::Data<AppState>) -> impl Responder {
	match list_files(&state.data_dir, "txt") {
		Ok(files) => {
			let names: Vec<String> = files.iter().filter_map(get_filename).collect();
			HttpResponse::Ok().body(names.join("\n"))
		}
		Err(e) => {
			warn!("listing corpora failed: {e}");
			HttpResponse::InternalServerError().body("Failed to list corpora")
		}
	}
}

#[get("/v1/loaded_corpora")]
async fn get_loaded_corpora(state: web::Data<AppState>) -> impl Responder {
	let names = state.current().map(|l| l.names).unwrap_or_default();
	HttpResponse::Ok().body(names.join("\n"))
}

/// HTTP GET endpoint `/v1/model`: statistics of the loaded model as JSON.
#[get("/v1/model")]
async fn get_model(state: web::Data<AppState>) -> impl Responder {
	match state.current() {
		Some(loaded) => HttpResponse::Ok().json(loaded.model.stats()),
		None => HttpResponse::ServiceUnavailable().body("No corpus loaded"),
	}
}

/// HTTP PUT endpoint `/v1/load_corpus?names=a,b`
///
/// Builds a model from `data_dir/a.txt` and `data_dir/b.txt` on the
/// blocking pool, then swaps it in. Requests keep using the previous model
/// until the swap.
#[put("/v1/load_corpus")]
async fn put_corpus(state: web::Data<AppState>, query: web::Query<CorpusQuery>) -> impl Responder {
	let names = match parse_names(query.names.as_deref()) {
		Ok(n) => n,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let shared = state.clone();
	let joined = names.join(",");
	match web::block(move || shared.load(names)).await {
		Ok(Ok(())) => {
			info!("serving corpus {joined}");
			HttpResponse::Ok().body("Corpus loaded successfully")
		}
		Ok(Err(e @ QuipError::Io { .. })) => HttpResponse::NotFound().body(format!("Failed to load corpus: {e}")),
		Ok(Err(e)) => HttpResponse::UnprocessableEntity().body(format!("Failed to build model: {e}")),
		Err(_) => HttpResponse::InternalServerError().body("Model build was interrupted"),
	}
}

/// Registers every endpoint.
pub fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(get_generated)
		.service(get_corpora)
		.service(get_loaded_corpora)
		.service(get_model)
		.service(put_corpus);
}
