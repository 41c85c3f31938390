mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use rs_quip_core::io::normalize_folder;
use rs_quip_core::{LexiconTagger, NoTagger, PosTagger, QuipConfig};

use routes::AppState;

/// HTTP front-end for the quip generator.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	/// Directory holding the `.txt` corpora.
	#[arg(long, default_value = "./data")]
	data_dir: String,

	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	#[arg(long, default_value_t = 5000)]
	port: u16,

	/// TOML configuration file. Built-in defaults when omitted.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Part-of-speech lexicon (`word<TAB>Tag,Tag` per line).
	#[arg(long)]
	lexicon: Option<PathBuf>,

	/// Corpora to load at startup, comma separated.
	#[arg(long)]
	load: Option<String>,

	/// Reuse and write `.bin` snapshots next to single corpora.
	#[arg(long)]
	cache: bool,
}

/// Main entry point for the server.
///
/// Reads the configuration and the optional lexicon, loads the startup
/// corpora if any, then serves the `/v1` endpoints. Without `--load` the
/// server answers 503 on generation until `PUT /v1/load_corpus` succeeds.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => QuipConfig::load(path).map_err(std::io::Error::other)?,
		None => QuipConfig::default(),
	};

	let tagger: Arc<dyn PosTagger + Send + Sync> = match &args.lexicon {
		Some(path) => {
			let lexicon = LexiconTagger::load(path).map_err(std::io::Error::other)?;
			info!("lexicon {} holds {} words", path.display(), lexicon.len());
			Arc::new(lexicon)
		}
		None => Arc::new(NoTagger),
	};

	let data_dir = normalize_folder(&args.data_dir);
	let state = web::Data::new(AppState::new(config, tagger, data_dir.clone(), args.cache));

	if let Some(names) = &args.load {
		let names: Vec<String> = names
			.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_owned)
			.collect();
		if let Err(e) = state.load(names) {
			error!("startup corpus failed to load: {e}");
			return Err(std::io::Error::other(e));
		}
	}

	info!("serving {} on {}:{}", data_dir.display(), args.host, args.port);
	HttpServer::new(move || {
		let cors = Cors::default()
			.allow_any_origin()
			.allowed_methods(vec!["GET", "PUT"])
			.max_age(3600);

		App::new()
			.wrap(cors)
			.wrap(middleware::Logger::default())
			.app_data(state.clone())
			.configure(routes::configure)
	})
		.bind((args.host.as_str(), args.port))?
		.run()
		.await
}
