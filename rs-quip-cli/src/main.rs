//! `quip` — prints short phrases generated from a text corpus.
//!
//! Thin wrapper over the `rs-quip-core` library crate.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;
use log::{LevelFilter, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rs_quip_core::io::read_text;
use rs_quip_core::{LexiconTagger, NoTagger, PosTagger, QuipConfig, StartSeed, Theme};

/// Generates short quips from a corpus with a backoff n-gram model.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Corpus text file.
    corpus: PathBuf,

    /// TOML configuration file. Command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// N-gram orders, e.g. `3,2,1`.
    #[arg(long, value_delimiter = ',')]
    orders: Option<Vec<usize>>,

    /// Minimum observations for a highest-order context to be kept.
    #[arg(long)]
    prune: Option<u64>,

    /// Number of quips to print.
    #[arg(long, short = 'n', default_value_t = 1)]
    count: usize,

    /// Quips per line.
    #[arg(long, default_value_t = 1)]
    sentences: usize,

    #[arg(long)]
    min_words: Option<usize>,

    #[arg(long)]
    max_words: Option<usize>,

    #[arg(long)]
    temperature: Option<f64>,

    /// statement, question or exclaim.
    #[arg(long)]
    theme: Option<Theme>,

    /// Words to open every quip with.
    #[arg(long)]
    start: Option<String>,

    /// Part-of-speech lexicon (`word<TAB>Tag,Tag` per line).
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Chance for each tagged word to be swapped for another of its kind.
    #[arg(long)]
    swap: Option<f64>,

    /// PRNG seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Reuse (or write) a `.bin` snapshot next to the corpus.
    #[arg(long)]
    cache: bool,

    /// Print model statistics instead of quips.
    #[arg(long)]
    stats: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => QuipConfig::load(path)?,
        None => QuipConfig::default(),
    };
    if let Some(orders) = &args.orders {
        config.build.orders = orders.clone();
    }
    if let Some(prune) = args.prune {
        config.build.prune_threshold = prune;
    }

    let tagger: Arc<dyn PosTagger + Send + Sync> = match &args.lexicon {
        Some(path) => Arc::new(LexiconTagger::load(path)?),
        None => Arc::new(NoTagger),
    };

    let builder = config.builder()?.with_tagger(&*tagger);
    let model = if args.cache {
        builder.load_or_build(&args.corpus)?
    } else {
        builder.build(&read_text(&args.corpus)?)?
    };

    if args.stats {
        let stats = model.stats();
        println!("tokens: {}", stats.tokens);
        println!("prune threshold: {}", stats.prune_threshold);
        for (order, keys, starts) in stats.chains {
            println!("order {order}: {keys} keys, {starts} start keys");
        }
        return Ok(());
    }

    let mut params = config.generation.clone();
    if let Some(min_words) = args.min_words {
        params.min_words = min_words;
    }
    if let Some(max_words) = args.max_words {
        params.max_words = max_words;
    }
    if let Some(temperature) = args.temperature {
        params.set_temperature(temperature)?;
    }
    if let Some(swap) = args.swap {
        params.set_pos_swap_probability(swap)?;
    }
    if let Some(theme) = args.theme {
        params.theme = theme;
    }
    if let Some(start) = &args.start {
        params.start_seed = StartSeed::Custom(start.clone());
    }
    params.validate()?;

    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let mut generator = config.generator().with_tagger(tagger.clone());

    info!("generating {} line(s) of {} quip(s)", args.count, args.sentences);
    for _ in 0..args.count {
        println!("{}", generator.generate_paragraph(&model, &params, args.sentences.max(1), &mut rng));
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    let _ = builder.try_init();
}
