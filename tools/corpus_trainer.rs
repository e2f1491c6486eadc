/// Corpus Trainer: builds a transition table from a chat log.
///
/// Usage: corpus_trainer --input <messages.txt> --output <table.ron> [--weight <n>]
///
/// Every non-empty line of the input is one message.
use chatter_engine::core::markov::{save_model, MarkovChain};
use chatter_engine::schema::corpus::CorpusItem;
use std::env;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "Usage: corpus_trainer --input <messages.txt> --output <table.ron> [--weight <n>]";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut output = None;
    let mut weight = 1i64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" if i + 1 < args.len() => {
                i += 1;
                input = Some(args[i].clone());
            }
            "--output" if i + 1 < args.len() => {
                i += 1;
                output = Some(args[i].clone());
            }
            "--weight" if i + 1 < args.len() => {
                i += 1;
                weight = args[i].parse().unwrap_or_else(|_| {
                    eprintln!("Error: --weight must be an integer");
                    process::exit(1);
                });
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input_path = input.unwrap_or_else(|| {
        eprintln!("Error: --input is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let output_path = output.unwrap_or_else(|| {
        eprintln!("Error: --output is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let text = std::fs::read_to_string(&input_path).unwrap_or_else(|e| {
        eprintln!("Error reading input file '{}': {}", input_path, e);
        process::exit(1);
    });

    let items: Vec<CorpusItem> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| CorpusItem::weighted(line, weight))
        .collect();

    tracing::info!(messages = items.len(), weight, input = %input_path, "training chain");
    let mut chain = MarkovChain::new();
    chain.ingest_bulk(items);

    let successor_count: usize = chain.table().values().map(|e| e.successors.len()).sum();
    println!(
        "Chain trained: {} keys, {} recorded successors",
        chain.key_count(),
        successor_count
    );

    save_model(&chain, std::path::Path::new(&output_path)).unwrap_or_else(|e| {
        eprintln!("Error saving table to '{}': {}", output_path, e);
        process::exit(1);
    });

    println!("Table saved to '{}'", output_path);
}
