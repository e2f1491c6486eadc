/// Preview: interactive generation shell for trying out a transition table.
///
/// Usage: preview [--model <table.ron>] [--seed <n>]
///
/// Commands:
///   gen [n]  generate up to n words (default 20)
///   from <w1> <w2> [n]  generate starting from a given word pair
///   learn <text>  merge a message into the table
///   bulk <n> [words]  generate n messages with length statistics
///   seed <n>  set RNG seed
///   stats  show table size
///   save <path>  write the table to a RON file
///   help  list commands
///   quit  exit
use chatter_engine::core::markov::{load_model, save_model, MarkovChain};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_WORDS: usize = 20;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    let mut model_path = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--model" if i + 1 < args.len() => {
                i += 1;
                model_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut chain = match model_path {
        Some(ref path) => load_model(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error loading table '{}': {}", path, e);
            std::process::exit(1);
        }),
        None => MarkovChain::new(),
    };

    println!("Loaded {} keys", chain.key_count());
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let mut rng = StdRng::seed_from_u64(seed);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let parts: Vec<&str> = rest.split_whitespace().collect();

        match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "gen" => {
                let words = parse_words(parts.first().copied());
                print_generated(&chain.generate(&mut rng, words));
            }
            "from" => {
                if parts.len() < 2 {
                    println!("Usage: from <w1> <w2> [n]");
                    continue;
                }
                let key = format!("{} {}", parts[0], parts[1]);
                let words = parse_words(parts.get(2).copied());
                print_generated(&chain.generate_from(&mut rng, &key, words));
            }
            "learn" => {
                if rest.is_empty() {
                    println!("Usage: learn <text>");
                    continue;
                }
                let before = chain.key_count();
                chain.ingest_one(rest, 1);
                println!("Learned. {} keys (+{})", chain.key_count(), chain.key_count() - before);
            }
            "bulk" => {
                let count: usize = match parts.first().map(|s| s.parse()) {
                    Some(Ok(n)) if n > 0 => n,
                    _ => {
                        println!("Usage: bulk <n>");
                        continue;
                    }
                };
                let words = parse_words(parts.get(1).copied());

                let mut lengths = Vec::with_capacity(count);
                let mut empty = 0usize;
                for _ in 0..count {
                    let text = chain.generate(&mut rng, words);
                    if text.is_empty() {
                        empty += 1;
                        continue;
                    }
                    println!("  {}", text);
                    lengths.push(text.split_whitespace().count());
                }

                if let (Some(min), Some(max)) = (lengths.iter().min(), lengths.iter().max()) {
                    let avg = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
                    println!("--- {} generated, {} empty, words min {} / avg {:.1} / max {}", lengths.len(), empty, min, avg, max);
                } else {
                    println!("--- nothing generated ({} empty)", empty);
                }
            }
            "seed" => {
                match parts.first().map(|s| s.parse::<u64>()) {
                    Some(Ok(s)) => {
                        rng = StdRng::seed_from_u64(s);
                        println!("Seed set to {}", s);
                    }
                    Some(Err(_)) => println!("Invalid seed: {}", rest),
                    None => println!("Usage: seed <n>"),
                }
            }
            "stats" => {
                let successors: usize = chain.table().values().map(|e| e.successors.len()).sum();
                println!("{} keys, {} recorded successors", chain.key_count(), successors);
            }
            "save" => {
                let Some(path) = parts.first() else {
                    println!("Usage: save <path>");
                    continue;
                };
                match save_model(&chain, Path::new(path)) {
                    Ok(()) => println!("Saved to '{}'", path),
                    Err(e) => println!("Save failed: {}", e),
                }
            }
            other => {
                println!("Unknown command: {}. Type 'help' for commands.", other);
            }
        }
    }
}

fn parse_words(arg: Option<&str>) -> usize {
    arg.and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_WORDS)
}

fn print_generated(text: &str) {
    if text.is_empty() {
        println!("(nothing to say)");
    } else {
        println!("{}", text);
    }
}

fn print_usage() {
    println!("Preview: interactive generation shell for transition tables.");
    println!();
    println!("Usage: preview [--model <path>] [--seed <n>]");
    println!();
    println!("  --model <path>  Transition table RON file (default: empty table)");
    println!("  --seed <n>      Initial RNG seed (default: 42)");
}

fn print_help() {
    println!("Commands:");
    println!("  gen [n]              Generate up to n words (default {})", DEFAULT_WORDS);
    println!("  from <w1> <w2> [n]   Generate starting from a word pair");
    println!("  learn <text>         Merge a message into the table");
    println!("  bulk <n> [words]     Generate n messages with length statistics");
    println!("  seed <n>             Set RNG seed");
    println!("  stats                Show table size");
    println!("  save <path>          Write the table to a RON file");
    println!("  help                 Show this help");
    println!("  quit                 Exit");
}
