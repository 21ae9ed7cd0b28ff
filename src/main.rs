use std::io::{self, BufRead};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cfparse::cli::{Cli, Mode};
use cfparse::engine::{CykParser, EarleyParser, Recognizer};
use cfparse::generator::Generator;
use cfparse::grammar::GrammarManager;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let manager = match GrammarManager::from_file(&cli.file, cli.grammar_config()) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.mode {
        Mode::Generate => generate(&manager, &cli),
        Mode::Cyk => recognize(&CykParser::new(&manager), None),
        Mode::Earley => {
            let earley = EarleyParser::new(manager);
            recognize(&earley, cli.tree.then_some(&earley))
        }
    }
}

fn generate(manager: &GrammarManager, cli: &Cli) -> ExitCode {
    let mut generator = Generator::new(manager, cli.generator_config());
    for _ in 0..cli.amount.unwrap_or(1) {
        match generator.generate() {
            Ok(sentence) => println!("{}", sentence),
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

// Answers one stdin line at a time until an empty line or the end of input
fn recognize(recognizer: &impl Recognizer, trees: Option<&EarleyParser>) -> ExitCode {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        if line.is_empty() {
            break;
        }

        let input: Vec<char> = line.chars().collect();
        if !recognizer.parse_input(&input) {
            println!("unsuccessful");
            continue;
        }
        println!("successful");

        if let Some(earley) = trees {
            let printed = earley
                .parse_tree(&input)
                .map_err(|e| e.to_string())
                .and_then(|tree| earley.manager().print_tree(&tree).map_err(|e| e.to_string()));
            match printed {
                Ok(printed) => print!("{}", printed),
                Err(e) => error!(error = %e, "could not build parse tree"),
            }
        }
    }
    ExitCode::SUCCESS
}
