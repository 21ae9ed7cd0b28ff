use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{GeneratorConfig, GrammarConfig, LineRecovery, RefineOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Recognize stdin lines with CYK on the CNF of the grammar
    Cyk,
    /// Recognize stdin lines with Earley on the grammar as written
    Earley,
    /// Print random sentences of the grammar
    Generate,
}

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Engine to run
    #[arg(value_enum)]
    pub mode: Mode,

    /// File containing the grammar
    pub file: PathBuf,

    /// Print the refined parse tree of accepted lines (earley only)
    #[arg(long)]
    pub tree: bool,

    /// Fail on the first malformed grammar line instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Order of pruning and splicing when refining trees
    #[arg(long, value_enum, default_value_t = RefineOrder::PruneFirst)]
    pub refine: RefineOrder,

    /// Amount to generate (default: 1)
    #[arg(short = 'n', long, value_name = "AMOUNT")]
    pub amount: Option<u32>,

    /// Seed for generation (default: random)
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Probability of choosing a `*>` rule when generating
    #[arg(long, value_name = "P", value_parser = parse_probability, default_value_t = 0.8)]
    pub prefer: f64,

    /// Depth after which generation only takes rules that finish
    #[arg(long, value_name = "DEPTH", default_value_t = 50)]
    pub max_depth: usize,
}

fn parse_probability(arg: &str) -> Result<f64, String> {
    let p: f64 = arg.parse().map_err(|_| format!("`{}` isn't a number", arg))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{} is not between 0 and 1", p))
    }
}

impl Cli {
    pub fn grammar_config(&self) -> GrammarConfig {
        GrammarConfig {
            recovery: if self.strict { LineRecovery::Abort } else { LineRecovery::Skip },
            refine_order: self.refine,
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            preferred: self.prefer,
            max_depth: self.max_depth,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_map_to_configs() {
        let cli = Cli::parse_from(["cfparse", "earley", "g.cfg", "--strict", "--refine", "resolve-first"]);

        assert_eq!(cli.mode, Mode::Earley);
        assert_eq!(cli.file, PathBuf::from("g.cfg"));
        assert_eq!(cli.grammar_config(), GrammarConfig {
            recovery: LineRecovery::Abort,
            refine_order: RefineOrder::ResolveFirst,
        });
        assert_eq!(cli.generator_config(), GeneratorConfig::default());
    }

    #[test]
    fn generator_flags() {
        let cli = Cli::parse_from(["cfparse", "generate", "g.cfg", "-n", "3", "--seed", "9", "--prefer", "0.5", "--max-depth", "4"]);

        assert_eq!(cli.amount, Some(3));
        assert_eq!(cli.generator_config(), GeneratorConfig { preferred: 0.5, max_depth: 4, seed: Some(9) });
        assert!(Cli::try_parse_from(["cfparse", "generate", "g.cfg", "--prefer", "2"]).is_err());
        assert!(Cli::try_parse_from(["cfparse", "parse", "g.cfg"]).is_err());
    }
}
