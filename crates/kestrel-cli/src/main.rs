//! kestrel: generate text from a weight bundle on the command line.
//!
//! Loads the bundle and tokenizer, streams generated pieces to stdout as
//! they are sampled, and reports throughput when the session finishes.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use kestrel_core::{Error, Result, Tokenizer, WeightTables};
use kestrel_runtime::{GenerationConfig, InferenceSession, Model};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the model weight bundle
    model: PathBuf,

    /// Path to the tokenizer vocabulary
    #[arg(long, default_value = "tokenizer.bin")]
    tokenizer: PathBuf,

    /// Prompt text; omitted means unconditioned generation from the start token
    #[arg(long)]
    prompt: Option<String>,

    /// Nucleus sampling mass in (0, 1]
    #[arg(long, default_value_t = 0.9, value_parser = parse_top_p)]
    top_p: f32,

    /// Token budget for the session; defaults to the model's context length
    #[arg(long)]
    max_tokens: Option<usize>,

    /// RNG seed; omitted means OS entropy
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_top_p(s: &str) -> std::result::Result<f32, String> {
    let mass: f32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if mass > 0.0 && mass <= 1.0 {
        Ok(mass)
    } else {
        Err(format!("nucleus mass must lie in (0, 1], got {mass}"))
    }
}

fn run(args: &Args) -> Result<()> {
    let weights = WeightTables::from_file(&args.model)?;
    let config = *weights.config();

    let tokenizer = Tokenizer::from_file(&args.tokenizer)?;
    if tokenizer.vocab_size() != config.vocab_size {
        return Err(Error::VocabSize {
            expected: config.vocab_size,
            actual: tokenizer.vocab_size(),
        });
    }

    let mut model = Model::new(weights);
    let generation = GenerationConfig {
        max_tokens: args.max_tokens.unwrap_or(config.seq_len),
        top_p: args.top_p,
        seed: args.seed,
    };
    let mut session = InferenceSession::from_prompt(&tokenizer, args.prompt.as_deref(), generation);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    // The callback cannot return an error, so the first write failure is
    // parked here and reported once the session winds down.
    let mut write_error: Option<io::Error> = None;
    let stats = session.run(&mut model, &tokenizer, |piece| {
        if write_error.is_none() {
            if let Err(e) = out.write_all(piece).and_then(|_| out.flush()) {
                write_error = Some(e);
            }
        }
    });
    if let Some(e) = write_error {
        return Err(Error::Io(e));
    }

    writeln!(out)?;
    writeln!(out, "achieved tok/s: {:.2}", stats.tokens_per_sec())?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("kestrel: {e}");
        let code = match e {
            Error::VocabSize { .. } => 2,
            _ => 1,
        };
        process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let args = Args::try_parse_from(["kestrel", "model.bin"]).unwrap();
        assert_eq!(args.top_p, 0.9);
        assert!(args.prompt.is_none());
        assert!(args.max_tokens.is_none());
        assert!(args.seed.is_none());
    }

    #[test]
    fn rejects_out_of_range_top_p() {
        let err = Args::try_parse_from(["kestrel", "model.bin", "--top-p", "1.5"]).unwrap_err();
        assert!(err.to_string().contains("(0, 1]"), "unexpected message: {err}");
        assert!(Args::try_parse_from(["kestrel", "model.bin", "--top-p", "0"]).is_err());
        assert!(Args::try_parse_from(["kestrel", "model.bin", "--top-p", "nan"]).is_err());
    }

    #[test]
    fn accepts_full_nucleus_mass() {
        let args = Args::try_parse_from(["kestrel", "model.bin", "--top-p", "1.0"]).unwrap();
        assert_eq!(args.top_p, 1.0);
    }
}
