use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use letgo_common::SourceDb;
use letgo_lexer::tokenize;
use letgo_parser::parse;

#[derive(Parser)]
#[command(name = "letgo")]
#[command(about = "Syntax checker for the LET/GO TO teaching language")]
#[command(version)]
struct Cli {
    /// When to color diagnostics
    #[arg(long, value_enum, default_value_t = Color::Auto, global = true)]
    color: Color,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that each program is well formed ("-" reads stdin)
    Check {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },

    /// Print the token sequence of a program
    Tokens {
        source: PathBuf,
    },

    /// Check every non-blank line of a file as its own program
    Batch {
        source: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Color {
    Auto,
    Always,
    Never,
}

impl From<Color> for ColorChoice {
    fn from(color: Color) -> Self {
        match color {
            Color::Auto => ColorChoice::Auto,
            Color::Always => ColorChoice::Always,
            Color::Never => ColorChoice::Never,
        }
    }
}

/// Renders diagnostics for every source it has been handed.
struct Reporter {
    files: SourceDb,
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    fn new(color: Color) -> Self {
        Self {
            files: SourceDb::new(),
            writer: StandardStream::stderr(color.into()),
            config: term::Config::default(),
        }
    }

    /// Check one program; returns whether it was accepted.
    fn check(&mut self, name: String, source: String) -> Result<bool> {
        let outcome = parse(&source);
        let file_id = self.files.add(name, source);
        match outcome {
            Ok(program) => {
                tracing::debug!(commands = program.commands.len(), "program accepted");
                Ok(true)
            }
            Err(e) => {
                let diagnostic = e.to_diagnostic(file_id);
                term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic)?;
                Ok(false)
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut reporter = Reporter::new(cli.color);

    let all_ok = match cli.command {
        Commands::Check { sources } => {
            let mut all_ok = true;
            for path in &sources {
                let (name, source) = read_source(path)?;
                if reporter.check(name.clone(), source)? {
                    println!("OK: {name}");
                } else {
                    all_ok = false;
                }
            }
            all_ok
        }
        Commands::Tokens { source } => {
            let (_, text) = read_source(&source)?;
            match tokenize(&text) {
                Ok(tokens) => {
                    for token in &tokens {
                        println!("{:>4}..{:<4} {token}", token.span.start, token.span.end);
                    }
                    true
                }
                Err(e) => {
                    let file_id = reporter.files.add(source.display().to_string(), text);
                    let diagnostic = e.to_diagnostic(file_id);
                    term::emit(
                        &mut reporter.writer.lock(),
                        &reporter.config,
                        &reporter.files,
                        &diagnostic,
                    )?;
                    false
                }
            }
        }
        Commands::Batch { source } => {
            let (name, text) = read_source(&source)?;
            let mut all_ok = true;
            for (number, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let line_name = format!("{name}:{}", number + 1);
                if reporter.check(line_name.clone(), line.to_string())? {
                    println!("ok: {line_name}");
                } else {
                    all_ok = false;
                }
            }
            all_ok
        }
    };

    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<(String, String)> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        return Ok(("<stdin>".to_string(), source));
    }
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((path.display().to_string(), source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from(["letgo", "check", "a.lg", "b.lg"]).unwrap();
        match cli.command {
            Commands::Check { sources } => assert_eq!(sources.len(), 2),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_cli_requires_sources() {
        assert!(Cli::try_parse_from(["letgo", "check"]).is_err());
    }

    #[test]
    fn test_cli_color_flag() {
        let cli = Cli::try_parse_from(["letgo", "tokens", "a.lg", "--color", "never"]).unwrap();
        assert!(matches!(cli.color, Color::Never));
        assert!(matches!(ColorChoice::from(cli.color), ColorChoice::Never));
    }

    #[test]
    fn test_reporter_check() {
        let mut reporter = Reporter::new(Color::Never);
        assert!(reporter
            .check("good".into(), "LET X := 1; END".into())
            .unwrap());
        assert!(!reporter
            .check("bad".into(), "LET X := 1".into())
            .unwrap());
    }
}
