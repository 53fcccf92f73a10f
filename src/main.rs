use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tagsep::{
    BatchError, BatchLayout, BatchOptions, ConfigError, PromptBatch, PromptRewriter,
    RewriteOptions, RewriterConfigBuilder, Separator, SeparatorError, SeparatorRole,
    restore_prompt, rewrite_batch,
};

/// tagsep - rewrite comma-separated prompts with custom tag and word separators
#[derive(Parser)]
#[command(name = "tagsep")]
#[command(about = "Rewrite comma-separated prompts with custom tag and word separators")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Rewrite a prompt and an optional negative prompt
    Rewrite(RewriteCommand),
    /// Turn a rewritten prompt back into comma-separated tags
    Restore(RestoreCommand),
    /// Rewrite every prompt of a JSON batch file
    Batch(BatchCommand),
    /// List the available separators
    Separators(SeparatorsCommand),
}

/// Separator selection shared by the rewriting commands
#[derive(Args, Debug, Default)]
struct SeparatorArgs {
    /// Separator placed between tags (e.g. Comma, Space, BREAK)
    #[arg(long, value_name = "NAME")]
    tag_sep: Option<String>,

    /// Separator replacing spaces inside a tag (e.g. Dash, Underscore, Empty)
    #[arg(long, value_name = "NAME")]
    word_sep: Option<String>,

    /// Keep all-caps meta keywords attached to their neighbouring words
    #[arg(long, conflicts_with = "split_meta")]
    keep_meta: bool,

    /// Split all-caps meta keywords into their own tags
    #[arg(long)]
    split_meta: bool,
}

/// Rewrite a prompt
#[derive(Parser)]
struct RewriteCommand {
    /// The prompt to rewrite (read from stdin when omitted)
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// Negative prompt to rewrite alongside
    #[arg(short, long, value_name = "TEXT")]
    negative: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    separators: SeparatorArgs,
}

/// Restore a rewritten prompt
#[derive(Parser)]
struct RestoreCommand {
    /// The rewritten text (read from stdin when omitted)
    #[arg(value_name = "TEXT")]
    text: Option<String>,

    /// Tag separator the text was rewritten with
    #[arg(long, value_name = "NAME")]
    tag_sep: String,

    /// Word separator the text was rewritten with
    #[arg(long, value_name = "NAME")]
    word_sep: String,
}

/// Rewrite a batch file
#[derive(Parser)]
struct BatchCommand {
    /// JSON file holding `prompts`, `negative_prompts` and optional hires variants
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Number of generation rounds in the batch
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    /// Images per round (defaults to the prompts split evenly across iterations)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Leave negative prompts untouched
    #[arg(long)]
    skip_negative: bool,

    #[command(flatten)]
    separators: SeparatorArgs,
}

/// List separators
#[derive(Parser)]
struct SeparatorsCommand {
    /// Only list separators usable in this role
    #[arg(long, value_enum)]
    role: Option<RoleArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Tag,
    Word,
}

impl From<RoleArg> for SeparatorRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Tag => SeparatorRole::Tag,
            RoleArg::Word => SeparatorRole::Word,
        }
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = match &cli.command {
        Commands::Rewrite(cmd) => handle_rewrite(cmd, &mut out),
        Commands::Restore(cmd) => handle_restore(cmd, &mut out),
        Commands::Batch(cmd) => handle_batch(cmd, &mut out),
        Commands::Separators(cmd) => handle_separators(cmd, &mut out),
    };

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Installs a stderr subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::prelude::*;

    let default_filter = if verbose { "tagsep=debug,warn" } else { "tagsep=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad separator names, bad configuration and malformed batches.
/// Internal errors are I/O failures.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<SeparatorError>()
            || cause.is::<ConfigError>()
            || cause.is::<BatchError>()
    })
}

/// Parses a separator name given on the command line.
fn parse_separator(name: &str, role: SeparatorRole) -> Result<Separator> {
    let separator: Separator = name.parse()?;
    Ok(separator.validate_for(role)?)
}

/// Resolves command-line separator flags, falling back to the environment.
fn resolve_options(args: &SeparatorArgs) -> Result<RewriteOptions> {
    let mut builder = RewriterConfigBuilder::new();
    if let Some(name) = &args.tag_sep {
        builder = builder.tag_separator(parse_separator(name, SeparatorRole::Tag)?);
    }
    if let Some(name) = &args.word_sep {
        builder = builder.word_separator(parse_separator(name, SeparatorRole::Word)?);
    }
    if args.keep_meta {
        builder = builder.ignore_meta_keywords(false);
    } else if args.split_meta {
        builder = builder.ignore_meta_keywords(true);
    }
    builder.build().context("Invalid separator configuration")
}

/// Returns `text`, or everything on stdin when it is absent.
fn text_or_stdin(text: Option<&str>) -> Result<String> {
    match text {
        Some(text) => Ok(text.to_string()),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read prompt from stdin")?;
            Ok(buf)
        }
    }
}

fn handle_rewrite(cmd: &RewriteCommand, out: &mut impl Write) -> Result<()> {
    let options = resolve_options(&cmd.separators)?;
    let prompt = text_or_stdin(cmd.prompt.as_deref())?;
    execute_rewrite(&prompt, cmd.negative.as_deref(), options, cmd.json, out)
}

/// Executes the rewrite command logic with already-resolved options.
fn execute_rewrite(
    prompt: &str,
    negative: Option<&str>,
    options: RewriteOptions,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let rewriter = PromptRewriter::new(options);
    let pair = rewriter.rewrite_pair(prompt, negative);

    if json {
        serde_json::to_writer_pretty(&mut *out, &pair).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", pair.positive)?;
        if let Some(negative) = &pair.negative {
            writeln!(out, "{negative}")?;
        }
    }
    Ok(())
}

fn handle_restore(cmd: &RestoreCommand, out: &mut impl Write) -> Result<()> {
    let tag_separator = parse_separator(&cmd.tag_sep, SeparatorRole::Tag)?;
    let word_separator = parse_separator(&cmd.word_sep, SeparatorRole::Word)?;
    let text = text_or_stdin(cmd.text.as_deref())?;

    let text = text.trim_end_matches(['\r', '\n']);
    writeln!(out, "{}", restore_prompt(text, tag_separator, word_separator))?;
    Ok(())
}

fn handle_batch(cmd: &BatchCommand, out: &mut impl Write) -> Result<()> {
    let options = BatchOptions {
        enabled: true,
        rewrite_negative: !cmd.skip_negative,
        rewrite: resolve_options(&cmd.separators)?,
    };
    execute_batch(&cmd.file, cmd.iterations, cmd.batch_size, &options, out)
}

/// Executes the batch command logic for a file on disk.
fn execute_batch(
    path: &Path,
    iterations: usize,
    batch_size: Option<usize>,
    options: &BatchOptions,
    out: &mut impl Write,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
    let batch = PromptBatch::from_json(&content)
        .with_context(|| format!("Failed to parse batch file: {}", path.display()))?;

    let layout = match batch_size {
        Some(_) if iterations == 0 => return Err(BatchError::NoIterations.into()),
        Some(size) => BatchLayout::new(iterations, size),
        None => BatchLayout::covering(batch.prompts.len(), iterations)?,
    };

    let outcome = rewrite_batch(batch, layout, options)?;
    serde_json::to_writer_pretty(&mut *out, &outcome).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}

fn handle_separators(cmd: &SeparatorsCommand, out: &mut impl Write) -> Result<()> {
    let separators: Vec<Separator> = match cmd.role {
        Some(role) => Separator::for_role(role.into()).collect(),
        None => Separator::all().collect(),
    };

    writeln!(out, "{:<12} {:<10} ROLES", "NAME", "LITERAL")?;
    for sep in separators {
        let literal = match sep.literal() {
            Some(literal) => format!("{literal:?}"),
            None => "-".to_string(),
        };
        let roles = match (sep.allows(SeparatorRole::Tag), sep.allows(SeparatorRole::Word)) {
            (true, true) => "tag, word",
            (true, false) => "tag",
            (false, true) => "word",
            (false, false) => "",
        };
        writeln!(out, "{:<12} {:<10} {roles}", sep.name(), literal)?;
    }
    Ok(())
}
