#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use refseek::agent::{self, AgentOptions};
use refseek::evaluation::evaluate;
use refseek::Config;
use tracing_subscriber::{fmt, EnvFilter};

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// Research agent with source-trust evaluation.
#[derive(Parser, Debug)]
#[command(name = "refseek")]
#[command(version)]
#[command(about = "Tool-calling research agent with source-trust evaluation.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Onboard {
        /// Overwrite existing config without confirmation
        #[arg(long)]
        force: bool,

        /// API key for a remote Ollama endpoint
        #[arg(long)]
        api_key: Option<String>,

        /// Model ID override (default: llama3.1)
        #[arg(long)]
        model: Option<String>,
    },

    /// Run the research agent
    #[command(long_about = "\
Run the research agent.

Without --message this starts an interactive console session; type a
question and the agent gathers sources with its search tools before
answering. 'quit' or 'exit' leaves the session.

Examples:
  refseek agent
  refseek agent -m \"What is known about exoplanet atmospheres?\"
  refseek agent -m \"...\" --evaluate")]
    Agent {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0)
        #[arg(short, long, value_parser = parse_temperature)]
        temperature: Option<f64>,

        /// Maximum provider/tool iterations per task
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Run the source-trust evaluation over the final answer
        #[arg(long)]
        evaluate: bool,
    },

    /// Evaluate the trustworthiness of sources cited in a block of text
    #[command(long_about = "\
Evaluate the trustworthiness of sources cited in a block of text.

Extracts every URL, matches each domain against the trusted suffix
list, and prints a pass/fail report. Exits non-zero when the trusted
ratio falls below the threshold.

Examples:
  refseek evaluate --text 'See https://arxiv.org/abs/2401.00001'
  refseek evaluate --file answer.md --min-ratio 0.6
  some-command | refseek evaluate --trusted arxiv.org --trusted nature.com")]
    Evaluate {
        /// Trusted domain suffix (repeatable; defaults to config)
        #[arg(long)]
        trusted: Vec<String>,

        /// Minimum trusted ratio in [0, 1] (defaults to config)
        #[arg(long)]
        min_ratio: Option<f64>,

        /// Text to evaluate
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// File to evaluate (stdin when neither --text nor --file is given)
        #[arg(long)]
        file: Option<std::path::PathBuf>,
    },

    /// Show the resolved configuration
    Status,
}

async fn onboard(force: bool, api_key: Option<String>, model: Option<String>) -> Result<()> {
    let existed = Config::default_config_path()?.exists();
    if existed && !force {
        bail!(
            "Config already exists at {}. Re-run with --force to overwrite.",
            Config::default_config_path()?.display()
        );
    }

    let mut config = Config::load_or_init().await?;
    if force {
        config = Config {
            config_path: config.config_path.clone(),
            ..Config::default()
        };
    }
    if let Some(key) = api_key {
        config.api_key = Some(key);
    }
    if let Some(model) = model {
        config.default_model = Some(model);
    }
    config.save().await?;

    println!("Config written to {}", config.config_path.display());
    println!("Set TAVILY_API_KEY (or [web_search].api_key) to enable web search.");
    Ok(())
}

async fn evaluate_command(
    config: &Config,
    trusted: Vec<String>,
    min_ratio: Option<f64>,
    text: Option<String>,
    file: Option<std::path::PathBuf>,
) -> Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            use tokio::io::AsyncReadExt;
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let trusted = if trusted.is_empty() {
        config.evaluation.trusted_domains.clone()
    } else {
        trusted
    };
    let min_ratio = min_ratio.unwrap_or(config.evaluation.min_ratio);

    let report = evaluate(&trusted, &text, min_ratio)?;
    println!("{}", report.rendered_text);

    if !report.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn status(config: &Config) {
    println!("config file:      {}", config.config_path.display());
    println!("model:            {}", config.model_name());
    println!("temperature:      {}", config.default_temperature);
    println!(
        "api_url:          {}",
        config
            .api_url
            .as_deref()
            .unwrap_or(refseek::providers::DEFAULT_BASE_URL)
    );
    println!(
        "api_key:          {}",
        if config.api_key.is_some() { "set" } else { "unset" }
    );
    println!("max_iterations:   {}", config.agent.max_iterations);
    println!(
        "tavily key:       {}",
        if config.web_search.api_key.is_some() {
            "set"
        } else {
            "unset"
        }
    );
    println!("arxiv results:    {}", config.arxiv.max_results);
    println!(
        "wikipedia:        {} ({} sentences)",
        config.wikipedia.language, config.wikipedia.sentences
    );
    println!(
        "trusted domains:  {}",
        config.evaluation.trusted_domains.join(", ")
    );
    println!("min_ratio:        {}", config.evaluation.min_ratio);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("REFSEEK_CONFIG_DIR", config_dir);
    }

    // Respects RUST_LOG, defaults to info.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Commands::Onboard {
        force,
        api_key,
        model,
    } = cli.command
    {
        return onboard(force, api_key, model).await;
    }

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Onboard { .. } => unreachable!(),

        Commands::Agent {
            message,
            model,
            temperature,
            max_iterations,
            evaluate,
        } => {
            agent::run(
                &config,
                AgentOptions {
                    message,
                    model,
                    temperature,
                    max_iterations,
                    evaluate,
                },
            )
            .await
        }

        Commands::Evaluate {
            trusted,
            min_ratio,
            text,
            file,
        } => evaluate_command(&config, trusted, min_ratio, text, file).await,

        Commands::Status => {
            status(&config);
            Ok(())
        }
    }
}
