pub mod runner;

pub use runner::run_task;

use crate::config::Config;
use crate::evaluation::evaluate;
use crate::providers::create_provider;
use crate::tools::research_tools;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Per-invocation overrides for the agent entry point.
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    pub message: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_iterations: Option<usize>,
    pub evaluate: bool,
}

/// Run the research agent: one-shot with a message, interactive REPL without.
pub async fn run(config: &Config, options: AgentOptions) -> Result<()> {
    let provider = create_provider(config);
    let tools = research_tools(config);

    let model = options
        .model
        .clone()
        .unwrap_or_else(|| config.model_name());
    let model = model
        .strip_prefix("ollama:")
        .map(ToString::to_string)
        .unwrap_or(model);
    let temperature = options.temperature.unwrap_or(config.default_temperature);
    let max_iterations = options
        .max_iterations
        .unwrap_or(config.agent.max_iterations);

    tracing::info!(%model, temperature, max_iterations, "starting research agent");

    if let Some(task) = &options.message {
        let answer = run_task(
            provider.as_ref(),
            &tools,
            task,
            &model,
            temperature,
            max_iterations,
        )
        .await?;
        println!("{answer}");
        if options.evaluate {
            print_evaluation(config, &answer)?;
        }
        return Ok(());
    }

    // Interactive console loop.
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Research agent ready. Type a question, or 'quit' to leave.\n")
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if task.eq_ignore_ascii_case("quit") || task.eq_ignore_ascii_case("exit") {
            break;
        }

        match run_task(
            provider.as_ref(),
            &tools,
            task,
            &model,
            temperature,
            max_iterations,
        )
        .await
        {
            Ok(answer) => {
                println!("{answer}");
                if options.evaluate {
                    print_evaluation(config, &answer)?;
                }
            }
            Err(e) => {
                tracing::error!("agent task failed: {e:#}");
                eprintln!("Error: {e:#}");
            }
        }
    }

    Ok(())
}

fn print_evaluation(config: &Config, answer: &str) -> Result<()> {
    let report = evaluate(
        &config.evaluation.trusted_domains,
        answer,
        config.evaluation.min_ratio,
    )?;
    println!("\n{}", report.rendered_text);
    Ok(())
}
