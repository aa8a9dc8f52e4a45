use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use shellscout::config::Config;
use shellscout::knowledge::LocalKnowledgeBase;
use shellscout::llm::LlmClient;
use shellscout::pipeline::Pipeline;

/// Commands that need a real terminal when the user chooses to execute.
const INTERACTIVE_TOOLS: &[&str] = &["vim", "nano", "sudo", "ssh", "top", "htop", "less", "more"];

#[derive(Parser)]
#[command(
    name = "shellscout",
    about = "AI-assisted shell command suggestions with safe system reconnaissance"
)]
struct Cli {
    /// Natural-language request, e.g. `shellscout 端口 8080 被谁占用`
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,

    /// Show the parsed intent and raw scout output after the result
    #[arg(long)]
    debug: bool,

    /// Interactively configure the LLM endpoint and exit
    #[arg(long)]
    config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.config {
        return configure();
    }

    let query = cli.query.join(" ").trim().to_string();
    if query.is_empty() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    scrub_environment();

    let config = Config::load();
    let model = LlmClient::from_config(&config).context("LLM init error")?;
    let knowledge = LocalKnowledgeBase::open(&Config::knowledge_path());
    let pipeline = Pipeline::new(Arc::new(model), Arc::new(knowledge));

    let state = pipeline.run(&query).await;

    if cli.debug {
        println!("--- debug ---");
        println!("Intent: {}", state.intent.describe());
        for entry in &state.logs {
            println!("[{}] {}: {}", entry.ts, entry.node, entry.message);
        }
        if !state.scout_info.is_empty() {
            println!("{}", state.scout_info);
        }
        println!("-------------");
    }

    if let Some(error) = &state.error {
        eprintln!("Error: {error}");
    }

    if state.command.is_empty() {
        println!("No command generated. Try rephrasing your request.");
        return Ok(());
    }

    println!("Suggested command:");
    println!("  {}", state.command);

    if confirm("Execute?")? {
        run_command(&state.command).await;
    }

    Ok(())
}

/// Proxy variables would tunnel probe and LLM traffic through whatever the
/// shell happened to export; purge them once at startup. The HF mirror
/// override is for the embedding downloader used by the knowledge tooling.
fn scrub_environment() {
    for key in [
        "http_proxy",
        "https_proxy",
        "all_proxy",
        "HTTP_PROXY",
        "HTTPS_PROXY",
        "ALL_PROXY",
    ] {
        std::env::remove_var(key);
    }
    std::env::set_var("HF_ENDPOINT", "https://hf-mirror.com");
}

fn configure() -> anyhow::Result<()> {
    let current = Config::load();
    let base_url = prompt_with_default("Base URL", &current.base_url)?;
    let model = prompt_with_default("Model Name", &current.model)?;

    let config = Config {
        base_url,
        model,
        api_key: current.api_key,
    };
    config.save()?;
    println!("Saved to {}", Config::path().display());
    Ok(())
}

fn prompt_with_default(label: &str, default: &str) -> anyhow::Result<String> {
    print!("{label} [{default}]: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    })
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Run the confirmed command. Interactive tools get the terminal; everything
/// else is captured and printed in separate stdout/stderr blocks. Failures
/// here are printed, never propagated — the pipeline already finished.
/// Substring containment is deliberate: `ssh-keygen` and friends may prompt
/// and need the terminal too.
async fn run_command(command: &str) {
    let interactive = INTERACTIVE_TOOLS
        .iter()
        .any(|tool| command.contains(tool));

    if interactive {
        let status = tokio::process::Command::new("bash")
            .arg("-c")
            .arg(command)
            .status()
            .await;
        if let Err(e) = status {
            eprintln!("Execution error: {e}");
        }
        return;
    }

    match tokio::process::Command::new("bash")
        .arg("-c")
        .arg(command)
        .output()
        .await
    {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.trim().is_empty() {
                println!("--- output ---");
                print!("{stdout}");
            }
            if !stderr.trim().is_empty() {
                eprintln!("--- errors ---");
                eprint!("{stderr}");
            }
        }
        Err(e) => eprintln!("Execution error: {e}"),
    }
}
