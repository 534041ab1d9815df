// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parley main entry point - CLI and REPL.

use std::io::{self, IsTerminal, Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use parley::config::{self, CliOptions, ConfigFile};
use parley::history::{format_transcript, FileHistoryStore, HistoryStore};
use parley::providers::{create_provider, ReqwestTransport};
use parley::session::SessionEngine;
use parley::telemetry::{init_telemetry, TelemetryConfig};
use parley::types::format_model_entry;
use parley::HistoryError;

/// Parley - chat with OpenAI and Cohere models from the terminal.
#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version, about = "Chat with OpenAI and Cohere models from the terminal", long_about = None)]
struct Cli {
    /// Query to send; piped stdin is added as context first
    query: Vec<String>,

    /// Start an interactive session (type `exit` to quit)
    #[arg(short, long)]
    interactive: bool,

    /// Wait for the full reply instead of streaming it
    #[arg(short = 'q', long = "query")]
    query_mode: bool,

    /// Print the token usage after a --query reply
    #[arg(long, requires = "query_mode")]
    show_usage: bool,

    /// Model to use for this invocation
    #[arg(short, long)]
    model: Option<String>,

    /// Conversation thread to use for this invocation
    #[arg(long)]
    thread: Option<String>,

    /// Provider to use (openai, cohere)
    #[arg(long)]
    provider: Option<String>,

    /// List available models
    #[arg(short, long)]
    list_models: bool,

    /// List persisted threads
    #[arg(long)]
    list_threads: bool,

    /// Delete a thread, or all threads matching a glob such as `work-*`
    #[arg(long, value_name = "PATTERN")]
    delete_thread: Option<String>,

    /// Print a thread's history (default: the active thread)
    #[arg(long, value_name = "THREAD", num_args = 0..=1, default_missing_value = "")]
    show_history: Option<String>,

    /// Clear the active thread's history
    #[arg(short, long)]
    clear_history: bool,

    /// Print the resolved configuration
    #[arg(long)]
    config: bool,

    /// Set the default model in the config file
    #[arg(long, value_name = "MODEL")]
    set_model: Option<String>,

    /// Set the default thread in the config file
    #[arg(long, value_name = "THREAD")]
    set_thread: Option<String>,

    /// Set the context window in the config file
    #[arg(long, value_name = "TOKENS")]
    set_context_window: Option<u32>,

    /// Set the max tokens in the config file
    #[arg(long, value_name = "TOKENS")]
    set_max_tokens: Option<u32>,

    /// Show debug output
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn has_config_updates(&self) -> bool {
        self.set_model.is_some()
            || self.set_thread.is_some()
            || self.set_context_window.is_some()
            || self.set_max_tokens.is_some()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let telemetry = if cli.debug {
        TelemetryConfig::debug()
    } else {
        TelemetryConfig::default()
    };
    if let Err(e) = init_telemetry(&telemetry) {
        eprintln!("{} failed to initialize logging: {}", "warning:".yellow(), e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.has_config_updates() {
        return update_config_file(&cli);
    }

    let config = config::load_config(CliOptions {
        provider: cli.provider.clone(),
        model: cli.model.clone(),
        thread: cli.thread.clone(),
    })?;

    if cli.config {
        print!("{}", serde_yaml::to_string(&config.redacted())?);
        return Ok(());
    }

    let mut store = FileHistoryStore::open(&config.thread)?;

    if cli.list_threads {
        let threads = store.list_threads()?;
        if threads.is_empty() {
            println!("{}", "No threads yet".dimmed());
        }
        for thread in threads {
            let line = format_model_entry(&thread, &config.thread);
            if thread == config.thread {
                println!("{}", line.green());
            } else {
                println!("{}", line);
            }
        }
        return Ok(());
    }

    if let Some(ref pattern) = cli.delete_thread {
        store.delete_thread(pattern)?;
        println!("Deleted thread(s) matching {}", pattern.bright_white());
        return Ok(());
    }

    if let Some(ref thread) = cli.show_history {
        let thread = if thread.is_empty() { &config.thread } else { thread };
        let entries = store.read_thread(thread)?;
        print!("{}", format_transcript(&entries));
        return Ok(());
    }

    if cli.clear_history {
        match store.delete_thread(&config.thread) {
            Ok(()) | Err(HistoryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        println!("History successfully cleared.");
        return Ok(());
    }

    let transport = Arc::new(ReqwestTransport::from_config(&config)?);
    let provider = create_provider(&config, transport)?;
    let mut engine = SessionEngine::new(provider, Box::new(store), config);

    if cli.list_models {
        println!("Available models:");
        for model in engine.list_models().await? {
            if model.starts_with('*') {
                println!("{}", model.green());
            } else {
                println!("{}", model);
            }
        }
        return Ok(());
    }

    let stdin = io::stdin();
    if !cli.interactive && !stdin.is_terminal() {
        let mut piped = String::new();
        stdin
            .lock()
            .read_to_string(&mut piped)
            .context("failed to read from pipe")?;
        engine.provide_context(&piped);
    }

    if cli.interactive {
        return run_repl(&mut engine).await;
    }

    let query = cli.query.join(" ");
    if query.trim().is_empty() {
        bail!("you must specify your query");
    }

    if cli.query_mode {
        let completion = engine.query(&query).await?;
        println!("{}", completion.text);
        if cli.show_usage {
            println!("{}", format!("[Token Usage: {}]", completion.usage).dimmed());
        }
    } else {
        engine.stream(&query, &mut io::stdout()).await?;
    }

    Ok(())
}

async fn run_repl(engine: &mut SessionEngine) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut question = 1;

    loop {
        let line = match editor.readline(&format!("[Q{}] ", question)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let line = line.trim();
        if line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(line) {
            debug!(error = %e, "Failed to record REPL history entry");
        }

        let mut stdout = io::stdout();
        match engine.stream(line, &mut stdout).await {
            Ok(_) => question += 1,
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
        stdout.flush()?;
    }

    Ok(())
}

fn update_config_file(cli: &Cli) -> anyhow::Result<()> {
    let path = config::get_config_path().context("could not determine home directory")?;
    let mut file: ConfigFile = config::load_config_file(&path)?.unwrap_or_default();

    if let Some(ref model) = cli.set_model {
        file.model = Some(model.clone());
        println!("Model successfully updated to {}", model.bright_white());
    }
    if let Some(ref thread) = cli.set_thread {
        file.thread = Some(thread.clone());
        println!("Thread successfully updated to {}", thread.bright_white());
    }
    if let Some(window) = cli.set_context_window {
        file.context_window = Some(window);
        println!("Context window successfully updated to {}", window);
    }
    if let Some(max_tokens) = cli.set_max_tokens {
        file.max_tokens = Some(max_tokens);
        println!("Max tokens successfully updated to {}", max_tokens);
    }

    config::save_config_file(&path, &file)?;
    Ok(())
}
