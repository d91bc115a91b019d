//! Command-line interface for DeployWatch.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use deploywatch_agent::{LlmConfig, MonitoringAgent, OpenAiChatBackend};
use deploywatch_core::ActivityLog;
use deploywatch_platform::{PlatformConfig, RestPlatformClient};
use deploywatch_tools::{ToolRegistry, ToolRegistryBuilder};

/// DeployWatch - conversational monitoring for ML model deployments.
#[derive(Parser, Debug)]
#[command(name = "deploywatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// User ID to attribute tool invocations to.
    #[arg(short, long, global = true, default_value = "cli")]
    user: String,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the monitoring agent a single question and exit.
    Ask {
        /// The question to answer.
        question: String,
        /// Override the LLM model.
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive chat with the monitoring agent.
    Chat {
        /// Override the LLM model.
        #[arg(long)]
        model: Option<String>,
    },
    /// List accessible deployments without going through the agent.
    ListDeployments {
        /// Substring to match against label or description.
        #[arg(short, long)]
        search: Option<String>,
        /// Maximum rows to return.
        #[arg(short, long, default_value_t = 20)]
        limit: u64,
    },
    /// List the diagnostic tool catalog.
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    match args.command {
        Command::Ask { question, model } => run_ask(&args.user, &question, model).await,
        Command::Chat { model } => run_chat(&args.user, model).await,
        Command::ListDeployments { search, limit } => run_list(&args.user, search, limit).await,
        Command::Tools => run_tools(),
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "deploywatch=debug"
    } else {
        "deploywatch=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // JSON logs for container environments.
    let json_logging = std::env::var("DEPLOYWATCH_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Build the full tool registry over a REST platform client.
fn build_registry() -> Result<Arc<ToolRegistry>> {
    let platform = Arc::new(RestPlatformClient::new(PlatformConfig::from_env()?)?);
    let registry = ToolRegistryBuilder::new(Arc::new(ActivityLog::new()))
        .with_deployment_tools(platform)
        .with_user_tools()
        .with_resolution_tools()
        .build();
    Ok(Arc::new(registry))
}

fn build_agent(model: Option<String>) -> Result<MonitoringAgent> {
    let mut config = LlmConfig::from_env();
    if let Some(model) = model {
        config = config.with_model(model);
    }
    let backend = Arc::new(OpenAiChatBackend::new(config)?);
    Ok(MonitoringAgent::new(backend, build_registry()?))
}

async fn run_ask(user: &str, question: &str, model: Option<String>) -> Result<()> {
    let agent = build_agent(model)?;
    let answer = agent.ask(user, question).await?;
    println!("{answer}");
    Ok(())
}

async fn run_chat(user: &str, model: Option<String>) -> Result<()> {
    let agent = build_agent(model)?;
    let mut history = agent.new_history();

    println!("DeployWatch monitoring agent. Type 'exit' or Ctrl-D to quit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }
        match agent.ask_in(&mut history, user, question).await {
            Ok(answer) => println!("\n{answer}\n"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

async fn run_list(user: &str, search: Option<String>, limit: u64) -> Result<()> {
    let registry = build_registry()?;
    let ctx = deploywatch_tools::InvocationContext::new(user, "list deployments");
    let mut arguments = serde_json::json!({ "limit": limit });
    if let Some(search) = search {
        arguments["search"] = serde_json::Value::String(search);
    }
    let output = registry
        .execute_tracked(&ctx, "list_deployments", arguments)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if output.success {
        println!("{}", output.as_text());
    } else {
        anyhow::bail!("{}", output.error.unwrap_or_else(|| "unknown error".to_string()));
    }
    Ok(())
}

fn run_tools() -> Result<()> {
    // The catalog does not need platform credentials just to be listed,
    // so use an offline fixture client.
    let platform = Arc::new(deploywatch_platform::MemoryPlatform::new());
    let registry = ToolRegistryBuilder::new(Arc::new(ActivityLog::new()))
        .with_deployment_tools(platform)
        .with_user_tools()
        .with_resolution_tools()
        .build();

    println!("Available tools ({}):\n", registry.len());
    for definition in registry.definitions() {
        println!("  {}\n      {}\n", definition.name, definition.description);
    }
    Ok(())
}
