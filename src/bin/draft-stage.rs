//! draft-stage launcher
//!
//! Stages a draft in a running Chrome (started with
//! `--remote-debugging-port`) and leaves it unsent for review.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use draft_stage::tools::{ToolContext, ToolRegistry};
use draft_stage::{AttachmentSet, StageConfig, StageReport, StageRequest, Stager};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "draft-stage")]
#[command(version)]
#[command(about = "Stage a chat draft in a live browser tab without sending it", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON config file; flags override its values
    #[arg(long, global = true, env = "DRAFT_STAGE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Host of the CDP endpoint
    #[arg(long, global = true, env = "DRAFT_STAGE_HOST")]
    host: Option<String>,

    /// Remote debugging port of the browser
    #[arg(long, global = true, env = "DRAFT_STAGE_PORT")]
    port: Option<u16>,

    /// Fall back to any open tab (navigating it) when none matches the URL
    #[arg(long, global = true)]
    reuse_any_page: bool,

    /// Print the result as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Stage a full draft: model, reasoning level, prompt and attachments
    Stage(StageArgs),

    /// Locate the tab and wait for the composer without changing anything
    Check {
        #[arg(long, env = "DRAFT_STAGE_URL")]
        url: String,

        /// Composer wait in seconds
        #[arg(long, env = "DRAFT_STAGE_TIMEOUT", default_value_t = 60)]
        timeout: u64,
    },

    /// List the step tools with their parameter schemas
    Tools,

    /// Run a single step tool against the tab
    Step {
        /// Tool name, see `draft-stage tools`
        name: String,

        #[arg(long, env = "DRAFT_STAGE_URL")]
        url: String,

        /// Tool parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[derive(Args)]
struct StageArgs {
    /// Chat page to stage the draft in
    #[arg(long, env = "DRAFT_STAGE_URL")]
    url: String,

    /// Model label, e.g. "GPT-5.2 Pro"
    #[arg(long, env = "DRAFT_STAGE_MODEL")]
    model: Option<String>,

    /// Reasoning level label, e.g. "Extended"
    #[arg(long, env = "DRAFT_STAGE_THINKING")]
    thinking: Option<String>,

    #[arg(long, conflicts_with = "prompt_file")]
    prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(long, value_name = "PATH")]
    prompt_file: Option<PathBuf>,

    /// Newline-separated list of files to attach
    #[arg(long, value_name = "PATH")]
    attachments_file: Option<PathBuf>,

    /// File to attach (repeatable)
    #[arg(long = "attach", value_name = "PATH")]
    attach: Vec<PathBuf>,

    /// Overall timeout in seconds
    #[arg(long, env = "DRAFT_STAGE_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Fail the run when the model or reasoning level cannot be selected
    #[arg(long)]
    strict_selection: bool,
}

fn load_config(global: &GlobalArgs) -> anyhow::Result<StageConfig> {
    let mut config = match &global.config {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if let Some(host) = &global.host {
        config.connection.host = host.clone();
    }
    if let Some(port) = global.port {
        config.connection.port = port;
    }
    if global.reuse_any_page {
        config.connection.reuse_any_page = true;
    }
    Ok(config)
}

async fn build_request(args: StageArgs) -> anyhow::Result<StageRequest> {
    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt file {}", path.display()))?,
        (None, None) => String::new(),
    };

    let mut paths = Vec::new();
    if let Some(list) = &args.attachments_file {
        let text = tokio::fs::read_to_string(list)
            .await
            .with_context(|| format!("Failed to read attachment list {}", list.display()))?;
        paths.extend(text.lines().map(str::trim).filter(|line| !line.is_empty()).map(PathBuf::from));
    }
    paths.extend(args.attach);

    let mut request = StageRequest::new(args.url, prompt)
        .attachments(AttachmentSet::new(&paths)?)
        .timeout(Duration::from_secs(args.timeout))
        .strict_selection(args.strict_selection);
    if let Some(model) = args.model {
        request = request.model(model);
    }
    if let Some(level) = args.thinking {
        request = request.thinking(level);
    }
    Ok(request)
}

fn print_summary(report: &StageReport) {
    if let Some(located) = &report.target {
        eprintln!("Tab: {} ({})", located.target.url, located.target.id);
    }
    eprintln!("Composer: {}", report.readiness);
    for selection in [&report.model, &report.thinking].into_iter().flatten() {
        eprintln!("{}: {} -> {}", selection.kind, selection.target, selection.status);
    }
    if let Some(prompt) = &report.prompt {
        eprintln!("Prompt: {} characters", prompt.length.unwrap_or_default());
    }
    if let Some(state) = &report.attachments {
        eprintln!("Attachments: {} staged ({})", state.file_count, state.visible_names.join(", "));
    }
    eprintln!("Draft staged on attempt {}; review and send it manually", report.attempts);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli.global)?;
    let json = cli.global.json;

    match cli.command {
        Command::Stage(args) => {
            let request = build_request(args).await?;
            let stager = Stager::new(config)?;

            eprintln!("Staging draft in {}", request.url);
            let report = stager.stage(&request).await?;

            print_summary(&report);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Check { url, timeout } => {
            let stager = Stager::new(config)?;
            let (located, readiness) = stager.check(&url, Duration::from_secs(timeout)).await?;

            eprintln!("Tab {} ({:?}) composer {}", located.target.id, located.matched, readiness);
            if json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "target": located, "readiness": readiness }))?);
            }
        }
        Command::Tools => {
            let registry = ToolRegistry::with_defaults();
            if json {
                println!("{}", serde_json::to_string_pretty(&registry.list())?);
            } else {
                for info in registry.list() {
                    println!("{:<16} {}", info.name, info.description);
                }
            }
        }
        Command::Step { name, url, params } => {
            let params: serde_json::Value = serde_json::from_str(&params).context("--params must be a JSON object")?;
            let stager = Stager::new(config)?;
            let registry = ToolRegistry::with_defaults();

            let (_, session) = stager.open(&url).await?;
            let context = ToolContext::new(&session, stager.config());
            let result = registry.execute(&name, params, &context).await;
            session.close().await;
            let result = result?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                bail!("{} failed: {}", name, result.error.unwrap_or_default());
            }
        }
    }

    Ok(())
}
