//! Loads one remote tool for a throwaway conversation and invokes it.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use remote_tools::config::LoaderConfig;
use remote_tools::primitives::{ConversationId, Env};
use remote_tools::telemetry::tracing_support::init_tracing;
use remote_tools::{Tool, ToolLoader, ToolRequest};
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Describe and run a packaged tool through the remote executor")]
struct Args {
    /// Package name, e.g. `@acme/search`.
    #[arg(long)]
    package: String,
    /// Exported tool inside the package.
    #[arg(long)]
    export: String,
    /// Package version to load.
    #[arg(long, default_value = "latest")]
    version: String,
    /// Explicit module URL; derived from the CDN when omitted.
    #[arg(long)]
    import_url: Option<String>,
    /// JSON parameters passed to the tool.
    #[arg(long, default_value = "{}")]
    params: String,
    /// `KEY=VALUE` pairs forwarded as the conversation environment.
    #[arg(long = "env", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,
}

fn parse_env_pair(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got `{raw}`"))?;
    Ok((key.to_owned(), value.to_owned()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let loader = ToolLoader::from_config(LoaderConfig::from_env()?)?;
    let conversation = ConversationId::random();

    let mut request = ToolRequest::new(&args.package, &args.export, &args.version)?;
    if let Some(url) = args.import_url {
        request = request.with_import_url(url);
    }
    let params: serde_json::Value =
        serde_json::from_str(&args.params).context("--params must be valid JSON")?;
    let env: Env = args.env.into_iter().collect();

    let tools = loader
        .load_batch(std::slice::from_ref(&request), &conversation, Some(env))
        .await;
    let tool = tools
        .get(&request.key())
        .ok_or_else(|| anyhow!("{} failed to load", request.key()))?;

    let definition = tool.definition();
    info!(name = definition.name(), "{}", definition.description());
    info!("parameters: {}", definition.input_schema());

    let output = tool.invoke(params).await?;
    info!("output: {output}");

    loader.end_conversation(&conversation);
    Ok(())
}
