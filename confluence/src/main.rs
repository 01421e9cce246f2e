#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use args::{Args, ChatArgs, Command};
use clap::Parser;
use confluence_config::Config;
use confluence_llm::{
    ChatOptions, HttpTransport, LlmResponse, Message, Provider, ProviderRegistry, ReqwestTransport, SideEvent,
    WebActivity, provider::ollama,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Missing file means defaults; a broken file is still an error
    let config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        Config::default()
    };

    confluence_telemetry::init(&config.telemetry, "warn")?;

    tracing::debug!(config_path = %args.config.display(), "starting confluence");

    let registry = build_registry(&config)?;

    match args.command {
        Command::Providers => list_providers(&registry).await,
        Command::Chat(chat) => {
            tokio::select! {
                result = run_chat(&registry, chat) => result,
                () = shutdown_signal() => anyhow::bail!("interrupted"),
            }
        }
    }
}

fn build_registry(config: &Config) -> anyhow::Result<ProviderRegistry> {
    if !config.providers.is_empty() {
        return ProviderRegistry::from_config(config).context("failed to build providers");
    }

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(ollama::DEFAULT_TIMEOUT)?);
    ProviderRegistry::with_defaults(transport).context("failed to build default providers")
}

async fn list_providers(registry: &ProviderRegistry) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();

    for provider in registry.iter() {
        let status = if provider.is_configured().await { "ready" } else { "not configured" };
        writeln!(
            stdout,
            "{:<12} {:<10} {:<48} {status}",
            provider.name(),
            provider.style().as_str(),
            provider.default_model()
        )?;
    }

    Ok(())
}

async fn select_provider(registry: &ProviderRegistry, name: Option<&str>) -> anyhow::Result<Arc<dyn Provider>> {
    match name {
        Some(name) => Ok(registry.require(name)?),
        None => registry
            .auto_detect()
            .await
            .context("no LLM provider configured; set --provider or an API key"),
    }
}

async fn run_chat(registry: &ProviderRegistry, args: ChatArgs) -> anyhow::Result<()> {
    let provider = select_provider(registry, args.provider.as_deref()).await?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));

    let options = ChatOptions {
        model: args.model,
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        ..ChatOptions::default()
    };

    tracing::debug!(provider = %provider.name(), stream = args.stream, "sending prompt");

    let response = if args.stream {
        let mut write_error = None;
        let mut on_chunk = |text: &str, event: Option<&SideEvent>| {
            if write_error.is_none() {
                write_error = print_chunk(&mut std::io::stdout(), text, event).err();
            }
        };
        let response = provider.chat_stream(&messages, &[], &options, &mut on_chunk).await;
        if let Some(err) = write_error {
            return Err(err).context("failed to write streamed output");
        }
        println!();
        response
    } else {
        let response = provider.chat(&messages, &[], &options).await;
        if !response.is_error() {
            println!("{}", response.content);
        }
        response
    };

    report(&response)
}

/// Content goes to `out` as it arrives; side events go to stderr
fn print_chunk(out: &mut impl Write, text: &str, event: Option<&SideEvent>) -> std::io::Result<()> {
    if !text.is_empty() {
        write!(out, "{text}")?;
        out.flush()?;
    }

    match event {
        Some(SideEvent::Reasoning { text, .. }) => eprint!("{text}"),
        Some(SideEvent::Activity(activity)) => match &activity.detail {
            WebActivity::Search { query } => eprintln!("\n[search] {query}"),
            WebActivity::Read { domain, .. } => eprintln!("\n[read] {domain}"),
        },
        Some(SideEvent::ToolCall(call)) => eprintln!("\n[tool] {}({})", call.name, call.arguments_json()),
        None => {}
    }
    Ok(())
}

fn report(response: &LlmResponse) -> anyhow::Result<()> {
    if let Some(message) = response.error_message() {
        anyhow::bail!("{message}");
    }

    let mut summary = format!("finish: {}", response.finish_reason.as_str());
    if let Some(model) = &response.model {
        summary.push_str(&format!(", model: {model}"));
    }
    if let Some(usage) = response.usage {
        summary.push_str(&format!(
            ", tokens: {} prompt + {} completion = {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        ));
    }
    eprintln!("{summary}");

    Ok(())
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::debug!("shutdown signal received");
}
