use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use anyhow::Context;
use secrecy::SecretString;
use uuid::Uuid;

use msgflow::config::EngineConfig;
use msgflow::error::PlanError;
use msgflow::message::InboundMessage;
use msgflow::patterns::PatternCache;
use msgflow::plan::builtin::{HttpApiClient, TracingAlertSink};
use msgflow::plan::registry::ExecutorRegistry;
use msgflow::rules::model::Rule;
use msgflow::rules::store::{ExactRoleMatcher, InMemoryRuleStore};
use msgflow::template::{ContextMap, SimpleTemplateProcessor, TemplateProcessor};
use msgflow::trigger::{ExecutionObserver, TriggerOutcome, TriggerService};

/// Forwards plan completions to the channel the main thread waits on.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<Result<ContextMap, PlanError>>,
}

impl ExecutionObserver for ChannelObserver {
    fn plan_completed(&self, _execution_id: Uuid, result: &Result<ContextMap, PlanError>) {
        let _ = self.tx.send(result.clone());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(rules_path), Some(message_path), Some(rule_id)) =
        (args.next(), args.next(), args.next())
    else {
        eprintln!("Usage: msgflow <rules.json> <message.json> <rule-id>");
        eprintln!("  MSGFLOW_API_TOKEN   bearer token for outbound calls (optional)");
        std::process::exit(1);
    };

    let rules: Vec<Rule> = serde_json::from_str(
        &std::fs::read_to_string(&rules_path)
            .with_context(|| format!("reading rules file {rules_path}"))?,
    )
    .context("parsing rules file")?;
    let message: InboundMessage = serde_json::from_str(
        &std::fs::read_to_string(&message_path)
            .with_context(|| format!("reading message file {message_path}"))?,
    )
    .context("parsing message file")?;

    let config = EngineConfig::default();
    let patterns = Arc::new(PatternCache::new());
    let templates: Arc<dyn TemplateProcessor> = Arc::new(SimpleTemplateProcessor::new());
    let bearer = std::env::var("MSGFLOW_API_TOKEN").ok().map(SecretString::from);
    let client = Arc::new(HttpApiClient::new(config.api_timeout, bearer));
    let registry = Arc::new(
        ExecutorRegistry::with_builtins(
            Arc::clone(&templates),
            client,
            Arc::new(TracingAlertSink),
        )
        .await,
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let trigger = TriggerService::new(
        Arc::new(InMemoryRuleStore::from_rules(rules)),
        Arc::new(ExactRoleMatcher),
        patterns,
        registry,
        templates,
        Arc::new(ChannelObserver { tx }),
    );

    match trigger.match_found(&rule_id, &message).await? {
        TriggerOutcome::Rejected { reason } => {
            eprintln!("Rule did not match: {reason}");
        }
        TriggerOutcome::NoPlan => {
            eprintln!("Rule matched but has no action plan.");
        }
        TriggerOutcome::Started { execution_id } => {
            eprintln!("Started execution {execution_id}");
            match tokio::time::timeout(Duration::from_secs(60), rx.recv()).await {
                Ok(Some(Ok(values))) => {
                    let mut entries: Vec<_> = values.iter().collect();
                    entries.sort();
                    for (key, value) in entries {
                        println!("{key} = {value}");
                    }
                }
                Ok(Some(Err(err))) => anyhow::bail!("plan failed: {err}"),
                Ok(None) | Err(_) => anyhow::bail!("plan did not complete within 60s"),
            }
        }
    }
    Ok(())
}
