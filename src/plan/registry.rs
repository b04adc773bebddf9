//! Executor registry for action dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::plan::builtin::{
    ApiCallExecutor, ApiClient, AlertSink, ConditionalExecutor, FinalizeExecutor,
    SendAlertExecutor, SetAttributeExecutor,
};
use crate::plan::condition::ConditionEvaluator;
use crate::plan::executor::ActionExecutor;
use crate::plan::model::tags;
use crate::template::TemplateProcessor;

/// Registry mapping action variant tags to their executors.
///
/// Lookup failure during interpretation is a fatal configuration error,
/// not a skip — the interpreter aborts the plan.
pub struct ExecutorRegistry {
    executors: RwLock<HashMap<String, Arc<dyn ActionExecutor>>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            executors: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the built-in executors registered:
    /// `api_call`, `send_alert`, `set_attribute`, `conditional` and
    /// `finalize_execution`.
    pub async fn with_builtins(
        templates: Arc<dyn TemplateProcessor>,
        client: Arc<dyn ApiClient>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let registry = Self::new();
        registry
            .register(
                tags::API_CALL,
                Arc::new(ApiCallExecutor::new(client, Arc::clone(&templates))),
            )
            .await;
        registry
            .register(
                tags::SEND_ALERT,
                Arc::new(SendAlertExecutor::new(sink, Arc::clone(&templates))),
            )
            .await;
        registry
            .register(
                tags::SET_ATTRIBUTE,
                Arc::new(SetAttributeExecutor::new(Arc::clone(&templates))),
            )
            .await;
        registry
            .register(
                tags::CONDITIONAL,
                Arc::new(ConditionalExecutor::new(ConditionEvaluator::new(templates))),
            )
            .await;
        registry
            .register(tags::FINALIZE_EXECUTION, Arc::new(FinalizeExecutor))
            .await;
        registry
    }

    /// Register an executor for a variant tag, replacing any previous one.
    pub async fn register(&self, tag: impl Into<String>, executor: Arc<dyn ActionExecutor>) {
        let tag = tag.into();
        debug!(tag = %tag, "registered action executor");
        self.executors.write().await.insert(tag, executor);
    }

    /// Get the executor for a variant tag.
    pub async fn get(&self, tag: &str) -> Option<Arc<dyn ActionExecutor>> {
        self.executors.read().await.get(tag).cloned()
    }

    /// Check whether a variant tag has an executor.
    pub async fn has(&self, tag: &str) -> bool {
        self.executors.read().await.contains_key(tag)
    }

    /// List all registered variant tags.
    pub async fn list(&self) -> Vec<String> {
        self.executors.read().await.keys().cloned().collect()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::builtin::{ApiRequest, TracingAlertSink};
    use crate::plan::executor::{ActionError, ActionOutcome};
    use crate::plan::interpreter::PlanInterpreter;
    use crate::plan::model::Action;
    use crate::template::SimpleTemplateProcessor;
    use async_trait::async_trait;

    struct NoopExecutor;

    #[async_trait]
    impl ActionExecutor for NoopExecutor {
        async fn execute(
            &self,
            _interpreter: Arc<PlanInterpreter>,
            _action: &Action,
        ) -> Result<ActionOutcome, ActionError> {
            Ok(ActionOutcome::Completed(None))
        }
    }

    struct NullClient;

    #[async_trait]
    impl ApiClient for NullClient {
        async fn call(&self, _request: ApiRequest) -> Result<String, ActionError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn register_and_get() {
        let registry = ExecutorRegistry::new();
        registry.register("custom_tag", Arc::new(NoopExecutor)).await;

        assert!(registry.has("custom_tag").await);
        assert!(registry.get("custom_tag").await.is_some());
        assert!(registry.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn builtins_cover_the_default_variants() {
        let registry = ExecutorRegistry::with_builtins(
            Arc::new(SimpleTemplateProcessor::new()),
            Arc::new(NullClient),
            Arc::new(TracingAlertSink),
        )
        .await;

        for tag in [
            tags::API_CALL,
            tags::SEND_ALERT,
            tags::SET_ATTRIBUTE,
            tags::CONDITIONAL,
            tags::FINALIZE_EXECUTION,
        ] {
            assert!(registry.has(tag).await, "missing builtin for {tag}");
        }
        // Form and confirm variants require explicit registration.
        assert!(!registry.has(tags::FILL_FORM).await);
        assert!(!registry.has(tags::VIEW_AND_CONFIRM).await);
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier() {
        let registry = ExecutorRegistry::new();
        registry.register("tag", Arc::new(NoopExecutor)).await;
        registry.register("tag", Arc::new(NoopExecutor)).await;
        assert_eq!(registry.list().await.len(), 1);
    }
}
