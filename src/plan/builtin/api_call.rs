//! API-call executor.
//!
//! The defining asynchronous case: the outbound call runs on a spawned
//! task and the plan is resumed from that task once the response (or the
//! failure) is in. The interpreter never waits on the wire.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

use crate::error::PlanError;
use crate::plan::executor::{ActionError, ActionExecutor, ActionOutcome};
use crate::plan::interpreter::PlanInterpreter;
use crate::plan::model::{tags, Action, ActionKind};
use crate::template::TemplateProcessor;

/// A rendered outbound request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub endpoint: String,
    pub payload: Option<String>,
}

/// Outbound-call seam. REST proxy generation and auth decoration live in
/// external collaborators; this trait is what the executor needs.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Perform the call and return the response body. The client owns its
    /// own deadline — the interpreter enforces none.
    async fn call(&self, request: ApiRequest) -> Result<String, ActionError>;
}

/// HTTP client: POST when a payload is present, GET otherwise, optional
/// bearer token, per-call timeout.
pub struct HttpApiClient {
    client: reqwest::Client,
    timeout: Duration,
    bearer: Option<SecretString>,
}

impl HttpApiClient {
    pub fn new(timeout: Duration, bearer: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
            bearer,
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call(&self, request: ApiRequest) -> Result<String, ActionError> {
        let mut builder = match &request.payload {
            Some(payload) => self
                .client
                .post(&request.endpoint)
                .header("content-type", "application/json")
                .body(payload.clone()),
            None => self.client.get(&request.endpoint),
        };
        builder = builder.timeout(self.timeout);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ActionError::Call(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ActionError::Call(e.to_string()))?;
        if !status.is_success() {
            return Err(ActionError::Call(format!(
                "endpoint {} returned {status}",
                request.endpoint
            )));
        }
        Ok(body)
    }
}

/// Renders the endpoint and payload, detaches the call, and resumes the
/// plan from the calling task. The response body becomes the action's
/// result.
pub struct ApiCallExecutor {
    client: Arc<dyn ApiClient>,
    templates: Arc<dyn TemplateProcessor>,
}

impl ApiCallExecutor {
    pub fn new(client: Arc<dyn ApiClient>, templates: Arc<dyn TemplateProcessor>) -> Self {
        Self { client, templates }
    }
}

#[async_trait]
impl ActionExecutor for ApiCallExecutor {
    async fn execute(
        &self,
        interpreter: Arc<PlanInterpreter>,
        action: &Action,
    ) -> Result<ActionOutcome, ActionError> {
        let ActionKind::ApiCall { endpoint, payload } = &action.kind else {
            return Err(ActionError::WrongVariant {
                expected: tags::API_CALL,
            });
        };

        let snapshot = interpreter.context_snapshot().await;
        let request = ApiRequest {
            endpoint: self.templates.render(endpoint, &snapshot)?,
            payload: payload
                .as_ref()
                .map(|p| self.templates.render(p, &snapshot))
                .transpose()?,
        };

        let client = Arc::clone(&self.client);
        let name = action.name.clone();
        tokio::spawn(async move {
            debug!(action = %name, endpoint = %request.endpoint, "outbound call started");
            match client.call(request).await {
                Ok(body) => {
                    if let Err(err) = interpreter.advance(Some(body)).await {
                        error!(action = %name, error = %err, "plan failed after outbound call");
                    }
                }
                Err(err) => {
                    interpreter
                        .fail(PlanError::Action {
                            name: name.clone(),
                            tag: tags::API_CALL.to_string(),
                            reason: err.to_string(),
                        })
                        .await;
                }
            }
        });
        Ok(ActionOutcome::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::condition::ConditionEvaluator;
    use crate::plan::interpreter::CompletionCallback;
    use crate::plan::model::{ActionPlan, Step};
    use crate::plan::registry::ExecutorRegistry;
    use crate::template::{ContextMap, SimpleTemplateProcessor};
    use crate::error::PlanError;
    use tokio::sync::oneshot;

    struct CannedClient {
        response: Result<String, String>,
    }

    #[async_trait]
    impl ApiClient for CannedClient {
        async fn call(&self, request: ApiRequest) -> Result<String, ActionError> {
            assert_eq!(request.endpoint, "https://api.example/tickets/4521");
            self.response
                .clone()
                .map_err(ActionError::Call)
        }
    }

    async fn run_single_call_plan(
        client: Arc<dyn ApiClient>,
    ) -> oneshot::Receiver<Result<ContextMap, PlanError>> {
        let templates: Arc<dyn TemplateProcessor> = Arc::new(SimpleTemplateProcessor::new());
        let registry = ExecutorRegistry::new();
        registry
            .register(
                tags::API_CALL,
                Arc::new(ApiCallExecutor::new(client, Arc::clone(&templates))),
            )
            .await;

        let plan = ActionPlan {
            name: "call-plan".into(),
            steps: vec![Step {
                condition: None,
                actions: vec![Action {
                    name: "lookup".into(),
                    label: None,
                    kind: ActionKind::ApiCall {
                        endpoint: "https://api.example/tickets/${ticketId}".into(),
                        payload: None,
                    },
                }],
            }],
            final_action: None,
            initial_context: ContextMap::new(),
        };

        let mut initial = ContextMap::new();
        initial.insert("ticketId".into(), "4521".into());

        let (tx, rx) = oneshot::channel();
        let callback: CompletionCallback = Box::new(move |result| {
            let _ = tx.send(result);
        });
        let interpreter = PlanInterpreter::new(
            plan,
            initial,
            Arc::new(registry),
            ConditionEvaluator::new(templates),
            Some(callback),
        );
        Arc::clone(&interpreter).advance(None).await.unwrap();
        rx
    }

    #[tokio::test]
    async fn response_body_becomes_the_action_result() {
        let rx = run_single_call_plan(Arc::new(CannedClient {
            response: Ok(r#"{"state":"open"}"#.into()),
        }))
        .await;
        let values = rx.await.unwrap().unwrap();
        assert_eq!(values.get("lookup").unwrap(), r#"{"state":"open"}"#);
    }

    #[tokio::test]
    async fn failed_call_aborts_the_plan() {
        let rx = run_single_call_plan(Arc::new(CannedClient {
            response: Err("connection refused".into()),
        }))
        .await;
        let result = rx.await.unwrap();
        match result {
            Err(PlanError::Action { name, reason, .. }) => {
                assert_eq!(name, "lookup");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("expected aborted plan, got {other:?}"),
        }
    }
}
