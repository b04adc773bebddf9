//! Built-in action executors.
//!
//! Five of these are registered by default (`ExecutorRegistry::with_builtins`);
//! the view-and-confirm executor ships ready to use but is registered by
//! the embedding application together with its form handling.

pub mod alert;
pub mod api_call;
pub mod attribute;
pub mod conditional;
pub mod confirm;
pub mod finalize;

pub use alert::{Alert, AlertSink, SendAlertExecutor, TracingAlertSink};
pub use api_call::{ApiCallExecutor, ApiClient, ApiRequest, HttpApiClient};
pub use attribute::SetAttributeExecutor;
pub use conditional::ConditionalExecutor;
pub use confirm::ViewAndConfirmExecutor;
pub use finalize::FinalizeExecutor;
