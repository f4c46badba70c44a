//! ResourceFlow Core
//!
//! Resumable lifecycle orchestration for cloud resources whose create,
//! update and delete operations complete asynchronously on the remote side.
//!
//! Every invocation runs the next unfinished stages of one lifecycle
//! operation and returns one of three results: the resource is done, the
//! operation failed, or the caller should invoke again after a delay with
//! the returned [`Context`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           caller / external scheduler            │
//! │     invoke(operation, desired, context?)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                resourceflow-core                 │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Lifecycle Orchestrator           │   │
//! │  │  Guard/PreCheck → Submit → Stabilize      │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │    Poller    │  │  Classifier  │            │
//! │  └──────────────┘  └──────────────┘            │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │    Operation Step (one remote call)       │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  Translator   │ │ ServiceClient │
//! │ (per resource)│ │ (per provider)│
//! └───────────────┘ └───────────────┘
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod port;
pub mod result;
pub mod status;
pub mod step;
pub mod translate;

// Re-exports
pub use classify::{ClassifiedError, Disposition, ErrorClassifier, ErrorKind};
pub use config::{EngineConfig, RetryConfig};
pub use context::{Context, CreateContext, DeleteContext, Progress, Stage, UpdateContext};
pub use error::{CoreError, Result};
pub use orchestrator::Orchestrator;
pub use poller::{AbsentPolicy, PollState, StabilizationPoller, StabilizationRules};
pub use port::{ServiceClient, ServiceError};
pub use result::{Invocation, OperationResult, OperationType, Resolved};
pub use status::{ObservedResource, ResourceStatus};
pub use step::OperationStep;
pub use translate::{Observation, Page, Translator};
