//! Port traits.
//!
//! These traits define the interfaces between the trigger engine and the
//! collaborators around it: the configuration store it reads, the execution
//! service it starts pipelines on, and the listeners events are fanned out to.

use crate::context::RequestContext;
use crate::event::Event;
use crate::pipeline::Pipeline;
use crate::Result;
use async_trait::async_trait;

/// Source of pipeline configuration.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Fetch every pipeline. Unknown attributes must be preserved.
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>>;
}

/// Starts pipeline executions.
#[async_trait]
pub trait PipelineInitiator: Send + Sync {
    /// Start an execution of a matched pipeline on behalf of `ctx`.
    async fn start(&self, pipeline: &Pipeline, ctx: &RequestContext) -> Result<()>;

    /// Report that `pipeline` could not be started.
    async fn record_failure(&self, pipeline: &Pipeline) -> Result<()>;
}

/// Receives every dispatched event.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Name used in logs and metric tags.
    fn name(&self) -> &str;

    async fn process_event(&self, event: &Event, ctx: &RequestContext) -> Result<()>;
}
