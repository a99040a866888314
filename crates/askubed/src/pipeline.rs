//! Query pipeline - sequences synthesize, execute, format.
//!
//! One pipeline value exists per request and is discarded with it. Stages
//! run strictly in order; the first failure absorbs the pipeline into
//! `Failed(stage)` and nothing downstream runs. `Completed` and `Failed`
//! are terminal.

use std::fmt;

use askube_shared::{AskubeError, ExecutionErrorKind, ExecutionOutcome};
use tracing::{error, info};
use uuid::Uuid;

use crate::cluster::ClusterClient;
use crate::config::LlmConfig;
use crate::executor::CommandExecutor;
use crate::formatter::ResultFormatter;
use crate::llm::LanguageModel;
use crate::synthesizer::CommandSynthesizer;

/// The three external-call stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesize,
    Execute,
    Format,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Synthesize => "synthesize",
            Stage::Execute => "execute",
            Stage::Format => "format",
        };
        f.write_str(label)
    }
}

/// Pipeline lifecycle. No retries, no backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Synthesizing,
    Executing,
    Formatting,
    Completed,
    Failed(Stage),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed(_))
    }
}

/// Request-scoped pipeline over injected client handles.
pub struct QueryPipeline {
    synthesizer: CommandSynthesizer,
    formatter: ResultFormatter,
    state: PipelineState,
    request_id: Uuid,
}

impl QueryPipeline {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            synthesizer: CommandSynthesizer::new(config),
            formatter: ResultFormatter::new(config),
            state: PipelineState::Received,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the full pipeline for one query. Each stage consumes only the
    /// previous stage's successful output.
    pub async fn run(
        &mut self,
        llm: &dyn LanguageModel,
        cluster: &dyn ClusterClient,
        query: &str,
    ) -> Result<String, AskubeError> {
        info!("[{}] pipeline started: {}", self.request_id, query);

        self.state = PipelineState::Synthesizing;
        let descriptor = match self.synthesizer.synthesize(llm, query).await {
            Ok(descriptor) => descriptor,
            Err(e) => return Err(self.fail(Stage::Synthesize, e)),
        };
        info!("[{}] synthesized: {}", self.request_id, descriptor.op);

        self.state = PipelineState::Executing;
        let value = match CommandExecutor::execute(cluster, &descriptor).await {
            ExecutionOutcome::Value(value) => value,
            ExecutionOutcome::NoResult => {
                return Err(self.fail(
                    Stage::Execute,
                    AskubeError::execution(
                        ExecutionErrorKind::NoResult,
                        format!("operation \"{}\" produced no result", descriptor.op),
                    ),
                ));
            }
            ExecutionOutcome::Failure(kind, message) => {
                return Err(self.fail(Stage::Execute, AskubeError::execution(kind, message)));
            }
        };

        self.state = PipelineState::Formatting;
        let answer = match self.formatter.format(llm, query, &value).await {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail(Stage::Format, e)),
        };

        self.state = PipelineState::Completed;
        info!("[{}] pipeline completed", self.request_id);
        Ok(answer)
    }

    fn fail(&mut self, stage: Stage, err: AskubeError) -> AskubeError {
        error!("[{}] {} stage failed: {}", self.request_id, stage, err);
        self.state = PipelineState::Failed(stage);
        err
    }
}
