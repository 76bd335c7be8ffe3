//! The bmv2 test back end: adapter and synthesizer behind one selected writer.

use rayon::prelude::*;
use testgen_ir::Expr;
use testgen_model::{ExecutionState, Model, ModelEvalError, TraceEvent};
use tracing::{debug, info, warn};

use crate::config::{TestBackendConfiguration, TestgenConfig};
use crate::info::{produce_base_test_info, TestInfo};
use crate::path::FinishedPath;
use crate::program_info::Bmv2ProgramInfo;
use crate::registry::{select_writer, BackendKind, SelectError};
use crate::spec::TestSpec;
use crate::synthesize::{self, SynthesisError};
use crate::writer::{TestWriter, WriteTest};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Test info extraction failed: {0}")]
    TestInfo(#[from] ModelEvalError),

    #[error("Test spec synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

/// Target hooks between a finished path and its test spec.
pub trait TestBackend {
    /// Concrete packet facts of a path. Targets may refine the base extraction.
    fn produce_test_info(
        &self,
        state: &ExecutionState,
        model: &Model,
        output_packet: &Expr,
        output_port: &Expr,
        program_traces: &[TraceEvent],
    ) -> Result<TestInfo, ModelEvalError> {
        produce_base_test_info(state, model, output_packet, output_port, program_traces)
    }

    fn create_test_spec(
        &self,
        state: &ExecutionState,
        model: &Model,
        info: &TestInfo,
    ) -> Result<TestSpec, SynthesisError>;
}

#[derive(Debug, Clone)]
pub struct Bmv2TestBackend {
    program_info: Bmv2ProgramInfo,
    config: TestBackendConfiguration,
    writer: TestWriter,
}

impl Bmv2TestBackend {
    /// Select the configured writer. Fails before anything else is built.
    pub fn new(program_info: Bmv2ProgramInfo, config: &TestgenConfig) -> Result<Self, SelectError> {
        let writer = select_writer(config.test_backend.as_deref(), &config.backend, &program_info)?;
        Ok(Self {
            program_info,
            config: config.backend.clone(),
            writer,
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.writer.kind()
    }

    pub fn writer(&self) -> &TestWriter {
        &self.writer
    }

    /// Adapter then synthesizer for one path.
    pub fn run_path(&self, path: &FinishedPath) -> Result<TestSpec, BackendError> {
        let info = self.produce_test_info(
            &path.state,
            &path.model,
            &path.output_packet,
            &path.output_port,
            path.state.trace_events(),
        )?;
        Ok(self.create_test_spec(&path.state, &path.model, &info)?)
    }

    /// Synthesize paths in parallel, one batch per pool width. Results keep
    /// the input order.
    ///
    /// With a non-zero `max_tests`, synthesis stops once that many specs were
    /// produced. Failed paths are reported but do not count against it.
    pub fn synthesize_paths(&self, paths: &[FinishedPath]) -> Vec<Result<TestSpec, BackendError>> {
        let budget = match self.config.max_tests {
            0 => usize::MAX,
            max => usize::try_from(max).unwrap_or(usize::MAX),
        };
        info!(paths = paths.len(), backend = %self.kind(), "Synthesizing test specs");

        let batch = rayon::current_num_threads().max(1);
        let mut results = Vec::with_capacity(paths.len().min(budget));
        let mut produced = 0usize;
        for (offset, chunk) in paths.chunks(batch).enumerate() {
            let synthesized: Vec<_> = chunk
                .par_iter()
                .enumerate()
                .map(|(index, path)| {
                    let result = self.run_path(path);
                    if let Err(e) = &result {
                        debug!(path = offset * batch + index, error = %e, "Path produced no test");
                    }
                    result
                })
                .collect();
            for result in synthesized {
                if produced == budget {
                    break;
                }
                produced += usize::from(result.is_ok());
                results.push(result);
            }
            if produced == budget {
                break;
            }
        }

        if results.len() < paths.len() {
            warn!(
                skipped = paths.len() - results.len(),
                max_tests = self.config.max_tests,
                "Test budget reached, skipping remaining paths"
            );
        }
        results
    }
}

impl TestBackend for Bmv2TestBackend {
    fn produce_test_info(
        &self,
        state: &ExecutionState,
        model: &Model,
        output_packet: &Expr,
        output_port: &Expr,
        program_traces: &[TraceEvent],
    ) -> Result<TestInfo, ModelEvalError> {
        // bmv2 needs nothing beyond the base facts.
        produce_base_test_info(state, model, output_packet, output_port, program_traces)
    }

    fn create_test_spec(
        &self,
        state: &ExecutionState,
        model: &Model,
        info: &TestInfo,
    ) -> Result<TestSpec, SynthesisError> {
        synthesize::create_test_spec(state, model, info, self.kind(), &self.program_info)
    }
}
