use serde::{Deserialize, Serialize};
use testgen_ir::Expr;
use testgen_model::{ExecutionState, Model};

use crate::program_info::Bmv2ProgramInfo;

/// A path handed over by exploration together with the solver's model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedPath {
    pub state: ExecutionState,
    pub model: Model,
    pub output_packet: Expr,
    pub output_port: Expr,
}

/// Program facts plus every finished path of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathBundle {
    pub program: Bmv2ProgramInfo,
    #[serde(default)]
    pub paths: Vec<FinishedPath>,
}

impl PathBundle {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
