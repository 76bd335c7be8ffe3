use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use testgen_ir::StateRef;

/// Block whose parameters hold the per-packet local metadata.
pub const PARSER_BLOCK: &str = "Parser";

/// `parser(packet_in, out headers, inout metadata, inout standard_metadata_t)`
pub const LOCAL_METADATA_PARAM_INDEX: usize = 2;

/// A named P4Runtime entity and its numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P4RuntimeEntity {
    pub name: String,
    pub id: u32,
    /// Ids of match fields (tables) or parameters (actions), in declaration order.
    #[serde(default)]
    pub members: Vec<P4RuntimeEntity>,
}

/// The control-plane API of the program, as derived by static analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct P4RuntimeApi {
    pub tables: Vec<P4RuntimeEntity>,
    pub actions: Vec<P4RuntimeEntity>,
    pub action_profiles: Vec<P4RuntimeEntity>,
}

impl P4RuntimeApi {
    pub fn table(&self, name: &str) -> Option<&P4RuntimeEntity> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&P4RuntimeEntity> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn action_profile(&self, name: &str) -> Option<&P4RuntimeEntity> {
        self.action_profiles.iter().find(|p| p.name == name)
    }
}

impl P4RuntimeEntity {
    pub fn member_id(&self, name: &str) -> Option<u32> {
        self.members.iter().find(|m| m.name == name).map(|m| m.id)
    }
}

/// Static facts about a bmv2 v1model program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bmv2ProgramInfo {
    /// Block name to its parameters, in declaration order.
    #[serde(default)]
    pub block_params: BTreeMap<String, Vec<StateRef>>,
    #[serde(default)]
    pub runtime_api: P4RuntimeApi,
}

impl Bmv2ProgramInfo {
    pub fn block_param(&self, block: &str, index: usize) -> Option<&StateRef> {
        self.block_params.get(block)?.get(index)
    }

    /// The parser's local metadata parameter.
    pub fn local_metadata(&self) -> Option<&StateRef> {
        self.block_param(PARSER_BLOCK, LOCAL_METADATA_PARAM_INDEX)
    }

    pub fn runtime_api(&self) -> &P4RuntimeApi {
        &self.runtime_api
    }
}
