//! The closed set of test writers this target ships, and the selector that
//! turns a configured identifier into one of them.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::config::TestBackendConfiguration;
use crate::program_info::Bmv2ProgramInfo;
use crate::writer::TestWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    Ptf,
    Stf,
    Protobuf,
    ProtobufIr,
    Metadata,
}

impl BackendKind {
    /// Every supported writer, in the order error messages list them.
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Ptf,
        BackendKind::Stf,
        BackendKind::Protobuf,
        BackendKind::ProtobufIr,
        BackendKind::Metadata,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Ptf => "PTF",
            BackendKind::Stf => "STF",
            BackendKind::Protobuf => "PROTOBUF",
            BackendKind::ProtobufIr => "PROTOBUF_IR",
            BackendKind::Metadata => "METADATA",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_identifier(identifier: &str) -> Option<BackendKind> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == identifier)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve_backend(Some(s))
    }
}

/// Comma-separated list of the supported identifiers.
pub fn supported_backends() -> String {
    BackendKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error(
        "No test back end provided. Please provide a test back end using the --test-backend parameter. Supported back ends are {supported}."
    )]
    NotConfigured { supported: String },

    #[error("Test back end {name} not implemented for this target. Supported back ends are {supported}.")]
    Unimplemented { name: String, supported: String },
}

/// Map a configured identifier to a writer kind. Unset and empty are the same.
pub fn resolve_backend(identifier: Option<&str>) -> Result<BackendKind, SelectError> {
    let name = match identifier {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(SelectError::NotConfigured {
                supported: supported_backends(),
            })
        }
    };
    BackendKind::from_identifier(name).ok_or_else(|| SelectError::Unimplemented {
        name: name.to_string(),
        supported: supported_backends(),
    })
}

/// Resolve `identifier` and construct the matching writer.
///
/// Only the protobuf writers see the runtime API; everything else is built
/// from the shared configuration alone.
pub fn select_writer(
    identifier: Option<&str>,
    config: &TestBackendConfiguration,
    program_info: &Bmv2ProgramInfo,
) -> Result<TestWriter, SelectError> {
    let kind = resolve_backend(identifier)?;
    info!(backend = %kind, "Selected test back end");
    Ok(TestWriter::build(kind, config, program_info.runtime_api()))
}
