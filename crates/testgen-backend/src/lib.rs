//! bmv2 test back end: picks a test writer, extracts concrete packet facts
//! from a finished path and materializes them into a [`TestSpec`].

pub mod backend;
pub mod config;
pub mod info;
pub mod path;
pub mod program_info;
pub mod registry;
pub mod spec;
pub mod synthesize;
pub mod writer;

pub use backend::{BackendError, Bmv2TestBackend, TestBackend};
pub use config::{TestBackendConfiguration, TestgenConfig};
pub use info::{produce_base_test_info, TestInfo};
pub use path::{FinishedPath, PathBundle};
pub use program_info::{Bmv2ProgramInfo, P4RuntimeApi, P4RuntimeEntity};
pub use registry::{resolve_backend, select_writer, supported_backends, BackendKind, SelectError};
pub use spec::{Packet, TestSpec};
pub use synthesize::{create_test_spec, metadata_display_name, SynthesisError};
pub use writer::{TestWriter, WriteTest, WriterError};
