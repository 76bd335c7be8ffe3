//! Turning a finished path into a concrete [`TestSpec`].

use testgen_ir::state_ref::SEPARATOR;
use testgen_ir::Constant;
use testgen_model::object::{MetadataCollection, METADATA_COLLECTION};
use testgen_model::{
    Completion, Evaluate, ExecutionState, Model, ModelEvalError, StateError, TestObject, TestObjectCategory,
};
use tracing::debug;

use crate::info::TestInfo;
use crate::program_info::{Bmv2ProgramInfo, LOCAL_METADATA_PARAM_INDEX, PARSER_BLOCK};
use crate::registry::BackendKind;
use crate::spec::{Packet, TestSpec};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("Model evaluation failed: {0}")]
    Eval(#[from] ModelEvalError),

    #[error("State lookup failed: {0}")]
    State(#[from] StateError),

    #[error("Block '{block}' has no parameter at index {index}")]
    MissingBlockParam { block: String, index: usize },
}

/// Name under which a metadata field is reported: everything up to and
/// including the first separator is dropped.
pub fn metadata_display_name(field: &str) -> &str {
    match field.find(SEPARATOR) {
        Some(pos) => &field[pos + SEPARATOR.len_utf8()..],
        None => field,
    }
}

/// Build the test spec for one path.
///
/// Errors abort the whole spec; nothing partially populated escapes.
pub fn create_test_spec(
    state: &ExecutionState,
    model: &Model,
    info: &TestInfo,
    backend: BackendKind,
    program_info: &Bmv2ProgramInfo,
) -> Result<TestSpec, SynthesisError> {
    let ingress = Packet::new(
        info.input_port.clone(),
        info.input_packet.clone(),
        Constant::from_u64(1, 1),
    );
    let egress = (!info.packet_is_dropped).then(|| {
        Packet::new(
            info.output_port.clone(),
            info.output_packet.clone(),
            info.packet_taint_mask.clone(),
        )
    });
    let mut spec = TestSpec::new(ingress, egress, info.program_traces.clone());

    match backend {
        BackendKind::Metadata => {
            let collection = collect_metadata(state, model, program_info)?;
            spec.add_test_object(
                METADATA_COLLECTION,
                METADATA_COLLECTION,
                TestObject::MetadataCollection(collection),
            );
        }
        BackendKind::Ptf | BackendKind::Stf | BackendKind::Protobuf | BackendKind::ProtobufIr => {
            for category in TestObjectCategory::ALL {
                evaluate_category(state, model, category, &mut spec)?;
            }
        }
    }
    Ok(spec)
}

/// Evaluate every scalar field of the parser's local metadata.
pub fn collect_metadata(
    state: &ExecutionState,
    model: &Model,
    program_info: &Bmv2ProgramInfo,
) -> Result<MetadataCollection, SynthesisError> {
    let local_metadata = program_info
        .local_metadata()
        .ok_or_else(|| SynthesisError::MissingBlockParam {
            block: PARSER_BLOCK.to_string(),
            index: LOCAL_METADATA_PARAM_INDEX,
        })?;

    let mut collection = MetadataCollection::new();
    for field in state.flat_fields(local_metadata) {
        let value = model.evaluate(state.get(&field)?, Completion::Complete)?;
        let canonical = field.to_string();
        let name = metadata_display_name(&canonical);
        debug!(field = %canonical, %value, "Collected metadata field");
        collection.add_field(name, value);
    }
    Ok(collection)
}

/// Evaluate all objects of one category into `spec`. Returns how many were added.
pub fn evaluate_category(
    state: &ExecutionState,
    model: &Model,
    category: TestObjectCategory,
    spec: &mut TestSpec,
) -> Result<usize, SynthesisError> {
    let objects = state.test_object_category(category);
    for (name, object) in objects {
        let concrete = object.evaluate(model, Completion::Complete)?;
        spec.add_test_object(category.spec_key(), name, concrete);
    }
    debug!(%category, count = objects.len(), "Evaluated test objects");
    Ok(objects.len())
}
