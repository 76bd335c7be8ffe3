use testgen_ir::{Constant, Expr};
use testgen_model::taint::care_mask;
use testgen_model::{Completion, ExecutionState, Model, ModelEvalError, TraceEvent};

/// Concrete facts about one finished path.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInfo {
    pub input_packet: Constant,
    pub input_port: Constant,
    pub output_packet: Constant,
    pub output_port: Constant,
    /// Care mask over `output_packet`; `0` bits are don't-care.
    pub packet_taint_mask: Constant,
    pub packet_is_dropped: bool,
    /// Path traces with every carried expression evaluated.
    pub program_traces: Vec<TraceEvent>,
}

/// Evaluate the packet-level facts of a path under `model`.
///
/// Packet and port values use full completion, so bits the model leaves
/// open become zero. Tainted output bits are zero in the mask.
pub fn produce_base_test_info(
    state: &ExecutionState,
    model: &Model,
    output_packet: &Expr,
    output_port: &Expr,
    program_traces: &[TraceEvent],
) -> Result<TestInfo, ModelEvalError> {
    let input_packet = model.evaluate_bits(state.input_packet(), Completion::Complete)?;
    let input_port = model.evaluate_bits(state.input_port(), Completion::Complete)?;
    let output_packet_value = model.evaluate_bits(output_packet, Completion::Complete)?;
    let output_port = model.evaluate_bits(output_port, Completion::Complete)?;
    let program_traces = program_traces
        .iter()
        .map(|event| event.evaluate(model))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TestInfo {
        input_packet,
        input_port,
        output_packet: output_packet_value,
        output_port,
        packet_taint_mask: care_mask(output_packet),
        packet_is_dropped: state.is_dropped(),
        program_traces,
    })
}
