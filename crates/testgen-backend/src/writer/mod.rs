//! Rendering a [`TestSpec`] into the artifact format of one test framework.
//!
//! Writers only read the spec and return text. Storing the text is left to
//! the caller.

pub mod metadata;
pub mod protobuf;
pub mod protobuf_ir;
pub mod ptf;
pub mod stf;

use std::fmt::Write as _;

use testgen_ir::Constant;
use testgen_model::Value;

use crate::config::TestBackendConfiguration;
use crate::program_info::P4RuntimeApi;
use crate::registry::BackendKind;
use crate::spec::{Packet, TestSpec};

pub use metadata::MetadataWriter;
pub use protobuf::ProtobufWriter;
pub use protobuf_ir::ProtobufIrWriter;
pub use ptf::PtfWriter;
pub use stf::StfWriter;

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("{writer}: {entity} '{name}' is not part of the P4Runtime API")]
    UnknownEntity {
        writer: BackendKind,
        entity: &'static str,
        name: String,
    },
}

pub trait WriteTest {
    fn kind(&self) -> BackendKind;

    fn file_extension(&self) -> &'static str;

    /// Render `spec` as test number `test_id`.
    fn render(&self, spec: &TestSpec, test_id: u64) -> Result<String, WriterError>;
}

/// One writer per supported back end.
#[derive(Debug, Clone)]
pub enum TestWriter {
    Ptf(PtfWriter),
    Stf(StfWriter),
    Protobuf(ProtobufWriter),
    ProtobufIr(ProtobufIrWriter),
    Metadata(MetadataWriter),
}

impl TestWriter {
    pub fn build(kind: BackendKind, config: &TestBackendConfiguration, runtime_api: &P4RuntimeApi) -> Self {
        let config = config.clone();
        match kind {
            BackendKind::Ptf => TestWriter::Ptf(PtfWriter::new(config)),
            BackendKind::Stf => TestWriter::Stf(StfWriter::new(config)),
            BackendKind::Protobuf => TestWriter::Protobuf(ProtobufWriter::new(config, runtime_api.clone())),
            BackendKind::ProtobufIr => {
                TestWriter::ProtobufIr(ProtobufIrWriter::new(config, runtime_api.clone()))
            }
            BackendKind::Metadata => TestWriter::Metadata(MetadataWriter::new(config)),
        }
    }

    fn inner(&self) -> &dyn WriteTest {
        match self {
            TestWriter::Ptf(w) => w,
            TestWriter::Stf(w) => w,
            TestWriter::Protobuf(w) => w,
            TestWriter::ProtobufIr(w) => w,
            TestWriter::Metadata(w) => w,
        }
    }

    /// Name of test number `test_id`, e.g. `test_3`.
    pub fn test_name(&self, test_id: u64) -> String {
        let config = match self {
            TestWriter::Ptf(w) => &w.config,
            TestWriter::Stf(w) => &w.config,
            TestWriter::Protobuf(w) => &w.config,
            TestWriter::ProtobufIr(w) => &w.config,
            TestWriter::Metadata(w) => &w.config,
        };
        test_name(config, test_id)
    }
}

impl WriteTest for TestWriter {
    fn kind(&self) -> BackendKind {
        self.inner().kind()
    }

    fn file_extension(&self) -> &'static str {
        self.inner().file_extension()
    }

    fn render(&self, spec: &TestSpec, test_id: u64) -> Result<String, WriterError> {
        self.inner().render(spec, test_id)
    }
}

// ── Shared formatting ────────────────────────────────────────────────

pub(crate) fn test_name(config: &TestBackendConfiguration, test_id: u64) -> String {
    format!("{}_{}", config.test_base_name, test_id)
}

/// `0x`-prefixed hex, one digit per nibble of the value's width.
pub(crate) fn value_hex(value: &Value) -> String {
    format!("0x{}", value.clone().into_bits().to_hex())
}

pub(crate) fn constant_hex(c: &Constant) -> String {
    format!("0x{}", c.to_hex())
}

/// Payload nibbles in hex, `*` for any nibble holding a don't-care bit.
pub(crate) fn masked_hex(packet: &Packet) -> String {
    let width = packet.payload().width();
    if width == 0 {
        return String::new();
    }
    let hex = packet.payload().to_hex();
    let top = width.div_ceil(4) * 4;
    hex.chars()
        .zip(0u32..)
        .map(|(digit, i)| {
            let lo = top - 4 * (i + 1);
            let asserted = (lo..lo + 4)
                .filter(|bit| *bit < width)
                .all(|bit| packet.is_asserted(bit));
            if asserted {
                digit
            } else {
                '*'
            }
        })
        .collect()
}

/// Big-endian bytes of `c`, left-padded to the width in bytes.
pub(crate) fn constant_bytes(c: &Constant) -> Vec<u8> {
    let len = c.width().div_ceil(8) as usize;
    if c.is_zero() {
        return vec![0; len];
    }
    let raw = c.value().to_bytes_be();
    let mut bytes = vec![0; len.saturating_sub(raw.len())];
    bytes.extend(raw);
    bytes
}

/// Care bits of a packet as bytes aligned with [`constant_bytes`] of the payload.
pub(crate) fn mask_bytes(packet: &Packet) -> Vec<u8> {
    let width = packet.payload().width();
    let len = width.div_ceil(8) as usize;
    let mut bytes = vec![0u8; len];
    for bit in (0..width).filter(|bit| packet.is_asserted(*bit)) {
        bytes[len - 1 - (bit / 8) as usize] |= 1 << (bit % 8);
    }
    bytes
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Runs of don't-care bits as `(offset, length)`, offset 0 being the first
/// bit on the wire.
pub(crate) fn dont_care_runs(packet: &Packet) -> Vec<(u32, u32)> {
    let width = packet.payload().width();
    let mut runs = Vec::new();
    let mut start: Option<u32> = None;
    for offset in 0..width {
        let asserted = packet.is_asserted(width - 1 - offset);
        match (asserted, start) {
            (false, None) => start = Some(offset),
            (true, Some(s)) => {
                runs.push((s, offset - s));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, width - s));
    }
    runs
}

/// Minimal text-format protobuf emitter.
pub(crate) struct ProtoText {
    out: String,
    depth: usize,
}

impl ProtoText {
    pub(crate) fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    pub(crate) fn comment(&mut self, text: &str) {
        self.indent();
        self.out.push_str("# ");
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn open(&mut self, name: &str) {
        self.indent();
        self.out.push_str(name);
        self.out.push_str(" {\n");
        self.depth += 1;
    }

    pub(crate) fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("}\n");
    }

    pub(crate) fn scalar(&mut self, name: &str, value: impl std::fmt::Display) {
        self.indent();
        let _ = writeln!(self.out, "{name}: {value}");
    }

    pub(crate) fn string(&mut self, name: &str, value: &str) {
        self.indent();
        let _ = writeln!(self.out, "{name}: \"{}\"", escape_proto(value));
    }

    pub(crate) fn bytes(&mut self, name: &str, bytes: &[u8]) {
        self.indent();
        let mut escaped = String::with_capacity(bytes.len() * 4);
        for b in bytes {
            let _ = write!(escaped, "\\x{b:02x}");
        }
        let _ = writeln!(self.out, "{name}: \"{escaped}\"");
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

fn escape_proto(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
