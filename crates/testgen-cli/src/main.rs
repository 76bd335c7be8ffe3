use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::Context;
use clap::Parser;
use crossbeam::channel::{self, Receiver};
use testgen_backend::{
    resolve_backend, Bmv2TestBackend, PathBundle, SelectError, TestBackendConfiguration, TestSpec, TestWriter,
    TestgenConfig, WriteTest,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "testgen")]
#[command(about = "Materialize concrete bmv2 tests from finished symbolic paths")]
#[command(version)]
struct Cli {
    /// Test back end: PTF, STF, PROTOBUF, PROTOBUF_IR or METADATA.
    #[arg(long)]
    test_backend: Option<String>,

    /// JSON bundle holding the program info and the finished paths.
    #[arg(long)]
    paths: PathBuf,

    /// Write one file per test here instead of printing to stdout.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long, default_value = "test")]
    test_base_name: String,

    /// Maximum number of tests, 0 for no limit.
    #[arg(long, default_value_t = 0)]
    max_tests: u64,

    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn config(&self) -> TestgenConfig {
        TestgenConfig {
            test_backend: self.test_backend.clone(),
            backend: TestBackendConfiguration {
                test_base_name: self.test_base_name.clone(),
                max_tests: self.max_tests,
                output_dir: self.out_dir.clone(),
                seed: self.seed,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum DriverError {
    #[error(transparent)]
    Select(#[from] SelectError),

    #[error("Cannot read path bundle {path}: {source}")]
    ReadBundle {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid path bundle: {0}")]
    Bundle(#[from] serde_json::Error),

    #[error("{0:#}")]
    Output(anyhow::Error),

    #[error("Test writer thread panicked")]
    WriterPanicked,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(count) => {
            info!(tests = count, "Test generation finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<usize, DriverError> {
    let config = cli.config();
    // Reject a bad back end before touching any input.
    resolve_backend(config.test_backend.as_deref())?;

    let json = fs::read_to_string(&cli.paths).map_err(|source| DriverError::ReadBundle {
        path: cli.paths.clone(),
        source,
    })?;
    let bundle = PathBundle::from_json(&json)?;
    let backend = Bmv2TestBackend::new(bundle.program, &config)?;

    let (tx, rx) = channel::unbounded::<TestSpec>();
    let writer = backend.writer().clone();
    let out_dir = cli.out_dir.clone();
    let handle = thread::spawn(move || write_tests(&rx, &writer, out_dir.as_deref()));

    for (index, result) in backend.synthesize_paths(&bundle.paths).into_iter().enumerate() {
        match result {
            Ok(spec) => {
                if tx.send(spec).is_err() {
                    break;
                }
            }
            Err(e) => warn!(path = index, error = %e, "Skipping path"),
        }
    }
    drop(tx);

    handle
        .join()
        .map_err(|_| DriverError::WriterPanicked)?
        .map_err(DriverError::Output)
}

/// Owns the test counter. Renders specs in arrival order, numbering from 1.
fn write_tests(rx: &Receiver<TestSpec>, writer: &TestWriter, out_dir: Option<&Path>) -> anyhow::Result<usize> {
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    }
    let mut test_id = 0u64;
    for spec in rx {
        test_id += 1;
        let artifact = writer
            .render(&spec, test_id)
            .with_context(|| format!("Cannot render test {test_id}"))?;
        match out_dir {
            Some(dir) => {
                let file = dir.join(format!("{}.{}", writer.test_name(test_id), writer.file_extension()));
                fs::write(&file, artifact).with_context(|| format!("Cannot write {}", file.display()))?;
                info!(file = %file.display(), "Wrote test");
            }
            None => println!("{artifact}"),
        }
    }
    Ok(test_id as usize)
}
