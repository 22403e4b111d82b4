mod output;


use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use neres::Error;
use neres::extract::extract_resources;
use neres::ne::NeResources;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;


/// Extracts icon and bitmap resources from NE (16-bit Windows) executables.
#[derive(Parser)]
struct Args {
    /// The executable from which to extract resources.
    pub input_file: PathBuf,

    /// The directory in which the output directory is created.
    #[arg(short, long, default_value = ".")]
    pub output_root: PathBuf,

    /// Only print the decoded headers and resource table as JSON.
    #[arg(short, long)]
    pub list: bool,
}


fn run(args: &Args) -> Result<(), Error> {
    if !args.input_file.exists() {
        return Err(Error::FileNotFound(args.input_file.clone()));
    }

    // closed on every return path when it goes out of scope
    let mut input_file = File::open(&args.input_file)
        .map_err(|error| Error::OpenFailure { path: args.input_file.clone(), error })?;

    let resources = NeResources::read(&mut input_file)?;
    let table = &resources.resource_table;
    info!(
        "{} resource types with {} resources (alignment shift count {})",
        table.type_blocks.len(), table.entry_count(), table.alignment_shift_count,
    );
    for (type_id, blocks) in table.by_type() {
        let count: usize = blocks.iter().map(|block| block.entries.len()).sum();
        debug!("type {}: {} resources", type_id, count);
    }

    if args.list {
        let json = serde_json::to_string_pretty(&resources)
            .map_err(io::Error::from)?;
        println!("{}", json);
        return Ok(());
    }

    let output_dir = output::create_output_dir(&args.output_root, &args.input_file)?;
    let written = extract_resources(&mut input_file, table, &output_dir)?;
    info!("extracted {} resources into {}", written.len(), output_dir.display());
    Ok(())
}


/// Reports the error, if any, and maps the outcome to the process exit code.
fn exit_code(result: &Result<(), Error>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(1)
        },
    }
}


fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    exit_code(&run(&args))
}
