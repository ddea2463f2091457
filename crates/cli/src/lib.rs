mod inspect;
mod package;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "jarforge",
    version,
    about = "Assembles runnable Java distributions from a resolved application",
    long_about = "Jarforge takes a resolved dependency set, the compiled application and the \
                  build's generated and transformed classes, and lays them out as a fast-jar, \
                  mutable jar, thin jar, uber jar or native image source jar."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package an application described by a build plan
    #[command(
        long_about = "Reads a build plan (JSON, or MessagePack with a .msgpack extension) holding the \
                            packaging inputs and, optionally, the configuration, then writes the \
                            selected distribution format."
    )]
    Package {
        /// Build plan file
        #[arg(long, value_name = "PLAN")]
        plan: PathBuf,

        /// Configuration file overriding the one embedded in the plan
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Produce the native image source jar instead of the configured format
        #[arg(long)]
        native_source: bool,

        /// Write the provenance record of the produced files as JSON
        #[arg(long, value_name = "FILE")]
        sbom: Option<PathBuf>,
    },
    /// Print a serialized descriptor or mutable-jar blob as JSON
    #[command(
        long_about = "Understands quarkus-application.dat (also when embedded in a thin jar), \
                            appmodel.dat and deployment-class-path.dat."
    )]
    Inspect {
        /// File to decode
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Package { .. } => "package",
        Commands::Inspect { .. } => "inspect",
    };
    let _guard = jarforge_core::logging::init_logging(component, true);

    match cli.command {
        Commands::Package {
            plan,
            config,
            native_source,
            sbom,
        } => package::run(&plan, config.as_deref(), native_source, sbom.as_deref()),
        Commands::Inspect { path } => inspect::run(&path),
    }
}
