#![forbid(unsafe_code)]

mod cmd;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "dmrsp: DMRS preprocessing toolchain",
    long_about = None,
    after_help = "QUICK REFERENCE:\n    dmrsp preprocess -t -l -r in.dmrs in.untok in.tok out.dmrs\n    dmrsp preprocess -t -u -c --filter-gpred filters.txt in.dmrs in.untok in.tok -\n    dmrsp vocab labeled.dmrs vocab.txt\n    dmrsp wmap vocab.txt wmap.txt\n    dmrsp map labeled.dmrs wmap.txt out.dmrs\n    dmrsp completions bash"
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run the preprocessing pipeline over a DMRS stream",
        long_about = "Run the preprocessing pipeline: each stage is toggled by a flag; line i of the untok and tok files corresponds to DMRS i.",
        after_help = "EXAMPLES:\n    # Align, label, and handle LTOP links\n    dmrsp preprocess -t -l -r in.dmrs in.untok in.tok out.dmrs\n\n    # Full pipeline with gpred filtering and cycle removal\n    dmrsp preprocess -t -u -l -r -c --filter-gpred filters.txt in.dmrs in.untok in.tok out.dmrs\n\n    # Report cycle-remover counters\n    dmrsp preprocess -c --debug-counters in.dmrs in.untok in.tok -"
    )]
    Preprocess(cmd::preprocess::PreprocessArgs),

    #[command(
        about = "Extract a label vocabulary from a DMRS stream",
        after_help = "EXAMPLES:\n    # Node and link label frequencies\n    dmrsp vocab labeled.dmrs vocab.txt\n\n    # Constant-argument (carg) frequencies\n    dmrsp vocab --carg labeled.dmrs cargs.txt"
    )]
    Vocab(cmd::vocab::VocabArgs),

    #[command(
        about = "Build a word-map from vocabulary files",
        after_help = "EXAMPLES:\n    # Fresh map, most frequent values first\n    dmrsp wmap vocab.txt wmap.txt\n\n    # Extend an existing map\n    dmrsp wmap vocab.txt wmap.txt --existing old-wmap.txt"
    )]
    Wmap(cmd::wmap::WmapArgs),

    #[command(
        about = "Annotate label_idx attributes from a word-map",
        after_help = "EXAMPLES:\n    dmrsp map labeled.dmrs wmap.txt out.dmrs"
    )]
    Map(cmd::map_labels::MapArgs),

    #[command(about = "Generate shell completions")]
    Completions(cmd::completions::CompletionsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Preprocess(args) => cmd::preprocess::run(args),
        Commands::Vocab(args) => cmd::vocab::run(args),
        Commands::Wmap(args) => cmd::wmap::run(args),
        Commands::Map(args) => cmd::map_labels::run(args),
        Commands::Completions(args) => {
            cmd::completions::run_completions(args.shell, &mut Cli::command())
        }
    }
}
