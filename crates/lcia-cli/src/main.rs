mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use commands::{QueryArgs, Sources};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lcia",
    version,
    about = "Characterization factor lookup and life cycle impact scoring"
)]
struct Cli {
    /// Dataset JSON file(s) loaded on top of the built-in base data
    #[arg(short, long = "dataset", value_name = "FILE", global = true)]
    datasets: Vec<PathBuf>,

    /// Predefined dataset(s): base, gwp100 (default: all presets if no --dataset/--preset given)
    #[arg(short, long = "preset", value_name = "NAME", global = true)]
    presets: Vec<String>,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List canonical quantities and LCIA indicators
    Quantities {
        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Print the compartment hierarchy
    Contexts {
        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Best conversion of a flowable's reference quantity into a query quantity
    Relation {
        /// Flowable name, CAS number or flow link
        flowable: String,

        /// Query quantity (e.g. "volume", "gwp100")
        #[arg(short, long)]
        query: String,

        /// Reference quantity (required unless the flow link is known)
        #[arg(short, long = "ref")]
        ref_quantity: Option<String>,

        /// Compartment (e.g. "to air", "emissions/to water")
        #[arg(long)]
        context: Option<String>,

        #[command(flatten)]
        query_args: QueryArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Every conversion found, sorted into valid, proxy and mismatched
    Conversions {
        /// Flowable name, CAS number or flow link
        flowable: String,

        /// Query quantity
        #[arg(short, long)]
        query: String,

        /// Reference quantity
        #[arg(short, long = "ref")]
        ref_quantity: Option<String>,

        /// Compartment
        #[arg(long)]
        context: Option<String>,

        #[command(flatten)]
        query_args: QueryArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// All factors known for a flowable, carried to its reference quantity
    Profile {
        /// Flowable name, CAS number or flow link
        flowable: String,

        /// Reference quantity
        #[arg(short, long = "ref")]
        ref_quantity: Option<String>,

        /// Compartment
        #[arg(long)]
        context: Option<String>,

        #[command(flatten)]
        query_args: QueryArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Score an inventory (JSON array of exchanges) against an indicator
    Lcia {
        /// Path to the inventory JSON file
        inventory: PathBuf,

        /// LCIA indicator to score against
        #[arg(short, long)]
        quantity: String,

        /// Group scores by owning process or by flow
        #[arg(short, long, default_value = "process", value_parser = ["process", "flow"])]
        group: String,

        /// Multiply every score by this factor
        #[arg(long)]
        scale: Option<f64>,

        /// Label recorded on the result
        #[arg(long)]
        scenario: Option<String>,

        #[command(flatten)]
        query_args: QueryArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Show every scored exchange and the skipped ones
        #[arg(long)]
        details: bool,
    },
    /// Inspect and validate datasets
    Dataset {
        #[command(subcommand)]
        action: DatasetAction,
    },
}

#[derive(Subcommand)]
enum DatasetAction {
    /// List predefined datasets
    List,
    /// Validate a dataset file and report records that would be skipped
    Validate {
        /// Path to the dataset JSON file
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let sources = Sources {
        datasets: cli.datasets,
        presets: cli.presets,
        config: cli.config,
    };

    let result = match cli.command {
        Commands::Quantities { output } => commands::quantities::run(&sources, &output),
        Commands::Contexts { output } => commands::contexts::run(&sources, &output),
        Commands::Relation {
            flowable,
            query,
            ref_quantity,
            context,
            query_args,
            output,
        } => commands::relation::relation(
            &sources,
            &flowable,
            ref_quantity.as_deref(),
            &query,
            context.as_deref(),
            &query_args,
            &output,
        ),
        Commands::Conversions {
            flowable,
            query,
            ref_quantity,
            context,
            query_args,
            output,
        } => commands::relation::conversions(
            &sources,
            &flowable,
            ref_quantity.as_deref(),
            &query,
            context.as_deref(),
            &query_args,
            &output,
        ),
        Commands::Profile {
            flowable,
            ref_quantity,
            context,
            query_args,
            output,
        } => commands::relation::profile(
            &sources,
            &flowable,
            ref_quantity.as_deref(),
            context.as_deref(),
            &query_args,
            &output,
        ),
        Commands::Lcia {
            inventory,
            quantity,
            group,
            scale,
            scenario,
            query_args,
            output,
            details,
        } => commands::lcia::run(
            &sources,
            inventory,
            &quantity,
            &group,
            scale,
            scenario.as_deref(),
            &query_args,
            &output,
            details,
        ),
        Commands::Dataset { action } => match action {
            DatasetAction::List => commands::dataset::list(),
            DatasetAction::Validate { file } => commands::dataset::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
