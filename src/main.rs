use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tinn::commands;
use tinn::error::PackageError;

/// tinn - package manager for tinn projects
///
/// Packages are source repositories found through the GitHub search API and
/// cloned with git into ./tinn_modules (or $TINN_PATH/tinn_modules with
/// --global). Their own dependencies, declared in package.json, are installed
/// next to them.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This is useful for avoiding rate limits.
///
/// Examples:
///   tinn search web server     # Search the registry
///   tinn install tinn_web      # Install a package and save it to package.json
///   tinn install bar@^2.0.0    # Install the first tag compatible with ^2.0.0
///   tinn install               # Install every dependency of package.json
///   tinn remove tinn_web       # Remove a package and its orphaned dependencies
#[derive(Parser, Debug)]
#[command(author, version = env!("TINN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print diagnostic output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Registry API URL (defaults to https://api.github.com)
    #[arg(
        long = "api-url",
        value_name = "URL",
        env = "TINN_REGISTRY_URL",
        global = true
    )]
    api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Search packages in the registry
    Search(SearchArgs),

    /// Show the registry record of a package
    Info(InfoArgs),

    /// Install a package with its dependencies
    Install(InstallArgs),

    /// Remove an installed package
    #[command(alias = "uninstall")]
    Remove(RemoveArgs),
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Search terms
    #[arg(required = true, num_args = 1..)]
    terms: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct InfoArgs {
    /// Package name or search expression
    query: String,

    /// Registry id picking one result among several
    id: Option<String>,
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Package in the format "name" or "name@version"; omit to install package.json dependencies
    #[arg(value_name = "NAME[@VERSION]")]
    package: Option<String>,

    /// Registry id picking one result among several
    id: Option<String>,

    /// Install into $TINN_PATH instead of the working directory
    #[arg(short, long)]
    global: bool,
}

#[derive(clap::Args, Debug)]
struct RemoveArgs {
    /// Installed package name
    package: String,

    /// Remove from $TINN_PATH instead of the working directory
    #[arg(short, long)]
    global: bool,
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose { "warn,tinn=debug" } else { "warn" }
}

async fn run(cli: Cli) -> Result<()> {
    let runtime = tinn::runtime::RealRuntime;

    match cli.command {
        Commands::Search(args) => commands::search(runtime, &args.terms, cli.api_url).await,
        Commands::Info(args) => {
            commands::info(runtime, &[args.query], args.id.as_deref(), cli.api_url).await
        }
        Commands::Install(args) => {
            commands::install(
                runtime,
                args.package.as_deref(),
                args.id.as_deref(),
                args.global,
                cli.api_url,
            )
            .await
        }
        Commands::Remove(args) => commands::remove(runtime, &args.package, args.global),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose)),
    )
    .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        // Already reported where it happened
        Err(e) if e.downcast_ref::<PackageError>().is_some() => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
