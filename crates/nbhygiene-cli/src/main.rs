#![allow(
    clippy::needless_pass_by_value,    // clap hands over owned values
    clippy::fn_params_excessive_bools, // CLI commands have many boolean flags
    clippy::unnecessary_wraps,         // consistent Result return for CLI handlers
)]

//! nbhygiene CLI - Notebook cleaning and validation tool
//!
//! Strips execution state from Jupyter notebooks and reports quality issues
//! before they are committed.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use nbhygiene_cli::config::{user_config_path, Config, CONFIG_FILE_NAME, CONFIG_TEMPLATE};
use nbhygiene_cli::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use nbhygiene_cli::report;
use nbhygiene_notebook::{
    clean_target, inventory_target, resolve_target, validate_target, Target, Validator,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Check if output should be shown (not quiet)
    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Check if verbose output is requested
    const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Default `env_logger` filter; `RUST_LOG` overrides it
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "nbhygiene",
    about = "Clean and validate Jupyter notebooks",
    long_about = "Keep Jupyter notebooks fit for version control.\n\
                  \n\
                  Strips outputs and execution counters, and reports structural\n\
                  and style issues such as empty cells or hardcoded secrets.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Use this configuration file instead of ~/.nbhygiene.toml and ./.nbhygiene.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Strip outputs and execution counts from notebooks
    #[command(long_about = "Strip outputs and execution counts from notebooks.\n\
                      \n\
                      Code cells get empty outputs and a null execution count; markdown\n\
                      cells are never touched. Changed notebooks are rewritten with sorted\n\
                      keys and 2-space indentation.\n\
                      \n\
                      Examples:\n\
                        nbhygiene clean                       # everything under notebooks/\n\
                        nbhygiene clean analysis/ --dry-run   # report only\n\
                        nbhygiene clean report.ipynb\n\
                      \n\
                      Defaults can be set via .nbhygiene.toml configuration file.")]
    Clean {
        /// Notebook file or directory (default: notebooks/, or from config)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Show what would be cleaned without making changes
        #[arg(long)]
        dry_run: bool,

        /// Number of parallel workers (default: number of CPU cores, 1 = sequential)
        #[arg(short = 'j', long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Check notebooks for common issues and best practices
    #[command(long_about = "Check notebooks for common issues and best practices.\n\
                      \n\
                      Reports empty notebooks and cells, missing documentation, imports\n\
                      after code, possible hardcoded secrets, leftover outputs and very\n\
                      long code cells. Notebooks are never modified.\n\
                      \n\
                      Examples:\n\
                        nbhygiene validate                    # everything under notebooks/\n\
                        nbhygiene validate notebooks/ --strict  # exit 1 on any issue\n\
                        nbhygiene validate notebooks/ --json\n\
                      \n\
                      Defaults can be set via .nbhygiene.toml configuration file.")]
    Validate {
        /// Notebook file or directory (default: notebooks/, or from config)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Exit with error code if any issues found
        #[arg(long)]
        strict: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Number of parallel workers (default: number of CPU cores, 1 = sequential)
        #[arg(short = 'j', long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// List notebooks grouped by directory
    #[command(long_about = "List notebooks grouped by their parent directory.\n\
                      \n\
                      Shows cell counts, file size and whether outputs are present.\n\
                      \n\
                      Examples:\n\
                        nbhygiene list\n\
                        nbhygiene list notebooks/ --json")]
    List {
        /// Notebook file or directory (default: notebooks/, or from config)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Output as JSON instead of table
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for nbhygiene.\n\
                      \n\
                      Supports bash, zsh, fish, and PowerShell.\n\
                      \n\
                      Examples:\n\
                        nbhygiene completion bash > /usr/local/etc/bash_completion.d/nbhygiene\n\
                        nbhygiene completion zsh > ~/.zsh/completions/_nbhygiene\n\
                        nbhygiene completion fish > ~/.config/fish/completions/nbhygiene.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Manage configuration settings
    #[command(long_about = "Manage nbhygiene configuration files.\n\
                      \n\
                      Configuration files are loaded in this order (later overrides earlier):\n\
                        1. User config: ~/.nbhygiene.toml\n\
                        2. Project config: ./.nbhygiene.toml\n\
                        3. Command-line arguments\n\
                      \n\
                      --config FILE replaces the first two.\n\
                      \n\
                      Examples:\n\
                        nbhygiene config init          # Create .nbhygiene.toml\n\
                        nbhygiene config show          # Display current configuration\n\
                        nbhygiene config path          # Show configuration file locations")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Create a new .nbhygiene.toml configuration file
    Init {
        /// Create in user home directory (~/.nbhygiene.toml) instead of current directory
        #[arg(long)]
        global: bool,

        /// Overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Display the current effective configuration
    Show {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Show the paths of the configuration files
    Path,
}

fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.log_filter()),
    )
    .target(env_logger::Target::Stderr)
    .init();
}

fn print_error(message: impl std::fmt::Display) {
    eprintln!("{} {message}", "Error:".red().bold());
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Extract global verbosity settings
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    init_logging(verbosity);

    let config = match Config::resolve(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print_error(format_args!("{e:#}"));
            std::process::exit(EXIT_FAILURE);
        }
    };

    let code = match args.command {
        Commands::Clean {
            path,
            dry_run,
            jobs,
        } => clean_command(path, dry_run, jobs, &config, verbosity)?,
        Commands::Validate {
            path,
            strict,
            json,
            jobs,
        } => validate_command(path, strict, json, jobs, &config, verbosity)?,
        Commands::List { path, json } => list_command(path, json, &config, verbosity)?,
        Commands::Completion { shell } => completion_command(shell)?,
        Commands::Config { action } => {
            config_command(action, &config, args.config.as_deref(), verbosity)?
        }
    };

    if code != EXIT_SUCCESS {
        std::process::exit(code);
    }
    Ok(())
}

/// Resolve the path argument, printing the usage error when it is unusable
fn resolve_or_report(path: Option<PathBuf>, config: &Config) -> Option<Target> {
    let path = path.unwrap_or_else(|| config.notebooks_dir());
    match resolve_target(&path, &config.extension()) {
        Ok(target) => {
            log::debug!("Target: {target:?}");
            Some(target)
        }
        Err(e) => {
            print_error(e);
            None
        }
    }
}

fn clean_command(
    path: Option<PathBuf>,
    dry_run: bool,
    jobs: Option<usize>,
    config: &Config,
    verbosity: Verbosity,
) -> Result<i32> {
    let Some(target) = resolve_or_report(path, config) else {
        return Ok(EXIT_FAILURE);
    };
    let dry_run = config.dry_run(dry_run);
    let options = config.walk_options(jobs);

    let report = clean_target(&target, dry_run, &options).context("Failed to clean notebooks")?;

    if verbosity.should_show_output() {
        let mut out = io::stdout().lock();
        report::write_clean_report(
            &mut out,
            &report,
            dry_run,
            target.is_directory(),
            verbosity.is_verbose(),
        )?;
        out.flush()?;
    }

    let failed = report.failed_count();
    if failed > 0 {
        print_error(format_args!("{failed} notebook(s) could not be cleaned"));
        return Ok(EXIT_FAILURE);
    }
    Ok(EXIT_SUCCESS)
}

fn validate_command(
    path: Option<PathBuf>,
    strict: bool,
    json_output: bool,
    jobs: Option<usize>,
    config: &Config,
    verbosity: Verbosity,
) -> Result<i32> {
    let Some(target) = resolve_or_report(path, config) else {
        return Ok(EXIT_FAILURE);
    };
    let strict = config.strict(strict);
    let options = config.walk_options(jobs);
    let validator = Validator::with_config(config.validator_config())
        .context("Invalid [validate] configuration")?;

    let report =
        validate_target(&target, &validator, &options).context("Failed to validate notebooks")?;

    let mut out = io::stdout().lock();
    if json_output {
        report::write_validation_json(&mut out, &report)?;
    } else if verbosity.should_show_output() {
        let single_file = (!target.is_directory()).then(|| target.path());
        report::write_validation_text(&mut out, &report, single_file)?;
    }
    out.flush()?;

    if verbosity.is_verbose() {
        eprintln!(
            "{} {} notebooks checked, {} issues in {} notebooks",
            "Summary:".cyan().bold(),
            report.files_checked,
            report.finding_count(),
            report.results.len()
        );
    }

    if strict && report.has_findings() {
        return Ok(EXIT_FAILURE);
    }
    Ok(EXIT_SUCCESS)
}

fn list_command(
    path: Option<PathBuf>,
    json_output: bool,
    config: &Config,
    verbosity: Verbosity,
) -> Result<i32> {
    let Some(target) = resolve_or_report(path, config) else {
        return Ok(EXIT_FAILURE);
    };
    let summaries = inventory_target(&target, &config.walk_options(None))
        .context("Failed to list notebooks")?;

    let mut out = io::stdout().lock();
    if json_output {
        report::write_inventory_json(&mut out, &summaries)?;
    } else if verbosity.should_show_output() {
        report::write_inventory_text(&mut out, &summaries)?;
    }
    out.flush()?;
    Ok(EXIT_SUCCESS)
}

fn completion_command(shell: Shell) -> Result<i32> {
    let mut cmd = Args::command();
    let bin_name = cmd.get_name().to_string();

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(EXIT_SUCCESS)
}

fn config_command(
    action: ConfigAction,
    config: &Config,
    explicit: Option<&Path>,
    verbosity: Verbosity,
) -> Result<i32> {
    match action {
        ConfigAction::Init { global, force } => config_init(global, force, verbosity),
        ConfigAction::Show { json } => config_show(config, json),
        ConfigAction::Path => config_path(explicit),
    }
}

/// Create a new configuration file from the commented template
fn config_init(global: bool, force: bool, verbosity: Verbosity) -> Result<i32> {
    let config_path = if global {
        user_config_path().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
    } else {
        PathBuf::from(CONFIG_FILE_NAME)
    };

    if config_path.exists() && !force {
        print_error(format_args!(
            "Configuration file already exists: {}",
            config_path.display()
        ));
        eprintln!("{} Use --force to overwrite", "Hint:".cyan().bold());
        return Ok(EXIT_FAILURE);
    }

    fs::write(&config_path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    if verbosity.should_show_output() {
        println!(
            "{} Created configuration file: {}",
            "Success:".green().bold(),
            config_path.display()
        );
    }

    Ok(EXIT_SUCCESS)
}

/// Display the current effective configuration
fn config_show(config: &Config, json_output: bool) -> Result<i32> {
    if json_output {
        let json = serde_json::to_string_pretty(config)?;
        println!("{json}");
    } else {
        let toml = toml::to_string_pretty(config)?;
        println!("{toml}");
    }

    Ok(EXIT_SUCCESS)
}

fn config_path(explicit: Option<&Path>) -> Result<i32> {
    let status = |path: &Path| {
        if path.exists() {
            "exists".green()
        } else {
            "not found".yellow()
        }
    };

    if let Some(path) = explicit {
        println!(
            "  {} {} ({})",
            "Explicit:".bright_black(),
            path.display(),
            status(path)
        );
        return Ok(EXIT_SUCCESS);
    }

    if let Some(home) = user_config_path() {
        println!(
            "  {} {} ({})",
            "User:".bright_black(),
            home.display(),
            status(&home)
        );
    }

    let project = PathBuf::from(CONFIG_FILE_NAME);
    println!(
        "  {} {} ({})",
        "Project:".bright_black(),
        project.display(),
        status(&project)
    );

    Ok(EXIT_SUCCESS)
}
