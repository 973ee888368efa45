//! layermap - project dependency graph and context cache
//!
//! Thin command-line front end over [`ProjectGraphService`].

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use layermap::{BrokenRelationship, ProjectGraphService};

#[derive(Parser)]
#[command(name = "layermap")]
#[command(version)]
#[command(about = "Layered dependency graph and working-context cache for source trees", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the stack, map the structure and build the dependency graph
    Analyze {
        /// Ignore the cached analysis even if it is fresh
        #[arg(short, long)]
        force: bool,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check cached relationships against the filesystem
    Validate {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the files currently being worked on
    Focus {
        /// Files to focus (relative to the current directory)
        files: Vec<PathBuf>,

        /// Clear the focus instead of setting it
        #[arg(long, conflicts_with = "files")]
        clear: bool,
    },

    /// Record that a file was written and refresh its edges
    Touch {
        file: PathBuf,
    },

    /// Record that a file was deleted and drop its edges
    Forget {
        file: PathBuf,
    },

    /// List files related to the given files or the current focus
    Related {
        files: Vec<PathBuf>,

        /// Maximum number of files to list
        #[arg(short, long, default_value = "10")]
        max: usize,
    },

    /// List every file that imports the given file, directly or not
    Dependents {
        file: PathBuf,
    },

    /// Print a short description of the current working context
    Summary {
        /// Maximum summary length in characters
        #[arg(long, default_value = "500")]
        max_length: usize,
    },

    /// List the files worth loading at the start of a session
    Autoload,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "layermap=debug,info"
    } else {
        "layermap=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.is_dir() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }

    let mut service = match ProjectGraphService::open(&project_path) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    };

    match cli.command {
        Commands::Analyze { force, json } => {
            let outcome = service.analyze(force);

            if json {
                let report = serde_json::json!({
                    "cached": outcome.cached,
                    "unscannedFiles": outcome.unscanned_files,
                    "analysis": outcome.analysis,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let analysis = &outcome.analysis;
                let source = if outcome.cached { "cached" } else { "fresh" };
                println!("\n{} Project analysis ({})", "Analysis:".cyan().bold(), source);
                println!("{}", "─".repeat(40));
                println!(
                    "   Stack: {}",
                    analysis
                        .stack
                        .describe()
                        .unwrap_or_else(|| "unknown".to_string())
                );
                for (category, count) in analysis.structure.counts() {
                    println!("   {:<10} {}", format!("{}:", category), count);
                }
                println!("   Relationships: {}", analysis.relationships.len());
            }

            if outcome.unscanned_files > 0 {
                eprintln!(
                    "{} {} files were not scanned for imports (raise importScanLimit in {})",
                    "Warning:".yellow().bold(),
                    outcome.unscanned_files,
                    layermap::AnalysisConfig::settings_path(&project_path).display()
                );
            }
        }

        Commands::Validate { json } => {
            service.analyze(false);
            let findings = service.validate();

            if json {
                println!("{}", serde_json::to_string_pretty(&findings)?);
            } else if findings.is_empty() {
                println!("{} No broken relationships", "OK".green().bold());
            } else {
                println!(
                    "\n{} {} broken relationships",
                    "Validation:".yellow().bold(),
                    findings.len()
                );
                println!("{}", "─".repeat(40));
                for finding in &findings {
                    print_finding(finding);
                }
            }
        }

        Commands::Focus { files, clear } => {
            service.analyze(false);
            if clear || files.is_empty() {
                service.clear_focus();
                println!("{} Focus cleared", "OK".green().bold());
            } else {
                let files = from_cwd(&files)?;
                service.set_focus(&files);
                let state = service.context_state();
                println!("{} Focus set", "OK".green().bold());
                for file in state.focus() {
                    println!("   {}", file);
                }
                if let Some(layer) = state.active_layer {
                    println!("   Active layer: {}", layer);
                }
            }
        }

        Commands::Touch { file } => {
            service.analyze(false);
            let file = from_cwd(std::slice::from_ref(&file))?.remove(0);
            service.on_file_written(&file);
            println!("{} Refreshed {}", "OK".green().bold(), file.display());
        }

        Commands::Forget { file } => {
            service.analyze(false);
            let file = from_cwd(std::slice::from_ref(&file))?.remove(0);
            service.on_file_deleted(&file);
            println!("{} Dropped {}", "OK".green().bold(), file.display());
        }

        Commands::Related { files, max } => {
            service.analyze(false);
            let files = from_cwd(&files)?;
            print_list(&service.related(&files, max));
        }

        Commands::Dependents { file } => {
            service.analyze(false);
            let file = from_cwd(std::slice::from_ref(&file))?.remove(0);
            print_list(&service.dependents(&file));
        }

        Commands::Summary { max_length } => {
            service.analyze(false);
            println!("{}", service.get_context_summary(max_length));
        }

        Commands::Autoload => {
            service.analyze(false);
            print_list(&service.get_files_to_auto_load());
        }
    }

    Ok(())
}

/// Resolve command-line paths against the current directory.
fn from_cwd(files: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let cwd = std::env::current_dir()?;
    Ok(files.iter().map(|f| absolutize(&cwd, f)).collect())
}

fn absolutize(cwd: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        cwd.join(file)
    }
}

fn print_list(files: &[String]) {
    for file in files {
        println!("{}", file);
    }
}

fn print_finding(finding: &BrokenRelationship) {
    println!(
        "   {} {} -> {} ({})",
        finding.reason.to_string().red(),
        finding.from,
        finding.to,
        finding.kind
    );
}
