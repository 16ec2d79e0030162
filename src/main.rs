//! dagsmith CLI Entry Point
//!
//! Builds a DAG from a YAML workflow plan and writes the job scripts,
//! submit descriptions and DAG file.
//!
//! # Usage
//!
//! ```bash
//! # Build the DAG described by a plan
//! dagsmith pipeline.yaml
//!
//! # Write into a fresh directory under a different name
//! dagsmith pipeline.yaml --output-dir /scratch/dag --name nightly --overwrite
//!
//! # Also print the generated DAG file
//! dagsmith pipeline.yaml --print
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use dagsmith::dag::{render_dag, Dag};
use dagsmith::plan::load_plan;
use dagsmith::{APP_NAME, VERSION};

/// Plan file used when none is specified.
const DEFAULT_PLAN: &str = "workflow.yaml";

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    plan_path: String,
    output_dir: Option<PathBuf>,
    dag_name: Option<String>,
    overwrite: bool,
    print: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan_path: DEFAULT_PLAN.to_string(),
            output_dir: None,
            dag_name: None,
            overwrite: false,
            print: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("HTCondor DAG Builder");
    println!();
}

fn print_usage() {
    println!("Usage: dagsmith [OPTIONS] <PLAN_FILE>");
    println!();
    println!("Arguments:");
    println!("  <PLAN_FILE>          Path to workflow plan YAML (default: {})", DEFAULT_PLAN);
    println!();
    println!("Options:");
    println!("  --output-dir PATH    Write the DAG here instead of the plan's 'dir'");
    println!("  --name NAME          Override the DAG file name");
    println!("  --overwrite          Clear existing files in the output directory");
    println!("  --print              Print the generated DAG file");
    println!("  --verbose            Enable debug logging");
    println!("  --help               Show this help message");
    println!("  --version            Show version information");
    println!();
    println!("Examples:");
    println!("  dagsmith pipeline.yaml");
    println!("  dagsmith pipeline.yaml --output-dir /scratch/dag --overwrite");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--overwrite" => {
                config.overwrite = true;
            }
            "--print" => {
                config.print = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--output-dir" | "-o" => {
                i += 1;
                if i >= args.len() {
                    return Err("--output-dir requires a path argument".to_string());
                }
                config.output_dir = Some(PathBuf::from(&args[i]));
            }
            "--name" => {
                i += 1;
                if i >= args.len() {
                    return Err("--name requires a value".to_string());
                }
                config.dag_name = Some(args[i].clone());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.plan_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(config)
}

fn print_summary(dag: &Dag, path: &Path) {
    println!();
    println!("{} {}", "DAG written:".green().bold(), path.display());
    println!(
        "  {} layers, {} jobs, {} submit files",
        dag.len(),
        dag.node_count(),
        dag.descriptors().len()
    );
    for layer in dag.layers() {
        let parent = layer
            .parent()
            .map(|p| format!(" <- {}", p))
            .unwrap_or_default();
        println!(
            "  {} {} x{}{}",
            layer.name().cyan(),
            layer.descriptor(),
            layer.instance_count(),
            parent.dimmed()
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let mut plan = load_plan(&config.plan_path).map_err(|e| {
        error!("Failed to load plan: {}", e);
        e
    })?;

    if let Some(name) = config.dag_name {
        plan.name = name;
    }
    if let Some(dir) = config.output_dir {
        plan.dir = env::current_dir()?.join(dir);
    }
    if config.overwrite {
        plan.overwrite = true;
    }

    let base_dir = Path::new(&config.plan_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    info!("Resolving plan paths against {}", base_dir.display());

    let dag = plan.into_builder(&base_dir)?.finalize();
    let path = dag.write()?;

    if config.print {
        println!();
        print!("{}", render_dag(&dag));
    }

    print_summary(&dag, &path);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
