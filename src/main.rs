use clap::{Parser, Subcommand};
use evoreg::config::Config;
use evoreg::data::{load_data, DataInput};
use evoreg::evolution::evaluator::Evaluator;
use evoreg::model::Model;
use evoreg::runner;
use evoreg::serialization::load_model;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "evoreg")]
#[command(about = "Symbolic regression by genetic programming")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for a formula fitting a dataset
    Run {
        /// Dataset file, one row per line: y [group] x1 x2 ...
        data: Option<PathBuf>,
        /// TOML configuration file
        config: Option<PathBuf>,
    },
    /// Print the prediction accuracy of a stored model on a dataset
    Fitness {
        /// Serialized model file
        model: PathBuf,
        /// Dataset file
        data: PathBuf,
    },
    /// Print the prediction of a stored model next to every dataset row
    ModelOutput {
        /// Serialized model file
        model: PathBuf,
        /// Dataset file
        data: PathBuf,
    },
}

/// Loads the dataset, or the built-in sample when no file is given.
fn prepare_data(path: Option<&Path>) -> Result<DataInput, String> {
    match path {
        Some(path) => {
            log::info!("Loading data from '{}'...", path.display());
            load_data(path).map_err(|e| format!("Failed to load data: {}", e))
        }
        None => {
            log::info!("No dataset given, using the built-in sample");
            Ok(DataInput::sample())
        }
    }
}

fn prepare_config(path: Option<&Path>) -> Result<Config, String> {
    let config = match path {
        Some(path) => {
            Config::load(path).map_err(|e| format!("Failed to load configuration: {}", e))?
        }
        None => Config::default(),
    };
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn load_inputs(model: &Path, data: &Path) -> Result<(Model, DataInput), String> {
    let model = load_model(model).map_err(|e| format!("Failed to load model: {}", e))?;
    let input = prepare_data(Some(data))?;
    Ok((model, input))
}

/// Accuracy only: no node budget and no size reward.
fn fitness(model: &Model, input: &DataInput) -> Result<f64, String> {
    let config = Config {
        max_nodes: i32::MAX as usize,
        model_size_importance: 0.0,
        ..Config::default()
    };
    let evaluator = Evaluator::new(&config, input).map_err(|e| e.to_string())?;
    Ok(evaluator.fitness(model))
}

/// `prediction \t y \t x1 \t x2 ...` per row; rows the model cannot evaluate predict NaN.
fn model_output(model: &Model, input: &DataInput) -> Vec<String> {
    input
        .rows()
        .iter()
        .map(|row| {
            let predicted = model.evaluate(row).unwrap_or(f64::NAN);
            std::iter::once(predicted)
                .chain(std::iter::once(row.y))
                .chain(row.x.iter().copied())
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect()
}

fn execute(command: Command) -> Result<(), String> {
    match command {
        Command::Run { data, config } => {
            let config = prepare_config(config.as_deref())?;
            let input = prepare_data(data.as_deref())?;
            log::info!("--- Starting Evolution ---");
            let results = runner::run(&config, &input).map_err(|e| e.to_string())?;
            log::info!("--- Evolution Complete: {} results ---", results.len());
        }
        Command::Fitness { model, data } => {
            let (model, input) = load_inputs(&model, &data)?;
            println!("Fitness: {}", fitness(&model, &input)?);
        }
        Command::ModelOutput { model, data } => {
            let (model, input) = load_inputs(&model, &data)?;
            for line in model_output(&model, &input) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = execute(cli.command) {
        log::error!("{}", e);
        process::exit(1);
    }
}
