pub mod api;
pub mod config;
pub mod engine;
pub mod replay;
pub mod stats;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use proxi_core::{predict_raw, ClassifierConfig, InputType, StreamingClassifier};
use std::path::PathBuf;
use tracing::{error, info};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "proxi")]
#[command(about = "Streaming proximity classifier: HTTP service and offline replay")]
struct Cli {
    /// Path to a TOML config file (defaults to ~/.proxi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    classifier: ClassifierConfig,

    #[command(subcommand)]
    command: Commands,
}

/// Engine selection shared by every subcommand; overrides the config file.
#[derive(Args, Debug, Default)]
struct EngineArgs {
    /// Path to the ONNX model file
    #[arg(long)]
    model: Option<PathBuf>,
    /// Element type of the model input tensor
    #[arg(long, value_enum)]
    input_type: Option<InputType>,
    /// Skip the model and report this score for every inference
    #[arg(long)]
    constant_score: Option<f32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve predictions over HTTP
    Serve {
        #[command(flatten)]
        engine: EngineArgs,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// API Port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Replay a recorded CSV log through the streaming classifier
    Replay {
        /// Input CSV file
        input: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
        /// Column holding the raw readings
        #[arg(long)]
        column: Option<String>,
        /// Write a per-sample trace CSV here
        #[arg(long)]
        trace: Option<PathBuf>,
    },
    /// Run a single raw inference on the given values
    Predict {
        /// Exactly `--model-window` readings
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

impl EngineArgs {
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.model {
            config.model.path = Some(path);
            config.model.constant_score = None;
        }
        if let Some(input_type) = self.input_type {
            config.model.input_type = input_type;
        }
        if let Some(score) = self.constant_score {
            config.model.constant_score = Some(score);
        }
    }
}

fn serve(config: &Config, classifier: ClassifierConfig) -> anyhow::Result<()> {
    let engine = engine::build_engine(&config.model, classifier.model_window)?;
    let state = api::ApiState::new(engine, classifier)?;
    let addr = config.api.bind_addr();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(api::run_api_server(state, &addr))
}

fn replay(
    config: &Config,
    classifier: ClassifierConfig,
    input: PathBuf,
    trace: Option<PathBuf>,
) -> anyhow::Result<()> {
    let engine = engine::build_engine(&config.model, classifier.model_window)?;
    let mut clf = StreamingClassifier::new(engine, classifier)?;

    let start = std::time::Instant::now();
    let summary = replay::replay_file(&input, &config.replay.column, &mut clf, trace.as_deref())?;
    info!(
        duration_secs = start.elapsed().as_secs_f64(),
        "Replay finished"
    );

    println!("{}", summary.edge_count);
    Ok(())
}

fn predict(config: &Config, classifier: ClassifierConfig, values: Vec<f64>) -> anyhow::Result<()> {
    let engine = engine::build_engine(&config.model, classifier.model_window)?;
    let prediction = predict_raw(&engine, &values, classifier.model_window)?;
    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({ "prediction": prediction }))?
    );
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.classifier.validate()?;

    info!(
        classifier = ?cli.classifier,
        "Starting proxi with Configuration"
    );

    match cli.command {
        Commands::Serve { engine, host, port } => {
            engine.apply(&mut config);
            if let Some(host) = host {
                config.api.host = host;
            }
            if let Some(port) = port {
                config.api.port = port;
            }
            serve(&config, cli.classifier)
        }
        Commands::Replay {
            input,
            engine,
            column,
            trace,
        } => {
            engine.apply(&mut config);
            if let Some(column) = column {
                config.replay.column = column;
            }
            replay(&config, cli.classifier, input, trace)
        }
        Commands::Predict { values, engine } => {
            engine.apply(&mut config);
            predict(&config, cli.classifier, values)
        }
    }
}

fn main() {
    // Initialize structured logging (also captures `log` records from proxi_core)
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!(error = %format!("{:#}", e), "Fatal Error");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_classifier_flags_parse() {
        let cli = Cli::parse_from([
            "proxi",
            "--decision-ratio",
            "0.6",
            "replay",
            "log.csv",
            "--constant-score",
            "0",
        ]);
        assert_eq!(cli.classifier.decision_ratio, 0.6);
        assert_eq!(cli.classifier.window_len, 20);
        match cli.command {
            Commands::Replay { input, engine, .. } => {
                assert_eq!(input, PathBuf::from("log.csv"));
                assert_eq!(engine.constant_score, Some(0.0));
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn test_model_flag_overrides_constant_score() {
        let mut config = Config::default();
        config.model.constant_score = Some(1.0);
        EngineArgs {
            model: Some(PathBuf::from("m.onnx")),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.model.constant_score, None);
        assert_eq!(config.model.path, Some(PathBuf::from("m.onnx")));
    }
}
