//! RakSOR CLI Module
//!
//! Command-line interface for training, prediction, evaluation and ranking.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::dataset::arff::read_dataset;
use crate::dataset::LabelKind;
use crate::error::RaksorError;
use crate::evaluation::{
    EvaluationMode, EvaluationReport, RankingEvaluation, MEAN_HAMMING_ACCURACY, MEAN_KENDALL_TAU,
    MEAN_SPEARMAN_RHO, MICRO_F1, MICRO_PRECISION, MICRO_RECALL, SUBSET_ACCURACY, TOP1_HIT_RATE,
};
use crate::inference::{write_ranking_table, InferenceConfig, PredictionManager, PredictionResult};
use crate::model::RankingModel;
use crate::training::{TrainingConfig, TrainingManager};

/// Report label of rank predictions on a test set
pub const RANK_LABEL: &str = "RakSOR-Rank";
/// Report label of bipartition predictions on a test set
pub const BIPARTITION_LABEL: &str = "RakSOR-Bip";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "raksor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rank ontology reasoners with multi-target regression and multi-label classification")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a ranking model from MLC and MTR datasets
    Train {
        /// Training dataset with binary relevance labels (ARFF)
        #[arg(long)]
        mlc: PathBuf,

        /// Training dataset with continuous rank labels (ARFF)
        #[arg(long)]
        mtr: PathBuf,

        /// Number of target (reasoner) columns at the end of each dataset
        #[arg(short = 'n', long)]
        targets: usize,

        /// Output directory (default: ./raksor_<timestamp>)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Run k-fold cross-validation and write its report
        #[arg(long)]
        cv: bool,

        /// Training configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Predict ranks and relevance for a dataset
    Predict {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Dataset to predict (ARFF)
        #[arg(short, long)]
        data: PathBuf,

        /// Number of target columns in the dataset
        #[arg(short = 'n', long)]
        targets: usize,

        /// Output directory (default: ./raksor_<timestamp>)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Predict a labeled test set and evaluate rank and bipartition quality
    Evaluate {
        /// Test dataset with rank labels (ARFF)
        #[arg(long)]
        mtr_test: PathBuf,

        /// Test dataset with relevance labels (ARFF)
        #[arg(long)]
        mlc_test: PathBuf,

        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Number of target columns
        #[arg(short = 'n', long)]
        targets: usize,

        /// Output directory (default: ./raksor_<timestamp>)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Score an existing prediction file against ground truth
    Score {
        /// Ground-truth dataset (ARFF)
        #[arg(long)]
        truth: PathBuf,

        /// Predicted dataset (ARFF), instances in the same order
        #[arg(long)]
        predicted: PathBuf,

        /// Number of target columns
        #[arg(short = 'n', long)]
        targets: usize,

        /// Evaluation mode
        #[arg(long, value_enum)]
        mode: ModeArg,

        /// Algorithm label written into the report
        #[arg(long)]
        label: String,

        /// Report CSV (rows are appended)
        #[arg(long)]
        report: PathBuf,
    },

    /// Rank reasoners for every profiled ontology in a features file
    Rank {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Feature vectors (ARFF), with or without target columns
        #[arg(short, long)]
        features: PathBuf,

        /// Output directory (default: ./raksor_<timestamp>)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Rank,
    Bipartition,
}

impl From<ModeArg> for EvaluationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rank => EvaluationMode::Rank,
            ModeArg::Bipartition => EvaluationMode::Bipartition,
        }
    }
}

// ─── Argument checks ───────────────────────────────────────────────────────────

/// Fail unless `path` is an existing, readable file
fn require_readable(command: &str, flag: &str, path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        anyhow::bail!(
            "--{} {}: no such file\n  usage: raksor {} --help",
            flag,
            path.display(),
            command
        );
    }
    if let Err(e) = File::open(path) {
        anyhow::bail!(
            "--{} {}: not readable ({})\n  usage: raksor {} --help",
            flag,
            path.display(),
            e,
            command
        );
    }
    Ok(())
}

fn require_targets(command: &str, targets: usize) -> anyhow::Result<()> {
    if targets == 0 {
        anyhow::bail!("--targets must be at least 1\n  usage: raksor {} --help", command);
    }
    Ok(())
}

/// Requested output directory, or `./raksor_<unix timestamp>`
pub fn resolve_output_dir(output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(format!("./raksor_{}", chrono::Utc::now().timestamp())),
    }
}

/// `<features stem>_<row>_ranking.csv`, with path separators and whitespace replaced
fn ranking_table_name(features: &Path, row: usize) -> String {
    let stem: String = features
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "features".to_string())
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    format!("{}_{}_ranking.csv", stem, row)
}

fn load_model(manager: &PredictionManager, path: &Path) -> anyhow::Result<RankingModel> {
    step_run("Loading model");
    let model = manager.load_model(path)?;
    step_done(&format!("N={} targets, {} features", model.n_targets(), model.schema().n_features()));
    Ok(model)
}

fn print_report(report: &EvaluationReport) {
    let metrics: &[&str] = match report.mode() {
        EvaluationMode::Rank => &[MEAN_SPEARMAN_RHO, MEAN_KENDALL_TAU, TOP1_HIT_RATE],
        EvaluationMode::Bipartition => &[
            MEAN_HAMMING_ACCURACY,
            SUBSET_ACCURACY,
            MICRO_PRECISION,
            MICRO_RECALL,
            MICRO_F1,
        ],
    };
    println!();
    println!("  {} {}", accent(report.algorithm()), dim(&format!("({})", report.mode())));
    for metric in metrics {
        if let Some(value) = report.aggregate(metric) {
            kv(metric, &format!("{:.4}", value));
        }
    }
}

fn print_ranking(target_names: &[String], result: &PredictionResult, limit: usize) {
    for (pos, &target) in result.rank.iter().take(limit).enumerate() {
        let flag = if result.relevance[target] { ok("relevant") } else { dim("-") };
        println!(
            "    {:>2}. {:<24} {:>10}  {}",
            pos + 1,
            target_names[target],
            format!("{:.4}", result.scores[target]),
            flag
        );
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    mlc: &Path,
    mtr: &Path,
    targets: usize,
    output_dir: Option<&Path>,
    cv: bool,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    require_readable("train", "mlc", mlc)?;
    require_readable("train", "mtr", mtr)?;
    require_targets("train", targets)?;
    if let Some(config) = config {
        require_readable("train", "config", config)?;
    }

    section("Train");
    let config = match config {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };
    let output_dir = resolve_output_dir(output_dir);

    step_run("Loading datasets");
    let mlc_ds = read_dataset(mlc, targets, LabelKind::Relevance)?;
    let mtr_ds = read_dataset(mtr, targets, LabelKind::Rank)?;
    step_done(&format!(
        "MLC {} × {}, MTR {} × {}",
        mlc_ds.n_instances(),
        mlc_ds.schema().n_features(),
        mtr_ds.n_instances(),
        mtr_ds.schema().n_features()
    ));

    step_run(&format!(
        "Training {} / {}{}",
        config.regressor.to_string().cyan(),
        config.classifier.to_string().cyan(),
        if cv { " with cross-validation" } else { "" }
    ));
    let start = Instant::now();
    let manager = TrainingManager::new(config);
    let model = manager.train(&mlc_ds, &mtr_ds, targets, &output_dir, cv)?;
    step_done(&format!("{:?}", start.elapsed()));

    let meta = model.metadata();
    println!();
    kv("Targets", &model.n_targets().to_string());
    kv("Stacked", &meta.stacked.to_string());
    kv(
        "Degenerate targets",
        &(meta.degenerate_regressors.len() + meta.degenerate_classifiers.len()).to_string(),
    );
    kv("Model", &manager.model_path(&output_dir).display().to_string());
    if cv {
        kv("CV report", &manager.cv_report_path(&output_dir).display().to_string());
    }
    println!();
    Ok(())
}

pub fn cmd_predict(model: &Path, data: &Path, targets: usize, output_dir: Option<&Path>) -> anyhow::Result<()> {
    require_readable("predict", "model", model)?;
    require_readable("predict", "data", data)?;
    require_targets("predict", targets)?;

    section("Predict");
    let manager = PredictionManager::new(InferenceConfig::default());
    let model = load_model(&manager, model)?;
    if model.n_targets() != targets {
        return Err(RaksorError::schema_mismatch(
            data.display().to_string(),
            format!("N={} target columns", model.n_targets()),
            format!("--targets {}", targets),
        )
        .into());
    }

    let output_dir = resolve_output_dir(output_dir);
    let rank_out = output_dir.join("rank_predictions.arff");
    let bip_out = output_dir.join("bipartition_predictions.arff");

    step_run("Predicting");
    let predictions = manager.predict_to_files(&model, data, &rank_out, &bip_out)?;
    step_done(&format!("{} instances", predictions.len()));

    step_ok(&format!("Rank predictions → {}", rank_out.display()));
    step_ok(&format!("Bipartition predictions → {}", bip_out.display()));
    println!();
    Ok(())
}

pub fn cmd_evaluate(
    mtr_test: &Path,
    mlc_test: &Path,
    model: &Path,
    targets: usize,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    require_readable("evaluate", "mtr-test", mtr_test)?;
    require_readable("evaluate", "mlc-test", mlc_test)?;
    require_readable("evaluate", "model", model)?;
    require_targets("evaluate", targets)?;

    section("Evaluate");
    let manager = PredictionManager::new(InferenceConfig::default());
    let model = load_model(&manager, model)?;
    let output_dir = resolve_output_dir(output_dir);

    step_run("Loading test sets");
    let mtr = read_dataset(mtr_test, targets, LabelKind::Rank)?;
    let mlc = read_dataset(mlc_test, targets, LabelKind::Relevance)?;
    step_done(&format!("{} / {} instances", mtr.n_instances(), mlc.n_instances()));

    // Predictions come from the MTR test features; both label sets are
    // matched to them by position.
    step_run("Predicting");
    let predictions = manager.predict(&model, &mtr)?;
    let rank_predicted = predictions.rank_dataset(&mtr)?;
    let bip_predicted = predictions.bipartition_dataset(&mtr)?;
    crate::dataset::arff::write_dataset(&rank_predicted, output_dir.join("rank_predictions.arff"))?;
    crate::dataset::arff::write_dataset(&bip_predicted, output_dir.join("bipartition_predictions.arff"))?;
    step_done(&format!("{} instances", predictions.len()));

    let report_path = output_dir.join("raksor_evaluation.csv");
    let evaluation = RankingEvaluation::new(&report_path, targets);
    let rank_report = evaluation.evaluate_ranking(&mtr, &rank_predicted, RANK_LABEL)?;
    let bip_report = evaluation.evaluate_bipartition(&mlc, &bip_predicted, BIPARTITION_LABEL)?;

    print_report(&rank_report);
    print_report(&bip_report);
    println!();
    step_ok(&format!("Report → {}", report_path.display()));
    println!();
    Ok(())
}

pub fn cmd_score(
    truth: &Path,
    predicted: &Path,
    targets: usize,
    mode: ModeArg,
    label: &str,
    report: &Path,
) -> anyhow::Result<()> {
    require_readable("score", "truth", truth)?;
    require_readable("score", "predicted", predicted)?;
    require_targets("score", targets)?;

    section("Score");
    let mode = EvaluationMode::from(mode);
    let kind = match mode {
        EvaluationMode::Rank => LabelKind::Rank,
        EvaluationMode::Bipartition => LabelKind::Relevance,
    };
    let truth = read_dataset(truth, targets, kind)?;
    let predicted = read_dataset(predicted, targets, kind)?;

    let evaluation = RankingEvaluation::new(report, targets);
    let result = match mode {
        EvaluationMode::Rank => evaluation.evaluate_ranking(&truth, &predicted, label)?,
        EvaluationMode::Bipartition => evaluation.evaluate_bipartition(&truth, &predicted, label)?,
    };

    print_report(&result);
    println!();
    step_ok(&format!("Appended to {}", report.display()));
    println!();
    Ok(())
}

pub fn cmd_rank(model: &Path, features: &Path, output_dir: Option<&Path>) -> anyhow::Result<()> {
    require_readable("rank", "model", model)?;
    require_readable("rank", "features", features)?;

    section("Rank");
    let manager = PredictionManager::new(InferenceConfig::default());
    let model = load_model(&manager, model)?;
    let output_dir = resolve_output_dir(output_dir);

    // Feature files may carry the target block (usually all `?`) or not
    let dataset = match read_dataset(features, model.n_targets(), LabelKind::Rank) {
        Ok(ds) if ds.schema().n_features() == model.schema().n_features() => ds,
        _ => read_dataset(features, 0, LabelKind::Rank)?,
    };
    let expected = model.schema().feature_names();
    let found = dataset.schema().feature_names();
    if expected != found {
        return Err(RaksorError::schema_mismatch(
            features.display().to_string(),
            format!("features [{}]", expected.join(", ")),
            format!("[{}]", found.join(", ")),
        )
        .into());
    }

    for (i, instance) in dataset.instances().enumerate() {
        let result = manager.rank_single(&model, &instance.features.to_vec())?;
        let table = output_dir.join(ranking_table_name(features, i));
        write_ranking_table(model.target_names(), &result, &table)?;

        println!();
        println!("  {} {}", accent(&format!("Instance {}", i)), dim(&table.display().to_string()));
        print_ranking(model.target_names(), &result, 5);
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_rejected() {
        let err = require_readable("train", "mlc", Path::new("/definitely/not/here.arff")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("--mlc"));
        assert!(msg.contains("usage: raksor train"));
    }

    #[test]
    fn test_zero_targets_rejected() {
        assert!(require_targets("predict", 0).is_err());
        assert!(require_targets("predict", 3).is_ok());
    }

    #[test]
    fn test_ranking_table_name_is_a_plain_file_name() {
        assert_eq!(ranking_table_name(Path::new("data/profiled.arff"), 3), "profiled_3_ranking.csv");
        assert_eq!(ranking_table_name(Path::new("ore mlc#1.arff"), 0), "ore_mlc_1_ranking.csv");
        let name = ranking_table_name(Path::new("/tmp/x/ontologies.arff"), 1);
        assert_eq!(Path::new(&name).components().count(), 1);
    }

    #[test]
    fn test_default_output_dir() {
        let dir = resolve_output_dir(None);
        assert!(dir.to_string_lossy().starts_with("./raksor_"));
        assert_eq!(resolve_output_dir(Some(Path::new("out"))), PathBuf::from("out"));
    }

    #[test]
    fn test_cli_parses_train() {
        let cli = Cli::try_parse_from([
            "raksor", "train", "--mlc", "a.arff", "--mtr", "b.arff", "--targets", "10", "--cv",
        ])
        .unwrap();
        match cli.command {
            Commands::Train { targets, cv, .. } => {
                assert_eq!(targets, 10);
                assert!(cv);
            }
            _ => panic!("expected train"),
        }
    }
}
