//! im2latex evaluation program
//!
//! Loads an exported im2latex checkpoint, decodes every image of a dataset split
//! with beam search and scores the decoded formulas against the references.
//!
//! # Usage
//!
//! ```bash
//! im2latex-eval --model-path checkpoints/ckpt.json [OPTIONS]
//! ```
//!
//! # Arguments
//!
//! * `--model-path` - Path of the checkpoint manifest (JSON)
//! * `--data-path` - Dataset directory holding `vocab.txt` and the `.lst` files
//! * `--image-path` - Directory of the formula images
//! * `--device` - Device to use for inference (e.g., 'cpu', 'cuda', 'cuda:0')
//! * `--batch-size` - Items decoded concurrently per chunk
//! * `--beam-size` - Beam width
//! * `--max-len` - Maximum decode steps; longer references are filtered out
//! * `--split` - Dataset split to decode (train, validate, test)
//! * `--result-path` - File receiving the decoded formulas
//! * `--ref-path` - File receiving the reference formulas
//! * `--threads` - Worker threads (default: all cores)
//! * `--max-failures` - Stop starting new decodes after this many failures
//! * `--length-normalization` - Final ranking: `none` or `average`
//! * `-v, --verbose` - Enable verbose output
//!
//! # Examples
//!
//! ```bash
//! im2latex-eval --model-path ckpt/best.json --data-path ./sample_data/ \
//!     --image-path ./data/ --beam-size 5 --max-len 64
//! ```

use clap::Parser;
use im2latex_eval::core::config::{DecodeConfig, LengthNormalization, ParallelPolicy};
use im2latex_eval::core::config::parse_device_config;
use im2latex_eval::core::init_tracing;
use im2latex_eval::domain::vocab::VOCAB_FILE;
use im2latex_eval::domain::{FormulaDataset, Split, Vocabulary};
use im2latex_eval::metrics::CorpusScorer;
use im2latex_eval::models::{Im2LatexModel, ModelCheckpoint};
use im2latex_eval::pipeline::{BatchDecodeDriver, ProgressCallback};
use im2latex_eval::processors::BeamSearchDecoder;
use im2latex_eval::utils::write_corpus_pair;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Command-line arguments for the evaluation program
#[derive(Parser)]
#[command(name = "im2latex-eval")]
#[command(about = "Im2Latex Evaluating Program - beam-search decoding and BLEU scoring")]
struct Args {
    /// Path of the evaluated model (checkpoint manifest)
    #[arg(long)]
    model_path: PathBuf,

    /// The dataset's dir
    #[arg(long, default_value = "./sample_data/")]
    data_path: PathBuf,

    /// The images's dir
    #[arg(long, default_value = "./data/")]
    image_path: PathBuf,

    /// Device to use for inference (e.g., 'cpu', 'cuda', 'cuda:0')
    #[arg(long, default_value = "cpu")]
    device: String,

    /// Items decoded concurrently per chunk
    #[arg(long, default_value = "32")]
    batch_size: usize,

    /// Beam width
    #[arg(long, default_value = "5")]
    beam_size: usize,

    /// Max step of decoding
    #[arg(long, default_value = "64")]
    max_len: usize,

    /// The data split to decode
    #[arg(long, default_value = "validate")]
    split: Split,

    /// The file to store decoded formulas
    #[arg(long, default_value = "./results/result.txt")]
    result_path: PathBuf,

    /// The file to store reference formulas
    #[arg(long, default_value = "./results/ref.txt")]
    ref_path: PathBuf,

    /// Worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Stop starting new decodes after this many failures
    #[arg(long)]
    max_failures: Option<usize>,

    /// Final ranking normalisation: none or average
    #[arg(long, default_value = "none")]
    length_normalization: LengthNormalization,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(if args.verbose { "debug" } else { "info" });

    info!("Im2Latex Evaluation");

    if !args.model_path.exists() {
        error!("Checkpoint not found: {}", args.model_path.display());
        return Err("Checkpoint not found".into());
    }

    let vocab = Vocabulary::load(&args.data_path.join(VOCAB_FILE))?;
    let checkpoint = ModelCheckpoint::load(&args.model_path)?;
    let dataset = FormulaDataset::load(
        &args.data_path,
        &args.image_path,
        args.split,
        &vocab,
        args.max_len,
    )?;

    let decode_config = DecodeConfig::new()
        .with_beam_width(args.beam_size)
        .with_max_length(args.max_len)
        .with_length_normalization(args.length_normalization);
    let policy = ParallelPolicy::new()
        .with_batch_size(args.batch_size)
        .with_max_threads(args.threads)
        .with_max_failures(args.max_failures);

    info!("Using device: {}", args.device);
    let ort_config = parse_device_config(&args.device)?.with_worker_count(policy.worker_count());

    if args.verbose {
        info!("Evaluation Configuration:");
        info!("  Split: {} ({} items)", args.split, dataset.len());
        info!("  Beam width: {}", decode_config.beam_width);
        info!("  Max decode length: {}", decode_config.max_length);
        info!("  Length normalization: {:?}", decode_config.length_normalization);
        info!("  Batch size: {}", policy.batch_size);
        info!("  Decode workers: {}", policy.worker_count());
    }

    let model = Arc::new(Im2LatexModel::load(&checkpoint, &vocab, &ort_config)?);
    let decoder = BeamSearchDecoder::from_vocab(Arc::clone(&model), decode_config, &vocab)?;

    let pb = ProgressBar::new(dataset.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    let progress_bar = pb.clone();
    let progress: ProgressCallback = Arc::new(move |n| progress_bar.inc(n as u64));

    let driver = BatchDecodeDriver::new(decoder, vocab, policy)?.with_progress(progress);
    let report = driver.run(dataset.into_items(), |item| model.prepare(&item));
    pb.finish_with_message("done");

    write_corpus_pair(
        &args.result_path,
        &args.ref_path,
        &report.hypotheses,
        &report.references,
    )?;
    info!(
        "Wrote {} hypotheses to {} and references to {}",
        report.len(),
        args.result_path.display(),
        args.ref_path.display()
    );

    if report.skip_count() > 0 {
        warn!("{} items skipped", report.skip_count());
        for skipped in &report.skipped {
            warn!("  item {}: {}", skipped.index, skipped.reason);
        }
    }
    if report.cancelled {
        warn!("Decoding stopped early after reaching the failure limit");
    }
    if args.verbose {
        info!("\n{}", report.stats);
    }

    let scores = CorpusScorer::new().score_files(&args.result_path, &args.ref_path)?;
    println!("beam search result: {}", scores);
    println!(
        "skipped: {} of {} items ({} length-capped)",
        report.skip_count(),
        report.stats.total_items,
        report.length_capped
    );

    Ok(())
}
