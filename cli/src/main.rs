mod progress;
mod serve;

use structopt::StructOpt;

use painting_restoration::{
    self as pr, ContextEncoderConfig, EdgeDetector, Enhancer, Error, Pipeline, Restorer,
};
use progress::TrainingBars;
use std::path::PathBuf;
use tracing::info;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Train {
    /// Directory of `*.jpg` images to train on
    #[structopt(long, parse(from_os_str), default_value = "dataset/train")]
    dataset: PathBuf,
    /// The number of passes over the dataset
    #[structopt(long, default_value = "10")]
    epochs: u32,
    /// The number of images per optimizer step. Images that don't fill a
    /// complete batch at the end of an epoch are skipped
    #[structopt(long, default_value = "4")]
    batch_size: usize,
    /// Learning rate of the Adam optimizer
    #[structopt(long = "lr", default_value = "0.0002")]
    learning_rate: f64,
    /// A seed for shuffling the dataset and placing the masks
    #[structopt(long)]
    seed: Option<u64>,
    /// Don't show progress bars
    #[structopt(long)]
    no_progress: bool,
    /// Restore this image with the freshly trained model, the result is
    /// saved as `preview.jpg` next to the weights
    #[structopt(long, parse(from_os_str))]
    preview: Option<PathBuf>,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Restore {
    /// The photograph to restore
    #[structopt(parse(from_os_str))]
    input: PathBuf,
    /// The path to save the restored image to, the file extension determines
    /// the image format
    #[structopt(long = "out", short, parse(from_os_str))]
    output: PathBuf,
    /// Resize the restored image back to the size of the input, rather than
    /// keeping the model's size
    #[structopt(long)]
    keep_size: bool,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Edges {
    /// A single image to extract the edges of
    #[structopt(parse(from_os_str), required_unless = "dir")]
    input: Option<PathBuf>,
    /// Extract the edges of every `*.jpg` in this directory instead, `--out`
    /// is then treated as a directory
    #[structopt(long, parse(from_os_str))]
    dir: Option<PathBuf>,
    /// Where to save the edge map(s)
    #[structopt(long = "out", short, parse(from_os_str))]
    output: PathBuf,
    /// Lower Canny hysteresis threshold
    #[structopt(long, default_value = "50")]
    low: f32,
    /// Upper Canny hysteresis threshold
    #[structopt(long, default_value = "150")]
    high: f32,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Enhance {
    #[structopt(parse(from_os_str))]
    input: PathBuf,
    #[structopt(long = "out", short, parse(from_os_str))]
    output: PathBuf,
    /// Contrast factor, 1.0 leaves the contrast untouched
    #[structopt(long, default_value = "1.15")]
    contrast: f32,
    /// Saturation factor, 1.0 leaves the colors untouched
    #[structopt(long, default_value = "1.1")]
    color: f32,
    /// Blur of the unsharp mask
    #[structopt(long, default_value = "3.0")]
    sigma: f32,
    /// Strength of the unsharp mask
    #[structopt(long, default_value = "0.4")]
    amount: f32,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct RunPipeline {
    /// The photograph to process
    #[structopt(parse(from_os_str))]
    input: PathBuf,
    /// Directory the edge map, restored and enhanced images are written to
    #[structopt(long, parse(from_os_str), default_value = "results")]
    out_dir: PathBuf,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Synth {
    /// Directory the `train` and `test` splits are created in
    #[structopt(long, parse(from_os_str), default_value = "dataset")]
    root: PathBuf,
    #[structopt(long, default_value = "0")]
    seed: u64,
}

#[derive(StructOpt)]
enum Subcommand {
    /// Serves the upload form
    #[structopt(name = "serve")]
    Serve(serve::Args),
    /// Trains the context encoder on a directory of images
    #[structopt(name = "train")]
    Train(Train),
    /// Runs only the context encoder over an image
    #[structopt(name = "restore")]
    Restore(Restore),
    /// Extracts edge maps from one image or a directory of images
    #[structopt(name = "edges")]
    Edges(Edges),
    /// Applies contrast, color and sharpness enhancement to an image
    #[structopt(name = "enhance")]
    Enhance(Enhance),
    /// Runs all stages over an image, the same as an upload to the form
    #[structopt(name = "pipeline")]
    Pipeline(RunPipeline),
    /// Generates a synthetic training dataset
    #[structopt(name = "synth")]
    Synth(Synth),
}

#[derive(StructOpt)]
#[structopt(
    name = "restore-paintings",
    about = "Restores photographs of damaged paintings with a context encoder",
    rename_all = "kebab-case"
)]
pub(crate) struct Opt {
    /// Path to the context encoder weights, written by `train` and read by
    /// every other command
    #[structopt(long, parse(from_os_str), default_value = "weights/context_encoder.bin")]
    weights: PathBuf,
    /// Log filter directives, eg `debug` or `painting_restoration=trace`.
    /// Falls back to `RUST_LOG`, then `info`
    #[structopt(long)]
    log_level: Option<String>,
    #[structopt(subcommand)]
    cmd: Subcommand,
}

fn main() {
    if let Err(e) = real_main() {
        if atty::is(atty::Stream::Stderr) {
            eprintln!("\x1b[31merror\x1b[0m: {}", e);
        } else {
            eprintln!("error: {}", e);
        }

        std::process::exit(1);
    }
}

fn init_logging(level: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main() -> Result<(), Error> {
    let args = Opt::from_args();
    init_logging(args.log_level.as_deref());

    match &args.cmd {
        Subcommand::Serve(serve) => serve::cmd(serve, &args),
        Subcommand::Train(train) => cmd_train(train, &args),
        Subcommand::Restore(restore) => {
            let restorer = Restorer::new(ContextEncoderConfig::new(), &args.weights)?
                .keep_original_size(restore.keep_size);
            restorer.restore_file(&restore.input, &restore.output)?;
            Ok(())
        }
        Subcommand::Edges(edges) => cmd_edges(edges),
        Subcommand::Enhance(enhance) => {
            Enhancer::new()
                .contrast(enhance.contrast)
                .color(enhance.color)
                .sharpen(enhance.sigma, enhance.amount)
                .enhance_image(&enhance.input, &enhance.output)?;
            Ok(())
        }
        Subcommand::Pipeline(run) => {
            let restorer = Restorer::new(ContextEncoderConfig::new(), &args.weights)?;
            let names = Pipeline::new(restorer).run(
                &run.input,
                &run.out_dir,
                chrono::Utc::now().timestamp(),
            )?;

            for name in [&names.edge, &names.restored, &names.enhanced] {
                println!("{}", run.out_dir.join(name).display());
            }
            Ok(())
        }
        Subcommand::Synth(synth) => pr::synth::generate_dataset(&synth.root, synth.seed),
    }
}

fn cmd_train(train: &Train, args: &Opt) -> Result<(), Error> {
    let trainer = pr::Trainer::builder()
        .dataset(&train.dataset)
        .weights(&args.weights)
        .epochs(train.epochs)
        .batch_size(train.batch_size)
        .learning_rate(train.learning_rate)
        .seed(train.seed.unwrap_or_default())
        .build()?;

    let progress: Option<Box<dyn pr::TrainingProgress>> = if !train.no_progress {
        Some(Box::new(TrainingBars::new()))
    } else {
        None
    };

    let report = trainer.run(progress)?;
    if let Some(loss) = report.epoch_losses.last() {
        info!(loss, weights = %report.weights.display(), "training complete");
    }

    if let Some(input) = &train.preview {
        let output = report.weights.with_file_name("preview.jpg");
        let restorer = Restorer::from_model(report.model, &ContextEncoderConfig::new());
        restorer.restore_file(input, &output)?;

        let dims = restorer.dims();
        info!(
            path = %output.display(),
            width = dims.width,
            height = dims.height,
            "preview written"
        );
    }

    Ok(())
}

fn cmd_edges(edges: &Edges) -> Result<(), Error> {
    let detector = EdgeDetector::new().thresholds(edges.low, edges.high);

    match (&edges.dir, &edges.input) {
        (Some(dir), _) => {
            let count = detector.generate_edge_maps(dir, &edges.output)?;
            info!(count, "edge maps written");
        }
        (None, Some(input)) => {
            detector.create_edge_map(input, &edges.output)?;
        }
        (None, None) => {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "either an input image or --dir must be given",
            )))
        }
    }

    Ok(())
}
