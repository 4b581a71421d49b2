use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    tensor::backend::Backend,
};
use charnmt::{
    checkpoint,
    config::NmtConfig,
    embedding::{self, DecimatorEmbedder, WORD_LIST_HELP},
    export::ProjectionExport,
    plotting,
    tsne::{self, TsneConfig, TsneMethod},
    EmbedError,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Debug, Clone, Copy)]
#[clap(rename_all = "kebab_case")]
enum BackendArg {
    Ndarray,
    Wgpu,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[clap(rename_all = "kebab_case")]
enum MethodArg {
    Exact,
    BarnesHut,
}

/// Project word embeddings of a character-level NMT encoder with t-SNE.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON model options; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// One word per line
    #[arg(short, long, default_value = embedding::DEFAULT_WORD_LIST)]
    wordlist: PathBuf,

    /// Plot file, PNG or SVG
    #[arg(short, long, default_value = "tsne_words.png")]
    output: String,

    /// Also write the 2D projection as JSON
    #[arg(long)]
    export: Option<PathBuf>,

    #[arg(long, default_value = "t-SNE embedding of the words")]
    title: String,

    #[arg(long, value_enum, default_value_t = BackendArg::Ndarray)]
    backend: BackendArg,

    #[arg(long, value_enum, default_value_t = MethodArg::Exact)]
    method: MethodArg,

    #[arg(long, default_value_t = 30.0)]
    perplexity: f64,

    #[arg(long, default_value_t = 1000)]
    iterations: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Barnes-Hut accuracy/speed trade-off
    #[arg(long, default_value_t = 0.5)]
    theta: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = NmtConfig::load(args.config.as_deref())?;
    println!("🚀 Word embedding projection starting...");
    println!("Model options:\n{:#?}", config);
    println!();

    let result = match args.backend {
        BackendArg::Ndarray => run::<NdArray>(&args, &config, NdArrayDevice::default()),
        BackendArg::Wgpu => run::<Wgpu>(&args, &config, WgpuDevice::default()),
    };

    match result {
        Err(EmbedError::WordListMissing(_)) => {
            println!("{}", WORD_LIST_HELP);
            std::process::exit(0);
        }
        Err(e) => Err(e.into()),
        Ok(projection) => {
            plotting::plot_word_embedding(
                &projection.coordinates(),
                &projection.labels(),
                projection.title.as_deref(),
                &args.output,
            )?;
            println!("✅ Done!");
            Ok(())
        }
    }
}

fn run<B: Backend>(
    args: &Args,
    config: &NmtConfig,
    device: B::Device,
) -> Result<ProjectionExport, EmbedError> {
    println!("📱 Using device: {:?}", device);

    let words = embedding::read_word_list(&args.wordlist)?;
    println!("📄 {} words in {}", words.len(), args.wordlist.display());

    println!("📂 Loading vocabularies and checkpoint: {}", config.saveto.display());
    let assembled = checkpoint::assemble::<B>(config, &device)?;
    println!("✅ Encoder loaded");

    let embedder = DecimatorEmbedder::new(assembled.encoder.into_decimator(), device);

    println!("🔍 Extracting embeddings...");
    let embeddings = embedding::embed_words(&embedder, &words, &assembled.src_vocab)?;
    println!("   Embeddings shape: {:?}", embeddings.shape());

    println!("Computing t-SNE embedding");
    let tsne_config = TsneConfig {
        perplexity: args.perplexity,
        n_iter: args.iterations,
        seed: args.seed,
        method: match args.method {
            MethodArg::Exact => TsneMethod::Exact,
            MethodArg::BarnesHut => TsneMethod::BarnesHut { theta: args.theta },
        },
        ..TsneConfig::default()
    };
    let points = tsne::fit_transform(&embeddings.vectors, &tsne_config)?;

    let projection = ProjectionExport::new(Some(args.title.clone()), &embeddings.labels, &points);
    if let Some(path) = &args.export {
        projection.save_json(path)?;
    }

    Ok(projection)
}
