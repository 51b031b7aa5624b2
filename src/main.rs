use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use corebox::{
    CoreBoxFileMetadata, CoreBoxesImageFile, DepthTableEntry, LoadOptions, Pipeline,
    PipelineConfig,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "corebox")]
#[command(about = "Cut depth-labeled cores out of core-box photographs", long_about = None)]
struct Cli {
    /// Box photograph, named `<core>cx<first>-<last>_<total>[_<category>].<ext>`
    image: PathBuf,

    /// JSON pipeline config; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Depth table (JSON or `start,height` CSV), one row per physical box
    #[arg(long)]
    depth_table: Option<PathBuf>,

    /// Length of every box, used with --start-depth
    #[arg(long)]
    default_depth: Option<f64>,

    /// Top depth of the first box in the photo
    #[arg(long)]
    start_depth: Option<f64>,

    /// Run the segmentation model on the GPU
    #[arg(long)]
    gpu: bool,

    /// Directory holding the segmentation model
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Write every core image as PNG into this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Only parse the file name
    #[arg(long)]
    parse_only: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    /// JSON output with full details
    Json,
    /// One human-readable line per core
    Text,
    /// TSV: box\tphysical_box\tstart\theight\twidth_px\theight_px
    Tsv,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    if cli.parse_only {
        let metadata = CoreBoxFileMetadata::from_path(&cli.image)?;
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if cli.gpu {
        config.engine.use_gpu = true;
    }
    if cli.assets_dir.is_some() {
        config.assets_dir = cli.assets_dir.clone();
    }

    let depth_table = match &cli.depth_table {
        Some(path) => DepthTableEntry::read_table(path)?,
        None => Vec::new(),
    };

    let options = LoadOptions {
        load: true,
        depth_table,
        default_depth: cli.default_depth,
        start_depth: cli.start_depth,
    };

    let file = CoreBoxesImageFile::with_pipeline(&cli.image, options, Pipeline::new(config))?;
    let records = file.records();

    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)?;
        let stem = cli
            .image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "core".to_string());
        for (core, record) in file.list().iter().zip(&records) {
            let out = dir.join(format!("{}_box{}.png", stem, record.physical_box_number));
            core.image().save(&out)?;
            tracing::info!("wrote {}", out.display());
        }
    }

    match cli.format {
        OutputFormat::Json => {
            let json_output = serde_json::json!({
                "file": cli.image,
                "metadata": file.metadata(),
                "total_height": file.total_height(),
                "cores": records,
            });
            println!("{}", serde_json::to_string_pretty(&json_output)?);
        }
        OutputFormat::Text => {
            for r in &records {
                println!(
                    "core {} box {} ({}): {:.3} - {:.3} m",
                    r.core_id,
                    r.physical_box_number,
                    r.category,
                    r.start_depth,
                    r.start_depth + r.height
                );
            }
        }
        OutputFormat::Tsv => {
            for r in &records {
                println!(
                    "{}\t{}\t{:.3}\t{:.3}\t{}\t{}",
                    r.box_number,
                    r.physical_box_number,
                    r.start_depth,
                    r.height,
                    r.width_px,
                    r.height_px
                );
            }
        }
    }

    Ok(())
}
