//! doccompare CLI: submit two documents to the comparison service, preview
//! crop bands, and export the result.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doccompare::application::compare::TaskEvent;
use doccompare::application::crop::{CropAction, CropSelector};
use doccompare::application::export::{ExportOptions, ReportExporter, ReportVariant};
use doccompare::domain::{
    ColumnSelection, CropEdge, CropState, DocumentFile, DocumentSide, PresetName, SubmissionMode,
};
use doccompare::infra::app_config::{AppConfig, config_path, load_config, save_config};
use doccompare::infra::render::ImageRasterizer;
use doccompare::infra::service::HttpComparisonService;
use doccompare::infra::spreadsheet::{CsvHeaderReader, SpreadsheetReader};
use doccompare::state::SessionState;

#[derive(Parser, Debug)]
#[command(name = "doccompare")]
#[command(version)]
#[command(about = "Compare two documents through a comparison service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two documents and export the result
    Compare(CompareArgs),

    /// Render a page with its header/footer bands
    Preview {
        /// Page image (PNG, JPEG, ...)
        image: PathBuf,
        /// Header band, in display pixels
        #[arg(long, default_value_t = 0.0)]
        header: f64,
        /// Footer band, in display pixels
        #[arg(long, default_value_t = 0.0)]
        footer: f64,
        /// Preview scale (defaults to the configured one)
        #[arg(long)]
        scale: Option<f64>,
        /// Where to write the PNG preview
        #[arg(long)]
        out: PathBuf,
    },

    /// Print the header labels of a spreadsheet
    Headers { file: PathBuf },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug)]
struct CompareArgs {
    left: PathBuf,
    right: PathBuf,

    /// Comparison service base URL
    #[arg(long)]
    service_url: Option<String>,

    /// Named preset (standard, tight)
    #[arg(long)]
    preset: Option<PresetName>,

    /// Wait for the full result in a single request
    #[arg(long)]
    sync: bool,

    /// Header depth for both documents, in document pixels
    #[arg(long)]
    header: Option<f64>,

    /// Footer depth for both documents, in document pixels
    #[arg(long)]
    footer: Option<f64>,

    #[arg(long)]
    ratio_threshold: Option<f64>,

    #[arg(long)]
    length_threshold: Option<u32>,

    #[arg(long)]
    size_weight: Option<f64>,

    #[arg(long)]
    left_text_column: Option<String>,
    #[arg(long)]
    left_id_column: Option<String>,
    #[arg(long)]
    right_text_column: Option<String>,
    #[arg(long)]
    right_id_column: Option<String>,

    /// Write the tabular export here
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the HTML report here
    #[arg(long)]
    html: Option<PathBuf>,

    /// Separator between chunks in tabular text cells
    #[arg(long, default_value = "")]
    chunk_separator: String,

    /// Column set of the exports
    #[arg(long, value_parser = parse_variant, default_value = "inferred")]
    variant: ReportVariant,
}

fn parse_variant(s: &str) -> Result<ReportVariant, String> {
    match s.trim().to_lowercase().as_str() {
        "inferred" => Ok(ReportVariant::Inferred),
        "document" | "pdf" => Ok(ReportVariant::Document),
        "spreadsheet" | "excel" => Ok(ReportVariant::Spreadsheet),
        other => Err(format!("unknown report variant '{other}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config();

    match cli.command {
        Commands::Compare(args) => run_compare(args, config).await,
        Commands::Preview {
            image,
            header,
            footer,
            scale,
            out,
        } => {
            run_preview(
                &image,
                header,
                footer,
                scale.unwrap_or(config.preview_scale),
                &out,
            )
            .await
        }
        Commands::Headers { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            for label in CsvHeaderReader.header_labels(&bytes)? {
                println!("{label}");
            }
            Ok(())
        }
        Commands::Config { save } => {
            println!("# {}", config_path().display());
            print!("{}", toml::to_string_pretty(&config)?);
            if save {
                save_config(&config).context("writing config")?;
            }
            Ok(())
        }
    }
}

async fn read_document(path: &Path) -> Result<DocumentFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(DocumentFile::new(name, bytes))
}

fn columns(text: Option<String>, id: Option<String>) -> ColumnSelection {
    ColumnSelection {
        text_column: text,
        id_column: id,
    }
}

async fn run_compare(args: CompareArgs, mut config: AppConfig) -> Result<()> {
    if let Some(url) = args.service_url {
        config.service_url = url;
    }
    if let Some(preset) = args.preset {
        config.preset = preset;
    }
    if args.sync {
        config.submission_mode = SubmissionMode::Sync;
    }

    let service = HttpComparisonService::new(&config.service_url, config.request_timeout())?;
    let default_depth = config.default_crop_depth;
    let mut session = SessionState::new(config, Arc::new(service), Arc::new(ImageRasterizer));

    let crop = CropState::new(
        args.header.unwrap_or(default_depth),
        args.footer.unwrap_or(default_depth),
    );
    for side in [DocumentSide::Left, DocumentSide::Right] {
        session.crop_mut(side).dispatch(CropAction::Restore(crop));
    }
    session.set_columns(
        DocumentSide::Left,
        columns(args.left_text_column, args.left_id_column),
    );
    session.set_columns(
        DocumentSide::Right,
        columns(args.right_text_column, args.right_id_column),
    );

    let left = read_document(&args.left).await?;
    let right = read_document(&args.right).await?;
    let mut params = session.build_params(left, right);
    if let Some(ratio) = args.ratio_threshold {
        params.ratio_threshold = ratio;
    }
    if let Some(length) = args.length_threshold {
        params.length_threshold = length;
    }
    if let Some(weight) = args.size_weight {
        params.left.size_weight = weight;
        params.right.size_weight = weight;
    }

    session.submit(params).await.context("submitting comparison")?;

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                bail!("Comparison cancelled");
            }
            event = session.next_event() => event,
        };
        let Some(event) = event else {
            bail!("Comparison controller stopped unexpectedly");
        };
        session.apply_event(&event)?;
        match event {
            TaskEvent::Submitted { job_id } => eprintln!("Submitted job {job_id}"),
            TaskEvent::Progress { snapshot, .. } => {
                eprintln!("{:>3}% {}", snapshot.progress, snapshot.status_message)
            }
            TaskEvent::Completed { row_count, .. } => {
                eprintln!("Completed with {row_count} rows");
                break;
            }
            TaskEvent::Failed { error, .. } => return Err(error.into()),
            TaskEvent::Cancelled { .. } => bail!("Comparison cancelled"),
        }
    }

    let view = session.results().context("comparison returned no result")?;
    let summary = view.summary();
    for (row_type, count) in summary.non_zero() {
        println!("{row_type:>8}: {count}");
    }
    println!("{:>8}: {}", "total", summary.total);

    let options = ExportOptions {
        variant: args.variant,
        chunk_separator: args.chunk_separator,
        generated_at: Some(chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()),
        ..Default::default()
    };
    if let Some(path) = args.csv {
        let bytes = ReportExporter::to_csv(view.rows(), &options)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Wrote {}", path.display());
    }
    if let Some(path) = args.html {
        let html = ReportExporter::to_html(view.rows(), &options)?;
        tokio::fs::write(&path, html)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

async fn run_preview(image: &Path, header: f64, footer: f64, scale: f64, out: &Path) -> Result<()> {
    let mut selector = CropSelector::new(Arc::new(ImageRasterizer), scale);
    let page = selector.open(image).await?;
    selector.set_crop_depth(CropEdge::Header, header);
    selector.set_crop_depth(CropEdge::Footer, footer);
    selector.render_overlay()?;

    let png = selector.encode_png()?;
    tokio::fs::write(out, png)
        .await
        .with_context(|| format!("writing {}", out.display()))?;

    let crop = selector.current_crop_state();
    println!(
        "page {}/{} at {}x{}: header {:.1}px, footer {:.1}px (document space)",
        page.page_index, page.page_count, page.width, page.height, crop.header_depth, crop.footer_depth
    );
    Ok(())
}
