use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use geoalbum_core::{ExtractOptions, SiteLayout, ThumbnailOptions};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geoalbum", version, about = "Build the data and thumbnails for a geotagged photo map")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Site root; other paths default relative to it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Photo directory (default: <root>/photos)
    #[arg(long, global = true)]
    photos: Option<PathBuf>,

    /// Thumbnail directory (default: <root>/thumbs)
    #[arg(long, global = true)]
    thumbs: Option<PathBuf>,

    /// Checkpoint CSV (default: <root>/data.csv)
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Dataset script (default: <root>/data.js)
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// exiftool executable; skips the tool search
    #[arg(long, global = true)]
    exiftool: Option<PathBuf>,

    /// Directory holding a bundled exiftool (default: <root>/tools)
    #[arg(long, global = true)]
    tools_dir: Option<PathBuf>,

    /// Thumbnail bounding box width
    #[arg(long, global = true, default_value_t = 920)]
    max_width: u32,

    /// Thumbnail bounding box height
    #[arg(long, global = true, default_value_t = 680)]
    max_height: u32,

    /// Thumbnail JPEG quality (1-100)
    #[arg(long, global = true, default_value_t = 82, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Log per-file detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract photo metadata into the checkpoint CSV
    Scan,
    /// Validate the checkpoint CSV and write the dataset script
    Build,
    /// Regenerate every thumbnail
    Thumbs,
    /// scan, then thumbs
    All,
}

impl Cli {
    fn layout(&self) -> SiteLayout {
        let mut layout = SiteLayout::new(&self.root);
        if let Some(p) = &self.photos {
            layout.photos_dir = p.clone();
        }
        if let Some(p) = &self.thumbs {
            layout.thumbs_dir = p.clone();
        }
        if let Some(p) = &self.csv {
            layout.checkpoint = p.clone();
        }
        if let Some(p) = &self.out {
            layout.dataset = p.clone();
        }
        layout
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            exiftool: self.exiftool.clone(),
            tools_dir: self.tools_dir.clone(),
            ..ExtractOptions::default()
        }
    }

    fn thumbnail_options(&self) -> ThumbnailOptions {
        ThumbnailOptions {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: self.quality,
            ..ThumbnailOptions::default()
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .with_writer(std::io::stderr)
        .init();

    let layout = cli.layout();
    let t_total = std::time::Instant::now();

    match &cli.command {
        Command::Scan => run_scan(&cli, &layout)?,
        Command::Build => run_build(&layout)?,
        Command::Thumbs => run_thumbs(&cli, &layout)?,
        Command::All => {
            run_scan(&cli, &layout)?;
            run_thumbs(&cli, &layout)?;
        }
    }

    tracing::debug!("done in {:.2}s", t_total.elapsed().as_secs_f64());
    Ok(())
}

fn run_scan(cli: &Cli, layout: &SiteLayout) -> anyhow::Result<()> {
    let result = geoalbum_core::scan(layout, &cli.extract_options())
        .with_context(|| format!("scanning {}", layout.photos_dir.display()))?;
    if result.skipped > 0 {
        eprintln!("skipped {} entries without a file name", result.skipped);
    }
    eprintln!("OK: wrote {} rows -> {}", result.rows_written, result.checkpoint.display());
    Ok(())
}

fn run_build(layout: &SiteLayout) -> anyhow::Result<()> {
    let result = geoalbum_core::build(layout)
        .with_context(|| format!("building dataset from {}", layout.checkpoint.display()))?;
    eprintln!("OK: wrote {} items -> {}", result.items_written, result.dataset.display());
    if result.dropped > 0 {
        eprintln!("dropped {} of {} rows", result.dropped, result.rows_read);
    }
    Ok(())
}

fn run_thumbs(cli: &Cli, layout: &SiteLayout) -> anyhow::Result<()> {
    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")?);

    let bar = pb.clone();
    let result = geoalbum_core::make_thumbnails(layout, &cli.thumbnail_options(), &move |_stage, current, total, message| {
        bar.set_length(total);
        bar.set_position(current + 1);
        bar.set_message(message.to_string());
    })
    .with_context(|| format!("generating thumbnails from {}", layout.photos_dir.display()))?;
    pb.finish_and_clear();

    eprintln!(
        "OK: wrote {} thumbnails -> {} ({} failed)",
        result.generated.len(),
        layout.thumbs_dir.display(),
        result.failed
    );
    Ok(())
}
