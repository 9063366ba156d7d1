use anyhow::{ensure, Context, Result};
use cafilt::{
    io::{write_filtered, SignalMatrix},
    FilterConfig, PanTompkins, PatternFilter, ReferencePeakPolicy,
};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "pattern_filter", about = "Pattern-matched transient filter for calcium traces")]
struct Args {
    /// safetensors file with `data` [cells, T] (optional `fs`, `very_noisy`)
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path (`filtered`, optionally `mask`)
    #[arg(long)]
    output: PathBuf,

    /// Row used to build the pattern template
    #[arg(long, default_value_t = 0)]
    reference_row: usize,

    /// Extra very noisy rows (comma-separated), merged with the file's list
    #[arg(long, value_delimiter = ',')]
    very_noisy: Vec<usize>,

    /// Sampling rate in Hz; overrides the file's `fs`
    #[arg(long)]
    fs: Option<f64>,

    /// Template half-length in samples
    #[arg(long, default_value_t = 50)]
    pattern_len: usize,

    /// Keep-window half-width around correlation maxima
    #[arg(long, default_value_t = 40)]
    corr_window_size: usize,

    /// Keep-window half-width around supra-threshold samples
    #[arg(long, default_value_t = 10)]
    peak_window_size: usize,

    /// Minimum Pearson r for a match
    #[arg(long, default_value_t = 0.8)]
    corr_threshold: f64,

    /// Skip reference events too close to the edges instead of failing
    #[arg(long)]
    skip_out_of_range: bool,

    /// Also write the retention masks
    #[arg(long)]
    save_mask: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let input = SignalMatrix::load(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    let (n_cells, n_t) = input.data.dim();
    ensure!(
        args.reference_row < n_cells,
        "reference row {} out of range for {n_cells} cells",
        args.reference_row
    );

    let cfg = FilterConfig {
        corr_window_size: args.corr_window_size,
        peak_window_size: args.peak_window_size,
        corr_threshold: args.corr_threshold,
        fs: args.fs.or(input.fs).unwrap_or(FilterConfig::default().fs),
        pattern_len: args.pattern_len,
        reference_peaks: if args.skip_out_of_range {
            ReferencePeakPolicy::Skip
        } else {
            ReferencePeakPolicy::Reject
        },
    };
    info!("loaded {n_cells} cells × {n_t} samples @ {} Hz", cfg.fs);

    let mut very_noisy = input.very_noisy.clone();
    very_noisy.extend(&args.very_noisy);
    very_noisy.sort_unstable();
    very_noisy.dedup();
    info!("{} very noisy rows: {very_noisy:?}", very_noisy.len());

    let started = Instant::now();
    let reference = input.data.row(args.reference_row).to_vec();
    let filter = PatternFilter::new(&reference, cfg, PanTompkins::default())?;
    info!(
        "template from row {}: {} samples, {} events",
        args.reference_row,
        filter.template().len(),
        filter.template().n_events()
    );

    let (filtered, masks) = filter.filter_matrix_detailed(input.data.view(), &very_noisy)?;
    info!("filtered {n_cells} rows in {:.1} ms", started.elapsed().as_secs_f64() * 1000.0);

    write_filtered(&args.output, &filtered, args.save_mask.then_some(&masks))?;
    info!("written → {}", args.output.display());
    Ok(())
}
