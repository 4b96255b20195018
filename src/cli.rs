//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use mediabatch_core::{DEFAULT_WORKERS, MAX_WORKERS};

/// Batch-download media from a list of URLs.
///
/// Each URL is fetched through yt-dlp in turn. A failing URL is reported and
/// skipped; the rest of the batch keeps going.
#[derive(Parser, Debug, Clone)]
#[command(name = "mediabatch")]
#[command(author, version, about)]
#[command(
    after_help = "Exit codes:\n  0    every download succeeded\n  1    some downloads failed\n  2    every download failed or the batch was rejected\n  130  interrupted"
)]
pub struct Cli {
    /// URLs to download (reads --input or piped stdin when omitted)
    #[arg(value_name = "URLS")]
    pub urls: Vec<String>,

    /// Directory downloads are written to
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Netscape-format cookie file passed to the engine
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Read URLs from a file, one per line
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Number of downloads running at once (1-16)
    #[arg(
        short = 'w',
        long,
        default_value_t = DEFAULT_WORKERS as u8,
        value_parser = clap::value_parser!(u8).range(1..=MAX_WORKERS as i64)
    )]
    pub workers: u8,

    /// Format selector passed to the engine
    #[arg(long, value_name = "SELECTOR")]
    pub format: Option<String>,

    /// Container used when merging separate audio and video streams
    #[arg(long, value_name = "EXT")]
    pub merge_format: Option<String>,

    /// File naming pattern inside the output directory
    #[arg(long, value_name = "PATTERN")]
    pub output_template: Option<String>,

    /// Replace files that already exist instead of skipping them
    #[arg(long)]
    pub overwrite: bool,

    /// Stop an item at the first engine error instead of skipping recoverable ones
    #[arg(long)]
    pub abort_on_error: bool,

    /// Reject input lines that are not http(s) URLs
    #[arg(long)]
    pub strict: bool,

    /// Path to the yt-dlp program
    #[arg(long, value_name = "PATH")]
    pub engine_bin: Option<PathBuf>,

    /// Path to the ffmpeg merge helper
    #[arg(long, value_name = "PATH", conflicts_with = "bundled")]
    pub ffmpeg: Option<PathBuf>,

    /// Use the ffmpeg shipped next to this executable (../Resources/ffmpeg)
    #[arg(long)]
    pub bundled: bool,

    /// Print the batch result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Write failed URLs to FILE, one per line
    #[arg(long, value_name = "FILE")]
    pub failed_out: Option<PathBuf>,

    /// Append every batch event to FILE
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}
