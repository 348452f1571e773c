// Command-line front-end.
//
// Subcommands mirror the classic tool pair: `diff` produces a patch,
// `patch` applies one, `info` inspects a patch header. All diagnostics go
// to stderr prefixed with the program name; stats print with --verbose or
// as JSON with --json.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::diff::{DiffOptions, SearcherKind};
use crate::format::{HEADER_LEN, MAGIC};
use crate::io::{apply_file, diff_file};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Binary diff/patch in the bsdiff family.
#[derive(Parser, Debug)]
#[command(
    name = "bsdelta",
    version,
    about = "Parallel suffix-array binary diff/patch",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Produce a patch turning OLD into NEW.
    Diff(DiffArgs),
    /// Apply a patch to OLD, reconstructing NEW.
    Patch(PatchArgs),
    /// Print patch header information.
    Info(InfoArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SearcherArg {
    /// Letter-bucketed binary search.
    Plain,
    /// LCP-accelerated search (more memory, fewer byte comparisons).
    Lcp,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// New file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Patch output file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Pattern-search strategy.
    #[arg(long, value_enum, default_value_t = SearcherArg::Plain)]
    searcher: SearcherArg,

    /// Worker threads (0 = one per core).
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// bzip2 compression level.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=9), default_value_t = 9)]
    compression: u32,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Reconstructed output file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Patch file to apply.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Patch file to inspect.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn refuse_overwrite(path: &Path, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "bsdelta: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return true;
    }
    false
}

fn cmd_diff(cli: &Cli, args: &DiffArgs) -> i32 {
    if refuse_overwrite(&args.patch, cli.force) {
        return 1;
    }
    let opts = DiffOptions {
        searcher: match args.searcher {
            SearcherArg::Plain => SearcherKind::Plain,
            SearcherArg::Lcp => SearcherKind::Lcp,
        },
        threads: args.threads,
        compression: args.compression,
    };

    let stats = match diff_file(&args.old, &args.new, &args.patch, &opts) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("bsdelta: diff: {e}");
            return 1;
        }
    };

    if cli.verbose > 0 && !cli.quiet {
        eprintln!(
            "bsdelta: diff: {} -> {} bytes, patch {} bytes, {} records, \
             {} blocks on {} threads, {}-bit indexes",
            stats.source_size,
            stats.target_size,
            stats.patch_size,
            stats.records,
            stats.blocks,
            stats.threads,
            stats.index_width
        );
    }

    if cli.json_output {
        let json = serde_json::json!({
            "command": "diff",
            "source_size": stats.source_size,
            "target_size": stats.target_size,
            "patch_size": stats.patch_size,
            "records": stats.records,
            "blocks": stats.blocks,
            "threads": stats.threads,
            "index_width": stats.index_width,
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).expect("stats are valid JSON")
        );
    }

    0
}

fn cmd_patch(cli: &Cli, args: &PatchArgs) -> i32 {
    if refuse_overwrite(&args.new, cli.force) {
        return 1;
    }

    let stats = match apply_file(&args.old, &args.patch, &args.new) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("bsdelta: patch: {e}");
            return 1;
        }
    };

    if cli.verbose > 0 && !cli.quiet {
        eprintln!(
            "bsdelta: patch: {} patch bytes against {} source bytes, wrote {} bytes",
            stats.patch_size, stats.source_size, stats.output_size
        );
    }

    if cli.json_output {
        let json = serde_json::json!({
            "command": "patch",
            "source_size": stats.source_size,
            "patch_size": stats.patch_size,
            "output_size": stats.output_size,
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).expect("stats are valid JSON")
        );
    }

    0
}

fn cmd_info(cli: &Cli, args: &InfoArgs) -> i32 {
    let mut file = match File::open(&args.patch) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("bsdelta: {}: {e}", args.patch.display());
            return 1;
        }
    };
    let total = match file.metadata() {
        Ok(m) => m.len(),
        Err(e) => {
            eprintln!("bsdelta: {}: {e}", args.patch.display());
            return 1;
        }
    };

    let mut header = [0u8; HEADER_LEN];
    if let Err(e) = file.read_exact(&mut header) {
        eprintln!(
            "bsdelta: {}: not a bsdelta patch: {e}",
            args.patch.display()
        );
        return 1;
    }
    if header[..16] != MAGIC {
        eprintln!("bsdelta: {}: bad magic", args.patch.display());
        return 1;
    }
    let target_len = i64::from_le_bytes(header[16..24].try_into().expect("slice is 8 bytes"));

    if cli.json_output {
        let json = serde_json::json!({
            "command": "info",
            "patch_size": total,
            "target_length": target_len,
            "payload_size": total - HEADER_LEN as u64,
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).expect("stats are valid JSON")
        );
    } else {
        println!("patch file:         {}", args.patch.display());
        println!("patch size:         {total}");
        println!("target length:      {target_len}");
        println!("compressed payload: {}", total - HEADER_LEN as u64);
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();

    let exit_code = match &cli.command {
        Cmd::Diff(args) => cmd_diff(&cli, args),
        Cmd::Patch(args) => cmd_patch(&cli, args),
        Cmd::Info(args) => cmd_info(&cli, args),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
