use std::path::PathBuf;
use std::process::ExitCode;

use dupefind::action::ActionDriver;
use dupefind::cli::{self, ParseOutcome};
use dupefind::pipeline::{Pipeline, PipelineConfig};
use dupefind::progress::{Bar, ProgressReporter, Silent};
use dupefind::report::Reporter;
use dupefind::walk;
use dupefind::{logging, DupefindError};

fn main() -> ExitCode {
    logging::init();

    let options = match cli::parse(std::env::args().skip(1)) {
        Ok(ParseOutcome::Run(options)) => *options,
        Ok(ParseOutcome::Help(text)) | Ok(ParseOutcome::Version(text)) => {
            println!("{text}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            eprintln!("dupefind: {error}");
            return ExitCode::FAILURE;
        }
    };

    run(options)
}

fn run(options: dupefind::cli::Options) -> ExitCode {
    let mut pipeline = Pipeline::new(Vec::new());
    for (cmdline_index, root) in options.roots.iter().enumerate() {
        let records = walk::walk_root(root, &options, cmdline_index);
        pipeline.extend_from_root(records, options.deterministic);
    }

    let scanned = pipeline.records().len();
    let removed_by_size = pipeline.remove_unique_sizes();
    tracing::info!(scanned, removed_by_size, "pruned files with unique sizes");

    if options.remove_identical_inode {
        let removed = pipeline.remove_identical_inodes();
        tracing::info!(removed, "dropped duplicate paths to the same inode");
    }

    pipeline.mark_items();

    let config = PipelineConfig {
        checksum_for_firstlast_bytes: options.checksum_for_firstlast_bytes,
        primary_checksum: options.primary_checksum,
        first_bytes_size: 4096,
        last_bytes_size: 4096,
        buffer_size: options.buffer_size,
        nsec_sleep: options.nsec_sleep,
    };

    let progress: Box<dyn ProgressReporter> = if options.progress {
        Box::new(Bar::new())
    } else {
        Box::new(Silent)
    };
    let reports = pipeline.run_fingerprint_stages(&config, progress.as_ref());
    for report in &reports {
        if report.read_failures > 0 {
            tracing::warn!(
                read_failures = report.read_failures,
                pruned = report.pruned,
                "fingerprint stage dropped records"
            );
        }
    }

    pipeline.mark_duplicates();
    let saveable_space = pipeline.saveable_space();

    let pairs = pipeline.duplicate_pairs();
    println!(
        "{} candidate files, {} duplicates found, {} bytes reclaimable",
        pipeline.records().len(),
        pairs.len(),
        saveable_space
    );

    let action = ActionDriver::new(options.mode, options.dry_run);
    let summary = action.apply(&pairs);
    if summary.attempted > 0 {
        println!(
            "{} actions attempted, {} succeeded, {} failed",
            summary.attempted, summary.succeeded, summary.failed
        );
    }

    if options.make_results_file {
        let output_path = PathBuf::from(&options.output_name);
        if let Err(error) =
            Reporter::write_results_file(&output_path, pipeline.records(), saveable_space)
        {
            report_fatal(&error);
            return ExitCode::FAILURE;
        }
        println!("results written to {}", output_path.display());
    }

    ExitCode::SUCCESS
}

fn report_fatal(error: &DupefindError) {
    tracing::error!(%error, "fatal error");
    eprintln!("dupefind: {error}");
}
