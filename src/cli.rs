//! Command-line parsing.
//!
//! The flag syntax here — single-dash, multi-character flags each taking a
//! bare following token (`-minsize 100`, not `--min-size=100`) — does not
//! fit `clap`'s long-option conventions, so this is a small hand-rolled
//! cursor over the argument list: one `match` arm per flag, immediate
//! diagnostic on a malformed value. See `DESIGN.md` for why this is the one
//! place the crate does not reach for `clap`.

use std::path::PathBuf;

use crate::action::Mode;
use crate::digest::DigestKind;
use crate::error::{DupefindError, Result};

/// Inter-file pause values accepted by `-sleep`, in milliseconds.
const ALLOWED_SLEEP_MS: [u64; 9] = [1, 2, 3, 4, 5, 10, 25, 50, 100];

const MAX_BUFFER_SIZE: usize = 128 * 1024 * 1024;

/// Fully resolved, immutable run configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Minimum file size considered, inclusive.
    pub minimum_file_size: u64,
    /// Maximum file size considered, inclusive. Already remapped from the
    /// `0 == unlimited` CLI convention to `u64::MAX`.
    pub maximum_file_size: u64,
    /// Whether traversal follows symlinks.
    pub follow_symlinks: bool,
    /// Whether the inode-dedup pass runs.
    pub remove_identical_inode: bool,
    /// Digest used for `FIRST_BYTES`/`LAST_BYTES` stages. When `-checksum
    /// none` is given, this still holds a usable kind (SHA-1) so those two
    /// stages remain meaningful even though the whole-file stage is
    /// skipped; see `DESIGN.md`.
    pub checksum_for_firstlast_bytes: DigestKind,
    /// The selected primary (whole-file) checksum, or `None` for
    /// `-checksum none`'s unsafe mode.
    pub primary_checksum: Option<DigestKind>,
    /// Read-chunk size in bytes, 1..=128 MiB.
    pub buffer_size: usize,
    /// Whether newly-discovered roots are sorted by `(depth, path)` before
    /// pipeline processing.
    pub deterministic: bool,
    /// Whether a results file is written.
    pub make_results_file: bool,
    /// Which destructive action (if any) the action driver applies.
    pub mode: Mode,
    /// Suppresses filesystem effects while still logging intended actions.
    pub dry_run: bool,
    /// Results file name.
    pub output_name: String,
    /// Inter-file pause, in nanoseconds.
    pub nsec_sleep: u64,
    /// Whether to render a progress bar.
    pub progress: bool,
    /// Positional directory roots, in command-line order.
    pub roots: Vec<PathBuf>,
}

/// What parsing the command line produced.
pub enum ParseOutcome {
    /// Proceed with a fully resolved configuration.
    Run(Box<Options>),
    /// `-h`/`-help`/`--help` was given; print this text and exit 0.
    Help(String),
    /// `-v`/`--version` was given; print this text and exit 0.
    Version(String),
}

/// Parses `args` (excluding the program name) into a [`ParseOutcome`].
pub fn parse<I, S>(args: I) -> Result<ParseOutcome>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    let mut ignore_empty_minsize: u64 = 0;
    let mut minimum_file_size: u64 = 0;
    let mut maximum_file_size: u64 = 0;
    let mut minsize_explicit = false;
    let mut follow_symlinks = false;
    let mut remove_identical_inode = false;
    let mut checksum: Option<DigestKind> = Some(DigestKind::Sha1);
    let mut buffer_size: usize = 65536;
    let mut deterministic = false;
    let mut make_results_file = true;
    let mut make_symlinks = false;
    let mut make_hardlinks = false;
    let mut delete_duplicates = false;
    let mut dry_run = false;
    let mut output_name = String::from("results.txt");
    let mut nsec_sleep: u64 = 0;
    let mut progress = false;
    let mut roots = Vec::new();

    let mut cursor = args.iter().peekable();
    while let Some(arg) = cursor.next() {
        match arg.as_str() {
            "-h" | "-help" | "--help" => return Ok(ParseOutcome::Help(usage_text())),
            "-v" | "--version" => {
                return Ok(ParseOutcome::Version(format!(
                    "dupefind {}",
                    env!("CARGO_PKG_VERSION")
                )));
            }
            "-ignoreempty" => {
                let value = parse_bool(arg, take_value(arg, &mut cursor)?)?;
                ignore_empty_minsize = if value { 1 } else { 0 };
                if !minsize_explicit {
                    minimum_file_size = ignore_empty_minsize;
                }
            }
            "-minsize" => {
                minimum_file_size = parse_u64(arg, take_value(arg, &mut cursor)?)?;
                minsize_explicit = true;
            }
            "-maxsize" => {
                maximum_file_size = parse_u64(arg, take_value(arg, &mut cursor)?)?;
            }
            "-followsymlinks" => follow_symlinks = parse_bool(arg, take_value(arg, &mut cursor)?)?,
            "-removeidentinode" => {
                remove_identical_inode = parse_bool(arg, take_value(arg, &mut cursor)?)?;
            }
            "-checksum" => checksum = parse_checksum(arg, take_value(arg, &mut cursor)?)?,
            "-buffersize" => buffer_size = parse_buffer_size(arg, take_value(arg, &mut cursor)?)?,
            "-deterministic" => deterministic = parse_bool(arg, take_value(arg, &mut cursor)?)?,
            "-makeresultsfile" => make_results_file = parse_bool(arg, take_value(arg, &mut cursor)?)?,
            "-makesymlinks" => make_symlinks = parse_bool(arg, take_value(arg, &mut cursor)?)?,
            "-makehardlinks" => make_hardlinks = parse_bool(arg, take_value(arg, &mut cursor)?)?,
            "-deleteduplicates" => delete_duplicates = parse_bool(arg, take_value(arg, &mut cursor)?)?,
            "-dryrun" | "-n" => dry_run = true,
            "-outputname" => output_name = take_value(arg, &mut cursor)?.clone(),
            "-sleep" => nsec_sleep = parse_sleep(arg, take_value(arg, &mut cursor)?)?,
            "-progress" => progress = parse_bool(arg, take_value(arg, &mut cursor)?)?,
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(DupefindError::Configuration {
                    message: format!("unknown option \"{other}\""),
                });
            }
            path => roots.push(PathBuf::from(path)),
        }
    }

    if roots.is_empty() {
        return Err(DupefindError::Configuration {
            message: "no directory roots given".to_string(),
        });
    }

    let mode = match (make_symlinks, make_hardlinks, delete_duplicates) {
        (false, false, false) => Mode::Report,
        (true, false, false) => Mode::MakeSymlinks,
        (false, true, false) => Mode::MakeHardlinks,
        (false, false, true) => Mode::DeleteDuplicates,
        _ => {
            return Err(DupefindError::Configuration {
                message: "-makesymlinks, -makehardlinks, and -deleteduplicates are mutually exclusive"
                    .to_string(),
            });
        }
    };

    let maximum_file_size = crate::pipeline::finalize_maximum_file_size(maximum_file_size);
    if minimum_file_size >= maximum_file_size {
        return Err(DupefindError::Configuration {
            message: format!(
                "-minsize ({minimum_file_size}) must be strictly less than -maxsize ({maximum_file_size})"
            ),
        });
    }

    Ok(ParseOutcome::Run(Box::new(Options {
        minimum_file_size,
        maximum_file_size,
        follow_symlinks,
        remove_identical_inode,
        checksum_for_firstlast_bytes: checksum.unwrap_or(DigestKind::Sha1),
        primary_checksum: checksum,
        buffer_size,
        deterministic,
        make_results_file,
        mode,
        dry_run,
        output_name,
        nsec_sleep,
        progress,
        roots,
    })))
}

fn take_value<'a, I: Iterator<Item = &'a String>>(flag: &str, cursor: &mut std::iter::Peekable<I>) -> Result<&'a String> {
    cursor.next().ok_or_else(|| DupefindError::Configuration {
        message: format!("option \"{flag}\" requires a value"),
    })
}

fn parse_bool(flag: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(DupefindError::Configuration {
            message: format!("option \"{flag}\" expects true/false, got \"{other}\""),
        }),
    }
}

fn parse_u64(flag: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|_| DupefindError::Configuration {
        message: format!("option \"{flag}\" expects a non-negative integer, got \"{value}\""),
    })
}

fn parse_checksum(flag: &str, value: &str) -> Result<Option<DigestKind>> {
    match value {
        "none" => Ok(None),
        "md5" => Ok(Some(DigestKind::Md5)),
        "sha1" => Ok(Some(DigestKind::Sha1)),
        "sha256" => Ok(Some(DigestKind::Sha256)),
        "sha512" => Ok(Some(DigestKind::Sha512)),
        "xxh128" => Ok(Some(DigestKind::Xxh128)),
        other => Err(DupefindError::Configuration {
            message: format!(
                "option \"{flag}\" expects one of none/md5/sha1/sha256/sha512/xxh128, got \"{other}\""
            ),
        }),
    }
}

fn parse_buffer_size(flag: &str, value: &str) -> Result<usize> {
    let size = value.parse::<usize>().map_err(|_| DupefindError::Configuration {
        message: format!("option \"{flag}\" expects a byte count, got \"{value}\""),
    })?;
    if size == 0 || size > MAX_BUFFER_SIZE {
        return Err(DupefindError::Configuration {
            message: format!("option \"{flag}\" must be between 1 and {MAX_BUFFER_SIZE} bytes, got {size}"),
        });
    }
    Ok(size)
}

fn parse_sleep(flag: &str, value: &str) -> Result<u64> {
    let ms = value.parse::<u64>().map_err(|_| DupefindError::Configuration {
        message: format!("option \"{flag}\" expects an integer number of milliseconds, got \"{value}\""),
    })?;
    if !ALLOWED_SLEEP_MS.contains(&ms) {
        return Err(DupefindError::Configuration {
            message: format!(
                "option \"{flag}\" must be one of {ALLOWED_SLEEP_MS:?} ms, got {ms}"
            ),
        });
    }
    Ok(ms * 1_000_000)
}

fn usage_text() -> String {
    let mut text = String::from("dupefind [options] path...\n\noptions:\n");
    for line in [
        "  -ignoreempty bool        true => minsize=1, false => minsize=0 (default false)",
        "  -minsize N               minimum file size considered (default 0)",
        "  -maxsize N               maximum file size considered, 0 = unlimited (default 0)",
        "  -followsymlinks bool     follow symlinks while traversing (default false)",
        "  -removeidentinode bool   drop extra paths to the same inode (default false)",
        "  -checksum KIND           none|md5|sha1|sha256|sha512|xxh128 (default sha1)",
        "  -buffersize N            read-chunk size in bytes, 1..=128MiB (default 65536)",
        "  -deterministic bool      sort each root by (depth, path) before processing (default false)",
        "  -makeresultsfile bool    write the results file (default true)",
        "  -makesymlinks bool       replace duplicates with symlinks (default false)",
        "  -makehardlinks bool      replace duplicates with hardlinks (default false)",
        "  -deleteduplicates bool   delete duplicates outright (default false)",
        "  -dryrun, -n              suppress filesystem mutations",
        "  -outputname NAME         results file name (default results.txt)",
        "  -sleep MS                pause between files: one of 1,2,3,4,5,10,25,50,100",
        "  -progress bool           render a progress bar (default false)",
        "  -h, -help, --help        print this text and exit",
        "  -v, --version            print the version and exit",
    ] {
        text.push_str(line);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Options {
        match parse(args.iter().map(|s| s.to_string())).unwrap() {
            ParseOutcome::Run(options) => *options,
            _ => panic!("expected Run outcome"),
        }
    }

    #[test]
    fn defaults_are_sha1_and_report_only() {
        let options = run(&["."]);
        assert_eq!(options.primary_checksum, Some(DigestKind::Sha1));
        assert_eq!(options.mode, Mode::Report);
        assert_eq!(options.maximum_file_size, u64::MAX);
        assert_eq!(options.output_name, "results.txt");
    }

    #[test]
    fn last_checksum_choice_wins() {
        let options = run(&["-checksum", "md5", "-checksum", "sha256", "."]);
        assert_eq!(options.primary_checksum, Some(DigestKind::Sha256));
    }

    #[test]
    fn checksum_none_keeps_firstlast_digest_usable() {
        let options = run(&["-checksum", "none", "."]);
        assert_eq!(options.primary_checksum, None);
        assert_eq!(options.checksum_for_firstlast_bytes, DigestKind::Sha1);
    }

    #[test]
    fn ignoreempty_sets_minsize_unless_overridden_after() {
        let options = run(&["-ignoreempty", "true", "."]);
        assert_eq!(options.minimum_file_size, 1);

        let options = run(&["-ignoreempty", "true", "-minsize", "50", "."]);
        assert_eq!(options.minimum_file_size, 50);
    }

    #[test]
    fn minsize_must_be_strictly_less_than_maxsize() {
        let err = parse(["-minsize", "100", "-maxsize", "100", "."].map(str::to_string)).unwrap_err();
        assert!(matches!(err, DupefindError::Configuration { .. }));
    }

    #[test]
    fn mutually_exclusive_actions_are_rejected() {
        let err = parse(
            ["-makesymlinks", "true", "-makehardlinks", "true", "."].map(str::to_string),
        )
        .unwrap_err();
        assert!(matches!(err, DupefindError::Configuration { .. }));
    }

    #[test]
    fn sleep_rejects_values_outside_the_allowed_set() {
        let err = parse(["-sleep", "7", "."].map(str::to_string)).unwrap_err();
        assert!(matches!(err, DupefindError::Configuration { .. }));
    }

    #[test]
    fn sleep_converts_milliseconds_to_nanoseconds() {
        let options = run(&["-sleep", "25", "."]);
        assert_eq!(options.nsec_sleep, 25_000_000);
    }

    #[test]
    fn help_flag_short_circuits_without_requiring_roots() {
        match parse(["--help"].map(str::to_string)).unwrap() {
            ParseOutcome::Help(text) => assert!(text.contains("dupefind [options] path...")),
            _ => panic!("expected Help outcome"),
        }
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = parse(["-nope", "."].map(str::to_string)).unwrap_err();
        assert!(matches!(err, DupefindError::Configuration { .. }));
    }

    #[test]
    fn missing_roots_is_rejected() {
        let err = parse(["-dryrun"].map(str::to_string)).unwrap_err();
        assert!(matches!(err, DupefindError::Configuration { .. }));
    }
}
