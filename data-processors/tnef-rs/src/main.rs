use clap::Parser;
use serde::Serialize;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::ExitCode;
use tnef_rs::config::Config;
use tnef_rs::output::FileWriter;
use tnef_rs::value::TnefDate;
use tnef_rs::{ExtractedFile, TnefError, extract};
use tracing::*;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "tnef-rs")]
#[command(about = "Decode MS-TNEF (winmail.dat) streams and extract their attachments")]
#[command(version)]
struct Cli {
    /// Input file (`-` for stdin)
    input: Option<String>,

    /// Input file (`-` for stdin)
    #[arg(short, long, conflicts_with = "input")]
    file: Option<String>,

    /// Output directory
    #[arg(short = 'C', long)]
    directory: Option<String>,

    /// List the attachments instead of extracting them
    #[arg(short = 't', long)]
    list: bool,

    /// Overwrite existing files
    #[arg(long)]
    overwrite: bool,

    /// Save to `name.N` when the target exists
    #[arg(long)]
    number_backups: bool,

    /// Honour the paths embedded in attachment names
    #[arg(long)]
    use_paths: bool,

    /// Allow embedded absolute paths (with --use-paths)
    #[arg(long)]
    absolute_paths: bool,

    /// Escape non ASCII characters and shell metacharacters in names
    #[arg(long)]
    unix_paths: bool,

    /// Continue on attribute checksum errors
    #[arg(long)]
    ignore_checksum: bool,

    /// Continue on MAPI property decoding errors
    #[arg(long)]
    ignore_encoding_errors: bool,

    /// Accept a trailing CR LF after the last attribute
    #[arg(long)]
    ignore_cruft: bool,

    /// Save the message body
    #[arg(long)]
    save_body: bool,

    /// Body preference, e.g. `rht` (RTF, then HTML, then text)
    #[arg(long)]
    body_pref: Option<String>,

    /// Base name of the saved body
    #[arg(long)]
    body_name: Option<String>,

    /// Print the listing as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump every attribute and property
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Command line flags take precedence over the configuration
    fn apply(&self, config: &mut Config) {
        if let Some(directory) = &self.directory {
            config.directory = directory.clone();
        }
        config.overwrite |= self.overwrite;
        config.number_backups |= self.number_backups;
        config.use_paths |= self.use_paths;
        config.absolute_paths |= self.absolute_paths;
        config.unix_paths |= self.unix_paths;
        config.ignore_checksum |= self.ignore_checksum;
        config.ignore_encoding_errors |= self.ignore_encoding_errors;
        config.ignore_cruft |= self.ignore_cruft;
        config.save_body |= self.save_body;
        if let Some(pref) = &self.body_pref {
            config.body_pref = pref.clone();
        }
        if let Some(name) = &self.body_name {
            config.body_name = name.clone();
        }
    }

    fn input(&self) -> &str {
        self.file
            .as_deref()
            .or(self.input.as_deref())
            .unwrap_or("-")
    }
}

#[derive(Serialize)]
struct FileSummary {
    name: Option<String>,
    path: String,
    size: usize,
    modified: Option<String>,
    mime_type: Option<String>,
    content_id: Option<String>,
}

#[derive(Serialize, Default)]
struct Listing {
    files: Vec<FileSummary>,
    body: Option<String>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    let mut config = Config::new()?;
    cli.apply(&mut config);
    config.validate()?;

    let input = cli.input();
    let res = if input == "-" {
        process_file(&cli, &config, input, std::io::stdin().lock())
    } else {
        let f = std::fs::File::open(input)?;
        process_file(&cli, &config, input, BufReader::new(f))
    };
    match res {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_not_tnef() => {
            println!("{input}: not a TNEF file");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{input}: {e}");
            eprintln!("{input}: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn list_line(cli: &Cli, file: &ExtractedFile, shown: &str) -> String {
    if cli.verbose {
        let d = file.modified.unwrap_or_default();
        format!(
            "{:11} {:04}-{:02}-{:02} {:02}:{:02} {}",
            file.data.len(),
            d.year,
            d.month,
            d.day,
            d.hour,
            d.min,
            shown
        )
    } else {
        shown.to_string()
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[instrument(level = "error", skip_all, fields(input = name))]
fn process_file<R: Read>(
    cli: &Cli,
    config: &Config,
    name: &str,
    r: R,
) -> Result<(), TnefError> {
    info!("Parsing {name}");
    let extraction = extract(r, &config.parse_options(), &config.sanitize_options())?;
    let root = Path::new(&config.directory);
    let mut writer = FileWriter::new(root, config.write_options(cli.list));
    let mut listing = Listing::default();

    for file in &extraction.files {
        let path = match writer.write(file.sanitized.as_ref(), &file.data) {
            Ok(path) => path,
            Err(e @ TnefError::FilesystemConflict(_)) => {
                error!("{e}");
                eprintln!("{e}");
                continue;
            }
            Err(e) => return Err(e),
        };
        let shown = relative(root, &path);
        if cli.json {
            listing.files.push(FileSummary {
                name: file.name.clone(),
                path: shown,
                size: file.data.len(),
                modified: file.modified.as_ref().map(TnefDate::to_string),
                mime_type: file.mime_type.clone(),
                content_id: file.content_id.clone(),
            });
        } else if cli.list || cli.verbose {
            println!("{}", list_line(cli, file, &shown));
        }
    }

    if config.save_body {
        match extraction.preferred_body(&config.body_pref) {
            Some(body) => match writer.write_body(&config.body_name, body) {
                Ok(path) => {
                    let shown = relative(root, &path);
                    if cli.json {
                        listing.body = Some(shown);
                    } else if cli.list || cli.verbose {
                        println!("{shown}");
                    }
                }
                Err(e @ TnefError::FilesystemConflict(_)) => {
                    error!("{e}");
                    eprintln!("{e}");
                }
                Err(e) => return Err(e),
            },
            None => warn!("No message body matching {:?}", config.body_pref),
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&listing) {
            Ok(s) => println!("{s}"),
            Err(e) => error!("Failed to serialize the listing: {e}"),
        }
    }
    info!(
        "Extracted {} attachment(s), {} bytes written",
        extraction.files.len(),
        writer.written()
    );
    Ok(())
}
