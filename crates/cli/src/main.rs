// labelgen CLI - DYMO label files from product spreadsheets

mod exit_codes;
mod generate;
mod session;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use labelgen_config::{settings::parse_separator, ConfigError, Settings};
use labelgen_io::{DataError, InputSpec, SourceOptions};

use exit_codes::{
    data_exit_code, EXIT_EMPTY, EXIT_ERROR, EXIT_SUCCESS, EXIT_TEMPLATE, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "labelgen")]
#[command(about = "Fill DYMO label templates from product spreadsheets")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (default: <config dir>/labelgen/settings.toml)
    #[arg(long, global = true, value_name = "PATH", env = "LABELGEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where the product data comes from.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Product data (.xlsx, .xls, .xlsb, .ods, .csv, .tsv)
    #[arg(long, short = 'd', value_name = "FILE")]
    data: PathBuf,

    /// EAN mapping file (Code, Barcode), joined onto the product data by Code
    #[arg(long, value_name = "FILE")]
    ean: Option<PathBuf>,

    /// Excel sheet name (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// CSV separator: one character or "tab" (default: detected)
    #[arg(long, value_name = "CHAR")]
    sep: Option<String>,

    /// CSV text encoding, e.g. utf-8, latin1, windows-1252
    #[arg(long)]
    encoding: Option<String>,
}

impl DataArgs {
    /// Merge with settings; command-line values win.
    fn input_spec(&self, settings: &Settings, strict: bool) -> Result<InputSpec, CliError> {
        let separator = match &self.sep {
            Some(s) => Some(parse_separator(s).map_err(CliError::config)?),
            None => settings.input.separator_byte().map_err(CliError::config)?,
        };
        Ok(InputSpec {
            data: self.data.clone(),
            ean: self.ean.clone(),
            options: SourceOptions {
                sheet: self.sheet.clone().or_else(|| settings.input.sheet.clone()),
                separator,
                encoding: self.encoding.clone().or_else(|| settings.input.encoding.clone()),
            },
            join_key: settings.input.join_key.clone(),
            mapped_field: settings.input.mapped_field.clone(),
            strict,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write one .dymo file per record (batch mode, no selection)
    #[command(after_help = "\
Examples:
  labelgen generate -t label.dymo -d products.xlsx
  labelgen generate -t label.dymo -d products.xlsx --ean ean.csv --zip
  labelgen generate -t label.dymo -d export.csv --sep ';' --encoding latin1 -o out/
  labelgen generate -t label.dymo -d products.xlsx --name '{i}_{Code}.dymo' --limit 10
  labelgen generate -t label.dymo -d products.xlsx --dry-run")]
    Generate {
        #[command(flatten)]
        data: DataArgs,

        /// DYMO label template with {{Field}} placeholders
        #[arg(long, short = 't', value_name = "FILE")]
        template: Option<PathBuf>,

        /// Output directory (default: settings output.out_dir)
        #[arg(long, short = 'o', value_name = "DIR")]
        out: Option<PathBuf>,

        /// Filename pattern, e.g. '{Code}_{Color}_{Size}.dymo'; {i} is the row number
        #[arg(long, value_name = "PATTERN")]
        name: Option<String>,

        /// Only the first N records (0: all)
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Show the validation report, one filename and a label excerpt; write nothing
        #[arg(long)]
        dry_run: bool,

        /// Write a single zip archive instead of loose files
        #[arg(long)]
        zip: bool,
    },

    /// Check columns, stable keys and template placeholders
    #[command(after_help = "\
Examples:
  labelgen validate -d products.xlsx
  labelgen validate -d products.xlsx --ean ean.csv -t label.dymo
  labelgen validate -d products.csv -t label.dymo --json

Exit codes: 3 input, 4 duplicate/empty keys, 5 template, 6 join, 8 no records")]
    Validate {
        #[command(flatten)]
        data: DataArgs,

        /// DYMO label template to check against the data columns
        #[arg(long, short = 't', value_name = "FILE")]
        template: Option<PathBuf>,

        /// Machine-readable report on stdout
        #[arg(long)]
        json: bool,
    },

    /// List product groups with record counts, largest first
    #[command(after_help = "\
Examples:
  labelgen groups -d products.xlsx
  labelgen groups -d products.xlsx --ean ean.csv --json")]
    Groups {
        #[command(flatten)]
        data: DataArgs,

        /// Machine-readable list on stdout
        #[arg(long)]
        json: bool,
    },

    /// Interactive selection: pick groups and products, then build the archive
    #[command(after_help = "\
Commands are read one per line from stdin; type `help` inside the session.

Examples:
  labelgen session -d products.xlsx -t label.dymo
  printf 'group HATS on\\ngenerate\\nsave out/\\n' | labelgen session -d products.xlsx -t label.dymo")]
    Session {
        #[command(flatten)]
        data: DataArgs,

        /// DYMO label template used by `generate`
        #[arg(long, short = 't', value_name = "FILE")]
        template: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nselection: labelgen-selection ", env!("CARGO_PKG_VERSION"),
            "\nbuild:     debug",
            "\ntarget:    ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nselection: labelgen-selection ", env!("CARGO_PKG_VERSION"),
            "\nbuild:     release",
            "\ntarget:    ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = Settings::resolve(cli.config.as_deref())
        .map_err(CliError::config)
        .and_then(|settings| match cli.command {
            Commands::Generate {
                data,
                template,
                out,
                name,
                limit,
                dry_run,
                zip,
            } => generate::cmd_generate(
                &settings,
                generate::GenerateArgs {
                    data,
                    template,
                    out,
                    name,
                    limit,
                    dry_run,
                    zip,
                },
            ),
            Commands::Validate { data, template, json } => {
                generate::cmd_validate(&settings, &data, template, json)
            }
            Commands::Groups { data, json } => generate::cmd_groups(&settings, &data, json),
            Commands::Session { data, template } => session::cmd_session(&settings, &data, template),
        });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self { code: EXIT_TEMPLATE, message: msg.into(), hint: None }
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EMPTY, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        Self::usage(err.to_string())
    }

    /// Create error from a data error with the matching exit code and a hint
    /// where the fix is not obvious from the message.
    pub fn data(err: DataError) -> Self {
        let hint = match &err {
            DataError::UnsupportedEncoding(_) => {
                Some("try utf-8, latin1 or windows-1252".to_string())
            }
            DataError::MissingColumns { .. } => Some(
                "one file needs Code, Desc, Color, Size, Group, Barcode; \
                 with --ean the product file needs Desc, Color, Size, Group"
                    .to_string(),
            ),
            DataError::JoinColumn { .. } => Some(
                "both files need the join key (input.join_key, default Code) \
                 and the EAN file the mapped column (input.mapped_field, default Barcode)"
                    .to_string(),
            ),
            DataError::DuplicateKeys { .. } => {
                Some("every product needs its own barcode; fix the duplicates and reload".to_string())
            }
            DataError::EmptyKeys { .. } => {
                Some("add the missing barcodes (in the EAN file when using --ean) and reload".to_string())
            }
            _ => None,
        };
        Self { code: data_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::general(err.to_string())
    }
}
