//! SQLForge CLI - turn mapping spreadsheets into Spark SQL expressions
//!
//! # Commands
//!
//! ```bash
//! sqlforge convert                          # Full run with the configured collaborator
//! sqlforge convert -i map.xlsx -o out.xlsx  # Explicit paths
//! sqlforge plan -i map.xlsx                 # Dry run: show direct expressions and instructions
//! sqlforge inspect -i map.xlsx              # Print the sheet as JSON records
//! sqlforge inspect -i map.xlsx --save       # ... and copy it to $DATA_PATH/Transformed_file.xlsx
//! ```
//!
//! Paths, provider and model default to the environment (`.env` is loaded
//! first); flags override them.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use sqlforge::logs::{init_logging, log_warning, LogConfig, LogFormat};
use sqlforge::transform::Step;
use sqlforge::{
    build_generator, convert_file, plan, read_mapping, tools, CancelFlag, Config, ConversionSummary,
    ConvertOptions, Provider,
};

#[derive(Parser)]
#[command(name = "sqlforge", version)]
#[command(about = "Generate Spark SQL select expressions from a mapping spreadsheet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less output (warnings and errors only)
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    quiet: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Args)]
struct InputArgs {
    /// Mapping spreadsheet (.xlsx or .csv)
    #[arg(short, long, env = "SQLFORGE_INPUT_FILE")]
    input: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate SQL expressions and write the output spreadsheet
    Convert {
        #[command(flatten)]
        input: InputArgs,

        /// Output spreadsheet
        #[arg(short, long, env = "SQLFORGE_OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Text-generation provider (ollama, anthropic)
        #[arg(short, long, env = "SQLFORGE_PROVIDER")]
        provider: Option<Provider>,

        /// Model name (default depends on provider)
        #[arg(short, long, env = "SQLFORGE_MODEL")]
        model: Option<String>,

        /// SQL dialect named in the generation rules
        #[arg(long, env = "SQLFORGE_DIALECT")]
        dialect: Option<String>,
    },

    /// Show what a conversion would do, without calling the collaborator
    Plan {
        #[command(flatten)]
        input: InputArgs,

        /// SQL dialect named in the generation rules
        #[arg(long, env = "SQLFORGE_DIALECT")]
        dialect: Option<String>,
    },

    /// Load the spreadsheet, log each record and print them as JSON
    Inspect {
        #[command(flatten)]
        input: InputArgs,

        /// Also write the records to <data-path>/Transformed_file.xlsx
        #[arg(long)]
        save: bool,

        /// Directory used by --save
        #[arg(long, env = "DATA_PATH")]
        data_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present) before clap reads env defaults
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut log_config = LogConfig::from_verbosity(cli.verbose as i8 - cli.quiet as i8);
    log_config.format = cli.log_format.into();
    log_config.with_ansi = std::io::stderr().is_terminal();
    init_logging(&log_config);

    let result = match Config::from_env() {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, mut config: Config) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Convert {
            input,
            output,
            provider,
            model,
            dialect,
        } => {
            if let Some(path) = input.input {
                config.input_file = path;
            }
            if let Some(path) = output {
                config.output_file = path;
            }
            if let Some(provider) = provider {
                config = config.with_provider(provider);
            }
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(dialect) = dialect {
                config.dialect = dialect;
            }
            cmd_convert(&config).await
        }

        Commands::Plan { input, dialect } => {
            let path = input.input.unwrap_or(config.input_file);
            cmd_plan(&path, dialect.as_deref().unwrap_or(&config.dialect))
        }

        Commands::Inspect {
            input,
            save,
            data_path,
        } => {
            let path = input.input.unwrap_or(config.input_file);
            let data_path = data_path.unwrap_or(config.data_path);
            cmd_inspect(&path, save.then_some(data_path.as_path()))
        }
    }
}

async fn cmd_convert(config: &Config) -> Result<(), Box<dyn Error>> {
    eprintln!("📄 Processing: {}", config.input_file.display());
    eprintln!("   Provider: {} ({})", config.provider, config.model);

    let generator = build_generator(config)?;

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_warning("Interrupted, stopping before the next group");
            on_signal.cancel();
        }
    });

    let options = ConvertOptions::from_config(config).with_cancel(cancel);
    let report = convert_file(
        &config.input_file,
        &config.output_file,
        generator.as_ref(),
        &options,
    )
    .await?;

    print_summary(&report.summary);
    eprintln!("   💾 Saved to: {}", config.output_file.display());
    eprintln!("\n✨ Done!");
    Ok(())
}

fn print_summary(summary: &ConversionSummary) {
    eprintln!("\n⚙️  Converted {} rows in {} groups", summary.rows, summary.groups);
    eprintln!("   Aggregate groups: {}", summary.aggregate_groups);
    eprintln!("   Direct:           {}", summary.direct);
    eprintln!("   Generated:        {}", summary.generated);
    eprintln!("   Sibling-owned:    {}", summary.sibling_owned);
    eprintln!("   Skipped:          {}", summary.skipped);
    eprintln!("   Collaborator calls: {}", summary.collaborator_calls);
}

fn cmd_plan(input: &Path, dialect: &str) -> Result<(), Box<dyn Error>> {
    eprintln!("📄 Planning: {}", input.display());

    let sheet = read_mapping(input)?;
    let (rows, planned) = plan(sheet.rows, dialect);
    eprintln!("   Rows: {}", rows.len());
    eprintln!("   Groups: {}", planned.len());

    for entry in &planned {
        println!("\n== {} ({:?}, {} rows)", entry.group.key, entry.shape, entry.group.len());
        for step in &entry.steps {
            match step {
                Step::Skip { row } => println!("-- row {}: skipped, no target_column", row + 1),
                Step::Direct { row, expression } => {
                    println!("-- row {}: direct", row + 1);
                    println!("{}", expression);
                }
                Step::Generate(request) => {
                    let siblings: Vec<String> =
                        request.siblings.iter().map(|i| (i + 1).to_string()).collect();
                    if siblings.is_empty() {
                        println!("-- row {}: instruction", request.owner + 1);
                    } else {
                        println!(
                            "-- row {}: instruction (also covers rows {})",
                            request.owner + 1,
                            siblings.join(", ")
                        );
                    }
                    println!("{}", request.instruction);
                }
            }
        }
        for index in &entry.group.members {
            if let Some(alias) = &rows[*index].exploded_alias {
                println!("-- row {}: {}", index + 1, alias.lateral_view());
            }
        }
    }

    Ok(())
}

fn cmd_inspect(input: &Path, save_to: Option<&Path>) -> Result<(), Box<dyn Error>> {
    eprintln!("📄 Reading: {}", input.display());

    let (records, saved) = tools::inspect_file(input, save_to)?;
    eprintln!("✅ Loaded {} records", records.len());
    if let Some(path) = saved {
        eprintln!("   💾 Saved to: {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
