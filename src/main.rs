use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use pgcopy_import::config::ImportConfig;
use pgcopy_import::import::JsonColumnType;
use pgcopy_import::loader::{self, LoadReport, LoadSettings, LoadTarget};
use pgcopy_import::source::naming::table_name_from_path;
use pgcopy_import::source::{CsvSource, CsvSourceOptions, JsonLines};

#[derive(Parser, Debug)]
#[command(
    name = "pgcopy-import",
    about = "Bulk load CSV or newline delimited JSON into PostgreSQL using COPY"
)]
struct Cli {
    /// Connection string; defaults to DATABASE_URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Target schema; defaults to IMPORT_SCHEMA or `import`.
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Target table; defaults to the normalized file name.
    #[arg(long, global = true)]
    table: Option<String>,

    /// Drop the target table before creating it.
    #[arg(long, global = true)]
    drop: bool,

    /// Skip unparseable rows instead of aborting the import.
    #[arg(long, global = true)]
    ignore_errors: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a CSV file into a table of TEXT columns.
    Csv(CsvArgs),
    /// Import one JSON document per line into a single JSON column.
    Json(JsonArgs),
}

#[derive(Args, Debug)]
struct CsvArgs {
    file: PathBuf,

    /// Comma separated column names to use instead of the header row.
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,

    /// Field delimiter (a single byte).
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Discard the first line when `--fields` is given.
    #[arg(long)]
    skip_header: bool,

    /// Values equal to this are loaded as NULL; defaults to IMPORT_NULL_SENTINEL or `\N`.
    #[arg(long)]
    null_sentinel: Option<String>,
}

#[derive(Args, Debug)]
struct JsonArgs {
    file: PathBuf,

    /// Name of the JSON column, used exactly as given.
    #[arg(long, default_value = "data")]
    column: String,

    /// Column type: `json` or `jsonb`.
    #[arg(long, default_value = "json")]
    data_type: JsonColumnType,
}

fn fail(message: &str) -> ! {
    let _ = writeln!(io::stderr(), "error: {message}");
    std::process::exit(1);
}

fn parse_delimiter(raw: &str) -> u8 {
    let raw = if raw == "\\t" { "\t" } else { raw };
    match raw.as_bytes() {
        [byte] => *byte,
        _ => fail(&format!("delimiter must be a single byte, got '{raw}'")),
    }
}

fn resolve_table(cli_table: Option<&str>, file: &Path) -> String {
    match cli_table {
        Some(table) => table.to_string(),
        None => table_name_from_path(file).unwrap_or_else(|| {
            fail(&format!(
                "cannot derive a table name from {}; pass --table",
                file.display()
            ))
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pgcopy_import::init_logger();

    let cli = Cli::parse();
    let config = ImportConfig::from_env();

    let database_url = match cli.database_url.clone().or(config.database_url.clone()) {
        Some(url) => url,
        None => fail("no database given; set DATABASE_URL or pass --database-url"),
    };
    let pool = pgcopy_import::db::connect(&database_url, &config).await?;

    let mut settings = LoadSettings::from_config(&config);
    settings.ignore_errors = cli.ignore_errors;
    let schema = cli.schema.clone().unwrap_or_else(|| config.schema.clone());

    let report: LoadReport = match &cli.command {
        Command::Csv(args) => {
            if let Some(sentinel) = &args.null_sentinel {
                settings.null_sentinel = sentinel.clone();
            }
            let target = LoadTarget {
                schema,
                table: resolve_table(cli.table.as_deref(), &args.file),
                drop: cli.drop,
            };
            let options = CsvSourceOptions {
                delimiter: parse_delimiter(&args.delimiter),
                fields: args.fields.clone(),
                skip_header: args.skip_header,
            };
            let source = CsvSource::open(&args.file, options)?;
            log::info!(
                "importing {} into {}.{}",
                args.file.display(),
                target.schema,
                target.table
            );
            loader::load_csv(&pool, source, &target, &settings).await?
        }
        Command::Json(args) => {
            let target = LoadTarget {
                schema,
                table: resolve_table(cli.table.as_deref(), &args.file),
                drop: cli.drop,
            };
            let source = JsonLines::open(&args.file)?;
            log::info!(
                "importing {} into {}.{}",
                args.file.display(),
                target.schema,
                target.table
            );
            loader::load_json(
                &pool,
                source,
                &target,
                &args.column,
                args.data_type,
                &settings,
            )
            .await?
        }
    };

    pool.close().await;
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
