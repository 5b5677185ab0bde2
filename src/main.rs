use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sql_console::backend::{create_sample_database, Backend};
use sql_console::console::{QueryOutcome, ResultSet, Session};
use sql_console::ingestion::{IngestionPipeline, RowSet, TabularSource};
use sql_console::insight::{InsightContext, InsightGenerator, OpenAiChatClient};
use sql_console::{viz, ConsoleConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sql-console")]
#[command(about = "Query SQLite databases and turn CSV/JSON uploads into tables")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show format, row count and columns of a CSV or JSON file
    Inspect {
        file: PathBuf,
    },
    /// Print the first records of a CSV or JSON file
    Preview {
        file: PathBuf,

        #[arg(short = 'n', long, default_value_t = 5)]
        rows: usize,
    },
    /// Convert a CSV or JSON file into a new SQLite database
    Convert {
        file: PathBuf,

        /// Name of the created table
        #[arg(short, long, default_value = "data")]
        table: String,

        /// Keep a seeded random sample of this many rows (0 keeps all)
        #[arg(short, long)]
        sample_size: Option<usize>,

        /// Directory for the database file (default: SQL_CONSOLE_DATA_DIR)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Print the CREATE TABLE and INSERT script instead of writing a database
        #[arg(long)]
        emit_sql: bool,
    },
    /// Run one statement against a SQLite database
    Query {
        #[arg(long)]
        db: PathBuf,

        sql: String,

        /// Print rows as CSV
        #[arg(long)]
        csv: bool,
    },
    /// Create the sample employees/departments database
    Sample {
        #[arg(short, long, default_value = "sample.db")]
        out: PathBuf,
    },
    /// Run a query and ask the model about its result
    Insight {
        #[arg(long)]
        db: PathBuf,

        sql: String,

        /// Specific analysis to ask for
        #[arg(short, long)]
        request: Option<String>,

        /// Ask for chart suggestions instead of general insights
        #[arg(long, conflicts_with_all = ["explain", "generate"])]
        visualize: bool,

        /// Ask for a step-by-step explanation of the query
        #[arg(long, conflicts_with = "generate")]
        explain: bool,

        /// Ask for a new query answering this request, given the database schema
        #[arg(long)]
        generate: Option<String>,

        /// OpenAI API key (or set OPENAI_API_KEY env var)
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConsoleConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Inspect { file } => inspect(&config, file),
        Commands::Preview { file, rows } => preview(&config, file, rows),
        Commands::Convert {
            file,
            table,
            sample_size,
            out_dir,
            emit_sql,
        } => {
            if emit_sql {
                emit_sql_script(&config, &file, &table, sample_size)
            } else {
                convert(&config, file, table, sample_size, out_dir)
            }
        }
        Commands::Query { db, sql, csv } => query(db, sql, csv),
        Commands::Sample { out } => {
            create_sample_database(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            println!("Sample database created at {}", out.display());
            Ok(())
        }
        Commands::Insight {
            db,
            sql,
            request,
            visualize,
            explain,
            generate,
            api_key,
        } => {
            let mode = if visualize {
                InsightMode::Visualize
            } else if explain {
                InsightMode::Explain
            } else if let Some(text) = generate {
                InsightMode::Generate(text)
            } else {
                InsightMode::Analyze(request)
            };
            insight(&config, db, sql, mode, api_key).await
        }
    }
}

fn open_source(file: &Path) -> Result<TabularSource<std::fs::File>> {
    TabularSource::open(file).with_context(|| format!("Failed to open {}", file.display()))
}

fn inspect(config: &ConsoleConfig, file: PathBuf) -> Result<()> {
    let pipeline = IngestionPipeline::with_limits(config.ingestion_limits());
    let mut source = open_source(&file)?;
    let info = pipeline.inspect(&mut source)?;

    println!("File:    {}", file.display());
    println!("Format:  {}", info.format.label());
    if let Some(shape) = &info.json_shape {
        println!("Shape:   {:?}", shape);
    }
    println!("Size:    {:.2} MB", info.size_mb());
    println!("Rows:    {}", info.row_count);
    println!("Columns: {}", info.column_count);
    for name in &info.column_names {
        println!("  - {}", name);
    }
    if let Some(sample) = config.suggested_sample(info.row_count) {
        println!(
            "\nLarge source: consider --sample-size {} when converting",
            sample
        );
    }
    Ok(())
}

fn preview(config: &ConsoleConfig, file: PathBuf, n: usize) -> Result<()> {
    let pipeline = IngestionPipeline::with_limits(config.ingestion_limits());
    let mut source = open_source(&file)?;
    let rows = pipeline.preview(&mut source, n)?;
    print_rows(&rows);
    Ok(())
}

fn emit_sql_script(
    config: &ConsoleConfig,
    file: &Path,
    table: &str,
    sample_size: Option<usize>,
) -> Result<()> {
    let pipeline = IngestionPipeline::with_limits(config.ingestion_limits());
    let target = pipeline.ingest(open_source(file)?, table, sample_size)?;
    print!("{}", target.to_sql_script());
    Ok(())
}

fn convert(
    config: &ConsoleConfig,
    file: PathBuf,
    table: String,
    sample_size: Option<usize>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let pipeline = IngestionPipeline::with_limits(config.ingestion_limits());
    let source = open_source(&file)?;
    let dir = out_dir.unwrap_or_else(|| config.data_dir.clone());

    let mut session = Session::new();
    let converted = session.convert_upload(&pipeline, source, &table, sample_size, &dir)?;
    info!(session = %session.id(), "conversion finished");

    println!(
        "Created table '{}' with {} rows in {}",
        converted.table_name,
        converted.row_count,
        converted.path.display()
    );
    println!("\nQuick actions:");
    for action in session.quick_actions()? {
        println!("  {:<24} {}", action.label, action.query);
    }
    Ok(())
}

fn connect(db: PathBuf) -> Result<Session> {
    let mut session = Session::new();
    let tables = session
        .connect(Backend::UploadedFile { path: db.clone() })
        .with_context(|| format!("Failed to connect to {}", db.display()))?;
    info!(tables = ?tables, "database opened");
    Ok(session)
}

fn query(db: PathBuf, sql: String, as_csv: bool) -> Result<()> {
    let mut session = connect(db)?;
    match session.execute(&sql)? {
        QueryOutcome::Rows(result) if as_csv => print!("{}", result.to_csv()?),
        QueryOutcome::Rows(result) => print_result(&result),
        QueryOutcome::Affected(n) => println!("Query executed successfully. {} rows affected.", n),
    }
    Ok(())
}

enum InsightMode {
    Analyze(Option<String>),
    Visualize,
    Explain,
    Generate(String),
}

async fn insight(
    config: &ConsoleConfig,
    db: PathBuf,
    sql: String,
    mode: InsightMode,
    api_key: Option<String>,
) -> Result<()> {
    let api_key = api_key
        .or_else(|| config.api_key.clone())
        .context("An API key is required: pass --api-key or set OPENAI_API_KEY")?;

    let mut session = connect(db)?;
    let result = match session.execute(&sql)? {
        QueryOutcome::Rows(result) => result,
        QueryOutcome::Affected(_) => anyhow::bail!("Insights need a query that returns rows"),
    };

    let backend_type = session.backend().map(|b| b.driver_name()).unwrap_or("sqlite");
    let mut generator = InsightGenerator::new(OpenAiChatClient::new(
        api_key,
        config.llm_base_url.clone(),
        config.llm_model.clone(),
    ));
    generator.update_context(InsightContext::from_result(
        session.last_query(),
        Some(&result),
        backend_type,
    ));

    let reply = match mode {
        InsightMode::Visualize => {
            println!("Suggested charts:");
            for chart in viz::suggest(&result) {
                println!("  {}: {}", chart.title(), chart.description());
            }
            println!();
            generator.suggest_visualizations().await?
        }
        InsightMode::Explain => generator.explain_query(&sql).await?,
        InsightMode::Generate(text) => {
            let schema = session.schema_info()?;
            generator.generate_sql(&text, Some(&schema)).await?
        }
        InsightMode::Analyze(request) => generator.analyze_data(request.as_deref()).await?,
    };
    println!("{}", reply);
    Ok(())
}

fn print_table(columns: &[String], rows: &[Vec<sql_console::ingestion::CellValue>]) {
    println!("{}", columns.join(" | "));
    println!("{}", "-".repeat(columns.iter().map(|c| c.len() + 3).sum::<usize>()));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", cells.join(" | "));
    }
}

fn print_rows(rows: &RowSet) {
    print_table(rows.columns(), rows.rows());
    println!("\n({} rows)", rows.row_count());
}

fn print_result(result: &ResultSet) {
    print_table(result.columns(), result.rows());
    println!("\nQuery executed successfully. Returned {} rows.", result.row_count());
}
