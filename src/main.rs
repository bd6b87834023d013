use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use configuration::{init_logging, load_config, LogLevel};
use database::{connect, BaseRepository, DbError, Repository};
use mongodb::bson::{Bson, Document};
use std::io::Write;

/// The main entry point for the docbase command-line tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = load_config().context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    let _log_guard = init_logging(&config.logging)?;

    let database_name = cli.database.unwrap_or_else(|| config.database.name.clone());
    let collection_name = cli.collection.unwrap_or_else(|| config.database.collection.clone());

    // The deadline belongs to this caller; the connect itself never retries.
    let connection = tokio::time::timeout(
        config.database.connect_timeout(),
        connect(&config.database.uri),
    )
    .await
    .with_context(|| {
        format!(
            "Timed out after {}s connecting to the document store",
            config.database.connect_timeout_secs
        )
    })?
    .context("Failed to connect to the document store")?;

    let repository: Repository<Document> =
        Repository::new(&connection, &database_name, &collection_name);
    tracing::debug!(database = %database_name, collection = %collection_name, "Repository ready.");

    // Execute the appropriate command
    let mut stdout = std::io::stdout().lock();
    let outcome = run(cli.command, &repository, &mut stdout).await;

    connection.disconnect().await;
    outcome
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Command-line access to a document collection through the generic repository.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The database to use (defaults to `database.name` from the configuration).
    #[arg(long, global = true)]
    database: Option<String>,

    /// The collection to use (defaults to `database.collection`).
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Overrides `logging.level`. `RUST_LOG` still wins.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, check the deployment answers, and disconnect.
    Ping,
    /// Insert a document given as a JSON object.
    Insert {
        /// e.g. '{"_id": "u1", "name": "Ann", "age": 30}'
        document: String,
    },
    /// Print the document with the given _id.
    Get { id: String },
    /// Print every document matching a filter.
    List {
        /// A JSON filter object, e.g. '{"age": {"$gte": 25}}'. Matches everything when omitted.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Overwrite the given fields of the document with the given _id.
    Update {
        id: String,
        /// A JSON object of field values, e.g. '{"age": 31}'.
        fields: String,
    },
    /// Delete the document with the given _id.
    Delete { id: String },
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Executes one command against the repository, writing results to `out`.
async fn run(
    command: Commands,
    repository: &dyn BaseRepository<Document>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        // Reaching this point means the connect-time ping succeeded.
        Commands::Ping => writeln!(out, "ok")?,
        Commands::Insert { document } => {
            repository.insert_one(&parse_document(&document)?).await?;
            writeln!(out, "inserted")?;
        }
        Commands::Get { id } => match repository.find_one_by_id(&id).await {
            Ok(document) => writeln!(out, "{}", render(document)?)?,
            Err(DbError::NotFound(_)) => bail!("no document with _id `{id}`"),
            Err(e) => return Err(e.into()),
        },
        Commands::List { filter } => {
            let filter = match filter {
                Some(json) => parse_document(&json)?,
                None => Document::new(),
            };
            for document in repository.find_all(filter).await? {
                writeln!(out, "{}", render(document)?)?;
            }
        }
        Commands::Update { id, fields } => {
            repository.update_one_by_id(&id, parse_document(&fields)?).await?;
            writeln!(out, "updated")?;
        }
        Commands::Delete { id } => {
            repository.delete_one_by_id(&id).await?;
            writeln!(out, "deleted")?;
        }
    }
    Ok(())
}

/// Parses a JSON object (extended JSON is accepted, e.g. `{"$oid": ...}`) into a document.
fn parse_document(json: &str) -> anyhow::Result<Document> {
    let value: serde_json::Value = serde_json::from_str(json).context("Invalid JSON")?;
    match Bson::try_from(value).context("Invalid extended JSON")? {
        Bson::Document(document) => Ok(document),
        other => bail!("expected a JSON object, got {:?}", other.element_type()),
    }
}

fn render(document: Document) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&Bson::Document(document).into_relaxed_extjson())?)
}
