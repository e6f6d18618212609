use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::modules::books::{BookStore, CreateBook, YearInput};
use shelf_db::Database;
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Manage the shelf book collection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate,
    /// Print every book, newest first
    List {
        /// Print JSON instead of one line per book
        #[arg(long)]
        json: bool,
    },
    /// Add a book
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        cover_url: Option<String>,
    },
    /// Remove one book by id
    Remove { id: String },
    /// Remove every book
    Clear {
        /// Confirm the removal; nothing is deleted without it
        #[arg(long)]
        yes: bool,
    },
    /// Show the effective environment and database location
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load shelf settings")?;
    shelf_telemetry::try_init(&settings.telemetry);

    if let Command::Config = cli.command {
        println!("environment: {:?}", settings.environment);
        println!("database:    {}", settings.database.path);
        println!("server:      {}:{}", settings.server.host, settings.server.port);
        return Ok(());
    }

    if let Command::Clear { yes: false } = cli.command {
        anyhow::bail!("refusing to delete every book without --yes");
    }

    let db = Database::open(&settings.database)
        .await
        .context("failed to open database")?;
    let outcome = run(cli.command, &settings, &db).await;
    db.close().await.context("failed to close database")?;
    outcome
}

async fn run(command: Command, settings: &Settings, db: &Database) -> anyhow::Result<()> {
    let registry = shelf_app::register_modules(settings, db)?;
    let applied = db.migrate(registry.collect_migrations()).await?;
    tracing::debug!(applied, "schema checked");
    let store = BookStore::new(db.clone());

    match command {
        Command::Migrate => {
            println!("applied {applied} migration(s)");
        }
        Command::List { json } => {
            let books = store.list_all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&books)?);
            } else if books.is_empty() {
                println!("no books");
            } else {
                for book in books {
                    println!("{}  {} by {} ({})", book.id, book.title, book.author, book.year);
                }
            }
        }
        Command::Add {
            title,
            author,
            year,
            cover_url,
        } => {
            let book = store
                .create(CreateBook {
                    title: Some(title),
                    author: Some(author),
                    year: Some(YearInput::from(year)),
                    cover_url,
                })
                .await?;
            println!("{}", book.id);
        }
        Command::Remove { id } => {
            let book = store.delete_by_id(&id).await?;
            println!("removed {} ({})", book.title, book.id);
        }
        Command::Clear { .. } => {
            let deleted = store.delete_all().await?;
            println!("deleted {deleted} book(s)");
        }
        Command::Config => {}
    }

    Ok(())
}
