use std::env::VarError;

use anyhow::{Context, Result};
use clap::Parser;
use symbio_kb::client::{
    DEFAULT_GRAPH_DEPTH, DEFAULT_LIST_LIMIT, DEFAULT_ROW_LIMIT, DEFAULT_SEARCH_LIMIT,
};
use symbio_kb::config::{ENV_API_KEY, ENV_MAX_RETRIES, ENV_TIMEOUT, ENV_URL};
use symbio_kb::runtime::{RealRuntime, Runtime};
use symbio_kb::{ClientConfig, KbClient, ListPagesQuery, NewPage, commands};

/// skb - SymbioKnowledgeBase agent API client
///
/// Search, read and edit pages of a knowledge base from the command line.
///
/// Examples:
///   skb search "deployment guide"     # Full-text search
///   skb read <PAGE_ID>               # Print a page with its markdown
#[derive(Parser, Debug)]
#[command(author, version = env!("SKB_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the knowledge base [env: SYMBIO_KB_URL, default: http://localhost:3000]
    #[arg(long = "url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Bearer token: API key or session JWT [env: SYMBIO_KB_API_KEY]
    #[arg(long = "api-key", value_name = "KEY", global = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds [env: SYMBIO_KB_TIMEOUT, default: 30]
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Retries after an HTTP 429 response [env: SYMBIO_KB_MAX_RETRIES, default: 3]
    #[arg(long, value_name = "N", global = true)]
    pub max_retries: Option<usize>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Full-text search across all pages
    Search(SearchArgs),

    /// Print a page including its markdown content
    Read(PageIdArgs),

    /// Create a new page
    Create(CreateArgs),

    /// Replace the markdown content of a page
    Update(UpdateArgs),

    /// Delete a page
    Delete(PageIdArgs),

    /// List pages with optional filtering
    List(ListArgs),

    /// List pages linking to a page
    Backlinks(PageIdArgs),

    /// Print the page link graph
    Graph(GraphArgs),

    /// Work with structured databases and their rows
    #[command(subcommand)]
    Db(DbCommands),
}

#[derive(clap::Subcommand, Debug)]
enum DbCommands {
    /// List all databases
    List,

    /// Print a database with its column schema
    Show(DatabaseIdArgs),

    /// List rows of a database
    Rows(RowsArgs),

    /// Add a row
    AddRow(AddRowArgs),

    /// Replace properties of a row
    UpdateRow(UpdateRowArgs),

    /// Delete a row
    DeleteRow(RowIdArgs),
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search query (web-search syntax, e.g. "exact phrase" or a OR b)
    pub query: String,

    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

#[derive(clap::Args, Debug)]
pub struct PageIdArgs {
    /// Page ID
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Page title
    pub title: String,

    /// Markdown body
    #[arg(long)]
    pub markdown: Option<String>,

    /// Parent page ID for nesting
    #[arg(long = "parent", value_name = "ID")]
    pub parent_id: Option<String>,

    /// Emoji or icon string
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Page ID
    #[arg(value_name = "ID")]
    pub id: String,

    /// New markdown body (replaces the existing content)
    #[arg(long)]
    pub markdown: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: u32,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Only children of this page
    #[arg(long = "parent", value_name = "ID")]
    pub parent_id: Option<String>,

    /// Case-insensitive title filter
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct GraphArgs {
    /// Centre the graph on this page
    #[arg(long = "page", value_name = "ID")]
    pub page_id: Option<String>,

    /// Link depth around the centre page
    #[arg(long, default_value_t = DEFAULT_GRAPH_DEPTH)]
    pub depth: u32,
}

#[derive(clap::Args, Debug)]
pub struct DatabaseIdArgs {
    /// Database ID
    #[arg(value_name = "DB_ID")]
    pub database_id: String,
}

#[derive(clap::Args, Debug)]
pub struct RowsArgs {
    /// Database ID
    #[arg(value_name = "DB_ID")]
    pub database_id: String,

    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    pub limit: u32,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

#[derive(clap::Args, Debug)]
pub struct AddRowArgs {
    /// Database ID
    #[arg(value_name = "DB_ID")]
    pub database_id: String,

    /// Column values as a JSON object
    #[arg(long, value_name = "JSON")]
    pub properties: String,
}

#[derive(clap::Args, Debug)]
pub struct UpdateRowArgs {
    /// Database ID
    #[arg(value_name = "DB_ID")]
    pub database_id: String,

    /// Row ID
    #[arg(value_name = "ROW_ID")]
    pub row_id: String,

    /// Column values as a JSON object
    #[arg(long, value_name = "JSON")]
    pub properties: String,
}

#[derive(clap::Args, Debug)]
pub struct RowIdArgs {
    /// Database ID
    #[arg(value_name = "DB_ID")]
    pub database_id: String,

    /// Row ID
    #[arg(value_name = "ROW_ID")]
    pub row_id: String,
}

/// Environment lookups where a command-line flag wins over the variable.
struct FlagOverrides<'a, R> {
    cli: &'a Cli,
    env: &'a R,
}

impl<R: Runtime> Runtime for FlagOverrides<'_, R> {
    fn env_var(&self, key: &str) -> std::result::Result<String, VarError> {
        let flag = match key {
            ENV_URL => self.cli.base_url.clone(),
            ENV_API_KEY => self.cli.api_key.clone(),
            ENV_TIMEOUT => self.cli.timeout.map(|secs| secs.to_string()),
            ENV_MAX_RETRIES => self.cli.max_retries.map(|n| n.to_string()),
            _ => None,
        };
        match flag {
            Some(value) => Ok(value),
            None => self.env.env_var(key),
        }
    }
}

impl Cli {
    fn client_config<R: Runtime>(&self, runtime: &R) -> Result<ClientConfig> {
        ClientConfig::from_env(&FlagOverrides { cli: self, env: runtime })
            .context("Failed to load client configuration (pass --api-key or set SYMBIO_KB_API_KEY)")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let kb = KbClient::new(&cli.client_config(&RealRuntime)?)?;

    match cli.command {
        Commands::Search(args) => {
            commands::search(&kb, &args.query, args.limit, args.offset).await?
        }
        Commands::Read(args) => commands::read(&kb, &args.id).await?,
        Commands::Create(args) => {
            let page = NewPage {
                title: args.title,
                markdown: args.markdown,
                parent_id: args.parent_id,
                icon: args.icon,
            };
            commands::create(&kb, &page).await?
        }
        Commands::Update(args) => commands::update(&kb, &args.id, &args.markdown).await?,
        Commands::Delete(args) => commands::delete(&kb, &args.id).await?,
        Commands::List(args) => {
            let query = ListPagesQuery {
                limit: args.limit,
                offset: args.offset,
                parent_id: args.parent_id,
                search: args.search,
            };
            commands::list(&kb, &query).await?
        }
        Commands::Backlinks(args) => commands::backlinks(&kb, &args.id).await?,
        Commands::Graph(args) => commands::graph(&kb, args.page_id, args.depth).await?,
        Commands::Db(command) => match command {
            DbCommands::List => commands::list_databases(&kb).await?,
            DbCommands::Show(args) => commands::show_database(&kb, &args.database_id).await?,
            DbCommands::Rows(args) => {
                commands::rows(&kb, &args.database_id, args.limit, args.offset).await?
            }
            DbCommands::AddRow(args) => {
                commands::add_row(&kb, &args.database_id, &args.properties).await?
            }
            DbCommands::UpdateRow(args) => {
                commands::update_row(&kb, &args.database_id, &args.row_id, &args.properties)
                    .await?
            }
            DbCommands::DeleteRow(args) => {
                commands::delete_row(&kb, &args.database_id, &args.row_id).await?
            }
        },
    }
    Ok(())
}
