use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio::{
    AgeQuery, Caller, FsDocumentSource, IndexSettings, IndexStore, QueryEngine, QueryRequest,
    SortOrder, VisibilityMode,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Field-structured document index and query engine", long_about = None)]
struct Args {
    /// Directory holding the JSON documents
    #[arg(long, env = "FOLIO_DOCUMENTS", default_value = "./documents")]
    documents: PathBuf,

    /// Directory holding the index database
    #[arg(long, env = "FOLIO_INDEX_DIR", default_value = "./index")]
    index_dir: PathBuf,

    /// JSON settings file (field schema, tokenizer, commit interval)
    #[arg(long, env = "FOLIO_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from every document under the documents directory
    Rebuild {
        /// Discard the existing index first, even if it cannot be opened
        #[arg(long)]
        fresh: bool,
    },
    /// Index (or re-index) documents
    Insert { paths: Vec<String> },
    /// Remove documents from the index
    Remove { paths: Vec<String> },
    /// Run a query and print matching paths and titles
    Query(QueryArgs),
    /// Print index statistics as JSON
    Stats,
    /// Check index invariants
    Check,
    /// Log the path and ID tables
    Dump,
    /// Remove documents not modified within the given number of days
    Purge {
        #[arg(long)]
        max_age_days: i64,
    },
    /// Summarize documents per owner for a publication-date window
    Summary {
        #[arg(long, default_value = "")]
        from: String,
        #[arg(long, default_value = "")]
        to: String,
    },
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Free-text query over all document text
    #[arg(long)]
    freetext: Option<String>,

    /// Field query as name=text (repeatable)
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    #[arg(long)]
    years: Option<String>,
    #[arg(long)]
    months: Option<String>,
    #[arg(long)]
    weeks: Option<String>,
    #[arg(long)]
    days: Option<String>,

    /// Sort order: title, lmdate or pubdate
    #[arg(long, default_value = "lmdate")]
    order: SortOrder,

    /// Visibility mode: open or restricted
    #[arg(long, env = "FOLIO_MODE", default_value = "restricted")]
    mode: VisibilityMode,

    /// Authenticated username of the caller
    #[arg(long)]
    user: Option<String>,

    /// Caller roles, separated by commas, semicolons or whitespace
    #[arg(long, default_value = "")]
    roles: String,

    /// Caller holds the administrator capability
    #[arg(long)]
    admin: bool,

    /// Hide real titles
    #[arg(long)]
    unknown: bool,

    /// 1-based index of the first result to print
    #[arg(long)]
    first: Option<usize>,

    /// Page size
    #[arg(long)]
    max: Option<usize>,
}

fn parse_field(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, text)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), text.to_string()))
        }
        _ => Err(format!("expected name=text, got '{}'", s)),
    }
}

impl QueryArgs {
    fn request(&self) -> QueryRequest {
        let mut request = QueryRequest::new()
            .order_by(self.order)
            .unknown(self.unknown);
        if let Some(text) = &self.freetext {
            request = request.freetext(text.clone());
        }
        for (name, text) in &self.fields {
            request = request.field(name.clone(), text.clone());
        }
        request.age = AgeQuery {
            years: self.years.clone(),
            months: self.months.clone(),
            weeks: self.weeks.clone(),
            days: self.days.clone(),
        };
        request.first_result = self.first;
        request.max_results = self.max;
        request
    }

    fn caller(&self) -> Caller {
        let caller = match (&self.user, self.admin) {
            (Some(user), true) => Caller::admin(user.clone()),
            (Some(user), false) => Caller::user(user.clone()),
            (None, true) => Caller::admin("admin"),
            (None, false) => Caller::anonymous(),
        };
        caller.with_role_list(&self.roles)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("folio v{}", folio::VERSION);

    let mut settings = match &args.settings {
        Some(path) => IndexSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => IndexSettings::default(),
    };
    settings.index_dir = args.index_dir.clone();
    let source = Arc::new(FsDocumentSource::new(&args.documents));

    let store = match &args.command {
        Command::Rebuild { fresh: true } => IndexStore::recreate(settings, source)?,
        _ => IndexStore::open(settings, source).with_context(|| {
            format!(
                "opening index at {} (run `folio rebuild --fresh` if it is incompatible)",
                args.index_dir.display()
            )
        })?,
    };
    let engine = QueryEngine::new(Arc::new(store));
    let store = engine.store();

    match args.command {
        Command::Rebuild { .. } => {
            let report = store.rebuild_index()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Insert { paths } => {
            for path in &paths {
                let id = store.insert_document(path)?;
                println!("{}\t{}", id, path);
            }
        }
        Command::Remove { paths } => {
            let clean = store.remove_documents(paths.iter().map(String::as_str))?;
            if !clean {
                bail!("index tables were inconsistent; consider `folio rebuild`");
            }
        }
        Command::Query(query) => {
            let request = query.request();
            let results = engine.query(&request, query.mode, &query.caller())?;
            let page = results.page(request.first_result, request.max_results);
            for entry in page {
                println!("{}\t{}", entry.path, entry.display_title(request.unknown));
            }
            info!(total = results.len(), shown = page.len(), "query complete");
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }
        Command::Check => {
            let violations = store.check_integrity();
            for violation in &violations {
                eprintln!("{}", violation);
            }
            if !violations.is_empty() {
                bail!("{} invariant violations", violations.len());
            }
            println!("ok");
        }
        Command::Dump => store.log_state("dump"),
        Command::Purge { max_age_days } => {
            let report = engine.purge_expired(chrono::Duration::days(max_age_days))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Summary { from, to } => {
            let summary = engine.owner_summary(&from, &to);
            println!(
                "documents: {}  public: {}  published in window: {}",
                summary.total_documents, summary.public_documents, summary.published_in_window
            );
            for (owner, entries) in &summary.by_owner {
                println!("{} ({})", owner, entries.len());
                for entry in entries {
                    println!("  {}\t{}", entry.publication_date, entry.title);
                }
            }
            if !summary.unowned.is_empty() {
                println!("unowned ({})", summary.unowned.len());
                for entry in &summary.unowned {
                    println!("  {}\t{}", entry.publication_date, entry.title);
                }
            }
        }
    }

    store.close()?;
    Ok(())
}
