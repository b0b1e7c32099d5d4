// Entrypoint for the `langconnect` CLI.
// - Parses the command line, configures logging from `-v` and dispatches.
// - Every command ends in an exit status: non-zero when the remote call
//   failed or any batch of an upload failed.

use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use dialoguer::{Confirm, Password};
use langconnect_cli::discovery::{discover_documents, DEFAULT_DOCUMENT_PATTERN};
use langconnect_cli::models::{
    BulkDeleteRequest, DeleteBy, SearchRequest, SearchType, UpdateCollectionRequest, UploadOptions,
};
use langconnect_cli::output::{self, print_response};
use langconnect_cli::split::split_input;
use langconnect_cli::upload::{
    resolve_folder_targets, upload_folders, BatchUploader, FixedDelay, UploadConfig,
};
use langconnect_cli::config::{normalize_base_url, timeout_from_secs};
use langconnect_cli::{ApiClient, Outcome, Payload, Settings};
use serde::Serialize;
use serde_json::{Map, Value};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Interact with the LangConnect API from the command line.
#[derive(Parser, Debug)]
#[command(name = "langconnect", author, version, about)]
struct Cli {
    /// Increase verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// API base URL (overrides LANGCONNECT_API_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-request timeout in seconds (overrides LANGCONNECT_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate with LangConnect using the configured credentials
    Signin,

    /// Sign out the current user
    Signout,

    /// Sign up a new user
    Signup {
        /// Email address for signup
        #[arg(short, long)]
        email: String,

        /// Password for signup (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign in, then exchange the refresh token for a new token pair
    RefreshToken,

    /// Get current user information
    Me,

    /// Check API health status
    Health,

    /// Perform a GET request against an endpoint, e.g. 'collections' or 'auth/me'
    Get {
        endpoint: String,

        /// Query parameters as KEY=VALUE
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Perform a POST request against an endpoint
    Post {
        endpoint: String,

        /// Form data as KEY=VALUE
        #[arg(short = 'd', long = "data", value_parser = parse_key_value, conflicts_with = "json")]
        data: Vec<(String, String)>,

        /// Raw JSON payload
        #[arg(short = 'j', long = "json", value_parser = parse_json)]
        json: Option<Value>,
    },

    /// Perform a DELETE request against an endpoint
    Delete {
        endpoint: String,

        /// Query parameters as KEY=VALUE
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// List all collections
    ListCollections,

    /// Create a new collection
    CreateCollection {
        name: String,

        /// JSON metadata for the collection
        #[arg(short, long, value_parser = parse_json_object)]
        metadata: Option<Map<String, Value>>,
    },

    /// Get details of a specific collection
    GetCollection { collection_id: String },

    /// Rename a collection or replace its metadata
    UpdateCollection {
        collection_id: String,

        #[arg(short, long)]
        name: Option<String>,

        /// JSON metadata for the collection
        #[arg(short, long, value_parser = parse_json_object)]
        metadata: Option<Map<String, Value>>,
    },

    /// Delete a collection
    DeleteCollection {
        collection_id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List documents in a collection
    ListDocuments {
        collection_id: String,

        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },

    /// Search documents in a collection
    SearchDocuments {
        collection_id: String,
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        /// Search type: semantic, keyword, or hybrid
        #[arg(short = 't', long = "type", default_value_t = SearchType::Semantic)]
        search_type: SearchType,

        /// JSON metadata filter
        #[arg(short, long, value_parser = parse_json_object)]
        filter: Option<Map<String, Value>>,
    },

    /// Delete one document from a collection
    DeleteDocument {
        collection_id: String,
        document_id: String,

        /// Identifier kind: document_id or file_id
        #[arg(long, default_value = "document_id")]
        delete_by: DeleteBy,
    },

    /// Delete several documents from a collection
    BulkDeleteDocuments {
        collection_id: String,

        #[arg(long = "document-id")]
        document_ids: Vec<String>,

        #[arg(long = "file-id")]
        file_ids: Vec<String>,
    },

    /// Split CSV file(s) into individual documents (header + one row each)
    Split {
        /// Path to a CSV file or a folder containing CSV files
        input: PathBuf,

        /// Output directory for split documents
        #[arg(short, long, default_value = "split_documents")]
        output: PathBuf,

        /// File pattern to match when input is a folder
        #[arg(short, long, default_value = "*.csv")]
        pattern: String,
    },

    /// Upload the documents of one folder to a collection in batches
    Upload {
        collection_id: String,
        folder: PathBuf,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Upload every sub-folder of ROOT to the collection named after it
    UploadAll {
        root: PathBuf,

        /// Prefix prepended to folder names before matching collections
        #[arg(long)]
        prefix: Option<String>,

        /// Create collections that do not exist yet
        #[arg(long)]
        create_missing: bool,

        #[command(flatten)]
        batch: BatchArgs,
    },
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Document file pattern inside each folder
    #[arg(long, default_value = DEFAULT_DOCUMENT_PATTERN)]
    pattern: String,

    /// Files per upload request
    #[arg(short, long, default_value_t = default_batch_size())]
    batch_size: NonZeroUsize,

    /// Pause between batches, in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    /// Extra attempts for a failed batch
    #[arg(long, default_value_t = 0)]
    retries: u32,

    #[arg(long, default_value_t = 1000)]
    chunk_size: u32,

    #[arg(long, default_value_t = 200)]
    chunk_overlap: u32,

    /// JSON array of per-file metadata, passed through to the server
    #[arg(long)]
    metadatas_json: Option<String>,
}

impl BatchArgs {
    fn config(&self) -> UploadConfig {
        UploadConfig {
            batch_size: self.batch_size,
            max_retries: self.retries,
            options: UploadOptions {
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
                metadatas_json: self.metadatas_json.clone(),
            },
        }
    }

    fn pacer(&self) -> FixedDelay {
        FixedDelay(Duration::from_millis(self.delay_ms))
    }
}

fn default_batch_size() -> NonZeroUsize {
    UploadConfig::default().batch_size
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Expected KEY=VALUE format, received '{raw}'."))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON payload: {e}"))
}

fn parse_json_object(raw: &str) -> Result<Map<String, Value>, String> {
    match parse_json(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err("expected a JSON object".into()),
    }
}

fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn client(cli: &Cli) -> anyhow::Result<ApiClient> {
    let mut settings = Settings::from_env()?;
    if let Some(url) = &cli.base_url {
        settings.base_url = normalize_base_url(url)?;
    }
    if let Some(secs) = cli.timeout {
        settings = settings.with_timeout(timeout_from_secs(secs)?);
    }
    Ok(ApiClient::new(&settings)?)
}

fn status(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Print a typed result; an absent result is a failure.
fn respond<T: Serialize>(response: Option<T>) -> ExitCode {
    print_response(response.as_ref());
    status(response.is_some())
}

/// Print a raw outcome; failures print the server's error record.
fn respond_outcome(outcome: Outcome) -> ExitCode {
    print_response(outcome.to_json().as_ref());
    status(outcome.is_success())
}

fn report(ok: bool, done: &str, failed: &str) -> ExitCode {
    if ok {
        output::success(done);
    } else {
        output::failure(failed);
    }
    status(ok)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    init_logging(cli.verbose)?;

    let code = match &cli.command {
        Command::Signin => {
            let ok = client(&cli)?.authenticate()?;
            report(
                ok,
                "Successfully authenticated with LangConnect.",
                "Authentication failed. Check logs for details.",
            )
        }
        Command::Signout => {
            let ok = client(&cli)?.signout()?;
            report(ok, "Successfully signed out.", "Sign out failed. Check logs for details.")
        }
        Command::Signup { email, password } => {
            let password = match password {
                Some(p) => p.clone(),
                None => Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Repeat password", "Passwords do not match")
                    .interact()?,
            };
            match client(&cli)?.signup(email, &password)? {
                Some(tokens) => {
                    output::success("Successfully signed up and authenticated.");
                    respond(Some(tokens))
                }
                None => report(false, "", "Signup failed. Check logs for details."),
            }
        }
        Command::RefreshToken => {
            let mut client = client(&cli)?;
            if !client.authenticate()? {
                bail!("Initial sign-in failed. Cannot refresh token.");
            }
            let ok = client.refresh()?;
            report(ok, "Access token refreshed successfully.", "Failed to refresh access token.")
        }
        Command::Me => respond(client(&cli)?.current_user()?),
        Command::Health => respond_outcome(client(&cli)?.health_check()?),
        Command::Get { endpoint, params } => respond_outcome(client(&cli)?.get(endpoint, params)?),
        Command::Post {
            endpoint,
            data,
            json,
        } => {
            let payload = match (json, data.is_empty()) {
                (Some(body), _) => Payload::Json(body.clone()),
                (None, false) => Payload::Form(data.clone()),
                (None, true) => Payload::Empty,
            };
            respond_outcome(client(&cli)?.post(endpoint, payload)?)
        }
        Command::Delete { endpoint, params } => {
            respond_outcome(client(&cli)?.delete(endpoint, params, Payload::Empty)?)
        }
        Command::ListCollections => respond(client(&cli)?.list_collections()?),
        Command::CreateCollection { name, metadata } => {
            respond(client(&cli)?.create_collection(name, metadata.clone())?)
        }
        Command::GetCollection { collection_id } => {
            respond(client(&cli)?.get_collection(collection_id)?)
        }
        Command::UpdateCollection {
            collection_id,
            name,
            metadata,
        } => {
            if name.is_none() && metadata.is_none() {
                bail!("Nothing to update: pass --name and/or --metadata.");
            }
            let update = UpdateCollectionRequest {
                name: name.clone(),
                metadata: metadata.clone(),
            };
            respond(client(&cli)?.update_collection(collection_id, &update)?)
        }
        Command::DeleteCollection { collection_id, yes } => {
            let confirmed = *yes
                || Confirm::new()
                    .with_prompt(format!("Delete collection {collection_id}?"))
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            let ok = client(&cli)?.delete_collection(collection_id)?;
            report(ok, "Collection deleted successfully.", "Failed to delete collection.")
        }
        Command::ListDocuments {
            collection_id,
            limit,
            offset,
        } => respond(client(&cli)?.list_documents(collection_id, *limit, *offset)?),
        Command::SearchDocuments {
            collection_id,
            query,
            limit,
            search_type,
            filter,
        } => {
            let search = SearchRequest {
                query: query.clone(),
                limit: *limit,
                search_type: *search_type,
                filter: filter.clone(),
            };
            respond(client(&cli)?.search_documents(collection_id, &search)?)
        }
        Command::DeleteDocument {
            collection_id,
            document_id,
            delete_by,
        } => respond_outcome(client(&cli)?.delete_document(collection_id, document_id, *delete_by)?),
        Command::BulkDeleteDocuments {
            collection_id,
            document_ids,
            file_ids,
        } => {
            let request = BulkDeleteRequest {
                document_ids: (!document_ids.is_empty()).then(|| document_ids.clone()),
                file_ids: (!file_ids.is_empty()).then(|| file_ids.clone()),
            };
            respond(client(&cli)?.bulk_delete_documents(collection_id, &request)?)
        }
        Command::Split {
            input,
            output: output_dir,
            pattern,
        } => split(input, output_dir, pattern)?,
        Command::Upload {
            collection_id,
            folder,
            batch,
        } => upload(&cli, collection_id, folder, batch)?,
        Command::UploadAll {
            root,
            prefix,
            create_missing,
            batch,
        } => upload_all(&cli, root, prefix.as_deref(), *create_missing, batch)?,
    };
    Ok(code)
}

fn split(input: &Path, output_dir: &Path, pattern: &str) -> anyhow::Result<ExitCode> {
    let report = split_input(input, output_dir, pattern)?;
    for file in &report.files {
        match &file.result {
            Ok(count) => println!(
                "✓ Created {} documents from '{}'",
                count,
                file.source.display()
            ),
            Err(e) => output::failure(&format!(
                "✗ Error processing '{}': {}",
                file.source.display(),
                e
            )),
        }
    }
    println!();
    let failed = report.failed();
    if failed == 0 {
        output::success(&format!(
            "Successfully created {} documents in '{}'",
            report.total_documents(),
            output_dir.display()
        ));
    } else {
        output::failure(&format!(
            "Created {} documents in '{}'; {} of {} files failed",
            report.total_documents(),
            output_dir.display(),
            failed,
            report.files.len()
        ));
    }
    Ok(status(failed == 0))
}

fn upload(
    cli: &Cli,
    collection_id: &str,
    folder: &Path,
    batch: &BatchArgs,
) -> anyhow::Result<ExitCode> {
    let files = discover_documents(folder, &batch.pattern)
        .with_context(|| format!("listing documents in '{}'", folder.display()))?;
    println!("Found {} documents to upload", files.len());
    println!("Uploading to collection: {collection_id}");

    let mut client = client(cli)?;
    client.ensure_authenticated()?;

    let bar = output::batch_progress(0);
    let summary = BatchUploader::new(&mut client, batch.pacer(), batch.config())
        .with_reporter(|r| {
            bar.suspend(|| println!("{}", output::batch_line(r)));
            bar.set_length(r.total as u64);
            bar.set_position(r.number as u64);
        })
        .run(collection_id, &files)?;
    bar.finish_and_clear();

    output::print_upload_summary(&summary);
    Ok(status(summary.is_complete()))
}

fn upload_all(
    cli: &Cli,
    root: &Path,
    prefix: Option<&str>,
    create_missing: bool,
    batch: &BatchArgs,
) -> anyhow::Result<ExitCode> {
    let mut client = client(cli)?;
    client.ensure_authenticated()?;

    let (targets, skipped) = resolve_folder_targets(&mut client, root, prefix, create_missing)
        .with_context(|| format!("matching folders under '{}'", root.display()))?;
    println!(
        "Found {} folders with a matching collection ({} skipped)",
        targets.len(),
        skipped.len()
    );

    let bar = output::batch_progress(0);
    let mut uploader = BatchUploader::new(&mut client, batch.pacer(), batch.config())
        .with_reporter(|r| {
            bar.suspend(|| println!("{}", output::batch_line(r)));
            bar.set_length(r.total as u64);
            bar.set_position(r.number as u64);
        });
    let mut run = upload_folders(&mut uploader, &targets, &batch.pattern)?;
    drop(uploader);
    bar.finish_and_clear();

    run.skipped_folders.extend(skipped);
    output::print_run_summary(&run);
    Ok(status(run.batches_failed() == 0 && run.skipped_folders.is_empty()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            output::failure(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}
