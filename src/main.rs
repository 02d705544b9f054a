mod cli;

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use openparliament::config::{AppConfig, load_config};
use openparliament::core::error::AppError;
use openparliament::core::http_client::{SourceClient, parse_url};
use openparliament::features::elections::{EC_RESULTS_URL, import_ec_results};
use openparliament::features::hansards::alpheus::parse_string;
use openparliament::features::hansards::{
    Document, ImportOptions, import_document, refresh_xml, save_xml,
};
use openparliament::features::jobs::{JobContext, run_job};
use openparliament::features::sessions::Session;
use openparliament::server::{AppState, build_router};
use openparliament::store::Store;

use crate::cli::{Args, Command, ElectionCommand, EvidenceCommand, SessionCommand};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .init();
}

fn open_store(config: &AppConfig) -> Result<Arc<Store>, AppError> {
    Ok(Arc::new(Store::open(&config.db_path)?))
}

async fn read_file(path: &Path) -> Result<Vec<u8>, AppError> {
    tokio::fs::read(path)
        .await
        .map_err(|err| AppError::bad_request(format!("failed to read {}: {err}", path.display())))
}

fn load_document(store: &Store, id: u64) -> Result<Document, AppError> {
    store
        .get_document(id)?
        .ok_or_else(|| AppError::not_found(format!("no document {id}")))
}

async fn run(command: Command) -> Result<(), AppError> {
    if let Command::Parse { file, print_names } = &command {
        let bytes = read_file(file).await?;
        let xml = String::from_utf8_lossy(&bytes);
        let parsed = parse_string(&xml)?;
        if *print_names {
            for name in parsed.speaker_names() {
                println!("{name}");
            }
        } else {
            println!("{}", parsed.as_html());
        }
        return Ok(());
    }

    let config = Arc::new(load_config()?);
    let store = open_store(&config)?;

    match command {
        Command::Parse { .. } => {}
        Command::Job { name } => {
            let ctx = JobContext::new(config.clone(), store.clone())?;
            run_job(&ctx, &name).await?;
        }
        Command::Serve => serve(config.clone(), store.clone()).await?,
        Command::Session(SessionCommand::Add {
            parliament,
            session,
            start,
            end,
            name,
        }) => {
            let mut record = Session::new(parliament, session, start);
            record.end = end;
            if let Some(name) = name {
                record.name = name;
            }
            store.save_session(&record)?;
            info!(session = %record.id, "saved session");
        }
        Command::Reimport {
            document_id,
            preserve_sequence,
            force,
        } => {
            let document = load_document(&store, document_id)?;
            let options = ImportOptions {
                force,
                preserve_sequence,
            };
            import_document(&store, &config, document, options).await?;
        }
        Command::Refresh { document_id } => {
            let document = load_document(&store, document_id)?;
            let source = SourceClient::new(config.disable_proxy)?;
            refresh_xml(&store, &source, &config, document).await?;
        }
        Command::Evidence(EvidenceCommand::Add {
            session,
            committee_slug,
            committee_name,
            source_id,
            en,
            fr,
        }) => {
            if store.get_session(&session)?.is_none() {
                return Err(AppError::not_found(format!("no session {session}")));
            }
            if store.document_by_source_id(source_id)?.is_some() {
                return Err(AppError::bad_request(format!(
                    "document with source id {source_id} already exists"
                )));
            }
            let xml_en = read_file(&en).await?;
            let xml_fr = read_file(&fr).await?;
            let mut document = store.create_document(Document::new_evidence(
                &session,
                source_id,
                &committee_slug,
                &committee_name,
            ))?;
            save_xml(&store, &config, &mut document, &xml_en, &xml_fr, false).await?;
            info!(document = document.id, committee = %committee_slug, "registered evidence");
        }
        Command::Election(ElectionCommand::Import {
            date,
            url,
            allow_preliminary,
        }) => {
            let source = SourceClient::new(config.disable_proxy)?;
            let url = parse_url(url.as_deref().unwrap_or(EC_RESULTS_URL))?;
            let body = source.get_text(&url).await?;
            import_ec_results(&store, date, &body, allow_preliminary)?;
        }
    }

    store.flush().await
}

async fn serve(config: Arc<AppConfig>, store: Arc<Store>) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = build_router(AppState::new(config, store));

    info!(%addr, "starting server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::internal(format!("failed to bind: {err}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|err| AppError::internal(format!("server error: {err}")))?;
    Ok(())
}
