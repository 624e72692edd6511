pub mod api;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use oracleforge_core::{BlobStore, DocumentStore, MemoryBlobs, MemoryDocs};
use oracleforge_fs::{FsBlobStore, FsDocumentStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, ValueEnum)]
pub enum StoreKind {
    /// Volatile in-memory stores (dev only)
    Memory,
    /// JSON document file + blob directory under the data dir
    File,
}

#[derive(Debug, Parser)]
#[command(name = "oracleforge", version, about = "Oracle Forge API server")]
struct Cli {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = StoreKind::File)]
    store: StoreKind,

    /// Data directory for --store file (defaults to the app data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

async fn open_stores(
    kind: &StoreKind,
    data_dir: Option<PathBuf>,
) -> Result<(Arc<dyn DocumentStore>, Arc<dyn BlobStore>)> {
    match kind {
        StoreKind::Memory => Ok((
            Arc::new(MemoryDocs::new()) as Arc<dyn DocumentStore>,
            Arc::new(MemoryBlobs::new()) as Arc<dyn BlobStore>,
        )),
        StoreKind::File => {
            let (docs, blobs) = match data_dir {
                Some(dir) => (
                    FsDocumentStore::open_with(
                        dir.join("documents.json"),
                        dir.join("backups"),
                        10,
                    )
                    .await?,
                    FsBlobStore::new(dir.join("blobs")),
                ),
                None => (
                    FsDocumentStore::open_default().await?,
                    FsBlobStore::open_default(),
                ),
            };
            Ok((Arc::new(docs), Arc::new(blobs)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Cli::parse();
    let (docs, blobs) = open_stores(&args.store, args.data_dir.clone()).await?;
    let state = Arc::new(api::routes::AppState::new(docs, blobs));
    let addr: SocketAddr = args.addr.parse()?;
    api::server::run(state, addr).await
}
