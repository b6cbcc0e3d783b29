//! CLI harness for the Pass client stack
//!
//! - `demo`: item lifecycle against the in-memory server and a throwaway
//!   encrypted database
//! - `refresh`: refresh shares and items from a live endpoint into a local
//!   database

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pass_client::{
    shared, CancelToken, ClientConfig, HttpPassApi, InMemoryPassServer, ItemRepository, PassApi,
    Session, ShareKeyRepository, ShareRepository,
};
use pass_core::{AddressKey, ItemContent, PrivateKey, VaultContent};
use pass_storage_sqlite::{
    derive_key_bytes, generate_salt, Database, EncryptionAlgorithm, EncryptionKey, MasterKey,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const DB_PASSPHRASE_ENV: &str = "PASS_DB_PASSPHRASE";
const KEY_PASSPHRASE_ENV: &str = "PASS_KEY_PASSPHRASE";

#[derive(Parser)]
#[command(name = "pass-harness")]
#[command(about = "Pass client testing harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, trash and restore an item against the in-memory server
    Demo,

    /// Refresh shares and items from a live endpoint
    Refresh {
        /// API base URL
        #[arg(short, long, default_value = pass_client::DEFAULT_API_URL)]
        endpoint: String,

        /// Session UID
        #[arg(long)]
        uid: String,

        /// Access token
        #[arg(long)]
        token: String,

        /// Only refresh this share
        #[arg(long)]
        share_id: Option<String>,

        /// Local database path. The passphrase is read from PASS_DB_PASSPHRASE.
        #[arg(long)]
        db: PathBuf,

        /// Armored locked address key. The passphrase is read from PASS_KEY_PASSPHRASE.
        #[arg(long)]
        address_key: PathBuf,

        /// Address ID
        #[arg(long)]
        address_id: String,

        /// Address email
        #[arg(long)]
        email: String,
    },
}

struct Repositories {
    keys: Arc<ShareKeyRepository>,
    shares: ShareRepository,
    items: ItemRepository,
}

fn repositories(api: Arc<dyn PassApi>, db: Database, address: AddressKey, config: ClientConfig) -> Repositories {
    let db = shared(db);
    let keys = Arc::new(ShareKeyRepository::new(api.clone(), db.clone(), address));
    Repositories {
        shares: ShareRepository::new(api.clone(), db.clone(), keys.clone()),
        items: ItemRepository::new(api, db, keys.clone(), config),
        keys,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => run_demo().await?,
        Commands::Refresh {
            endpoint,
            uid,
            token,
            share_id,
            db,
            address_key,
            address_id,
            email,
        } => {
            let address = load_address_key(&address_key, address_id, email)?;
            let session = Session {
                uid,
                access_token: token,
            };
            run_refresh(endpoint, session, share_id, &db, address).await?;
        }
    }

    Ok(())
}

async fn run_demo() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db = Database::open(
        dir.path().join("demo.db"),
        &EncryptionKey::from_bytes(generate_salt()),
        MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305),
    )?;

    let server = Arc::new(InMemoryPassServer::new());
    let address = AddressKey::generate("demo-address", "demo@proton.me");
    let vault = VaultContent {
        name: "Demo".into(),
        ..Default::default()
    };
    let share = server.create_vault(&address, "demo-share", "r1", &vault)?;
    let repos = repositories(server.clone(), db, address, ClientConfig::default());
    let cancel = CancelToken::new();

    repos.shares.refresh_shares().await?;
    info!("Vault: {}", repos.shares.get_vault_content(&share.share_id).await?.name);

    let content = ItemContent::login("Example", "user", "correct horse", vec!["https://example.com".into()]);
    let created = repos.items.create_item(&share.share_id, &content).await?;
    info!(
        "Created {} at revision {} with rotation {}",
        created.item_id(),
        created.item.revision,
        created.item.rotation_id
    );

    repos.items.trash_items(&[created.clone()], &cancel).await?;
    repos.items.untrash_items(&[created.clone()], &cancel).await?;
    let restored = repos
        .items
        .get_item(&share.share_id, created.item_id())?
        .context("item missing after untrash")?;
    info!(
        "Restored {} at revision {} ({})",
        restored.item_id(),
        restored.item.revision,
        restored.item.state
    );

    let mut ghost = restored.clone();
    ghost.item.item_id = "no-such-item".into();
    let outcome = repos.items.trash_items(&[restored, ghost], &cancel).await?;
    info!("Batch trash: {} succeeded", outcome.succeeded.len());
    for failed in &outcome.failed {
        warn!("  {} failed: {:?}", failed.item_id, failed.reason);
    }

    Ok(())
}

async fn run_refresh(
    endpoint: String,
    session: Session,
    share_id: Option<String>,
    db_path: &Path,
    address: AddressKey,
) -> anyhow::Result<()> {
    let config = ClientConfig {
        base_url: endpoint,
        ..ClientConfig::from_env()
    };
    let api: Arc<dyn PassApi> = Arc::new(HttpPassApi::new(config.clone(), session)?);
    let db = open_database(db_path)?;
    let repos = repositories(api, db, address, config);
    let cancel = CancelToken::new();

    let share_ids = match share_id {
        Some(id) => vec![id],
        None => repos
            .shares
            .refresh_shares()
            .await?
            .into_iter()
            .map(|s| s.share_id)
            .collect(),
    };

    let pb = ProgressBar::new(share_ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut stored = 0;
    let mut rejected = 0;
    for share_id in &share_ids {
        pb.set_message(share_id.clone());
        repos.keys.refresh_share_keys(share_id).await?;
        let report = repos.items.refresh_items(share_id, &cancel).await?;
        stored += report.stored;
        rejected += report.rejected.len();
        for item in &report.rejected {
            warn!("Rejected {} ({}): {}", item.item_id, item.category, item.reason);
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    info!(
        "Refreshed {} shares: {} items stored, {} rejected",
        share_ids.len(),
        stored,
        rejected
    );
    Ok(())
}

fn load_address_key(path: &Path, address_id: String, email: String) -> anyhow::Result<AddressKey> {
    let armored = std::fs::read_to_string(path)
        .with_context(|| format!("reading address key {}", path.display()))?;
    let passphrase = std::env::var(KEY_PASSPHRASE_ENV).with_context(|| format!("{} is not set", KEY_PASSPHRASE_ENV))?;
    let key = PrivateKey::unlock(&armored, &passphrase, "addressKey")?;
    Ok(AddressKey::new(address_id, email, key))
}

/// Open the harness database. Keys derive from the passphrase and a salt
/// stored next to the database file.
fn open_database(path: &Path) -> anyhow::Result<Database> {
    let passphrase =
        std::env::var(DB_PASSPHRASE_ENV).with_context(|| format!("{} is not set", DB_PASSPHRASE_ENV))?;

    let salt_path = path.with_extension("salt");
    let salt = match std::fs::read(&salt_path) {
        Ok(salt) => salt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let salt = generate_salt().to_vec();
            std::fs::write(&salt_path, &salt)?;
            salt
        }
        Err(e) => return Err(e.into()),
    };

    let db_key = EncryptionKey::from_passphrase(&passphrase, &salt)?;
    let main_key_bytes = derive_key_bytes(&format!("{}/main", passphrase), &salt)?;
    let main_key = MasterKey::from_bytes(&main_key_bytes, EncryptionAlgorithm::ChaCha20Poly1305)?;
    Ok(Database::open(path, &db_key, main_key)?)
}
