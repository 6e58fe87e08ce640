use async_trait::async_trait;
use clap::{Parser, Subcommand};
use seo_forge::config::{self, ForgeConfig};
use seo_forge::credits::{MemoryLedger, User};
use seo_forge::enhance::{ChatCompletionsEnhancer, EnhanceError, TextEnhancer};
use seo_forge::output;
use seo_forge::service::{GenerateRequest, PackageTarget, SeoService, ServiceError};
use seo_forge::session::{Reclaimer, SessionId, SessionStore, SystemClock};
use seo_forge::upload::Upload;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seo-forge")]
#[command(about = "Generate SEO tags, icon sets and sitemaps for a website")]
#[command(long_about = "\
Generate SEO tags, icon sets and sitemaps for a website

Each run allocates a private session directory:

  sessions/
  └── {session-id}/
      ├── complete.html            # Full example page with every tag
      ├── meta-tags.html           # Basic meta tags
      ├── opengraph-tags.html      # Open Graph tags
      ├── twitter-tags.html        # Twitter Card tags
      ├── structured-data.json     # JSON-LD WebSite
      ├── robots.txt
      ├── sitemap.xml
      ├── site.webmanifest         # Only with --logo
      ├── browserconfig.xml        # Only with --logo
      ├── icons/                   # Favicons, touch icons, tiles, og-image
      └── temp/                    # Download archives

Sessions older than the configured TTL are removed by 'seo-forge sweep'
(one pass) or 'seo-forge watch' (every sweep_interval_secs until Ctrl-C).

Run 'seo-forge gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Sessions root (overrides the config file)
    #[arg(long, global = true)]
    sessions: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the asset set into a new session
    Generate {
        /// Site title
        #[arg(long)]
        title: String,
        /// Site description
        #[arg(long)]
        description: String,
        /// Canonical site URL
        #[arg(long)]
        url: String,
        /// File with one site link per line
        #[arg(long)]
        links: Option<PathBuf>,
        /// Logo to build icons from (PNG, JPEG or SVG)
        #[arg(long)]
        logo: Option<PathBuf>,
        /// Also write the download archive
        #[arg(long)]
        package: bool,
    },
    /// Write the download archive for an existing session
    Package {
        /// Session id printed by `generate`
        session: String,
    },
    /// Improve a description through the configured text service
    Enhance {
        /// Description to improve
        text: String,
        /// Credits to grant the local user before the call
        #[arg(long, default_value_t = 1)]
        credits: u32,
    },
    /// Remove sessions older than the configured TTL
    Sweep,
    /// Keep sweeping on the configured interval until Ctrl-C
    Watch,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

/// Stand-in used when no API key is configured.
struct Unconfigured(String);

#[async_trait]
impl TextEnhancer for Unconfigured {
    async fn enhance(&self, _text: &str) -> Result<String, EnhanceError> {
        Err(EnhanceError::MissingApiKey(self.0.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seo_forge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut forge = config::load_config(&cli.config)?;
    if let Some(root) = cli.sessions {
        forge.sessions.root = root;
    }
    init_thread_pool(&forge.processing);
    let service = build_service(forge);

    match cli.command {
        Command::Generate {
            title,
            description,
            url,
            links,
            logo,
            package,
        } => {
            let site_links = match links {
                Some(path) => tokio::fs::read_to_string(&path).await?,
                None => String::new(),
            };
            let image = match logo.as_deref() {
                Some(path) => Some(Upload::stage(path, service.store().root()).await?),
                None => None,
            };
            let request = GenerateRequest {
                title,
                description,
                site_url: url,
                site_links,
                image: image.clone(),
            };
            let generated = service.generate(request).await;
            // The staged copy goes whatever the outcome.
            if let Some(upload) = &image {
                if let Err(e) = upload.discard().await {
                    warn!(path = %upload.path.display(), error = %e, "staged logo not removed");
                }
            }
            let bundle = generated.map_err(user_facing)?;
            output::print_generate_output(&bundle);
            if package {
                let archive = service
                    .package_for_download(PackageTarget::Bundle(&bundle))
                    .await
                    .map_err(user_facing)?;
                output::print_package_output(&archive);
            }
        }
        Command::Package { session } => {
            let id = SessionId::parse(&session)?;
            let archive = service
                .package_for_download(PackageTarget::Session(&id))
                .await
                .map_err(user_facing)?;
            output::print_package_output(&archive);
        }
        Command::Enhance { text, credits } => {
            // The CLI runs as a single local user with a throwaway ledger.
            let user = User::new("local");
            service.ledger_grant(&user, credits).await;
            let improved = service
                .enhance_description(&text, &user)
                .await
                .map_err(user_facing)?;
            println!("{}", improved);
        }
        Command::Sweep => {
            let ttl = service.config().sessions.ttl();
            let report = service.store().reclaim_expired(ttl).await?;
            output::print_sweep_output(&report);
        }
        Command::Watch => {
            let reclaimer =
                Reclaimer::from_config(service.store().clone(), &service.config().sessions);
            tokio::signal::ctrl_c().await?;
            reclaimer.stop().await;
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Wire the service with the in-memory ledger and the configured enhancer.
fn build_service(forge: ForgeConfig) -> LocalService {
    let store = Arc::new(SessionStore::new(&forge.sessions.root, Arc::new(SystemClock)));
    let ledger = Arc::new(MemoryLedger::new());
    let enhancer: Arc<dyn TextEnhancer> = match ChatCompletionsEnhancer::from_env(&forge.enhance) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            debug!(error = %e, "description enhancement disabled");
            Arc::new(Unconfigured(forge.enhance.api_key_env.clone()))
        }
    };
    let service = SeoService::new(Arc::new(forge), store, ledger.clone(), enhancer);
    LocalService { service, ledger }
}

struct LocalService {
    service: SeoService,
    ledger: Arc<MemoryLedger>,
}

impl LocalService {
    async fn ledger_grant(&self, user: &User, credits: u32) {
        self.ledger.grant(user, credits).await;
    }
}

impl std::ops::Deref for LocalService {
    type Target = SeoService;

    fn deref(&self) -> &SeoService {
        &self.service
    }
}

fn user_facing(e: ServiceError) -> String {
    e.user_message()
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
