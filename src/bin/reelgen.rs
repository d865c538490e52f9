//! CLI for ReelGen - multi-provider video generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use reelgen::video::{resolve_available, select_primary};
use reelgen::{
    validate_api_key, AspectRatio, FsBlobStore, GenerationRequest, PlatformKeys,
    ProviderCredentials, ProviderId, Resolution, SceneTask, VideoEngine,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reelgen")]
#[command(about = "Generate video clips via AI APIs with automatic provider failover")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one clip from a text prompt
    Generate(GenerateArgs),

    /// Generate a batch of scenes from a JSON file
    Batch(BatchArgs),

    /// List providers and which ones the current keys unlock
    Providers(KeyArgs),

    /// Check the format of an API key
    ValidateKey {
        /// Provider the key belongs to
        provider: ProviderId,
        /// The key to check
        key: String,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// Runway API key (key_...)
    #[arg(long)]
    runway_key: Option<String>,

    /// OpenAI API key (sk-...)
    #[arg(long)]
    openai_key: Option<String>,

    /// Replicate API token (r8_...)
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    replicate_key: Option<String>,

    /// fal.ai API key
    #[arg(long, env = "FAL_KEY", hide_env_values = true)]
    fal_key: Option<String>,

    /// Luma AI API key
    #[arg(long, env = "LUMA_API_KEY", hide_env_values = true)]
    luma_key: Option<String>,

    /// Hugging Face token (hf_...)
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Preferred provider when several keys are set
    #[arg(long)]
    prefer: Option<ProviderId>,
}

impl KeyArgs {
    fn credentials(&self) -> ProviderCredentials {
        let creds = ProviderCredentials::new()
            .with_optional_key(ProviderId::Runway, self.runway_key.clone())
            .with_optional_key(ProviderId::OpenAi, self.openai_key.clone())
            .with_optional_key(ProviderId::Replicate, self.replicate_key.clone())
            .with_optional_key(ProviderId::Fal, self.fal_key.clone())
            .with_optional_key(ProviderId::Luma, self.luma_key.clone())
            .with_optional_key(ProviderId::HuggingFace, self.hf_token.clone());
        match self.prefer {
            Some(provider) => creds.with_preferred(provider),
            None => creds,
        }
    }
}

#[derive(Args)]
struct StorageArgs {
    /// Directory clips are written to
    #[arg(long, env = "REELGEN_OUTPUT_DIR", default_value = reelgen::video::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Public base URL the output directory is served from
    #[arg(long)]
    public_url: Option<String>,

    /// Download vendor-hosted clips into the output directory too
    #[arg(long)]
    rehost: bool,
}

impl StorageArgs {
    fn engine(&self, concurrency: Option<usize>) -> anyhow::Result<VideoEngine> {
        let mut store = FsBlobStore::new(&self.output_dir);
        if let Some(url) = &self.public_url {
            store = store.with_public_base_url(url);
        }
        let mut builder = VideoEngine::builder()
            .blob_store(Arc::new(store))
            .rehost_urls(self.rehost);
        if let Some(c) = concurrency {
            builder = builder.concurrency(c);
        }
        Ok(builder.build()?)
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the clip
    prompt: String,

    /// Clip duration in seconds
    #[arg(short, long, default_value_t = 5)]
    duration: u32,

    /// Aspect ratio
    #[arg(long, value_enum, default_value = "16:9")]
    aspect_ratio: AspectRatioArg,

    /// Output resolution
    #[arg(long, value_enum, default_value = "720p")]
    resolution: ResolutionArg,

    /// Reference image URL for image-to-video
    #[arg(long)]
    image: Option<String>,

    /// Start with this provider (if it has a key)
    #[arg(short, long)]
    provider: Option<ProviderId>,

    #[command(flatten)]
    keys: KeyArgs,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Args)]
struct BatchArgs {
    /// JSON file with an array of requests ({"prompt": ..., "duration_secs": ...})
    file: PathBuf,

    /// Scenes generated at once (defaults to REELGEN_CONCURRENCY or 3)
    #[arg(short, long)]
    concurrency: Option<usize>,

    #[command(flatten)]
    keys: KeyArgs,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "1:1")]
    Square,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Square => AspectRatio::Square,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    #[value(name = "480p")]
    Sd480,
    #[value(name = "720p")]
    Hd720,
    #[value(name = "1080p")]
    FullHd1080,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Sd480 => Resolution::Sd480,
            ResolutionArg::Hd720 => Resolution::Hd720,
            ResolutionArg::FullHd1080 => Resolution::FullHd1080,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelgen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            generate(args, cli.json).await?;
        }
        Commands::Batch(args) => {
            batch(args, cli.json).await?;
        }
        Commands::Providers(keys) => {
            list_providers(&keys, cli.json)?;
        }
        Commands::ValidateKey { provider, key } => {
            validate_key(provider, &key, cli.json)?;
        }
    }

    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let mut request = GenerationRequest::new(&args.prompt)
        .with_duration(args.duration)
        .with_aspect_ratio(args.aspect_ratio.into())
        .with_resolution(args.resolution.into());
    if let Some(image) = args.image {
        request = request.with_reference_image(image);
    }

    let engine = args.storage.engine(None)?;
    let result = engine
        .generate(&request, &args.keys.credentials(), args.provider)
        .await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated video: {} ({}s) via {}",
            result.artifact_url, result.duration_secs, result.provider
        );
        if let Some(thumbnail) = &result.thumbnail_url {
            println!("Thumbnail: {}", thumbnail);
        }
    }

    Ok(())
}

async fn batch(args: BatchArgs, json_output: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.file)?;
    let requests: Vec<GenerationRequest> = serde_json::from_str(&raw)?;
    let tasks: Vec<SceneTask> = requests
        .into_iter()
        .enumerate()
        .map(|(i, request)| SceneTask::new(i, request))
        .collect();
    let total = tasks.len();

    let engine = args.storage.engine(args.concurrency)?;
    let outcomes = engine
        .generate_many(tasks, &args.keys.credentials(), engine.concurrency())
        .await;
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

    if json_output {
        let scenes: Vec<serde_json::Value> = outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(result) => serde_json::json!({
                    "index": o.index,
                    "success": true,
                    "result": result,
                }),
                Err(e) => serde_json::json!({
                    "index": o.index,
                    "success": false,
                    "provider": o.provider,
                    "error": e,
                }),
            })
            .collect();
        let response = serde_json::json!({
            "requested": total,
            "succeeded": succeeded,
            "failed": total - succeeded,
            "scenes": scenes,
        });
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        for outcome in &outcomes {
            match &outcome.result {
                Ok(result) => println!(
                    "Scene {}: {} via {}",
                    outcome.index, result.artifact_url, result.provider
                ),
                Err(e) => println!("Scene {}: FAILED ({})", outcome.index, e),
            }
        }
        println!("{}/{} scenes generated", succeeded, total);
    }

    if total > 0 && succeeded == 0 {
        anyhow::bail!("all {} scenes failed", total);
    }
    Ok(())
}

fn list_providers(keys: &KeyArgs, json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ProviderInfo {
        id: ProviderId,
        name: &'static str,
        models: &'static str,
        pricing: &'static str,
        signup_url: &'static str,
        enabled: bool,
        available: bool,
    }

    let creds = keys.credentials();
    let platform = PlatformKeys::from_env();
    let available = resolve_available(&creds, &platform);
    let primary = select_primary(&creds, &platform);

    let providers: Vec<ProviderInfo> = ProviderId::ALL
        .into_iter()
        .map(|id| {
            let d = id.descriptor();
            ProviderInfo {
                id,
                name: d.name,
                models: d.models,
                pricing: d.pricing,
                signup_url: d.signup_url,
                enabled: compiled_in(id),
                available: available.contains(&id),
            }
        })
        .collect();

    if json_output {
        let response = serde_json::json!({
            "primary": primary,
            "providers": providers,
        });
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("Providers:");
        for p in &providers {
            let status = match (p.enabled, p.available) {
                (false, _) => "not compiled in",
                (true, true) => "ready",
                (true, false) => "no key",
            };
            let marker = if p.id == primary { "*" } else { " " };
            println!("{} {:<24} {:<28} [{}]", marker, p.name, p.models, status);
        }
        println!();
        println!("* primary provider for the current keys");
    }

    Ok(())
}

fn compiled_in(id: ProviderId) -> bool {
    match id {
        ProviderId::Runway => cfg!(feature = "runway"),
        ProviderId::OpenAi => cfg!(feature = "openai"),
        ProviderId::Replicate => cfg!(feature = "replicate"),
        ProviderId::Fal => cfg!(feature = "fal"),
        ProviderId::Luma => cfg!(feature = "luma"),
        ProviderId::HuggingFace => cfg!(feature = "huggingface"),
        ProviderId::Pollinations => true,
    }
}

fn validate_key(provider: ProviderId, key: &str, json_output: bool) -> anyhow::Result<()> {
    let validation = validate_api_key(provider, key);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&validation)?);
    } else if validation.valid {
        println!("{}: {}", provider, validation.message);
    } else {
        println!("{}: invalid ({})", provider, validation.message);
    }

    if !validation.valid {
        std::process::exit(1);
    }
    Ok(())
}
