use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

use visual_engine::db::{self, NewClient, NewPost, Pool};
use visual_engine::model::{BrandGuide, ProviderKind};
use visual_engine::{config, ContentEngine};

#[derive(Debug, Parser)]
#[command(author, version, about = "Generate image prompts from post copy and render them")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Owner the client and post commands act for
    #[arg(long, default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate summary/prompt pairs for a post
    Prompt {
        #[arg(long)]
        post: String,
        /// Read the brand guide from this client
        #[arg(long)]
        client: Option<String>,
        #[arg(long = "style-tag")]
        style_tags: Vec<String>,
        #[arg(long)]
        tone: Option<String>,
    },
    /// Render images for a prompt
    Visual {
        #[arg(long)]
        prompt: String,
        /// replicate or together
        #[arg(long)]
        provider: String,
        #[arg(long, default_value = "")]
        model: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Record the first image URL on this post
        #[arg(long)]
        post: Option<String>,
    },
    #[command(subcommand)]
    Client(ClientCommand),
    #[command(subcommand)]
    Post(PostCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum ClientCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, default_value = "")]
        job_title: String,
        #[arg(long, default_value = "")]
        linkedin: String,
        #[arg(long, default_value = "")]
        website: String,
        #[arg(long, default_value = "")]
        image: String,
        #[arg(long = "color")]
        colors: Vec<String>,
        #[arg(long, default_value = "")]
        logo: String,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        tone: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum PostCommand {
    /// List posts, for one client or for every client of the owner
    List {
        #[arg(long)]
        client: Option<String>,
    },
    Add {
        #[arg(long)]
        client: String,
        #[arg(long)]
        content: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print an example configuration
    Example,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::Config(ConfigCommand::Example) = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let mut cfg = config::load(Some(&args.config))
        .with_context(|| format!("loading {}", args.config.display()))?;
    cfg.apply_env_overrides();
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    match args.command {
        Command::Prompt {
            post,
            client,
            style_tags,
            tone,
        } => {
            let guide = match client {
                Some(id) => Some(
                    db::get_client(&pool, &id)
                        .await?
                        .ok_or_else(|| anyhow!("client {id} not found"))?
                        .brand_guide,
                ),
                None => None,
            };
            let engine = ContentEngine::from_config(&cfg)?;
            let outcome = engine
                .generate_prompt_from_post(&post, &style_tags, guide.as_ref(), tone.as_deref())
                .await;
            print_json(&outcome)?;
        }
        Command::Visual {
            prompt,
            provider,
            model,
            count,
            post,
        } => {
            let provider = ProviderKind::parse_kind(&provider)
                .ok_or_else(|| anyhow!("unknown provider {provider}"))?;
            let engine = ContentEngine::from_config(&cfg)?;
            let images = match engine.generate_visual(&prompt, provider, &model, count).await {
                Ok(images) => images,
                Err(failure) => {
                    error!(kind = ?failure.kind, "visual generation failed");
                    print_json(&failure)?;
                    return Err(failure.into());
                }
            };
            if let Some(post_id) = post {
                record_image(&pool, &post_id, images.iter().find_map(|i| i.url())).await?;
            }
            print_json(&images)?;
        }
        Command::Client(cmd) => run_client(&pool, &args.owner, cmd).await?,
        Command::Post(cmd) => run_post(&pool, &args.owner, cmd).await?,
        Command::Config(ConfigCommand::Example) => {}
    }

    Ok(())
}

async fn record_image(pool: &Pool, post_id: &str, url: Option<&str>) -> Result<()> {
    let Some(url) = url else {
        warn!(post_id, "no URL image to record; post left unchanged");
        return Ok(());
    };
    if !db::set_post_image(pool, post_id, url).await? {
        return Err(anyhow!("post {post_id} not found"));
    }
    info!(post_id, "image recorded on post");
    Ok(())
}

async fn run_client(pool: &Pool, owner: &str, cmd: ClientCommand) -> Result<()> {
    match cmd {
        ClientCommand::List => print_json(&db::list_clients(pool, owner).await?),
        ClientCommand::Add {
            name,
            company,
            job_title,
            linkedin,
            website,
            image,
            colors,
            logo,
            style,
            tone,
        } => {
            let new = NewClient {
                owner_id: owner.to_string(),
                name,
                company_name: company,
                job_title,
                linkedin,
                website,
                image,
                brand_guide: BrandGuide {
                    colors,
                    logo,
                    style,
                    tone,
                },
            };
            print_json(&db::create_client(pool, &new).await?)
        }
        ClientCommand::Delete { id } => {
            if !db::delete_client(pool, &id).await? {
                return Err(anyhow!("client {id} not found"));
            }
            Ok(())
        }
    }
}

async fn run_post(pool: &Pool, owner: &str, cmd: PostCommand) -> Result<()> {
    match cmd {
        PostCommand::List { client: Some(id) } => print_json(&db::list_posts(pool, &id).await?),
        PostCommand::List { client: None } => {
            print_json(&db::list_posts_for_owner(pool, owner).await?)
        }
        PostCommand::Add { client, content } => {
            let new = NewPost {
                client_id: client,
                content,
            };
            print_json(&db::create_post(pool, &new).await?)
        }
        PostCommand::Delete { id } => {
            if !db::delete_post(pool, &id).await? {
                return Err(anyhow!("post {id} not found"));
            }
            Ok(())
        }
    }
}
