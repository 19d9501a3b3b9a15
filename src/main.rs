use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use tweetwall::feeds::{
    Author, AvatarProvider, FilePostFetcher, GeneratedAvatars, Post, PostFetcher,
    PostStreamProvider,
};
use tweetwall::scene::Surface;
use tweetwall::step::{
    check_required_providers, DataProviders, MachineContext, ProceedReceiver, ProceedSignal,
    Step, StepDefinition, StepFactory, SKIN_KEY,
};
use tweetwall::ui::{App, WallSnapshot};
use tweetwall::{Config, FlipInPostsFactory};

#[derive(Parser, Debug)]
#[command(name = "tweetwall")]
#[command(about = "Flip the newest posts of a stream onto a terminal wall", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: <config dir>/tweetwall/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Posts to show, newest first: a JSON array, or Bird CLI output with --bird
    #[arg(short, long)]
    posts: Option<PathBuf>,

    /// Parse the posts file as Bird CLI search output
    #[arg(long)]
    bird: bool,

    /// Run the step once without a terminal UI and print the resulting layout
    #[arg(long)]
    headless: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    init_logging(&config.logging.filter, cli.log_file.as_deref(), cli.headless)?;

    let posts = match &cli.posts {
        Some(path) => FilePostFetcher::new(path, cli.bird)
            .fetch()
            .await
            .with_context(|| format!("failed to read posts from {}", path.display()))?,
        None => sample_posts(),
    };
    tracing::info!(count = posts.len(), "loaded posts");

    let stream = Arc::new(PostStreamProvider::default());
    // Files list newest first; the stream expects arrival order.
    stream.accept_all(posts.into_iter().rev());

    let mut providers = DataProviders::new();
    providers.register(stream);
    providers.register(Arc::new(AvatarProvider::new(GeneratedAvatars::default())));

    let factory = FlipInPostsFactory;
    let definition = StepDefinition::new(factory.step_name())
        .with_config(toml::Value::try_from(&config.flip_in)?);
    check_required_providers(&factory, &definition, &providers)?;
    let step = factory.create(&definition)?;

    let surface = Arc::new(Surface::new(config.surface.width, config.surface.height));
    let (signal, proceed) = ProceedSignal::channel();
    let mut context = MachineContext::new(providers, signal);
    context.put(SKIN_KEY, surface.clone());

    let container_key = config.flip_in.container_key.as_str();
    if cli.headless {
        run_headless(step.as_ref(), &context, proceed, &surface, container_key).await
    } else {
        let mut terminal = ratatui::init();
        let result = App::new(surface, step, context, proceed, container_key)
            .run(&mut terminal)
            .await;
        ratatui::restore();
        result
    }
}

async fn run_headless(
    step: &dyn Step,
    context: &MachineContext,
    mut proceed: ProceedReceiver,
    surface: &Surface,
    container_key: &str,
) -> Result<()> {
    let budget = step.preferred_step_duration(context);
    step.do_step(context)?;

    match tokio::time::timeout(budget, proceed.recv()).await {
        Ok(Some(_)) => tracing::info!("step signalled proceed"),
        Ok(None) => anyhow::bail!("proceed channel closed before the step completed"),
        Err(_) => tracing::warn!(?budget, "step did not proceed within its preferred duration"),
    }

    let snapshot = WallSnapshot::capture(surface, container_key)
        .context("step finished without creating its container")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn init_logging(filter: &str, log_file: Option<&Path>, headless: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // Logging to the terminal would tear the TUI, so without a file it is off.
    match (log_file, headless) {
        (Some(path), _) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        (None, true) => builder.with_writer(std::io::stderr).init(),
        (None, false) => builder.with_writer(std::io::sink).init(),
    }
    Ok(())
}

fn sample_posts() -> Vec<Post> {
    let samples = [
        ("Duke", "duke", "Flip-in animations for the wall are live!\nSee you at the keynote."),
        ("Ferris", "ferris", "Cards are laid out relative to the window,\nso try resizing."),
        ("Grace", "grace", "Press r to replay the step."),
        ("Linus", "linus", "Seven posts max, newest first."),
    ];
    samples
        .iter()
        .enumerate()
        .map(|(idx, (name, handle, text))| Post {
            id: format!("sample-{}", idx),
            author: Author {
                name: name.to_string(),
                handle: handle.to_string(),
            },
            text: text.to_string(),
            created_at: None,
        })
        .collect()
}
