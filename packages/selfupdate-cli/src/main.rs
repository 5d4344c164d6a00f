use clap::Parser;
use selfupdate_core::{
    ApplyOptions, Config, Filter, ReleaseResult, RepositoryType, Updater, DEFAULT_TEMPLATE,
};
use selfupdate_utils::Context;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "selfupdate")]
#[command(about = "Check for and install release updates from GitHub or Gitea")]
struct Cli {
    /// Download and apply the release
    #[arg(long)]
    update: bool,

    /// Resolve the release and print it
    #[arg(long)]
    check_update: bool,

    /// Repository owner, required with --update or --check-update
    #[arg(long)]
    owner: Option<String>,

    #[arg(long)]
    repo: Option<String>,

    /// Release API family: github or gitea
    #[arg(long, default_value = "github")]
    repository_type: String,

    /// API base URL, e.g. a self-hosted Gitea instance
    #[arg(long)]
    api_url: Option<String>,

    /// Asset name template
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: String,

    /// Template value override, repeatable
    #[arg(long = "value", value_name = "KEY=VALUE", value_parser = parse_value)]
    values: Vec<(String, String)>,

    /// Release tag to resolve instead of the latest one
    #[arg(long, default_value = "latest")]
    tag: String,

    #[arg(long, env = "SELFUPDATE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Overall time limit in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the resolved release as JSON
    #[arg(long)]
    json: bool,

    /// File to replace instead of the running executable
    #[arg(long)]
    target: Option<PathBuf>,

    /// Installed version; skips the update when the release is not newer
    #[arg(long)]
    current: Option<String>,
}

fn parse_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

impl Cli {
    fn config(&self) -> Result<Config, String> {
        let owner = self.owner.clone().ok_or("--owner is required")?;
        let repo = self.repo.clone().ok_or("--repo is required")?;
        let filter = self
            .values
            .iter()
            .fold(Filter::new(self.template.clone()), |filter, (key, value)| {
                filter.with_value(key.clone(), value.clone())
            });
        let mut config = Config::new(owner, repo)
            .with_repository_type(RepositoryType::new(&self.repository_type))
            .with_filter(filter);
        if let Some(url) = &self.api_url {
            config = config.with_api_base_url(url.clone());
        }
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        Ok(config)
    }

    fn context(&self) -> Context {
        match self.timeout {
            Some(secs) => Context::new().with_timeout(Duration::from_secs(secs)),
            None => Context::new(),
        }
    }

    fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            target_path: self.target.clone(),
            target_mode: None,
        }
    }
}

fn print_release(release: &ReleaseResult, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(release)?);
    } else {
        println!("Version: {}", release.version);
        println!("Tag: {}", release.tag_name);
        println!("Asset: {} ({} bytes)", release.asset_name, release.asset_byte_size);
        println!("URL: {}", release.asset_url);
        if !release.page_url.is_empty() {
            println!("Page: {}", release.page_url);
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let updater = Updater::new(cli.config()?)?;
    let ctx = cli.context();

    let release = updater.check_version(&ctx, &cli.tag).await?;
    if cli.check_update {
        print_release(&release, cli.json)?;
    }
    if !cli.update {
        return Ok(());
    }

    if let Some(current) = &cli.current {
        if !release.is_newer_than(current)? {
            log::info!("Current version {current} is up to date");
            return Ok(());
        }
    }
    updater
        .update_to(&ctx, &release, Some(cli.apply_options()))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if !cli.update && !cli.check_update {
        println!("Nothing to do");
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
