use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use video_analyser::render::{render_plan, render_plan_tabs, render_progress_bar, render_status};
use video_analyser::{
    AnalysisService, AnalysisSession, Config, EditBuffer, Event, HttpAnalysisService, Page,
    PollOutcome, UploadFile,
};

#[derive(Parser)]
#[command(name = "video-analyser")]
#[command(version, about = "Submit videos for analysis and review the detected chapters and tags")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to video-analyser.toml or the environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Analysis service base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a video, wait for the analysis and print the plans
    Analyze {
        /// Video file to analyse
        video: PathBuf,

        /// Reference document attached to the analysis
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Number of plans to request (1-5)
        #[arg(short, long)]
        plans: Option<i64>,

        /// Minimum tag confidence to display (0-1)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// System prompt for the analysis engine
        #[arg(long)]
        prompt: Option<String>,

        /// Write the results as JSON into the export directory
        #[arg(long)]
        export: bool,
    },
    /// Show the progress of a job
    Progress {
        job_id: String,
    },
    /// Fetch and print the results of a finished job
    Results {
        job_id: String,

        /// Only print this plan (1-based)
        #[arg(short, long)]
        plan: Option<usize>,

        /// Minimum tag confidence to display (0-1)
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Delete the stored results of a job
    Delete {
        job_id: String,
    },
    /// Write a default configuration file
    InitConfig {
        #[arg(default_value = "video-analyser.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    init_logging(&config, cli.verbose);
    config.validate()?;

    match cli.command {
        Commands::Analyze {
            video,
            reference,
            plans,
            threshold,
            prompt,
            export,
        } => {
            analyze(&config, video, reference, plans, threshold, prompt, export).await?;
        }
        Commands::Progress { job_id } => {
            let service = HttpAnalysisService::new(&config.api)?;
            let report = service.progress(&job_id).await?;
            info!("📊 Job {}: {}", job_id, render_progress_bar(report.progress, 30));
            if let Some(status) = report.status {
                info!("Status: {:?}", status);
            }
        }
        Commands::Results {
            job_id,
            plan,
            threshold,
        } => {
            let service = HttpAnalysisService::new(&config.api)?;
            let results = EditBuffer::new(service.results(&job_id).await?);
            let threshold = threshold.unwrap_or(config.analysis.confidence_threshold);
            print_results(&results, plan.map(|p| p.saturating_sub(1)), threshold)?;
        }
        Commands::Delete { job_id } => {
            let service = HttpAnalysisService::new(&config.api)?;
            service.delete_results(&job_id).await?;
            info!("🗑️  Deleted results for job {}", job_id);
        }
        Commands::InitConfig { path } => {
            Config::default().save(&path)?;
        }
    }

    Ok(())
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.output.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("video_analyser={},warn", level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn analyze(
    config: &Config,
    video: PathBuf,
    reference: Option<PathBuf>,
    plans: Option<i64>,
    threshold: Option<f32>,
    prompt: Option<String>,
    export: bool,
) -> Result<()> {
    let service: Arc<dyn AnalysisService> = Arc::new(HttpAnalysisService::new(&config.api)?);
    let mut session = AnalysisSession::new(service, config);
    session.navigate(Page::Analysis);

    if let Some(plans) = plans {
        session.dispatch(Event::SetPlanCount(plans));
    }
    if let Some(threshold) = threshold {
        session.dispatch(Event::SetConfidenceThreshold(threshold));
    }
    if let Some(prompt) = prompt {
        session.dispatch(Event::SetPromptEditing(true));
        session.dispatch(Event::EditSystemPrompt(prompt));
        session.dispatch(Event::SetPromptEditing(false));
    }
    if let Some(reference) = reference {
        let file = UploadFile::from_path(&reference).await?;
        session.dispatch(Event::SetUseReferenceFile(true));
        session.select_reference_file(file);
    }

    info!("{}", config.summary());

    // status renderer, one subscriber among any others
    let mut updates = session.store().subscribe();
    let renderer = tokio::spawn(async move {
        let mut last_line = String::new();
        loop {
            match updates.recv().await {
                Ok(state) => {
                    let line = render_status(&state);
                    if line != last_line {
                        info!("{}", line);
                        last_line = line;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Status renderer skipped {} update(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!("🎬 Uploading {}", video.display());
    session.open_video(&video).await?;

    let outcome = session.wait_for_completion().await;
    renderer.abort();

    let state = session.state();
    match outcome {
        Some(PollOutcome::Completed) if !state.results.is_empty() => {}
        _ => {
            let reason = state
                .last_error
                .clone()
                .unwrap_or_else(|| "analysis did not complete".to_string());
            error!("❌ {}", reason);
            return Err(anyhow!(reason));
        }
    }

    print_results(&state.results, None, state.settings.confidence_threshold)?;

    if export {
        let job_id = state
            .job
            .as_ref()
            .map(|job| job.id.clone())
            .unwrap_or_else(|| "results".to_string());
        let dir = config
            .output
            .export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.json", job_id));
        tokio::fs::write(&path, state.results.to_json()?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("💾 Results exported to {}", path.display());
    }

    session.close();
    Ok(())
}

fn print_results(results: &EditBuffer, plan: Option<usize>, threshold: f32) -> Result<()> {
    if results.is_empty() {
        println!("No analysis results.");
        return Ok(());
    }

    match plan {
        Some(index) => {
            let selected = results.plan(index).ok_or_else(|| {
                anyhow!(
                    "plan {} does not exist ({} plan(s) available)",
                    index + 1,
                    results.plan_count()
                )
            })?;
            println!("{}", render_plan_tabs(results.plan_count(), index));
            println!("{}", render_plan(selected, index, threshold));
        }
        None => {
            for (index, selected) in results.plans().enumerate() {
                println!("{}", render_plan(selected, index, threshold));
            }
        }
    }

    Ok(())
}
