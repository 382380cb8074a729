//! Resolve command - compute the best stacks of a project.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use advise_core::{
    ConfigSource, GraphDatabase, MemoryGraph, Project, Report, Resolver, ResolverConfig,
};

/// Exit code for runs that found no stack for the given data.
const EXIT_NO_STACK: i32 = 2;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Solved-package graph snapshot (JSON)
    #[arg(short = 'g', long, default_value = "graph.json")]
    pub graph: PathBuf,

    /// Project manifest (TOML)
    #[arg(short = 'p', long, default_value = "project.toml")]
    pub project: PathBuf,

    /// Working directory, advise.toml is read from here
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,

    /// Maximum number of states kept in the beam (-1 for unbounded)
    #[arg(long, allow_negative_numbers = true)]
    pub beam_width: Option<i64>,

    /// Stop after this many final states
    #[arg(long)]
    pub limit: Option<u64>,

    /// Number of stacks to report
    #[arg(short = 'c', long)]
    pub count: Option<usize>,

    /// Consider only this many latest versions of each package (-1 for all)
    #[arg(long, allow_negative_numbers = true)]
    pub limit_latest_versions: Option<i64>,

    /// Predictor guiding the search (approximating-latest, hill-climbing, random-walk, sampling)
    #[arg(long)]
    pub predictor: Option<String>,

    /// Seed for randomized predictors
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not resolve development requirements
    #[arg(long)]
    pub no_devel: bool,

    /// Record beam statistics every iteration
    #[arg(long)]
    pub keep_history: bool,

    /// Allow pre-releases of all packages
    #[arg(long)]
    pub allow_prereleases: bool,

    /// Allow pre-releases of this package (can be used multiple times)
    #[arg(long = "prerelease-package", value_name = "NAME", action = clap::ArgAction::Append)]
    pub prerelease_packages: Vec<String>,

    /// Allowed package index (can be used multiple times)
    #[arg(long = "index-url", value_name = "URL", action = clap::ArgAction::Append)]
    pub index_urls: Vec<String>,

    /// Remove a package from the resolution (can be used multiple times)
    #[arg(long = "skip-package", value_name = "NAME", action = clap::ArgAction::Append)]
    pub skip_packages: Vec<String>,

    /// Discard stacks scoring below this value
    #[arg(long, allow_negative_numbers = true)]
    pub score_threshold: Option<f64>,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Ignore ADVISE_* environment variables
    #[arg(long)]
    pub no_env: bool,

    /// Hide the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

impl ResolveArgs {
    /// Command line settings as configuration key/value pairs.
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();

        if let Some(beam_width) = self.beam_width {
            overrides.push(("beam-width", beam_width.to_string()));
        }
        if let Some(limit) = self.limit {
            overrides.push(("limit", limit.to_string()));
        }
        if let Some(count) = self.count {
            overrides.push(("count", count.to_string()));
        }
        if let Some(latest) = self.limit_latest_versions {
            overrides.push(("limit-latest-versions", latest.to_string()));
        }
        if let Some(predictor) = &self.predictor {
            overrides.push(("predictor", predictor.clone()));
        }
        if let Some(seed) = self.seed {
            overrides.push(("seed", seed.to_string()));
        }
        if self.no_devel {
            overrides.push(("with-devel", "false".to_string()));
        }
        if self.keep_history {
            overrides.push(("keep-history", "true".to_string()));
        }
        if self.allow_prereleases {
            overrides.push(("allow-prereleases", "true".to_string()));
        }
        if !self.prerelease_packages.is_empty() {
            overrides.push(("prerelease-packages", self.prerelease_packages.join(",")));
        }
        if !self.index_urls.is_empty() {
            overrides.push(("index-urls", self.index_urls.join(",")));
        }
        if !self.skip_packages.is_empty() {
            overrides.push(("skip-packages", self.skip_packages.join(",")));
        }
        if let Some(threshold) = self.score_threshold {
            overrides.push(("score-threshold", threshold.to_string()));
        }

        overrides
    }

    fn config(&self, working_dir: &Path) -> Result<ResolverConfig> {
        let mut config = ResolverConfig::build(Some(working_dir), !self.no_env)
            .context("Failed to load configuration")?;

        for (key, value) in self.overrides() {
            config.set_from_str(key, &value, ConfigSource::Command)?;
        }
        config.validate()?;

        Ok(config)
    }
}

pub async fn execute(args: ResolveArgs) -> Result<i32> {
    let working_dir = args
        .working_dir
        .canonicalize()
        .context("Failed to resolve working directory")?;

    let config = args.config(&working_dir)?;

    let project_path = working_dir.join(&args.project);
    let project = Project::load(&project_path)
        .with_context(|| format!("Failed to load project {}", project_path.display()))?;

    let graph_path = working_dir.join(&args.graph);
    let graph: Arc<dyn GraphDatabase + Sync> = Arc::new(
        MemoryGraph::load(&graph_path)
            .with_context(|| format!("Failed to load graph {}", graph_path.display()))?,
    );

    let resolver = Resolver::new(graph, project, config);

    let spinner = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    spinner.set_message("Resolving stacks...");

    let stop = resolver.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, reporting the stacks found so far");
            stop.stop();
        }
    });

    let (resolver, result) = tokio::task::spawn_blocking(move || {
        let mut resolver = resolver;
        let result = resolver.resolve();
        (resolver, result)
    })
    .await
    .context("Resolution task failed")?;

    interrupt.abort();
    spinner.finish_and_clear();

    let (report, code) = match result {
        Ok(report) => {
            eprintln!(
                "{} {} stack(s) after {} iteration(s)",
                style("Resolved").green().bold(),
                report.products.len(),
                report.iterations,
            );
            (serde_json::to_value(&report)?, 0)
        }
        Err(err) => {
            eprintln!("{} {}", style("Error:").red().bold(), err);
            let code = if err.is_resolution_failure() { EXIT_NO_STACK } else { 1 };
            (Report::from_error(&err, resolver.stack_info()), code)
        }
    };

    let rendered = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            let path = working_dir.join(path);
            std::fs::write(&path, rendered + "\n")
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("{} Report written to {}", style("Info:").cyan(), path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(code)
}
