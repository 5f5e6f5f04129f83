//! Generate command - build an OLM bundle
//!
//! Manifests are read from stdin (when piped) and from every file under
//! `--extra-resources-dir`. Chart metadata comes from `--chart-file-path`.

use clap::Args;
use console::style;
use olmpack_core::{
    Bundle, BundleManifest, ClusterServiceVersion, ManifestParser, Record, default_annotations,
};
use olmpack_csv::{
    DEPLOYMENT_STRATEGY, EmbedOptions, Embedder, HelmMetadata, IconFetcher, OlmSupportedKinds,
    override_annotations, override_cluster_service_version, validate,
};
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::error::{CliError, Result};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to the Helm Chart.yaml that provides bundle metadata
    #[arg(long)]
    pub chart_file_path: PathBuf,

    /// Directory the bundle is written to; also holds override files
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Extra manifests to add to the bundle (walked recursively)
    #[arg(long)]
    pub extra_resources_dir: Option<PathBuf>,

    /// Bundle version (defaults to the Chart.yaml version)
    #[arg(long = "version")]
    pub bundle_version: Option<String>,

    /// Let Chart.yaml ArtifactHub annotations replace collected metadata
    #[arg(long)]
    pub helm_chart_overrides: bool,

    /// Channels the bundle is published to
    #[arg(long, value_delimiter = ',', default_value = "stable")]
    pub channels: Vec<String>,

    /// Default channel (defaults to the first channel)
    #[arg(long)]
    pub default_channel: Option<String>,

    /// Fail when a binding references a role that is not in the input
    #[arg(long)]
    pub strict_rbac: bool,

    /// Icon download timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub icon_timeout: u64,

    /// Do not download the chart icon
    #[arg(long)]
    pub skip_icon: bool,
}

impl GenerateArgs {
    fn default_channel(&self) -> &str {
        self.default_channel
            .as_deref()
            .or(self.channels.first().map(String::as_str))
            .unwrap_or("stable")
    }
}

pub fn run(args: &GenerateArgs) -> Result<()> {
    print_header(args);

    let records = read_manifests(args)?;
    println!(
        "  {} Parsed {} manifest(s)",
        style("✓").green(),
        records.len()
    );

    let metadata = HelmMetadata::load(&args.chart_file_path)?
        .with_version(args.bundle_version.clone())
        .with_overrides(args.helm_chart_overrides);

    let icon = match metadata.chart.icon.as_deref() {
        Some(url) if !args.skip_icon && !url.is_empty() => {
            Some(fetch_icon(url, Duration::from_secs(args.icon_timeout))?)
        }
        _ => None,
    };

    let mut csv = ClusterServiceVersion::new();
    metadata.embed(&mut csv, icon)?;

    let options = EmbedOptions {
        strategy_name: DEPLOYMENT_STRATEGY.to_string(),
        strict_role_refs: args.strict_rbac,
    };
    let residual = Embedder::new(options).embed(records, &mut csv)?;
    metadata.reconcile_crds(&mut csv)?;

    override_cluster_service_version(&mut csv, &args.output_dir)?;
    let mut user_annotations = BTreeMap::new();
    override_annotations(&mut user_annotations, &args.output_dir)?;
    csv.annotations_mut().extend(user_annotations.clone());

    validate(&residual, &OlmSupportedKinds)?;

    let mut annotations = default_annotations(
        metadata.package_name(),
        &args.channels,
        args.default_channel(),
    );
    annotations.extend(user_annotations);

    print_embedded(&csv, &residual);

    let mut manifests: Vec<BundleManifest> =
        residual.into_iter().map(BundleManifest::from).collect();
    manifests.push(BundleManifest::from_csv(&csv)?);

    let bundle = Bundle {
        package_dir: args.output_dir.clone(),
        manifests,
        annotations,
    };
    let bundle_dir = bundle.write()?;

    print_summary(&csv, &bundle, &bundle_dir);
    Ok(())
}

fn read_manifests(args: &GenerateArgs) -> Result<Vec<Record>> {
    let mut parser = ManifestParser::new();

    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        parser = parser.with_stream("<stdin>", stdin);
    }

    if let Some(dir) = &args.extra_resources_dir {
        parser = parser.with_files(extra_resource_files(dir)?);
    }

    Ok(parser.parse()?)
}

/// Every regular file under `dir`, sorted by path
fn extra_resource_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CliError::Io {
            message: format!("cannot walk {}: {}", dir.display(), e),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    tracing::debug!(dir = %dir.display(), files = files.len(), "collected extra resources");
    Ok(files)
}

fn fetch_icon(url: &str, timeout: Duration) -> Result<olmpack_core::Icon> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("cannot start async runtime: {}", e)))?;

    let fetcher = IconFetcher::new(timeout)?;
    let icon = runtime.block_on(fetcher.fetch(url))?;
    println!(
        "  {} Fetched icon ({})",
        style("✓").green(),
        icon.media_type
    );
    Ok(icon)
}

fn print_header(args: &GenerateArgs) {
    println!();
    println!(
        "  {} {} {}",
        style("olmpack").bold().cyan(),
        style("─").dim(),
        style("manifests → OLM bundle").dim()
    );
    println!();
    println!(
        "  {} {}",
        style("Chart: ").dim(),
        style(args.chart_file_path.display()).cyan()
    );
    println!(
        "  {} {}",
        style("Output:").dim(),
        style(args.output_dir.display()).green()
    );
    println!();
}

fn print_embedded(csv: &ClusterServiceVersion, residual: &[Record]) {
    let install = csv.install_strategy();
    println!(
        "  {} Embedded {} CRD(s), {} Deployment(s), {} permission(s), {} cluster permission(s)",
        style("✓").green(),
        csv.owned_crds().len(),
        install.spec.deployment_specs.len(),
        install.spec.permissions.len(),
        install.spec.cluster_permissions.len()
    );
    for record in residual {
        println!(
            "    {} {}",
            style("+").dim(),
            style(record.display_name()).dim()
        );
    }
}

fn print_summary(csv: &ClusterServiceVersion, bundle: &Bundle, bundle_dir: &Path) {
    println!();
    println!(
        "  {} {} ({} manifest(s))",
        style("Bundle:").bold(),
        style(&csv.metadata.name).cyan(),
        bundle.manifests.len()
    );
    println!(
        "  {} You can find your OLM bundle in {}",
        style("✨").bold(),
        style(bundle_dir.display()).green()
    );
    println!();
}
