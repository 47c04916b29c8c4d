//! Pinwrap launcher
//!
//! Installs the tool version pinned in the bundled manifest, then runs it
//! with the remaining command-line arguments and exits with its exit code.

mod args;

use anyhow::{anyhow, Context, Result};
use pinwrap_core::{
    ArchiveCache, ArchiveExtractor, Console, Downloader, InstallOptions, InstallReconciler,
    ManifestSource, ProcessLauncher, ProjectLayout, Settings, VersionResolver,
};
use tracing_subscriber::EnvFilter;

use crate::args::WrapperArgs;

/// Bundled manifest naming the tool, its pinned version and download location.
const MANIFEST: &str = include_str!("../resources/pinwrap.properties");

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned());
    let (wrapper_args, forwarded) = match args::parse(argv) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };

    let console = Console::new(wrapper_args.log);
    tracing::debug!("Starting pinwrap v{}", pinwrap_core::VERSION);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            console.error(format!("Failed to create tokio runtime: {e}"));
            std::process::exit(1);
        }
    };

    let code = match runtime.block_on(run(&wrapper_args, forwarded, &console)) {
        Ok(code) => code,
        Err(e) => {
            console.error(format!("{e:#}"));
            1
        }
    };
    std::process::exit(code);
}

async fn run(args: &WrapperArgs, forwarded: Vec<String>, console: &Console) -> Result<i32> {
    let settings = Settings::load();

    let resolver = VersionResolver::new(ManifestSource::Embedded(MANIFEST), console.clone());
    let mut manifest = resolver.resolve()?;
    if let Some(base_url) = &settings.base_url {
        manifest = manifest.with_base_url(base_url.clone());
    }

    let project_root = std::env::current_dir().context("Couldn't determine the project directory")?;
    let project = ProjectLayout::new(project_root, &manifest.tool_name);
    let marker = resolver.ensure_marker(&project, &manifest.version)?;

    if args.version {
        console.println(format!(
            "{} {}, Wrapper {}",
            display_name(&manifest.tool_name),
            manifest.version,
            marker.version
        ));
        return Ok(0);
    }

    let cache_root = settings
        .cache_dir
        .clone()
        .or_else(|| ArchiveCache::default_root(&manifest.tool_name))
        .ok_or_else(|| anyhow!("Couldn't find the home directory for the download cache"))?;

    let downloader = Downloader::new(console.clone(), settings.proxy.as_ref())?;
    let extractor = ArchiveExtractor::new(console.clone());
    let reconciler = InstallReconciler::new(
        ArchiveCache::new(cache_root),
        project,
        downloader,
        extractor,
        console.clone(),
    )
    .with_options(InstallOptions {
        no_overwrite: args.no_overwrite,
    });

    let installed = reconciler.install(&manifest, &marker).await?;

    if args.no_launch {
        console.log(2, "--noLaunch specified, not launching");
        return Ok(0);
    }

    let launcher = ProcessLauncher::new(settings.java_executable(), console.clone());
    let code = launcher.launch(&installed.jar_path, &forwarded).await?;
    Ok(code)
}

/// `kobalt` -> `Kobalt`
fn display_name(tool_name: &str) -> String {
    let mut chars = tool_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("kobalt"), "Kobalt");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_bundled_manifest_resolves() {
        let resolver = VersionResolver::new(
            ManifestSource::Embedded(MANIFEST),
            Console::buffered(1).0,
        );
        let manifest = resolver.resolve().unwrap();

        assert_eq!(manifest.tool_name, "kobalt");
        assert!(manifest.archive_url().ends_with(".zip"));
    }
}
