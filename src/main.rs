use clap::Parser;
use dockhand::domain::ports::{CommandRunner, DeploySettings};
use dockhand::utils::error::{DeployError, ErrorSeverity};
use dockhand::utils::logger;
use dockhand::utils::validation::Validate;
use dockhand::{
    CliConfig, ComposePipeline, DeployEngine, DeployManifest, ImageRef, ProcessRunner, SshRunner,
};
use std::sync::Arc;

fn fail(e: DeployError) -> ! {
    tracing::error!(
        "❌ Deployment failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if logger::running_in_ci() {
        logger::init_ci_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting dockhand");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let mut manifest = match DeployManifest::from_file(&cli.manifest) {
        Ok(manifest) => manifest,
        Err(e) => fail(e),
    };
    cli.apply_to(&mut manifest);

    if let Err(e) = manifest.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(e);
    }

    // The build always runs here; activation runs on the target host,
    // which is this machine unless the manifest names a remote one.
    let build_host: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let target: Arc<dyn CommandRunner> = match &manifest.target.host {
        Some(host) => {
            let user = manifest.target.user.clone().unwrap_or_default();
            let mut runner = SshRunner::new(host.clone(), user);
            if let Some(key) = &manifest.target.ssh_key {
                runner = runner.with_key(key.clone());
            }
            if let Some(port) = manifest.target.port {
                runner = runner.with_port(port);
            }
            tracing::info!("Deploying to {}", host);
            Arc::new(runner)
        }
        None => {
            tracing::info!("Deploying to this host");
            Arc::new(ProcessRunner::new())
        }
    };

    let pipeline_name = manifest.pipeline_name().to_string();
    let image_repository = manifest.image_repository().to_string();
    let rollback_enabled = manifest.rollback_enabled();

    let pipeline = ComposePipeline::new(build_host, target, manifest);
    let engine = DeployEngine::new(pipeline, pipeline_name)
        .with_monitoring(cli.monitor)
        .with_rollback_on_failure(rollback_enabled)
        .with_skips(cli.skip_build, cli.skip_transfer);

    if let Some(tag) = &cli.rollback_to {
        let previous = ImageRef::new(image_repository, tag.clone());
        match engine.run_rollback(&previous).await {
            Ok(()) => {
                println!("✅ Rolled back to {}", previous);
            }
            Err(e) => fail(e),
        }
        return;
    }

    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ Deployment completed successfully!");
            println!(
                "✅ Deployed {} in {:?}",
                report.image,
                report.total_duration()
            );
            for stage in &report.stages {
                println!("   {} in {:?} ({})", stage.stage, stage.duration, stage.detail);
            }
        }
        Err(e) => fail(e),
    }
}
