use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;

use modhub_catalog::{fully_private_modules, stale_private_versions, ManifestBuilder, ManifestReader};
use modhub_publish::{
    describe_tree, job_queue, DeleteJob, JobQueue, JobReceivers, LogNotifier, PublishJob, PublishWorker, Publisher,
    TreeDigestVerifier, WorkerConfig, WorkerStats,
};
use modhub_store::write_document;
use modhub_types::{ModuleName, ModuleVersion};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => WorkerConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => WorkerConfig::from_env()?,
    };
    match cli.command {
        Command::Rebuild => cmd_rebuild(&config),
        Command::Publish(args) => cmd_publish(config, args),
        Command::Delete(args) => cmd_delete(config, args),
        Command::Versions(args) => cmd_versions(&config, args),
        Command::Private(args) => cmd_private(&config, args),
        Command::Manifest(args) => cmd_manifest(args),
    }
}

fn cmd_rebuild(config: &WorkerConfig) -> anyhow::Result<()> {
    let builder = ManifestBuilder::new(config.layout(), config.client_versions.clone());
    let report = builder.build()?;
    for bucket in &report.buckets {
        let label = bucket.client.as_ref().map_or("unscoped", |c| c.as_str());
        println!("  {:<12} {} modules", label.cyan(), bucket.modules.to_string().bold());
    }
    for name in &report.skipped {
        println!("  {} {}", "skipped:".yellow(), name);
    }
    println!("{} Manifests rebuilt.", "✓".green().bold());
    Ok(())
}

fn cmd_publish(config: WorkerConfig, args: PublishArgs) -> anyhow::Result<()> {
    let module = ModuleName::parse(&args.module)?;
    let version = ModuleVersion::parse(&args.version)?;
    let (queue, receivers) = job_queue(&config.layout(), config.queue_capacity);
    queue.check_publish(&module, &version, args.overwrite)?;

    // Stage copies so the worker can delete its inputs.
    let (archive_path, manifest_path) = config.upload_paths(&module, &version);
    std::fs::create_dir_all(&config.uploads_dir)?;
    std::fs::copy(&args.archive, &archive_path)
        .with_context(|| format!("copying {}", args.archive.display()))?;
    std::fs::copy(&args.manifest, &manifest_path)
        .with_context(|| format!("copying {}", args.manifest.display()))?;

    let job = PublishJob {
        module: module.clone(),
        version: version.clone(),
        archive_path,
        manifest_path,
    };
    let stats = drain(config, queue, receivers, |queue| async move { queue.enqueue_publish(job).await })?;
    if stats.failed > 0 {
        bail!("publishing {module}:{version} failed");
    }
    println!("{} Published {}:{}", "✓".green().bold(), module.to_string().yellow(), version);
    Ok(())
}

fn cmd_delete(config: WorkerConfig, args: DeleteArgs) -> anyhow::Result<()> {
    let module = ModuleName::parse(&args.module)?;
    let version = args.version.as_deref().map(ModuleVersion::parse).transpose()?;
    let (queue, receivers) = job_queue(&config.layout(), config.queue_capacity);
    queue.check_delete(&module, version.as_ref())?;

    let job = DeleteJob {
        module: module.clone(),
        version: version.clone(),
    };
    let stats = drain(config, queue, receivers, |queue| async move { queue.enqueue_delete(job).await })?;
    if stats.failed > 0 {
        bail!("deleting {module} failed");
    }
    match version {
        Some(v) => println!("{} Deleted {}:{}", "✓".green().bold(), module.to_string().yellow(), v),
        None => println!("{} Deleted {} (all versions)", "✓".green().bold(), module.to_string().yellow()),
    }
    Ok(())
}

/// Enqueue one job, close the queue, and run the worker until it drains.
fn drain<F, Fut>(config: WorkerConfig, queue: JobQueue, receivers: JobReceivers, submit: F) -> anyhow::Result<WorkerStats>
where
    F: FnOnce(JobQueue) -> Fut,
    Fut: std::future::Future<Output = modhub_publish::PublishResult<()>>,
{
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let publisher = Arc::new(Publisher::new(config, Arc::new(TreeDigestVerifier)));
        let worker = PublishWorker::new(publisher, Arc::new(LogNotifier), receivers);
        submit(queue).await?;
        Ok(worker.run().await)
    })
}

fn cmd_versions(config: &WorkerConfig, args: VersionsArgs) -> anyhow::Result<()> {
    let module = ModuleName::parse(&args.module)?;
    let manifest = ManifestReader::new(&config.layout()).read()?;
    let Some(entry) = manifest.get(&module) else {
        println!("Module {} is not published.", module.to_string().yellow());
        return Ok(());
    };
    for version in &entry.versions {
        let data = entry
            .data_versions
            .get(version)
            .cloned()
            .flatten()
            .map(|v| format!("data from {v}"))
            .unwrap_or_else(|| "no data".into());
        if *version == entry.latest_version {
            println!("* {}  {}", version.to_string().green().bold(), data.dimmed());
        } else {
            println!("  {}  {}", version, data.dimmed());
        }
    }
    Ok(())
}

fn cmd_private(config: &WorkerConfig, args: PrivateArgs) -> anyhow::Result<()> {
    let layout = config.layout();
    if args.stale {
        let found = stale_private_versions(&layout)?;
        if found.is_empty() {
            println!("No stale private versions.");
        }
        for item in found {
            println!("  {}:{}  {}", item.name.to_string().yellow(), item.version, item.path.display());
        }
    } else {
        let found = fully_private_modules(&layout)?;
        if found.is_empty() {
            println!("No fully private modules.");
        }
        for name in found {
            println!("  {}  {}", name.to_string().yellow(), layout.module_dir(&name).display());
        }
    }
    Ok(())
}

fn cmd_manifest(args: ManifestArgs) -> anyhow::Result<()> {
    let manifest = describe_tree(&args.dir)?;
    match &args.output {
        Some(path) => {
            write_document(path, &manifest)?;
            println!("{} Wrote {}", "✓".green().bold(), path.display());
        }
        None => print!("{}", serde_yaml::to_string(&manifest)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use modhub_archive::ArchiveWriter;
    use modhub_catalog::ManifestReader;
    use std::path::Path;

    fn write_config(root: &Path) -> std::path::PathBuf {
        let path = root.join("hub.toml");
        let text = format!(
            "store_root = {:?}\ntemp_dir = {:?}\nuploads_dir = {:?}\nclient_versions = [\"2.0\"]\n",
            root.join("store"),
            root.join("tmp"),
            root.join("uploads"),
        );
        std::fs::write(&path, text).unwrap();
        path
    }

    /// A module directory plus its archive and manifest, as an author would submit them.
    fn author_upload(root: &Path, name: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let src = root.join("src").join(name);
        std::fs::create_dir_all(src.join("data")).unwrap();
        std::fs::write(src.join(format!("{name}.py")), "print('hi')\n").unwrap();
        std::fs::write(
            src.join(format!("{name}.yml")),
            "title: Hello\ntype: annotator\ndeveloper: someone\ndescription: greets\n",
        )
        .unwrap();
        std::fs::write(src.join("data/words.txt"), "hello\n").unwrap();

        let manifest = root.join(format!("{name}.manifest.yml"));
        let archive = root.join(format!("{name}.zip"));
        let cli = Cli::parse_from([
            "modhub",
            "manifest",
            src.to_str().unwrap(),
            "-o",
            manifest.to_str().unwrap(),
        ]);
        run_command(cli).unwrap();
        let mut writer = ArchiveWriter::new(&archive);
        writer.add_tree(&src, &[]).unwrap();
        writer.finish().unwrap();
        (archive, manifest)
    }

    fn run(config: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["modhub", "-c", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::parse_from(argv))
    }

    #[test]
    fn publish_then_delete_through_the_cli() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        let (archive, manifest) = author_upload(dir.path(), "hello");
        let (archive, manifest) = (archive.to_str().unwrap(), manifest.to_str().unwrap());

        run(&config, &["publish", "hello", "1.0", archive, manifest]).unwrap();
        assert!(Path::new(archive).is_file(), "inputs are copied, not moved");

        let layout = WorkerConfig::load(&config).unwrap().layout();
        let published = ManifestReader::new(&layout).read().unwrap();
        let entry = published.get(&ModuleName::parse("hello").unwrap()).unwrap();
        assert_eq!(entry.latest_version, ModuleVersion::parse("1.0").unwrap());
        assert!(entry.data_size > 0);

        // Republishing without --overwrite is refused up front.
        assert!(run(&config, &["publish", "hello", "1.0", archive, manifest]).is_err());
        run(&config, &["publish", "hello", "1.0", archive, manifest, "--overwrite"]).unwrap();

        run(&config, &["delete", "hello"]).unwrap();
        assert!(ManifestReader::new(&layout).read().unwrap().is_empty());
        assert!(run(&config, &["delete", "hello"]).is_err());
    }

    #[test]
    fn rebuild_and_audits_run_on_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        run(&config, &["rebuild"]).unwrap();
        run(&config, &["private"]).unwrap();
        run(&config, &["private", "--stale"]).unwrap();
        run(&config, &["versions", "nothing"]).unwrap();
        assert!(dir.path().join("store/manifest.yml").is_file());
        assert!(dir.path().join("store/manifest.2.0.yml").is_file());
    }
}
