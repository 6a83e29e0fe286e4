use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use remeta::apply::{ApplyOptions, ApplyStats, MetadataApplier};
use remeta::backend::boxfs::BoxBackend;
use remeta::backend::drive::DriveBackend;
use remeta::backend::Backend;
use remeta::cli::{Action, Cli, DestBackendKind};
use remeta::config::Config;
use remeta::domain::DomainMapper;
use remeta::path::TreePath;
use remeta::report;
use remeta::session::{AccountSlot, SessionStore, StoredSession};
use remeta::tree::matcher::{match_trees, MatchResult};
use remeta::tree::TreeBuilder;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    cli.validate()?;

    let config = Config::load()?;
    let store = SessionStore::open_default()?;

    match cli.action() {
        Action::Setup => setup(&cli, &config, &store).await,
        Action::Status => status(&cli, &config, &store).await,
        Action::PrintSource => print_tree(&cli, &config, &store, AccountSlot::Source).await,
        Action::PrintDest => print_tree(&cli, &config, &store, AccountSlot::Dest).await,
        Action::Update => run(&cli, &config, &store, false).await,
        Action::Check => run(&cli, &config, &store, true).await,
    }
}

fn dest_kind(cli: &Cli, config: &Config) -> DestBackendKind {
    if let Some(kind) = cli.dest_backend {
        return kind;
    }
    match config.defaults.dest_backend.as_deref() {
        Some("drive") => DestBackendKind::Drive,
        _ => DestBackendKind::Box,
    }
}

fn root_for(cli: &Cli, config: &Config, slot: AccountSlot) -> TreePath {
    let configured = match slot {
        AccountSlot::Source => cli
            .source_root
            .as_deref()
            .or(config.defaults.source_root.as_deref()),
        AccountSlot::Dest => cli
            .dest_root
            .as_deref()
            .or(config.defaults.dest_root.as_deref()),
    };
    configured.map(TreePath::parse).unwrap_or_default()
}

fn mapper_for(cli: &Cli, config: &Config) -> Option<DomainMapper> {
    let domain = cli
        .new_domain
        .as_deref()
        .or(config.translation.domain.as_deref())?;
    Some(DomainMapper::new(domain).with_overrides(config.translation.overrides.clone()))
}

async fn backend_for(
    cli: &Cli,
    config: &Config,
    store: &SessionStore,
    slot: AccountSlot,
) -> Result<Arc<dyn Backend>> {
    if slot == AccountSlot::Source {
        return Ok(Arc::new(DriveBackend::connect(store, slot).await?));
    }
    match dest_kind(cli, config) {
        DestBackendKind::Drive => Ok(Arc::new(DriveBackend::connect(store, slot).await?)),
        DestBackendKind::Box => Ok(Arc::new(BoxBackend::connect(store, slot)?)),
    }
}

async fn setup(cli: &Cli, config: &Config, store: &SessionStore) -> Result<()> {
    println!("Connecting the source Drive account...");
    let source = DriveBackend::connect(store, AccountSlot::Source).await?;
    let identity = source.authenticate().await?;
    store.save(
        AccountSlot::Source,
        &StoredSession {
            backend: "drive".to_string(),
            account_email: identity.email.clone(),
            obtained_at: Utc::now(),
            access_token: None,
            refresh_token: None,
        },
    )?;
    println!("  source: {} (drive)", identity.email.green());

    let identity = match dest_kind(cli, config) {
        DestBackendKind::Drive => {
            println!("Connecting the destination Drive account...");
            let dest = DriveBackend::connect(store, AccountSlot::Dest).await?;
            let identity = dest.authenticate().await?;
            store.save(
                AccountSlot::Dest,
                &StoredSession {
                    backend: "drive".to_string(),
                    account_email: identity.email.clone(),
                    obtained_at: Utc::now(),
                    access_token: None,
                    refresh_token: None,
                },
            )?;
            identity
        }
        DestBackendKind::Box => {
            println!("Connecting the destination Box account...");
            let token = cli.box_token.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "a Box access token is required: pass --box-token or set REMETA_BOX_TOKEN"
                )
            })?;
            let dest = BoxBackend::with_token(token.clone(), AccountSlot::Dest);
            let identity = dest.authenticate().await?;
            store.save(
                AccountSlot::Dest,
                &StoredSession {
                    backend: "box".to_string(),
                    account_email: identity.email.clone(),
                    obtained_at: Utc::now(),
                    access_token: Some(token),
                    refresh_token: None,
                },
            )?;
            identity
        }
    };
    println!("  destination: {}", identity.email.green());
    println!("\n{}", "✓ Both accounts connected".green().bold());
    Ok(())
}

async fn status(cli: &Cli, config: &Config, store: &SessionStore) -> Result<()> {
    for slot in [AccountSlot::Source, AccountSlot::Dest] {
        match store.load(slot)? {
            None => println!(
                "{}: {} (run `remeta --setup`)",
                slot,
                "not connected".yellow()
            ),
            Some(session) => {
                let backend = backend_for(cli, config, store, slot).await?;
                match backend.authenticate().await {
                    Ok(identity) => println!(
                        "{}: {} as {} ({})",
                        slot,
                        "connected".green(),
                        identity.email,
                        session.backend
                    ),
                    Err(e) => println!("{}: {} ({})", slot, "session expired".red(), e),
                }
            }
        }
    }
    Ok(())
}

async fn print_tree(
    cli: &Cli,
    config: &Config,
    store: &SessionStore,
    slot: AccountSlot,
) -> Result<()> {
    let backend = backend_for(cli, config, store, slot).await?;
    let root = root_for(cli, config, slot);
    let tree = TreeBuilder::new(backend).build(&root).await?;

    let mut out = report::output_target(cli.output.as_deref())?;
    if cli.xml {
        let xml = report::xml::tree_to_xml(&tree)?;
        writeln!(out, "{}", xml)?;
    } else {
        report::render_tree(&tree, cli.verbose > 0, &mut out)?;
    }
    Ok(())
}

async fn run(cli: &Cli, config: &Config, store: &SessionStore, dry_run: bool) -> Result<()> {
    let started = Instant::now();
    let source_root = root_for(cli, config, AccountSlot::Source);
    let dest_root = root_for(cli, config, AccountSlot::Dest);

    if !cli.quiet {
        println!("remeta v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Matching drive:/{} → {}:/{}",
            source_root,
            match dest_kind(cli, config) {
                DestBackendKind::Drive => "drive",
                DestBackendKind::Box => "box",
            },
            dest_root
        );
        if dry_run {
            println!("Mode: Dry-run (no metadata will be written)\n");
        }
    }

    let source = backend_for(cli, config, store, AccountSlot::Source).await?;
    let dest = backend_for(cli, config, store, AccountSlot::Dest).await?;

    let source_tree = TreeBuilder::new(source).build(&source_root).await?;
    let dest_tree = TreeBuilder::new(dest.clone()).build(&dest_root).await?;
    let result = match_trees(&source_tree, &dest_tree);

    let applier = MetadataApplier::new(
        dest,
        mapper_for(cli, config),
        ApplyOptions {
            dry_run,
            update_owner: cli.update_owner,
            update_permissions: cli.update_permissions,
            quiet: cli.quiet,
        },
    );
    let stats = applier.apply(&result).await?;

    let mut out = report::output_target(cli.output.as_deref())?;
    if cli.report {
        if cli.xml {
            let xml = report::xml::match_result_to_xml(&result)?;
            writeln!(out, "{}", xml)?;
        } else {
            report::render_match_report(&result, &mut out)?;
        }
    }
    report::render_write_errors(&stats, &mut out)?;

    if !cli.quiet {
        print_summary(&result, &stats, dry_run, started.elapsed());
    }
    Ok(())
}

fn print_summary(
    result: &MatchResult,
    stats: &ApplyStats,
    dry_run: bool,
    duration: std::time::Duration,
) {
    if dry_run {
        println!("\n{}\n", "✓ Check complete (no metadata written)".green().bold());
    } else {
        println!("\n{}\n", "✓ Update complete".green().bold());
    }

    println!("  Pairs matched:        {}", result.matched.len().to_string().blue());
    println!(
        "  Missing on dest:      {}",
        colorize_count(result.missing.len())
    );
    println!(
        "  Only on dest:         {}",
        result.unexpected.len().to_string().bright_black()
    );
    println!(
        "  Duplicates (src/dst): {} / {}",
        colorize_count(result.duplicates_source.len()),
        colorize_count(result.duplicates_dest.len())
    );

    println!();
    if dry_run {
        println!("  Would write:          {}", stats.planned.to_string().yellow());
    } else {
        println!("  Metadata written:     {}", stats.written.to_string().green());
        if stats.already_tagged > 0 {
            println!(
                "  Already tagged:       {}",
                stats.already_tagged.to_string().bright_black()
            );
        }
        if stats.errors.is_empty() {
            println!("  Write failures:       {}", "0".bright_black());
        } else {
            println!("  Write failures:       {}", stats.errors.len().to_string().red());
        }
    }
    println!("  Duration:             {}", format_duration(duration).cyan());
}

fn colorize_count(count: usize) -> colored::ColoredString {
    if count > 0 {
        count.to_string().yellow()
    } else {
        count.to_string().bright_black()
    }
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
