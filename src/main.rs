// automation-recall - reuse automation setups that worked, undo the ones that didn't
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{bail, Context};
use automation_recall_lib::{
    backup::BackupSession,
    core::{ProjectDetector, ReuseRecommender, DEFAULT_MIN_SIMILARITY},
    intelligence::ProjectQuery,
    store::ConfigurationInput,
    ConfigurationStore, RecallError, StorageConfig,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    if let Err(e) = run(&args[1], &args[2..]) {
        match e.downcast_ref::<RecallError>() {
            Some(recall) => eprintln!("✗ {}", recall.user_message()),
            None => eprintln!("✗ {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(command: &str, args: &[String]) -> anyhow::Result<()> {
    match command {
        "save" => handle_save(args),
        "show" => handle_show(args),
        "list" => handle_list(),
        "similar" => handle_similar(args),
        "recommend" => handle_recommend(args),
        "reuse" => handle_reuse(args),
        "stats" => handle_stats(),
        "backup" => handle_backup(args),
        "version" | "-v" | "--version" => {
            println!("automation-recall v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            Ok(())
        }
    }
}

// Logs go to stderr so stdout stays usable for piping JSON
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::new(
        env::var("RUST_LOG").unwrap_or_else(|_| "automation_recall_lib=warn".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// Outside any project, state lives under the home directory
fn load_config() -> anyhow::Result<StorageConfig> {
    let cwd = env::current_dir().context("could not read current directory")?;
    let config = match ProjectDetector::find(&cwd)? {
        Some(root) => StorageConfig::load(root)?,
        None => StorageConfig::user_default()?,
    };
    Ok(config)
}

// Paths typed on the command line are relative to where the user is
fn resolve_against(cwd: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn open_store() -> anyhow::Result<(StorageConfig, Arc<ConfigurationStore>)> {
    let config = load_config()?;
    let store = ConfigurationStore::open(&config)?;
    Ok((config, Arc::new(store)))
}

fn handle_save(args: &[String]) -> anyhow::Result<()> {
    let Some(file) = args.first() else {
        bail!("usage: automation-recall save <config.json>");
    };

    let content =
        std::fs::read_to_string(file).with_context(|| format!("could not read {}", file))?;
    let mut input: ConfigurationInput = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid configuration", file))?;

    let (config, store) = open_store()?;

    // Name it after the workspace if the payload didn't
    if input.project_name == "unknown" {
        if let Some(name) = ProjectDetector::get_project_name(&config.workspace_root) {
            input.project_name = name;
        }
    }

    let id = store.save(input)?;
    println!("✓ Saved configuration: {}", id);

    Ok(())
}

fn handle_show(args: &[String]) -> anyhow::Result<()> {
    let Some(id) = args.first() else {
        bail!("usage: automation-recall show <id>");
    };

    let (_, store) = open_store()?;
    let record = store.load(id)?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

fn handle_list() -> anyhow::Result<()> {
    let (_, store) = open_store()?;
    let entries = store.list_index()?;

    if entries.is_empty() {
        println!("No saved configurations.");
        return Ok(());
    }

    println!("\nSaved configurations:");
    println!("{}", "=".repeat(60));
    for (i, entry) in entries.iter().enumerate() {
        let tech: Vec<&str> = entry.tech_stack.iter().map(String::as_str).collect();
        println!(
            "{:3}. {} {} [{}] {} (reused {} times)",
            i + 1,
            entry.id,
            entry.project_name,
            entry.project_type,
            tech.join(", "),
            entry.reuse_count
        );
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

fn handle_similar(args: &[String]) -> anyhow::Result<()> {
    let (query, min_similarity) = parse_query(args)?;
    let (_, store) = open_store()?;
    let recommender = ReuseRecommender::new(store);

    let matches = recommender.find_similar(&query, min_similarity)?;

    if matches.is_empty() {
        println!(
            "No configurations with similarity >= {:.2}",
            min_similarity
        );
        return Ok(());
    }

    println!("\nFound {} similar configuration(s):", matches.len());
    println!("{}", "=".repeat(60));
    for (i, m) in matches.iter().enumerate() {
        println!(
            "{:3}. {} {} ({}) similarity {:.2}",
            i + 1,
            m.entry.id,
            m.entry.project_name,
            m.entry.project_type,
            m.score
        );
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

fn handle_recommend(args: &[String]) -> anyhow::Result<()> {
    let (query, _) = parse_query(args)?;
    let (_, store) = open_store()?;
    let recommender = ReuseRecommender::new(store);

    match recommender.recommend(&query)? {
        Some(rec) => {
            println!("\n💡 Reuse {} (similarity {:.2})", rec.config_id, rec.similarity);
            println!("   From:      {} ({})", rec.project_name, rec.project_type);
            println!("   Created:   {}", rec.created_at.format("%Y-%m-%d %H:%M"));
            println!("   Reused:    {} times", rec.reuse_count);
            println!("   Agents:    {}", rec.agents.join(", "));
            println!("   Skills:    {}", rec.skills.join(", "));
            println!("   Saves:     {}", rec.time_saved);
            println!("   💭 {}", rec.reason);
        }
        None => println!("No stored configuration is close enough to reuse."),
    }

    Ok(())
}

fn handle_reuse(args: &[String]) -> anyhow::Result<()> {
    let Some(id) = args.first() else {
        bail!("usage: automation-recall reuse <id>");
    };

    let (_, store) = open_store()?;
    let record = ReuseRecommender::new(store).reuse(id)?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

fn handle_stats() -> anyhow::Result<()> {
    let (_, store) = open_store()?;
    let stats = store.statistics()?;

    println!("\nReuse Statistics");
    println!("{}", "=".repeat(60));
    println!("  Configurations: {}", stats.total_configurations);
    println!("  Total reuses:   {}", stats.total_reuses);
    println!("  Average reuses: {:.1}", stats.average_reuses);

    if !stats.project_types.is_empty() {
        println!("\nProject types:");
        for (project_type, count) in &stats.project_types {
            println!("  {:<16} {}", project_type, count);
        }
    }

    if !stats.most_reused.is_empty() {
        println!("\nMost reused:");
        for entry in &stats.most_reused {
            println!("  {} {} ({} times)", entry.id, entry.project_name, entry.reuse_count);
        }
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

fn handle_backup(args: &[String]) -> anyhow::Result<()> {
    let (Some(action), Some(session_id)) = (args.first(), args.get(1)) else {
        bail!("usage: automation-recall backup <create|track-new|track-modify|info|preview|rollback> <session> ...");
    };
    let rest = &args[2..];
    let config = load_config()?;

    match action.as_str() {
        "create" => {
            let description = if rest.is_empty() {
                "Automation setup".to_string()
            } else {
                rest.join(" ")
            };
            let session = BackupSession::create(&config, session_id, &description)?;
            println!(
                "✓ Created backup {} for session {}",
                session.manifest().backup_id,
                session_id
            );
        }
        "track-new" | "track-modify" => {
            let Some(path) = rest.first() else {
                bail!("usage: automation-recall backup {} <session> <path>", action);
            };
            let cwd = env::current_dir().context("could not read current directory")?;
            let path = resolve_against(&cwd, path);
            let mut session = BackupSession::open(&config, session_id)?;
            if action == "track-new" {
                session.track_creation(path)?;
            } else {
                session.track_modification(path)?;
            }
        }
        "info" => {
            let session = BackupSession::open(&config, session_id)?;
            println!("{}", serde_json::to_string_pretty(&session.info())?);
        }
        "preview" => {
            let session = BackupSession::open(&config, session_id)?;
            let preview = session.preview();

            println!("\nRollback preview for {}", session_id);
            println!("{}", "=".repeat(60));
            println!("  Can rollback: {}", preview.can_rollback);
            for path in &preview.will_restore {
                println!("  restore  {}", path);
            }
            for path in &preview.will_delete {
                println!("  delete   {}", path);
            }
            println!("{}", "=".repeat(60));
        }
        "rollback" => {
            let mut session = BackupSession::open(&config, session_id)?;
            let report = session.rollback()?;

            println!("✓ {}", report.summary());
            report.into_result()?;
        }
        other => bail!("unknown backup action: {}", other),
    }

    Ok(())
}

/// `--type T --tech a,b --min X`
fn parse_query(args: &[String]) -> anyhow::Result<(ProjectQuery, f64)> {
    let mut query = ProjectQuery::default();
    let mut min_similarity = DEFAULT_MIN_SIMILARITY;

    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--type", Some(v)) => query.project_type = Some(v.clone()),
            ("--tech", Some(v)) => {
                query.tech_stack.extend(
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from),
                );
            }
            ("--tools", Some(v)) => {
                query
                    .existing_tools
                    .extend(v.split(',').map(str::trim).map(String::from));
            }
            ("--min", Some(v)) => {
                min_similarity = v
                    .parse()
                    .with_context(|| format!("--min expects a number, got {}", v))?;
                if !min_similarity.is_finite() {
                    bail!("--min expects a finite number, got {}", v);
                }
            }
            (flag, _) => bail!("unexpected argument: {}", flag),
        }
        i += 2;
    }

    Ok((query, min_similarity))
}

fn print_usage() {
    println!(
        r#"automation-recall v{} - Reuse automation that worked, undo what didn't

USAGE:
    automation-recall <COMMAND> [OPTIONS]

COMMANDS:
    save <file.json>                   Save a successful configuration
    show <id>                          Print a saved configuration
    list                               List saved configurations
    similar --type T --tech a,b [--min X]
                                       Find similar configurations (default min {:.1})
    recommend --type T --tech a,b      Recommend a configuration to reuse
    reuse <id>                         Fetch a configuration and count the reuse
    stats                              Show reuse statistics
    backup create <session> [desc]     Start a backup for a session
    backup track-new <session> <path>  Record a file created by automation
    backup track-modify <session> <path>
                                       Snapshot a file before changing it
    backup info <session>              Show backup summary
    backup preview <session>           Show what a rollback would do
    backup rollback <session>          Undo the session's changes (once)
    version                            Show version
    help                               Show this help

LOGGING:
    Set RUST_LOG=automation_recall_lib=debug for details on stderr.
"#,
        env!("CARGO_PKG_VERSION"),
        DEFAULT_MIN_SIMILARITY
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_against_keeps_absolute_paths() {
        let cwd = Path::new("/work/project/sub");
        assert_eq!(resolve_against(cwd, "/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(resolve_against(cwd, "a.txt"), cwd.join("a.txt"));
    }

    #[test]
    fn test_parse_query_rejects_nan_min() {
        let args: Vec<String> = ["--type", "programming", "--min", "NaN"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(parse_query(&args).is_err());

        let args: Vec<String> = ["--min", "0.5"].iter().map(|s| s.to_string()).collect();
        assert_eq!(parse_query(&args).unwrap().1, 0.5);
    }

    #[test]
    fn test_track_from_subdirectory_targets_that_file() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("proj");
        let sub = project.join("sub");
        fs::create_dir_all(project.join(".git")).unwrap();
        fs::create_dir_all(&sub).unwrap();
        fs::write(project.join("keep.txt"), "root file").unwrap();
        fs::write(sub.join("keep.txt"), "generated").unwrap();

        let config = StorageConfig::for_workspace(&project);
        let mut session = BackupSession::create(&config, "s", "test").unwrap();

        // User ran `backup track-new s keep.txt` from inside sub/
        session
            .track_creation(resolve_against(&sub, "keep.txt"))
            .unwrap();
        assert_eq!(session.manifest().created_files, vec!["sub/keep.txt".to_string()]);

        let report = session.rollback().unwrap();
        assert!(report.success);
        assert!(!sub.join("keep.txt").exists());
        assert_eq!(fs::read_to_string(project.join("keep.txt")).unwrap(), "root file");
    }
}
