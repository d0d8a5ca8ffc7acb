use lotus::cli::{Args, Command};
use lotus::{
    Activation, BrowserConfig, FileSystemEntry, ItemOutcome, Location, LotusError,
    NavigationController, Result, SharedClipboard, TransferHandle, TransferMode, TransferResult,
    TransferWorker,
};

use chrono::Local;
use log::info;
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse_args();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let config = BrowserConfig::from(&args);

    match run(&args, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Executes one subcommand. Returns whether every requested item succeeded.
async fn run(args: &Args, config: &BrowserConfig) -> Result<bool> {
    match &args.command {
        Command::Ls { .. } => {
            let nav = config.navigation()?;
            list_directory(&nav, config, args.json)?;
            Ok(true)
        }
        Command::Info { path } => {
            let entry = FileSystemEntry::from_path(&absolute(path)?)?;
            if args.json {
                print_json(&entry)?;
            } else {
                print_info(&entry);
            }
            Ok(true)
        }
        Command::Cp {
            sources,
            destination,
        } => transfer(config, sources, destination, TransferMode::Copy, args.json).await,
        Command::Mv {
            sources,
            destination,
        } => transfer(config, sources, destination, TransferMode::Cut, args.json).await,
        Command::Rm { paths, .. } => {
            let paths = paths
                .iter()
                .map(|p| absolute(p))
                .collect::<Result<Vec<_>>>()?;
            let worker = TransferWorker::new(config.transfer_engine(SharedClipboard::new()));
            let result = wait_interruptible(worker.delete_entries(paths)).await?;
            report(&result, args.json)
        }
        Command::Rename { path, new_name } => {
            let worker = TransferWorker::new(config.transfer_engine(SharedClipboard::new()));
            let result = worker.rename_entry(&absolute(path)?, new_name).wait().await?;
            report(&result, args.json)
        }
        Command::Open { path } => {
            let mut nav = NavigationController::new(&env::current_dir().map_err(|e| {
                LotusError::from_io(Path::new("."), e)
            })?)?;
            match nav.activate(path)? {
                Activation::Navigated => list_directory(&nav, config, args.json)?,
                Activation::Opened => info!("opened {}", path.display()),
            }
            Ok(true)
        }
        Command::Places => {
            print_places(args.json)?;
            Ok(true)
        }
    }
}

async fn transfer(
    config: &BrowserConfig,
    sources: &[PathBuf],
    destination: &Path,
    mode: TransferMode,
    json: bool,
) -> Result<bool> {
    let sources = sources
        .iter()
        .map(|p| absolute(p))
        .collect::<Result<Vec<_>>>()?;
    let worker = TransferWorker::new(config.transfer_engine(SharedClipboard::new()));
    worker.engine().set_clipboard(&sources, mode)?;

    let result = wait_interruptible(worker.paste(&absolute(destination)?)).await?;
    report(&result, json)
}

/// Waits for `handle`, cancelling the operation on Ctrl-C. Items that had
/// not started when the interrupt arrived are reported as cancelled.
async fn wait_interruptible(handle: TransferHandle) -> Result<TransferResult> {
    let cancel = handle.cancel_token();
    let wait = handle.wait();
    tokio::pin!(wait);

    tokio::select! {
        result = &mut wait => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted, finishing current item...");
            cancel.cancel();
            wait.await
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|e| LotusError::from_io(path, e))?;
    Ok(cwd.join(path))
}

fn list_directory(nav: &NavigationController, config: &BrowserConfig, json: bool) -> Result<()> {
    let entries = nav.list_current(config.listing.clone())?.entries()?;
    if json {
        return print_json(&entries);
    }

    println!("{}", nav.current_display_name());
    for entry in &entries {
        let size = if entry.is_directory {
            "<DIR>".to_string()
        } else {
            format_size(entry.size_bytes)
        };
        println!(
            "  {:>10}  {}  {}",
            size,
            entry.modified_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            entry.name
        );
    }
    Ok(())
}

fn print_info(entry: &FileSystemEntry) {
    println!("Name:     {}", entry.name);
    println!("Path:     {}", entry.path.display());
    if entry.is_directory {
        println!("Type:     Folder");
    } else {
        let kind = if entry.extension.is_empty() {
            "File".to_string()
        } else {
            format!("{} file", entry.extension.to_uppercase())
        };
        println!("Type:     {}", kind);
        println!("Size:     {} ({} bytes)", format_size(entry.size_bytes), entry.size_bytes);
    }
    println!(
        "Modified: {}",
        entry.modified_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
}

#[derive(Serialize)]
struct Place {
    name: &'static str,
    path: PathBuf,
}

fn print_places(json: bool) -> Result<()> {
    let places: Vec<Place> = Location::available()
        .into_iter()
        .map(|(location, path)| Place {
            name: location.label(),
            path,
        })
        .collect();

    if json {
        return print_json(&places);
    }
    for place in &places {
        println!("{:<10} {}", place.name, place.path.display());
    }
    Ok(())
}

/// Prints one line per item and returns whether all of them succeeded
fn report(result: &TransferResult, json: bool) -> Result<bool> {
    if json {
        print_json(result)?;
        return Ok(result.all_succeeded());
    }

    for item in &result.items {
        let target = item
            .destination
            .as_deref()
            .map(|d| format!(" -> {}", d.display()))
            .unwrap_or_default();
        match &item.outcome {
            ItemOutcome::Succeeded => println!("ok      {}{}", item.source.display(), target),
            ItemOutcome::Failed(reason) => {
                println!("failed  {}{}: {}", item.source.display(), target, reason)
            }
            ItemOutcome::Cancelled => println!("skipped {}{}", item.source.display(), target),
        }
    }

    let failed = result.failed().count();
    let cancelled = result.cancelled().count();
    if failed > 0 || cancelled > 0 {
        eprintln!(
            "{} of {} items did not complete ({} failed, {} cancelled)",
            failed + cancelled,
            result.len(),
            failed,
            cancelled
        );
    }
    Ok(result.all_succeeded())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| LotusError::Io {
        path: PathBuf::from("<stdout>"),
        source: e.into(),
    })
}

/// Format file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
