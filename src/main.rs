use session::Session;
use std::io::BufRead;

mod compute;
mod data;
mod normalize;
mod read;
mod session;
mod write;

/// Where diagnostics go when no path is given on the command line
const DEFAULT_LOG_FILE: &str = "logs/debug.log";

/// `ledger [LOG_FILE]`
fn log_file(args: &[String]) -> Result<&str, anyhow::Error> {
    match args {
        [_] => Ok(DEFAULT_LOG_FILE),
        [_, path] => Ok(path.as_str()),
        _ => anyhow::bail!(
            "usage: {} [{DEFAULT_LOG_FILE}] < commands",
            args.first().map_or("ledger", String::as_str)
        ),
    }
}

/// Diagnostics are appended to `path`, creating its directory if needed.
/// `RUST_LOG` still wins over the default `debug` level.
fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if let Some(dir) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let args: Vec<String> = std::env::args().collect();
    init_logging(log_file(&args)?)?;
    let mut session = Session::new();
    let stdout = std::io::stdout();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        session.execute(line, stdout.lock())?;
    }
    Ok(())
}
