use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use pokerbook::pipeline::LogProgress;
use pokerbook::{
    books, book_status, load_config, BookCoordinator, BookRun, BookWorkerPool, Capabilities,
    Config, Database, PokerbookError, ProcessingConfig,
};

const USAGE: &str = "\
Usage: pokerbook [--config <file>] <command>

Commands:
  add-images <title> <image>...   Create a book from page images
  add-pdf <title> <pdf>           Create a book from a PDF
  import-dir <title> <dir>        Create a book from a directory of images or a PDF
  process <book_id>               Process a book and wait for the result
  reprocess <book_id>             Reset a book and process it again
  status <book_id>                Print the book status as JSON";

enum Command {
    AddImages { title: String, images: Vec<PathBuf> },
    AddPdf { title: String, pdf: PathBuf },
    ImportDir { title: String, dir: PathBuf },
    Process { book_id: i64 },
    Reprocess { book_id: i64 },
    Status { book_id: i64 },
}

struct Cli {
    config_path: Option<PathBuf>,
    command: Command,
}

impl Cli {
    fn from_args(args: &[String]) -> Result<Self, String> {
        let mut config_path = None;
        let mut positional = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    let value = args.get(i).ok_or("--config requires a file")?;
                    config_path = Some(PathBuf::from(value));
                }
                "--help" | "-h" => return Err(String::new()),
                _ => positional.push(args[i].clone()),
            }
            i += 1;
        }

        let (name, rest) = positional.split_first().ok_or("missing command")?;
        let command = match (name.as_str(), rest) {
            ("add-images", [title, images @ ..]) if !images.is_empty() => Command::AddImages {
                title: title.clone(),
                images: images.iter().map(PathBuf::from).collect(),
            },
            ("add-pdf", [title, pdf]) => Command::AddPdf {
                title: title.clone(),
                pdf: PathBuf::from(pdf),
            },
            ("import-dir", [title, dir]) => Command::ImportDir {
                title: title.clone(),
                dir: PathBuf::from(dir),
            },
            ("process", [id]) => Command::Process { book_id: parse_id(id)? },
            ("reprocess", [id]) => Command::Reprocess { book_id: parse_id(id)? },
            ("status", [id]) => Command::Status { book_id: parse_id(id)? },
            (other, _) => return Err(format!("invalid arguments for '{}'", other)),
        };

        Ok(Self {
            config_path,
            command,
        })
    }
}

fn parse_id(value: &str) -> Result<i64, String> {
    value
        .parse()
        .map_err(|_| format!("'{}' is not a valid book id", value))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }
}

fn load(config_path: Option<&Path>) -> Result<Config, PokerbookError> {
    match config_path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(Config::default()),
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match Cli::from_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("Error: {}\n", message);
            }
            eprintln!("{}", USAGE);
            return if message.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            };
        }
    };

    init_logging();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, PokerbookError> {
    let config = load(cli.config_path.as_deref())?;
    let db = Database::open(Path::new(&config.database_path))?;

    match cli.command {
        Command::AddImages { title, images } => {
            let book_id = books::create_book_from_images(&db, &title, "", &images)?;
            println!("{}", book_id);
        }
        Command::AddPdf { title, pdf } => {
            let book_id = books::create_book_from_pdf(&db, &title, "", &pdf)?;
            println!("{}", book_id);
        }
        Command::ImportDir { title, dir } => {
            let book_id = books::import_directory(&db, &title, &dir)?;
            println!("{}", book_id);
        }
        Command::Process { book_id } => {
            let job_id = books::enqueue_processing(&db, book_id)?;
            let succeeded = process(&config, db.clone(), book_id, job_id)?;
            print_status(&db, book_id)?;
            if !succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Reprocess { book_id } => {
            let job_id = books::prepare_reprocess(&db, book_id)?;
            let succeeded = process(&config, db.clone(), book_id, job_id)?;
            print_status(&db, book_id)?;
            if !succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Status { book_id } => print_status(&db, book_id)?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Runs one book on the worker pool and waits for its outcome. A failed
/// run is already recorded on the job, so it is logged and reported as
/// `false` rather than returned.
fn process(config: &Config, db: Database, book_id: i64, job_id: i64) -> Result<bool, PokerbookError> {
    let capabilities = Capabilities::from_config(config)?;
    let coordinator = BookCoordinator::new(db, ProcessingConfig::from_config(config), capabilities)
        .with_progress(Arc::new(LogProgress));
    let pool = BookWorkerPool::new(Arc::new(coordinator), config.worker_count)?;

    pool.submit(BookRun::new(book_id, job_id))?;
    let outcome = pool.recv_result();
    pool.shutdown();
    pool.wait();

    match outcome {
        Some(outcome) if outcome.success => {
            tracing::info!(book_id, job_id, "Book processed");
            Ok(true)
        }
        Some(outcome) => {
            tracing::error!(
                book_id,
                job_id,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "Book processing failed"
            );
            Ok(false)
        }
        None => Err(pokerbook::WorkerError::ChannelClosed.into()),
    }
}

fn print_status(db: &Database, book_id: i64) -> Result<(), PokerbookError> {
    let report = book_status(db, book_id)?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize status: {}", e),
    }
    Ok(())
}
