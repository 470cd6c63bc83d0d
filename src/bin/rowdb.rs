use std::path::PathBuf;
use std::process;

use clap::Parser;
use rowdb::config::TableConfig;
use rowdb::error::RowDbError;
use rowdb::statement::{self, constants_report, ExecResult, MetaCommand};
use rowdb::Table;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rowdb", about = "rowdb - single-file B-tree row store")]
struct Cli {
    /// Path to the database file (created if missing)
    db_path: PathBuf,

    /// Execute one statement or meta command and exit
    #[arg(short = 'e')]
    execute: Option<String>,

    /// Maximum number of pages the table may hold
    #[arg(long)]
    max_pages: Option<u32>,

    /// Cells per leaf before it splits (must match the file)
    #[arg(long)]
    leaf_max_cells: Option<u32>,
}

enum Flow {
    Continue,
    Exit,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fatal(context: &str, e: RowDbError) -> ! {
    eprintln!("ERROR: {}: {}", context, e);
    process::exit(1);
}

fn run_meta(command: MetaCommand, table: &mut Table) -> Result<Flow, RowDbError> {
    match command {
        MetaCommand::Exit => return Ok(Flow::Exit),
        MetaCommand::Constants => {
            println!("Constants:");
            print!("{}", constants_report());
        }
        MetaCommand::BTree => {
            println!("Tree:");
            print!("{}", table.dump_tree()?);
        }
    }
    Ok(Flow::Continue)
}

fn run_line(line: &str, table: &mut Table) -> Result<Flow, RowDbError> {
    if line.starts_with('.') {
        return run_meta(MetaCommand::parse(line)?, table);
    }

    match statement::execute_line(line, table)? {
        ExecResult::Inserted => {}
        ExecResult::Rows(rows) => {
            for row in &rows {
                println!("{}", row);
            }
        }
    }
    println!("Executed.");
    Ok(Flow::Continue)
}

/// Run one line, reporting recoverable errors and aborting on the rest.
fn handle_line(line: &str, table: &mut Table) -> Flow {
    match run_line(line, table) {
        Ok(flow) => flow,
        Err(e) if e.is_recoverable() => {
            println!("Error: {}", e);
            Flow::Continue
        }
        Err(e) => fatal("statement failed", e),
    }
}

fn run_repl(table: &mut Table) {
    let mut rl = rustyline::DefaultEditor::new().unwrap_or_else(|e| {
        eprintln!("ERROR: Failed to initialize REPL: {}", e);
        process::exit(1);
    });

    loop {
        match rl.readline("db > ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);
                if let Flow::Exit = handle_line(trimmed, table) {
                    break;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!();
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                break;
            }
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let mut config = TableConfig::default();
    if let Some(max_pages) = cli.max_pages {
        config = config.with_max_pages(max_pages);
    }
    if let Some(leaf_max_cells) = cli.leaf_max_cells {
        config = config.with_leaf_max_cells(leaf_max_cells);
    }

    let mut table = Table::open_with_config(&cli.db_path, config)
        .unwrap_or_else(|e| fatal("Failed to open database", e));

    if let Some(line) = &cli.execute {
        handle_line(line.trim(), &mut table);
    } else {
        run_repl(&mut table);
    }

    if let Err(e) = table.close() {
        fatal("Failed to close database", e);
    }
}
