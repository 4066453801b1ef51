//! Query engine CLI

use clap::{Parser, Subcommand};
use raql::catalog::Catalog;
use raql::cli::{OutputFormat, OutputFormatter, ReplHelper};
use raql::error::Result;
use raql::execution::{ExecutionContext, QueryResult};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "raql")]
#[command(about = "Relational-algebra query engine")]
struct Cli {
    /// Directory containing .table files to load
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Disable the optimizer pass
    #[arg(long)]
    no_optimize: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive REPL
    Repl,

    /// Run a single query and print its result
    Query {
        /// Query string, `;` separates statements
        query: String,

        /// Output format (table, csv, vertical)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Print timing information
        #[arg(short, long)]
        timing: bool,
    },

    /// Print the schema of one table, or of every loaded table
    Schema {
        /// Table name
        table: Option<String>,
    },
}

fn main() {
    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let catalog = match &cli.data {
        Some(dir) => match Catalog::load_dir(dir) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("Error loading {}: {}", dir.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut catalog = Catalog::new();
            catalog.synthesize_meta_tables();
            catalog
        }
    };
    let mut ctx = ExecutionContext::new(catalog).with_optimization(!cli.no_optimize);

    match cli.command {
        Commands::Repl => {
            if let Err(e) = repl(&mut ctx) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Query {
            query,
            format,
            timing,
        } => {
            let format = match OutputFormat::parse(&format) {
                Some(format) => format,
                None => {
                    eprintln!(
                        "Unknown format '{}'. Valid formats: {}",
                        format,
                        OutputFormat::all_names().join(", ")
                    );
                    std::process::exit(1);
                }
            };
            let formatter = OutputFormatter::new(format);
            match ctx.query(&query) {
                Ok(results) => {
                    for result in results {
                        let _ = formatter.print(&result.table);
                        if timing {
                            print_timing(&result);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Schema { table } => {
            let names: Vec<String> = match table {
                Some(name) => vec![name],
                None => ctx.table_names().iter().map(|n| n.to_string()).collect(),
            };
            for name in names {
                if let Err(e) = print_schema(&ctx, &name) {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn print_schema(ctx: &ExecutionContext, name: &str) -> Result<()> {
    let schema = ctx.catalog().retrieve(name)?.schema();
    println!("{}", name);
    for (column, ty) in schema.simple_names().iter().zip(schema.column_types()) {
        println!("  {}: {}", column, ty);
    }
    Ok(())
}

fn print_timing(result: &QueryResult) {
    println!(
        "Timing: parse={:?}, compile={:?}, opt={:?}, exec={:?}, total={:?}",
        result.metrics.parse_time,
        result.metrics.compile_time,
        result.metrics.optimize_time,
        result.metrics.execute_time,
        result.metrics.total_time
    );
}

const REPL_HELP: &str = "\
Enter a query, or one of:
  .help                 show this help
  .tables               list loaded tables
  .schema [table]       show table schema(s)
  .index <table> <col>  build a secondary index
  .format <name>        set output format (table, csv, vertical)
  .optimize <on|off>    toggle the optimizer pass
  .quit                 exit";

fn repl(ctx: &mut ExecutionContext) -> rustyline::Result<()> {
    let helper = ReplHelper::new();
    for name in ctx.table_names() {
        if let Ok(table) = ctx.catalog().retrieve(name) {
            let columns = table
                .schema()
                .simple_names()
                .iter()
                .map(|n| n.to_string())
                .collect();
            helper.register_table(name, columns);
        }
    }

    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(helper));
    let mut formatter = OutputFormatter::default().with_max_rows(40);

    println!("Type .help for help, .quit to exit.");
    loop {
        match rl.readline("raql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                if line.starts_with('.') {
                    if !dot_command(ctx, &mut formatter, line) {
                        break;
                    }
                } else {
                    run_query(ctx, &formatter, line);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }
    Ok(())
}

/// Handle a dot command, returning false when the REPL should exit.
fn dot_command(ctx: &mut ExecutionContext, formatter: &mut OutputFormatter, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");
    match command {
        ".quit" | ".exit" | ".q" => return false,
        ".help" | ".h" => println!("{}", REPL_HELP),
        ".tables" => {
            for name in ctx.table_names() {
                println!("{}", name);
            }
        }
        ".schema" => match parts.next() {
            Some(name) => {
                if let Err(e) = print_schema(ctx, name) {
                    eprintln!("Error: {}", e);
                }
            }
            None => {
                for name in ctx.table_names().iter().map(|n| n.to_string()) {
                    let _ = print_schema(ctx, &name);
                }
            }
        },
        ".index" => match (parts.next(), parts.next()) {
            (Some(table), Some(column)) => match ctx.create_index(table, column) {
                Ok(()) => println!("Created index on {}.{}", table, column),
                Err(e) => eprintln!("Error: {}", e),
            },
            _ => eprintln!("Usage: .index <table> <column>"),
        },
        ".format" => match parts.next().and_then(OutputFormat::parse) {
            Some(format) => formatter.set_format(format),
            None => eprintln!(
                "Usage: .format <{}>",
                OutputFormat::all_names().join("|")
            ),
        },
        ".optimize" => match parts.next() {
            Some("on") => ctx.set_optimization(true),
            Some("off") => ctx.set_optimization(false),
            _ => println!(
                "Optimizer is {}",
                if ctx.optimization() { "on" } else { "off" }
            ),
        },
        other => eprintln!("Unknown command: {}", other),
    }
    true
}

fn run_query(ctx: &ExecutionContext, formatter: &OutputFormatter, text: &str) {
    match ctx.query(text) {
        Ok(results) => {
            for result in results {
                let _ = formatter.print(&result.table);
                println!("{} rows in set", result.table.row_count());
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
