use std::path::PathBuf;

use anyhow::Result;
use rustyline::{error::ReadlineError, Editor};
use structopt::StructOpt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use relalg::{render, DataSet, Query};

const HELP: &str = "\
Relational operators (glyphs only):
  π a, b (r)            projection
  σ predicate (r)       selection
  ρ s (r)               rename relation
  ρ s [a, b] (r)        rename relation and attributes
  r ∪ s   r ∩ s   r − s union, intersection, difference
  r × s                 cartesian product
  r ⨝ s                 natural join
Predicates (glyph or ASCII):
  =   ≠ !=   <   ≤ <=   >   ≥ >=   ∧   ∨   ¬ !
Commands:
  .tables  .tree  .help  .quit";

#[derive(Debug, StructOpt)]
#[structopt(name = "relalg", about = "Interactive relational algebra interpreter")]
struct Opt {
    /// Load relations from every table of a SQLite database instead of the sample data
    #[structopt(short, long, env = "RELALG_DATABASE", parse(from_os_str))]
    database: Option<PathBuf>,

    /// Evaluate one expression and exit
    #[structopt(short, long)]
    command: Option<String>,

    /// Print the tree of intermediate relations for each query
    #[structopt(short, long)]
    tree: bool,

    /// Enable debug logging
    #[structopt(short, long)]
    verbose: bool,

    /// Line editor history file
    #[structopt(long, parse(from_os_str))]
    history: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "relalg=debug" } else { "relalg=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn handle_input(data_set: &DataSet, code: &str, show_tree: bool) -> Result<String> {
    let query = Query::new(code)?;
    let evaluation = query.run(data_set)?;

    let mut out = String::new();
    if show_tree {
        out.push_str(&evaluation.tree()?.render());
    }
    out.push_str(&render::table(evaluation.relation()));
    out.push('\n');
    out.push_str(&render::row_count(evaluation.relation()));
    Ok(out)
}

fn print_tables(data_set: &DataSet) {
    for (name, relation) in data_set.iter() {
        println!("{}", render::schema(name, relation));
    }
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    init_logging(opt.verbose);

    let data_set = match &opt.database {
        Some(path) => DataSet::open(path)?,
        None => DataSet::sample()?,
    };
    debug!(relations = data_set.len(), "data set ready");

    if let Some(code) = &opt.command {
        println!("{}", handle_input(&data_set, code, opt.tree)?);
        return Ok(());
    }

    let mut editor = Editor::<()>::new();
    if let Some(path) = &opt.history {
        if path.exists() {
            let _ = editor.load_history(path);
        }
    }

    let mut show_tree = opt.tree;
    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line);

                match line {
                    ".quit" => break,
                    ".help" => println!("{}", HELP),
                    ".tables" => print_tables(&data_set),
                    ".tree" => {
                        show_tree = !show_tree;
                        println!("tree {}", if show_tree { "on" } else { "off" });
                    }
                    _ => match handle_input(&data_set, line, show_tree) {
                        Ok(output) => println!("{}", output),
                        Err(e) => println!("Error: {}", e),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    if let Some(path) = &opt.history {
        if let Err(e) = editor.save_history(path) {
            debug!("failed to save history: {}", e);
        }
    }

    Ok(())
}
