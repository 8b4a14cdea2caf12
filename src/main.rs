//! GitWiki - command-line access to a Git-backed wiki
//!
//! This is the main entry point for the `gitwiki` command.

use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use gitwiki::logger::Logger;
use gitwiki::storage::Author;
use gitwiki::wiki::{Pagination, Wiki, WikiConfig, WikiError};

/// commands and the number of operands each takes
const COMMANDS: &[(&str, usize)] = &[
    ("list", 0),
    ("cat", 1),
    ("raw", 1),
    ("new", 1),
    ("edit", 1),
    ("mv", 2),
    ("rm", 1),
    ("log", 1),
];

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_REPOSITORY: u8 = 3;

/// a command line that names no known command or has the wrong operands
#[derive(Debug)]
struct UsageError(String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UsageError {}

struct Options {
    path: PathBuf,
    branch: Option<String>,
    message: Option<String>,
    author: Option<String>,
    email: Option<String>,
    verbose: bool,
    json: bool,
    page: usize,
    per_page: usize,
    limit: Option<usize>,
    args: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wiki.git"),
            branch: None,
            message: None,
            author: None,
            email: None,
            verbose: false,
            json: false,
            page: 1,
            per_page: 50,
            limit: None,
            args: Vec::new(),
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Try 'gitwiki --help' for more information.");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if let Err(e) = Logger::init(opts.verbose) {
        eprintln!("Warning: could not install logger: {}", e);
    }

    let Some((command, rest)) = opts.args.split_first() else {
        print_help();
        return ExitCode::from(EXIT_USAGE);
    };
    if let Err(e) = check_usage(command, rest) {
        eprintln!("{}", e);
        eprintln!("Try 'gitwiki --help' for more information.");
        return ExitCode::from(EXIT_USAGE);
    }

    // Open wiki.
    let mut config = WikiConfig::new(&opts.path);
    if let Some(branch) = &opts.branch {
        config = config.branch(branch);
    }
    let wiki = match config.open() {
        Ok(wiki) => wiki,
        Err(e) => {
            eprintln!("Error opening wiki: {}", e);
            return ExitCode::from(exit_status(&e));
        }
    };

    match run_command(&wiki, &opts, command, rest) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_status(e.as_ref()))
        }
    }
}

fn check_usage(command: &str, operands: &[String]) -> Result<(), UsageError> {
    match COMMANDS.iter().find(|(name, _)| *name == command) {
        None => Err(UsageError(format!("Unknown command: {}", command))),
        Some((_, arity)) if *arity != operands.len() => Err(UsageError(format!(
            "'{}' takes {} argument(s), got {}",
            command,
            arity,
            operands.len()
        ))),
        Some(_) => Ok(()),
    }
}

/// 2 for usage errors, 3 for repository failures, 1 for everything else
fn exit_status(err: &(dyn std::error::Error + 'static)) -> u8 {
    if err.is::<UsageError>() {
        return EXIT_USAGE;
    }
    match err.downcast_ref::<WikiError>() {
        Some(e) if !e.is_user_error() => EXIT_REPOSITORY,
        _ => EXIT_FAILURE,
    }
}

/// `Ok(None)` when the arguments only asked for help or the version.
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut opts = Options::default();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = || -> Result<String, String> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("Option '{}' needs a value", arg))
        };
        match arg {
            "-d" | "--wiki" => opts.path = PathBuf::from(value()?),
            "-b" | "--branch" => opts.branch = Some(value()?),
            "-m" | "--message" => opts.message = Some(value()?),
            "--author" => opts.author = Some(value()?),
            "--email" => opts.email = Some(value()?),
            "--page" => opts.page = parse_number(arg, &value()?)?,
            "--per-page" => opts.per_page = parse_number(arg, &value()?)?,
            "-n" | "--limit" => opts.limit = Some(parse_number(arg, &value()?)?),
            "-v" | "--verbose" => opts.verbose = true,
            "--json" => opts.json = true,
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "--version" => {
                println!("gitwiki v{}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            arg => {
                if arg.starts_with('-') && arg != "-" {
                    return Err(format!("Unknown option: {}", arg));
                }
                opts.args.push(arg.to_string());
            }
        }
        i += 1;
    }

    Ok(Some(opts))
}

fn parse_number(option: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("Option '{}' expects a number, got '{}'", option, value))
}

fn print_help() {
    println!("GitWiki - A Git-backed wiki page store");
    println!();
    println!("Usage: gitwiki [OPTIONS] COMMAND [ARGS]");
    println!();
    println!("Commands:");
    println!("  list                   List pages, Home first");
    println!("  cat TITLE              Print a page");
    println!("  raw PATH               Print a stored file as-is");
    println!("  new TITLE              Create a page from stdin");
    println!("  edit TITLE             Replace a page's content from stdin");
    println!("  mv OLD NEW             Rename a page, keeping its content");
    println!("  rm TITLE               Delete a page");
    println!("  log TITLE              Show a page's revisions");
    println!();
    println!("Exit status: 0 on success, 1 on a page error,");
    println!("2 on bad arguments, 3 when the repository itself fails.");
    println!();
    println!("Options:");
    println!("  -d, --wiki PATH        Path to the wiki repository (default: wiki.git)");
    println!("  -b, --branch NAME      Branch holding the pages (default: master)");
    println!("  -m, --message TEXT     Commit message");
    println!("      --author NAME      Commit author name");
    println!("      --email EMAIL      Commit author email");
    println!("      --page N           Listing page (default: 1)");
    println!("      --per-page N       Listing page size (default: 50)");
    println!("  -n, --limit N          Maximum revisions for 'log'");
    println!("      --json             Print results as JSON");
    println!("  -v, --verbose          Enable verbose output");
    println!("  -h, --help             Show this help message");
    println!("  --version              Show version");
    println!();
    println!("Examples:");
    println!("  echo '# Hi' | gitwiki new Home        Create the Home page");
    println!("  gitwiki mv 'Old Name' 'Guides/New'    Rename a page");
    println!("  gitwiki --json list                   List pages as JSON");
}

fn run_command(
    wiki: &Wiki,
    opts: &Options,
    command: &str,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let message = opts.message.as_deref();

    match (command, args) {
        ("list", []) => {
            let slice = wiki.list_page_slice(Pagination::new(opts.page, opts.per_page))?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&slice)?);
            } else {
                for page in &slice.items {
                    println!("{}\t{}", page.name, page.filename);
                }
                println!("({} of {} pages)", slice.items.len(), slice.total);
            }
        }
        ("cat", [title]) => {
            let page = wiki.read_page(title)?;
            if opts.json {
                let mut value = serde_json::to_value(&page)?;
                value["content"] = serde_json::Value::String(page.text());
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                std::io::stdout().write_all(&page.content)?;
            }
        }
        ("raw", [path]) => {
            let raw = wiki.resolve_raw(path)?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&raw)?);
            } else {
                std::io::stdout().write_all(&raw.content)?;
            }
        }
        ("new", [title]) => {
            let change = wiki.create_page(title, &read_stdin()?, message, &author(opts))?;
            print_change(opts, &change)?;
        }
        ("edit", [title]) => {
            let change = wiki.update_page(title, &read_stdin()?, message, &author(opts))?;
            print_change(opts, &change)?;
        }
        ("mv", [old, new]) => {
            let content = wiki.read_page(old)?.content;
            let change = wiki.rename_page(old, new, &content, message, &author(opts))?;
            print_change(opts, &change)?;
        }
        ("rm", [title]) => {
            let commit = wiki.delete_page(title, message, &author(opts))?;
            if opts.json {
                println!("{}", serde_json::json!({ "commit": commit }));
            } else {
                println!("deleted '{}' in {}", title, commit.short());
            }
        }
        ("log", [title]) => {
            let history = wiki.page_history(title, opts.limit)?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for commit in &history {
                    println!(
                        "{} {} {} {}",
                        commit.id.short(),
                        commit.timestamp.format("%Y-%m-%d %H:%M"),
                        commit.author_name,
                        commit.summary()
                    );
                }
            }
        }
        (other, _) => {
            return Err(Box::new(UsageError(format!(
                "Unknown command or wrong arguments: {}",
                other
            ))));
        }
    }
    Ok(())
}

fn author(opts: &Options) -> Author {
    let system = Author::system();
    Author::new(
        opts.author.clone().unwrap_or(system.name),
        opts.email.clone().unwrap_or(system.email),
    )
}

fn read_stdin() -> std::io::Result<Vec<u8>> {
    let mut content = Vec::new();
    std::io::stdin().read_to_end(&mut content)?;
    Ok(content)
}

fn print_change(
    opts: &Options,
    change: &gitwiki::wiki::PageChange,
) -> Result<(), Box<dyn std::error::Error>> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(change)?);
    } else {
        println!(
            "{} -> {} in {}",
            change.page.name,
            change.page.filename,
            change.commit.short()
        );
    }
    Ok(())
}
