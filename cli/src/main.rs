use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use scoped_fs_search::{
    Context, ListPathsRequest, ReadFilesRequest, ReadRequest, SearchContentsRequest,
    SearchFilesRequest, SearchNamesRequest, Strategy, TraversalOptions,
};

mod error;

use error::{CliError, render_json_error};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ErrorFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Bfs,
    Dfs,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Bfs => Strategy::BreadthFirst,
            StrategyArg::Dfs => Strategy::DepthFirst,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "scoped-fs-search")]
#[command(about = "Read-only listing, name search, reading, and content search inside policy roots.")]
struct Cli {
    /// Policy file path (.toml or .json).
    #[arg(long)]
    policy: PathBuf,

    #[arg(long, value_enum, default_value_t = ErrorFormat::Text)]
    error_format: ErrorFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct TraversalArgs {
    #[arg(long, value_enum, default_value_t = StrategyArg::Bfs)]
    strategy: StrategyArg,
    #[arg(long)]
    max_depth: Option<usize>,
    #[arg(long, default_value_t = 0)]
    page: usize,
    #[arg(long, default_value_t = 100)]
    page_size: usize,
    /// Seconds; negative disables the limit. Defaults to the policy value.
    #[arg(long, allow_negative_numbers = true)]
    time_limit: Option<f64>,
    #[arg(long)]
    include_hidden: bool,
    #[arg(long)]
    files_only: bool,
    #[arg(long)]
    absolute_paths: bool,
}

impl From<TraversalArgs> for TraversalOptions {
    fn from(args: TraversalArgs) -> Self {
        Self {
            strategy: args.strategy.into(),
            max_depth: args.max_depth,
            page_index: args.page,
            page_size: args.page_size,
            time_limit_seconds: args.time_limit,
            include_hidden: args.include_hidden.then_some(true),
            files_only: args.files_only,
            absolute_paths: args.absolute_paths,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the allowed roots.
    Roots,
    /// Classify paths as file, directory, symlink, other, or not accessible.
    PathType {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// List entries below a directory.
    List {
        #[arg(default_value = ".")]
        path: String,
        #[command(flatten)]
        traversal: TraversalArgs,
    },
    /// Search entry names with a regular expression.
    Find {
        pattern: String,
        #[arg(default_value = ".")]
        path: String,
        /// Another name pattern; a name matching any pattern is reported.
        #[arg(long = "regexp", short = 'e')]
        extra_patterns: Vec<String>,
        /// Skip entries (and whole subtrees) whose name matches. Repeatable.
        #[arg(long)]
        exclude: Vec<String>,
        #[command(flatten)]
        traversal: TraversalArgs,
    },
    /// Read a text, DOCX, or PDF file.
    Read {
        path: String,
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Read several files, reporting failures per path.
    ReadFiles {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Search file contents with a regular expression.
    Grep {
        pattern: String,
        #[arg(default_value = ".")]
        path: String,
        /// Another line pattern; a line matching any pattern is reported.
        #[arg(long = "regexp", short = 'e')]
        extra_patterns: Vec<String>,
        #[arg(long, short = 'C', default_value_t = 0)]
        context: usize,
        #[arg(long)]
        file_pattern: Option<String>,
        #[arg(long)]
        file_glob: Option<String>,
        #[command(flatten)]
        traversal: TraversalArgs,
    },
    /// Search the contents of listed files, reporting failures per path.
    GrepFiles {
        pattern: String,
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long = "regexp", short = 'e')]
        extra_patterns: Vec<String>,
        #[arg(long, short = 'C', default_value_t = 0)]
        context: usize,
        #[arg(long, allow_negative_numbers = true)]
        time_limit: Option<f64>,
        #[arg(long)]
        absolute_paths: bool,
    },
}

fn with_extra(pattern: String, extra: Vec<String>) -> Vec<String> {
    std::iter::once(pattern).chain(extra).collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let error_format = cli.error_format;
    if let Err(err) = run(cli) {
        match error_format {
            ErrorFormat::Text => eprintln!("{err}"),
            ErrorFormat::Json => match serde_json::to_string(&render_json_error(&err)) {
                Ok(text) => eprintln!("{text}"),
                Err(_) => eprintln!("{err}"),
            },
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    tracing::debug!(policy = %cli.policy.display(), "loading policy");
    let ctx = Context::from_policy_path(&cli.policy)?;
    let value = execute(&ctx, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn execute(ctx: &Context, command: Command) -> Result<serde_json::Value, CliError> {
    let value = match command {
        Command::Roots => serde_json::to_value(ctx.get_allowed_paths())?,
        Command::PathType { paths } => serde_json::to_value(ctx.get_path_type(&paths))?,
        Command::List { path, traversal } => serde_json::to_value(ctx.list_paths(
            ListPathsRequest {
                path,
                traversal: traversal.into(),
            },
        )?)?,
        Command::Find {
            pattern,
            path,
            extra_patterns,
            exclude,
            traversal,
        } => serde_json::to_value(ctx.search_file_names(SearchNamesRequest {
            path,
            patterns: with_extra(pattern, extra_patterns),
            exclude_patterns: exclude,
            traversal: traversal.into(),
        })?)?,
        Command::Read { path, max_chars } => {
            serde_json::to_value(ctx.read_file(ReadRequest { path, max_chars })?)?
        }
        Command::ReadFiles { paths, max_chars } => {
            serde_json::to_value(ctx.read_files(ReadFilesRequest { paths, max_chars }))?
        }
        Command::Grep {
            pattern,
            path,
            extra_patterns,
            context,
            file_pattern,
            file_glob,
            traversal,
        } => serde_json::to_value(ctx.search_file_contents(SearchContentsRequest {
            path,
            patterns: with_extra(pattern, extra_patterns),
            context_lines: context,
            file_pattern,
            file_glob,
            traversal: traversal.into(),
        })?)?,
        Command::GrepFiles {
            pattern,
            paths,
            extra_patterns,
            context,
            time_limit,
            absolute_paths,
        } => serde_json::to_value(ctx.search_contents_in_files(SearchFilesRequest {
            paths,
            patterns: with_extra(pattern, extra_patterns),
            context_lines: context,
            time_limit_seconds: time_limit,
            absolute_paths,
        })?)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests;
