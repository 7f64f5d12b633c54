//! Codesum CLI - Summarize a codebase's declarations into one text file.

use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use codesum::builder::Summarizer;
use codesum::errors::{exit_code, CodesumError};
use codesum::filter::{Language, DEFAULT_MAX_FILE_SIZE};
use codesum::output::{format_json, write_summary, OutputFormat};
use codesum::tokens::{count_tokens, Encoding};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codesum")]
#[command(about = "Summarize the declarations of a codebase into a single file")]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    summarize: SummarizeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a directory and write the summary (default)
    Summarize(SummarizeArgs),

    /// Show supported languages
    Languages {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct SummarizeArgs {
    /// Root directory to scan
    #[arg(short = 'd', long, alias = "scan_directory", default_value = ".")]
    scan_directory: PathBuf,

    /// Where to write the summary
    #[arg(
        short = 'o',
        long,
        alias = "output_file",
        default_value = "./code_summary.txt"
    )]
    output_file: PathBuf,

    /// Extra directory names or globs to skip
    #[arg(short = 'e', long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Do not skip the built-in directory list (node_modules, bin, obj, ...)
    #[arg(long)]
    no_default_excludes: bool,

    /// Filter to specific language(s)
    #[arg(long, value_delimiter = ',')]
    lang: Vec<LanguageArg>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: FormatArg,

    /// Print the summary instead of writing the output file
    #[arg(long)]
    stdout: bool,

    /// Honor .gitignore files
    #[arg(long)]
    gitignore: bool,

    /// Extra ignore file in .gitignore syntax (repeatable)
    #[arg(long)]
    ignore_file: Vec<PathBuf>,

    /// Skip hidden files and directories
    #[arg(long)]
    no_hidden: bool,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,

    /// Maximum directory depth to descend
    #[arg(long)]
    max_depth: Option<usize>,

    /// Skip files larger than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,

    /// Token encoding for the reported count
    #[arg(long, default_value = "cl100k")]
    encoding: EncodingArg,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

#[derive(Clone, ValueEnum)]
enum LanguageArg {
    Cpp,
    Csharp,
    Python,
    Javascript,
    Cshtml,
}

#[derive(Clone, ValueEnum)]
enum EncodingArg {
    Cl100k,
    O200k,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Cl100k => Encoding::Cl100kBase,
            EncodingArg::O200k => Encoding::O200kBase,
        }
    }
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Cpp => Language::Cpp,
            LanguageArg::Csharp => Language::CSharp,
            LanguageArg::Python => Language::Python,
            LanguageArg::Javascript => Language::JavaScript,
            LanguageArg::Cshtml => Language::Cshtml,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or(Commands::Summarize(cli.summarize));
    let json_output = json_flag(&command);

    let result = match command {
        Commands::Summarize(args) => {
            init_logging(args.verbose);
            run_summarize(args)
        }
        Commands::Languages { json } => run_languages(json),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "codesum", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn json_flag(command: &Commands) -> bool {
    match command {
        Commands::Summarize(args) => args.format == FormatArg::Json,
        Commands::Languages { json } => *json,
        Commands::Completions { .. } => false,
    }
}

/// `RUST_LOG` wins; otherwise `-v` picks the level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("codesum={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// --- Summarize command ---

fn run_summarize(args: SummarizeArgs) -> Result<(), CodesumError> {
    let encoding: Encoding = args.encoding.into();
    let mut summarizer = Summarizer::new(&args.scan_directory)
        .exclude_dirs(args.exclude)
        .respect_gitignore(args.gitignore)
        .ignore_files(args.ignore_file)
        .include_hidden(!args.no_hidden)
        .follow_symlinks(args.follow_symlinks)
        .max_file_size(args.max_file_size)
        .encoding(encoding);

    if let Some(depth) = args.max_depth {
        summarizer = summarizer.max_depth(depth);
    }

    if args.no_default_excludes {
        summarizer = summarizer.no_default_excludes();
    }

    if !args.lang.is_empty() {
        let languages: Vec<Language> = args.lang.into_iter().map(Into::into).collect();
        summarizer = summarizer.languages(&languages);
    }

    let summary = summarizer.build()?;
    let text = summary.render_text();
    let tokens = count_tokens(&text, encoding);

    let contents = match OutputFormat::from(args.format) {
        OutputFormat::Text => text,
        OutputFormat::Json => format_json(&summary.codemaps, tokens)?,
    };

    if args.stdout {
        print!("{contents}");
        return Ok(());
    }

    write_summary(&args.output_file, &contents)?;
    println!(
        "Summary written to {} ({} files, {} tokens)",
        args.output_file.display(),
        summary.codemaps.len(),
        tokens
    );

    Ok(())
}

// --- Languages command ---

#[derive(Serialize)]
struct LanguageInfo {
    name: String,
    extensions: Vec<String>,
}

fn run_languages(json: bool) -> Result<(), CodesumError> {
    let languages: Vec<LanguageInfo> = Language::all()
        .iter()
        .map(|lang| LanguageInfo {
            name: lang.to_string(),
            extensions: lang
                .extensions()
                .iter()
                .map(|e| format!(".{}", e))
                .collect(),
        })
        .collect();

    if json {
        #[derive(Serialize)]
        struct Output {
            languages: Vec<LanguageInfo>,
        }
        let output = Output { languages };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| CodesumError::Io(std::io::Error::other(e.to_string())))?;
        println!("{json}");
    } else {
        println!("Supported languages:");
        for lang in &languages {
            println!("  {:12} {}", lang.name, lang.extensions.join(", "));
        }
    }

    Ok(())
}
