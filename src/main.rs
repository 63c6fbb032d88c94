use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use git_splice::diff::SplittedDiff;
use git_splice::patch::{self, PatchAction, StageOutcome};
use git_splice::todo::{Action, Commit, Instruction};
use git_splice::{edit_todo_file, read_diff};
use log::{LevelFilter, debug};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-splice", version)]
#[command(about = "Build partial-staging patches and rewrite interactive rebase todo lists")]
struct Cli {
    /// Log more (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch for the hunks under the given rows of a one-file `git diff -U0`
    Hunks {
        /// 1-based rows of the file's new side, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<usize>,
        #[arg(long, value_enum, default_value_t = PatchAction::Stage)]
        action: PatchAction,
        /// Diff to read instead of stdin
        diff_file: Option<PathBuf>,
    },
    /// Patch for a single changed line of a one-file diff
    Line {
        /// 0-based hunk index
        #[arg(long)]
        hunk: usize,
        /// 0-based index of the line within the hunk
        #[arg(long)]
        line: usize,
        #[arg(long, value_enum, default_value_t = PatchAction::Stage)]
        action: PatchAction,
        diff_file: Option<PathBuf>,
    },
    /// Patch for one whole hunk of a one-file diff
    Hunk {
        /// 0-based hunk index
        #[arg(long)]
        hunk: usize,
        #[arg(long, value_enum, default_value_t = PatchAction::Stage)]
        action: PatchAction,
        diff_file: Option<PathBuf>,
    },
    /// Patch for the selected lines of a diff with context
    Select {
        /// 1-based rows of the diff text, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<usize>,
        #[arg(long, value_enum, default_value_t = PatchAction::Stage)]
        action: PatchAction,
        diff_file: Option<PathBuf>,
    },
    /// Rewrite a rebase todo list (use as GIT_SEQUENCE_EDITOR)
    Todo {
        #[command(subcommand)]
        command: TodoCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Generate a man page
    Man,
}

#[derive(Subcommand)]
enum TodoCommand {
    /// Reword a commit
    Reword { commit: String, todo_file: PathBuf },
    /// Stop at a commit for amending
    Edit { commit: String, todo_file: PathBuf },
    /// Drop a commit
    Drop { commit: String, todo_file: PathBuf },
    /// Replace the pick of a commit with any action
    Action {
        #[arg(value_enum)]
        action: Action,
        commit: String,
        todo_file: PathBuf,
    },
    /// Move fixup commits behind their base
    Fixup {
        #[arg(long)]
        base: String,
        /// HASH:MESSAGE of each commit to fold in
        #[arg(long = "commit", required = true, value_parser = parse_commit)]
        commits: Vec<Commit>,
        todo_file: PathBuf,
    },
    /// Squash commits into their base
    Squash {
        #[arg(long)]
        base: String,
        #[arg(long = "commit", required = true)]
        commits: Vec<String>,
        todo_file: PathBuf,
    },
    /// Replay commits onto a new branch before the rest of the rebase
    Copy {
        #[arg(long = "ref")]
        target_ref: String,
        #[arg(long = "commit", required = true)]
        commits: Vec<String>,
        todo_file: PathBuf,
    },
    /// Like copy, but drop the commits from the current branch
    Extract {
        #[arg(long = "ref")]
        target_ref: String,
        #[arg(long = "commit", required = true)]
        commits: Vec<String>,
        todo_file: PathBuf,
    },
}

impl TodoCommand {
    fn into_parts(self) -> (Instruction, PathBuf) {
        let change =
            |action: Action, commit: String| Instruction::ChangeFirstAction { action, commit };
        match self {
            Self::Reword { commit, todo_file } => (change(Action::Reword, commit), todo_file),
            Self::Edit { commit, todo_file } => (change(Action::Edit, commit), todo_file),
            Self::Drop { commit, todo_file } => (change(Action::Drop, commit), todo_file),
            Self::Action {
                action,
                commit,
                todo_file,
            } => (change(action, commit), todo_file),
            Self::Fixup {
                base,
                commits,
                todo_file,
            } => (Instruction::Fixup { base, commits }, todo_file),
            Self::Squash {
                base,
                commits,
                todo_file,
            } => (Instruction::Squash { base, commits }, todo_file),
            Self::Copy {
                target_ref,
                commits,
                todo_file,
            } => (
                Instruction::Copy {
                    target_ref,
                    commits,
                },
                todo_file,
            ),
            Self::Extract {
                target_ref,
                commits,
                todo_file,
            } => (
                Instruction::Extract {
                    target_ref,
                    commits,
                },
                todo_file,
            ),
        }
    }
}

fn parse_commit(arg: &str) -> Result<Commit, String> {
    match arg.split_once(':') {
        Some((hash, message)) if !hash.is_empty() => Ok(Commit::new(hash, message)),
        _ => Err(format!("expected HASH:MESSAGE, got {arg:?}")),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_patch(patch: Option<String>) {
    match patch {
        Some(patch) => print!("{patch}"),
        None => eprintln!("Nothing selected."),
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Hunks {
            rows,
            action,
            diff_file,
        } => {
            let text = read_diff(diff_file.as_deref())?;
            let outcome = patch::stage_hunks(&text, &rows, action)?;
            eprintln!("{outcome}");
            if let StageOutcome::Patch(patch) = outcome {
                print!("{}", patch.text);
            }
        }
        Commands::Line {
            hunk,
            line,
            action,
            diff_file,
        } => {
            let text = read_diff(diff_file.as_deref())?;
            let diff = SplittedDiff::from_string(&text, 0);
            print!("{}", patch::line_patch(&diff, hunk, line, action)?);
        }
        Commands::Hunk {
            hunk,
            action,
            diff_file,
        } => {
            let text = read_diff(diff_file.as_deref())?;
            let diff = SplittedDiff::from_string(&text, 0);
            print!("{}", patch::hunk_patch(&diff, hunk, action)?);
        }
        Commands::Select {
            rows,
            action,
            diff_file,
        } => {
            let text = read_diff(diff_file.as_deref())?;
            let diff = SplittedDiff::from_string(&text, 0);
            let starts = patch::line_starts_for_rows(&text, &rows);
            let patch = patch::patch_for_selection(&diff, &starts, action.direction())?;
            print_patch(patch);
        }
        Commands::Todo { command } => {
            let (instruction, todo_file) = command.into_parts();
            debug!("{instruction:?} on {}", todo_file.display());
            edit_todo_file(&todo_file, &instruction)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "git-splice", &mut io::stdout());
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli.command)
}
