//! CLI for the chapter ripper.

mod commands;
mod control_socket;
mod select;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ripper_core::adapter::AdapterRegistry;
use ripper_core::config::{self, RipperConfig};
use ripper_core::control::default_control_socket_path;
use ripper_core::output::FsOutputWriter;
use ripper_core::queue::{JobId, OutputFormat};
use ripper_core::store::StateDb;
use ripper_core::Engine;
use std::path::PathBuf;
use std::sync::Arc;

use control_socket::ControlCommand;

use commands::{
    run_add, run_bookmark, run_chapters, run_clear, run_completions, run_downloads, run_man,
    run_remove, run_requeue, run_sites, run_status, run_stop,
};

/// Top-level CLI for the chapter ripper.
#[derive(Debug, Parser)]
#[command(name = "ripper")]
#[command(about = "Ripper: queue and download chapters from supported sites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Output format flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// One directory of page images per chapter.
    Folder,
    /// One CBZ archive per chapter.
    Cbz,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Folder => OutputFormat::Folder,
            FormatArg::Cbz => OutputFormat::Archive,
        }
    }
}

/// `--prefix` / `--no-prefix`; the last one given wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Args)]
pub struct PrefixArgs {
    /// Number chapters by their position in the listing.
    #[arg(long, overrides_with = "no_prefix")]
    pub prefix: bool,
    /// Show chapter titles without numbers.
    #[arg(long, overrides_with = "prefix")]
    pub no_prefix: bool,
}

impl PrefixArgs {
    /// An explicit flag wins, then the config default; otherwise the last
    /// session's mode is kept.
    pub fn choice(self, cfg: &RipperConfig) -> Option<bool> {
        if self.no_prefix {
            Some(false)
        } else if self.prefix || cfg.chapter_prefix {
            Some(true)
        } else {
            None
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List the supported sites.
    Sites,

    /// List the chapters of a title.
    Chapters {
        /// Title URL.
        url: String,
        #[command(flatten)]
        prefix: PrefixArgs,
    },

    /// Queue chapters of a title for download.
    Add {
        /// Title URL.
        url: String,
        /// Chapters to queue by listing number: "all" or e.g. "1,3-5".
        #[arg(long, default_value = "all", value_name = "LIST")]
        select: String,
        /// Output format; repeat for both (default: folder).
        #[arg(long = "format", value_enum, value_name = "FORMAT")]
        formats: Vec<FormatArg>,
        /// Directory to save chapters in (default: last used, then config, then current dir).
        #[arg(long, value_name = "DIR")]
        save_to: Option<PathBuf>,
        #[command(flatten)]
        prefix: PrefixArgs,
    },

    /// Show the download queue.
    Status,

    /// Download every waiting job.
    Run {
        /// Run up to N jobs concurrently (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Stop the active run, or one running job, via the control socket.
    Stop {
        /// Job identifier; omit to stop the whole run.
        id: Option<JobId>,
    },

    /// Remove a job that is not running.
    Remove {
        /// Job identifier.
        id: JobId,
    },

    /// Remove every job that is not running.
    Clear,

    /// Put a failed or cancelled job back in the queue.
    Requeue {
        /// Job identifier.
        id: JobId,
    },

    /// Manage bookmarked title URLs.
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },

    /// Print the man page.
    #[command(hide = true)]
    Man,
}

#[derive(Debug, Subcommand)]
pub enum BookmarkAction {
    /// Bookmark a title URL.
    Add { url: String },
    /// Forget a bookmarked title URL.
    Remove { url: String },
    /// List bookmarks.
    List,
}

/// Engine over the default state DB, with the persisted queue and session loaded.
async fn open_engine(cfg: &RipperConfig) -> Result<Arc<Engine>> {
    let registry = AdapterRegistry::with_defaults(cfg);
    let store = StateDb::open_default().await?;
    let engine = Engine::new(registry, Arc::new(FsOutputWriter::new()), Arc::new(store));
    let restored = engine.startup().await?;
    tracing::debug!(restored, "loaded queue");
    Ok(Arc::new(engine))
}


impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man(),
            command => {
                let socket = default_control_socket_path()?;
                if let Some(request) = command.control_request() {
                    if let Some(reply) = control_socket::send(&socket, request).await? {
                        println!("{reply}");
                        return Ok(());
                    }
                }
                if matches!(command, CliCommand::Stop { .. }) {
                    return run_stop();
                }
                if command.needs_idle_queue() && control_socket::run_is_active(&socket).await? {
                    bail!("a download run is active; wait for it or stop it with `ripper stop`");
                }
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let engine = open_engine(&cfg).await?;
                command.dispatch(engine, &cfg).await
            }
        }
    }

    /// Commands a running `ripper run` answers over the control socket.
    fn control_request(&self) -> Option<ControlCommand> {
        match *self {
            CliCommand::Stop { id: None } => Some(ControlCommand::StopAll),
            CliCommand::Stop { id: Some(id) } => Some(ControlCommand::Stop(id)),
            CliCommand::Remove { id } => Some(ControlCommand::Remove(id)),
            CliCommand::Clear => Some(ControlCommand::Clear),
            CliCommand::Requeue { id } => Some(ControlCommand::Requeue(id)),
            CliCommand::Status => Some(ControlCommand::Status),
            _ => None,
        }
    }

    /// Commands that rewrite the stored queue from a fresh engine, so they
    /// must not overlap a run that holds the live queue.
    fn needs_idle_queue(&self) -> bool {
        matches!(self, CliCommand::Add { .. } | CliCommand::Run { .. })
    }

    async fn dispatch(self, engine: Arc<Engine>, cfg: &RipperConfig) -> Result<()> {
        match self {
            CliCommand::Sites => run_sites(&engine),
            CliCommand::Chapters { url, prefix } => {
                run_chapters(&engine, &url, prefix.choice(cfg)).await
            }
            CliCommand::Add {
                url,
                select,
                formats,
                save_to,
                prefix,
            } => {
                let formats: Vec<OutputFormat> = formats.into_iter().map(Into::into).collect();
                run_add(
                    &engine,
                    cfg,
                    &url,
                    &select,
                    &formats,
                    save_to,
                    prefix.choice(cfg),
                )
                .await
            }
            CliCommand::Status => run_status(&engine),
            CliCommand::Run { jobs } => {
                run_downloads(engine, jobs.unwrap_or(cfg.max_concurrent_jobs)).await
            }
            CliCommand::Stop { .. } => run_stop(),
            CliCommand::Remove { id } => run_remove(&engine, id).await,
            CliCommand::Clear => run_clear(&engine).await,
            CliCommand::Requeue { id } => run_requeue(&engine, id).await,
            CliCommand::Bookmark { action } => run_bookmark(&engine, action).await,
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man(),
        }
    }
}

#[cfg(test)]
mod tests;
