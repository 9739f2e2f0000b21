//! CLI command handlers, one file per command group.

mod add;
mod bookmark;
mod chapters;
mod completions;
mod remove;
mod run;
mod status;
mod stop;

pub use add::run_add;
pub use bookmark::run_bookmark;
pub use chapters::{run_chapters, run_sites};
pub use completions::{run_completions, run_man};
pub use remove::{run_clear, run_remove, run_requeue};
pub use run::run_downloads;
pub use status::run_status;
pub(crate) use status::render_status;
pub use stop::run_stop;
