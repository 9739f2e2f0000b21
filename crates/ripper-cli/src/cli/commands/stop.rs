//! `ripper stop [id]` when no run is listening on the control socket.

use anyhow::Result;

pub fn run_stop() -> Result<()> {
    println!("No run in progress.");
    Ok(())
}
