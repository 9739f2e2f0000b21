//! `ripper remove <id>`, `ripper clear` and `ripper requeue <id>`.

use anyhow::Result;
use ripper_core::queue::JobId;
use ripper_core::Engine;

pub async fn run_remove(engine: &Engine, id: JobId) -> Result<()> {
    let job = engine.remove(id)?;
    engine.shutdown().await?;
    println!("Removed job {id} ({})", job.display_name);
    Ok(())
}

pub async fn run_clear(engine: &Engine) -> Result<()> {
    let removed = engine.remove_all();
    engine.shutdown().await?;
    println!("Removed {removed} job(s)");
    Ok(())
}

pub async fn run_requeue(engine: &Engine, id: JobId) -> Result<()> {
    engine.requeue(id)?;
    engine.shutdown().await?;
    println!("Job {id} is waiting again");
    Ok(())
}
