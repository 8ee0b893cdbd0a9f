use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Owns the store thread. Dropping it closes the job channel, which ends the
/// thread's receive loop, then joins the thread.
struct StoreWorker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if let Err(err) = thread.join() {
                error!("Observation store thread panicked: {err:?}");
            }
        }
    }
}

/// Open the file, apply pragmas and bring the schema up to date.
fn open_store(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    let journal_mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .context("failed to enable WAL mode")?;
    if !journal_mode.eq_ignore_ascii_case("wal") {
        warn!("SQLite kept journal_mode={journal_mode} for {}", path.display());
    }
    // Captures cascade with their traffic light.
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

/// Handle to the observation store.
///
/// A single thread owns the SQLite connection. Repository methods hand it
/// closures through [`Database::execute`] and await the result, so reads of a
/// light's captures never interleave with a write. Clones share the thread,
/// which exits once the last clone is dropped.
#[derive(Clone)]
pub struct Database {
    worker: Arc<StoreWorker>,
}

impl Database {
    /// Open (creating if needed) the store at `db_path` and migrate it.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let thread_path = db_path.clone();

        let thread = thread::Builder::new()
            .name("greenwave-db".into())
            .spawn(move || {
                let mut conn = match open_store(&thread_path) {
                    Ok(conn) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        conn
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                for job in jobs_rx {
                    job(&mut conn);
                }

                info!("Observation store closed");
            })
            .context("failed to spawn observation store thread")?;

        let worker = StoreWorker {
            jobs: Some(jobs_tx),
            thread: Some(thread),
        };

        // On failure `worker` drops here, joining the already-finished thread.
        ready_rx
            .recv()
            .context("observation store thread exited before opening the database")??;

        info!("Observation store ready at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    /// Run `task` on the store thread and wait for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self
            .worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("observation store is shut down"))?;
        let (reply_tx, reply_rx) = oneshot::channel();

        jobs.send(Box::new(move |conn: &mut Connection| {
            // The caller may have been cancelled; its result is simply dropped.
            let _ = reply_tx.send(task(conn));
        }))
        .map_err(|_| anyhow!("observation store thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("observation store thread stopped before replying"))?
    }
}
