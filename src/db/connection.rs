use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct Worker {
    sender: mpsc::Sender<DbCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(handle) = handle else { return };

        let _ = self.sender.send(DbCommand::Shutdown);
        if handle.join().is_err() {
            error!("carewatch-db thread panicked");
        }
    }
}

fn open_store(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("cannot open record store {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("WAL unavailable, using default journal: {err}");
    }
    run_migrations(&mut conn).context("schema migration failed")?;
    Ok(conn)
}

fn serve(mut conn: Connection, commands: mpsc::Receiver<DbCommand>) {
    for command in commands {
        match command {
            DbCommand::Execute(task) => task(&mut conn),
            DbCommand::Shutdown => break,
        }
    }
    info!("Record store closed");
}

/// Handle to the record store.
///
/// A single worker thread owns the SQLite connection; every query or write is
/// shipped to it as a closure and runs to completion (including its commit)
/// before the next one starts. Clones share the same worker.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (opened_tx, opened_rx) = mpsc::channel::<Result<()>>();
        let path = db_path.clone();

        let handle = thread::Builder::new()
            .name("carewatch-db".into())
            .spawn(move || match open_store(&path) {
                Ok(conn) => {
                    if opened_tx.send(Ok(())).is_ok() {
                        serve(conn, command_rx);
                    }
                }
                Err(err) => {
                    let _ = opened_tx.send(Err(err));
                }
            })
            .context("cannot spawn carewatch-db thread")?;

        opened_rx
            .recv()
            .context("carewatch-db thread exited during startup")??;

        info!("Record store ready at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                sender: command_tx,
                handle: Mutex::new(Some(handle)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Run `task` on the store thread and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = DbCommand::Execute(Box::new(move |conn| {
            // A dropped receiver means the caller stopped waiting; nothing to do.
            let _ = reply_tx.send(task(conn));
        }));

        self.worker
            .sender
            .send(command)
            .map_err(|_| anyhow!("record store is closed"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("record store thread died mid-task"))?
    }
}
