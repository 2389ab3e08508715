use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{RateLimitError, internal_error},
    ledger::{FlowLedger, FlowState, PendingSendEntry},
};

const LEDGER_STATE_VERSION: u64 = 1;

#[derive(Debug, Clone)]
pub struct LedgerPersistence {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedLedger {
    version: u64,
    flows: Vec<FlowState>,
    #[serde(default)]
    pending_sends: Vec<PendingSendEntry>,
}

impl LedgerPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<FlowLedger>, RateLimitError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(internal_error(format!(
                    "failed to read ledger state '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let persisted: PersistedLedger = serde_json::from_str(&content).map_err(|err| {
            internal_error(format!(
                "failed to parse ledger state '{}': {err}",
                self.path.display()
            ))
        })?;
        if persisted.version != LEDGER_STATE_VERSION {
            return Err(internal_error(format!(
                "unsupported ledger state version {} at '{}'",
                persisted.version,
                self.path.display()
            )));
        }

        Ok(Some(FlowLedger::from_parts(
            persisted.flows,
            persisted.pending_sends,
        )))
    }

    pub fn save(&self, ledger: &FlowLedger) -> Result<(), RateLimitError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|err| {
            internal_error(format!(
                "failed to create ledger state directory '{}': {err}",
                parent.display()
            ))
        })?;

        let persisted = PersistedLedger {
            version: LEDGER_STATE_VERSION,
            flows: ledger.flows().cloned().collect(),
            pending_sends: ledger.pending_sends().iter().cloned().collect(),
        };

        let tmp_path = self.path.with_extension("tmp");
        write_synced(&tmp_path, &persisted)?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            internal_error(format!(
                "failed to replace ledger state '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        if let Ok(parent_dir) = fs::File::open(parent) {
            let _ = parent_dir.sync_all();
        }

        Ok(())
    }
}

fn write_synced(path: &Path, persisted: &PersistedLedger) -> Result<(), RateLimitError> {
    let io_error = |action: &str, err: std::io::Error| {
        internal_error(format!(
            "failed to {action} ledger temp file '{}': {err}",
            path.display()
        ))
    };

    let file = fs::File::create(path).map_err(|err| io_error("create", err))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, persisted).map_err(|err| {
        internal_error(format!(
            "failed to serialize ledger state '{}': {err}",
            path.display()
        ))
    })?;
    writer
        .write_all(b"\n")
        .map_err(|err| io_error("finalize", err))?;
    let file = writer
        .into_inner()
        .map_err(|err| io_error("flush", err.into_error()))?;
    file.sync_all().map_err(|err| io_error("sync", err))
}
