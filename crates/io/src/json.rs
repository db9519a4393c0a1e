// JSON report export and persisted mapping cache

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ledgermatch_recon::model::ReconReport;
use ledgermatch_recon::pipeline::PersistedMapping;
use ledgermatch_recon::schema::Domain;

/// Write a report as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &ReconReport) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report).map_err(|e| e.to_string())?;
    Ok(())
}

/// Directory of `<domain>_mapping.json` files, one per source domain.
#[derive(Debug, Clone)]
pub struct MappingStore {
    dir: PathBuf,
}

impl MappingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{domain}_mapping.json"))
    }

    /// `Ok(None)` when nothing has been saved for `domain` yet.
    pub fn load(&self, domain: Domain) -> Result<Option<PersistedMapping>, String> {
        let path = self.path_for(domain);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        let mapping: PersistedMapping = serde_json::from_str(&content)
            .map_err(|e| format!("{}: invalid mapping file: {e}", path.display()))?;
        log::debug!("loaded cached mapping {}", path.display());
        Ok(Some(mapping))
    }

    pub fn save(&self, mapping: &PersistedMapping) -> Result<PathBuf, String> {
        std::fs::create_dir_all(&self.dir).map_err(|e| format!("{}: {e}", self.dir.display()))?;
        let path = self.path_for(mapping.domain);
        let file = File::create(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), mapping).map_err(|e| e.to_string())?;
        log::debug!("saved mapping {}", path.display());
        Ok(path)
    }
}
