use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use super::model::Creature;

#[async_trait]
pub trait CreatureRepository: Send + Sync {
    async fn save_creature(&self, creature: Creature) -> Result<()>;
    async fn all_creatures(&self) -> Result<Vec<Creature>>;
    async fn clear_all_creatures(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryCreatureRepository {
    creatures: Mutex<Vec<Creature>>,
}

impl InMemoryCreatureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creatures(creatures: Vec<Creature>) -> Self {
        Self {
            creatures: Mutex::new(creatures),
        }
    }
}

#[async_trait]
impl CreatureRepository for InMemoryCreatureRepository {
    async fn save_creature(&self, creature: Creature) -> Result<()> {
        self.creatures.lock().push(creature);
        Ok(())
    }

    async fn all_creatures(&self) -> Result<Vec<Creature>> {
        Ok(self.creatures.lock().clone())
    }

    async fn clear_all_creatures(&self) -> Result<()> {
        self.creatures.lock().clear();
        Ok(())
    }
}

/// Creatures kept as a JSON array in a single file, replaced atomically.
#[derive(Debug)]
pub struct JsonFileCreatureRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileCreatureRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<Vec<Creature>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map_err(|e| anyhow!("parse {}: {e}", self.path.display()))
    }

    fn write(&self, creatures: &[Creature]) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(creatures)?)?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        debug!(count = creatures.len(), path = %self.path.display(), "creatures written");
        Ok(())
    }
}

#[async_trait]
impl CreatureRepository for JsonFileCreatureRepository {
    async fn save_creature(&self, creature: Creature) -> Result<()> {
        let _guard = self.lock.lock();
        let mut creatures = self.read()?;
        creatures.push(creature);
        self.write(&creatures)
    }

    async fn all_creatures(&self) -> Result<Vec<Creature>> {
        let _guard = self.lock.lock();
        self.read()
    }

    async fn clear_all_creatures(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.write(&[])
    }
}
