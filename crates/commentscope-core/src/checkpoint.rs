use crate::Result;
use crate::types::PostHandle;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Post lists saved between pagination and collection, one file per profile.
///
/// A rerun after an interrupted collection reuses the saved list instead of
/// scrolling the activity feed again.
pub struct PostCheckpoint {
    dir: PathBuf,
}

impl PostCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}_posts.json", slug))
    }

    /// Saved posts for `slug`, or `None` if there is no usable checkpoint
    pub fn load(&self, slug: &str) -> Option<Vec<PostHandle>> {
        let path = self.path_for(slug);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Could not open checkpoint {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_reader::<_, Vec<PostHandle>>(BufReader::new(file)) {
            Ok(posts) => {
                tracing::info!("Loaded {} post links from {}", posts.len(), path.display());
                Some(posts)
            }
            Err(e) => {
                tracing::warn!("Checkpoint {} is corrupt, ignoring it: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, slug: &str, posts: &[PostHandle]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(slug);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), posts)?;
        tracing::debug!("Saved {} post links to {}", posts.len(), path.display());
        Ok(path)
    }

    pub fn clear(&self, slug: &str) -> Result<()> {
        let path = self.path_for(slug);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::info!("Removed checkpoint: {}", path.display());
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
