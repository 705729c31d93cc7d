// CLASSIFICATION: COMMUNITY
// Filename: store.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Persistence backends for configuration blocks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::{ConfigError, ConfigurationOption};

type BlockKey = (ConfigurationOption, u32);

/// Flash-style block storage keyed by option and interface index.
///
/// `get_block` is all-or-nothing: `out` is only written when a stored block
/// of exactly `out.len()` bytes exists. `set_block` stages a write that only
/// becomes visible after `commit`.
pub trait ConfigBlockStore: Send {
    /// Scan the backing storage; returns the number of blocks found.
    fn enumerate(&mut self) -> Result<usize, ConfigError>;
    fn get_block(
        &self,
        option: ConfigurationOption,
        index: u32,
        out: &mut [u8],
    ) -> Result<(), ConfigError>;
    fn set_block(
        &mut self,
        option: ConfigurationOption,
        index: u32,
        data: &[u8],
    ) -> Result<(), ConfigError>;
    fn commit(&mut self) -> Result<(), ConfigError>;
}

fn copy_exact(
    option: ConfigurationOption,
    index: u32,
    stored: Option<&[u8]>,
    out: &mut [u8],
) -> Result<(), ConfigError> {
    let stored = stored.ok_or(ConfigError::NotFound { option, index })?;
    if stored.len() != out.len() {
        return Err(ConfigError::BadSize {
            option,
            expected: out.len(),
            actual: stored.len(),
        });
    }
    out.copy_from_slice(stored);
    Ok(())
}

/// RAM-backed store with NVS-style staged commits.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlockStore {
    committed: BTreeMap<BlockKey, Vec<u8>>,
    staged: BTreeMap<BlockKey, Vec<u8>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty()
    }
}

impl ConfigBlockStore for MemoryBlockStore {
    fn enumerate(&mut self) -> Result<usize, ConfigError> {
        Ok(self.committed.len())
    }

    fn get_block(
        &self,
        option: ConfigurationOption,
        index: u32,
        out: &mut [u8],
    ) -> Result<(), ConfigError> {
        copy_exact(
            option,
            index,
            self.committed.get(&(option, index)).map(Vec::as_slice),
            out,
        )
    }

    fn set_block(
        &mut self,
        option: ConfigurationOption,
        index: u32,
        data: &[u8],
    ) -> Result<(), ConfigError> {
        self.staged.insert((option, index), data.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ConfigError> {
        let staged = std::mem::take(&mut self.staged);
        debug!("committing {} staged blocks", staged.len());
        self.committed.extend(staged);
        Ok(())
    }
}

/// Directory-backed store, one file per block under `<root>/<namespace>/`.
///
/// Commits write each block to a temporary file and rename it into place so
/// a reader never observes a half-written block.
#[derive(Debug)]
pub struct FileBlockStore {
    dir: PathBuf,
    staged: BTreeMap<BlockKey, Vec<u8>>,
}

impl FileBlockStore {
    pub fn open(root: &Path, namespace: &str) -> Result<Self, ConfigError> {
        let dir = root.join(namespace);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            staged: BTreeMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty()
    }

    fn block_path(&self, option: ConfigurationOption, index: u32) -> PathBuf {
        self.dir.join(format!("{}-{index}.blk", option.tag()))
    }

    fn parse_name(name: &str) -> Option<BlockKey> {
        let stem = name.strip_suffix(".blk")?;
        let (tag, index) = stem.rsplit_once('-')?;
        Some((ConfigurationOption::from_tag(tag)?, index.parse().ok()?))
    }
}

impl ConfigBlockStore for FileBlockStore {
    fn enumerate(&mut self) -> Result<usize, ConfigError> {
        let mut found = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            match name.to_str().and_then(Self::parse_name) {
                Some((option, index)) => {
                    debug!("found {option:?} block {index}");
                    found += 1;
                }
                None => {
                    if !name.to_string_lossy().ends_with(".tmp") {
                        warn!("ignoring stray file {:?} in {:?}", name, self.dir);
                    }
                }
            }
        }
        info!("{found} configuration blocks in {:?}", self.dir);
        Ok(found)
    }

    fn get_block(
        &self,
        option: ConfigurationOption,
        index: u32,
        out: &mut [u8],
    ) -> Result<(), ConfigError> {
        let path = self.block_path(option, index);
        let data = match fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        copy_exact(option, index, data.as_deref(), out)
    }

    fn set_block(
        &mut self,
        option: ConfigurationOption,
        index: u32,
        data: &[u8],
    ) -> Result<(), ConfigError> {
        self.staged.insert((option, index), data.to_vec());
        Ok(())
    }

    /// Every staged block is written to its temporary file before any is
    /// renamed into place. On error nothing is dropped from staging, so the
    /// commit can be retried.
    fn commit(&mut self) -> Result<(), ConfigError> {
        let mut written = Vec::with_capacity(self.staged.len());
        for (&(option, index), data) in &self.staged {
            let path = self.block_path(option, index);
            let tmp = path.with_extension("tmp");
            if let Err(e) = fs::write(&tmp, data) {
                warn!("staging {option:?} block {index} failed: {e}");
                for (tmp, _) in &written {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e.into());
            }
            written.push((tmp, path));
        }

        for (tmp, path) in &written {
            fs::rename(tmp, path)?;
            debug!("committed {:?}", path);
        }
        self.staged.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_writes_invisible_until_commit() {
        let mut store = MemoryBlockStore::new();
        let mut out = [0u8; 3];
        store
            .set_block(ConfigurationOption::Network, 0, &[1, 2, 3])
            .unwrap();
        assert!(matches!(
            store.get_block(ConfigurationOption::Network, 0, &mut out),
            Err(ConfigError::NotFound { .. })
        ));
        store.commit().unwrap();
        store
            .get_block(ConfigurationOption::Network, 0, &mut out)
            .unwrap();
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn size_mismatch_leaves_output_untouched() {
        let mut store = MemoryBlockStore::new();
        store
            .set_block(ConfigurationOption::Wireless80211, 1, &[9; 4])
            .unwrap();
        store.commit().unwrap();
        let mut out = [0u8; 8];
        assert!(store
            .get_block(ConfigurationOption::Wireless80211, 1, &mut out)
            .is_err());
        assert_eq!(out, [0u8; 8]);
    }

    #[test]
    fn failed_file_commit_keeps_everything_staged() {
        let root = tempfile::tempdir().unwrap();
        let mut store = FileBlockStore::open(root.path(), "ns").unwrap();
        store
            .set_block(ConfigurationOption::Wireless80211, 0, &[1; 4])
            .unwrap();
        store
            .set_block(ConfigurationOption::Wireless80211, 1, &[2; 4])
            .unwrap();
        // A directory where the second temp file should go makes its write fail.
        let blocker = store.dir().join("wifi-1.tmp");
        fs::create_dir(&blocker).unwrap();

        assert!(store.commit().is_err());
        assert!(store.has_pending());
        assert!(!store.dir().join("wifi-0.blk").exists());
        assert!(!store.dir().join("wifi-0.tmp").exists());

        fs::remove_dir(&blocker).unwrap();
        store.commit().unwrap();
        assert!(!store.has_pending());
        let mut out = [0u8; 4];
        store
            .get_block(ConfigurationOption::Wireless80211, 1, &mut out)
            .unwrap();
        assert_eq!(out, [2; 4]);
        assert_eq!(store.enumerate().unwrap(), 2);
    }

    #[test]
    fn block_file_names_round_trip() {
        assert_eq!(
            FileBlockStore::parse_name("wifi-2.blk"),
            Some((ConfigurationOption::Wireless80211, 2))
        );
        assert_eq!(FileBlockStore::parse_name("net-x.blk"), None);
        assert_eq!(FileBlockStore::parse_name("net-0.tmp"), None);
    }
}
