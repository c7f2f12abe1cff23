use super::{block::BlockId, page::Page};
use anyhow::{anyhow, Result};
use std::{
    collections::HashMap,
    fs::{create_dir_all, read_dir, File, OpenOptions},
    io::{Read as _, Seek as _, SeekFrom, Write as _},
    path::PathBuf,
};
use tracing::debug;

/// Prefix shared by every temporary table file.
pub const TEMP_PREFIX: &str = "temp";

#[derive(Default)]
pub struct FileManager {
    pub db_dir: PathBuf,
    pub block_size: i32,
    pub is_new: bool,
    pub open_files: HashMap<String, File>,
}

impl FileManager {
    pub fn new(db_dir: impl Into<PathBuf>, block_size: i32) -> Result<Self> {
        let db_dir = db_dir.into();
        let is_new = !db_dir.exists();
        if is_new {
            create_dir_all(&db_dir)?;
        } else {
            // temp tables never outlive the process that created them
            for entry in read_dir(&db_dir)? {
                let entry = entry?;
                let path = entry.path();
                let name = entry.file_name();
                if path.is_file() && name.to_string_lossy().starts_with(TEMP_PREFIX) {
                    debug!(file = %name.to_string_lossy(), "removing stale temp file");
                    std::fs::remove_file(&path)?;
                }
            }
        }

        Ok(FileManager {
            db_dir,
            block_size,
            is_new,
            open_files: HashMap::new(),
        })
    }

    pub fn read(&mut self, block: &BlockId, page: &mut Page) -> Result<()> {
        let offset = self.offset_of(block);
        let mut file = self.get_file(&block.filename)?;
        file.seek(SeekFrom::Start(offset))?;
        // reading past the end leaves the tail of the page zeroed
        let buf = page.contents_mut();
        buf.fill(0);
        let mut read = 0;
        while read < buf.len() {
            let n = file.read(&mut buf[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        Ok(())
    }

    pub fn write(&mut self, block: &BlockId, page: &Page) -> Result<()> {
        let offset = self.offset_of(block);
        let mut file = self.get_file(&block.filename)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page.contents())?;
        Ok(())
    }

    pub fn get_file(&mut self, filename: &str) -> Result<&File> {
        if !self.open_files.contains_key(filename) {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(self.db_dir.join(filename))?;
            self.open_files.insert(filename.to_string(), file);
        }
        self.open_files
            .get(filename)
            .ok_or_else(|| anyhow!("cannot open file {}", filename))
    }

    /// append_block adds a zeroed block to the end of the file and returns its id
    pub fn append_block(&mut self, filename: &str) -> Result<BlockId> {
        let block = BlockId::new(filename, self.block_count(filename)?);
        let offset = self.offset_of(&block);
        let bytes = vec![0; self.block_size as usize];
        let mut file = self.get_file(filename)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)?;
        Ok(block)
    }

    /// block_count returns the size of the file in blocks
    pub fn block_count(&mut self, filename: &str) -> Result<i32> {
        let block_size = self.block_size as u64;
        let file = self.get_file(filename)?;
        Ok((file.metadata()?.len() / block_size) as i32)
    }

    fn offset_of(&self, block: &BlockId) -> u64 {
        block.num as u64 * self.block_size as u64
    }
}
