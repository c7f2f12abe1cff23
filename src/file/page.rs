use crate::I32_SIZE;
use anyhow::{bail, Result};

/// Page is the in-memory image of one block.
/// Integers are stored big-endian and strings as a 4 byte length followed
/// by their bytes.
pub struct Page {
    contents: Vec<u8>,
}

impl Page {
    pub fn new(block_size: i32) -> Page {
        Page {
            contents: vec![0; block_size.max(0) as usize],
        }
    }

    pub fn get_int(&self, offset: usize) -> Result<i32> {
        let Some(bytes) = self.contents.get(offset..offset + I32_SIZE) else {
            bail!("int read at {} overruns page of {} bytes", offset, self.contents.len());
        };
        let mut buf = [0; I32_SIZE];
        buf.copy_from_slice(bytes);
        Ok(i32::from_be_bytes(buf))
    }

    pub fn set_int(&mut self, offset: usize, value: i32) -> Result<()> {
        let len = self.contents.len();
        let Some(bytes) = self.contents.get_mut(offset..offset + I32_SIZE) else {
            bail!("int write at {} overruns page of {} bytes", offset, len);
        };
        bytes.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn get_bytes(&self, offset: usize) -> Result<&[u8]> {
        let size = self.get_int(offset)?.max(0) as usize;
        let start = offset + I32_SIZE;
        let Some(bytes) = self.contents.get(start..start + size) else {
            bail!("byte read at {} overruns page of {} bytes", offset, self.contents.len());
        };
        Ok(bytes)
    }

    pub fn set_bytes(&mut self, offset: usize, value: &[u8]) -> Result<()> {
        self.set_int(offset, value.len() as i32)?;
        let start = offset + I32_SIZE;
        let len = self.contents.len();
        let Some(bytes) = self.contents.get_mut(start..start + value.len()) else {
            bail!("byte write at {} overruns page of {} bytes", offset, len);
        };
        bytes.copy_from_slice(value);
        Ok(())
    }

    pub fn get_string(&self, offset: usize) -> Result<String> {
        let bytes = self.get_bytes(offset)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn set_string(&mut self, offset: usize, value: &str) -> Result<()> {
        self.set_bytes(offset, value.as_bytes())
    }

    /// max_length is the number of bytes a string of `str_len` bytes occupies
    pub fn max_length(str_len: i32) -> i32 {
        I32_SIZE as i32 + str_len
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_can_new_page() {
        let page = Page::new(10);
        assert_eq!(page.contents().len(), 10);
    }

    #[test]
    fn should_can_set_and_get_string() {
        let mut page = Page::new(12);
        page.set_string(2, "hello").unwrap();
        assert_eq!(page.get_string(2).unwrap(), "hello");
    }

    #[test]
    fn should_can_get_contents() {
        let mut page = Page::new(10);
        page.set_string(0, "hello").unwrap();
        assert_eq!(page.contents(), &[0, 0, 0, 5, 104, 101, 108, 108, 111, 0]);
    }

    #[test]
    fn should_reject_overrun() {
        let mut page = Page::new(8);
        assert!(page.set_int(6, 1).is_err());
        assert!(page.set_string(2, "hello").is_err());
        assert!(page.get_int(8).is_err());
    }
}
