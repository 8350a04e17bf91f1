//! Open modes and handles on staged files.

use super::LogicalPath;
use crate::error::{GenFilesError, Result};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

/// Primary access of an open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Append,
}

/// Parsed mode string (`r`, `w`, `a`, with optional `+`, `b`, `t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: Access,
    pub update: bool,
    pub binary: bool,
}

impl OpenMode {
    pub const READ: Self = Self { access: Access::Read, update: false, binary: false };
    pub const WRITE: Self = Self { access: Access::Write, update: false, binary: false };
    pub const APPEND: Self = Self { access: Access::Append, update: false, binary: false };

    pub fn parse(mode: &str) -> Result<Self> {
        let invalid = || GenFilesError::InvalidMode(mode.to_owned());
        let mut access = None;
        let mut update = false;
        let mut binary = None;

        for c in mode.chars() {
            match c {
                'r' | 'w' | 'a' if access.is_some() => return Err(invalid()),
                'r' => access = Some(Access::Read),
                'w' => access = Some(Access::Write),
                'a' => access = Some(Access::Append),
                '+' if !update => update = true,
                'b' | 't' if binary.is_none() => binary = Some(c == 'b'),
                _ => return Err(invalid()),
            }
        }

        Ok(Self {
            access: access.ok_or_else(invalid)?,
            update,
            binary: binary.unwrap_or(false),
        })
    }

    /// Whether opening in this mode stages (and touches) the file.
    pub const fn is_write(&self) -> bool {
        self.update || !matches!(self.access, Access::Read)
    }

    pub const fn is_binary(&self) -> bool {
        self.binary
    }

    /// Whether the existing content must survive the open.
    pub(crate) const fn keeps_content(&self) -> bool {
        matches!(self.access, Access::Append) || (self.update && matches!(self.access, Access::Read))
    }

    fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self.access {
            Access::Read => {
                options.read(true).write(self.update);
            }
            Access::Write => {
                options.write(true).create(true).truncate(true).read(self.update);
            }
            Access::Append => {
                options.append(true).create(true).read(self.update);
            }
        }
        options
    }
}

/// Handle on one file opened through the overlay.
///
/// Write handles point into the staging directory. Read handles may point
/// at the host's real source file when the path was not generated.
#[derive(Debug)]
pub struct VirtualFile {
    path: LogicalPath,
    physical: PathBuf,
    mode: OpenMode,
    file: File,
}

impl VirtualFile {
    pub(crate) fn open(path: LogicalPath, physical: PathBuf, mode: OpenMode) -> Result<Self> {
        if mode.is_write()
            && let Some(parent) = physical.parent()
        {
            fs::create_dir_all(parent).map_err(|err| GenFilesError::io(parent, err))?;
        }
        let file = mode
            .options()
            .open(&physical)
            .map_err(|err| GenFilesError::io(&physical, err))?;
        Ok(Self { path, physical, mode, file })
    }

    pub fn path(&self) -> &LogicalPath {
        &self.path
    }

    /// Where the bytes behind this handle live.
    pub fn physical_path(&self) -> &Path {
        &self.physical
    }

    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Write text, folding `\r\n` into `\n` for text-mode handles.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        let result = if self.mode.is_binary() {
            self.file.write_all(text.as_bytes())
        } else {
            self.file.write_all(normalize_newlines(text).as_bytes())
        };
        result.map_err(|err| GenFilesError::io(&self.physical, err))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .map_err(|err| GenFilesError::io(&self.physical, err))
    }

    /// Read the remaining content as text.
    pub fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();
        self.file
            .read_to_string(&mut text)
            .map_err(|err| GenFilesError::io(&self.physical, err))?;
        if self.mode.is_binary() {
            Ok(text)
        } else {
            Ok(normalize_newlines(&text))
        }
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.file
            .read_to_end(&mut bytes)
            .map_err(|err| GenFilesError::io(&self.physical, err))?;
        Ok(bytes)
    }

    /// Rewind to the start of the file.
    pub fn rewind(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .map(|_| ())
            .map_err(|err| GenFilesError::io(&self.physical, err))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|err| GenFilesError::io(&self.physical, err))
    }
}

impl Read for VirtualFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for VirtualFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}
