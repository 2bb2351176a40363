//! Writing the finished guide.
//!
//! Files are replaced atomically: the document goes to a temporary file next
//! to the target, is flushed to disk, then renamed over it. A reader polling
//! the output path never sees a half-written guide.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use proxyepg_core::{Guide, XmltvError};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Where the guide goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `-` selects stdout; anything else is a file path.
    pub fn from_path(path: &Path) -> Self {
        if path == Path::new("-") {
            Self::Stdout
        } else {
            Self::File(path.to_path_buf())
        }
    }
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("<stdout>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Writes `guide` as XMLTV to `target`.
pub fn write_guide(guide: &Guide, target: &OutputTarget) -> CliResult<()> {
    match target {
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            guide
                .write_xmltv(&mut out)
                .and_then(|()| out.flush().map_err(XmltvError::from))
                .map_err(|e| CliError::output("<stdout>", into_io(e)))
        }
        OutputTarget::File(path) => write_atomic(path, |out| guide.write_xmltv(out)),
    }
}

fn write_atomic<F>(path: &Path, write: F) -> CliResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), XmltvError>,
{
    let tmp = temp_path(path);
    debug!(tmp = %tmp.display(), "writing guide to temporary file");

    let result = (|| -> io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut out = BufWriter::new(File::create(&tmp)?);
        write(&mut out).map_err(into_io)?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(CliError::output(path, e));
    }
    Ok(())
}

/// `dir/guide.xml` -> `dir/.guide.xml.<pid>.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "guide".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn into_io(e: XmltvError) -> io::Error {
    match e {
        XmltvError::Io(io) => io,
        other => io::Error::other(other),
    }
}
