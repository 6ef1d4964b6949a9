//! Path-level API: the primary embedding surface.
//!
//! ```no_run
//! use vipstitch::file::{read_vip, write_vip, ReadOptions, WriteOptions};
//! use vipstitch::pattern::{Pattern, Rgb, Thread};
//! use vipstitch::stitch::StitchType;
//!
//! let mut design = Pattern::new();
//! design.add_thread(Thread::new(Rgb::new(255, 0, 0)));
//! design.add_stitch_rel(1.2, 0.0, StitchType::Normal);
//! design.add_stitch_rel(0.0, 0.0, StitchType::End);
//! write_vip("design.vip", &design, &WriteOptions::default())?;
//!
//! let back = read_vip("design.vip", &ReadOptions::default())?;
//! assert_eq!(back.thread_count(), 1);
//! # Ok::<(), vipstitch::VipError>(())
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::codec::{get_codec, CodecId, DEFAULT_COMPRESSION_LEVEL, DEFAULT_WINDOW};
use crate::error::Result;
use crate::header::VipHeader;
use crate::io_stream::{Trailer, VipReader, VipWriter};
use crate::layout::StreamLayout;
use crate::pattern::{Pattern, Thread};

// ── Options ───────────────────────────────────────────────────────────────────

/// Configuration for [`read_vip`].  Must name the codec the file was written
/// with; the container does not record it.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub codec:  CodecId,
    pub window: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { codec: CodecId::Zstd, window: DEFAULT_WINDOW }
    }
}

/// Configuration for [`write_vip`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub codec:  CodecId,
    pub level:  i32,
    pub window: u8,
    /// Write through a temporary file in the destination directory and
    /// rename it into place on success.
    pub atomic: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            codec:  CodecId::Zstd,
            level:  DEFAULT_COMPRESSION_LEVEL,
            window: DEFAULT_WINDOW,
            atomic: true,
        }
    }
}

impl From<&WriteOptions> for ReadOptions {
    fn from(w: &WriteOptions) -> Self {
        Self { codec: w.codec, window: w.window }
    }
}

// ── VipInfo ───────────────────────────────────────────────────────────────────

/// Structural summary returned by [`inspect`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct VipInfo {
    pub header:   VipHeader,
    pub layout:   StreamLayout,
    pub palette:  Vec<Thread>,
    pub trailer:  Option<Trailer>,
    pub file_len: u64,
}

// ── Entry points ──────────────────────────────────────────────────────────────

pub fn read_vip<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<Pattern> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = VipReader::new(BufReader::new(file))?;
    let codec = get_codec(opts.codec, DEFAULT_COMPRESSION_LEVEL);
    let pattern = reader.read_pattern(codec.as_ref(), opts.window)?;
    debug!(path = %path.display(), stitches = pattern.stitch_count(), "read design");
    Ok(pattern)
}

pub fn write_vip<P: AsRef<Path>>(path: P, pattern: &Pattern, opts: &WriteOptions) -> Result<()> {
    let path = path.as_ref();
    let codec = get_codec(opts.codec, opts.level);

    if !opts.atomic {
        let mut writer = VipWriter::new(BufWriter::new(File::create(path)?), codec, opts.window);
        writer.write_pattern(pattern)?;
        return Ok(());
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    // Dropping the temp file on any early return removes it.
    let temp = temp_file_in(dir)?;
    let mut writer = VipWriter::new(BufWriter::new(temp), codec, opts.window);
    writer.write_pattern(pattern)?;
    let temp = writer
        .into_inner()
        .into_inner()
        .map_err(|e| e.into_error())?;
    match fs::metadata(path) {
        Ok(existing) => temp.as_file().set_permissions(existing.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    debug!(path = %path.display(), "persisted design");
    Ok(())
}

/// Temp file whose mode matches what `File::create` would give a new file.
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".vip");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// Structure of a file without decompressing its streams.
pub fn inspect<P: AsRef<Path>>(path: P) -> Result<VipInfo> {
    let reader = VipReader::new(BufReader::new(File::open(path)?))?;
    Ok(VipInfo {
        header:   reader.header,
        layout:   reader.layout,
        palette:  reader.palette,
        trailer:  reader.trailer,
        file_len: reader.file_len,
    })
}

/// Rewrite a file's stream payloads with another codec.
pub fn recode<P: AsRef<Path>, Q: AsRef<Path>>(
    input:  P,
    output: Q,
    from:   &ReadOptions,
    to:     &WriteOptions,
) -> Result<Pattern> {
    let mut pattern = read_vip(input, from)?;
    // Drop the synthetic terminator the reader appended, keeping the
    // stitch count stable across recodes.
    pattern.stitches.pop();
    write_vip(output, &pattern, to)?;
    Ok(pattern)
}
