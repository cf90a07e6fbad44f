//! Writing a stable file to its destination
//!
//! A [`Materializer`] turns one input file into one or more artifacts at a
//! resolved [`Destination`]: either a single hard link, or a series of
//! numbered chunks produced by an external `split` program.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use stage_fs::RelPath;
use stage_fs::constants::CHUNK_SUFFIX_WIDTH;

use super::Destination;
use crate::config::SplitLimit;
use crate::{Error, Result};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Produces the artifacts for one published file.
pub trait Materializer: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Write `source` to `destination`.
    ///
    /// Returns the produced artifacts relative to the destination's target
    /// directory. Under dry-run nothing is written and the artifacts that
    /// would have been produced first are returned.
    fn materialize(&self, source: &Path, destination: &Destination) -> Result<Vec<RelPath>>;
}

/// Publishes a file as a hard link to the input.
#[derive(Debug, Clone, Copy)]
pub struct HardlinkMaterializer {
    dry_run: bool,
}

impl HardlinkMaterializer {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl Materializer for HardlinkMaterializer {
    fn name(&self) -> &'static str {
        "hardlink"
    }

    fn materialize(&self, source: &Path, destination: &Destination) -> Result<Vec<RelPath>> {
        let link = destination.path();
        if self.dry_run {
            tracing::debug!(from = %source.display(), to = %link.display(), "Dry run, not linking");
        } else {
            stage_fs::io::link_replacing(source, &link)?;
            tracing::debug!(from = %source.display(), to = %link.display(), "Linked");
        }
        Ok(vec![destination.relative.clone()])
    }
}

/// Publishes a file as numbered chunks written by an external `split`.
#[derive(Debug, Clone)]
pub struct SplitMaterializer {
    limit: SplitLimit,
    program: String,
    clean: bool,
    dry_run: bool,
}

impl SplitMaterializer {
    /// Create a splitter cutting at `limit` with the program at `program`.
    ///
    /// With `clean`, every carriage return is removed from the input before
    /// it reaches the program.
    pub fn new(limit: SplitLimit, program: impl Into<String>, clean: bool, dry_run: bool) -> Self {
        Self {
            limit,
            program: program.into(),
            clean,
            dry_run,
        }
    }

    pub fn limit(&self) -> SplitLimit {
        self.limit
    }

    fn command(&self, chunk_dir: &Path, stem: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.limit.to_arg())
            .arg("--numeric-suffixes")
            .arg(format!("--suffix-length={}", CHUNK_SUFFIX_WIDTH))
            .arg("-")
            .arg(stem)
            .current_dir(chunk_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run the split program over `source`, writing chunks into `chunk_dir`.
    fn run_split(&self, source: &Path, chunk_dir: &Path, stem: &str) -> Result<()> {
        let mut input = File::open(source).map_err(|e| Error::io(source, e))?;

        tracing::debug!(
            program = %self.program,
            limit = %self.limit.to_arg(),
            dir = %chunk_dir.display(),
            stem,
            "Splitting"
        );
        let mut child = self
            .command(chunk_dir, stem)
            .spawn()
            .map_err(|e| Error::io(&self.program, e))?;

        // Dropping stdin at the end of this block closes the pipe
        let fed = match child.stdin.take() {
            Some(mut stdin) => feed(&mut input, &mut stdin, self.clean),
            None => Err(io::Error::other("split stdin was not captured")),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| Error::io(&self.program, e))?;

        if !output.status.success() {
            return Err(Error::SplitFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        fed.map(|_| ()).map_err(|e| Error::io(source, e))
    }
}

impl Materializer for SplitMaterializer {
    fn name(&self) -> &'static str {
        "split"
    }

    fn materialize(&self, source: &Path, destination: &Destination) -> Result<Vec<RelPath>> {
        let chunk_dir = destination.parent_dir();
        let stem = destination.chunk_stem();

        if self.dry_run {
            tracing::debug!(
                from = %source.display(),
                to = %chunk_dir.join(&stem).display(),
                "Dry run, not splitting"
            );
            return Ok(vec![destination.chunk_relative(0)]);
        }

        fs::create_dir_all(&chunk_dir).map_err(|e| Error::io(&chunk_dir, e))?;
        remove_chunks(&chunk_dir, &stem)?;

        self.run_split(source, &chunk_dir, &stem)?;

        // An empty input produces no output from split
        let first = destination.chunk_relative(0).under(&destination.target_dir);
        stage_fs::io::touch(&first)?;

        let chunks = list_chunks(&chunk_dir, &stem)?
            .iter()
            .map(|name| destination.sibling(name))
            .collect::<Vec<_>>();
        tracing::debug!(from = %source.display(), chunks = chunks.len(), "Split");

        Ok(chunks)
    }
}

/// Copy `input` to `output`, dropping `\r` bytes when `clean` is set.
fn feed(input: &mut impl Read, output: &mut impl Write, clean: bool) -> io::Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let n = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        if clean {
            let kept: Vec<u8> = buffer[..n].iter().copied().filter(|&b| b != b'\r').collect();
            output.write_all(&kept)?;
            written += kept.len() as u64;
        } else {
            output.write_all(&buffer[..n])?;
            written += n as u64;
        }
    }

    output.flush()?;
    Ok(written)
}

/// Whether `file_name` is a chunk of `stem`, i.e. `stem` plus a numeric suffix.
fn is_chunk(file_name: &str, stem: &str) -> bool {
    file_name.strip_prefix(stem).is_some_and(|suffix| {
        suffix.len() >= CHUNK_SUFFIX_WIDTH && suffix.bytes().all(|b| b.is_ascii_digit())
    })
}

/// File names of the chunks of `stem` in `dir`, sorted.
fn list_chunks(dir: &Path, stem: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_chunk(&name, stem) {
            names.push(name);
        }
    }
    names.sort();

    Ok(names)
}

/// Remove chunks of `stem` left in `dir` by an earlier publish.
fn remove_chunks(dir: &Path, stem: &str) -> Result<()> {
    for name in list_chunks(dir, stem)? {
        let path: PathBuf = dir.join(&name);
        tracing::debug!(path = %path.display(), "Removing stale chunk");
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
    }
    Ok(())
}
