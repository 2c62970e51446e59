//! Line-delimited JSON entry files.
//!
//! One [`ContentEntry`] per line. Writers flush after every page so a run
//! that stops early leaves a readable partial file; readers skip lines that
//! are malformed or truncated instead of failing the whole file.

use std::path::{Path, PathBuf};

use campuscorpus_shared::{ContentEntry, CorpusError, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Incremental JSONL writer for corpus entries.
pub struct EntryWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: usize,
    /// File length once everything written so far is flushed.
    offset: u64,
}

impl EntryWriter {
    /// Create (or truncate) the file at `path`.
    pub async fn create(path: &Path) -> Result<Self> {
        Self::open(path, false).await
    }

    /// Open the file at `path` for appending, creating it if absent.
    pub async fn append(path: &Path) -> Result<Self> {
        Self::open(path, true).await
    }

    /// Reopen the file of an interrupted run for appending.
    ///
    /// With `offset`, anything past it is cut off first: those lines came
    /// from pages the checkpoint does not count as visited, and the resumed
    /// crawl fetches them again.
    pub async fn resume(path: &Path, offset: Option<u64>) -> Result<Self> {
        if let Some(offset) = offset {
            truncate_to(path, offset).await?;
        }
        Self::append(path).await
    }

    async fn open(path: &Path, append: bool) -> Result<Self> {
        ensure_parent(path).await?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .await
            .map_err(|e| CorpusError::io(path, e))?;
        let offset = if append {
            file.metadata()
                .await
                .map_err(|e| CorpusError::io(path, e))?
                .len()
        } else {
            0
        };
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            written: 0,
            offset,
        })
    }

    /// Serialize one entry as a single line.
    pub async fn write_entry(&mut self, entry: &ContentEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|e| CorpusError::Storage(format!("failed to encode entry: {e}")))?;
        line.push(b'\n');
        self.out
            .write_all(&line)
            .await
            .map_err(|e| CorpusError::io(&self.path, e))?;
        self.written += 1;
        self.offset += line.len() as u64;
        Ok(())
    }

    /// Write a batch of entries and flush them to disk.
    pub async fn write_batch(&mut self, entries: &[ContentEntry]) -> Result<()> {
        for entry in entries {
            self.write_entry(entry).await?;
        }
        self.flush().await
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .await
            .map_err(|e| CorpusError::io(&self.path, e))
    }

    /// Entries written through this handle.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Length of the file after the next flush.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn truncate_to(path: &Path, offset: u64) -> Result<()> {
    let file = match OpenOptions::new().write(true).open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CorpusError::io(path, e)),
    };
    let len = file
        .metadata()
        .await
        .map_err(|e| CorpusError::io(path, e))?
        .len();
    if len > offset {
        file.set_len(offset)
            .await
            .map_err(|e| CorpusError::io(path, e))?;
        tracing::info!(path = %path.display(), from = len, to = offset, "dropped entries written after the checkpoint");
    } else if len < offset {
        tracing::warn!(path = %path.display(), len, offset, "entry file is shorter than the checkpoint recorded");
    }
    Ok(())
}

/// Read every well-formed entry from a JSONL file.
///
/// Blank lines are ignored; lines that fail to decode are logged and skipped.
pub async fn read_entries(path: &Path) -> Result<Vec<ContentEntry>> {
    let file = File::open(path)
        .await
        .map_err(|e| CorpusError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let mut entries = Vec::new();
    let mut line_no = 0usize;
    let mut skipped = 0usize;
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CorpusError::io(path, e))?
    {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ContentEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                skipped += 1;
                tracing::warn!(path = %path.display(), line = line_no, error = %e, "skipping malformed entry");
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, kept = entries.len(), "entry file had malformed lines");
    }
    Ok(entries)
}

/// Replace the file at `path` with `entries`, atomically.
///
/// The entries go to a sibling temp file which is then renamed over `path`,
/// so readers never observe a half-written corpus.
pub async fn write_entries(path: &Path, entries: &[ContentEntry]) -> Result<()> {
    ensure_parent(path).await?;
    let tmp = temp_sibling(path);

    let mut writer = EntryWriter::create(&tmp).await?;
    writer.write_batch(entries).await?;
    drop(writer);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CorpusError::io(path, e))?;
    tracing::debug!(path = %path.display(), count = entries.len(), "wrote entry file");
    Ok(())
}

pub(crate) async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CorpusError::io(parent, e))?;
    }
    Ok(())
}

pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuscorpus_shared::SourceType;
    use uuid::Uuid;

    fn test_dir() -> PathBuf {
        std::env::temp_dir().join(format!("cc-entries-{}", Uuid::now_v7()))
    }

    fn entry(title: &str, text: &str) -> ContentEntry {
        ContentEntry {
            title: title.into(),
            section_header: Some("Overview".into()),
            text: text.into(),
            url: "https://example.edu/page".into(),
            anchor_url: "https://example.edu/page#overview".into(),
            anchor_id: Some("overview".into()),
            header_level: None,
            persona: "all".into(),
            faq_category: None,
            source_type: SourceType::Web,
            chunk_index: 0,
            total_chunks: Some(1),
            pdf_page: None,
            total_pages: None,
            total_chunks_on_page: None,
            priority: None,
            pdf_key: None,
            scraped_at: None,
        }
    }

    #[tokio::test]
    async fn append_writer_keeps_existing_entries() {
        let path = test_dir().join("web.jsonl");

        let mut writer = EntryWriter::create(&path).await.expect("create");
        writer.write_batch(&[entry("A", "first")]).await.expect("write");
        assert_eq!(writer.written(), 1);
        drop(writer);

        let mut writer = EntryWriter::append(&path).await.expect("append");
        writer.write_batch(&[entry("B", "second")]).await.expect("write");
        drop(writer);

        let entries = read_entries(&path).await.expect("read");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "A");
        assert_eq!(entries[1].title, "B");
    }

    #[tokio::test]
    async fn resume_cuts_entries_after_offset() {
        let path = test_dir().join("web.jsonl");

        let mut writer = EntryWriter::create(&path).await.unwrap();
        writer.write_batch(&[entry("Home", "kept")]).await.unwrap();
        let checkpointed = writer.offset();
        writer.write_batch(&[entry("One", "after checkpoint")]).await.unwrap();
        let full = writer.offset();
        drop(writer);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), full);

        let mut writer = EntryWriter::resume(&path, Some(checkpointed)).await.unwrap();
        assert_eq!(writer.offset(), checkpointed);
        writer.write_batch(&[entry("One", "refetched")]).await.unwrap();
        drop(writer);

        let texts: Vec<_> = read_entries(&path).await.unwrap().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["kept", "refetched"]);
    }

    #[tokio::test]
    async fn resume_without_offset_appends() {
        let path = test_dir().join("web.jsonl");
        write_entries(&path, &[entry("Old", "kept")]).await.unwrap();

        let mut writer = EntryWriter::resume(&path, None).await.unwrap();
        writer.write_batch(&[entry("New", "added")]).await.unwrap();
        drop(writer);

        assert_eq!(read_entries(&path).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_truncates_previous_run() {
        let path = test_dir().join("web.jsonl");
        write_entries(&path, &[entry("Old", "stale")]).await.unwrap();

        let mut writer = EntryWriter::create(&path).await.unwrap();
        writer.write_batch(&[entry("New", "fresh")]).await.unwrap();
        drop(writer);

        let entries = read_entries(&path).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "New");
    }

    #[tokio::test]
    async fn malformed_and_truncated_lines_are_skipped() {
        let dir = test_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("partial.jsonl");

        let good = serde_json::to_string(&entry("Good", "kept")).unwrap();
        let truncated = &good[..good.len() / 2];
        let content = format!("{good}\nnot json at all\n\n{truncated}");
        tokio::fs::write(&path, content).await.unwrap();

        let entries = read_entries(&path).await.expect("read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "kept");
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let path = test_dir().join("nested").join("corpus.jsonl");
        write_entries(&path, &[entry("A", "a"), entry("B", "b")])
            .await
            .expect("write");

        assert!(path.exists());
        assert!(!temp_sibling(&path).exists());
        assert_eq!(read_entries(&path).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let path = test_dir().join("absent.jsonl");
        let err = read_entries(&path).await.unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
