use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tar::{Archive, Builder, Header};
use tempdir::TempDir;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::fs as async_fs;
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

use crate::core::SaveData;

const SCENARIO_FILE_NAME: &str = "scenario.json";
const META_FILE_NAME: &str = "meta.json";
pub const FORMAT_VERSION: &str = "mapchron/1";

/// Bookkeeping stored next to the scenario inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub format: String,
    /// RFC 3339 timestamp.
    pub saved_at: String,
}

impl DocumentMeta {
    fn now() -> anyhow::Result<Self> {
        Ok(Self {
            format: FORMAT_VERSION.to_string(),
            saved_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
        })
    }

    pub fn saved_at(&self) -> anyhow::Result<OffsetDateTime> {
        OffsetDateTime::parse(&self.saved_at, &Rfc3339)
            .with_context(|| format!("Invalid save timestamp {:?}", self.saved_at))
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub save: SaveData,
    pub meta: DocumentMeta,
}

/// Write `save` as a zstd-compressed tar archive at `path`.
///
/// The archive is built next to the target and renamed into place, so a
/// failed save leaves any previous file untouched.
pub async fn save_document<P: AsRef<Path>>(path: P, save: &SaveData) -> anyhow::Result<DocumentMeta> {
    let path = path.as_ref().to_path_buf();
    let scenario = serde_json::to_vec_pretty(save).context("Failed to serialize scenario")?;
    let meta = DocumentMeta::now()?;
    let meta_json = serde_json::to_vec_pretty(&meta)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        async_fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let target = path.clone();
    tokio::task::spawn_blocking(move || write_archive(&target, &scenario, &meta_json)).await??;
    tracing::info!(path = ?path, entries = save.scenario_data.len(), "document saved");
    Ok(meta)
}

fn append_file(tar: &mut Builder<ZstdEncoder<'static, File>>, name: &str, bytes: &[u8], mtime: u64) -> anyhow::Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(mtime);
    header.set_cksum();
    tar.append_data(&mut header, name, bytes)
        .with_context(|| format!("Failed to add {} to archive", name))?;
    Ok(())
}

fn write_archive(path: &Path, scenario: &[u8], meta: &[u8]) -> anyhow::Result<()> {
    let partial = partial_path(path);
    let out = File::create(&partial)
        .with_context(|| format!("Failed to create document archive {:?}", partial))?;

    // zstd encoder wrapping the output file
    let encoder = ZstdEncoder::new(out, 3)
        .with_context(|| format!("Failed to create zstd encoder for {:?}", partial))?;
    let mut tar = Builder::new(encoder);

    let mtime = OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
    append_file(&mut tar, META_FILE_NAME, meta, mtime)?;
    append_file(&mut tar, SCENARIO_FILE_NAME, scenario, mtime)?;

    // Finish tar, then finish zstd stream
    let encoder = tar
        .into_inner()
        .with_context(|| format!("Failed to finalize tar for {:?}", partial))?;
    encoder
        .finish()
        .with_context(|| format!("Failed to finalize zstd stream for {:?}", partial))?;

    fs::rename(&partial, path)
        .with_context(|| format!("Failed to move {:?} into place at {:?}", partial, path))?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Read a document written by [`save_document`].
pub async fn load_document<P: AsRef<Path>>(path: P) -> anyhow::Result<LoadedDocument> {
    let path = path.as_ref().to_path_buf();
    let metadata = async_fs::metadata(&path)
        .await
        .with_context(|| format!("Failed to open document {:?}", path))?;
    if !metadata.is_file() {
        anyhow::bail!("Document path is not a file: {:?}", path);
    }

    let source = path.clone();
    let document = tokio::task::spawn_blocking(move || read_archive(&source)).await??;
    tracing::info!(
        path = ?path,
        entries = document.save.scenario_data.len(),
        format = %document.meta.format,
        "document read"
    );
    Ok(document)
}

fn read_archive(path: &Path) -> anyhow::Result<LoadedDocument> {
    let working_dir = TempDir::new("mapchron_document")?;

    // Unpack tar.zst document into working dir.
    {
        let f = File::open(path)
            .with_context(|| format!("Failed to open document archive {:?}", path))?;
        let decoder = ZstdDecoder::new(f)
            .with_context(|| format!("Invalid zstd stream in {:?}", path))?;
        let mut archive = Archive::new(decoder);
        archive.unpack(working_dir.path()).with_context(|| {
            format!(
                "Failed to extract archive {:?} into {:?}",
                path,
                working_dir.path()
            )
        })?;
    }

    let meta_file = working_dir.path().join(META_FILE_NAME);
    let scenario_file = working_dir.path().join(SCENARIO_FILE_NAME);
    match (meta_file.is_file(), scenario_file.is_file()) {
        (true, true) => {}
        (false, _) => anyhow::bail!("Corrupt document {:?}: {} missing", path, META_FILE_NAME),
        (_, false) => anyhow::bail!("Corrupt document {:?}: {} missing", path, SCENARIO_FILE_NAME),
    }

    let meta: DocumentMeta = serde_json::from_slice(&fs::read(&meta_file)?)
        .with_context(|| format!("Invalid {} in {:?}", META_FILE_NAME, path))?;
    if meta.format != FORMAT_VERSION {
        anyhow::bail!(
            "Unsupported document format {:?} in {:?} (expected {:?})",
            meta.format,
            path,
            FORMAT_VERSION
        );
    }
    let save: SaveData = serde_json::from_slice(&fs::read(&scenario_file)?)
        .with_context(|| format!("Invalid {} in {:?}", SCENARIO_FILE_NAME, path))?;

    Ok(LoadedDocument { save, meta })
}
