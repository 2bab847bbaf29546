use crate::config::{
    BACKUP_VERSION, CLASSES_KEY, CONFIG_KEY, MARKS_KEY, STUDENTS_KEY, USERS_KEY,
};
use crate::error::{AppError, Result};
use crate::model::{ClassRoom, Mark, Student, User};
use crate::settings;
use crate::store::{load_list, load_value, RecordStore};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_ENTRY: &str = "data/backup.json";
pub const BUNDLE_FORMAT_V1: &str = "nursery-backup-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub users: Vec<User>,
    pub classes: Vec<ClassRoom>,
    pub students: Vec<Student>,
    pub marks: Vec<Mark>,
    pub config: Map<String, Value>,
    pub timestamp: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub users: usize,
    pub classes: usize,
    pub students: usize,
    /// `None` when the backup carried no marks and the stored marks were kept.
    pub marks: Option<usize>,
    pub config_replaced: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub sha256: String,
}

pub fn export_document(store: &dyn RecordStore) -> Result<BackupDocument> {
    Ok(BackupDocument {
        users: load_list(store, USERS_KEY)?,
        classes: load_list(store, CLASSES_KEY)?,
        students: load_list(store, STUDENTS_KEY)?,
        marks: load_list(store, MARKS_KEY)?,
        config: load_value(store, CONFIG_KEY)?.unwrap_or_default(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: BACKUP_VERSION.to_string(),
    })
}

pub fn export_json(store: &dyn RecordStore) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export_document(store)?)?)
}

fn typed_array<T: serde::de::DeserializeOwned>(data: &Map<String, Value>, key: &str) -> Result<Option<Vec<T>>> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v @ Value::Array(_)) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| AppError::Import(format!("{} has invalid records: {}", key, e))),
        Some(_) => Err(AppError::Import(format!("{} must be an array", key))),
    }
}

fn required_array<T: serde::de::DeserializeOwned>(data: &Map<String, Value>, key: &str) -> Result<Vec<T>> {
    typed_array(data, key)?.ok_or_else(|| AppError::Import(format!("missing {}", key)))
}

/// Replaces users, classes and students (and marks/config when present) with
/// the backup's contents. Either everything is written or nothing is.
pub fn import_json(store: &mut dyn RecordStore, text: &str) -> Result<ImportSummary> {
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| AppError::Import(format!("not JSON: {}", e)))?;
    let Value::Object(data) = parsed else {
        return Err(AppError::Import("backup must be a JSON object".to_string()));
    };

    let users: Vec<User> = required_array(&data, "users")?;
    let classes: Vec<ClassRoom> = required_array(&data, "classes")?;
    let students: Vec<Student> = required_array(&data, "students")?;
    let marks: Option<Vec<Mark>> = typed_array(&data, "marks")?;
    let config = match data.get("config") {
        None | Some(Value::Null) => None,
        Some(Value::Object(m)) => {
            settings::check_config_fields(m)
                .map_err(|e| AppError::Import(format!("config: {}", e)))?;
            Some(m.clone())
        }
        Some(_) => return Err(AppError::Import("config must be an object".to_string())),
    };

    let mut entries: Vec<(&str, String)> = vec![
        (USERS_KEY, serde_json::to_string(&users)?),
        (CLASSES_KEY, serde_json::to_string(&classes)?),
        (STUDENTS_KEY, serde_json::to_string(&students)?),
    ];
    if let Some(m) = &marks {
        entries.push((MARKS_KEY, serde_json::to_string(m)?));
    }
    if let Some(c) = &config {
        entries.push((CONFIG_KEY, serde_json::to_string(c)?));
    }
    store.set_many(&entries)?;

    let summary = ImportSummary {
        users: users.len(),
        classes: classes.len(),
        students: students.len(),
        marks: marks.map(|m| m.len()),
        config_replaced: config.is_some(),
    };
    tracing::info!(?summary, "backup imported");
    Ok(summary)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn export_bundle(store: &dyn RecordStore, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let payload = export_json(store).map_err(|e| anyhow!("{}", e))?;
    let checksum = sha256_hex(payload.as_bytes());

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = serde_json::json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "sha256": checksum,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DATA_ENTRY, opts)
        .context("failed to start data entry")?;
    zip.write_all(payload.as_bytes())
        .context("failed to write data entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        sha256: checksum,
    })
}

/// Reads a bundle written by `export_bundle`, or a bare JSON backup file.
pub fn read_bundle(in_path: &Path) -> anyhow::Result<String> {
    if !is_zip_file(in_path)? {
        return std::fs::read_to_string(in_path)
            .with_context(|| format!("failed to read {}", in_path.to_string_lossy()));
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut payload = String::new();
    archive
        .by_name(DATA_ENTRY)
        .context("bundle missing data/backup.json")?
        .read_to_string(&mut payload)
        .context("failed to read data/backup.json")?;

    if let Some(expected) = manifest.get("sha256").and_then(|v| v.as_str()) {
        let actual = sha256_hex(payload.as_bytes());
        if actual != expected {
            return Err(anyhow!(
                "checksum mismatch: expected {} actual {}",
                expected,
                actual
            ));
        }
    }
    Ok(payload)
}

pub fn import_bundle(store: &mut dyn RecordStore, in_path: &Path) -> Result<ImportSummary> {
    let payload = read_bundle(in_path).map_err(|e| AppError::Import(format!("{:#}", e)))?;
    import_json(store, &payload)
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
