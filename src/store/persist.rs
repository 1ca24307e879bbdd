//! NDJSON persistence for `file://` databases: one `<collection>.ndjson` per
//! collection, one relaxed extended-JSON document per line.

use bson::Document;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::StoreError;

const EXT: &str = "ndjson";

pub(crate) async fn load_dir(dir: &Path) -> Result<HashMap<String, Vec<Document>>, StoreError> {
    let mut out = HashMap::new();
    if !tokio::fs::try_exists(dir).await? {
        tokio::fs::create_dir_all(dir).await?;
        return Ok(out);
    }
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXT) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let text = tokio::fs::read_to_string(&path).await?;
        let mut docs = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let doc: Document = serde_json::from_str(line).map_err(|e| {
                StoreError::Io(format!("{}:{}: {e}", path.display(), lineno + 1))
            })?;
            docs.push(doc);
        }
        log::debug!("loaded {} documents from {}", docs.len(), path.display());
        out.insert(name, docs);
    }
    Ok(out)
}

pub(crate) async fn write_collection(dir: &Path, name: &str, docs: &[Document]) -> Result<(), StoreError> {
    let mut buf = String::new();
    for d in docs {
        buf.push_str(&serde_json::to_string(d)?);
        buf.push('\n');
    }
    let target = dir.join(format!("{name}.{EXT}"));
    let tmp = dir.join(format!("{name}.{EXT}.tmp"));
    tokio::fs::write(&tmp, buf).await?;
    tokio::fs::rename(&tmp, &target).await?;
    Ok(())
}
