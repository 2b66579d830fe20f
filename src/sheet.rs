//! Sheet building and the results table.
//!
//! A sheet is built by handing its images to the packing engine, keying the
//! returned rectangles by image file name and writing the encoded atlas to
//! disk. Only a sheet that was fully written produces a [`SheetResult`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{PackOptions, SheetOutput};
use crate::error::{Result, SpriteError};
use crate::pack::{Coordinate, PackRequest, PackingEngine};

/// Pixel dimensions of a packed sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SheetProperties {
    pub width: u32,
    pub height: u32,
}

/// A built sprite sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetResult {
    pub name: String,
    /// Web-facing path of the sheet image.
    pub url: String,
    /// Where the sheet image was written.
    pub output_path: PathBuf,
    pub properties: SheetProperties,
    /// Image rectangles keyed by source file name.
    pub coordinates: BTreeMap<String, Coordinate>,
}

impl SheetResult {
    pub fn image(&self, name: &str) -> Option<&Coordinate> {
        self.coordinates.get(name)
    }
}

/// Results of a completed generation pass, keyed by sheet name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultsTable {
    sheets: BTreeMap<String, SheetResult>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sheet: &str) -> Option<&SheetResult> {
        self.sheets.get(sheet)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SheetResult> {
        self.sheets.values()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Pretty-printed JSON for downstream tools.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SpriteError::config(format!("Failed to serialize results: {}", e)))
    }
}

impl FromIterator<SheetResult> for ResultsTable {
    fn from_iter<I: IntoIterator<Item = SheetResult>>(iter: I) -> Self {
        Self {
            sheets: iter.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }
}

/// Pack, normalize and persist one sheet.
pub async fn build_sheet(
    name: &str,
    images: Vec<PathBuf>,
    options: PackOptions,
    output: &SheetOutput,
    engine: Arc<dyn PackingEngine>,
) -> Result<SheetResult> {
    let timeout = Duration::from_millis(options.timeout_ms);
    let request = PackRequest {
        sheet: name.to_string(),
        images,
        options,
    };

    debug!(sheet = name, images = request.images.len(), "packing sheet");

    let task = tokio::task::spawn_blocking(move || {
        let packed = engine.pack(&request);
        (request, packed)
    });

    let (request, packed) = match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            return Err(SpriteError::Packing {
                sheet: name.to_string(),
                message: format!("timed out after {}ms", timeout.as_millis()),
            })
        }
        Ok(Err(e)) => {
            return Err(SpriteError::Packing {
                sheet: name.to_string(),
                message: format!("engine task failed: {}", e),
            })
        }
        Ok(Ok((request, packed))) => (request, packed?),
    };

    let coordinates = normalize_coordinates(name, &request.images, &packed.coordinates)?;

    let output_path = output.path(name);
    persist(&output_path, packed.image).await?;

    info!(sheet = name, path = %output_path.display(), "generated sprite sheet");

    Ok(SheetResult {
        name: name.to_string(),
        url: output.url(name),
        output_path,
        properties: SheetProperties {
            width: packed.width,
            height: packed.height,
        },
        coordinates,
    })
}

/// Re-key engine coordinates from full source path to file name.
///
/// Two sources sharing a file name within one sheet are rejected.
pub fn normalize_coordinates(
    sheet: &str,
    images: &[PathBuf],
    coordinates: &BTreeMap<PathBuf, Coordinate>,
) -> Result<BTreeMap<String, Coordinate>> {
    let mut normalized = BTreeMap::new();
    let mut origins: BTreeMap<String, &Path> = BTreeMap::new();

    for path in images {
        let coordinate = coordinates.get(path).ok_or_else(|| SpriteError::Packing {
            sheet: sheet.to_string(),
            message: format!("engine returned no coordinates for {}", path.display()),
        })?;

        let key = basename(path).ok_or_else(|| SpriteError::Packing {
            sheet: sheet.to_string(),
            message: format!("{} has no file name", path.display()),
        })?;

        if let Some(first) = origins.get(&key) {
            return Err(SpriteError::DuplicateImage {
                sheet: sheet.to_string(),
                image: key,
                first: first.to_path_buf(),
                second: path.clone(),
            });
        }

        origins.insert(key.clone(), path);
        normalized.insert(key, *coordinate);
    }

    Ok(normalized)
}

/// File name of a path, as used for coordinate keys and image lookups.
pub fn basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Write `bytes` to `path` through a uniquely named sibling temporary file.
///
/// Concurrent writers of one target never share a temporary file. A failed
/// write removes its temporary file.
async fn persist(path: &Path, bytes: Vec<u8>) -> Result<()> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
        .await
        .map_err(|e| SpriteError::Persistence {
            path: path.to_path_buf(),
            message: format!("write task failed: {}", e),
        })?
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let failed = |message: String| SpriteError::Persistence {
        path: path.to_path_buf(),
        message,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|e| failed(format!("cannot create directory {}: {}", parent.display(), e)))?;

    let name = basename(path).unwrap_or_default();
    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| failed(e.to_string()))?;

    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| failed(e.to_string()))?;

    // A failed persist hands the file back; dropping it removes it.
    temp.persist(path).map_err(|e| failed(e.error.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::{ImageEngine, PackOutput};
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn coord(x: u32, y: u32, width: u32, height: u32) -> Coordinate {
        Coordinate { x, y, width, height }
    }

    fn output(public: &Path) -> SheetOutput {
        SheetOutput {
            public_dir: public.to_path_buf(),
            output_dir: "images/spritesheets".to_string(),
            output_file: "{{name}}.png".to_string(),
        }
    }

    struct FailingEngine;

    impl PackingEngine for FailingEngine {
        fn pack(&self, request: &PackRequest) -> Result<PackOutput> {
            Err(SpriteError::Packing {
                sheet: request.sheet.clone(),
                message: "unsupported format".to_string(),
            })
        }
    }

    struct SlowEngine;

    impl PackingEngine for SlowEngine {
        fn pack(&self, _request: &PackRequest) -> Result<PackOutput> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(PackOutput {
                image: vec![],
                width: 0,
                height: 0,
                coordinates: BTreeMap::new(),
            })
        }
    }

    #[test]
    fn test_normalize_uses_basename() {
        let path = PathBuf::from("/project/app/assets/images/sprites/icon.png");
        let coordinates = BTreeMap::from([(path.clone(), coord(1, 2, 3, 4))]);

        let normalized = normalize_coordinates("default", &[path], &coordinates).unwrap();

        assert_eq!(normalized.keys().collect::<Vec<_>>(), vec!["icon.png"]);
        assert_eq!(normalized["icon.png"], coord(1, 2, 3, 4));
    }

    #[test]
    fn test_normalize_rejects_duplicate_basenames() {
        let a = PathBuf::from("/p/one/icon.png");
        let b = PathBuf::from("/p/two/icon.png");
        let coordinates = BTreeMap::from([
            (a.clone(), coord(0, 0, 1, 1)),
            (b.clone(), coord(1, 0, 1, 1)),
        ]);

        let err = normalize_coordinates("default", &[a.clone(), b.clone()], &coordinates).unwrap_err();

        assert_eq!(
            err,
            SpriteError::DuplicateImage {
                sheet: "default".to_string(),
                image: "icon.png".to_string(),
                first: a,
                second: b,
            }
        );
    }

    #[test]
    fn test_normalize_requires_every_image() {
        let a = PathBuf::from("/p/a.png");
        let err = normalize_coordinates("s", &[a], &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("no coordinates"));
    }

    #[tokio::test]
    async fn test_build_sheet_writes_image() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let a = src.join("a.png");
        RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])).save(&a).unwrap();

        let public = dir.path().join("public");
        let result = build_sheet(
            "default",
            vec![a],
            PackOptions::default(),
            &output(&public),
            Arc::new(ImageEngine::new()),
        )
        .await
        .unwrap();

        assert_eq!(result.url, "/images/spritesheets/default.png");
        assert_eq!(result.output_path, public.join("images/spritesheets/default.png"));
        assert_eq!(result.properties, SheetProperties { width: 4, height: 4 });
        assert_eq!(result.image("a.png"), Some(&coord(0, 0, 4, 4)));

        let written = image::open(&result.output_path).unwrap();
        assert_eq!((written.width(), written.height()), (4, 4));
        assert!(leftovers(&public.join("images/spritesheets")).is_empty());
    }

    #[tokio::test]
    async fn test_build_sheet_reports_engine_failure() {
        let dir = tempdir().unwrap();
        let err = build_sheet(
            "icons",
            vec![dir.path().join("a.png")],
            PackOptions::default(),
            &output(dir.path()),
            Arc::new(FailingEngine),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to pack sprite sheet \"icons\": unsupported format"
        );
        assert!(!dir.path().join("images").exists());
    }

    #[tokio::test]
    async fn test_build_sheet_times_out() {
        let dir = tempdir().unwrap();
        let options = PackOptions {
            timeout_ms: 20,
            ..Default::default()
        };

        let err = build_sheet(
            "slow",
            vec![dir.path().join("a.png")],
            options,
            &output(dir.path()),
            Arc::new(SlowEngine),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("timed out after 20ms"));
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let dir = tempdir().unwrap();
        // A file where the output directory should be.
        fs::write(dir.path().join("images"), b"").unwrap();

        let err = persist(&dir.path().join("images/sheet.png"), b"data".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, SpriteError::Persistence { .. }));
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_of_one_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sheets/default.png");

        for round in 0..20u8 {
            let writes = (0..8u8).map(|i| persist(&target, vec![round * 8 + i; 4096]));
            for result in futures::future::join_all(writes).await {
                result.unwrap();
            }
        }

        let written = fs::read(&target).unwrap();
        assert_eq!(written.len(), 4096);
        assert!(written.iter().all(|b| *b == written[0]));
        assert!(leftovers(&dir.path().join("sheets")).is_empty());
    }

    #[tokio::test]
    async fn test_persist_replaces_existing_sheet() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("default.png");
        fs::write(&target, b"old").unwrap();

        persist(&target, b"new".to_vec()).await.unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_results_table_json() {
        let table: ResultsTable = [SheetResult {
            name: "default".to_string(),
            url: "/s/default.png".to_string(),
            output_path: PathBuf::from("public/s/default.png"),
            properties: SheetProperties { width: 30, height: 10 },
            coordinates: BTreeMap::from([("a.png".to_string(), coord(0, 0, 10, 10))]),
        }]
        .into_iter()
        .collect();

        let json: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();

        assert_eq!(json["default"]["url"], "/s/default.png");
        assert_eq!(json["default"]["properties"]["width"], 30);
        assert_eq!(json["default"]["coordinates"]["a.png"]["height"], 10);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["default"]);
    }
}
