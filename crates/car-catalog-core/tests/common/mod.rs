#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use car_catalog_core::{CarCatalog, Config, RendererKind, SqliteStore};
use image::{Rgb, RgbImage};
use tempfile::TempDir;

/// Scratch workspace with a source tree and output locations
pub struct Workspace {
    pub dir: TempDir,
    pub config: Config,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = Config {
            source_root: root.join("source"),
            output_dir: root.join("public").join("cars"),
            thumbnail_dir: root.join("public").join("thumbnails"),
            catalog_path: root.join("public").join("images.json"),
            thumbnail_size: 48,
            renderers: vec![RendererKind::Native],
            threads: 2,
            show_progress: false,
            ..Config::default()
        };
        fs::create_dir_all(&config.source_root).unwrap();
        Self { dir, config }
    }

    pub fn source(&self) -> &Path {
        &self.config.source_root
    }

    /// Write a solid-color image at `relative` inside the source tree
    pub fn add_image(&self, relative: &str, color: [u8; 3], width: u32, height: u32) -> PathBuf {
        let path = self.source().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(width, height, Rgb(color))
            .save(&path)
            .unwrap();
        path
    }

    /// Copy an existing source file to another location in the tree
    pub fn copy_source(&self, from: &Path, relative: &str) -> PathBuf {
        let path = self.source().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::copy(from, &path).unwrap();
        path
    }

    pub fn catalog(&self) -> CarCatalog {
        CarCatalog::new(self.config.clone()).unwrap()
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }
}

/// Number of files directly inside `dir`, zero when it does not exist
pub fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
