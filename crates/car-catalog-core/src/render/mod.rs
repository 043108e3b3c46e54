//! Derivative rendering: a primary rendition and a square thumbnail per asset.
//!
//! Providers implement [`Renderer`] and are tried in priority order for every
//! file. The engine never aborts a run because a provider is missing: without
//! any working provider the primary is a byte copy of the source and the
//! thumbnail is skipped, unless `strict_render` is set.

mod magick;
mod native;

pub use magick::MagickRenderer;
pub use native::NativeRenderer;

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::config::{Config, RendererKind, SizePolicy};
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};
use crate::types::AssetIdentifier;
use crate::utils::write_atomic;

/// An interchangeable rendering capability
pub trait Renderer: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Whether the provider can be used on this machine
    fn is_available(&self) -> bool;

    /// Write the primary rendition of `source` to `dest` as WebP
    fn render_primary(&self, source: &Path, dest: &Path, policy: SizePolicy, quality: f32)
        -> Result<()>;

    /// Write a center-cropped `size`x`size` WebP thumbnail of `source` to `dest`
    fn render_thumbnail(&self, source: &Path, dest: &Path, size: u32, quality: f32) -> Result<()>;
}

/// Build the provider for one configured chain entry
pub fn renderer_for(kind: &RendererKind) -> Box<dyn Renderer> {
    match kind {
        RendererKind::Native => Box::new(NativeRenderer),
        RendererKind::Magick { program } => Box::new(MagickRenderer::new(program)),
    }
}

/// Paths produced for one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub primary: PathBuf,

    /// Absent when no provider could produce a thumbnail
    pub thumbnail: Option<PathBuf>,

    /// The primary already existed and was left untouched
    pub primary_cached: bool,

    /// The primary is a raw copy of the source, not a converted rendition
    pub degraded: bool,
}

/// Renders derivatives through a chain of providers
pub struct TransformEngine {
    renderers: Vec<Box<dyn Renderer>>,
    output_dir: PathBuf,
    thumbnail_dir: PathBuf,
    thumbnail_size: u32,
    quality: f32,
    thumbnail_quality: f32,
    strict: bool,
}

impl TransformEngine {
    /// Probe the configured chain once and keep the available providers
    pub fn from_config(config: &Config) -> Self {
        let renderers = config
            .renderers
            .iter()
            .map(renderer_for)
            .filter(|renderer| {
                let available = renderer.is_available();
                if !available {
                    debug!("Renderer {} is not available", renderer.name());
                }
                available
            })
            .collect::<Vec<_>>();

        if renderers.is_empty() {
            warn!("No renderer available; primaries will be raw copies and thumbnails skipped");
        }

        Self::with_renderers(renderers, config)
    }

    /// Use an explicit provider chain
    pub fn with_renderers(renderers: Vec<Box<dyn Renderer>>, config: &Config) -> Self {
        Self {
            renderers,
            output_dir: config.output_dir.clone(),
            thumbnail_dir: config.thumbnail_dir.clone(),
            thumbnail_size: config.thumbnail_size,
            quality: config.quality,
            thumbnail_quality: config.thumbnail_quality,
            strict: config.strict_render,
        }
    }

    /// Names of the providers in priority order
    pub fn renderer_names(&self) -> Vec<&str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    pub fn primary_path(&self, id: &AssetIdentifier) -> PathBuf {
        self.output_dir.join(id.output_file_name())
    }

    pub fn thumbnail_path(&self, id: &AssetIdentifier) -> PathBuf {
        self.thumbnail_dir.join(id.output_file_name())
    }

    /// Render both derivatives of `source` under the names of `id`
    pub fn render(
        &self,
        source: &Path,
        id: &AssetIdentifier,
        policy: SizePolicy,
    ) -> Result<RenderOutput> {
        let primary = self.primary_path(id);
        let thumbnail = self.thumbnail_path(id);

        let (primary_cached, degraded) = if primary.exists() {
            debug!("Primary {} exists, skipping", primary.display());
            (true, false)
        } else {
            (false, self.render_primary(source, &primary, policy)?)
        };

        let thumbnail = self.render_thumbnail(source, &thumbnail)?;

        Ok(RenderOutput {
            primary,
            thumbnail,
            primary_cached,
            degraded,
        })
    }

    /// Returns true when the primary had to fall back to a raw copy
    fn render_primary(&self, source: &Path, dest: &Path, policy: SizePolicy) -> Result<bool> {
        let before = std::fs::metadata(source)?.len();

        for renderer in &self.renderers {
            match renderer.render_primary(source, dest, policy, self.quality) {
                Ok(()) => {
                    let after = std::fs::metadata(dest)?.len();
                    info!(
                        "Rendered {} with {} ({}): {} -> {} bytes",
                        source.display(),
                        renderer.name(),
                        policy,
                        before,
                        after
                    );
                    log_fs_modification("render_primary", dest, Some(renderer.name()));
                    return Ok(false);
                }
                Err(e) => warn!(
                    "Renderer {} failed on {}: {}",
                    renderer.name(),
                    source.display(),
                    e
                ),
            }
        }

        if self.strict {
            return Err(Error::RendererUnavailable {
                path: source.to_path_buf(),
                reason: "no renderer produced a primary rendition".to_string(),
            });
        }

        warn!(
            "No renderer succeeded for {}, copying source bytes unchanged",
            source.display()
        );
        let bytes = std::fs::read(source)?;
        write_atomic(dest, &bytes).map_err(|e| {
            log_file_error(dest, "copy_primary", &e);
            e
        })?;
        info!(
            "Copied {} without conversion: {} -> {} bytes",
            source.display(),
            before,
            bytes.len()
        );
        log_fs_modification("copy_primary", dest, None);
        Ok(true)
    }

    fn render_thumbnail(&self, source: &Path, dest: &Path) -> Result<Option<PathBuf>> {
        for renderer in &self.renderers {
            match renderer.render_thumbnail(source, dest, self.thumbnail_size, self.thumbnail_quality)
            {
                Ok(()) => {
                    debug!("Thumbnail {} written by {}", dest.display(), renderer.name());
                    return Ok(Some(dest.to_path_buf()));
                }
                Err(e) => warn!(
                    "Renderer {} failed on thumbnail for {}: {}",
                    renderer.name(),
                    source.display(),
                    e
                ),
            }
        }

        if self.strict {
            return Err(Error::RendererUnavailable {
                path: source.to_path_buf(),
                reason: "no renderer produced a thumbnail".to_string(),
            });
        }

        warn!("Skipping thumbnail for {}: no renderer available", source.display());
        Ok(None)
    }
}
