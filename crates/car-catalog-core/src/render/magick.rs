use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};

use super::Renderer;
use crate::config::SizePolicy;
use crate::error::{Error, Result};
use crate::utils::sibling_temp;

/// ImageMagick subprocess renderer (`magick` or legacy `convert`)
#[derive(Debug, Clone)]
pub struct MagickRenderer {
    program: String,
}

impl MagickRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for the primary rendition, without input and output
    fn primary_args(policy: SizePolicy, quality: f32) -> Vec<String> {
        let mut args = vec!["-auto-orient".to_string()];
        if let SizePolicy::Fit { width, height } = policy {
            let geometry = format!("{}x{}", width, height);
            args.extend([
                "-resize".to_string(),
                format!("{}>", geometry),
                "-background".to_string(),
                "white".to_string(),
                "-gravity".to_string(),
                "center".to_string(),
                "-extent".to_string(),
                geometry,
            ]);
        }
        args.extend(["-quality".to_string(), format!("{}", quality.round())]);
        args
    }

    /// Arguments for the square thumbnail, without input and output
    fn thumbnail_args(size: u32, quality: f32) -> Vec<String> {
        let geometry = format!("{}x{}", size, size);
        vec![
            "-auto-orient".to_string(),
            "-thumbnail".to_string(),
            format!("{}^", geometry),
            "-gravity".to_string(),
            "center".to_string(),
            "-extent".to_string(),
            geometry,
            "-quality".to_string(),
            format!("{}", quality.round()),
        ]
    }

    /// Run the program into a temporary sibling of `dest`, then move it into place
    fn run(&self, source: &Path, dest: &Path, args: &[String]) -> Result<()> {
        let tmp = sibling_temp(dest, ".webp")?;
        debug!("{} {} {:?} -> {}", self.program, source.display(), args, dest.display());

        let output = Command::new(&self.program)
            .arg(source)
            .args(args)
            .arg(format!("webp:{}", tmp.path().display()))
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tmp.persist(dest).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Renderer for MagickRenderer {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn render_primary(
        &self,
        source: &Path,
        dest: &Path,
        policy: SizePolicy,
        quality: f32,
    ) -> Result<()> {
        self.run(source, dest, &Self::primary_args(policy, quality))
    }

    fn render_thumbnail(&self, source: &Path, dest: &Path, size: u32, quality: f32) -> Result<()> {
        self.run(source, dest, &Self::thumbnail_args(size, quality))
    }
}
