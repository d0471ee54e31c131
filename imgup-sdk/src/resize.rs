// ABOUTME: Aspect-preserving image downscaling for fediverse uploads
// ABOUTME: Parses WxH bounds and re-encodes oversized images in their own format

use crate::constants::{limits::RESIZE_JPEG_QUALITY, scratch::RESIZE_DIR};
use crate::error::{ImgupError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageReader};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Upper bounds for a resize. At least one side is always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeSpec {
    /// Parse `"WxH"`, `"Wx"` or `"xH"`.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || ImgupError::InvalidResize(spec.to_string());
        let (w, h) = spec
            .trim()
            .to_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
            .ok_or_else(invalid)?;

        let bound = |s: &str| -> Result<Option<u32>> {
            if s.is_empty() {
                return Ok(None);
            }
            match s.parse::<u32>() {
                Ok(0) | Err(_) => Err(invalid()),
                Ok(n) => Ok(Some(n)),
            }
        };

        let parsed = Self {
            width: bound(&w)?,
            height: bound(&h)?,
        };
        if parsed.width.is_none() && parsed.height.is_none() {
            return Err(invalid());
        }
        Ok(parsed)
    }
}

impl FromStr for ResizeSpec {
    type Err = ImgupError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        write!(f, "{}x{}", side(self.width), side(self.height))
    }
}

/// Target dimensions for fitting `(width, height)` inside `spec`, or `None`
/// when the source already fits.
pub fn fit_within(source: (u32, u32), spec: ResizeSpec) -> Option<(u32, u32)> {
    let (width, height) = source;
    if width == 0 || height == 0 {
        return None;
    }

    let max_w = spec.width.unwrap_or(u32::MAX);
    let max_h = spec.height.unwrap_or(u32::MAX);
    if width <= max_w && height <= max_h {
        return None;
    }

    let scale = f64::min(
        max_w as f64 / width as f64,
        max_h as f64 / height as f64,
    );
    let new_w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let new_h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    Some((new_w, new_h))
}

/// The external resize collaborator: returns a path to an image that fits
/// `spec`, or `path` itself when nothing needed doing.
pub trait Resizer: Send + Sync {
    fn resize(&self, path: &Path, spec: ResizeSpec) -> Result<PathBuf>;
}

/// [`Resizer`] backed by the `image` crate. Output keeps the source format
/// and goes to `<temp>/imgup-resize/resized_<filename>`.
#[derive(Debug, Clone)]
pub struct ImageResizer {
    output_dir: PathBuf,
}

impl Default for ImageResizer {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(RESIZE_DIR))
    }
}

impl ImageResizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn output_path(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.output_dir.join(format!("resized_{name}"))
    }

    fn write(&self, img: DynamicImage, format: ImageFormat, output: &Path) -> Result<()> {
        let encode_error = |e: image::ImageError| {
            ImgupError::InvalidResponse(format!("Cannot encode {}: {e}", output.display()))
        };

        if format != ImageFormat::Jpeg {
            return img.save_with_format(output, format).map_err(encode_error);
        }

        // JPEG has no alpha channel
        let file = File::create(output).map_err(|e| ImgupError::io(output, e))?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), RESIZE_JPEG_QUALITY);
        DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(encode_error)
    }
}

impl Resizer for ImageResizer {
    fn resize(&self, path: &Path, spec: ResizeSpec) -> Result<PathBuf> {
        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| ImgupError::io(path, e))?;
        let format = reader.format().ok_or_else(|| {
            ImgupError::InvalidResponse(format!("Unknown image format: {}", path.display()))
        })?;
        let img = reader.decode().map_err(|e| {
            ImgupError::InvalidResponse(format!("Cannot decode {}: {e}", path.display()))
        })?;

        let Some((width, height)) = fit_within((img.width(), img.height()), spec) else {
            log::debug!(
                "{} is {}x{}, within {spec}; not resizing",
                path.display(),
                img.width(),
                img.height()
            );
            return Ok(path.to_path_buf());
        };

        log::info!(
            "Resizing {} from {}x{} to {}x{} ({format:?})",
            path.display(),
            img.width(),
            img.height(),
            width,
            height
        );

        let resized = img.resize_exact(width, height, FilterType::Lanczos3);

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ImgupError::io(&self.output_dir, e))?;
        let output = self.output_path(path);
        if output == path {
            return Err(ImgupError::Configuration(format!(
                "Refusing to overwrite {} with its resized copy",
                path.display()
            )));
        }
        self.write(resized, format, &output)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_png;
    use tempfile::TempDir;

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            ResizeSpec::parse("1920x1920").unwrap(),
            ResizeSpec {
                width: Some(1920),
                height: Some(1920)
            }
        );
        assert_eq!(
            ResizeSpec::parse("1200x").unwrap(),
            ResizeSpec {
                width: Some(1200),
                height: None
            }
        );
        assert_eq!(
            ResizeSpec::parse("X800").unwrap(),
            ResizeSpec {
                width: None,
                height: Some(800)
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "x", "1920", "axb", "0x100", "-5x10", "10x10x10"] {
            assert!(
                matches!(ResizeSpec::parse(bad), Err(ImgupError::InvalidResize(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_fit_within_landscape() {
        let spec = ResizeSpec::parse("1920x1920").unwrap();
        assert_eq!(fit_within((3000, 2000), spec), Some((1920, 1280)));
    }

    #[test]
    fn test_fit_within_already_fits() {
        let spec = ResizeSpec::parse("1920x1920").unwrap();
        assert_eq!(fit_within((1000, 800), spec), None);
        assert_eq!(fit_within((1920, 1920), spec), None);
    }

    #[test]
    fn test_fit_within_single_bound() {
        assert_eq!(
            fit_within((4000, 3000), ResizeSpec::parse("x600").unwrap()),
            Some((800, 600))
        );
        assert_eq!(
            fit_within((4000, 3000), ResizeSpec::parse("1000x").unwrap()),
            Some((1000, 750))
        );
    }

    #[test]
    fn test_image_resizer_shrinks_large_image() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("big.png");
        write_png(&source, 300, 200);

        let resizer = ImageResizer::new(dir.path().join("out"));
        let output = resizer
            .resize(&source, ResizeSpec::parse("150x150").unwrap())
            .unwrap();

        assert_eq!(output, dir.path().join("out").join("resized_big.png"));
        let (w, h) = image::image_dimensions(&output).unwrap();
        assert!(w <= 150 && h <= 150);
        assert_eq!((w, h), (150, 100));
    }

    #[test]
    fn test_image_resizer_keeps_png_transparency() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("logo.png");
        image::RgbaImage::from_pixel(200, 100, image::Rgba([10, 20, 30, 0]))
            .save(&source)
            .unwrap();

        let output = ImageResizer::new(dir.path().join("out"))
            .resize(&source, ResizeSpec::parse("100x").unwrap())
            .unwrap();

        assert_eq!(output.file_name().unwrap(), "resized_logo.png");
        assert_eq!(ImageFormat::from_path(&output).unwrap(), ImageFormat::Png);
        let img = image::open(&output).unwrap();
        assert_eq!((img.width(), img.height()), (100, 50));
        assert!(img.color().has_alpha());
        assert_eq!(img.to_rgba8().get_pixel(50, 25)[3], 0);
    }

    #[test]
    fn test_image_resizer_reencodes_jpeg_as_jpeg() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.jpg");
        image::RgbImage::from_pixel(400, 300, image::Rgb([90, 140, 200]))
            .save(&source)
            .unwrap();

        let output = ImageResizer::new(dir.path().join("out"))
            .resize(&source, ResizeSpec::parse("200x200").unwrap())
            .unwrap();

        assert_eq!(output.file_name().unwrap(), "resized_photo.jpg");
        let reader = ImageReader::open(&output)
            .unwrap()
            .with_guessed_format()
            .unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::Jpeg));
        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 150));
    }

    #[test]
    fn test_image_resizer_returns_original_when_small() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("small.png");
        write_png(&source, 100, 80);

        let resizer = ImageResizer::new(dir.path().join("out"));
        let output = resizer
            .resize(&source, ResizeSpec::parse("1920x1920").unwrap())
            .unwrap();
        assert_eq!(output, source);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_image_resizer_errors_on_undecodable_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"not an image").unwrap();

        let resizer = ImageResizer::new(dir.path());
        assert!(resizer
            .resize(&source, ResizeSpec::parse("10x10").unwrap())
            .is_err());
    }
}
