// ABOUTME: Upload orchestration: turns CLI arguments into adapter calls and bridge posts
// ABOUTME: Photo hosts get one upload per image, fediverse backends one post with every image

use crate::cli::UploadArgs;
use crate::cli_output::CliOutput;
use crate::config::{self, ConfigMap};
use anyhow::{bail, Result};
use imgup_sdk::constants::limits::MAX_FEDI_IMAGES;
use imgup_sdk::metadata::dedupe_tags;
use imgup_sdk::{
    Backend, BridgeOptions, Credentials, FederationBridge, FediImage, FediverseOptions,
    ImgupError, OutputFormat, PublishedSnippet, UploadDescriptors, UploadOptions,
};
use std::path::PathBuf;

/// Everything needed to run one `imgup upload`.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub backend: Backend,
    pub format: OutputFormat,
    pub images: Vec<PathBuf>,
    pub options: UploadOptions,
    /// Set when the results should also be posted to the fediverse
    pub bridge: Option<BridgeOptions>,
}

impl UploadPlan {
    pub fn from_args(args: &UploadArgs, config: &ConfigMap) -> Result<Self> {
        if args.images.len() > MAX_FEDI_IMAGES {
            return Err(ImgupError::TooManyImages {
                count: args.images.len(),
                max: MAX_FEDI_IMAGES,
            }
            .into());
        }
        for image in &args.images {
            if !image.is_file() {
                bail!("Image not found: {}", image.display());
            }
        }

        let backend = match args.backend {
            Some(backend) => backend,
            None => config::default_backend(config)?,
        };
        let format = match args.format {
            Some(format) => format,
            None => config::default_format(config)?,
        };

        let descriptors = UploadDescriptors {
            title: args.title.clone(),
            caption: args.caption.clone(),
            alt_text: args.alt.clone(),
            tags: dedupe_tags(&args.tags),
        };

        let fediverse = FediverseOptions {
            images: if backend.is_fediverse() {
                args.images
                    .iter()
                    .enumerate()
                    .map(|(i, path)| FediImage::new(path, args.alt.clone().filter(|_| i == 0)))
                    .collect()
            } else {
                Vec::new()
            },
            post_text: args.post.clone(),
            visibility: args.visibility,
            resize: args.resize,
            ..FediverseOptions::default()
        };

        let bridge = match (args.fedi, backend.is_fediverse()) {
            (true, false) => Some(BridgeOptions {
                flavor: args.fedi_prefix.into(),
                post_text: args.post.clone(),
                visibility: args.visibility,
                ..BridgeOptions::default()
            }),
            (true, true) => {
                log::warn!("--fedi ignored: {backend} already posts to the fediverse");
                None
            }
            (false, _) => None,
        };

        Ok(Self {
            backend,
            format,
            images: args.images.clone(),
            options: UploadOptions {
                descriptors,
                extract_metadata: !args.no_metadata,
                fediverse,
            },
            bridge,
        })
    }
}

/// Run the uploads in order. Any failure stops the run.
pub async fn publish(
    plan: &UploadPlan,
    credentials: &Credentials,
    output: &CliOutput,
) -> Result<Vec<PublishedSnippet>> {
    if plan.backend.is_fediverse() {
        output.info(&format!(
            "Posting {} image(s) to {}",
            plan.images.len(),
            plan.backend
        ));
        let publisher = imgup_sdk::build(plan.backend, None, &plan.options, credentials)?;
        return Ok(vec![publisher.call().await?]);
    }

    let mut results = Vec::with_capacity(plan.images.len());
    for image in &plan.images {
        output.info(&format!("Uploading {} to {}", image.display(), plan.backend));
        let publisher = imgup_sdk::build(plan.backend, Some(image), &plan.options, credentials)?;
        results.push(publisher.call().await?);
    }
    Ok(results)
}

/// Post finished uploads through the federation bridge, when requested.
pub async fn bridge(
    plan: &UploadPlan,
    results: &[PublishedSnippet],
    credentials: &Credentials,
    output: &CliOutput,
) -> Result<Option<String>> {
    let Some(options) = plan.bridge.clone() else {
        return Ok(None);
    };

    let flavor = options.flavor;
    let bridge = FederationBridge::new(credentials, options)?;
    if !bridge.is_configured() {
        output.warning(&format!(
            "{} is not configured; run `imgup setup {}`",
            flavor.label(),
            flavor.prefix()
        ));
        return Ok(None);
    }

    let posted = bridge.post(results).await?;
    match &posted {
        Some(url) => output.success(&format!("Posted to {}: {url}", flavor.label())),
        None => output.warning("No fediverse post made"),
    }
    Ok(posted)
}

/// Parse args, upload, print snippets, then bridge.
pub async fn run(
    args: &UploadArgs,
    config: &ConfigMap,
    output: &CliOutput,
) -> Result<Vec<PublishedSnippet>> {
    let plan = UploadPlan::from_args(args, config)?;
    let credentials = config::credentials(config);

    let results = publish(&plan, &credentials, output).await?;
    for result in &results {
        output.snippet(result, plan.format);
    }

    bridge(&plan, &results, &credentials, output).await?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use imgup_sdk::{FediverseFlavor, Visibility};
    use std::path::Path;

    fn args(argv: &[&str]) -> UploadArgs {
        let full = ["imgup", "upload"].iter().chain(argv).copied();
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Upload(args) => args,
            other => panic!("expected upload, got {other:?}"),
        }
    }

    fn touch(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, b"img").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_plan_uses_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.jpg");
        let config: ConfigMap = [("default_backend", "flickr"), ("default_format", "html")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let plan = UploadPlan::from_args(&args(&[&a]), &config).unwrap();
        assert_eq!(plan.backend, Backend::Flickr);
        assert_eq!(plan.format, OutputFormat::Html);
        assert!(plan.options.extract_metadata);
        assert!(plan.options.fediverse.images.is_empty());
        assert!(plan.bridge.is_none());

        let plan = UploadPlan::from_args(&args(&["-b", "smugmug", "-f", "org", &a]), &config).unwrap();
        assert_eq!(plan.backend, Backend::SmugMug);
        assert_eq!(plan.format, OutputFormat::Org);
    }

    #[test]
    fn test_plan_descriptors_and_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.jpg");
        let plan = UploadPlan::from_args(
            &args(&[
                "-b", "flickr", "-t", "T", "--tags", " x ,y,,x", "--no-metadata", "--fedi",
                "--fedi-prefix", "mastodon", "--post", "Hello", "--visibility", "unlisted", &a,
            ]),
            &ConfigMap::new(),
        )
        .unwrap();

        assert_eq!(plan.options.descriptors.title.as_deref(), Some("T"));
        assert_eq!(plan.options.descriptors.tags, vec!["x", "y"]);
        assert!(!plan.options.extract_metadata);
        let bridge = plan.bridge.unwrap();
        assert_eq!(bridge.flavor, FediverseFlavor::Mastodon);
        assert_eq!(bridge.post_text.as_deref(), Some("Hello"));
        assert_eq!(bridge.visibility, Visibility::Unlisted);
    }

    #[test]
    fn test_fediverse_plan_collects_images() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.jpg");
        let b = touch(dir.path(), "b.png");
        let plan = UploadPlan::from_args(
            &args(&["-b", "gotosocial", "-a", "First", "--fedi", "--resize", "800x", &a, &b]),
            &ConfigMap::new(),
        )
        .unwrap();

        let images = &plan.options.fediverse.images;
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].description.as_deref(), Some("First"));
        assert_eq!(images[1].description, None);
        assert!(plan.options.fediverse.resize.is_some());
        assert!(plan.bridge.is_none());
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<String> = (0..5)
            .map(|i| touch(dir.path(), &format!("{i}.jpg")))
            .collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();

        let err = UploadPlan::from_args(&args(&refs), &ConfigMap::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImgupError>(),
            Some(ImgupError::TooManyImages { count: 5, max: 4 })
        ));

        let missing = dir.path().join("missing.jpg");
        let err = UploadPlan::from_args(&args(&[missing.to_str().unwrap()]), &ConfigMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("Image not found"));
    }
}
