use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Args;
use log::warn;

use crate::{
    config::MiiConfig,
    file_writer::{file_safe_name, AssetWriter, AvatarAsset},
    frames::{encode_gif, encode_png, split_sheet},
    http::HttpClient,
    mii_api::{
        MiiClient, MiiExpression, MiiIdentifier, MiiIdentifierKind, MiiPose, MiiShading,
        RenderSpec,
    },
    options::Global,
    pipeline::{self, AvatarPipeline},
};

/// Frames in a spinning animation sheet.
pub const ANIMATION_FRAMES: u32 = 16;

#[derive(Debug, Args)]
pub struct MiiOptions {
    /// A Mii Studio code, Nintendo Network ID or Nintendo Account Mii ID.
    pub identifier: String,

    /// What kind of identifier was given. Guessed from its shape if not
    /// specified.
    #[clap(long, value_enum)]
    pub kind: Option<MiiIdentifierKind>,

    /// The name to use for the output folder and file names. Defaults to the
    /// identifier. Characters other than letters, digits, '_' and '-' are
    /// replaced with '-'.
    #[clap(long)]
    pub name: Option<String>,

    /// A pose to render. Can be specified multiple times. Defaults to 'face'.
    #[clap(long = "pose", value_enum)]
    pub poses: Vec<MiiPose>,

    /// An expression to render. Can be specified multiple times. Defaults to
    /// 'normal'.
    #[clap(long = "expression", value_enum)]
    pub expressions: Vec<MiiExpression>,

    /// Don't save the still portrait.
    #[clap(long)]
    pub skip_still: bool,

    /// Save a spinning GIF of each render.
    #[clap(long)]
    pub gif: bool,

    /// Save every frame of the spinning animation as its own image.
    #[clap(long)]
    pub frames: bool,

    /// Also save high quality shaded renders from the Mii renderer. Needs a
    /// Mii Studio code or Nintendo Network ID.
    #[clap(long)]
    pub hd: bool,

    /// A shading to use for high quality renders. Can be specified multiple
    /// times. Defaults to every shading. Ignored unless --hd is given or
    /// enabled in the config.
    #[clap(long = "shading", value_enum)]
    pub shadings: Vec<MiiShading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiiAssets {
    pub still: bool,
    pub gif: bool,
    pub frames: bool,
}

impl MiiAssets {
    fn needs_sheet(&self) -> bool {
        self.gif || self.frames
    }

    /// Files written for one render.
    fn files_per_render(&self) -> usize {
        let mut files = 0;
        if self.still {
            files += 1;
        }
        if self.gif {
            files += 1;
        }
        if self.frames {
            files += ANIMATION_FRAMES as usize;
        }
        files
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiiRequest {
    pub identifier: String,
    pub kind: Option<MiiIdentifierKind>,
    pub name: Option<String>,
    pub poses: Vec<MiiPose>,
    pub expressions: Vec<MiiExpression>,
    pub assets: MiiAssets,
    /// Shadings for high quality renders; empty when those are off.
    pub shadings: Vec<MiiShading>,
}

impl MiiOptions {
    /// Merges the command line with the defaults from the config file.
    pub fn into_request(self, config: &MiiConfig) -> MiiRequest {
        let mut poses = self.poses;
        if poses.is_empty() {
            poses.push(MiiPose::Face);
        }
        poses.sort();
        poses.dedup();

        let mut expressions = self.expressions;
        if expressions.is_empty() {
            expressions.push(MiiExpression::Normal);
        }
        expressions.sort();
        expressions.dedup();

        let shadings = if self.hd || config.hd {
            let mut shadings = self.shadings;
            if shadings.is_empty() {
                shadings.extend(MiiShading::ALL);
            }
            shadings.sort();
            shadings.dedup();
            shadings
        } else {
            Vec::new()
        };

        MiiRequest {
            identifier: self.identifier,
            kind: self.kind,
            name: self.name,
            poses,
            expressions,
            assets: MiiAssets {
                still: !self.skip_still,
                gif: self.gif || config.gif,
                frames: self.frames || config.frames,
            },
            shadings,
        }
    }
}

pub struct MiiDownload {
    client: MiiClient,
    request: MiiRequest,
}

impl MiiDownload {
    pub fn new(client: MiiClient, request: MiiRequest) -> Self {
        Self { client, request }
    }

    fn shadings_for(&self, identifier: &MiiIdentifier) -> Vec<Option<MiiShading>> {
        let mut variants = vec![None];

        if !self.request.shadings.is_empty() {
            if identifier.supports_shading() {
                variants.extend(self.request.shadings.iter().copied().map(Some));
            } else {
                warn!(
                    "Skipping high quality renders: they need a Mii Studio code or Nintendo Network ID, not a Nintendo Account Mii ID"
                );
            }
        }

        variants
    }

    async fn fetch_render(
        &self,
        identifier: &MiiIdentifier,
        name: &str,
        spec: RenderSpec,
        writer: &mut AssetWriter,
    ) -> Result<()> {
        let assets = self.request.assets;
        let stem = file_stem(name, &spec);

        if assets.still {
            let still = self.client.render(identifier, &spec).await?;
            writer.write(AvatarAsset::new(
                format!("{}/{}.png", name, stem),
                still,
            ))?;
        }

        if assets.needs_sheet() {
            let sheet_spec = RenderSpec {
                instances: ANIMATION_FRAMES,
                ..spec
            };
            let sheet = self.client.render(identifier, &sheet_spec).await?;
            let frames = split_sheet(&sheet, ANIMATION_FRAMES)?;

            if assets.frames {
                for (index, frame) in frames.iter().enumerate() {
                    writer.write(AvatarAsset::new(
                        format!("{}/frames/{}_{:02}.png", name, stem, index + 1),
                        encode_png(frame)?,
                    ))?;
                }
            }

            if assets.gif {
                writer.write(AvatarAsset::new(
                    format!("{}/{}.gif", name, stem),
                    encode_gif(&frames)?,
                ))?;
            }
        }

        Ok(())
    }
}

/// `Mii_Alex_face-only_smile-open-mouth_switch`
fn file_stem(name: &str, spec: &RenderSpec) -> String {
    let mut stem = format!(
        "Mii_{}_{}_{}",
        name,
        spec.pose.api_name().replace('_', "-"),
        spec.expression.api_name().replace('_', "-")
    );

    if let Some(shading) = spec.shading {
        stem.push('_');
        stem.push_str(shading.api_name());
    }

    stem
}

#[async_trait]
impl AvatarPipeline for MiiDownload {
    type Reference = MiiIdentifier;

    async fn resolve(&self) -> Result<MiiIdentifier> {
        Ok(MiiIdentifier::parse(
            &self.request.identifier,
            self.request.kind,
        )?)
    }

    async fn fetch(&self, identifier: &MiiIdentifier, writer: &mut AssetWriter) -> Result<()> {
        let name = match &self.request.name {
            Some(name) => file_safe_name(name.trim()),
            None => identifier.file_name(),
        };
        if name.is_empty() {
            bail!("The Mii name used for file names cannot be empty");
        }

        let shadings = self.shadings_for(identifier);
        writer.plan(
            self.request.poses.len()
                * self.request.expressions.len()
                * shadings.len()
                * self.request.assets.files_per_render(),
        );

        for &pose in &self.request.poses {
            for &expression in &self.request.expressions {
                for &shading in &shadings {
                    let spec = RenderSpec {
                        pose,
                        expression,
                        shading,
                        instances: 1,
                    };
                    self.fetch_render(identifier, &name, spec, writer).await?;
                }
            }
        }

        Ok(())
    }
}

pub async fn mii(global: Global, options: MiiOptions) -> Result<()> {
    let config = super::load_config(&global)?.mii;
    let request = options.into_request(&config);

    let assets = request.assets;
    if !(assets.still || assets.needs_sheet()) {
        bail!("Nothing to download: --skip-still was given without --gif or --frames");
    }

    let mut writer = super::asset_writer(&global, &config.output_dir)?;
    let client = MiiClient::new(HttpClient::new()?, config.endpoints.clone());
    let download = MiiDownload::new(client, request);

    pipeline::run(&download, &mut writer).await?;

    Ok(())
}
