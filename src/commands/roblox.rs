use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use log::info;

use crate::{
    config::RobloxConfig,
    file_writer::{AssetWriter, AvatarAsset},
    http::HttpClient,
    options::Global,
    pipeline::{self, AvatarPipeline},
    roblox_api::{
        asset_type_from_image_url, RobloxClient, RobloxIdentifier, RobloxPose, RobloxUser,
    },
};

#[derive(Debug, Args)]
pub struct RobloxOptions {
    /// The Roblox user ID to download. Usernames are accepted as well.
    pub identifier: String,

    /// An avatar render to download. Can be specified multiple times.
    /// Defaults to 'avatar'.
    #[clap(long = "pose", value_enum)]
    pub poses: Vec<RobloxPose>,

    /// Also download an image of every item the user is currently wearing.
    #[clap(long)]
    pub pieces: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobloxRequest {
    pub identifier: String,
    pub poses: Vec<RobloxPose>,
    pub pieces: bool,
}

impl RobloxOptions {
    pub fn into_request(self, config: &RobloxConfig) -> RobloxRequest {
        let mut poses = self.poses;
        if poses.is_empty() {
            poses.push(RobloxPose::Avatar);
        }
        poses.sort();
        poses.dedup();

        RobloxRequest {
            identifier: self.identifier,
            poses,
            pieces: self.pieces || config.pieces,
        }
    }
}

pub struct RobloxDownload {
    client: RobloxClient,
    request: RobloxRequest,
}

impl RobloxDownload {
    pub fn new(client: RobloxClient, request: RobloxRequest) -> Self {
        Self { client, request }
    }

    async fn fetch_outfit(&self, user: &RobloxUser, writer: &mut AssetWriter) -> Result<()> {
        let asset_ids = self.client.currently_wearing(user.id).await?;
        if asset_ids.is_empty() {
            info!("{} is not wearing any items", user);
            return Ok(());
        }

        writer.plan(asset_ids.len());
        for asset_id in asset_ids {
            let image_url = self.client.asset_image_url(asset_id).await?;
            let image = self.client.download_image(&image_url).await?;
            let asset_type = asset_type_from_image_url(&image_url);

            writer.write(AvatarAsset::new(
                format!("outfits/roblox_outfit_{}_{}.png", asset_type, asset_id),
                image,
            ))?;
        }

        Ok(())
    }
}

#[async_trait]
impl AvatarPipeline for RobloxDownload {
    type Reference = RobloxUser;

    async fn resolve(&self) -> Result<RobloxUser> {
        let identifier = RobloxIdentifier::parse(&self.request.identifier)?;
        Ok(self.client.resolve_user(&identifier).await?)
    }

    async fn fetch(&self, user: &RobloxUser, writer: &mut AssetWriter) -> Result<()> {
        writer.plan(self.request.poses.len());
        for &pose in &self.request.poses {
            let image_url = self.client.avatar_image_url(user.id, pose).await?;
            let image = self.client.download_image(&image_url).await?;

            writer.write(AvatarAsset::new(
                format!("roblox_{}_{}.png", user.id, pose.api_name()),
                image,
            ))?;
        }

        if self.request.pieces {
            self.fetch_outfit(user, writer).await?;
        }

        Ok(())
    }
}

pub async fn roblox(global: Global, options: RobloxOptions) -> Result<()> {
    let config = super::load_config(&global)?.roblox;
    let request = options.into_request(&config);

    let mut writer = super::asset_writer(&global, &config.output_dir)?;
    let client = RobloxClient::new(
        HttpClient::new()?,
        config.endpoints.clone(),
        config.polling(),
    );
    let download = RobloxDownload::new(client, request);

    pipeline::run(&download, &mut writer).await?;

    Ok(())
}
