use std::{collections::BTreeSet, fmt, time::Duration};

use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::{HttpClient, HttpError};

#[derive(Debug, Error)]
pub enum RobloxApiError {
    #[error("Roblox user {identifier} does not exist or is banned")]
    UnknownUser { identifier: String },

    #[error("Roblox user ID cannot be empty")]
    EmptyIdentifier,

    #[error("Roblox thumbnail API returned no entry for {target}")]
    MissingThumbnail { target: String },

    #[error("Roblox thumbnail for {target} is in state {state:?}")]
    ThumbnailFailed {
        target: String,
        state: ThumbnailState,
    },

    #[error("Roblox thumbnail for {target} was still pending after {attempts} attempts")]
    ThumbnailNotReady { target: String, attempts: u32 },

    #[error("Roblox API HTTP error")]
    Http(#[from] HttpError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobloxIdentifier {
    UserId(u64),
    Username(String),
}

impl RobloxIdentifier {
    /// All-digit input is a user ID, anything else is a username.
    pub fn parse(value: &str) -> Result<Self, RobloxApiError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RobloxApiError::EmptyIdentifier);
        }

        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Ok(RobloxIdentifier::Username(value.to_owned()));
        }

        // No Roblox account has an ID past u64.
        value
            .parse()
            .map(RobloxIdentifier::UserId)
            .map_err(|_| RobloxApiError::UnknownUser {
                identifier: value.to_owned(),
            })
    }
}

impl fmt::Display for RobloxIdentifier {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RobloxIdentifier::UserId(id) => write!(formatter, "{}", id),
            RobloxIdentifier::Username(name) => write!(formatter, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobloxUser {
    pub id: u64,
    pub name: String,
    pub display_name: String,
}

impl fmt::Display for RobloxUser {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "Roblox user {} ({}, ID {})",
            self.display_name, self.name, self.id
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdLookup {
    user_ids: [u64; 1],
    exclude_banned_users: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsernameLookup<'a> {
    usernames: [&'a str; 1],
    exclude_banned_users: bool,
}

#[derive(Debug, Deserialize)]
struct UserLookupResponse {
    data: Vec<RobloxUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentlyWearingResponse {
    asset_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ThumbnailState {
    Completed,
    Pending,
    Error,
    Blocked,
    InReview,
    TemporarilyUnavailable,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailEntry {
    state: ThumbnailState,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailResponse {
    data: Vec<ThumbnailEntry>,
}

/// Avatar renders offered by the thumbnail API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum RobloxPose {
    Avatar,
    AvatarHeadshot,
    AvatarBust,
}

impl RobloxPose {
    pub fn api_name(self) -> &'static str {
        match self {
            RobloxPose::Avatar => "avatar",
            RobloxPose::AvatarHeadshot => "avatar-headshot",
            RobloxPose::AvatarBust => "avatar-bust",
        }
    }

    /// Largest size the endpoint serves for this pose.
    pub fn size(self) -> &'static str {
        match self {
            RobloxPose::Avatar | RobloxPose::AvatarHeadshot => "720x720",
            RobloxPose::AvatarBust => "420x420",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RobloxEndpoints {
    pub users: String,
    pub thumbnails: String,
    pub avatar: String,
}

impl Default for RobloxEndpoints {
    fn default() -> Self {
        Self {
            users: "https://users.roblox.com".to_owned(),
            thumbnails: "https://thumbnails.roblox.com".to_owned(),
            avatar: "https://avatar.roblox.com".to_owned(),
        }
    }
}

#[cfg(test)]
impl RobloxEndpoints {
    pub fn all(base: &str) -> Self {
        Self {
            users: base.to_owned(),
            thumbnails: base.to_owned(),
            avatar: base.to_owned(),
        }
    }
}

/// How long to wait on thumbnails Roblox hasn't finished rendering yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailPolling {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ThumbnailPolling {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RobloxClient {
    http: HttpClient,
    endpoints: RobloxEndpoints,
    polling: ThumbnailPolling,
}

impl RobloxClient {
    pub fn new(http: HttpClient, endpoints: RobloxEndpoints, polling: ThumbnailPolling) -> Self {
        Self {
            http,
            endpoints,
            polling,
        }
    }

    pub async fn resolve_user(
        &self,
        identifier: &RobloxIdentifier,
    ) -> Result<RobloxUser, RobloxApiError> {
        let response: Result<UserLookupResponse, HttpError> = match identifier {
            RobloxIdentifier::UserId(id) => {
                let url = format!("{}/v1/users", self.endpoints.users);
                let lookup = UserIdLookup {
                    user_ids: [*id],
                    exclude_banned_users: true,
                };
                self.http.post_json(&url, &lookup).await
            }
            RobloxIdentifier::Username(name) => {
                let url = format!("{}/v1/usernames/users", self.endpoints.users);
                let lookup = UsernameLookup {
                    usernames: [name.as_str()],
                    exclude_banned_users: true,
                };
                self.http.post_json(&url, &lookup).await
            }
        };

        let unknown = || RobloxApiError::UnknownUser {
            identifier: identifier.to_string(),
        };

        match response {
            Ok(response) => response.data.into_iter().next().ok_or_else(unknown),
            Err(err) if err.is_not_found() => Err(unknown()),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the IDs of every asset the user currently wears, sorted and
    /// without duplicates.
    pub async fn currently_wearing(&self, user_id: u64) -> Result<Vec<u64>, RobloxApiError> {
        let url = format!(
            "{}/v1/users/{}/currently-wearing",
            self.endpoints.avatar, user_id
        );
        let response: CurrentlyWearingResponse = self.http.get_json(&url).await?;

        let unique: BTreeSet<u64> = response.asset_ids.into_iter().collect();
        Ok(unique.into_iter().collect())
    }

    pub async fn avatar_image_url(
        &self,
        user_id: u64,
        pose: RobloxPose,
    ) -> Result<String, RobloxApiError> {
        let url = format!(
            "{}/v1/users/{}?userIds={}&size={}&format=png",
            self.endpoints.thumbnails,
            pose.api_name(),
            user_id,
            pose.size()
        );

        self.thumbnail_url(&url, &format!("{} of user {}", pose.api_name(), user_id))
            .await
    }

    pub async fn asset_image_url(&self, asset_id: u64) -> Result<String, RobloxApiError> {
        let url = format!(
            "{}/v1/assets?assetIds={}&size=700x700&format=png",
            self.endpoints.thumbnails, asset_id
        );

        self.thumbnail_url(&url, &format!("asset {}", asset_id)).await
    }

    pub async fn download_image(&self, image_url: &str) -> Result<Vec<u8>, RobloxApiError> {
        Ok(self.http.get_image(image_url).await?)
    }

    /// Asks the thumbnail API for an image URL, polling while Roblox is still
    /// rendering it.
    async fn thumbnail_url(&self, api_url: &str, target: &str) -> Result<String, RobloxApiError> {
        let attempts = self.polling.attempts.max(1);

        for attempt in 1..=attempts {
            let response: ThumbnailResponse = self.http.get_json(api_url).await?;

            let Some(entry) = response.data.into_iter().next() else {
                return Err(RobloxApiError::MissingThumbnail {
                    target: target.to_owned(),
                });
            };

            match (entry.state, entry.image_url) {
                (ThumbnailState::Completed, Some(image_url)) => return Ok(image_url),
                (ThumbnailState::Completed, None) => {
                    return Err(RobloxApiError::MissingThumbnail {
                        target: target.to_owned(),
                    })
                }
                (ThumbnailState::Pending, _) => {
                    warn!(
                        "Thumbnail for {} is still being generated ({}/{})",
                        target, attempt, attempts
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.polling.interval).await;
                    }
                }
                (state, _) => {
                    return Err(RobloxApiError::ThumbnailFailed {
                        target: target.to_owned(),
                        state,
                    })
                }
            }
        }

        Err(RobloxApiError::ThumbnailNotReady {
            target: target.to_owned(),
            attempts,
        })
    }
}

/// Outfit images are served from URLs like
/// `https://tr.rbxcdn.com/<hash>/700/700/Hat/Png/noFilter`; the third segment
/// from the end names the kind of asset.
pub fn asset_type_from_image_url(image_url: &str) -> &str {
    let path = image_url.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();

    match segments.len() {
        len if len >= 6 => match segments[len - 3] {
            "" => "asset",
            asset_type => asset_type,
        },
        _ => "asset",
    }
}

#[cfg(test)]
mod tests;
