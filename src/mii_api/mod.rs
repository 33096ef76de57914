//! Renders of Nintendo Miis, served by Nintendo's own image endpoints and by
//! the third-party Mii renderer for higher quality shaded renders.

use std::fmt;

use clap::ValueEnum;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    file_writer::file_safe_name,
    http::{HttpClient, HttpError},
};

/// Widest image the renderer will produce.
const MAX_RENDER_WIDTH: u32 = 16384;
const HD_WIDTH: u32 = 1200;
const STANDARD_WIDTH: u32 = 512;

#[derive(Debug, Error)]
pub enum MiiApiError {
    #[error("Mii {identifier} is unknown to {host}")]
    UnknownMii {
        identifier: String,
        host: String,
        source: HttpError,
    },

    #[error("Shaded renders need a Mii Studio code or Nintendo Network ID, but {0} is a Nintendo Account Mii ID")]
    ShadingUnavailable(String),

    #[error("Mii identifier cannot be empty")]
    EmptyIdentifier,

    #[error("Invalid render URL {url}")]
    BadUrl {
        url: String,
        source: url::ParseError,
    },

    #[error(transparent)]
    Http(#[from] HttpError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MiiIdentifierKind {
    /// A Nintendo Account Mii ID, like `9dfb1b542d57e1e0/6636...`.
    AccountId,
    /// Hex encoded Mii data as used by Mii Studio.
    StudioCode,
    /// A Nintendo Network ID username.
    Nnid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiiIdentifier {
    AccountId(String),
    StudioCode(String),
    NetworkId(String),
}

impl MiiIdentifier {
    /// Classifies an identifier by its shape unless `kind` says otherwise.
    pub fn parse(value: &str, kind: Option<MiiIdentifierKind>) -> Result<Self, MiiApiError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(MiiApiError::EmptyIdentifier);
        }

        let kind = kind.unwrap_or_else(|| detect_kind(value));
        let value = value.to_owned();

        Ok(match kind {
            MiiIdentifierKind::AccountId => MiiIdentifier::AccountId(value),
            MiiIdentifierKind::StudioCode => MiiIdentifier::StudioCode(value),
            MiiIdentifierKind::Nnid => MiiIdentifier::NetworkId(value),
        })
    }

    pub fn value(&self) -> &str {
        match self {
            MiiIdentifier::AccountId(value)
            | MiiIdentifier::StudioCode(value)
            | MiiIdentifier::NetworkId(value) => value,
        }
    }

    pub fn supports_shading(&self) -> bool {
        !matches!(self, MiiIdentifier::AccountId(_))
    }

    /// A name safe to use in file and directory names.
    pub fn file_name(&self) -> String {
        file_safe_name(self.value())
    }
}

impl fmt::Display for MiiIdentifier {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MiiIdentifier::AccountId(id) => write!(formatter, "Nintendo Account Mii {}", id),
            MiiIdentifier::StudioCode(code) => write!(formatter, "Mii Studio code {}", code),
            MiiIdentifier::NetworkId(nnid) => write!(formatter, "Nintendo Network ID {}", nnid),
        }
    }
}

fn is_hex(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_hexdigit())
}

fn detect_kind(value: &str) -> MiiIdentifierKind {
    if let Some((user, mii)) = value.split_once('/') {
        if user.len() == 16 && mii.len() == 40 && is_hex(user) && is_hex(mii) {
            return MiiIdentifierKind::AccountId;
        }
    }

    if value.len() >= 40 && value.len() % 2 == 0 && is_hex(value) {
        return MiiIdentifierKind::StudioCode;
    }

    MiiIdentifierKind::Nnid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum MiiPose {
    Face,
    FaceOnly,
    AllBody,
}

impl MiiPose {
    pub fn api_name(self) -> &'static str {
        match self {
            MiiPose::Face => "face",
            MiiPose::FaceOnly => "face_only",
            MiiPose::AllBody => "all_body",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum MiiExpression {
    Normal,
    Smile,
    Anger,
    Sorrow,
    Surprise,
    Blink,
    NormalOpenMouth,
    SmileOpenMouth,
    AngerOpenMouth,
    SorrowOpenMouth,
    SurpriseOpenMouth,
    BlinkOpenMouth,
    WinkLeft,
    WinkRight,
    WinkLeftOpenMouth,
    WinkRightOpenMouth,
    LikeWinkLeft,
    LikeWinkRight,
    Frustrated,
}

impl MiiExpression {
    pub fn api_name(self) -> &'static str {
        match self {
            MiiExpression::Normal => "normal",
            MiiExpression::Smile => "smile",
            MiiExpression::Anger => "anger",
            MiiExpression::Sorrow => "sorrow",
            MiiExpression::Surprise => "surprise",
            MiiExpression::Blink => "blink",
            MiiExpression::NormalOpenMouth => "normal_open_mouth",
            MiiExpression::SmileOpenMouth => "smile_open_mouth",
            MiiExpression::AngerOpenMouth => "anger_open_mouth",
            MiiExpression::SorrowOpenMouth => "sorrow_open_mouth",
            MiiExpression::SurpriseOpenMouth => "surprise_open_mouth",
            MiiExpression::BlinkOpenMouth => "blink_open_mouth",
            MiiExpression::WinkLeft => "wink_left",
            MiiExpression::WinkRight => "wink_right",
            MiiExpression::WinkLeftOpenMouth => "wink_left_open_mouth",
            MiiExpression::WinkRightOpenMouth => "wink_right_open_mouth",
            MiiExpression::LikeWinkLeft => "like_wink_left",
            MiiExpression::LikeWinkRight => "like_wink_right",
            MiiExpression::Frustrated => "frustrated",
        }
    }
}

/// Shader used by the Mii renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum MiiShading {
    Miitomo,
    Switch,
    Wiiu,
}

impl MiiShading {
    pub const ALL: [MiiShading; 3] = [MiiShading::Miitomo, MiiShading::Switch, MiiShading::Wiiu];

    pub fn api_name(self) -> &'static str {
        match self {
            MiiShading::Miitomo => "miitomo",
            MiiShading::Switch => "switch",
            MiiShading::Wiiu => "wiiu",
        }
    }
}

/// What to render: a single pose and expression, optionally shaded, as one
/// image or as a sheet of `instances` rotation frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSpec {
    pub pose: MiiPose,
    pub expression: MiiExpression,
    pub shading: Option<MiiShading>,
    pub instances: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MiiEndpoints {
    pub nintendo_account: String,
    pub mii_studio: String,
    pub renderer: String,
}

impl Default for MiiEndpoints {
    fn default() -> Self {
        Self {
            nintendo_account: "https://cdn-mii.accounts.nintendo.com".to_owned(),
            mii_studio: "https://studio.mii.nintendo.com".to_owned(),
            renderer: "https://mii-unsecure.ariankordi.net".to_owned(),
        }
    }
}

#[cfg(test)]
impl MiiEndpoints {
    /// Points every endpoint at the same host.
    pub fn all(base: &str) -> Self {
        Self {
            nintendo_account: base.to_owned(),
            mii_studio: base.to_owned(),
            renderer: base.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MiiClient {
    http: HttpClient,
    endpoints: MiiEndpoints,
}

impl MiiClient {
    pub fn new(http: HttpClient, endpoints: MiiEndpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn render_url(
        &self,
        identifier: &MiiIdentifier,
        spec: &RenderSpec,
    ) -> Result<Url, MiiApiError> {
        let mut params: Vec<(&str, String)> = Vec::new();

        let base = match (spec.shading, identifier) {
            (Some(_), MiiIdentifier::AccountId(id)) => {
                return Err(MiiApiError::ShadingUnavailable(id.clone()));
            }
            (Some(shading), identifier) => {
                let width = HD_WIDTH.min((MAX_RENDER_WIDTH - 1) / spec.instances.max(1));
                match identifier {
                    MiiIdentifier::NetworkId(nnid) => params.push(("nnid", nnid.clone())),
                    other => params.push(("data", other.value().to_owned())),
                }
                params.push(("shaderType", shading.api_name().to_owned()));
                params.push(("resourceType", "very_high".to_owned()));
                params.push(("width", width.to_string()));
                format!("{}/miis/image.png", self.endpoints.renderer)
            }
            (None, MiiIdentifier::AccountId(id)) => {
                params.push(("width", STANDARD_WIDTH.to_string()));
                format!(
                    "{}/2.0.0/mii_images/{}.png",
                    self.endpoints.nintendo_account, id
                )
            }
            (None, MiiIdentifier::StudioCode(code)) => {
                params.push(("data", code.clone()));
                params.push(("width", STANDARD_WIDTH.to_string()));
                format!("{}/miis/image.png", self.endpoints.mii_studio)
            }
            (None, MiiIdentifier::NetworkId(nnid)) => {
                params.push(("nnid", nnid.clone()));
                params.push(("width", STANDARD_WIDTH.to_string()));
                format!("{}/miis/image.png", self.endpoints.renderer)
            }
        };

        params.push(("type", spec.pose.api_name().to_owned()));
        params.push(("expression", spec.expression.api_name().to_owned()));
        params.push(("bgColor", "00000000".to_owned()));
        if spec.instances > 1 {
            params.push(("instanceCount", spec.instances.to_string()));
        }

        Url::parse_with_params(&base, &params).map_err(|source| MiiApiError::BadUrl {
            url: base,
            source,
        })
    }

    /// Downloads one render. Client errors from the render endpoints mean
    /// the Mii couldn't be found.
    pub async fn render(
        &self,
        identifier: &MiiIdentifier,
        spec: &RenderSpec,
    ) -> Result<Vec<u8>, MiiApiError> {
        let url = self.render_url(identifier, spec)?;

        match self.http.get_image(url.as_str()).await {
            Ok(image) => Ok(image),
            Err(source) if source.is_not_found() => Err(MiiApiError::UnknownMii {
                identifier: identifier.value().to_owned(),
                host: url.host_str().unwrap_or_default().to_owned(),
                source,
            }),
            Err(err) => Err(err.into()),
        }
    }
}
