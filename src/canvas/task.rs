//! Task requests sent to Nova Canvas.
//!
//! [`TaskRequest`] is a closed union with one variant per task kind, so the
//! fields each kind sends are fixed by the type rather than by convention.
//! Serialization produces the provider's wire shape:
//!
//! ```json
//! {"taskType": "TEXT_IMAGE",
//!  "textToImageParams": {"text": "..."},
//!  "imageGenerationConfig": {"numberOfImages": 1, "height": 1024, "width": 1024, "cfgScale": 8.0}}
//! ```

use std::fmt;

use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;

/// Generation operation performed by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Generate from a text prompt
    TextImage,
    /// Replace a prompted region of an image
    Inpainting,
    /// Extend or replace the area around a masked region
    Outpainting,
    /// Produce variations of one or more images
    ImageVariation,
    /// Generate guided by the layout of a condition image
    ImageConditioning,
    /// Generate constrained to a color palette
    ColorGuidedGeneration,
    /// Remove the background of an image
    BackgroundRemoval,
}

impl TaskKind {
    /// Provider name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextImage => "TEXT_IMAGE",
            Self::Inpainting => "INPAINTING",
            Self::Outpainting => "OUTPAINTING",
            Self::ImageVariation => "IMAGE_VARIATION",
            Self::ImageConditioning => "IMAGE_CONDITIONING",
            Self::ColorGuidedGeneration => "COLOR_GUIDED_GENERATION",
            Self::BackgroundRemoval => "BACKGROUND_REMOVAL",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How outpainting treats the masked region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutpaintingMode {
    /// Soft transition at the mask boundary
    #[default]
    Default,
    /// Keep the masked region pixel exact
    Precise,
}

/// Layout signal extracted from a condition image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMode {
    /// Edge map
    #[default]
    CannyEdge,
    /// Segmentation map
    Segmentation,
}

/// Output settings shared by every pixel-producing kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationConfig {
    /// Images the provider should generate
    pub number_of_images: u32,
    /// Output height in pixels
    pub height: u32,
    /// Output width in pixels
    pub width: u32,
    /// Prompt adherence
    pub cfg_scale: f64,
    /// Generation seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ImageGenerationConfig {
    /// One image without an explicit seed.
    pub fn single(width: u32, height: u32, cfg_scale: f64) -> Self {
        Self {
            number_of_images: 1,
            height,
            width,
            cfg_scale,
            seed: None,
        }
    }
}

// The provider rejects an empty negativeText, so empty strings are omitted.
fn is_blank(text: &str) -> bool {
    text.is_empty()
}

/// `textToImageParams`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextImageParams {
    /// Prompt
    pub text: String,
    /// Things to keep out of the image
    #[serde(skip_serializing_if = "is_blank")]
    pub negative_text: String,
}

/// `inPaintingParams`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InpaintingParams {
    /// Prompt for the replaced region
    pub text: String,
    /// Things to keep out of the image
    #[serde(skip_serializing_if = "is_blank")]
    pub negative_text: String,
    /// Base64 source image
    pub image: String,
    /// Natural-language description of the region to replace
    pub mask_prompt: String,
}

/// `outPaintingParams`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutpaintingParams {
    /// Prompt for the generated area
    pub text: String,
    /// Things to keep out of the image
    #[serde(skip_serializing_if = "is_blank")]
    pub negative_text: String,
    /// Base64 source image
    pub image: String,
    /// Base64 mask image
    pub mask_image: String,
    /// Mask boundary treatment
    pub out_painting_mode: OutpaintingMode,
}

/// `imageVariationParams`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVariationParams {
    /// Optional guiding prompt
    #[serde(skip_serializing_if = "is_blank")]
    pub text: String,
    /// Things to keep out of the image
    #[serde(skip_serializing_if = "is_blank")]
    pub negative_text: String,
    /// Base64 source images
    pub images: Vec<String>,
    /// How closely the output follows the sources
    pub similarity_strength: f64,
}

/// Conditioning parameters, sent inside `textToImageParams`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditioningParams {
    /// Prompt
    pub text: String,
    /// Things to keep out of the image
    #[serde(skip_serializing_if = "is_blank")]
    pub negative_text: String,
    /// Base64 condition image
    pub condition_image: String,
    /// Layout signal to extract
    pub control_mode: ControlMode,
}

/// `colorGuidedGenerationParams`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorGuidedParams {
    /// Prompt
    pub text: String,
    /// Things to keep out of the image
    #[serde(skip_serializing_if = "is_blank")]
    pub negative_text: String,
    /// Palette as `#rrggbb` strings
    pub colors: Vec<String>,
    /// Base64 reference image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
}

/// `backgroundRemovalParams`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRemovalParams {
    /// Base64 source image
    pub image: String,
}

/// A fully assembled request for one task kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    /// Text to image
    TextImage {
        /// Kind parameters
        params: TextImageParams,
        /// Output settings
        config: ImageGenerationConfig,
    },
    /// Inpainting
    Inpainting {
        /// Kind parameters
        params: InpaintingParams,
        /// Output settings
        config: ImageGenerationConfig,
    },
    /// Outpainting
    Outpainting {
        /// Kind parameters
        params: OutpaintingParams,
        /// Output settings
        config: ImageGenerationConfig,
    },
    /// Image variation
    ImageVariation {
        /// Kind parameters
        params: ImageVariationParams,
        /// Output settings
        config: ImageGenerationConfig,
    },
    /// Image conditioning
    ImageConditioning {
        /// Kind parameters
        params: ConditioningParams,
        /// Output settings
        config: ImageGenerationConfig,
    },
    /// Color guided generation
    ColorGuidedGeneration {
        /// Kind parameters
        params: ColorGuidedParams,
        /// Output settings
        config: ImageGenerationConfig,
    },
    /// Background removal; the provider takes no output settings for it
    BackgroundRemoval {
        /// Kind parameters
        params: BackgroundRemovalParams,
    },
}

impl TaskRequest {
    /// Kind of this request.
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::TextImage { .. } => TaskKind::TextImage,
            Self::Inpainting { .. } => TaskKind::Inpainting,
            Self::Outpainting { .. } => TaskKind::Outpainting,
            Self::ImageVariation { .. } => TaskKind::ImageVariation,
            Self::ImageConditioning { .. } => TaskKind::ImageConditioning,
            Self::ColorGuidedGeneration { .. } => TaskKind::ColorGuidedGeneration,
            Self::BackgroundRemoval { .. } => TaskKind::BackgroundRemoval,
        }
    }

    /// `taskType` value on the wire.
    ///
    /// Nova Canvas has no conditioning task type; conditioning is a
    /// text-to-image request carrying a condition image.
    pub fn wire_task_type(&self) -> &'static str {
        match self.kind() {
            TaskKind::ImageConditioning => TaskKind::TextImage.as_str(),
            kind => kind.as_str(),
        }
    }

    /// Output settings, if the kind has any.
    pub fn generation_config(&self) -> Option<&ImageGenerationConfig> {
        match self {
            Self::TextImage { config, .. }
            | Self::Inpainting { config, .. }
            | Self::Outpainting { config, .. }
            | Self::ImageVariation { config, .. }
            | Self::ImageConditioning { config, .. }
            | Self::ColorGuidedGeneration { config, .. } => Some(config),
            Self::BackgroundRemoval { .. } => None,
        }
    }

    /// Serialize to the JSON request body.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for TaskRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("taskType", self.wire_task_type())?;

        match self {
            Self::TextImage { params, .. } => map.serialize_entry("textToImageParams", params)?,
            Self::Inpainting { params, .. } => map.serialize_entry("inPaintingParams", params)?,
            Self::Outpainting { params, .. } => map.serialize_entry("outPaintingParams", params)?,
            Self::ImageVariation { params, .. } => {
                map.serialize_entry("imageVariationParams", params)?
            },
            Self::ImageConditioning { params, .. } => {
                map.serialize_entry("textToImageParams", params)?
            },
            Self::ColorGuidedGeneration { params, .. } => {
                map.serialize_entry("colorGuidedGenerationParams", params)?
            },
            Self::BackgroundRemoval { params } => {
                map.serialize_entry("backgroundRemovalParams", params)?
            },
        }

        if let Some(config) = self.generation_config() {
            map.serialize_entry("imageGenerationConfig", config)?;
        }

        map.end()
    }
}
