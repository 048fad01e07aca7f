//! The seven Nova Canvas tools.
//!
//! Each tool is a parameter struct: serde supplies the defaults, garde the
//! range rules, schemars the input schema. [`CanvasTool::into_request`] reads
//! the referenced images and builds the matching [`TaskRequest`] variant.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use garde::Validate;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::dispatch::{encode_image, encode_images, Canvas, CanvasTool};
use super::task::{
    BackgroundRemovalParams, ColorGuidedParams, ConditioningParams, ControlMode,
    ImageGenerationConfig, ImageVariationParams, InpaintingParams, OutpaintingMode,
    OutpaintingParams, TaskRequest, TextImageParams,
};
use crate::error::Result;
use crate::server::typed_tool::{ToolFuture, TypedTool};
use crate::server::ServerCoreBuilder;
use crate::types::ToolAnnotations;

fn default_large() -> u32 {
    1024
}

fn default_small() -> u32 {
    512
}

fn default_cfg_scale() -> f64 {
    8.0
}

fn default_num_images() -> u32 {
    1
}

fn default_similarity() -> f64 {
    0.7
}

fn default_true() -> bool {
    true
}

/// Parameters for `text_to_image`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct TextToImage {
    /// Text describing the image to generate (1-1024 characters)
    #[garde(length(chars, min = 1, max = 1024))]
    pub prompt: String,

    /// Text describing what to keep out of the image (up to 1024 characters)
    #[serde(default)]
    #[garde(length(chars, max = 1024))]
    pub negative_prompt: String,

    /// Image height in pixels
    #[serde(default = "default_large")]
    #[garde(skip)]
    pub height: u32,

    /// Image width in pixels
    #[serde(default = "default_large")]
    #[garde(skip)]
    pub width: u32,

    /// Number of images the model generates (1-4); only the first is saved
    #[serde(default = "default_num_images")]
    #[garde(range(min = 1, max = 4))]
    pub num_images: u32,

    /// How strictly the image follows the prompt
    #[serde(default = "default_cfg_scale")]
    #[garde(skip)]
    pub cfg_scale: f64,

    /// Generation seed
    #[serde(default)]
    #[garde(skip)]
    pub seed: u64,

    /// Open the saved image in the default viewer
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub open_browser: bool,

    /// File path to save the generated image to
    #[garde(skip)]
    pub output_path: PathBuf,
}

#[async_trait]
impl CanvasTool for TextToImage {
    const NAME: &'static str = "text_to_image";
    const DESCRIPTION: &'static str = "Generate an image from a text prompt with Amazon Nova Canvas \
        and save it to output_path.";
    const SUCCESS_MESSAGE: &'static str = "Image generated successfully.";

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn open_after_save(&self) -> bool {
        self.open_browser
    }

    async fn into_request(self) -> Result<TaskRequest> {
        Ok(TaskRequest::TextImage {
            params: TextImageParams {
                text: self.prompt,
                negative_text: self.negative_prompt,
            },
            config: ImageGenerationConfig {
                number_of_images: self.num_images,
                height: self.height,
                width: self.width,
                cfg_scale: self.cfg_scale,
                seed: Some(self.seed),
            },
        })
    }
}

/// Parameters for `inpainting`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct Inpainting {
    /// File path of the image to edit
    #[garde(skip)]
    pub image_path: PathBuf,

    /// Text describing what to paint into the masked region (1-1024 characters)
    #[garde(length(chars, min = 1, max = 1024))]
    pub prompt: String,

    /// Text describing the region to replace, e.g. "the sky"
    #[garde(length(chars, min = 1, max = 1024))]
    pub mask_prompt: String,

    /// Text describing what to keep out of the image (up to 1024 characters)
    #[serde(default)]
    #[garde(length(chars, max = 1024))]
    pub negative_prompt: String,

    /// Output height in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub height: u32,

    /// Output width in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub width: u32,

    /// How strictly the image follows the prompt
    #[serde(default = "default_cfg_scale")]
    #[garde(skip)]
    pub cfg_scale: f64,

    /// Open the saved image in the default viewer
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub open_browser: bool,

    /// File path to save the edited image to
    #[garde(skip)]
    pub output_path: PathBuf,
}

#[async_trait]
impl CanvasTool for Inpainting {
    const NAME: &'static str = "inpainting";
    const DESCRIPTION: &'static str = "Replace the region of an image described by mask_prompt \
        with content generated from prompt.";
    const SUCCESS_MESSAGE: &'static str = "Inpainting completed successfully.";

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn open_after_save(&self) -> bool {
        self.open_browser
    }

    async fn into_request(self) -> Result<TaskRequest> {
        let image = encode_image(&self.image_path).await?;
        Ok(TaskRequest::Inpainting {
            params: InpaintingParams {
                text: self.prompt,
                negative_text: self.negative_prompt,
                image,
                mask_prompt: self.mask_prompt,
            },
            config: ImageGenerationConfig::single(self.width, self.height, self.cfg_scale),
        })
    }
}

/// Parameters for `outpainting`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct Outpainting {
    /// File path of the image to extend
    #[garde(skip)]
    pub image_path: PathBuf,

    /// File path of the mask image marking the region to keep
    #[garde(skip)]
    pub mask_image_path: PathBuf,

    /// Text describing the content to generate (1-1024 characters)
    #[garde(length(chars, min = 1, max = 1024))]
    pub prompt: String,

    /// Text describing what to keep out of the image (up to 1024 characters)
    #[serde(default)]
    #[garde(length(chars, max = 1024))]
    pub negative_prompt: String,

    /// DEFAULT blends the mask edge, PRECISE keeps it exact
    #[serde(default)]
    #[garde(skip)]
    pub outpainting_mode: OutpaintingMode,

    /// Output height in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub height: u32,

    /// Output width in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub width: u32,

    /// How strictly the image follows the prompt
    #[serde(default = "default_cfg_scale")]
    #[garde(skip)]
    pub cfg_scale: f64,

    /// Open the saved image in the default viewer
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub open_browser: bool,

    /// File path to save the extended image to
    #[garde(skip)]
    pub output_path: PathBuf,
}

#[async_trait]
impl CanvasTool for Outpainting {
    const NAME: &'static str = "outpainting";
    const DESCRIPTION: &'static str = "Generate new content around the masked region of an image.";
    const SUCCESS_MESSAGE: &'static str = "Outpainting completed successfully.";

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn open_after_save(&self) -> bool {
        self.open_browser
    }

    async fn into_request(self) -> Result<TaskRequest> {
        let image = encode_image(&self.image_path).await?;
        let mask_image = encode_image(&self.mask_image_path).await?;
        Ok(TaskRequest::Outpainting {
            params: OutpaintingParams {
                text: self.prompt,
                negative_text: self.negative_prompt,
                image,
                mask_image,
                out_painting_mode: self.outpainting_mode,
            },
            config: ImageGenerationConfig::single(self.width, self.height, self.cfg_scale),
        })
    }
}

/// Parameters for `image_variation`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct ImageVariation {
    /// File paths of the source images (1-5)
    #[garde(length(min = 1, max = 5))]
    pub image_paths: Vec<PathBuf>,

    /// Optional text guiding the variation (up to 1024 characters)
    #[serde(default)]
    #[garde(length(chars, max = 1024))]
    pub prompt: String,

    /// Text describing what to keep out of the image (up to 1024 characters)
    #[serde(default)]
    #[garde(length(chars, max = 1024))]
    pub negative_prompt: String,

    /// Similarity between the sources and the result (0.2-1.0)
    #[serde(default = "default_similarity")]
    #[garde(range(min = 0.2, max = 1.0))]
    pub similarity_strength: f64,

    /// Output height in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub height: u32,

    /// Output width in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub width: u32,

    /// How strictly the image follows the prompt
    #[serde(default = "default_cfg_scale")]
    #[garde(skip)]
    pub cfg_scale: f64,

    /// Open the saved image in the default viewer
    #[serde(default)]
    #[garde(skip)]
    pub open_browser: bool,

    /// File path to save the variation to
    #[garde(skip)]
    pub output_path: PathBuf,
}

#[async_trait]
impl CanvasTool for ImageVariation {
    const NAME: &'static str = "image_variation";
    const DESCRIPTION: &'static str = "Generate a variation of one to five images that keeps \
        their content and style.";
    const SUCCESS_MESSAGE: &'static str = "Image variation completed successfully.";

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn open_after_save(&self) -> bool {
        self.open_browser
    }

    async fn into_request(self) -> Result<TaskRequest> {
        let images = encode_images(&self.image_paths).await?;
        Ok(TaskRequest::ImageVariation {
            params: ImageVariationParams {
                text: self.prompt,
                negative_text: self.negative_prompt,
                images,
                similarity_strength: self.similarity_strength,
            },
            config: ImageGenerationConfig::single(self.width, self.height, self.cfg_scale),
        })
    }
}

/// Parameters for `image_conditioning`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct ImageConditioning {
    /// File path of the condition image whose layout guides generation
    #[garde(skip)]
    pub image_path: PathBuf,

    /// Text describing the image to generate (1-1024 characters)
    #[garde(length(chars, min = 1, max = 1024))]
    pub prompt: String,

    /// Text describing what to keep out of the image (up to 1024 characters)
    #[serde(default)]
    #[garde(length(chars, max = 1024))]
    pub negative_prompt: String,

    /// CANNY_EDGE follows edges, SEGMENTATION follows regions
    #[serde(default)]
    #[garde(skip)]
    pub control_mode: ControlMode,

    /// Output height in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub height: u32,

    /// Output width in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub width: u32,

    /// How strictly the image follows the prompt
    #[serde(default = "default_cfg_scale")]
    #[garde(skip)]
    pub cfg_scale: f64,

    /// Open the saved image in the default viewer
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub open_browser: bool,

    /// File path to save the generated image to
    #[garde(skip)]
    pub output_path: PathBuf,
}

#[async_trait]
impl CanvasTool for ImageConditioning {
    const NAME: &'static str = "image_conditioning";
    const DESCRIPTION: &'static str = "Generate an image from a prompt that follows the layout \
        of a reference image.";
    const SUCCESS_MESSAGE: &'static str = "Image conditioning completed successfully.";

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn open_after_save(&self) -> bool {
        self.open_browser
    }

    async fn into_request(self) -> Result<TaskRequest> {
        let condition_image = encode_image(&self.image_path).await?;
        Ok(TaskRequest::ImageConditioning {
            params: ConditioningParams {
                text: self.prompt,
                negative_text: self.negative_prompt,
                condition_image,
                control_mode: self.control_mode,
            },
            config: ImageGenerationConfig::single(self.width, self.height, self.cfg_scale),
        })
    }
}

/// Parameters for `color_guided_generation`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct ColorGuidedGeneration {
    /// Text describing the image to generate (1-1024 characters)
    #[garde(length(chars, min = 1, max = 1024))]
    pub prompt: String,

    /// Palette of 1-10 hex colors such as "#ff8080"
    #[garde(length(min = 1, max = 10), inner(pattern(r"^#[0-9A-Fa-f]{6}$")))]
    pub colors: Vec<String>,

    /// File path of an optional reference image
    #[serde(default)]
    #[garde(skip)]
    pub reference_image_path: Option<PathBuf>,

    /// Text describing what to keep out of the image (up to 1024 characters)
    #[serde(default)]
    #[garde(length(chars, max = 1024))]
    pub negative_prompt: String,

    /// Output height in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub height: u32,

    /// Output width in pixels
    #[serde(default = "default_small")]
    #[garde(skip)]
    pub width: u32,

    /// How strictly the image follows the prompt
    #[serde(default = "default_cfg_scale")]
    #[garde(skip)]
    pub cfg_scale: f64,

    /// Open the saved image in the default viewer
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub open_browser: bool,

    /// File path to save the generated image to
    #[garde(skip)]
    pub output_path: PathBuf,
}

#[async_trait]
impl CanvasTool for ColorGuidedGeneration {
    const NAME: &'static str = "color_guided_generation";
    const DESCRIPTION: &'static str = "Generate an image from a prompt using a given color palette.";
    const SUCCESS_MESSAGE: &'static str = "Image generated successfully using color palette.";

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn open_after_save(&self) -> bool {
        self.open_browser
    }

    async fn into_request(self) -> Result<TaskRequest> {
        let reference_image = match &self.reference_image_path {
            Some(path) => Some(encode_image(path).await?),
            None => None,
        };
        Ok(TaskRequest::ColorGuidedGeneration {
            params: ColorGuidedParams {
                text: self.prompt,
                negative_text: self.negative_prompt,
                colors: self.colors,
                reference_image,
            },
            config: ImageGenerationConfig::single(self.width, self.height, self.cfg_scale),
        })
    }
}

/// Parameters for `background_removal`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct BackgroundRemoval {
    /// File path of the source image
    #[garde(skip)]
    pub image_path: PathBuf,

    /// Open the saved image in the default viewer
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub open_browser: bool,

    /// File path to save the cut-out image to
    #[garde(skip)]
    pub output_path: PathBuf,
}

#[async_trait]
impl CanvasTool for BackgroundRemoval {
    const NAME: &'static str = "background_removal";
    const DESCRIPTION: &'static str = "Remove the background of an image, leaving the subject on \
        a transparent background.";
    const SUCCESS_MESSAGE: &'static str = "Background removed successfully.";

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn open_after_save(&self) -> bool {
        self.open_browser
    }

    async fn into_request(self) -> Result<TaskRequest> {
        let image = encode_image(&self.image_path).await?;
        Ok(TaskRequest::BackgroundRemoval {
            params: BackgroundRemovalParams { image },
        })
    }
}

/// Wrap a canvas tool as a typed MCP tool.
pub fn canvas_tool<T>(
    canvas: &Arc<Canvas>,
) -> TypedTool<T, impl Fn(T) -> ToolFuture + Send + Sync + 'static>
where
    T: CanvasTool + DeserializeOwned + Validate<Context = ()> + JsonSchema + Sync,
{
    let canvas = Arc::clone(canvas);
    TypedTool::new(T::NAME, move |params: T| -> ToolFuture {
        let canvas = Arc::clone(&canvas);
        Box::pin(async move {
            let outcome = canvas.run(params).await?;
            Ok(serde_json::to_value(outcome)?)
        })
    })
    .with_description(T::DESCRIPTION)
    .with_annotations(
        ToolAnnotations::new()
            .with_read_only(false)
            .with_destructive(false)
            .with_open_world(true),
    )
}

/// Register all seven tools.
pub fn register_tools(builder: ServerCoreBuilder, canvas: &Arc<Canvas>) -> ServerCoreBuilder {
    builder
        .tool(TextToImage::NAME, canvas_tool::<TextToImage>(canvas))
        .tool(Inpainting::NAME, canvas_tool::<Inpainting>(canvas))
        .tool(Outpainting::NAME, canvas_tool::<Outpainting>(canvas))
        .tool(ImageVariation::NAME, canvas_tool::<ImageVariation>(canvas))
        .tool(ImageConditioning::NAME, canvas_tool::<ImageConditioning>(canvas))
        .tool(
            ColorGuidedGeneration::NAME,
            canvas_tool::<ColorGuidedGeneration>(canvas),
        )
        .tool(BackgroundRemoval::NAME, canvas_tool::<BackgroundRemoval>(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<T: DeserializeOwned + Validate<Context = ()>>(value: serde_json::Value) -> Result<T> {
        let params: T = serde_json::from_value(value)?;
        params
            .validate()
            .map_err(|report| crate::Error::validation(report.to_string()))?;
        Ok(params)
    }

    #[test]
    fn text_to_image_defaults() {
        let params: TextToImage =
            parse(json!({"prompt": "a red fox", "output_path": "/tmp/out.png"})).unwrap();

        assert_eq!(params.negative_prompt, "");
        assert_eq!((params.width, params.height), (1024, 1024));
        assert_eq!(params.num_images, 1);
        assert_eq!(params.cfg_scale, 8.0);
        assert_eq!(params.seed, 0);
        assert!(params.open_browser);
    }

    #[test]
    fn edit_tools_default_to_512_and_variation_stays_closed() {
        let variation: ImageVariation =
            parse(json!({"image_paths": ["a.png"], "output_path": "o.png"})).unwrap();
        assert_eq!((variation.width, variation.height), (512, 512));
        assert_eq!(variation.similarity_strength, 0.7);
        assert!(!variation.open_browser);

        let outpainting: Outpainting = parse(json!({
            "image_path": "a.png",
            "mask_image_path": "m.png",
            "prompt": "beach",
            "output_path": "o.png"
        }))
        .unwrap();
        assert_eq!(outpainting.outpainting_mode, OutpaintingMode::Default);
        assert!(outpainting.open_browser);

        let conditioning: ImageConditioning = parse(json!({
            "image_path": "a.png",
            "prompt": "castle",
            "output_path": "o.png"
        }))
        .unwrap();
        assert_eq!(conditioning.control_mode, ControlMode::CannyEdge);
    }

    #[test]
    fn range_rules() {
        let too_long = "x".repeat(1025);
        assert!(parse::<TextToImage>(json!({"prompt": too_long, "output_path": "o.png"})).is_err());
        assert!(parse::<TextToImage>(
            json!({"prompt": "p", "num_images": 5, "output_path": "o.png"})
        )
        .is_err());
        assert!(parse::<ImageVariation>(json!({
            "image_paths": ["1", "2", "3", "4", "5", "6"],
            "output_path": "o.png"
        }))
        .is_err());
        assert!(parse::<ImageVariation>(json!({
            "image_paths": ["1"],
            "similarity_strength": 0.1,
            "output_path": "o.png"
        }))
        .is_err());
        assert!(parse::<Outpainting>(json!({
            "image_path": "a.png",
            "mask_image_path": "m.png",
            "prompt": "beach",
            "outpainting_mode": "SLOPPY",
            "output_path": "o.png"
        }))
        .is_err());
    }

    #[test]
    fn colors_must_be_hex_triplets() {
        let ok: Result<ColorGuidedGeneration> = parse(json!({
            "prompt": "sunset",
            "colors": ["#ff8080", "#00AA11"],
            "output_path": "o.png"
        }));
        assert!(ok.is_ok());

        for colors in [json!([]), json!(["red"]), json!(["#ff80800"])] {
            let result: Result<ColorGuidedGeneration> = parse(json!({
                "prompt": "sunset",
                "colors": colors,
                "output_path": "o.png"
            }));
            assert!(result.is_err(), "accepted {colors}");
        }
    }

    #[tokio::test]
    async fn color_guided_reads_reference_only_when_given() {
        let params: ColorGuidedGeneration = parse(json!({
            "prompt": "sunset",
            "colors": ["#ff8080"],
            "output_path": "o.png"
        }))
        .unwrap();

        match params.into_request().await.unwrap() {
            TaskRequest::ColorGuidedGeneration { params, .. } => {
                assert!(params.reference_image.is_none())
            },
            other => panic!("unexpected request: {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn background_removal_reads_its_input() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.png");
        std::fs::write(&input, b"pixels").unwrap();

        let params: BackgroundRemoval =
            parse(json!({"image_path": input, "output_path": "o.png"})).unwrap();
        assert!(params.open_browser);

        let request = params.into_request().await.unwrap();
        assert!(request.generation_config().is_none());
    }

    #[test]
    fn output_path_is_required_everywhere() {
        assert!(parse::<TextToImage>(json!({"prompt": "p"})).is_err());
        assert!(parse::<BackgroundRemoval>(json!({"image_path": "a.png"})).is_err());
    }
}
