//! # 图片来源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义（标签联合，五个变体）
//! - `CanonicalBuffer` 表示可直接交给解码引擎的 RGBA 数据
//!
//! ## 实现思路
//!
//! - 每个变体有显式的归类规则，`classify` 按固定优先级检查一次：
//!   `Pixels → Blob → Context → Element → Plain`。
//! - 变体内部不合法的值（长度不符的像素缓冲、不含零尺寸的普通对象）视为无法归类。
//! - 就绪状态（图片 `complete`、视频 `ready_state`）在归类之后单独校验。

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use image::RgbaImage;
use serde_json::{Map, Value};

use crate::error::{DetectorError, Result};

/// 规范像素缓冲：RGBA8，逐行存储。
///
/// 不变式：`pixels.len() == width * height * 4`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBuffer {
    /// 宽度（像素）。
    pub width: u32,
    /// 高度（像素）。
    pub height: u32,
    /// RGBA 字节数组（`width * height * 4`）。
    pub pixels: Vec<u8>,
}

impl CanonicalBuffer {
    /// 创建并校验长度不变式。
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = Self::expected_len(width, height).ok_or_else(|| {
            DetectorError::ArgumentType(format!("像素缓冲尺寸溢出：{}x{}", width, height))
        })?;

        if pixels.len() != expected {
            return Err(DetectorError::ArgumentType(format!(
                "像素缓冲长度不符：期望 {} 字节，实际 {} 字节",
                expected,
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// `width * height * 4`，溢出时返回 `None`。
    pub fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
    }

    pub fn is_consistent(&self) -> bool {
        Self::expected_len(self.width, self.height) == Some(self.pixels.len())
    }

    pub fn into_rgba_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels)
    }
}

impl From<RgbaImage> for CanonicalBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

/// 编码后的图片数据（PNG / JPEG / ...），对应宿主环境的 Blob。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    pub bytes: Bytes,
    /// MIME 类型提示，仅用于日志与诊断。
    pub mime_type: Option<String>,
}

impl EncodedBlob {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let mime_type = infer::get(&bytes).map(|kind| kind.mime_type().to_string());
        Self { bytes, mime_type }
    }

    /// 解析 Base64 输入（支持 Data URL / 纯 Base64）。
    pub fn from_base64(data: &str) -> Result<Self> {
        let normalized = data.trim();

        let payload = if normalized.starts_with("data:") {
            let base64_start = normalized.find(";base64,").ok_or_else(|| {
                DetectorError::ArgumentType("Data URL 缺少 base64 标记".to_string())
            })?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        let bytes = general_purpose::STANDARD.decode(payload)?;
        Ok(Self::new(bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 可渲染元素的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Image,
    SvgImage,
    Video,
    Canvas,
    OffscreenCanvas,
    Bitmap,
    VideoFrame,
}

impl ElementKind {
    /// 是否为具有“显示尺寸属性”的媒体元素（`<img>` / `<video>` / SVG image）。
    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::SvgImage | Self::Video)
    }

    pub fn is_canvas(self) -> bool {
        matches!(self, Self::Canvas | Self::OffscreenCanvas)
    }
}

/// 视频元素的就绪状态，数值与媒体元素规范一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// 可渲染元素：图片、视频、画布、位图等。
///
/// `content` 保存元素在固有尺寸下的像素；`client_*` 与 `width/height`
/// 是显示尺寸属性，不会影响归一化结果。
#[derive(Debug, Clone)]
pub struct RenderableElement {
    pub kind: ElementKind,
    pub content: Arc<RgbaImage>,
    pub natural_width: Option<u32>,
    pub natural_height: Option<u32>,
    pub media_width: Option<u32>,
    pub media_height: Option<u32>,
    pub coded_width: Option<u32>,
    pub coded_height: Option<u32>,
    pub client_width: Option<u32>,
    pub client_height: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// 图片是否已完整解码（仅对 `Image` / `SvgImage` 有意义）。
    pub complete: bool,
    /// 视频就绪状态（仅对 `Video` 有意义）。
    pub ready_state: ReadyState,
}

impl RenderableElement {
    fn bare(kind: ElementKind, content: RgbaImage) -> Self {
        Self {
            kind,
            content: Arc::new(content),
            natural_width: None,
            natural_height: None,
            media_width: None,
            media_height: None,
            coded_width: None,
            coded_height: None,
            client_width: None,
            client_height: None,
            width: None,
            height: None,
            complete: true,
            ready_state: ReadyState::HaveEnoughData,
        }
    }

    /// 已完成加载的 `<img>`。
    pub fn image(content: RgbaImage) -> Self {
        let (w, h) = content.dimensions();
        let mut element = Self::bare(ElementKind::Image, content);
        element.natural_width = Some(w);
        element.natural_height = Some(h);
        element.width = Some(w);
        element.height = Some(h);
        element
    }

    /// SVG 中的 `<image>`。
    pub fn svg_image(content: RgbaImage) -> Self {
        let mut element = Self::image(content);
        element.kind = ElementKind::SvgImage;
        element
    }

    /// 当前帧为 `content` 的 `<video>`。
    pub fn video(current_frame: RgbaImage) -> Self {
        let (w, h) = current_frame.dimensions();
        let mut element = Self::bare(ElementKind::Video, current_frame);
        element.media_width = Some(w);
        element.media_height = Some(h);
        element.width = Some(w);
        element.height = Some(h);
        element
    }

    /// 画布：`width/height` 即位图尺寸。
    pub fn canvas(content: RgbaImage) -> Self {
        let (w, h) = content.dimensions();
        let mut element = Self::bare(ElementKind::Canvas, content);
        element.width = Some(w);
        element.height = Some(h);
        element
    }

    pub fn offscreen_canvas(content: RgbaImage) -> Self {
        let mut element = Self::canvas(content);
        element.kind = ElementKind::OffscreenCanvas;
        element
    }

    /// 已解码的位图（Blob 解码结果也用此变体表示）。
    pub fn bitmap(content: RgbaImage) -> Self {
        let mut element = Self::canvas(content);
        element.kind = ElementKind::Bitmap;
        element
    }

    /// 视频帧：编码尺寸即固有尺寸。
    pub fn video_frame(content: RgbaImage) -> Self {
        let (w, h) = content.dimensions();
        let mut element = Self::bare(ElementKind::VideoFrame, content);
        element.coded_width = Some(w);
        element.coded_height = Some(h);
        element
    }

    /// 修改显示尺寸。
    ///
    /// 媒体元素更新 `width/height` 属性与布局尺寸；
    /// 画布、位图与视频帧的 `width/height` 即位图尺寸，显示缩放不改变它们。
    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        if self.kind.is_media() {
            self.client_width = Some(width);
            self.client_height = Some(height);
            self.width = Some(width);
            self.height = Some(height);
        }
        self
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    pub fn with_ready_state(mut self, ready_state: ReadyState) -> Self {
        self.ready_state = ready_state;
        self
    }
}

/// 2D 渲染上下文：读取其所属画布的当前像素。
#[derive(Debug, Clone)]
pub struct RenderingContext {
    pub canvas: RenderableElement,
}

impl RenderingContext {
    pub fn new(canvas: RenderableElement) -> Self {
        Self { canvas }
    }
}

/// 任意宿主对象的属性包，用于承载“零尺寸对象”这类宽松输入。
#[derive(Debug, Clone, PartialEq)]
pub struct PlainObject {
    pub value: Value,
}

impl PlainObject {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.value.as_object()
    }
}

/// `detect()` 的输入：标签联合。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 已是规范 RGBA 的像素缓冲。
    Pixels(CanonicalBuffer),
    /// 编码图片数据，需要先解码。
    Blob(EncodedBlob),
    /// 2D 渲染上下文，直接回读其画布。
    Context(RenderingContext),
    /// 可渲染元素，按固有尺寸绘制后回读。
    Element(RenderableElement),
    /// 普通对象，仅当宽或高（宽松地）等于 0 时可被接受。
    Plain(PlainObject),
}

/// 归类结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    RawPixelBuffer,
    EncodedBlob,
    RenderingContext,
    RenderableElement,
    DimensionlessObject,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RawPixelBuffer => "raw_pixel_buffer",
            Self::EncodedBlob => "encoded_blob",
            Self::RenderingContext => "rendering_context",
            Self::RenderableElement => "renderable_element",
            Self::DimensionlessObject => "dimensionless_object",
        }
    }
}

impl ImageSource {
    /// 由 Data URL 或纯 Base64 文本构造 Blob 来源。
    ///
    /// # 示例
    /// ```rust
    /// use barcode_detector::ImageSource;
    ///
    /// let source = ImageSource::from_base64("data:image/png;base64,iVBORw0KGgo=")?;
    /// assert!(matches!(source, ImageSource::Blob(_)));
    /// # Ok::<(), barcode_detector::DetectorError>(())
    /// ```
    pub fn from_base64(data: &str) -> Result<Self> {
        EncodedBlob::from_base64(data).map(Self::Blob)
    }

    /// 按固定优先级归类；无法归类时返回 `ArgumentType`。
    pub fn classify(&self) -> Result<SourceKind> {
        match self {
            Self::Pixels(buffer) if buffer.is_consistent() => Ok(SourceKind::RawPixelBuffer),
            Self::Pixels(buffer) => Err(DetectorError::ArgumentType(format!(
                "像素缓冲长度与尺寸不符：{}x{}，{} 字节",
                buffer.width,
                buffer.height,
                buffer.pixels.len()
            ))),
            Self::Blob(_) => Ok(SourceKind::EncodedBlob),
            Self::Context(context) if context.canvas.kind.is_canvas() => {
                Ok(SourceKind::RenderingContext)
            }
            Self::Context(context) => Err(DetectorError::ArgumentType(format!(
                "渲染上下文必须属于画布，实际为：{:?}",
                context.canvas.kind
            ))),
            Self::Element(_) => Ok(SourceKind::RenderableElement),
            Self::Plain(object) if is_dimensionless(object) => Ok(SourceKind::DimensionlessObject),
            Self::Plain(object) => Err(DetectorError::ArgumentType(format!(
                "参数不是受支持的图片来源：{}",
                object.value
            ))),
        }
    }

    /// 归类并校验就绪状态。
    pub fn validate(&self) -> Result<SourceKind> {
        let kind = self.classify()?;

        if let Self::Element(element) = self {
            match element.kind {
                ElementKind::Image | ElementKind::SvgImage if !element.complete => {
                    return Err(DetectorError::State(format!(
                        "图片元素尚未加载完成：complete={}",
                        element.complete
                    )));
                }
                ElementKind::Video if element.ready_state <= ReadyState::HaveMetadata => {
                    return Err(DetectorError::State(format!(
                        "视频元素就绪状态无效：{:?}",
                        element.ready_state
                    )));
                }
                _ => {}
            }
        }

        Ok(kind)
    }
}

/// 宽松判断：`width` 或 `height` 属性“等于 0”。
///
/// 与宿主环境的宽松相等一致：`0`、`0.0`、`"0"`、`""`、`false` 都视为 0。
fn is_dimensionless(object: &PlainObject) -> bool {
    let Some(properties) = object.properties() else {
        return false;
    };

    ["width", "height"]
        .iter()
        .filter_map(|key| properties.get(*key))
        .any(loosely_zero)
}

fn loosely_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.is_empty() || trimmed.parse::<f64>().map(|v| v == 0.0).unwrap_or(false)
        }
        Value::Bool(b) => !b,
        _ => false,
    }
}

impl From<CanonicalBuffer> for ImageSource {
    fn from(buffer: CanonicalBuffer) -> Self {
        Self::Pixels(buffer)
    }
}

impl From<EncodedBlob> for ImageSource {
    fn from(blob: EncodedBlob) -> Self {
        Self::Blob(blob)
    }
}

impl From<RenderingContext> for ImageSource {
    fn from(context: RenderingContext) -> Self {
        Self::Context(context)
    }
}

impl From<RenderableElement> for ImageSource {
    fn from(element: RenderableElement) -> Self {
        Self::Element(element)
    }
}

impl From<Value> for ImageSource {
    fn from(value: Value) -> Self {
        Self::Plain(PlainObject::new(value))
    }
}
