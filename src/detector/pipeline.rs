//! # 归一化流水线模块
//!
//! ## 设计思路
//!
//! 无论输入来自像素缓冲、Blob、画布上下文还是可渲染元素，
//! 最终都转换为尺寸等于**固有尺寸**的 `CanonicalBuffer`，显示尺寸不参与计算。
//!
//! ## 实现思路
//!
//! 1. `intrinsic_dimensions` 按固定顺序解析宽高：
//!    natural → media → coded → client → 通用 width/height，取第一个非零值
//! 2. 像素缓冲原样返回；画布上下文直接回读其画布，不经过绘制
//! 3. Blob 先解码为位图（见 `loader`），再按可渲染元素处理
//! 4. 可渲染元素：按需重建缓存绘制面 → 在 (0,0) 按固有尺寸绘制 → 整体回读
//! 5. 分配绘制面之前校验像素数与内存上限

use serde_json::{Map, Value};

use super::config::DetectorConfig;
use super::loader::BlobDecodeLimiter;
use super::source::{CanonicalBuffer, ImageSource, PlainObject, RenderableElement};
use super::surface::{Surface, SurfaceFactory};
use crate::error::{DetectorError, Result};

const WIDTH_KEYS: [&str; 5] = ["naturalWidth", "videoWidth", "codedWidth", "clientWidth", "width"];
const HEIGHT_KEYS: [&str; 5] = [
    "naturalHeight",
    "videoHeight",
    "codedHeight",
    "clientHeight",
    "height",
];

/// 固有尺寸；`None` 表示无法确定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntrinsicDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl IntrinsicDimensions {
    pub fn known(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    /// 任一维度为 0（检测直接返回空结果）。
    pub fn is_empty(&self) -> bool {
        self.width == Some(0) || self.height == Some(0)
    }

    pub fn resolved(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// 图片归一化器：持有绘制面工厂与一块缓存绘制面。
pub struct ImageNormalizer<F: SurfaceFactory> {
    surfaces: F,
    surface: Option<F::Surface>,
    pub(super) max_decoded_pixels: u64,
    pub(super) max_decoded_bytes: u64,
    pub(super) blob_limiter: BlobDecodeLimiter,
}

impl<F: SurfaceFactory> ImageNormalizer<F> {
    pub fn new(surfaces: F, config: &DetectorConfig) -> Self {
        Self {
            surfaces,
            surface: None,
            max_decoded_pixels: config.max_decoded_pixels,
            max_decoded_bytes: config.max_decoded_bytes,
            blob_limiter: BlobDecodeLimiter::global(),
        }
    }

    /// 改用指定的 Blob 解码限流器（默认为进程级限流器）。
    pub fn with_blob_limiter(mut self, limiter: BlobDecodeLimiter) -> Self {
        self.set_blob_limiter(limiter);
        self
    }

    pub fn set_blob_limiter(&mut self, limiter: BlobDecodeLimiter) {
        self.blob_limiter = limiter;
    }

    pub fn blob_limiter(&self) -> &BlobDecodeLimiter {
        &self.blob_limiter
    }

    /// 当前缓存绘制面的尺寸。
    pub fn cached_surface_dimensions(&self) -> Option<(u32, u32)> {
        self.surface.as_ref().map(Surface::dimensions)
    }

    /// 解析来源的固有尺寸，与显示缩放无关。
    pub fn intrinsic_dimensions(source: &ImageSource) -> IntrinsicDimensions {
        match source {
            ImageSource::Pixels(buffer) => IntrinsicDimensions::known(buffer.width, buffer.height),
            ImageSource::Blob(blob) => match Self::inspect_dimensions_from_memory(&blob.bytes) {
                Ok((width, height)) => IntrinsicDimensions::known(width, height),
                Err(err) => {
                    log::debug!("Blob 头部尺寸不可读，按未知处理：{}", err);
                    IntrinsicDimensions::unknown()
                }
            },
            ImageSource::Context(context) => element_dimensions(&context.canvas),
            ImageSource::Element(element) => element_dimensions(element),
            ImageSource::Plain(object) => plain_dimensions(object),
        }
    }

    /// 将任意来源转换为规范 RGBA 缓冲。
    pub async fn to_canonical_buffer(&mut self, source: &ImageSource) -> Result<CanonicalBuffer> {
        match source {
            ImageSource::Pixels(buffer) => Ok(buffer.clone()),
            ImageSource::Context(context) => {
                Ok(CanonicalBuffer::from((*context.canvas.content).clone()))
            }
            ImageSource::Blob(blob) => {
                let bitmap = self.decode_blob(blob).await?;
                self.render_element(&RenderableElement::bitmap(bitmap))
            }
            ImageSource::Element(element) => self.render_element(element),
            ImageSource::Plain(_) => Err(DetectorError::ArgumentType(
                "普通对象没有可读取的像素".to_string(),
            )),
        }
    }

    fn render_element(&mut self, element: &RenderableElement) -> Result<CanonicalBuffer> {
        let (width, height) = element_dimensions(element)
            .resolved()
            .unwrap_or_else(|| element.content.dimensions());

        self.validate_pixel_limits(width, height)?;
        self.validate_decoded_memory_limits(width, height)?;

        let surface = match self.surface.take() {
            Some(cached) if cached.dimensions() == (width, height) => cached,
            _ => self.surfaces.create_surface(width, height)?,
        };
        let surface = self.surface.insert(surface);

        surface.draw(element, 0, 0);
        surface.read_pixels(0, 0, width, height)
    }

    /// 校验像素数量是否超过配置上限。
    pub(super) fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<()> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| DetectorError::Decode("图片像素数溢出".to_string()))?;

        if pixels > self.max_decoded_pixels {
            return Err(DetectorError::Decode(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.max_decoded_pixels
            )));
        }

        Ok(())
    }

    pub(super) fn validate_decoded_memory_limits(&self, width: u32, height: u32) -> Result<()> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| DetectorError::Decode("图片解码内存估算溢出".to_string()))?;

        if estimated > self.max_decoded_bytes {
            return Err(DetectorError::Decode(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                self.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}

/// 取第一个非零值；全部为零或缺失时取最后一项（通用 width/height）。
fn first_non_zero(candidates: [Option<u32>; 5]) -> Option<u32> {
    candidates
        .iter()
        .copied()
        .flatten()
        .find(|value| *value != 0)
        .or(candidates[4])
}

fn element_dimensions(element: &RenderableElement) -> IntrinsicDimensions {
    IntrinsicDimensions {
        width: first_non_zero([
            element.natural_width,
            element.media_width,
            element.coded_width,
            element.client_width,
            element.width,
        ]),
        height: first_non_zero([
            element.natural_height,
            element.media_height,
            element.coded_height,
            element.client_height,
            element.height,
        ]),
    }
}

fn plain_dimensions(object: &PlainObject) -> IntrinsicDimensions {
    let Some(properties) = object.properties() else {
        return IntrinsicDimensions::unknown();
    };

    IntrinsicDimensions {
        width: lookup_dimension(properties, &WIDTH_KEYS),
        height: lookup_dimension(properties, &HEIGHT_KEYS),
    }
}

/// 宽松解析：第一个“真值”属性决定结果，否则取最后一个属性的数值。
fn lookup_dimension(properties: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    for key in keys {
        if let Some(value) = properties.get(*key).filter(|value| is_truthy(value)) {
            return coerce_dimension(value);
        }
    }

    keys.last()
        .and_then(|key| properties.get(*key))
        .and_then(coerce_dimension)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_dimension(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Array(_) | Value::Object(_) => return None,
    };

    if number.is_finite() && number >= 0.0 {
        Some(number.floor().min(u32::MAX as f64) as u32)
    } else {
        None
    }
}
