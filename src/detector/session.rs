//! # 检测会话
//!
//! ## 设计思路
//!
//! `BarcodeDetector` 编排一次检测的全部阶段：
//!
//! ```text
//! validate ──► 零尺寸快速返回
//!    │
//!    ├─ normalize（绘制 / 解码 Blob）─┐
//!    │                                ├─ join ──► cache override ──► decode ──► map
//!    └─ ensure_handle（首次创建并配置）┘
//! ```
//!
//! ## 实现思路
//!
//! - 构造期同步校验格式列表与编码，失败即返回 `Configuration`，不产生任何部分配置。
//! - 解码句柄与缓存绘制面放在同一把 `tokio::sync::Mutex` 中：
//!   首次创建天然只有一个执行者，同一会话的 `detect()` 调用按到达顺序串行执行。
//! - 句柄获取失败不会写入缓存，下次调用重新获取。
//! - Blob 解码许可来自 `BlobDecodeLimiter`，默认与其它会话共享进程级上限。

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use super::barcode::DetectedBarcode;
use super::config::{DetectorConfig, DetectorOptions};
use super::loader::BlobDecodeLimiter;
use super::mapper::ResultMapper;
use super::pipeline::ImageNormalizer;
use super::source::ImageSource;
use super::surface::{RasterSurfaceFactory, SurfaceFactory};
use crate::engine::{DecoderHandle, DecodingEngine};
use crate::error::{DetectorError, Result};
use crate::formats::{ConfigKind, FormatRegistry, SymbolType};

/// 标准格式表中的全部格式名，按注册顺序。
///
/// 与具体解码引擎无关，无需先构造会话。
pub fn supported_formats() -> Vec<String> {
    FormatRegistry::standard().formats()
}

struct SessionState<H, F: SurfaceFactory> {
    normalizer: ImageNormalizer<F>,
    handle: Option<H>,
}

/// 条码检测会话。
pub struct BarcodeDetector<E: DecodingEngine, F: SurfaceFactory = RasterSurfaceFactory> {
    registry: Arc<FormatRegistry>,
    formats: Vec<String>,
    config: DetectorConfig,
    mapper: ResultMapper,
    engine: E,
    state: Mutex<SessionState<E::Handle, F>>,
}

impl<E: DecodingEngine> BarcodeDetector<E> {
    /// 使用标准格式表与内置绘制面创建会话。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use barcode_detector::{BarcodeDetector, DetectorOptions};
    ///
    /// let detector = BarcodeDetector::new(engine, DetectorOptions::with_formats(["qr_code"]))?;
    /// let barcodes = detector.detect(&source).await?;
    /// ```
    pub fn new(engine: E, options: DetectorOptions) -> Result<Self> {
        Self::with_parts(FormatRegistry::standard(), engine, RasterSurfaceFactory, options)
    }
}

impl<E: DecodingEngine, F: SurfaceFactory> BarcodeDetector<E, F> {
    /// 使用自定义注册表与绘制面工厂创建会话。
    pub fn with_parts(
        registry: Arc<FormatRegistry>,
        engine: E,
        surfaces: F,
        options: DetectorOptions,
    ) -> Result<Self> {
        let DetectorOptions { formats, config } = options;
        config.validate()?;

        let formats = match formats {
            None => registry.formats(),
            Some(formats) if formats.is_empty() => {
                return Err(DetectorError::Configuration(
                    "formats 不能为空列表".to_string(),
                ));
            }
            Some(formats) => {
                if let Some(unsupported) = formats.iter().find(|name| !registry.contains(name)) {
                    return Err(DetectorError::Configuration(format!(
                        "不支持的格式：{}",
                        unsupported
                    )));
                }
                formats
            }
        };

        let mapper = ResultMapper::new(Arc::clone(&registry), config.encoding.as_deref())?;

        log::debug!(
            "🔧 检测会话已创建 - 格式: [{}] 编码: {}",
            formats.join(", "),
            mapper.encoding().name()
        );

        Ok(Self {
            state: Mutex::new(SessionState {
                normalizer: ImageNormalizer::new(surfaces, &config),
                handle: None,
            }),
            registry,
            formats,
            config,
            mapper,
            engine,
        })
    }

    /// 让本会话的 Blob 解码改用指定限流器，可与其它会话共享。
    pub fn with_blob_limiter(mut self, limiter: BlobDecodeLimiter) -> Self {
        self.state.get_mut().normalizer.set_blob_limiter(limiter);
        self
    }

    /// 会话实际生效的格式名。
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// 检测来源中的全部条码，结果顺序即解码引擎上报顺序。
    pub async fn detect(&self, source: &ImageSource) -> Result<Vec<DetectedBarcode>> {
        let total_start = Instant::now();

        let kind = source.validate()?;
        let dimensions = ImageNormalizer::<F>::intrinsic_dimensions(source);
        if dimensions.is_empty() {
            log::debug!(
                "来源尺寸为零，跳过检测 - 类型: {} 尺寸: {:?}x{:?}",
                kind.as_str(),
                dimensions.width,
                dimensions.height
            );
            return Ok(Vec::new());
        }

        let mut state = self.state.lock().await;
        let SessionState { normalizer, handle } = &mut *state;

        let prepare_start = Instant::now();
        let (buffer, handle) = tokio::join!(
            normalizer.to_canonical_buffer(source),
            self.ensure_handle(handle)
        );
        let buffer = buffer?;
        let handle = handle?;
        let prepare_elapsed = prepare_start.elapsed();

        if let Some(enable) = self.config.cache_override {
            handle.enable_cache(enable);
        }

        let decode_start = Instant::now();
        let symbols = self.engine.decode(&buffer, handle)?;
        let decode_elapsed = decode_start.elapsed();

        let map_start = Instant::now();
        let barcodes = self.mapper.map_all(&symbols);
        let map_elapsed = map_start.elapsed();

        log::info!(
            "✅ 条码检测完成 - 来源: {} 尺寸: {}x{} 结果: {} 个 prepare={}ms decode={}ms map={}ms total={}ms",
            kind.as_str(),
            buffer.width,
            buffer.height,
            barcodes.len(),
            prepare_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            map_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(barcodes)
    }

    /// 返回已缓存的句柄；首次调用时获取、重置并按格式配置。
    async fn ensure_handle<'a>(&self, slot: &'a mut Option<E::Handle>) -> Result<&'a mut E::Handle> {
        let handle = match slot.take() {
            Some(handle) => handle,
            None => {
                let acquire_start = Instant::now();
                let mut handle = self.engine.acquire_handle().await?;

                handle.set_config(SymbolType::None, ConfigKind::Enable, 0);
                for format in &self.formats {
                    self.registry.configure(&mut handle, format);
                }

                log::debug!(
                    "解码句柄已就绪 - 格式: {} 个 acquire={}ms",
                    self.formats.len(),
                    acquire_start.elapsed().as_millis()
                );
                handle
            }
        };

        Ok(slot.insert(handle))
    }
}
