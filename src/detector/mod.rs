//! # 条码检测模块（detector）
//!
//! ## 设计思路
//!
//! 将“来源识别 → 归一化 → 句柄配置 → 解码 → 结果映射”按职责拆分为多个子模块：
//!
//! - `source`：输入来源与规范像素缓冲
//! - `surface`：2D 绘制面抽象与默认实现
//! - `pipeline`：归一化（固有尺寸解析、绘制、回读、资源上限）
//! - `loader`：Blob 签名校验、解码与跨会话共享的解码限流
//! - `mapper` / `barcode`：结果映射与结果模型
//! - `config`：会话配置
//! - `session`：统一编排
//!
//! ## 调用链
//!
//! ```text
//! BarcodeDetector::detect
//!    ├─ source.rs（归类 + 就绪校验）
//!    ├─ pipeline.rs（固有尺寸 / 归一化）
//!    │     └─ loader.rs（Blob 解码）
//!    ├─ engine（句柄获取 + 解码）
//!    └─ mapper.rs（包围盒 + 文本解码 + 格式名）
//! ```

mod barcode;
mod config;
mod loader;
mod mapper;
mod pipeline;
mod session;
mod source;
mod surface;

pub use barcode::{BoundingBox, DetectedBarcode};
pub use config::{DetectorConfig, DetectorOptions};
pub use loader::{BlobDecodeLimiter, DEFAULT_CONCURRENT_BLOB_DECODES};
pub use mapper::{ResultMapper, UNKNOWN_FORMAT};
pub use pipeline::{ImageNormalizer, IntrinsicDimensions};
pub use session::{BarcodeDetector, supported_formats};
pub use source::{
    CanonicalBuffer, ElementKind, EncodedBlob, ImageSource, PlainObject, ReadyState,
    RenderableElement, RenderingContext, SourceKind,
};
pub use surface::{RasterSurface, RasterSurfaceFactory, Surface, SurfaceFactory};
