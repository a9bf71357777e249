//! # 条码检测 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  调用方                                                  │
//! │    BarcodeDetector::new(engine, options)?                │
//! │    detector.detect(&ImageSource).await?                  │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ Result<Vec<DetectedBarcode>, DetectorError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  ┌─ error ────── DetectorError (统一错误类型)             │
//! │  │                                                       │
//! │  ├─ formats ──── 格式名 → 配置步骤，码制 → 格式名         │
//! │  │                                                       │
//! │  ├─ engine ───── 外部解码引擎接口 (DecodingEngine)        │
//! │  │                                                       │
//! │  └─ detector                                             │
//! │      ├─ source / pipeline / loader   来源归一化           │
//! │      ├─ surface                      2D 绘制面            │
//! │      ├─ mapper / barcode             结果映射             │
//! │      └─ session                      BarcodeDetector      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `DetectorError` |
//! | [`formats`] | 格式注册表、码制与配置项枚举 |
//! | [`engine`] | 解码引擎与解码句柄 trait、引擎原始输出 |
//! | [`detector`] | 输入来源、归一化、结果映射与检测会话 |

pub mod detector;
pub mod engine;
pub mod error;
pub mod formats;

pub use detector::{
    BarcodeDetector, BlobDecodeLimiter, BoundingBox, CanonicalBuffer, DetectedBarcode,
    DetectorConfig, DetectorOptions, ElementKind, EncodedBlob, ImageSource, PlainObject,
    ReadyState, RenderableElement, RenderingContext, supported_formats,
};
pub use engine::{DecodedSymbol, DecoderHandle, DecodingEngine, Orientation, Point};
pub use error::{DetectorError, Result};
pub use formats::{ConfigKind, ConfigStep, FormatDescriptor, FormatRegistry, SymbolType};
