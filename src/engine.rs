//! # 解码引擎接口
//!
//! ## 设计思路
//!
//! 码制识别算法由外部解码引擎负责，本 crate 只通过固定接口消费它：
//!
//! ```text
//! acquire_handle() ──► DecoderHandle ──► set_config / enable_cache
//!                                │
//! CanonicalBuffer ───────────────┴──► decode() ──► Vec<DecodedSymbol>
//! ```
//!
//! ## 实现思路
//!
//! - `acquire_handle` 可能挂起（例如引擎需要异步初始化），因此返回 `Future`。
//! - `decode` 是 CPU 密集的同步调用，结果顺序即引擎上报顺序，上层不会重排。

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::detector::CanonicalBuffer;
use crate::error::DetectorError;
use crate::formats::{ConfigKind, SymbolType};

/// 平面坐标点（像素坐标系，原点在左上角）。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 码制方向，数值与解码引擎一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Orientation {
    #[default]
    Unknown = -1,
    Upright = 0,
    RotatedRight = 1,
    UpsideDown = 2,
    RotatedLeft = 3,
}

impl Orientation {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// 由引擎数值编码转换，未知数值视为 `Unknown`。
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Upright,
            1 => Self::RotatedRight,
            2 => Self::UpsideDown,
            3 => Self::RotatedLeft,
            _ => Self::Unknown,
        }
    }
}

/// 解码引擎上报的原始符号。
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSymbol {
    pub symbol_type: SymbolType,
    /// 引擎上报的定位点，不保证有序或构成凸多边形。
    pub points: Vec<Point>,
    /// 未解码的载荷字节，文本编码由会话配置决定。
    pub payload: Vec<u8>,
    pub orientation: Orientation,
    pub quality: i32,
}

/// 已获取的解码句柄。
pub trait DecoderHandle: Send {
    fn set_config(&mut self, symbol_type: SymbolType, config_kind: ConfigKind, value: i32);

    fn enable_cache(&mut self, enable: bool);
}

/// 外部解码引擎。
pub trait DecodingEngine: Send + Sync {
    type Handle: DecoderHandle;

    /// 获取一个新的解码句柄（可能挂起）。
    fn acquire_handle(&self) -> impl Future<Output = Result<Self::Handle, DetectorError>> + Send;

    /// 在规范 RGBA 缓冲上执行解码。
    fn decode(
        &self,
        buffer: &CanonicalBuffer,
        handle: &mut Self::Handle,
    ) -> Result<Vec<DecodedSymbol>, DetectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_codes_match_engine() {
        assert_eq!(Orientation::Unknown.code(), -1);
        assert_eq!(Orientation::RotatedLeft.code(), 3);
        assert_eq!(Orientation::from_code(2), Orientation::UpsideDown);
        assert_eq!(Orientation::from_code(42), Orientation::Unknown);
    }

    #[test]
    fn orientation_serializes_as_upper_snake_case() {
        let json = serde_json::to_string(&Orientation::RotatedRight).expect("serialize failed");
        assert_eq!(json, "\"ROTATED_RIGHT\"");
    }
}
