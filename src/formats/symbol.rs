//! # 解码引擎枚举
//!
//! 符号类型与配置项沿用解码引擎的数值编码，
//! 以便 `DecoderHandle` 实现直接透传给底层引擎。

use serde::{Deserialize, Serialize};

/// 解码引擎内部的码制标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum SymbolType {
    /// 无码制；与 `ConfigKind::Enable` 配合可重置全部码制。
    None = 0,
    Partial = 1,
    Ean2 = 2,
    Ean5 = 5,
    Ean8 = 8,
    Upce = 9,
    Isbn10 = 10,
    Upca = 12,
    Ean13 = 13,
    Isbn13 = 14,
    Composite = 15,
    I25 = 25,
    Databar = 34,
    DatabarExp = 35,
    Codabar = 38,
    Code39 = 39,
    Pdf417 = 57,
    QrCode = 64,
    SqCode = 80,
    Code93 = 93,
    Code128 = 128,
}

impl SymbolType {
    /// 引擎数值编码。
    pub fn code(self) -> i32 {
        self as i32
    }

    /// 由引擎数值编码反查，未知编码返回 `None`。
    pub fn from_code(code: i32) -> Option<Self> {
        let symbol = match code {
            0 => Self::None,
            1 => Self::Partial,
            2 => Self::Ean2,
            5 => Self::Ean5,
            8 => Self::Ean8,
            9 => Self::Upce,
            10 => Self::Isbn10,
            12 => Self::Upca,
            13 => Self::Ean13,
            14 => Self::Isbn13,
            15 => Self::Composite,
            25 => Self::I25,
            34 => Self::Databar,
            35 => Self::DatabarExp,
            38 => Self::Codabar,
            39 => Self::Code39,
            57 => Self::Pdf417,
            64 => Self::QrCode,
            80 => Self::SqCode,
            93 => Self::Code93,
            128 => Self::Code128,
            _ => return None,
        };
        Some(symbol)
    }
}

/// 解码句柄的配置项。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConfigKind {
    Enable = 0,
    AddCheck = 1,
    EmitCheck = 2,
    Ascii = 3,
    Binary = 4,
    MinLen = 0x20,
    MaxLen = 0x21,
    Uncertainty = 0x40,
    Position = 0x80,
    TestInverted = 0x81,
    XDensity = 0x100,
    YDensity = 0x101,
}

impl ConfigKind {
    pub fn code(self) -> i32 {
        self as i32
    }
}
