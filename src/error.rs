//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `DetectorError` 枚举，覆盖构造期与检测期的全部失败来源。
//! 调用方只需匹配四个分支：
//!
//! - `Configuration`：构造参数非法（格式列表为空 / 不支持 / 编码未知）
//! - `ArgumentType`：`detect()` 的输入无法归类为任何已知图片来源
//! - `State`：图片 / 视频元素尚未就绪
//! - `Decode`：解码引擎、Blob 解码或归一化流水线内部失败
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `image` / `base64` 错误提供 `From` 转换，统一归入 `Decode`。
//! - 实现 `Serialize` 将错误序列化为字符串，便于上层透传给前端或日志系统。

use serde::Serialize;

/// 检测器统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// 构造参数错误，构造即失败，不会产生任何部分配置。
    #[error("配置错误：{0}")]
    Configuration(String),

    /// 输入参数不是受支持的图片来源。
    #[error("参数类型错误：{0}")]
    ArgumentType(String),

    /// 图片来源处于不可检测的状态。
    #[error("状态错误：{0}")]
    State(String),

    /// 解码引擎或归一化流水线失败。
    #[error("解码错误：{0}")]
    Decode(String),
}

impl DetectorError {
    /// 稳定的错误分类码，供日志与上层按类别处理。
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ArgumentType(_) => "argument_type",
            Self::State(_) => "state",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<image::ImageError> for DetectorError {
    fn from(error: image::ImageError) -> Self {
        Self::Decode(format!("图片解码失败：{}", error))
    }
}

impl From<base64::DecodeError> for DetectorError {
    fn from(error: base64::DecodeError) -> Self {
        Self::Decode(format!("Base64 解码失败：{}", error))
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for DetectorError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// 本 crate 的统一 `Result` 别名。
pub type Result<T> = std::result::Result<T, DetectorError>;
