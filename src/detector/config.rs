//! # 配置模块
//!
//! ## 设计思路
//!
//! 将检测会话的“可调策略”集中到 `DetectorConfig`，将“要识别哪些格式”放在 `DetectorOptions`。
//! 两者都可从 JSON 反序列化，缺省字段取 `Default` 中的生产值。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - `validate` 只检查数值范围；格式名与编码标签在会话构造时结合注册表校验。
//! - JSON 形状为 `{ "formats": [...], "config": { "cacheOverride": .., "encoding": .. } }`，
//!   未知字段直接报错，避免写错层级时被静默忽略。

use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};

/// 检测会话配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DetectorConfig {
    /// 覆盖解码句柄的结果缓存开关；`None` 表示沿用引擎默认值。
    pub cache_override: Option<bool>,
    /// 载荷文本编码（WHATWG 标签），`None` 为 UTF-8。
    pub encoding: Option<String>,
    /// 绘制面 / Blob 解码的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cache_override: None,
            encoding: None,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
        }
    }
}

impl DetectorConfig {
    /// 校验数值范围。
    pub fn validate(&self) -> Result<()> {
        if self.max_decoded_pixels == 0 {
            return Err(DetectorError::Configuration(
                "max_decoded_pixels 必须大于 0".to_string(),
            ));
        }

        if self.max_decoded_bytes == 0 {
            return Err(DetectorError::Configuration(
                "max_decoded_bytes 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 会话构造参数。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorOptions {
    /// 要识别的格式名；`None` 表示注册表中的全部格式，`Some(vec![])` 非法。
    pub formats: Option<Vec<String>>,
    /// 嵌套的会话配置，缺省取 `DetectorConfig::default()`。
    pub config: DetectorConfig,
}

impl DetectorOptions {
    /// 只识别指定格式。
    pub fn with_formats<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: Some(formats.into_iter().map(Into::into).collect()),
            config: DetectorConfig::default(),
        }
    }

    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.config.encoding = Some(label.into());
        self
    }

    pub fn cache_override(mut self, enable: bool) -> Self {
        self.config.cache_override = Some(enable);
        self
    }

    /// 从 JSON 文本解析。
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DetectorError::Configuration(format!("检测参数解析失败：{}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DetectorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = DetectorConfig {
            max_decoded_bytes: 0,
            ..DetectorConfig::default()
        };

        assert!(matches!(config.validate(), Err(DetectorError::Configuration(_))));
    }

    #[test]
    fn options_parse_from_json_with_defaults() {
        let options = DetectorOptions::from_json(
            r#"{ "formats": ["qr_code", "ean_13"] }"#,
        )
        .expect("options should parse");

        assert_eq!(
            options.formats,
            Some(vec!["qr_code".to_string(), "ean_13".to_string()])
        );
        assert_eq!(options.config, DetectorConfig::default());
    }

    #[test]
    fn nested_config_object_is_honored() {
        let options = DetectorOptions::from_json(
            r#"{"formats":["qr_code"],"config":{"encoding":"shift_jis","cacheOverride":false}}"#,
        )
        .expect("options should parse");

        assert_eq!(options.formats, Some(vec!["qr_code".to_string()]));
        assert_eq!(options.config.encoding.as_deref(), Some("shift_jis"));
        assert_eq!(options.config.cache_override, Some(false));
        assert_eq!(options.config.max_decoded_pixels, DetectorConfig::default().max_decoded_pixels);
    }

    #[test]
    fn config_fields_at_top_level_are_rejected() {
        let result = DetectorOptions::from_json(r#"{ "formats": ["qr_code"], "encoding": "shift_jis" }"#);
        assert!(matches!(result, Err(DetectorError::Configuration(_))));
    }

    #[test]
    fn options_serialize_with_nested_config() {
        let options = DetectorOptions::with_formats(["qr_code"]).encoding("gbk");
        let value = serde_json::to_value(&options).expect("serialize");

        assert_eq!(value["config"]["encoding"], "gbk");
        assert_eq!(
            DetectorOptions::from_json(&value.to_string()).expect("reparse"),
            options
        );
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let result = DetectorOptions::from_json(r#"{ "formats": "qr_code" }"#);
        assert!(matches!(result, Err(DetectorError::Configuration(_))));
    }
}
