//! # 结果映射
//!
//! 将引擎上报的 `DecodedSymbol` 转换为 `DetectedBarcode`：
//! - 包围盒取全部定位点的最小/最大坐标，角点由包围盒推出
//! - 载荷按会话编码解码为文本，去掉该编码的 BOM，非法序列替换为 U+FFFD
//! - 码制经注册表反查格式名

use std::sync::Arc;

use encoding_rs::{Encoding, UTF_8};

use super::barcode::{BoundingBox, DetectedBarcode};
use crate::engine::DecodedSymbol;
use crate::error::{DetectorError, Result};
use crate::formats::FormatRegistry;

pub const UNKNOWN_FORMAT: &str = "unknown";

#[derive(Debug, Clone)]
pub struct ResultMapper {
    registry: Arc<FormatRegistry>,
    encoding: &'static Encoding,
}

impl ResultMapper {
    /// `label` 为 WHATWG 编码标签，`None` 为 UTF-8。
    ///
    /// 映射到 replacement 编码的标签（如 `iso-2022-kr`）视为未知编码。
    pub fn new(registry: Arc<FormatRegistry>, label: Option<&str>) -> Result<Self> {
        let encoding = match label {
            None => UTF_8,
            Some(label) => Encoding::for_label_no_replacement(label.trim().as_bytes())
                .ok_or_else(|| DetectorError::Configuration(format!("未知文本编码：{}", label)))?,
        };

        Ok(Self { registry, encoding })
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn map(&self, symbol: &DecodedSymbol) -> DetectedBarcode {
        let bounding_box = BoundingBox::enclosing(&symbol.points);

        let format = match self.registry.resolve_name(symbol.symbol_type) {
            Some(name) => name.to_string(),
            None => {
                log::warn!("⚠️ 码制未注册，格式记为 unknown：{:?}", symbol.symbol_type);
                UNKNOWN_FORMAT.to_string()
            }
        };

        DetectedBarcode {
            format,
            raw_value: self.decode_text(&symbol.payload),
            orientation: symbol.orientation,
            quality: symbol.quality,
            bounding_box,
            corner_points: bounding_box.corner_points(),
        }
    }

    pub fn map_all(&self, symbols: &[DecodedSymbol]) -> Vec<DetectedBarcode> {
        symbols.iter().map(|symbol| self.map(symbol)).collect()
    }

    fn decode_text(&self, payload: &[u8]) -> String {
        let (text, had_errors) = self.encoding.decode_with_bom_removal(payload);
        if had_errors {
            log::debug!("载荷含非法 {} 序列，已替换", self.encoding.name());
        }
        text.into_owned()
    }
}
