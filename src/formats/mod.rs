//! # 格式模块（formats）
//!
//! - `symbol`：解码引擎的码制与配置项枚举
//! - `registry`：格式名 → 配置步骤 的注册表

mod registry;
mod symbol;

pub use registry::{ConfigStep, FormatDescriptor, FormatRegistry};
pub use symbol::{ConfigKind, SymbolType};
