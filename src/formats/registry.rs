//! # 格式注册表
//!
//! ## 设计思路
//!
//! 将“人类可读的格式名”映射为“有序的解码句柄配置步骤”。
//! 复合格式（如 `ean_13+2`）由多个码制组成，步骤顺序即各组成码制的上报顺序。
//!
//! ## 实现思路
//!
//! - 注册表是一个显式值，进程启动时构建一次，通过 `Arc` 传递给使用方，
//!   测试可自行构建独立实例，避免隐式全局状态。
//! - 反向索引 `SymbolType → 格式名` 只记录**首次**注册的格式名，
//!   因此复合格式必须在其组成格式之后注册。

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::symbol::{ConfigKind, SymbolType};
use crate::engine::DecoderHandle;

/// 单个配置步骤：对句柄执行一次 `set_config(symbol_type, config_kind, value)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigStep {
    pub symbol_type: SymbolType,
    pub config_kind: ConfigKind,
    pub value: i32,
}

impl ConfigStep {
    pub fn new(symbol_type: SymbolType, config_kind: ConfigKind, value: i32) -> Self {
        Self {
            symbol_type,
            config_kind,
            value,
        }
    }

    /// 启用某个码制的快捷写法。
    pub fn enable(symbol_type: SymbolType) -> Self {
        Self::new(symbol_type, ConfigKind::Enable, 1)
    }
}

/// 一个格式名对应的有序配置步骤。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    name: String,
    steps: Vec<ConfigStep>,
}

impl FormatDescriptor {
    /// 以一个基础步骤创建描述符；名称在注册时写入。
    pub fn new(base: ConfigStep) -> Self {
        Self {
            name: String::new(),
            steps: vec![base],
        }
    }

    /// 追加一个步骤（用于构建复合格式）。
    ///
    /// # 示例
    /// ```rust
    /// use barcode_detector::formats::{ConfigStep, FormatDescriptor, SymbolType};
    ///
    /// let ean13_plus2 = FormatDescriptor::new(ConfigStep::enable(SymbolType::Ean13))
    ///     .add(ConfigStep::enable(SymbolType::Ean2));
    /// assert_eq!(ean13_plus2.steps().len(), 2);
    /// ```
    pub fn add(mut self, step: ConfigStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[ConfigStep] {
        &self.steps
    }

    pub fn is_composite(&self) -> bool {
        self.steps.len() > 1
    }

    /// 描述符是否包含某个码制。
    pub fn contains(&self, symbol_type: SymbolType) -> bool {
        self.steps.iter().any(|step| step.symbol_type == symbol_type)
    }
}

/// 格式注册表：`格式名 → 描述符` 加反向索引 `码制 → 首个格式名`。
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    order: Vec<String>,
    descriptors: HashMap<String, FormatDescriptor>,
    names_by_type: HashMap<SymbolType, String>,
}

impl FormatRegistry {
    /// 创建空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册（或覆盖）一个格式。
    ///
    /// 覆盖时保留原有注册位置；反向索引只为尚未映射的码制写入。
    pub fn register(&mut self, name: impl Into<String>, mut descriptor: FormatDescriptor) -> &mut Self {
        let name = name.into();
        descriptor.name = name.clone();

        for step in &descriptor.steps {
            self.names_by_type
                .entry(step.symbol_type)
                .or_insert_with(|| name.clone());
        }

        if self.descriptors.insert(name.clone(), descriptor).is_none() {
            self.order.push(name);
        }

        self
    }

    /// 全部格式名，按注册顺序。
    pub fn formats(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&FormatDescriptor> {
        self.descriptors.get(name)
    }

    /// 码制 → 首个包含该码制的格式名。
    pub fn resolve_name(&self, symbol_type: SymbolType) -> Option<&str> {
        self.names_by_type.get(&symbol_type).map(String::as_str)
    }

    /// 将指定格式的全部步骤按顺序应用到句柄；未注册的格式名不做任何事。
    pub fn configure<H: DecoderHandle + ?Sized>(&self, handle: &mut H, name: &str) {
        let Some(descriptor) = self.descriptors.get(name) else {
            log::debug!("格式未注册，跳过配置：{}", name);
            return;
        };

        for step in &descriptor.steps {
            handle.set_config(step.symbol_type, step.config_kind, step.value);
        }
    }

    /// 进程级标准注册表（首次调用时构建，之后复用）。
    pub fn standard() -> Arc<FormatRegistry> {
        Arc::clone(&STANDARD_REGISTRY)
    }

    /// 构建标准格式表。
    ///
    /// 格式名是 Barcode Detection API 格式名的超集。
    /// 注意：复合格式必须在其组成格式之后注册。
    pub fn build_standard() -> Self {
        let single = |symbol| FormatDescriptor::new(ConfigStep::enable(symbol));
        let step = ConfigStep::enable;

        let mut registry = Self::new();
        registry
            .register("codabar", single(SymbolType::Codabar))
            .register("code_39", single(SymbolType::Code39))
            .register("code_93", single(SymbolType::Code93))
            .register("code_128", single(SymbolType::Code128))
            .register("databar", single(SymbolType::Databar))
            .register("databar_exp", single(SymbolType::DatabarExp))
            .register("ean_2", single(SymbolType::Ean2))
            .register("ean_5", single(SymbolType::Ean5))
            .register("ean_8", single(SymbolType::Ean8))
            .register("ean_13", single(SymbolType::Ean13))
            .register("ean_13+2", single(SymbolType::Ean13).add(step(SymbolType::Ean2)))
            .register("ean_13+5", single(SymbolType::Ean13).add(step(SymbolType::Ean5)))
            .register("isbn_10", single(SymbolType::Isbn10).add(step(SymbolType::Ean13)))
            .register("isbn_13", single(SymbolType::Isbn13).add(step(SymbolType::Ean13)))
            .register("isbn_13+2", single(SymbolType::Isbn13).add(step(SymbolType::Ean13)).add(step(SymbolType::Ean2)))
            .register("isbn_13+5", single(SymbolType::Isbn13).add(step(SymbolType::Ean13)).add(step(SymbolType::Ean5)))
            .register("itf", single(SymbolType::I25))
            .register("qr_code", single(SymbolType::QrCode))
            .register("sq_code", single(SymbolType::SqCode))
            .register("upc_a", single(SymbolType::Upca).add(step(SymbolType::Ean13)))
            .register("upc_e", single(SymbolType::Upce).add(step(SymbolType::Ean13)));

        registry
    }
}

static STANDARD_REGISTRY: Lazy<Arc<FormatRegistry>> = Lazy::new(|| {
    let registry = FormatRegistry::build_standard();
    log::debug!("标准格式注册表已构建：{} 个格式", registry.order.len());
    Arc::new(registry)
});
