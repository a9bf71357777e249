//! # 绘制面
//!
//! 可渲染元素需要先按固有尺寸绘制到一块 2D 绘制面，再整体回读为 RGBA。
//! 绘制面由 `SurfaceFactory` 创建，会话缓存一块并在尺寸变化时重建。
//!
//! `RasterSurface` 是基于 `image::RgbaImage` 的默认实现。

use image::{RgbaImage, imageops};

use super::source::{CanonicalBuffer, RenderableElement};
use crate::error::{DetectorError, Result};

/// 2D 绘制面。
pub trait Surface: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// 以元素的固有尺寸绘制到 `(x, y)`。
    fn draw(&mut self, element: &RenderableElement, x: i64, y: i64);

    /// 回读指定矩形区域的像素。
    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Result<CanonicalBuffer>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// 绘制面工厂。
pub trait SurfaceFactory: Send + Sync {
    type Surface: Surface;

    fn create_surface(&self, width: u32, height: u32) -> Result<Self::Surface>;
}

/// 基于内存位图的绘制面。
#[derive(Debug, Clone)]
pub struct RasterSurface {
    canvas: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.canvas
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn draw(&mut self, element: &RenderableElement, x: i64, y: i64) {
        imageops::replace(&mut self.canvas, &*element.content, x, y);
    }

    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Result<CanonicalBuffer> {
        let right = x.checked_add(width);
        let bottom = y.checked_add(height);

        match (right, bottom) {
            (Some(r), Some(b)) if r <= self.width() && b <= self.height() => {}
            _ => {
                return Err(DetectorError::Decode(format!(
                    "回读区域越界：({}, {}) {}x{}，绘制面 {}x{}",
                    x,
                    y,
                    width,
                    height,
                    self.width(),
                    self.height()
                )));
            }
        }

        if x == 0 && y == 0 && width == self.width() && height == self.height() {
            return Ok(CanonicalBuffer::from(self.canvas.clone()));
        }

        let region = imageops::crop_imm(&self.canvas, x, y, width, height).to_image();
        Ok(CanonicalBuffer::from(region))
    }
}

/// `RasterSurface` 工厂。
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterSurfaceFactory;

impl SurfaceFactory for RasterSurfaceFactory {
    type Surface = RasterSurface;

    fn create_surface(&self, width: u32, height: u32) -> Result<Self::Surface> {
        log::debug!("🖼️ 创建绘制面：{}x{}", width, height);
        Ok(RasterSurface::new(width, height))
    }
}
