//! 检测结果模型。

use serde::{Deserialize, Serialize};

use crate::engine::{Orientation, Point};

/// 轴对齐包围盒。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// 包含全部点的最小轴对齐矩形；点集为空时为原点处的零矩形。
    ///
    /// 点不要求有序，也不要求构成凸多边形。
    pub fn enclosing(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// 四个角点：左上、右上、右下、左下。
    pub fn corner_points(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }
}

/// 单个检测结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedBarcode {
    /// 格式名；注册表无法识别的码制为 `"unknown"`。
    pub format: String,
    pub raw_value: String,
    pub orientation: Orientation,
    pub quality: i32,
    pub bounding_box: BoundingBox,
    pub corner_points: [Point; 4],
}
