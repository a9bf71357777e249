//! # Blob 解码模块
//!
//! ## 设计思路
//!
//! 编码图片在归一化前需要先解码为位图。解码是 CPU 密集操作，
//! 放在阻塞线程池执行；并发数由 `BlobDecodeLimiter` 限制，许可即“临时解码资源”。
//!
//! 同一会话的 `detect()` 本身是串行的，因此上限只有在多个会话之间共享时才有意义：
//! 默认所有会话共用进程级的 `BlobDecodeLimiter::global()`，
//! 也可以为一组会话单独创建并注入一个限流器。
//!
//! ## 实现思路
//!
//! - 先用 `infer` 校验文件签名，再读 header 尺寸做上限检查，最后完整解码。
//! - 许可随闭包移入阻塞任务，任务结束（成功、失败或 panic）即释放。

use std::io::Cursor;
use std::sync::Arc;

use image::{GenericImageView, RgbaImage};
use once_cell::sync::Lazy;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::pipeline::ImageNormalizer;
use super::source::EncodedBlob;
use super::surface::SurfaceFactory;
use crate::error::{DetectorError, Result};

/// 进程级限流器的并发解码上限。
pub const DEFAULT_CONCURRENT_BLOB_DECODES: usize = 2;

static GLOBAL_BLOB_LIMITER: Lazy<BlobDecodeLimiter> =
    Lazy::new(|| BlobDecodeLimiter::new(DEFAULT_CONCURRENT_BLOB_DECODES));

/// Blob 解码并发限流器，克隆后共享同一组许可。
#[derive(Debug, Clone)]
pub struct BlobDecodeLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl BlobDecodeLimiter {
    /// 创建独立的限流器；`capacity` 至少为 1。
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// 所有会话默认共用的进程级限流器。
    pub fn global() -> Self {
        GLOBAL_BLOB_LIMITER.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// 两个限流器是否共享同一组许可。
    pub fn shares_permits_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.permits, &other.permits)
    }

    /// 等待一个解码许可；许可被 drop 时归还。
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| DetectorError::Decode(format!("解码资源不可用：{}", e)))
    }
}

impl Default for BlobDecodeLimiter {
    fn default() -> Self {
        Self::global()
    }
}

impl<F: SurfaceFactory> ImageNormalizer<F> {
    /// 将编码图片解码为 RGBA 位图。
    pub(super) async fn decode_blob(&self, blob: &EncodedBlob) -> Result<RgbaImage> {
        Self::validate_image_signature(&blob.bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&blob.bytes)?;
        self.validate_pixel_limits(header_width, header_height)?;
        self.validate_decoded_memory_limits(header_width, header_height)?;

        let permit = self.blob_limiter.acquire().await?;

        let bytes = blob.bytes.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            image::load_from_memory(&bytes)
        })
        .await
        .map_err(|e| DetectorError::Decode(format!("解码任务异常退出：{}", e)))??;

        let (width, height) = decoded.dimensions();
        self.validate_pixel_limits(width, height)?;
        self.validate_decoded_memory_limits(width, height)?;

        log::info!(
            "✅ Blob 解码成功 - 类型: {} 尺寸: {}x{} 体积: {} 字节",
            blob.mime_type.as_deref().unwrap_or("unknown"),
            width,
            height,
            blob.len()
        );

        Ok(decoded.to_rgba8())
    }

    /// 仅通过内存中的图片头信息读取宽高。
    pub(super) fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32)> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DetectorError::Decode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| DetectorError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 基于文件头签名校验是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<()> {
        match infer::get(bytes) {
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(()),
            Some(kind) => Err(DetectorError::Decode(format!(
                "Blob 不是图片：{}",
                kind.mime_type()
            ))),
            None => Err(DetectorError::Decode("无法识别 Blob 的文件签名".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::config::DetectorConfig;
    use crate::detector::surface::RasterSurfaceFactory;
    use image::{ImageBuffer, ImageFormat, Rgba};

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = ImageBuffer::from_fn(width, height, |x, _| {
            if x % 2 == 0 {
                Rgba([0_u8, 0, 0, 255])
            } else {
                Rgba([255_u8, 255, 255, 255])
            }
        });
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("encode png");
        cursor.into_inner()
    }

    fn normalizer(config: &DetectorConfig) -> ImageNormalizer<RasterSurfaceFactory> {
        ImageNormalizer::new(RasterSurfaceFactory, config)
    }

    #[tokio::test]
    async fn decodes_png_blob_and_releases_permit() {
        let limiter = BlobDecodeLimiter::new(1);
        let normalizer = normalizer(&DetectorConfig::default()).with_blob_limiter(limiter.clone());
        let blob = EncodedBlob::new(create_png_bytes(6, 3));

        let bitmap = normalizer.decode_blob(&blob).await.expect("decode");

        assert_eq!(bitmap.dimensions(), (6, 3));
        assert_eq!(bitmap.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn non_image_blob_is_a_decode_error() {
        let normalizer = normalizer(&DetectorConfig::default());
        let pdf = EncodedBlob::new(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n".to_vec());

        let result = normalizer.decode_blob(&pdf).await;
        assert!(matches!(result, Err(DetectorError::Decode(_))));
    }

    #[tokio::test]
    async fn truncated_png_fails_and_releases_permit() {
        let limiter = BlobDecodeLimiter::new(2);
        let normalizer = normalizer(&DetectorConfig::default()).with_blob_limiter(limiter.clone());
        let mut bytes = create_png_bytes(4, 4);
        bytes.truncate(40);

        let result = normalizer.decode_blob(&EncodedBlob::new(bytes)).await;

        assert!(matches!(result, Err(DetectorError::Decode(_))));
        assert_eq!(limiter.available_permits(), 2);
    }

    #[tokio::test]
    async fn header_dimensions_are_checked_before_decode() {
        let config = DetectorConfig {
            max_decoded_pixels: 10,
            ..DetectorConfig::default()
        };
        let normalizer = normalizer(&config);

        let result = normalizer
            .decode_blob(&EncodedBlob::new(create_png_bytes(8, 8)))
            .await;
        assert!(matches!(result, Err(DetectorError::Decode(_))));
    }

    #[test]
    fn normalizers_share_the_global_limiter_by_default() {
        let first = normalizer(&DetectorConfig::default());
        let second = normalizer(&DetectorConfig::default());

        assert!(first.blob_limiter().shares_permits_with(second.blob_limiter()));
        assert!(first.blob_limiter().shares_permits_with(&BlobDecodeLimiter::global()));
        assert!(!BlobDecodeLimiter::new(2).shares_permits_with(&BlobDecodeLimiter::global()));
        assert_eq!(BlobDecodeLimiter::global().capacity(), DEFAULT_CONCURRENT_BLOB_DECODES);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let limiter = BlobDecodeLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn decode_waits_for_a_permit_held_elsewhere() {
        let limiter = BlobDecodeLimiter::new(1);
        let first = normalizer(&DetectorConfig::default()).with_blob_limiter(limiter.clone());
        let second = normalizer(&DetectorConfig::default()).with_blob_limiter(limiter.clone());
        let blob = EncodedBlob::new(create_png_bytes(4, 4));

        let held = limiter.acquire().await.expect("permit");
        let (first_result, second_result) = tokio::join!(
            tokio::time::timeout(std::time::Duration::from_millis(50), first.decode_blob(&blob)),
            tokio::time::timeout(std::time::Duration::from_millis(50), second.decode_blob(&blob)),
        );
        assert!(first_result.is_err());
        assert!(second_result.is_err());

        drop(held);
        let bitmap = first.decode_blob(&blob).await.expect("decode after release");
        assert_eq!(bitmap.dimensions(), (4, 4));
        assert_eq!(limiter.available_permits(), 1);
    }

    #[test]
    fn header_dimensions_read_png_size() {
        let dims = ImageNormalizer::<RasterSurfaceFactory>::inspect_dimensions_from_memory(
            &create_png_bytes(9, 5),
        )
        .expect("header dimensions");
        assert_eq!(dims, (9, 5));
    }
}
