// Shared fixtures: a scripted decoding engine and image helpers.
#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use barcode_detector::{
    CanonicalBuffer, ConfigKind, DecodedSymbol, DecoderHandle, DecodingEngine, DetectorError,
    Orientation, Point, SymbolType,
};
use image::{ImageFormat, Rgba, RgbaImage};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A symbol the fake engine "sees" in every image.
///
/// `region` is `(left, top, right, bottom)` as fractions of the buffer size, so
/// the reported points only depend on the canonical buffer dimensions.
#[derive(Debug, Clone)]
pub struct ScriptedSymbol {
    pub symbol_type: SymbolType,
    pub payload: Vec<u8>,
    pub region: (f64, f64, f64, f64),
    pub orientation: Orientation,
    pub quality: i32,
}

impl ScriptedSymbol {
    pub fn new(symbol_type: SymbolType, payload: &[u8]) -> Self {
        Self {
            symbol_type,
            payload: payload.to_vec(),
            region: (0.25, 0.25, 0.75, 0.75),
            orientation: Orientation::Upright,
            quality: 1,
        }
    }

    pub fn region(mut self, left: f64, top: f64, right: f64, bottom: f64) -> Self {
        self.region = (left, top, right, bottom);
        self
    }
}

#[derive(Debug, Default)]
pub struct EngineStats {
    pub acquisitions: AtomicUsize,
    pub decodes: AtomicUsize,
    pub failing_acquisitions: AtomicUsize,
    pub config_calls: Mutex<Vec<(SymbolType, ConfigKind, i32)>>,
    pub cache_calls: Mutex<Vec<bool>>,
    pub decoded_sizes: Mutex<Vec<(u32, u32)>>,
}

impl EngineStats {
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn config_calls(&self) -> Vec<(SymbolType, ConfigKind, i32)> {
        self.config_calls.lock().expect("stats lock").clone()
    }

    pub fn cache_calls(&self) -> Vec<bool> {
        self.cache_calls.lock().expect("stats lock").clone()
    }

    pub fn decoded_sizes(&self) -> Vec<(u32, u32)> {
        self.decoded_sizes.lock().expect("stats lock").clone()
    }
}

pub struct FakeHandle {
    enabled: HashSet<SymbolType>,
    stats: Arc<EngineStats>,
}

impl DecoderHandle for FakeHandle {
    fn set_config(&mut self, symbol_type: SymbolType, config_kind: ConfigKind, value: i32) {
        self.stats
            .config_calls
            .lock()
            .expect("stats lock")
            .push((symbol_type, config_kind, value));

        if config_kind != ConfigKind::Enable {
            return;
        }

        match (symbol_type, value) {
            (SymbolType::None, 0) => self.enabled.clear(),
            (symbol, 0) => {
                self.enabled.remove(&symbol);
            }
            (symbol, _) => {
                self.enabled.insert(symbol);
            }
        }
    }

    fn enable_cache(&mut self, enable: bool) {
        self.stats.cache_calls.lock().expect("stats lock").push(enable);
    }
}

/// Reports the scripted symbols whose type is enabled on the handle, in script order.
#[derive(Clone)]
pub struct FakeEngine {
    script: Vec<ScriptedSymbol>,
    fail_decode: bool,
    pub stats: Arc<EngineStats>,
}

impl FakeEngine {
    pub fn new(script: Vec<ScriptedSymbol>) -> Self {
        Self {
            script,
            fail_decode: false,
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn failing_decode(mut self) -> Self {
        self.fail_decode = true;
        self
    }

    /// The next `count` acquisitions fail.
    pub fn failing_acquisitions(self, count: usize) -> Self {
        self.stats.failing_acquisitions.store(count, Ordering::SeqCst);
        self
    }
}

impl DecodingEngine for FakeEngine {
    type Handle = FakeHandle;

    async fn acquire_handle(&self) -> Result<FakeHandle, DetectorError> {
        tokio::task::yield_now().await;
        self.stats.acquisitions.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .stats
            .failing_acquisitions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(DetectorError::Decode("engine module failed to load".to_string()));
        }

        Ok(FakeHandle {
            enabled: HashSet::new(),
            stats: Arc::clone(&self.stats),
        })
    }

    fn decode(
        &self,
        buffer: &CanonicalBuffer,
        handle: &mut FakeHandle,
    ) -> Result<Vec<DecodedSymbol>, DetectorError> {
        self.stats.decodes.fetch_add(1, Ordering::SeqCst);
        self.stats
            .decoded_sizes
            .lock()
            .expect("stats lock")
            .push((buffer.width, buffer.height));

        if self.fail_decode {
            return Err(DetectorError::Decode("scanner crashed".to_string()));
        }

        let (w, h) = (buffer.width as f64, buffer.height as f64);
        let symbols = self
            .script
            .iter()
            .filter(|scripted| handle.enabled.contains(&scripted.symbol_type))
            .map(|scripted| {
                let (left, top, right, bottom) = scripted.region;
                DecodedSymbol {
                    symbol_type: scripted.symbol_type,
                    // Deliberately not in corner order.
                    points: vec![
                        Point::new(right * w, bottom * h),
                        Point::new(left * w, top * h),
                        Point::new(left * w, bottom * h),
                        Point::new(right * w, top * h),
                    ],
                    payload: scripted.payload.clone(),
                    orientation: scripted.orientation,
                    quality: scripted.quality,
                }
            })
            .collect();

        Ok(symbols)
    }
}

pub fn striped(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        if x % 2 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

pub fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    striped(width, height)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}
