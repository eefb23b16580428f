//! Windows OCR API backend
//!
//! Uses the built-in Windows OCR (Media.Ocr) to read the panel crops. Line
//! granularity fits the hunt panel: each hint row comes back as one line
//! that the panel reader can compare against the marker token. Windows OCR
//! reports no confidence, so detections carry 1.0.

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::{debug, info};
use windows::{
    core::HSTRING,
    Foundation::IAsyncOperation,
    Globalization::Language,
    Graphics::Imaging::{BitmapPixelFormat, SoftwareBitmap},
    Media::Ocr::{OcrEngine as WinOcrEngine, OcrResult as WinOcrResult},
};

use super::ocr::{Detection, OcrRegion, Recognizer};

pub struct WindowsOcr {
    engine: WinOcrEngine,
    language: String,
}

impl WindowsOcr {
    /// Create an engine for the given BCP-47 language tag, falling back to
    /// the user profile languages when the tag is unsupported.
    pub fn new(language_tag: &str) -> Result<Self> {
        info!("initializing Windows OCR engine with language: {language_tag}");

        let language = Language::CreateLanguage(&HSTRING::from(language_tag))
            .context("failed to create language")?;

        if !WinOcrEngine::IsLanguageSupported(&language)
            .context("failed to check language support")?
        {
            let engine = WinOcrEngine::TryCreateFromUserProfileLanguages()
                .context("failed to create OCR engine from user profile")?;
            let fallback = engine
                .RecognizerLanguage()
                .and_then(|l| l.LanguageTag())
                .map(|t| t.to_string())
                .unwrap_or_default();
            info!("language '{language_tag}' unsupported, using '{fallback}'");
            return Ok(Self {
                engine,
                language: fallback,
            });
        }

        let engine = WinOcrEngine::TryCreateFromLanguage(&language)
            .context("failed to create OCR engine for language")?;
        Ok(Self {
            engine,
            language: language_tag.to_string(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Recognizer for WindowsOcr {
    fn read_text(&self, image: &RgbaImage, region: OcrRegion) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(vec![]);
        }
        debug!("Windows OCR: {}x{} {}", width, height, region.label());

        let bgra = rgba_to_bgra(image.as_raw());
        let bitmap = create_software_bitmap(&bgra, width, height)?;
        let result = run_ocr_sync(&self.engine, &bitmap)?;

        extract_detections(&result)
    }
}

/// Convert RGBA to BGRA (Windows expects BGRA)
fn rgba_to_bgra(rgba: &[u8]) -> Vec<u8> {
    let mut bgra = rgba.to_vec();
    for chunk in bgra.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }
    bgra
}

/// Create a SoftwareBitmap from BGRA data using CopyFromBuffer
fn create_software_bitmap(bgra_data: &[u8], width: u32, height: u32) -> Result<SoftwareBitmap> {
    use windows::Storage::Streams::{DataReader, DataWriter, InMemoryRandomAccessStream};

    let stream =
        InMemoryRandomAccessStream::new().context("failed to create in-memory stream")?;
    let writer = DataWriter::CreateDataWriter(&stream).context("failed to create data writer")?;

    writer.WriteBytes(bgra_data).context("failed to write pixel data")?;
    writer
        .StoreAsync()
        .context("failed to start store operation")?
        .get()
        .context("failed to store data")?;
    writer
        .FlushAsync()
        .context("failed to start flush operation")?
        .get()
        .context("failed to flush data")?;

    stream.Seek(0).context("failed to seek stream")?;

    let bitmap = SoftwareBitmap::Create(BitmapPixelFormat::Bgra8, width as i32, height as i32)
        .context("failed to create SoftwareBitmap")?;

    let input_stream = stream.GetInputStreamAt(0).context("failed to get input stream")?;
    let reader =
        DataReader::CreateDataReader(&input_stream).context("failed to create data reader")?;
    reader
        .LoadAsync(bgra_data.len() as u32)
        .context("failed to start load operation")?
        .get()
        .context("failed to load data")?;
    let buffer = reader
        .ReadBuffer(bgra_data.len() as u32)
        .context("failed to read buffer")?;

    bitmap
        .CopyFromBuffer(&buffer)
        .context("failed to copy buffer to bitmap")?;

    Ok(bitmap)
}

/// Run OCR synchronously (blocks until complete)
fn run_ocr_sync(engine: &WinOcrEngine, bitmap: &SoftwareBitmap) -> Result<WinOcrResult> {
    let async_op: IAsyncOperation<WinOcrResult> = engine
        .RecognizeAsync(bitmap)
        .context("failed to start OCR recognition")?;
    async_op.get().context("OCR recognition failed")
}

/// One Detection per recognized line, quad built from the union of the
/// word bounding rects.
fn extract_detections(result: &WinOcrResult) -> Result<Vec<Detection>> {
    let mut detections = Vec::new();

    let lines = result.Lines().context("failed to get OCR lines")?;
    for i in 0..lines.Size().context("failed to get lines size")? {
        let line = lines.GetAt(i).context("failed to get line")?;
        let text = line.Text().context("failed to get line text")?.to_string();

        let mut left = f32::MAX;
        let mut top = f32::MAX;
        let mut right = f32::MIN;
        let mut bottom = f32::MIN;

        let words = line.Words().context("failed to get words")?;
        for j in 0..words.Size().context("failed to get words size")? {
            let word = words.GetAt(j).context("failed to get word")?;
            let rect = word.BoundingRect().context("failed to get bounding rect")?;
            left = left.min(rect.X);
            top = top.min(rect.Y);
            right = right.max(rect.X + rect.Width);
            bottom = bottom.max(rect.Y + rect.Height);
        }
        if left > right {
            continue;
        }

        detections.push(Detection::new(
            text,
            1.0,
            [(left, top), (right, top), (right, bottom), (left, bottom)],
        ));
    }

    Ok(detections)
}
