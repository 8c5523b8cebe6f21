use crate::engines::locate_tesseract;
use crate::Args;
use std::path::PathBuf;

/// Fixed recognition parameters passed to tesseract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrSettings {
    /// Language model (e.g., "eng")
    pub language: String,
    /// Page segmentation mode; 6 treats the page as one uniform text block
    pub psm: u8,
    /// OCR engine mode; 3 lets tesseract pick
    pub oem: u8,
    pub dpi: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            psm: 6,
            oem: 3,
            dpi: 300,
        }
    }
}

/// Server configuration, resolved once at process start
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub ocr: OcrSettings,
    /// Resolved tesseract executable; `None` means OCR is unavailable
    pub tesseract_cmd: Option<PathBuf>,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            max_file_size: args.max_file_size,
            ocr: OcrSettings {
                language: args.language.clone(),
                psm: args.psm,
                oem: args.oem,
                dpi: args.dpi,
            },
            tesseract_cmd: locate_tesseract(args.tesseract_cmd.as_deref()),
        }
    }
}
