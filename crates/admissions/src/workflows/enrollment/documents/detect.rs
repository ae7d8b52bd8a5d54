//! Content sniffing for uploaded documents.
//!
//! Detection looks at the leading bytes only; the submitted filename is never trusted.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const SNIFF_LEN: usize = 16;

/// Accepted document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
    Tiff,
}

impl DocumentFormat {
    pub const fn essence(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Png => "image/png",
            DocumentFormat::Jpeg => "image/jpeg",
            DocumentFormat::Gif => "image/gif",
            DocumentFormat::Bmp => "image/bmp",
            DocumentFormat::Webp => "image/webp",
            DocumentFormat::Tiff => "image/tiff",
        }
    }

    pub fn mime(self) -> mime::Mime {
        match self {
            DocumentFormat::Pdf => mime::APPLICATION_PDF,
            DocumentFormat::Png => mime::IMAGE_PNG,
            DocumentFormat::Jpeg => mime::IMAGE_JPEG,
            DocumentFormat::Gif => mime::IMAGE_GIF,
            DocumentFormat::Bmp => mime::IMAGE_BMP,
            DocumentFormat::Webp | DocumentFormat::Tiff => self
                .essence()
                .parse()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        }
    }

    pub const fn is_image(self) -> bool {
        !matches!(self, DocumentFormat::Pdf)
    }
}

/// Outcome of sniffing a document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detected {
    Supported(DocumentFormat),
    Executable,
    Unsupported,
}

pub fn detect(header: &[u8]) -> Detected {
    if is_executable(header) {
        return Detected::Executable;
    }

    let format = if header.starts_with(b"%PDF-") {
        DocumentFormat::Pdf
    } else if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        DocumentFormat::Png
    } else if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        DocumentFormat::Jpeg
    } else if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        DocumentFormat::Gif
    } else if header.len() >= 12 && header.starts_with(b"RIFF") && &header[8..12] == b"WEBP" {
        DocumentFormat::Webp
    } else if header.starts_with(b"II*\0") || header.starts_with(b"MM\0*") {
        DocumentFormat::Tiff
    } else if header.len() >= 6 && header.starts_with(b"BM") {
        DocumentFormat::Bmp
    } else {
        return Detected::Unsupported;
    };

    Detected::Supported(format)
}

/// Sniff a staged file from disk.
pub fn detect_file(path: &Path) -> io::Result<Detected> {
    let mut header = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(detect(&header))
}

fn is_executable(header: &[u8]) -> bool {
    const SIGNATURES: [&[u8]; 8] = [
        b"\x7fELF",
        b"MZ",
        b"#!",
        &[0xFE, 0xED, 0xFA, 0xCE],
        &[0xFE, 0xED, 0xFA, 0xCF],
        &[0xCE, 0xFA, 0xED, 0xFE],
        &[0xCF, 0xFA, 0xED, 0xFE],
        &[0xCA, 0xFE, 0xBA, 0xBE],
    ];

    SIGNATURES
        .iter()
        .any(|signature| header.starts_with(signature))
}
