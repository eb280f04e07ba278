//! Response body compression modes.

use std::io::Write;

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression as Level;
use serde::{Deserialize, Serialize};

const BROTLI_BUFFER: usize = 4096;
const BROTLI_QUALITY: u32 = 5;
const BROTLI_WINDOW: u32 = 22;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Brotli,
    Deflate,
}

impl Compression {
    /// `Content-Encoding` token, `None` for no compression.
    pub fn encoding_token(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gzip"),
            Compression::Brotli => Some("br"),
            Compression::Deflate => Some("deflate"),
        }
    }

    /// Compress `data`. `Deflate` produces the zlib format HTTP's `deflate` coding expects.
    pub fn compress(self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Level::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Compression::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Level::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Compression::Brotli => {
                let mut encoder = brotli::CompressorWriter::new(
                    Vec::new(),
                    BROTLI_BUFFER,
                    BROTLI_QUALITY,
                    BROTLI_WINDOW,
                );
                encoder.write_all(data)?;
                encoder.flush()?;
                Ok(encoder.into_inner())
            }
        }
    }

    /// Pick a mode from an `Accept-Encoding` value. Prefers br, then gzip, then deflate;
    /// codings listed with `q=0` are skipped.
    pub fn negotiate(accept_encoding: &str) -> Self {
        let accepted: Vec<&str> = accept_encoding
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split(';').map(str::trim);
                let coding = parts.next()?;
                let refused = parts.any(|p| {
                    p.strip_prefix("q=")
                        .and_then(|q| q.parse::<f32>().ok())
                        .is_some_and(|q| q == 0.0)
                });
                (!coding.is_empty() && !refused).then_some(coding)
            })
            .collect();
        let has = |token: &str| accepted.iter().any(|c| c.eq_ignore_ascii_case(token));
        if has("br") {
            Compression::Brotli
        } else if has("gzip") {
            Compression::Gzip
        } else if has("deflate") {
            Compression::Deflate
        } else {
            Compression::None
        }
    }
}
