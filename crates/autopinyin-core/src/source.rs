use crate::error::Result;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

/// Reads a text file to type, with CRLF line endings folded to `\n`.
pub fn load_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let raw = std::fs::read(path.as_ref())?;
    let text = decode_text(&raw);
    Ok(text.replace("\r\n", "\n"))
}

/// BOM first, then UTF-8, then GBK.
pub fn decode_text(raw: &[u8]) -> Cow<'_, str> {
    if let Some((enc, bom_len)) = encoding_rs::Encoding::for_bom(raw) {
        debug!("Decoded using BOM: {}", enc.name());
        let (cow, _, had_errors) = enc.decode(&raw[bom_len..]);
        if had_errors {
            warn!("Decode had errors (replacement characters used)");
        }
        return cow;
    }

    match std::str::from_utf8(raw) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            debug!("UTF-8 decode failed, falling back to GBK");
            let (cow, _, had_errors) = encoding_rs::GBK.decode(raw);
            if had_errors {
                warn!("GBK decode had errors");
            }
            cow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("你好，world".as_bytes()), "你好，world");
    }

    #[test]
    fn test_decode_gbk() {
        let (bytes, _, _) = encoding_rs::GBK.encode("世界");
        assert_eq!(decode_text(&bytes), "世界");
    }

    #[test]
    fn test_decode_utf16_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "中文".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes), "中文");
    }
}
