use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use toon_logging::toon_debug;

use crate::{Document, FetchOutput};

/// Decodes a fetched page to UTF-8: BOM, then the Content-Type charset, then
/// byte-frequency detection. Malformed sequences become U+FFFD rather than
/// failing the page.
pub fn decode_document(output: &FetchOutput) -> Document {
    let encoding = pick_encoding(&output.bytes, output.metadata.content_type.as_deref());
    let (text, _, had_errors) = encoding.decode(&output.bytes);
    if had_errors {
        toon_debug!(
            "{} contained malformed {} sequences",
            output.metadata.final_url,
            encoding.name()
        );
    }
    Document {
        url: output.metadata.final_url.clone(),
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    }
}

fn pick_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(encoding) = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::FetchMetadata;

    fn output(bytes: &'static [u8], content_type: Option<&str>) -> FetchOutput {
        FetchOutput {
            bytes: Bytes::from_static(bytes),
            metadata: FetchMetadata {
                original_url: "https://example.com/".into(),
                final_url: "https://example.com/".into(),
                content_type: content_type.map(str::to_string),
                byte_len: bytes.len() as u64,
            },
        }
    }

    #[test]
    fn charset_header_is_honoured() {
        let doc = decode_document(&output(b"caf\xe9", Some("text/html; Charset=\"ISO-8859-1\"")));
        assert_eq!(doc.html, "caf\u{e9}");
        assert_eq!(doc.encoding_label, "windows-1252");
    }

    #[test]
    fn bom_wins_over_header() {
        let doc = decode_document(&output(b"\xEF\xBB\xBFhello", Some("text/html; charset=iso-8859-1")));
        assert_eq!(doc.html, "hello");
        assert_eq!(doc.encoding_label, "UTF-8");
    }

    #[test]
    fn plain_utf8_without_header_is_detected() {
        let doc = decode_document(&output("<p>Épisode</p>".as_bytes(), None));
        assert_eq!(doc.html, "<p>Épisode</p>");
    }
}
