use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode a JSON payload into UTF-8 using: BOM -> Content-Type charset -> valid UTF-8 -> chardetng.
pub fn decode_json_text(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedText, DecodeError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    if std::str::from_utf8(bytes).is_ok() {
        return decode_with(bytes, UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches([' ', '"', '\''].as_ref()))
        })
        .next()
        .map(|s| s.to_string())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedText, DecodeError> {
    let (text, had_errors) = enc.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(br#"{"a":1}"#);
        let decoded = decode_json_text(&bytes, None).unwrap();
        assert_eq!(decoded.text, r#"{"a":1}"#);
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn honours_header_charset() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(r#"{"label":"絵巻"}"#);
        let decoded =
            decode_json_text(&bytes, Some("application/json; Charset=\"Shift_JIS\"")).unwrap();
        assert_eq!(decoded.text, r#"{"label":"絵巻"}"#);
        assert_eq!(decoded.encoding_label, "Shift_JIS");
    }

    #[test]
    fn plain_utf8_without_hints() {
        let decoded = decode_json_text("{\"label\":\"東京\"}".as_bytes(), None).unwrap();
        assert_eq!(decoded.encoding_label, "UTF-8");
        assert!(decoded.text.contains("東京"));
    }

    #[test]
    fn reports_invalid_bytes_for_declared_charset() {
        let err = decode_json_text(&[0xFE, 0xFD], Some("application/json; charset=utf-8"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::DecodeFailure { .. }));
    }
}
