//! Packet classification.
//!
//! Turns a raw buffer into a [`CaptureRecord`]. Classification is best effort: the protocol
//! guess is a heuristic tie-break between a handful of markers, it never verifies a protocol.
//! Nothing in here does I/O or touches shared state, so the same input always yields the same
//! record apart from its timestamp.

use std::sync::Arc;

use chrono::Utc;

use super::signature_catalog::SignatureCatalog;
use super::types::{CaptureRecord, Endpoint, ProtocolGuess, SignatureMatch};

/// Number of leading bytes rendered in `hex_preview`.
pub const HEX_PREVIEW_BYTES: usize = 64;
/// Maximum number of characters kept in `decoded_text`.
pub const DECODED_TEXT_LIMIT: usize = 200;
/// Below this many printable characters a payload is treated as binary.
pub const MIN_PRINTABLE_CHARS: usize = 10;

/// Record-layer content types: change-cipher-spec, alert, handshake.
const TLS_FIRST_BYTES: [u8; 3] = [0x14, 0x15, 0x16];
const PES_MARKERS: [&[u8]; 2] = [b"PES", b"KONAMI"];
const BINARY_PREFIXES: [[u8; 2]; 2] = [[0x00, 0x01], [0x00, 0x02]];
const NOTABLE_KEYWORDS: [&str; 3] = ["pes", "konami", "lobby"];

/// Classifier bound to one signature catalog. Cheap to clone and share across listeners.
#[derive(Debug, Clone)]
pub struct PacketClassifier {
    catalog: Arc<SignatureCatalog>,
}

impl PacketClassifier {
    pub fn new(catalog: Arc<SignatureCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SignatureCatalog {
        &self.catalog
    }

    pub fn classify(&self, data: &[u8], source: Endpoint, destination: Endpoint) -> CaptureRecord {
        classify(data, source, destination, &self.catalog)
    }
}

/// Builds the full record for `data`. Tolerates empty and garbled input.
pub fn classify(
    data: &[u8],
    source: Endpoint,
    destination: Endpoint,
    catalog: &SignatureCatalog,
) -> CaptureRecord {
    let matched_signatures = match_signatures(data, catalog);
    let decoded_text = extract_printable_text(data);
    let protocol_guess = guess_protocol(data);
    let is_notable = is_notable(&matched_signatures, &decoded_text, protocol_guess);

    CaptureRecord {
        timestamp: Utc::now(),
        source,
        destination,
        size: data.len(),
        hex_preview: hex::encode(&data[..data.len().min(HEX_PREVIEW_BYTES)]),
        matched_signatures,
        decoded_text,
        protocol_guess,
        is_notable,
    }
}

/// Every catalog entry occurring in `data`, in catalog order, with its first offset.
pub fn match_signatures(data: &[u8], catalog: &SignatureCatalog) -> Vec<SignatureMatch> {
    catalog
        .iter()
        .filter_map(|entry| {
            find(data, entry.pattern()).map(|offset| SignatureMatch {
                label: entry.label().to_string(),
                pattern_hex: hex::encode(entry.pattern()),
                byte_offset: offset,
            })
        })
        .collect()
}

/// Decodes `data` as UTF-8, dropping invalid sequences, and keeps printable characters only.
///
/// Returns an empty string when fewer than [`MIN_PRINTABLE_CHARS`] characters survive.
pub fn extract_printable_text(data: &[u8]) -> String {
    let text: String = data
        .utf8_chunks()
        .flat_map(|chunk| chunk.valid().chars())
        .filter(|c| is_printable(*c))
        .take(DECODED_TEXT_LIMIT)
        .collect();

    if text.chars().count() < MIN_PRINTABLE_CHARS {
        String::new()
    } else {
        text
    }
}

/// Priority order, first hit wins: HTTP, TLS, PES markers, binary prefixes.
pub fn guess_protocol(data: &[u8]) -> ProtocolGuess {
    if contains(data, b"HTTP") {
        ProtocolGuess::Http
    } else if data.first().is_some_and(|b| TLS_FIRST_BYTES.contains(b)) {
        ProtocolGuess::Tls
    } else if PES_MARKERS.iter().any(|marker| contains(data, marker)) {
        ProtocolGuess::PesCustom
    } else if data.len() >= 2 && BINARY_PREFIXES.iter().any(|p| data[..2] == p[..]) {
        ProtocolGuess::Binary
    } else {
        ProtocolGuess::Unknown
    }
}

pub fn is_notable(matches: &[SignatureMatch], decoded_text: &str, guess: ProtocolGuess) -> bool {
    if !matches.is_empty() || guess != ProtocolGuess::Unknown {
        return true;
    }
    if decoded_text.is_empty() {
        return false;
    }
    let lowered = decoded_text.to_lowercase();
    NOTABLE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Format characters that render as nothing: soft hyphen, zero-width and bidi controls,
/// invisible operators and the byte order mark.
const INVISIBLE_FORMAT: [(char, char); 7] = [
    ('\u{00AD}', '\u{00AD}'),
    ('\u{061C}', '\u{061C}'),
    ('\u{180E}', '\u{180E}'),
    ('\u{200B}', '\u{200F}'),
    ('\u{202A}', '\u{202E}'),
    ('\u{2060}', '\u{206F}'),
    ('\u{FEFF}', '\u{FEFF}'),
];

fn is_private_use(c: char) -> bool {
    matches!(c, '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{10FFFF}')
}

fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control()
        || c.is_whitespace()
        || is_private_use(c)
        || INVISIBLE_FORMAT
            .iter()
            .any(|(lo, hi)| (*lo..=*hi).contains(&c)))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_capture::signature_catalog::SignatureEntry;

    fn run(data: &[u8]) -> CaptureRecord {
        classify(
            data,
            Endpoint::new("10.0.0.5", 50000),
            Endpoint::local(80),
            &SignatureCatalog::default(),
        )
    }

    fn offset_of(record: &CaptureRecord, label: &str) -> Option<usize> {
        record
            .matched_signatures
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.byte_offset)
    }

    #[test]
    fn test_empty_buffer() {
        let record = run(b"");

        assert_eq!(record.size, 0);
        assert_eq!(record.protocol_guess, ProtocolGuess::Unknown);
        assert!(record.matched_signatures.is_empty());
        assert!(record.decoded_text.is_empty());
        assert!(record.hex_preview.is_empty());
        assert!(!record.is_notable);
    }

    #[test]
    fn test_http_get_request() {
        let data = b"GET /XME994-E1/info/info_en.txt HTTP/1.1\r\n";
        let record = run(data);

        assert_eq!(record.protocol_guess, ProtocolGuess::Http);
        assert_eq!(offset_of(&record, "HTTP GET Request"), Some(0));
        assert_eq!(offset_of(&record, "HTTP Protocol"), Some(32));
        assert_eq!(record.matched_signatures.len(), 2);
        assert!(record.is_notable);
        assert_eq!(record.size, data.len());
        assert_eq!(record.decoded_text, "GET /XME994-E1/info/info_en.txt HTTP/1.1");
    }

    #[test]
    fn test_every_substring_signature_reported_at_first_offset() {
        let data = b"xxLOGINyyLOBBYzzLOGIN PES21 KONAMI P2P MATCH POST";
        let catalog = SignatureCatalog::default();
        let record = run(data);

        for entry in catalog.iter() {
            let expected = data
                .windows(entry.pattern().len())
                .position(|w| w == entry.pattern());
            assert_eq!(offset_of(&record, entry.label()), expected, "{}", entry.label());
        }
        assert_eq!(offset_of(&record, "Login Protocol"), Some(2));
    }

    #[test]
    fn test_matches_follow_catalog_order() {
        let record = run(b"POST then PES21");
        let labels: Vec<&str> = record
            .matched_signatures
            .iter()
            .map(|m| m.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["PES 2021 Protocol Header", "PES Binary Signature", "HTTP POST Request"]
        );
    }

    #[test]
    fn test_tls_first_byte() {
        let record = run(&[0x16, 0x03, 0x01, 0x02, 0x00, 0x01, 0x00]);
        assert_eq!(record.protocol_guess, ProtocolGuess::Tls);
        assert!(record.is_notable);

        assert_eq!(guess_protocol(&[0x14, 0x03]), ProtocolGuess::Tls);
        assert_eq!(guess_protocol(&[0x15]), ProtocolGuess::Tls);
    }

    #[test]
    fn test_priority_order() {
        // HTTP beats a TLS first byte
        assert_eq!(guess_protocol(b"\x16HTTP"), ProtocolGuess::Http);
        // TLS first byte beats PES markers
        assert_eq!(guess_protocol(b"\x16PES21"), ProtocolGuess::Tls);
        // PES markers beat binary prefixes
        assert_eq!(guess_protocol(b"\x00\x01KONAMI"), ProtocolGuess::PesCustom);
        assert_eq!(guess_protocol(b"\x00\x02\x10\x20"), ProtocolGuess::Binary);
        assert_eq!(guess_protocol(b"\x00\x03\x10\x20"), ProtocolGuess::Unknown);
        assert_eq!(guess_protocol(b"\x00"), ProtocolGuess::Unknown);
    }

    #[test]
    fn test_binary_prefix_only_counts_at_start() {
        assert_eq!(guess_protocol(b"\x09\x00\x01"), ProtocolGuess::Unknown);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let data = b"\x00\x01LOBBY join request for room 12";
        let mut first = run(data);
        let second = run(data);
        first.timestamp = second.timestamp;
        assert_eq!(first, second);
    }

    #[test]
    fn test_hex_preview_is_bounded() {
        let data = vec![0xabu8; 300];
        let record = run(&data);
        assert_eq!(record.size, 300);
        assert_eq!(record.hex_preview.len(), HEX_PREVIEW_BYTES * 2);
        assert!(record.hex_preview.chars().all(|c| c == 'a' || c == 'b'));
    }

    #[test]
    fn test_decoded_text_threshold() {
        assert_eq!(extract_printable_text(b"short"), "");
        assert_eq!(extract_printable_text(b"123456789"), "");
        assert_eq!(extract_printable_text(b"1234567890"), "1234567890");
    }

    #[test]
    fn test_decoded_text_drops_invalid_and_control_bytes() {
        let data = b"\xff\xfeHello\r\n\tlobby\x00 world\xc3";
        assert_eq!(extract_printable_text(data), "Hellolobby world");
    }

    #[test]
    fn test_decoded_text_drops_invisible_and_private_use_chars() {
        let data = "\u{FEFF}lobby\u{200B}list\u{00AD}\u{E000} ready".as_bytes();
        assert_eq!(extract_printable_text(data), "lobbylist ready");
        assert!(is_printable('é'));
        assert!(!is_printable('\u{202E}'));
        assert!(!is_printable('\u{10FFFD}'));
    }

    #[test]
    fn test_decoded_text_truncated() {
        let data = "é".repeat(500);
        let text = extract_printable_text(data.as_bytes());
        assert_eq!(text.chars().count(), DECODED_TEXT_LIMIT);
    }

    #[test]
    fn test_keyword_makes_record_notable() {
        let record = run(b"welcome to the konami network!");
        assert!(record.matched_signatures.is_empty());
        assert_eq!(record.protocol_guess, ProtocolGuess::Unknown);
        assert!(record.is_notable);
    }

    #[test]
    fn test_plain_text_without_keywords_is_routine() {
        let record = run(b"just some ordinary chatter here");
        assert!(!record.decoded_text.is_empty());
        assert!(!record.is_notable);
    }

    #[test]
    fn test_garbage_is_routine() {
        let record = run(&[0x7f, 0x80, 0x81, 0xfe, 0x03]);
        assert_eq!(record.protocol_guess, ProtocolGuess::Unknown);
        assert!(record.decoded_text.is_empty());
        assert!(!record.is_notable);
    }

    #[test]
    fn test_custom_catalog() {
        let catalog = Arc::new(SignatureCatalog::from_entries(vec![
            SignatureEntry::new(b"\xca\xfe".to_vec(), "Magic").unwrap(),
        ]));
        let classifier = PacketClassifier::new(catalog);
        let record = classifier.classify(
            b"\x01\xca\xfe\xca\xfe",
            Endpoint::new("10.0.0.1", 1),
            Endpoint::local(5739),
        );
        assert_eq!(
            record.matched_signatures,
            vec![SignatureMatch {
                label: "Magic".into(),
                pattern_hex: "cafe".into(),
                byte_offset: 1
            }]
        );
        assert!(record.is_notable);
    }
}
