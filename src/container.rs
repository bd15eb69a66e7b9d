// Binary container extraction
//
// DWD ships 10-minute climate series as ZIP archives holding one `.txt`
// product file (plus metadata members), and MOSMIX forecasts as KMZ archives
// holding a single KML document. Everything is read in memory.

use std::io::{Cursor, Read};

use tracing::{debug, instrument};
use zip::ZipArchive;

/// Suffix of the product member inside DWD climate ZIP archives
pub const TEXT_MEMBER_SUFFIX: &str = ".txt";

/// Upper bound on the pre-allocation for a member, as a multiple of the archive size
const MAX_EXPANSION_HINT: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    None,
    Zip,
    Kmz,
}

/// Declared character encoding of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// ISO-8859-1, used by every DWD text product
    Latin1,
    Utf8,
}

impl Encoding {
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Utf8 => "UTF-8",
        }
    }

    /// Decode without any replacement-character fallback
    pub fn decode(self, bytes: &[u8]) -> Result<String, ContainerError> {
        match self {
            // Every byte is a valid ISO-8859-1 code point of the same value
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| ContainerError::Decode {
                    encoding: self.label(),
                    offset: e.valid_up_to(),
                }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("Archive contains no entries")]
    EmptyContainer,

    #[error("No archive member ends with '{suffix}' (members: {members:?})")]
    MissingMember {
        suffix: &'static str,
        members: Vec<String>,
    },

    #[error("Bytes are not valid {encoding} (first invalid byte at offset {offset})")]
    Decode {
        encoding: &'static str,
        offset: usize,
    },

    #[error("Unreadable archive: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),

    #[error("Failed to read archive member '{member}': {source}")]
    Read {
        member: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bytes as delivered by the fetch step, with their declared encoding and container
#[derive(Debug, Clone)]
pub struct RawPayload {
    bytes: Vec<u8>,
    encoding: Encoding,
    container: ContainerKind,
}

impl RawPayload {
    /// New payload with the DWD default encoding (ISO-8859-1)
    pub fn new(bytes: Vec<u8>, container: ContainerKind) -> Self {
        Self {
            bytes,
            encoding: Encoding::Latin1,
            container,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decoded text of the single relevant member (or of the bytes themselves)
    pub fn extract_text(&self) -> Result<String, ContainerError> {
        extract_text(&self.bytes, self.container, self.encoding)
    }
}

/// Decoded text of the relevant member, using the DWD legacy encoding
pub fn parse_container(bytes: &[u8], kind: ContainerKind) -> Result<String, ContainerError> {
    extract_text(bytes, kind, Encoding::Latin1)
}

#[instrument(skip(bytes), fields(size = bytes.len()))]
fn extract_text(
    bytes: &[u8],
    kind: ContainerKind,
    encoding: Encoding,
) -> Result<String, ContainerError> {
    match kind {
        ContainerKind::None => encoding.decode(bytes),
        ContainerKind::Zip | ContainerKind::Kmz => {
            let member = read_member(bytes, kind)?;
            encoding.decode(&member)
        }
    }
}

fn read_member(bytes: &[u8], kind: ContainerKind) -> Result<Vec<u8>, ContainerError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    if archive.len() == 0 {
        return Err(ContainerError::EmptyContainer);
    }

    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        names.push(archive.by_index_raw(index)?.name().to_string());
    }
    debug!("Archive members: {:?}", names);

    // KMZ carries exactly one KML document, always first
    let index = match kind {
        ContainerKind::Kmz => 0,
        _ => names
            .iter()
            .position(|name| name.ends_with(TEXT_MEMBER_SUFFIX))
            .ok_or_else(|| ContainerError::MissingMember {
                suffix: TEXT_MEMBER_SUFFIX,
                members: names.clone(),
            })?,
    };

    let mut member = archive.by_index(index)?;
    // The declared size comes from the archive header; cap the hint by the input size
    let hint = member.size().min(bytes.len() as u64 * MAX_EXPANSION_HINT);
    let mut content = Vec::with_capacity(usize::try_from(hint).unwrap_or(0));
    member
        .read_to_end(&mut content)
        .map_err(|source| ContainerError::Read {
            member: names[index].clone(),
            source,
        })?;

    debug!("Extracted member '{}' ({} bytes)", names[index], content.len());
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn archive(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in members {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_latin1_decodes_umlauts() {
        let text = Encoding::Latin1.decode(b"Th\xfcringen").unwrap();
        assert_eq!(text, "Thüringen");
    }

    #[test]
    fn test_utf8_decode_error_is_fatal() {
        let result = Encoding::Utf8.decode(b"ok\xff");
        assert!(matches!(
            result,
            Err(ContainerError::Decode { encoding: "UTF-8", offset: 2 })
        ));
    }

    #[test]
    fn test_plain_bytes_decoded_directly() {
        let text = parse_container(b"ID ICAO\n", ContainerKind::None).unwrap();
        assert_eq!(text, "ID ICAO\n");
    }

    #[test]
    fn test_zip_picks_first_text_member() {
        let bytes = archive(&[
            ("Metadaten_Geographie_00044.html", b"<html/>"),
            ("produkt_zehn_now_rr_00044.txt", b"STATIONS_ID;eor"),
            ("other.txt", b"ignored"),
        ]);

        let text = parse_container(&bytes, ContainerKind::Zip).unwrap();
        assert_eq!(text, "STATIONS_ID;eor");
    }

    #[test]
    fn test_zip_without_text_member() {
        let bytes = archive(&[("readme.html", b"<html/>")]);

        match parse_container(&bytes, ContainerKind::Zip) {
            Err(ContainerError::MissingMember { suffix, members }) => {
                assert_eq!(suffix, ".txt");
                assert_eq!(members, vec!["readme.html".to_string()]);
            }
            other => panic!("Expected MissingMember, got {other:?}"),
        }
    }

    #[test]
    fn test_kmz_takes_first_member_regardless_of_name() {
        let bytes = archive(&[("MOSMIX_L_2024010103_10015.kml", b"<kml/>"), ("x.txt", b"no")]);

        let text = parse_container(&bytes, ContainerKind::Kmz).unwrap();
        assert_eq!(text, "<kml/>");
    }

    #[test]
    fn test_empty_archive() {
        let bytes = archive(&[]);

        assert!(matches!(
            parse_container(&bytes, ContainerKind::Kmz),
            Err(ContainerError::EmptyContainer)
        ));
        assert!(matches!(
            parse_container(&bytes, ContainerKind::Zip),
            Err(ContainerError::EmptyContainer)
        ));
    }

    #[test]
    fn test_oversized_member_declaration_is_not_preallocated() {
        let mut bytes = archive(&[("produkt_zehn_now_tu_01048.txt", b"STATIONS_ID;eor")]);

        // Inflate the uncompressed size field of the central directory entry
        let central = bytes
            .windows(4)
            .rposition(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        // A bogus size either reads fine or fails cleanly; it never drives allocation
        match parse_container(&bytes, ContainerKind::Zip) {
            Ok(text) => assert_eq!(text, "STATIONS_ID;eor"),
            Err(ContainerError::Read { member, .. }) => {
                assert_eq!(member, "produkt_zehn_now_tu_01048.txt")
            }
            Err(ContainerError::InvalidArchive(_)) => {}
            Err(other) => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_not_an_archive() {
        let result = parse_container(b"definitely not a zip", ContainerKind::Zip);
        assert!(matches!(result, Err(ContainerError::InvalidArchive(_))));
    }

    #[test]
    fn test_payload_honours_declared_encoding() {
        let payload = RawPayload::new("Köln".as_bytes().to_vec(), ContainerKind::None)
            .with_encoding(Encoding::Utf8);
        assert_eq!(payload.extract_text().unwrap(), "Köln");

        let latin = RawPayload::new(b"K\xf6ln".to_vec(), ContainerKind::None);
        assert_eq!(latin.extract_text().unwrap(), "Köln");
    }
}
