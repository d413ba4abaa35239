//! Parser for the identity EEPROM carried by every FRU.
//!
//! Layout (Meta FBOSS EEPROM v5): two magic bytes `0xFB 0xFB`, a format
//! version byte, one reserved byte, then type/length/value records until the
//! CRC record or erased (`0xFF`) space.

const MAGIC: [u8; 2] = [0xFB, 0xFB];
const HEADER_LEN: usize = 4;
const SUPPORTED_VERSIONS: &[u8] = &[5, 6];

const TYPE_PRODUCT_NAME: u8 = 1;
const TYPE_PRODUCT_PART_NUMBER: u8 = 2;
const TYPE_PRODUCT_SERIAL_NUMBER: u8 = 11;
const TYPE_CRC16: u8 = 0xFA;
const TYPE_ERASED: u8 = 0xFF;

/// Identity fields read from a FRU EEPROM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FruIdentity {
    pub version: u8,
    pub product_name: String,
    pub part_number: Option<String>,
    pub serial_number: Option<String>,
}

pub fn parse_identity(contents: &[u8]) -> Result<FruIdentity, String> {
    if contents.len() < HEADER_LEN {
        return Err(format!("{} byte(s) is shorter than the header", contents.len()));
    }
    if contents[..2] != MAGIC {
        return Err(format!(
            "bad magic {:#04x}{:02x}",
            contents[0], contents[1]
        ));
    }
    let version = contents[2];
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(format!("unsupported format version {}", version));
    }

    let mut identity = FruIdentity {
        version,
        ..Default::default()
    };
    let mut product_name = None;
    let mut offset = HEADER_LEN;
    while offset + 2 <= contents.len() {
        let kind = contents[offset];
        let len = contents[offset + 1] as usize;
        if kind == TYPE_CRC16 || kind == TYPE_ERASED {
            break;
        }
        let start = offset + 2;
        let end = start + len;
        if end > contents.len() {
            return Err(format!("record {} at offset {} runs past the end", kind, offset));
        }
        let value = decode_text(&contents[start..end]);
        match kind {
            TYPE_PRODUCT_NAME => product_name = Some(value),
            TYPE_PRODUCT_PART_NUMBER => identity.part_number = Some(value),
            TYPE_PRODUCT_SERIAL_NUMBER => identity.serial_number = Some(value),
            _ => {}
        }
        offset = end;
    }

    match product_name {
        Some(name) if !name.is_empty() => {
            identity.product_name = name;
            Ok(identity)
        }
        _ => Err("no product name record".to_string()),
    }
}

/// Text fields are padded with NUL or erased bytes
fn decode_text(raw: &[u8]) -> String {
    let end = raw
        .iter()
        .position(|b| *b == 0x00 || *b == 0xFF)
        .unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

#[cfg(test)]
pub(crate) fn encode_identity(product_name: &str, serial: Option<&str>) -> Vec<u8> {
    let mut out = vec![0xFB, 0xFB, 5, 0xFF];
    out.push(TYPE_PRODUCT_NAME);
    out.push(product_name.len() as u8);
    out.extend_from_slice(product_name.as_bytes());
    if let Some(serial) = serial {
        out.push(TYPE_PRODUCT_SERIAL_NUMBER);
        out.push(serial.len() as u8);
        out.extend_from_slice(serial.as_bytes());
    }
    out.extend_from_slice(&[TYPE_CRC16, 2, 0x00, 0x00]);
    out.resize(out.len() + 16, 0xFF);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_name_and_serial() {
        let raw = encode_identity("PIM16Q", Some("SN1234"));
        let identity = parse_identity(&raw).unwrap();
        assert_eq!(identity.product_name, "PIM16Q");
        assert_eq!(identity.serial_number.as_deref(), Some("SN1234"));
        assert_eq!(identity.part_number, None);
        assert_eq!(identity.version, 5);
    }

    #[test]
    fn test_padded_name_is_trimmed() {
        let mut raw = vec![0xFB, 0xFB, 5, 0xFF, TYPE_PRODUCT_NAME, 8];
        raw.extend_from_slice(b"SCM\0\0\0\0\0");
        assert_eq!(parse_identity(&raw).unwrap().product_name, "SCM");
    }

    #[test]
    fn test_blank_eeprom_is_rejected() {
        let raw = vec![0xFF; 64];
        assert!(parse_identity(&raw).unwrap_err().contains("bad magic"));
    }

    #[test]
    fn test_missing_product_name_is_rejected() {
        let raw = vec![0xFB, 0xFB, 5, 0xFF, TYPE_PRODUCT_PART_NUMBER, 2, b'7', b'3'];
        assert_eq!(parse_identity(&raw).unwrap_err(), "no product name record");
    }

    #[test]
    fn test_truncated_record_is_rejected() {
        let raw = vec![0xFB, 0xFB, 5, 0xFF, TYPE_PRODUCT_NAME, 10, b'P', b'I'];
        assert!(parse_identity(&raw).unwrap_err().contains("runs past the end"));
    }

    #[test]
    fn test_unsupported_version() {
        let raw = vec![0xFB, 0xFB, 3, 0xFF];
        assert!(parse_identity(&raw).unwrap_err().contains("version 3"));
    }
}
