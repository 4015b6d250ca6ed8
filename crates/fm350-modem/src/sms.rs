//! # SMS Listing
//!
//! `AT+CMGL=4` in PDU mode returns a header line per message followed by the
//! message PDU as hex:
//!
//! ```text
//! +CMGL: <index>,<stat>,,<length>
//! 07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37
//! ```
//!
//! Every non-header line is handed to an [`SmsCodec`]. [`PduCodec`] decodes
//! single-part SMS-DELIVER PDUs in the GSM 7-bit, 8-bit and UCS-2 alphabets.

use serde::Serialize;
use thiserror::Error;

pub const CMGL_PREFIX: &str = "+CMGL: ";
const CMGL_HEADER: &str = "+CMGL:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsMessage {
    pub sender: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid envelope: {0}")]
    Envelope(String),
    #[error("undecodable message: {0}")]
    Message(String),
}

/// Hex PDU in, message out.
pub trait SmsCodec {
    fn decode(&self, pdu_hex: &str) -> Result<SmsMessage, SmsError>;
}

/// Decode every PDU line of an `AT+CMGL` reply. Lines that fail to decode
/// are logged and skipped.
pub fn decode_listing(reply: &str, codec: &dyn SmsCodec) -> Vec<SmsMessage> {
    if !reply.starts_with(CMGL_PREFIX) {
        return Vec::new();
    }
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(CMGL_HEADER))
        .filter_map(|line| match codec.decode(line) {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::warn!(pdu = line, error = %e, "skipping undecodable SMS");
                None
            }
        })
        .collect()
}

// ─── PDU Codec ──────────────────────────────────────────────────────────────

/// SMS-DELIVER decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PduCodec;

impl SmsCodec for PduCodec {
    fn decode(&self, pdu_hex: &str) -> Result<SmsMessage, SmsError> {
        let data = hex::decode(pdu_hex.trim())?;
        let tpdu = strip_smsc(&data)?;
        let deliver = match Deliver::parse(tpdu) {
            Ok(d) => d,
            // Some firmware omits the SMSC octet entirely.
            Err(_) => Deliver::parse(&data)?,
        };
        Ok(SmsMessage {
            message: deliver.text()?,
            sender: deliver.sender,
        })
    }
}

/// Skip the leading SMSC address.
fn strip_smsc(data: &[u8]) -> Result<&[u8], SmsError> {
    let len = *data
        .first()
        .ok_or_else(|| SmsError::Envelope("empty PDU".into()))? as usize;
    data.get(1 + len..)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| SmsError::Envelope(format!("SMSC length {len} exceeds PDU")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alphabet {
    Gsm7,
    Eight,
    Ucs2,
}

#[derive(Debug)]
struct Deliver {
    sender: String,
    dcs: u8,
    udhi: bool,
    udl: usize,
    ud: Vec<u8>,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8, SmsError> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| SmsError::Envelope("truncated TPDU".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SmsError> {
        let buf: &'a [u8] = self.buf;
        let s = buf
            .get(self.pos..self.pos + n)
            .ok_or_else(|| SmsError::Envelope("truncated TPDU".into()))?;
        self.pos += n;
        Ok(s)
    }

    fn rest(&self) -> &'a [u8] {
        let buf: &'a [u8] = self.buf;
        &buf[self.pos.min(buf.len())..]
    }
}

impl Deliver {
    fn parse(tpdu: &[u8]) -> Result<Deliver, SmsError> {
        let mut r = Reader { buf: tpdu, pos: 0 };
        let first = r.u8()?;
        if first & 0x03 != 0 {
            return Err(SmsError::Envelope(format!(
                "not an SMS-DELIVER (MTI {})",
                first & 0x03
            )));
        }
        let digits = r.u8()? as usize;
        let toa = r.u8()?;
        let addr = r.take(digits.div_ceil(2))?;
        let sender = decode_address(addr, digits, toa)?;
        let _pid = r.u8()?;
        let dcs = r.u8()?;
        let _scts = r.take(7)?;
        let udl = r.u8()? as usize;
        Ok(Deliver {
            sender,
            dcs,
            udhi: first & 0x40 != 0,
            udl,
            ud: r.rest().to_vec(),
        })
    }

    fn text(&self) -> Result<String, SmsError> {
        let coding = alphabet(self.dcs)?;
        match coding {
            Alphabet::Gsm7 => {
                let septets = unpack_septets(&self.ud, self.udl)?;
                let skip = if self.udhi {
                    let header = (*self.ud.first().unwrap_or(&0) as usize + 1) * 8;
                    header.div_ceil(7)
                } else {
                    0
                };
                Ok(gsm7_to_string(septets.get(skip..).unwrap_or(&[])))
            }
            Alphabet::Eight | Alphabet::Ucs2 => {
                let body = self
                    .ud
                    .get(..self.udl)
                    .ok_or_else(|| SmsError::Message("user data shorter than UDL".into()))?;
                let body = if self.udhi {
                    let header = *body.first().unwrap_or(&0) as usize + 1;
                    body.get(header..).unwrap_or(&[])
                } else {
                    body
                };
                if coding == Alphabet::Eight {
                    return Ok(String::from_utf8_lossy(body).into_owned());
                }
                if body.len() % 2 != 0 {
                    return Err(SmsError::Message("odd UCS-2 length".into()));
                }
                let units = body.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
                Ok(char::decode_utf16(units)
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect())
            }
        }
    }
}

fn alphabet(dcs: u8) -> Result<Alphabet, SmsError> {
    match dcs >> 4 {
        0x0..=0x7 => {
            if dcs & 0x20 != 0 {
                return Err(SmsError::Message("compressed text is not supported".into()));
            }
            Ok(match (dcs >> 2) & 0x03 {
                1 => Alphabet::Eight,
                2 => Alphabet::Ucs2,
                _ => Alphabet::Gsm7,
            })
        }
        0xC | 0xD => Ok(Alphabet::Gsm7),
        0xE => Ok(Alphabet::Ucs2),
        0xF if dcs & 0x04 != 0 => Ok(Alphabet::Eight),
        0xF => Ok(Alphabet::Gsm7),
        _ => Err(SmsError::Message(format!("unsupported data coding 0x{dcs:02X}"))),
    }
}

/// Originating address: swapped BCD digits, or packed GSM 7-bit when the
/// type of number is alphanumeric.
fn decode_address(octets: &[u8], digits: usize, toa: u8) -> Result<String, SmsError> {
    let ton = (toa >> 4) & 0x07;
    if ton == 0x05 {
        let septets = unpack_septets(octets, digits * 4 / 7)?;
        return Ok(gsm7_to_string(&septets));
    }
    let mut out = String::with_capacity(digits + 1);
    if ton == 0x01 {
        out.push('+');
    }
    for &b in octets {
        for nibble in [b & 0x0F, b >> 4] {
            match nibble {
                0..=9 => out.push((b'0' + nibble) as char),
                0x0A => out.push('*'),
                0x0B => out.push('#'),
                0x0C => out.push('a'),
                0x0D => out.push('b'),
                0x0E => out.push('c'),
                _ => {}
            }
        }
    }
    Ok(out)
}

fn unpack_septets(packed: &[u8], count: usize) -> Result<Vec<u8>, SmsError> {
    if packed.len() < (count * 7).div_ceil(8) {
        return Err(SmsError::Message("user data shorter than UDL".into()));
    }
    Ok((0..count)
        .map(|i| {
            let bit = i * 7;
            let (byte, shift) = (bit / 8, bit % 8);
            let mut v = packed[byte] >> shift;
            if shift > 1 {
                v |= packed.get(byte + 1).copied().unwrap_or(0) << (8 - shift);
            }
            v & 0x7F
        })
        .collect())
}

// ─── GSM 03.38 ──────────────────────────────────────────────────────────────

const ESC: u8 = 0x1B;

#[rustfmt::skip]
const GSM7_BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å',
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', ' ', 'Æ', 'æ', 'ß', 'É',
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§',
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à',
];

fn gsm7_extension(code: u8) -> Option<char> {
    Some(match code {
        0x0A => '\x0C',
        0x14 => '^',
        0x28 => '{',
        0x29 => '}',
        0x2F => '\\',
        0x3C => '[',
        0x3D => '~',
        0x3E => ']',
        0x40 => '|',
        0x65 => '€',
        _ => return None,
    })
}

fn gsm7_to_string(septets: &[u8]) -> String {
    let mut out = String::with_capacity(septets.len());
    let mut iter = septets.iter().copied();
    while let Some(code) = iter.next() {
        if code == ESC {
            if let Some(next) = iter.next() {
                out.push(gsm7_extension(next).unwrap_or(GSM7_BASIC[next as usize & 0x7F]));
            }
            continue;
        }
        out.push(GSM7_BASIC[code as usize & 0x7F]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str =
        "07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37";

    #[test]
    fn decodes_gsm7_deliver() {
        let msg = PduCodec.decode(HELLO).unwrap();
        assert_eq!(msg.sender, "27838890001");
        assert_eq!(msg.message, "hellohello");
    }

    #[test]
    fn decodes_ucs2_with_empty_smsc() {
        let pdu = "00040B917238880900F10008993092516195800400480069";
        let msg = PduCodec.decode(pdu).unwrap();
        assert_eq!(msg.sender, "+27838890001");
        assert_eq!(msg.message, "Hi");
    }

    #[test]
    fn skips_user_data_header() {
        let pdu = "00440B917238880900F1000099309251619580090500 03CC02019069".replace(' ', "");
        let msg = PduCodec.decode(&pdu).unwrap();
        assert_eq!(msg.message, "Hi");
    }

    #[test]
    fn gsm7_extension_table() {
        assert_eq!(gsm7_to_string(&[ESC, 0x65, 0x31]), "€1");
        assert_eq!(gsm7_to_string(&[0x00, 0x11]), "@_");
    }

    #[test]
    fn hex_failure() {
        assert!(matches!(PduCodec.decode("zz"), Err(SmsError::Hex(_))));
    }

    #[test]
    fn truncated_pdu_fails() {
        assert!(PduCodec.decode("0791728301").is_err());
        assert!(PduCodec.decode("").is_err());
    }

    #[test]
    fn listing_skips_headers_and_failures() {
        let reply = format!("+CMGL: 0,1,,24\n{HELLO}\n+CMGL: 1,1,,3\nDEADBEEF");
        let msgs = decode_listing(&reply, &PduCodec);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].message, "hellohello");
    }

    #[test]
    fn listing_without_prefix_is_empty() {
        assert!(decode_listing("", &PduCodec).is_empty());
        assert!(decode_listing(HELLO, &PduCodec).is_empty());
    }
}
