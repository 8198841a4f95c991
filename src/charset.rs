/*!
The [`Charset`] type.

A charset turns rendered text into the bytes written to a log file. Characters that can't be represented are replaced with `?`.
*/

use std::fmt;

use encoding_rs::{EncoderResult, Encoding};

use crate::diagnostics::Diagnostics;

/**
The character encoding of a log file.
*/
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
    Latin1,
    /**
    UTF-16 in either byte order.

    When `bom` is set every encoded record starts with a byte-order mark. The mark is written once at the start of a file and stripped from records by [`crate::raw::CharsetAdjusted`].
    */
    Utf16 {
        big_endian: bool,
        bom: bool,
    },
    /**
    Any other encoding known to `encoding_rs`.
    */
    Other(&'static Encoding),
}

const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];

impl Default for Charset {
    fn default() -> Self {
        Charset::Utf8
    }
}

impl Charset {
    /**
    Find a charset by name.

    Names are matched ignoring case, surrounding whitespace, and `-`/`_` separators, so `utf-8`, `UTF8`, and `Utf_8` are all the same charset.
    */
    pub fn lookup(name: &str) -> Option<Charset> {
        let normalized = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match &*normalized {
            "utf8" => return Some(Charset::Utf8),
            "ascii" | "usascii" | "us" | "iso646us" | "ansix3.41968" | "cp367" => {
                return Some(Charset::Ascii)
            }
            "latin1" | "l1" | "iso88591" | "iso885911987" | "cp819" => {
                return Some(Charset::Latin1)
            }
            "utf16" => {
                return Some(Charset::Utf16 {
                    big_endian: true,
                    bom: true,
                })
            }
            "utf16be" => {
                return Some(Charset::Utf16 {
                    big_endian: true,
                    bom: false,
                })
            }
            "utf16le" => {
                return Some(Charset::Utf16 {
                    big_endian: false,
                    bom: false,
                })
            }
            _ => (),
        }

        let encoding = Encoding::for_label(name.trim().as_bytes())?;

        // Encodings that `encoding_rs` can only decode, like UTF-16 and `replacement`,
        // map onto UTF-8 for output
        let encoding = encoding.output_encoding();

        if encoding == encoding_rs::UTF_8 {
            Some(Charset::Utf8)
        } else {
            Some(Charset::Other(encoding))
        }
    }

    /**
    Find a charset by name, falling back to the default if `name` isn't known.

    An unknown name is reported to `diagnostics` once.
    */
    pub fn lookup_or_default(name: &str, diagnostics: impl Diagnostics) -> Charset {
        Charset::lookup(name).unwrap_or_else(|| {
            let fallback = Charset::default();

            diagnostics.error(format_args!(
                "invalid charset {name:?}; falling back to {fallback}"
            ));

            fallback
        })
    }

    /**
    The canonical name of this charset.
    */
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Ascii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf16 { bom: true, .. } => "UTF-16",
            Charset::Utf16 {
                big_endian: true, ..
            } => "UTF-16BE",
            Charset::Utf16 { .. } => "UTF-16LE",
            Charset::Other(encoding) => encoding.name(),
        }
    }

    /**
    The preamble that starts every record encoded with this charset.

    It must appear once at the start of a file, not once per record.
    */
    pub fn header(&self) -> &'static [u8] {
        match self {
            Charset::Utf16 {
                bom: true,
                big_endian: true,
            } => UTF16_BE_BOM,
            Charset::Utf16 {
                bom: true,
                big_endian: false,
            } => UTF16_LE_BOM,
            _ => &[],
        }
    }

    /**
    Encode `text` onto the end of `buf`.

    Each call is encoded independently, so charsets with a [`Charset::header`] emit it every time.
    */
    pub fn encode(&self, text: &str, buf: &mut Vec<u8>) {
        match *self {
            Charset::Utf8 => buf.extend_from_slice(text.as_bytes()),
            Charset::Ascii => buf.extend(
                text.chars()
                    .map(|c| if c.is_ascii() { c as u8 } else { b'?' }),
            ),
            Charset::Latin1 => buf.extend(text.chars().map(|c| {
                if (c as u32) <= 0xFF {
                    c as u8
                } else {
                    b'?'
                }
            })),
            Charset::Utf16 { big_endian, .. } => {
                buf.extend_from_slice(self.header());

                for unit in text.encode_utf16() {
                    let bytes = if big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };

                    buf.extend_from_slice(&bytes);
                }
            }
            Charset::Other(encoding) => encode_with(encoding, text, buf),
        }
    }

    /**
    The encoded form of a line terminator.
    */
    pub fn newline(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode("\n", &mut buf);

        let header = self.header();
        buf.drain(..header.len());

        buf
    }
}

fn encode_with(encoding: &'static Encoding, mut text: &str, buf: &mut Vec<u8>) {
    let mut encoder = encoding.new_encoder();

    loop {
        buf.reserve(
            encoder
                .max_buffer_length_from_utf8_without_replacement(text.len())
                .unwrap_or(text.len() * 4)
                + 1,
        );

        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(text, buf, true);
        text = &text[read..];

        match result {
            EncoderResult::InputEmpty => return,
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(_) => buf.push(b'?'),
        }
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.name())
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
