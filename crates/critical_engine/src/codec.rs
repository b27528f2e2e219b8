use encoding_rs::{EncoderResult, Encoding, REPLACEMENT, UTF_16BE, UTF_16LE};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown text encoding {label:?}")]
    UnknownEncoding { label: String },
    #[error("character {character:?} at byte {offset} cannot be represented in {encoding}")]
    Unmappable {
        encoding: String,
        character: char,
        offset: usize,
    },
    #[error("bytes are not valid {encoding}")]
    Malformed { encoding: String },
}

/// Resolve a WHATWG encoding label such as `utf-8`, `latin1` or `shift_jis`.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, CodecError> {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(enc) if enc != REPLACEMENT => Ok(enc),
        _ => Err(CodecError::UnknownEncoding {
            label: label.to_string(),
        }),
    }
}

/// Encode `text` strictly: the first character the encoding cannot represent
/// is an error, never a substitution.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, CodecError> {
    // encoding_rs only encodes UTF-16 as UTF-8, so these two are done by hand.
    if encoding == UTF_16LE {
        return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if encoding == UTF_16BE {
        return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }

    let mut encoder = encoding.new_encoder();
    let mut output = Vec::with_capacity(text.len() + 16);
    let mut consumed = 0;
    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(
            &text[consumed..],
            &mut output,
            true,
        );
        consumed += read;
        match result {
            EncoderResult::InputEmpty => return Ok(output),
            EncoderResult::OutputFull => output.reserve(output.capacity().max(16)),
            EncoderResult::Unmappable(character) => {
                return Err(CodecError::Unmappable {
                    encoding: encoding.name().to_string(),
                    character,
                    offset: consumed.saturating_sub(character.len_utf8()),
                });
            }
        }
    }
}

/// Decode bytes with `encoding`, letting a byte order mark take precedence.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Result<String, CodecError> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(CodecError::Malformed {
            encoding: used.name().to_string(),
        });
    }
    Ok(text.into_owned())
}
