//! A minimal byte-level JSON cursor, used only to find where a value
//! starts and ends without parsing it. `serde_json` has no streaming
//! equivalent of quick-xml's pull reader — `Deserializer::from_reader`'s
//! `StreamDeserializer` splits on top-level whitespace-separated values,
//! not on array elements nested inside a `{"epcisBody": {"eventList": [...]}}`
//! wrapper — so `eventList` is walked by hand here, byte by byte, and each
//! element's raw text is handed to `serde_json::from_str` one at a time.
//! Everything outside `eventList` is small enough that slicing its raw
//! text and parsing that with `serde_json::Value` is simplest.

use std::io::{BufRead, Read};

use crate::error::{CodecError, CodecResult};

pub struct JsonCursor<R: BufRead> {
    reader: R,
    peeked: Option<u8>,
}

impl<R: BufRead> JsonCursor<R> {
    pub fn new(reader: R) -> Self {
        JsonCursor { reader, peeked: None }
    }

    fn fill(&mut self) -> CodecResult<Option<u8>> {
        if self.peeked.is_none() {
            let mut byte = [0u8; 1];
            let n = self.reader.read(&mut byte)?;
            self.peeked = if n == 0 { None } else { Some(byte[0]) };
        }
        Ok(self.peeked)
    }

    pub fn peek(&mut self) -> CodecResult<Option<u8>> {
        self.fill()
    }

    pub fn next_byte(&mut self) -> CodecResult<Option<u8>> {
        let byte = self.fill()?;
        self.peeked = None;
        Ok(byte)
    }

    fn eof(context: &str) -> CodecError {
        CodecError::malformed(format!("unexpected end of input {context}"))
    }

    pub fn skip_ws(&mut self) -> CodecResult<()> {
        while let Some(b) = self.peek()? {
            if b.is_ascii_whitespace() {
                self.next_byte()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    pub fn expect(&mut self, byte: u8) -> CodecResult<()> {
        match self.next_byte()? {
            Some(b) if b == byte => Ok(()),
            Some(other) => Err(CodecError::malformed(format!(
                "expected {:?}, found {:?}",
                byte as char, other as char
            ))),
            None => Err(Self::eof("while expecting a token")),
        }
    }

    /// Reads a JSON string literal, already unescaped, not including the
    /// surrounding quotes. Assumes the next non-whitespace byte is `"`.
    pub fn read_string(&mut self) -> CodecResult<String> {
        self.skip_ws()?;
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.next_byte()?.ok_or_else(|| Self::eof("inside a string"))? {
                b'"' => break,
                b'\\' => {
                    let escaped = self.next_byte()?.ok_or_else(|| Self::eof("inside a string escape"))?;
                    match escaped {
                        b'"' => out.push(b'"'),
                        b'\\' => out.push(b'\\'),
                        b'/' => out.push(b'/'),
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'u' => {
                            let code = self.read_hex4()?;
                            let mut buf = [0u16; 2];
                            buf[0] = code;
                            let ch = if (0xD800..=0xDBFF).contains(&code) {
                                self.expect(b'\\')?;
                                self.expect(b'u')?;
                                buf[1] = self.read_hex4()?;
                                char::decode_utf16(buf.iter().copied())
                                    .next()
                                    .and_then(|r| r.ok())
                                    .ok_or_else(|| CodecError::malformed("invalid surrogate pair in \\u escape"))?
                            } else {
                                char::from_u32(code as u32).ok_or_else(|| CodecError::malformed("invalid \\u escape"))?
                            };
                            let mut encode_buf = [0u8; 4];
                            out.extend_from_slice(ch.encode_utf8(&mut encode_buf).as_bytes());
                        }
                        other => return Err(CodecError::malformed(format!("bad escape \\{}", other as char))),
                    }
                }
                b => out.push(b),
            }
        }
        String::from_utf8(out).map_err(|e| CodecError::malformed(format!("string is not valid UTF-8: {e}")))
    }

    fn read_hex4(&mut self) -> CodecResult<u16> {
        let mut value: u16 = 0;
        for _ in 0..4 {
            let b = self.next_byte()?.ok_or_else(|| Self::eof("inside a \\u escape"))?;
            let digit = (b as char)
                .to_digit(16)
                .ok_or_else(|| CodecError::malformed("bad hex digit in \\u escape"))?;
            value = value * 16 + digit as u16;
        }
        Ok(value)
    }

    /// Reads the raw source text of the next JSON value — object, array,
    /// string, or bare literal (number/`true`/`false`/`null`) — verbatim,
    /// so the caller can hand it straight to `serde_json::from_str`.
    pub fn read_raw_value(&mut self) -> CodecResult<String> {
        self.skip_ws()?;
        let mut raw = Vec::new();
        match self.peek()?.ok_or_else(|| Self::eof("where a value was expected"))? {
            b'{' | b'[' => {
                let (open, close) = if self.peek()? == Some(b'{') { (b'{', b'}') } else { (b'[', b']') };
                let mut depth: u32 = 0;
                let mut in_string = false;
                let mut escape = false;
                loop {
                    let b = self.next_byte()?.ok_or_else(|| Self::eof("inside a nested value"))?;
                    raw.push(b);
                    if in_string {
                        if escape {
                            escape = false;
                        } else if b == b'\\' {
                            escape = true;
                        } else if b == b'"' {
                            in_string = false;
                        }
                        continue;
                    }
                    match b {
                        b'"' => in_string = true,
                        x if x == open => depth += 1,
                        x if x == close => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            b'"' => {
                raw.push(self.next_byte()?.unwrap());
                let mut escape = false;
                loop {
                    let b = self.next_byte()?.ok_or_else(|| Self::eof("inside a string"))?;
                    raw.push(b);
                    if escape {
                        escape = false;
                    } else if b == b'\\' {
                        escape = true;
                    } else if b == b'"' {
                        break;
                    }
                }
            }
            _ => loop {
                match self.peek()? {
                    Some(b) if b == b',' || b == b'}' || b == b']' || b.is_ascii_whitespace() => break,
                    Some(_) => raw.push(self.next_byte()?.unwrap()),
                    None => break,
                }
            },
        }
        String::from_utf8(raw).map_err(|e| CodecError::malformed(format!("value is not valid UTF-8: {e}")))
    }
}
