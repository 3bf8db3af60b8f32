/// Carry-over larger than this is assumed to be a runaway fragment and dropped.
pub const MAX_BUFFERED_BYTES: usize = 1024 * 1024;

fn is_separator(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b',' | b'[' | b']')
}

/// Length of the brace-balanced object starting at `bytes[0]`, ignoring braces
/// inside strings. `None` while the closing brace has not arrived yet.
fn object_span(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, &byte) in bytes.iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Recovers JSON objects from a byte stream with no message boundaries.
///
/// Chunks may split an object anywhere or hold several objects back to back,
/// optionally wrapped in arrays. Incomplete trailing data is carried over to
/// the next [`ReportFramer::push`]; anything that cannot start or finish an
/// object is dropped and parsing resumes at the next `{`.
#[derive(Debug)]
pub struct ReportFramer {
    buffer: Vec<u8>,
    max_buffered: usize,
}

impl Default for ReportFramer {
    fn default() -> Self {
        ReportFramer::new(MAX_BUFFERED_BYTES)
    }
}

impl ReportFramer {
    #[must_use]
    pub fn new(max_buffered: usize) -> Self {
        ReportFramer {
            buffer: Vec::new(),
            max_buffered,
        }
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Forgets any partial object, e.g. after the connection drops.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<serde_json::Value> {
        self.buffer.extend_from_slice(chunk);

        let mut objects = Vec::new();
        let mut consumed = 0;

        loop {
            let rest = &self.buffer[consumed..];
            let Some(start) = rest.iter().position(|byte| *byte == b'{') else {
                if rest.iter().any(|byte| !is_separator(*byte)) {
                    log::warn!("Framer: dropped {} bytes with no object start", rest.len());
                }
                consumed = self.buffer.len();
                break;
            };
            if rest[..start].iter().any(|byte| !is_separator(*byte)) {
                log::warn!("Framer: dropped {start} bytes before object start");
            }
            consumed += start;

            let mut stream = serde_json::Deserializer::from_slice(&self.buffer[consumed..])
                .into_iter::<serde_json::Value>();
            match stream.next() {
                Some(Ok(object)) => {
                    consumed += stream.byte_offset();
                    objects.push(object);
                }
                Some(Err(e)) if e.is_eof() => break,
                Some(Err(e)) => match object_span(&self.buffer[consumed..]) {
                    Some(span) => {
                        log::error!("Framer: dropping malformed fragment of {span} bytes: {e}");
                        consumed += span;
                    }
                    None => break,
                },
                None => break,
            }
        }

        self.buffer.drain(..consumed);
        if self.buffer.len() > self.max_buffered {
            log::error!(
                "Framer: discarding {} buffered bytes without a complete object",
                self.buffer.len()
            );
            self.buffer.clear();
        }

        objects
    }
}
