//! Line source: a forward-only sequence of data lines over an async byte stream.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// One data line, numbered from 1 excluding the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub number: u64,
    pub text: String,
}

/// Lazy reader that yields data lines and discards the header.
///
/// The underlying reader is owned by the source and released when the source
/// is dropped, whether it was exhausted, failed, or abandoned by its consumer.
pub struct LineSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    header_skipped: bool,
    lines_read: u64,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            header_skipped: false,
            lines_read: 0,
            exhausted: false,
        }
    }

    /// Number of data lines handed out so far.
    pub const fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Read the next data line, or `None` once the stream is exhausted.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, so only genuine I/O
    /// failures surface as errors.
    pub async fn next_line(&mut self) -> std::io::Result<Option<RawLine>> {
        if !self.header_skipped {
            self.header_skipped = true;
            if self.read_raw().await?.is_none() {
                return Ok(None);
            }
        }

        match self.read_raw().await? {
            Some(text) => {
                self.lines_read += 1;
                Ok(Some(RawLine {
                    number: self.lines_read,
                    text,
                }))
            }
            None => Ok(None),
        }
    }

    async fn read_raw(&mut self) -> std::io::Result<Option<String>> {
        if self.exhausted {
            return Ok(None);
        }

        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 {
            self.exhausted = true;
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<RawLine> {
        let mut source = LineSource::new(input);
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().await.expect("in-memory read") {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn discards_header_and_numbers_data_lines() {
        let lines = collect(b"date,productId,currency,price\na\nb\n").await;
        assert_eq!(
            lines,
            vec![
                RawLine {
                    number: 1,
                    text: "a".to_string()
                },
                RawLine {
                    number: 2,
                    text: "b".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn header_is_discarded_even_if_it_looks_like_data() {
        let lines = collect(b"20230101,1,USD,1.0\n20230102,2,EUR,2.0").await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "20230102,2,EUR,2.0");
    }

    #[tokio::test]
    async fn strips_crlf_and_handles_missing_final_newline() {
        let lines = collect(b"h\r\nfirst\r\nsecond").await;
        let texts: Vec<_> = lines.into_iter().map(|line| line.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn empty_and_header_only_inputs_yield_nothing() {
        assert!(collect(b"").await.is_empty());
        assert!(collect(b"date,productId,currency,price\n").await.is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let lines = collect(b"h\n\xffabc\n").await;
        assert_eq!(lines[0].text, "\u{fffd}abc");
    }

    #[tokio::test]
    async fn stays_exhausted() {
        let mut source = LineSource::new(&b"h\nx\n"[..]);
        assert!(source.next_line().await.unwrap().is_some());
        assert!(source.next_line().await.unwrap().is_none());
        assert!(source.next_line().await.unwrap().is_none());
        assert_eq!(source.lines_read(), 1);
    }
}
