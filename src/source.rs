//! Line-oriented integer source feeding the first stage.

use crate::cancel::CancellationToken;
use crate::error::{PipelineError, Result};
use crate::stage::{send_or_cancel, stream, Value};
use crossbeam::channel::Receiver;
use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Parse one line of user input as an integer, ignoring surrounding whitespace
pub fn parse_number(line: &str) -> Result<Value> {
    line.trim().parse::<Value>().map_err(|_| PipelineError::InvalidInput)
}

/// Read integers from `reader`, one per line, on a dedicated thread.
///
/// Lines that do not parse, including lines that are not valid UTF-8, are
/// reported on `feedback` and skipped. The returned stream closes at end of
/// input, on a read error (logged), when `cancel` fires, or when the
/// receiver is dropped.
pub fn read_numbers<R, W>(
    mut reader: R,
    mut feedback: W,
    cancel: CancellationToken,
) -> Result<(Receiver<Value>, JoinHandle<()>)>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let (tx, rx) = stream();

    let handle = thread::Builder::new()
        .name("input-reader".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                }

                match parse_number(&String::from_utf8_lossy(&buf)) {
                    Ok(value) => {
                        if !send_or_cancel(&cancel, &tx, value) {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = writeln!(feedback, "{}", e);
                        let _ = feedback.flush();
                    }
                }
            }
            debug!("Input reader stopped");
        })
        .map_err(|e| PipelineError::ThreadError(format!("failed to spawn input reader: {}", e)))?;

    Ok((rx, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::{self, Cursor, Read};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42").unwrap(), 42);
        assert_eq!(parse_number("  -7 \n").unwrap(), -7);
        assert!(matches!(parse_number("abc"), Err(PipelineError::InvalidInput)));
        assert!(matches!(parse_number(""), Err(PipelineError::InvalidInput)));
        assert!(matches!(parse_number("3.5"), Err(PipelineError::InvalidInput)));
    }

    #[test]
    fn test_reads_until_eof() {
        let input = Cursor::new("1\n-2\n33\n");
        let (rx, handle) = read_numbers(input, io::sink(), CancellationToken::new()).unwrap();
        let got: Vec<Value> = rx.iter().collect();
        handle.join().unwrap();
        assert_eq!(got, vec![1, -2, 33]);
    }

    #[test]
    fn test_invalid_lines_reported_and_skipped() {
        let feedback = SharedBuf::default();
        let input = Cursor::new("5\nfive\n\n6\n");
        let (rx, handle) = read_numbers(input, feedback.clone(), CancellationToken::new()).unwrap();
        let got: Vec<Value> = rx.iter().collect();
        handle.join().unwrap();

        assert_eq!(got, vec![5, 6]);
        assert_eq!(
            feedback.contents(),
            "invalid input: please enter a number\ninvalid input: please enter a number\n"
        );
    }

    #[test]
    fn test_non_utf8_line_is_invalid_input() {
        let feedback = SharedBuf::default();
        let input = Cursor::new(b"3\n\xff\xfe\n6\n".to_vec());
        let (rx, handle) = read_numbers(input, feedback.clone(), CancellationToken::new()).unwrap();
        let got: Vec<Value> = rx.iter().collect();
        handle.join().unwrap();

        assert_eq!(got, vec![3, 6]);
        assert_eq!(feedback.contents(), "invalid input: please enter a number\n");
    }

    #[test]
    fn test_last_line_without_newline() {
        let input = Cursor::new("1\n2");
        let (rx, handle) = read_numbers(input, io::sink(), CancellationToken::new()).unwrap();
        assert_eq!(rx.iter().collect::<Vec<Value>>(), vec![1, 2]);
        handle.join().unwrap();
    }

    /// Yields `data`, then fails every read
    struct BrokenReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "input went away")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_read_error_closes_stream() {
        let reader = io::BufReader::new(BrokenReader {
            data: Cursor::new(b"4\n-5\n".to_vec()),
        });
        let (rx, handle) = read_numbers(reader, io::sink(), CancellationToken::new()).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(4));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(-5));
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());
        handle.join().unwrap();
    }

    #[test]
    fn test_cancel_unblocks_pending_send() {
        let cancel = CancellationToken::new();
        let input = Cursor::new("1\n2\n3\n");
        let (rx, handle) = read_numbers(input, io::sink(), cancel.clone()).unwrap();

        assert_eq!(rx.recv().unwrap(), 1);
        cancel.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn test_stops_when_receiver_dropped() {
        let input = Cursor::new("1\n2\n3\n");
        let (rx, handle) = read_numbers(input, io::sink(), CancellationToken::new()).unwrap();
        drop(rx);
        handle.join().unwrap();
    }
}
