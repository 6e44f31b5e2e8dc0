//! Console rendering of the final pipeline stream.

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::stage::Value;
use crossbeam::channel::Receiver;
use crossbeam::select;
use std::io::Write;

/// Write `processed: N` for every value until the stream closes or `cancel`
/// fires. Returns how many values were rendered.
pub fn display<W: Write>(
    products: &Receiver<Value>,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<u64> {
    let mut rendered = 0;

    while !cancel.is_cancelled() {
        let next = select! {
            recv(products) -> msg => msg.ok(),
            recv(cancel.done()) -> _ => None,
        };
        let Some(value) = next else {
            break;
        };

        writeln!(out, "processed: {}", value)?;
        out.flush()?;
        rendered += 1;
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::stream;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_renders_until_stream_closes() {
        let (tx, rx) = stream();
        let producer = thread::spawn(move || {
            for v in [33, 3, 9] {
                tx.send(v).unwrap();
            }
        });

        let mut out = Vec::new();
        let rendered = display(&rx, &CancellationToken::new(), &mut out).unwrap();
        producer.join().unwrap();

        assert_eq!(rendered, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "processed: 33\nprocessed: 3\nprocessed: 9\n"
        );
    }

    #[test]
    fn test_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let (_tx, rx) = stream();

        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                cancel.cancel();
            })
        };

        let mut out = Vec::new();
        assert_eq!(display(&rx, &cancel, &mut out).unwrap(), 0);
        assert!(out.is_empty());
        canceller.join().unwrap();
    }
}
