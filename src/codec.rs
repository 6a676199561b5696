use std::io::Write;

use crate::{error::DecodeError, Point, Sample, Time};

/// Appends `"<metric> <value> <time>\n"` to `buf`.
pub fn encode_line(buf: &mut Vec<u8>, metric: &str, sample: Sample) {
    // Writing into a `Vec` cannot fail.
    let _ = writeln!(buf, "{} {} {}", metric, sample.value, sample.time);
}

pub fn line_len(metric: &str, sample: Sample) -> usize {
    struct Counter(usize);
    impl Write for Counter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0 += buf.len();
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    let mut counter = Counter(0);
    let _ = writeln!(counter, "{} {} {}", metric, sample.value, sample.time);
    counter.0
}

pub fn decode_line(line: &str) -> Result<Point, DecodeError> {
    let bad = || DecodeError::BadLine(line.to_string());
    let trimmed = line.trim_matches(|c: char| matches!(c, '\n' | ' ' | '\t' | '\r'));
    let mut fields = trimmed.split(' ');
    let (Some(metric), Some(value), Some(time), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(bad());
    };
    if metric.is_empty() {
        return Err(bad());
    }
    let value: f64 = value.parse().map_err(|_| bad())?;
    if value.is_nan() {
        return Err(bad());
    }
    let time: f64 = time.parse().map_err(|_| bad())?;
    if time.is_nan() || time < 0.0 || time.is_infinite() {
        return Err(bad());
    }
    Ok(Point::one(metric, value, time as Time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_integral_values_without_fraction() {
        let mut buf = vec![];
        encode_line(&mut buf, "a.b.c", Sample { time: 100, value: 1.0 });
        encode_line(&mut buf, "x", Sample { time: 7, value: 0.25 });
        assert_eq!(buf, b"a.b.c 1 100\nx 0.25 7\n");
    }

    #[test]
    fn extreme_values_use_positional_notation() {
        let mut buf = vec![];
        encode_line(&mut buf, "big", Sample { time: 1, value: 1e21 });
        encode_line(&mut buf, "small", Sample { time: 2, value: 1e-7 });
        encode_line(&mut buf, "neg", Sample { time: 3, value: -0.5 });
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "big 1000000000000000000000 1\nsmall 0.0000001 2\nneg -0.5 3\n"
        );
        assert_eq!(line_len("big", Sample { time: 1, value: 1e21 }), 29);
    }

    #[test]
    fn line_len_matches_encoding() {
        let sample = Sample {
            time: 1_700_000_000,
            value: -12.5,
        };
        let mut buf = vec![];
        encode_line(&mut buf, "cpu.user", sample);
        assert_eq!(line_len("cpu.user", sample), buf.len());
    }

    #[test]
    fn decodes_plaintext_line() {
        let point = decode_line("hello.world 42.15 1422698155\n").unwrap();
        assert_eq!(point, Point::one("hello.world", 42.15, 1422698155));
    }

    #[test]
    fn truncates_fractional_timestamp() {
        let point = decode_line("\t m 1 1422698155.9 \r\n").unwrap();
        assert_eq!(point.samples[0].time, 1422698155);
    }

    #[test]
    fn rejects_bad_lines() {
        for line in [
            "",
            "metric",
            "metric 1",
            "metric 1 2 3",
            "metric  1 2",
            "metric nan 2",
            "metric 1 NaN",
            "metric one 2",
            "metric 1 -5",
        ] {
            assert_eq!(
                decode_line(line),
                Err(DecodeError::BadLine(line.to_string())),
                "{line:?}"
            );
        }
    }
}
