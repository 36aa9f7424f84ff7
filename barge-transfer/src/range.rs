use serde::{Deserialize, Serialize};

use crate::{TransferError, TransferResult};

/// A parsed `Range` header, before clamping against the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    /// Inclusive end; `None` for an open-ended `bytes=N-` request
    pub end: Option<u64>,
}

impl RangeSpec {
    /// Parse a single byte-range of the form `bytes=N-` or `bytes=N-M`.
    ///
    /// Multi-range and suffix (`bytes=-N`) forms are not served here and
    /// parse as malformed.
    pub fn parse(header: &str) -> TransferResult<Self> {
        let malformed = || TransferError::MalformedRangeHeader {
            header: header.to_string(),
        };

        let ranges = header.strip_prefix("bytes=").ok_or_else(malformed)?;
        if ranges.contains(',') {
            return Err(malformed());
        }

        let (start, end) = ranges.split_once('-').ok_or_else(malformed)?;
        let start: u64 = start.trim().parse().map_err(|_| malformed())?;
        let end = match end.trim() {
            "" => None,
            raw => Some(raw.parse().map_err(|_| malformed())?),
        };

        Ok(Self { start, end })
    }

    /// Clamp the request against the object's length.
    ///
    /// An open-ended range is bounded to `default_window` bytes rather than
    /// the whole remaining object, keeping per-request latency flat and
    /// letting clients buffer progressively. Fails with
    /// `RangeNotSatisfiable` when the start lies at or beyond the object end
    /// or the range is inverted.
    pub fn resolve(&self, object_length: u64, default_window: u64) -> TransferResult<ResolvedRange> {
        let unsatisfiable = || TransferError::RangeNotSatisfiable {
            requested: self.to_string(),
            object_length,
        };

        if object_length == 0 || self.start >= object_length {
            return Err(unsatisfiable());
        }
        if matches!(self.end, Some(end) if end < self.start) {
            return Err(unsatisfiable());
        }

        let last = object_length - 1;
        let end = match self.end {
            Some(end) => end.min(last),
            None => self
                .start
                .saturating_add(default_window.max(1) - 1)
                .min(last),
        };

        Ok(ResolvedRange {
            start: self.start,
            end,
            total_size: object_length,
        })
    }
}

impl std::fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "bytes={}-{}", self.start, end),
            None => write!(f, "bytes={}-", self.start),
        }
    }
}

/// A byte window clamped to a concrete object, ready for response framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub start: u64,
    /// Inclusive end
    pub end: u64,
    pub total_size: u64,
}

impl ResolvedRange {
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a 206 response
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }

    pub fn is_full_object(&self) -> bool {
        self.start == 0 && self.end + 1 == self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_and_bounded_ranges() {
        assert_eq!(
            RangeSpec::parse("bytes=500-").unwrap(),
            RangeSpec {
                start: 500,
                end: None
            }
        );
        assert_eq!(
            RangeSpec::parse("bytes=0-99").unwrap(),
            RangeSpec {
                start: 0,
                end: Some(99)
            }
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        for header in [
            "bytes",
            "bytes=",
            "bytes=-500",
            "bytes=a-b",
            "bytes=0-10,20-30",
            "items=0-10",
        ] {
            assert!(
                matches!(
                    RangeSpec::parse(header),
                    Err(TransferError::MalformedRangeHeader { .. })
                ),
                "{header} should be malformed"
            );
        }
    }

    #[test]
    fn open_range_is_bounded_by_window() {
        let resolved = RangeSpec::parse("bytes=500-")
            .unwrap()
            .resolve(1000, 100)
            .unwrap();
        assert_eq!((resolved.start, resolved.end), (500, 599));
        assert_eq!(resolved.content_length(), 100);
        assert_eq!(resolved.content_range(), "bytes 500-599/1000");
    }

    #[test]
    fn open_range_near_the_end_clamps_to_object() {
        let resolved = RangeSpec::parse("bytes=950-")
            .unwrap()
            .resolve(1000, 100)
            .unwrap();
        assert_eq!((resolved.start, resolved.end), (950, 999));
    }

    #[test]
    fn bounded_end_clamps_to_object() {
        let resolved = RangeSpec::parse("bytes=0-5000")
            .unwrap()
            .resolve(1000, 100)
            .unwrap();
        assert_eq!((resolved.start, resolved.end), (0, 999));
        assert!(resolved.is_full_object());
    }

    #[test]
    fn start_at_or_beyond_object_end_is_unsatisfiable() {
        let spec = RangeSpec::parse("bytes=1000-1005").unwrap();
        assert!(matches!(
            spec.resolve(1000, 100),
            Err(TransferError::RangeNotSatisfiable { .. })
        ));

        let spec = RangeSpec::parse("bytes=0-").unwrap();
        assert!(matches!(
            spec.resolve(0, 100),
            Err(TransferError::RangeNotSatisfiable { .. })
        ));
    }

    #[test]
    fn inverted_range_is_unsatisfiable() {
        let spec = RangeSpec::parse("bytes=10-5").unwrap();
        assert!(matches!(
            spec.resolve(1000, 100),
            Err(TransferError::RangeNotSatisfiable { .. })
        ));
    }
}
