//! Hierarchical channel filters.
//!
//! Channels are slash-separated (`iot/porte/porte-001/state`). A filter
//! matches with `+` standing for exactly one segment and a trailing `#`
//! for the rest of the path.

/// A parsed channel filter, e.g. `iot/porte/+/state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `+` -- any single segment.
    Single,
    /// `#` -- any remaining segments (only valid in last position).
    Rest,
}

impl TopicFilter {
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .map(|seg| match seg {
                "+" => Segment::Single,
                "#" => Segment::Rest,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Whether `topic` matches this filter.
    pub fn matches(&self, topic: &str) -> bool {
        let mut parts = topic.split('/');

        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Single => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(literal) => {
                    if parts.next() != Some(literal.as_str()) {
                        return false;
                    }
                }
            }
        }

        parts.next().is_none()
    }
}

impl std::fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, "/")?;
            }
            first = false;
            match segment {
                Segment::Literal(literal) => write!(f, "{literal}")?,
                Segment::Single => write!(f, "+")?,
                Segment::Rest => write!(f, "#")?,
            }
        }
        Ok(())
    }
}

/// Extract the device-id segment from a `iot/<kind>/<id>/...` topic.
///
/// Returns `None` when the topic has no third segment or it is empty.
pub fn device_segment(topic: &str) -> Option<&str> {
    let id = topic.split('/').nth(2)?;
    if id.is_empty() { None } else { Some(id) }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_wildcard_matches_one_segment() {
        let filter = TopicFilter::new("iot/porte/+/state");
        assert!(filter.matches("iot/porte/porte-001/state"));
        assert!(!filter.matches("iot/porte/state"));
        assert!(!filter.matches("iot/porte/a/b/state"));
    }

    #[test]
    fn literal_filter_matches_exactly() {
        let filter = TopicFilter::new("iot/badgeuse/dev1/events");
        assert!(filter.matches("iot/badgeuse/dev1/events"));
        assert!(!filter.matches("iot/badgeuse/dev2/events"));
    }

    #[test]
    fn trailing_rest_wildcard_matches_remainder() {
        let filter = TopicFilter::new("iot/#");
        assert!(filter.matches("iot/porte/porte-001/state"));
        assert!(filter.matches("iot/anything"));
        assert!(!filter.matches("other/porte"));
    }

    #[test]
    fn shorter_topic_does_not_match() {
        let filter = TopicFilter::new("iot/porte/+/state");
        assert!(!filter.matches("iot/porte/porte-001"));
    }

    #[test]
    fn longer_topic_does_not_match() {
        let filter = TopicFilter::new("iot/porte/+/state");
        assert!(!filter.matches("iot/porte/porte-001/state/extra"));
    }

    #[test]
    fn display_round_trips_pattern() {
        let filter = TopicFilter::new("iot/badgeuse/+/events");
        assert_eq!(filter.to_string(), "iot/badgeuse/+/events");
    }

    #[test]
    fn device_segment_extracts_third_part() {
        assert_eq!(device_segment("iot/badgeuse/dev1/events"), Some("dev1"));
        assert_eq!(device_segment("iot/badgeuse//events"), None);
        assert_eq!(device_segment("websocket"), None);
    }
}
