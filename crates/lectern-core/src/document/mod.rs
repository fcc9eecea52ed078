pub mod pdf;

use std::path::Path;

use crate::captions::Cue;
use crate::error::Result;
use crate::sampler::Slide;

/// Renders the two output documents from one video's sample set.
///
/// Implementations may assume `slides` is non-empty; the pipeline skips
/// document generation for videos that produced no slides.
pub trait DocumentAssembler: Send + Sync {
    /// One full-page image per slide, in slide order.
    fn slide_document(&self, slides: &[Slide], out_path: &Path) -> Result<()>;

    /// One page per slide: a timestamp header plus that slide's transcript
    /// text, continuing onto extra pages when the text overflows.
    fn transcript_document(
        &self,
        slides: &[Slide],
        transcripts: &[String],
        out_path: &Path,
    ) -> Result<()>;
}

/// Group cues into one transcript string per slide, one cue per line.
///
/// The bucket for the slide at position k spans `[t_{k-1}, t_k)` in
/// milliseconds, with `t_{-1} = 0`: a slide collects the text spoken before
/// it appeared. A cue starting exactly at a slide's timestamp belongs to the
/// following bucket. The cursor over cues is monotonic, so each cue lands in
/// at most one bucket; cues at or after the final slide's timestamp are
/// dropped.
pub fn bucket_cues(slides: &[Slide], cues: &[Cue]) -> Vec<String> {
    let mut buckets = Vec::with_capacity(slides.len());
    let mut cursor = cues.iter().peekable();

    for slide in slides {
        let end_ms = slide.timestamp_seconds * 1000;
        let mut text = String::new();
        while let Some(cue) = cursor.peek() {
            if cue.start_ms >= end_ms {
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&cue.text);
            cursor.next();
        }
        buckets.push(text);
    }

    buckets
}

/// `HH:MM:SS`, fields zero-padded to two digits, hours never truncated.
pub fn format_timestamp(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Split `text` into lines of at most `max_chars` characters, breaking on
/// whitespace where possible and hard-breaking words longer than a line.
/// Existing line breaks are preserved; runs of spaces collapse to one.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    assert!(max_chars >= 1, "max_chars must be >= 1");

    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let mut word = word;
            while word.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split = word
                    .char_indices()
                    .nth(max_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                let (head, tail) = word.split_at(split);
                lines.push(head.to_string());
                word = tail;
            }
            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn slide(frame_number: u32, timestamp_seconds: u64) -> Slide {
        Slide {
            frame_number,
            timestamp_seconds,
            image_path: PathBuf::from(format!("frame_{frame_number:08}.png")),
        }
    }

    fn cue(start_ms: u64, text: &str) -> Cue {
        Cue {
            start_ms,
            duration_ms: 1000,
            text: text.to_string(),
        }
    }

    #[test]
    fn first_bucket_is_empty_for_a_slide_at_time_zero() {
        // t_{-1} = 0 and t_0 = 0 give the first slide the empty [0, 0) span.
        let slides = [slide(0, 0), slide(150, 5)];
        let cues = [cue(0, "intro"), cue(2500, "middle")];
        let buckets = bucket_cues(&slides, &cues);
        assert_eq!(buckets, vec!["", "intro\nmiddle"]);
    }

    #[test]
    fn cue_on_boundary_belongs_to_next_bucket() {
        let slides = [slide(0, 0), slide(50, 5), slide(90, 9)];
        let cues = [cue(4999, "before"), cue(5000, "exactly"), cue(5001, "after")];
        let buckets = bucket_cues(&slides, &cues);
        assert_eq!(buckets[1], "before");
        assert_eq!(buckets[2], "exactly\nafter");
    }

    #[test]
    fn each_cue_lands_in_at_most_one_bucket() {
        let slides = [slide(0, 0), slide(30, 3), slide(60, 6)];
        let cues = [cue(1000, "a"), cue(2000, "b"), cue(4000, "c")];
        let buckets = bucket_cues(&slides, &cues);
        assert_eq!(buckets, vec!["", "a\nb", "c"]);
    }

    #[test]
    fn trailing_cues_are_dropped() {
        let slides = [slide(0, 0), slide(30, 3)];
        let cues = [cue(1000, "kept"), cue(3000, "at boundary"), cue(9000, "late")];
        let buckets = bucket_cues(&slides, &cues);
        assert_eq!(buckets, vec!["", "kept"]);
    }

    #[test]
    fn empty_cue_list_yields_empty_buckets() {
        let slides = [slide(0, 0), slide(40, 4)];
        let buckets = bucket_cues(&slides, &[]);
        assert_eq!(buckets, vec!["", ""]);
    }

    #[test]
    fn no_slides_no_buckets() {
        let buckets = bucket_cues(&[], &[cue(0, "orphan")]);
        assert!(buckets.is_empty());
    }

    #[test]
    fn timestamps_format_as_hh_mm_ss() {
        assert_eq!(format_timestamp(0), "00:00:00");
        assert_eq!(format_timestamp(61), "00:01:01");
        assert_eq!(format_timestamp(3661), "01:01:01");
        assert_eq!(format_timestamp(360000), "100:00:00");
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn wrap_hard_breaks_overlong_words() {
        let lines = wrap_text("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn wrap_preserves_existing_line_breaks() {
        let lines = wrap_text("one\n\ntwo", 20);
        assert_eq!(lines, vec!["one", "", "two"]);
    }
}
