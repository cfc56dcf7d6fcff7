// FormatSelector - turns raw extractor formats into a quality menu
//
// Raw format lists are long and full of near-duplicates (same height in
// several codecs and bitrates). Selection keeps one stream per resolution:
// - filter with a caller-supplied predicate (video-only vs muxed workflows)
// - bucket by resolution label, keep the highest bitrate (first seen on ties)
// - order by height, highest first, unknown heights last

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::convert::Infallible;

/// One encoded rendition as reported by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Opaque id understood by the download call (e.g. "137", or a stream URL)
    pub format_id: String,
    pub has_video: bool,
    pub has_audio: bool,
    /// File extension (mp4, webm, m4a)
    pub container: String,
    /// Pixel height, when known
    pub height: Option<u32>,
    /// Total bitrate in kbps, 0 when unknown
    pub bitrate: f64,
    /// Exact or approximate size in bytes
    pub filesize: Option<u64>,
}

impl StreamDescriptor {
    /// Build from yt-dlp style codec fields; "none" or a missing codec means absent.
    pub fn from_codecs(
        format_id: impl Into<String>,
        vcodec: Option<&str>,
        acodec: Option<&str>,
        container: impl Into<String>,
        height: Option<u32>,
        bitrate: Option<f64>,
    ) -> Self {
        Self {
            format_id: format_id.into(),
            has_video: codec_present(vcodec),
            has_audio: codec_present(acodec),
            container: container.into(),
            height,
            bitrate: bitrate.unwrap_or(0.0),
            filesize: None,
        }
    }

    pub fn with_filesize(mut self, filesize: Option<u64>) -> Self {
        self.filesize = filesize;
        self
    }

    pub fn resolution_label(&self) -> String {
        resolution_label(self.height)
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }

    pub fn is_muxed(&self) -> bool {
        self.has_video && self.has_audio
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| !c.is_empty() && c != "none")
}

/// "{height}p", or "Unknownp" when the height is missing
pub fn resolution_label(height: Option<u32>) -> String {
    match height {
        Some(h) => format!("{h}p"),
        None => "Unknownp".to_string(),
    }
}

/// Quality option for display and later download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityOption {
    /// Label such as "720p"
    #[serde(rename = "resolution")]
    pub resolution_label: String,

    /// Format id of the winning stream
    pub format_id: String,

    #[serde(rename = "ext")]
    pub container: String,

    #[serde(rename = "tbr")]
    pub bitrate: f64,

    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

impl QualityOption {
    fn from_descriptor(d: &StreamDescriptor) -> Self {
        Self {
            resolution_label: d.resolution_label(),
            format_id: d.format_id.clone(),
            container: d.container.clone(),
            bitrate: d.bitrate,
            height: d.height,
            filesize: d.filesize,
        }
    }
}

/// Format selector for a format id chosen under the given filter.
/// Video-only streams need an audio track merged in.
pub fn format_spec_for(format_id: &str, filter: FormatFilter) -> String {
    match filter {
        FormatFilter::VideoOnlyMp4 => format!("{format_id}+bestaudio[ext=m4a]/bestaudio"),
        FormatFilter::MuxedMp4 => format_id.to_string(),
    }
}

/// Stock predicates for the two download workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFilter {
    /// Video without audio in mp4; audio is merged at download time
    #[default]
    #[serde(alias = "video-only")]
    VideoOnlyMp4,
    /// Video and audio already muxed in one mp4
    #[serde(alias = "muxed-mp4")]
    MuxedMp4,
}

impl FormatFilter {
    pub fn matches(&self, d: &StreamDescriptor) -> bool {
        let is_mp4 = d.container.eq_ignore_ascii_case("mp4");
        match self {
            Self::VideoOnlyMp4 => d.is_video_only() && is_mp4,
            Self::MuxedMp4 => d.is_muxed() && is_mp4,
        }
    }
}

/// Reduce `descriptors` to one option per resolution.
///
/// Only descriptors accepted by `predicate` are considered. Within a
/// resolution the strictly highest bitrate wins, so the first-seen stream is
/// kept on ties. Output is ordered by height descending with unknown heights
/// last. An empty result is a normal outcome.
pub fn select_best_qualities<P>(descriptors: &[StreamDescriptor], mut predicate: P) -> Vec<QualityOption>
where
    P: FnMut(&StreamDescriptor) -> bool,
{
    match try_select_best_qualities(descriptors, |d| Ok::<bool, Infallible>(predicate(d))) {
        Ok(options) => options,
        Err(never) => match never {},
    }
}

/// Like [`select_best_qualities`] with a fallible predicate. The first
/// predicate error is returned as-is and stops the scan.
pub fn try_select_best_qualities<P, E>(
    descriptors: &[StreamDescriptor],
    mut predicate: P,
) -> Result<Vec<QualityOption>, E>
where
    P: FnMut(&StreamDescriptor) -> Result<bool, E>,
{
    let mut winners: Vec<&StreamDescriptor> = Vec::new();
    let mut slots: HashMap<Option<u32>, usize> = HashMap::new();

    for d in descriptors {
        if !predicate(d)? {
            continue;
        }

        match slots.entry(d.height) {
            Entry::Occupied(slot) => {
                let current = &mut winners[*slot.get()];
                if d.bitrate > current.bitrate {
                    *current = d;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(winners.len());
                winners.push(d);
            }
        }
    }

    // None < Some(_), so reversing puts unknown heights at the end
    winners.sort_by_key(|d| Reverse(d.height));

    Ok(winners.into_iter().map(QualityOption::from_descriptor).collect())
}

/// Standard quality ladder, highest first
const STANDARD_LABELS: [&str; 8] = [
    "2160p 4K", "1440p HD", "1080p HD", "720p", "480p", "360p", "240p", "144p",
];

/// Map an actual video height onto the standard quality label
pub fn standard_quality_label(height: u32) -> &'static str {
    match height {
        h if h >= 2160 => "2160p 4K",
        h if h >= 1440 => "1440p HD",
        h if h >= 1080 => "1080p HD",
        h if h >= 720 => "720p",
        h if h >= 480 => "480p",
        h if h >= 360 => "360p",
        h if h >= 240 => "240p",
        _ => "144p",
    }
}

/// Entry of the standard quality ladder that a video offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardQuality {
    pub label: String,
    /// Highest actual height falling under the label. Clients send it back
    /// as the `format_id` of a video download.
    #[serde(rename = "format_id")]
    pub height: u32,
}

/// Distinct standard labels available among video streams, each pointing at
/// the highest actual height under it, ordered from 4K down.
pub fn standard_qualities(descriptors: &[StreamDescriptor]) -> Vec<StandardQuality> {
    let mut best: HashMap<&'static str, u32> = HashMap::new();

    for d in descriptors.iter().filter(|d| d.has_video) {
        let Some(height) = d.height.filter(|h| *h > 0) else {
            continue;
        };
        let entry = best.entry(standard_quality_label(height)).or_insert(height);
        if height > *entry {
            *entry = height;
        }
    }

    STANDARD_LABELS
        .iter()
        .filter_map(|label| {
            best.get(label).map(|h| StandardQuality {
                label: (*label).to_string(),
                height: *h,
            })
        })
        .collect()
}

/// Format file size for display
pub fn format_size(bytes: Option<u64>) -> Option<String> {
    bytes.filter(|b| *b > 0).map(|b| {
        let mb = b as f64 / 1_048_576.0;
        if mb >= 1024.0 {
            format!("{:.1} GB", mb / 1024.0)
        } else {
            format!("{:.0} MB", mb)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, height: Option<u32>, bitrate: f64) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            has_video: true,
            has_audio: false,
            container: "mp4".to_string(),
            height,
            bitrate,
            filesize: None,
        }
    }

    fn muxed(id: &str, height: u32, bitrate: f64) -> StreamDescriptor {
        StreamDescriptor {
            has_audio: true,
            ..video(id, Some(height), bitrate)
        }
    }

    fn video_only(d: &StreamDescriptor) -> bool {
        FormatFilter::VideoOnlyMp4.matches(d)
    }

    #[test]
    fn test_keeps_highest_bitrate_per_resolution() {
        let formats = vec![
            video("a", Some(720), 40.0),
            video("b", Some(720), 90.0),
            video("c", Some(480), 20.0),
        ];

        let options = select_best_qualities(&formats, video_only);

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].resolution_label, "720p");
        assert_eq!(options[0].format_id, "b");
        assert_eq!(options[0].bitrate, 90.0);
        assert_eq!(options[1].resolution_label, "480p");
        assert_eq!(options[1].bitrate, 20.0);
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let formats = vec![
            video("low", Some(1080), 10.0),
            video("first", Some(1080), 50.0),
            video("second", Some(1080), 50.0),
            video("mid", Some(1080), 30.0),
        ];

        let options = select_best_qualities(&formats, video_only);

        assert_eq!(options.len(), 1);
        assert_eq!(options[0].format_id, "first");
    }

    #[test]
    fn test_unknown_height_sorts_last() {
        let formats = vec![video("noheight", None, 99.0), video("small", Some(360), 5.0)];

        let options = select_best_qualities(&formats, video_only);

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].resolution_label, "360p");
        assert_eq!(options[1].resolution_label, "Unknownp");
        assert_eq!(options[1].format_id, "noheight");
    }

    #[test]
    fn test_output_unique_and_descending() {
        let heights = [144, 1080, 360, 720, 1080, 144, 2160, 480, 720];
        let mut formats: Vec<StreamDescriptor> = heights
            .iter()
            .enumerate()
            .map(|(i, h)| video(&i.to_string(), Some(*h), i as f64))
            .collect();
        formats.push(video("x", None, 1.0));
        formats.push(video("y", None, 2.0));

        let options = select_best_qualities(&formats, video_only);

        let labels: Vec<&str> = options.iter().map(|o| o.resolution_label.as_str()).collect();
        assert_eq!(
            labels,
            ["2160p", "1080p", "720p", "480p", "360p", "144p", "Unknownp"]
        );
        assert_eq!(options.last().map(|o| o.format_id.as_str()), Some("y"));
    }

    #[test]
    fn test_empty_input_and_all_filtered() {
        assert!(select_best_qualities(&[], video_only).is_empty());

        let formats = vec![muxed("m", 720, 10.0), video("v", Some(480), 5.0)];
        assert!(select_best_qualities(&formats, |_| false).is_empty());
    }

    #[test]
    fn test_predicate_selects_workflow() {
        let mut webm = video("w", Some(1080), 500.0);
        webm.container = "webm".to_string();
        let formats = vec![webm, video("v", Some(720), 80.0), muxed("m", 360, 30.0)];

        let pre_merge = select_best_qualities(&formats, video_only);
        assert_eq!(pre_merge.len(), 1);
        assert_eq!(pre_merge[0].format_id, "v");

        let single_file = select_best_qualities(&formats, |d| FormatFilter::MuxedMp4.matches(d));
        assert_eq!(single_file.len(), 1);
        assert_eq!(single_file[0].format_id, "m");
    }

    #[test]
    fn test_every_output_passed_predicate() {
        let formats = vec![
            video("keep1", Some(720), 1.0),
            video("drop1", Some(1080), 9.0),
            video("keep2", Some(480), 1.0),
        ];

        let options = select_best_qualities(&formats, |d| d.format_id.starts_with("keep"));

        assert!(options.iter().all(|o| o.format_id.starts_with("keep")));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_predicate_error_propagates() {
        let formats = vec![video("ok", Some(720), 1.0), video("bad", Some(480), 1.0)];

        let result: Result<Vec<QualityOption>, String> = try_select_best_qualities(&formats, |d| {
            if d.format_id == "bad" {
                Err(format!("cannot judge {}", d.format_id))
            } else {
                Ok(true)
            }
        });

        assert_eq!(result, Err("cannot judge bad".to_string()));
    }

    #[test]
    #[should_panic(expected = "predicate fault")]
    fn test_predicate_panic_is_not_swallowed() {
        let formats = vec![video("a", Some(720), 1.0)];
        let _ = select_best_qualities(&formats, |_| panic!("predicate fault"));
    }

    #[test]
    fn test_codec_presence() {
        let d = StreamDescriptor::from_codecs("137", Some("avc1.640028"), Some("none"), "mp4", Some(1080), None);
        assert!(d.is_video_only());
        assert_eq!(d.bitrate, 0.0);

        let audio = StreamDescriptor::from_codecs("140", Some("none"), Some("mp4a.40.2"), "m4a", None, Some(129.5));
        assert!(!audio.has_video);
        assert!(audio.has_audio);

        let unknown = StreamDescriptor::from_codecs("x", None, None, "mp4", None, None);
        assert!(!unknown.has_video && !unknown.has_audio);
    }

    #[test]
    fn test_standard_qualities() {
        let formats = vec![
            video("a", Some(1080), 1.0),
            video("b", Some(1088), 1.0),
            video("c", Some(720), 1.0),
            video("d", Some(700), 1.0),
            video("e", None, 1.0),
            StreamDescriptor::from_codecs("audio", Some("none"), Some("opus"), "webm", Some(2160), None),
        ];

        let ladder = standard_qualities(&formats);

        assert_eq!(
            ladder,
            vec![
                StandardQuality { label: "1080p HD".to_string(), height: 1088 },
                StandardQuality { label: "720p".to_string(), height: 720 },
                StandardQuality { label: "480p".to_string(), height: 700 },
            ]
        );
    }

    #[test]
    fn test_format_spec() {
        let option = QualityOption::from_descriptor(&video("137", Some(1080), 4000.0));
        assert_eq!(
            format_spec_for(&option.format_id, FormatFilter::VideoOnlyMp4),
            "137+bestaudio[ext=m4a]/bestaudio"
        );
        assert_eq!(format_spec_for(&option.format_id, FormatFilter::MuxedMp4), "137");
    }

    #[test]
    fn test_serialized_field_names() {
        let option = QualityOption::from_descriptor(&video("22", Some(720), 1.5));
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["resolution"], "720p");
        assert_eq!(json["ext"], "mp4");
        assert_eq!(json["tbr"], 1.5);
        assert_eq!(json["format_id"], "22");
        assert!(json.get("filesize").is_none());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(Some(150 * 1_048_576)), Some("150 MB".to_string()));
        assert_eq!(format_size(Some(3 * 1024 * 1_048_576 / 2)), Some("1.5 GB".to_string()));
        assert_eq!(format_size(Some(0)), None);
        assert_eq!(format_size(None), None);
    }
}
