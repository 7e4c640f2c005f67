//! Format selection policy
//!
//! A pure function of the request options and detected platform, producing
//! the format expression handed to the extractor. Not a stateful component.

use crate::types::{JobOptions, Platform, Quality};

/// Build the extractor format expression for a request.
///
/// Selection rules, in precedence order:
/// 1. audio-only requests get the best available audio regardless of
///    platform or quality tier;
/// 2. TikTok requests with watermark removal use the progressive mp4
///    source, which carries no burned-in watermark;
/// 3. everything else maps the quality tier to a height-capped expression.
pub fn format_expression(options: &JobOptions, platform: Platform) -> &'static str {
    if options.audio_only {
        return "bestaudio/best";
    }

    if platform == Platform::Tiktok && options.remove_watermark {
        return "best[ext=mp4]";
    }

    match options.quality {
        Quality::Best => "bestvideo+bestaudio/best",
        Quality::Worst => "worst",
        Quality::P480 => "bestvideo[height<=480]+bestaudio/best[height<=480]",
        Quality::P720 => "bestvideo[height<=720]+bestaudio/best[height<=720]",
        Quality::P1080 => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(quality: Quality, audio_only: bool, remove_watermark: bool) -> JobOptions {
        JobOptions {
            format: "mp4".to_string(),
            quality,
            audio_only,
            remove_watermark,
        }
    }

    #[test]
    fn audio_only_wins_for_every_platform_and_tier() {
        let platforms = [
            Platform::Youtube,
            Platform::Tiktok,
            Platform::Instagram,
            Platform::Facebook,
            Platform::Twitter,
            Platform::Unknown,
        ];
        let tiers = [
            Quality::Best,
            Quality::Worst,
            Quality::P480,
            Quality::P720,
            Quality::P1080,
        ];

        for platform in platforms {
            for quality in tiers {
                assert_eq!(
                    format_expression(&options(quality, true, true), platform),
                    "bestaudio/best",
                    "audio_only must select best audio on {platform:?} at {quality:?}"
                );
            }
        }
    }

    #[test]
    fn tiktok_watermark_removal_uses_progressive_mp4() {
        assert_eq!(
            format_expression(&options(Quality::P720, false, true), Platform::Tiktok),
            "best[ext=mp4]",
            "watermark heuristic overrides the quality tier on TikTok"
        );
    }

    #[test]
    fn tiktok_without_watermark_removal_uses_quality_table() {
        assert_eq!(
            format_expression(&options(Quality::P720, false, false), Platform::Tiktok),
            "bestvideo[height<=720]+bestaudio/best[height<=720]"
        );
    }

    #[test]
    fn watermark_heuristic_applies_only_to_tiktok() {
        assert_eq!(
            format_expression(&options(Quality::Best, false, true), Platform::Youtube),
            "bestvideo+bestaudio/best",
            "remove_watermark must be a no-op on platforms other than TikTok"
        );
    }

    #[test]
    fn quality_tiers_map_to_height_caps() {
        let cases = [
            (Quality::Best, "bestvideo+bestaudio/best"),
            (Quality::Worst, "worst"),
            (
                Quality::P480,
                "bestvideo[height<=480]+bestaudio/best[height<=480]",
            ),
            (
                Quality::P720,
                "bestvideo[height<=720]+bestaudio/best[height<=720]",
            ),
            (
                Quality::P1080,
                "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
            ),
        ];

        for (quality, expected) in cases {
            assert_eq!(
                format_expression(&options(quality, false, false), Platform::Youtube),
                expected
            );
        }
    }

    #[test]
    fn default_options_select_unconstrained_best() {
        assert_eq!(
            format_expression(&JobOptions::default(), Platform::Unknown),
            "bestvideo+bestaudio/best"
        );
    }
}
