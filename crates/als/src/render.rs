use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::error::AlsError;
use crate::templates::{self, NEUTRAL_HEADER};

const MAX_CHARS: usize = 350;

/// A rendered ambient-context block plus its provenance fields (§3 "ALS
/// Block"). `sha256`/`variant_id` are retained in telemetry; `rendered_text`
/// is consumed once by the router and never logged in full.
#[derive(Debug, Clone)]
pub struct AlsBlock {
    pub country_code: String,
    pub timezone: Tz,
    pub rendered_text: String,
    pub sha256: String,
    pub variant_id: String,
    pub nfc_length: usize,
}

fn resolve_timezone(tpl: &templates::CountryTemplate, tz_override: Option<&str>) -> Tz {
    if let Some(ov) = tz_override {
        if let Ok(tz) = Tz::from_str(ov) {
            return tz;
        }
    }
    if let Some(primary) = tpl.timezone {
        return primary;
    }
    if let Some(first) = tpl.timezone_samples.first() {
        return *first;
    }
    chrono_tz::UTC
}

fn build_text(
    header: &str,
    stamp: &str,
    offset_str: &str,
    tpl: &templates::CountryTemplate,
    phrase: &str,
    include_weather: bool,
) -> String {
    let mut lines = vec![
        header.to_string(),
        format!("- {stamp}, {offset_str}"),
        format!("- {} \u{2014} \u{201c}{}\u{201d}", tpl.civic_keyword, phrase),
        format!("- {}", tpl.formatting_example),
    ];
    if include_weather {
        lines.push(format!("- {}", tpl.weather_stub_local));
    }
    lines.join("\n")
}

fn variant_id(country_code: &str, phrase_idx: usize, day_bucket: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(country_code.as_bytes());
    hasher.update(b"|");
    hasher.update(phrase_idx.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(day_bucket.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Render a leak-resistant ambient-context block for `country_code` (C1,
/// §4.1). `now` is interpreted as the instant to render local time for; when
/// omitted the current wall-clock time is used. Deterministic given
/// identical `(country_code, now, phrase_index, include_weather_hint)`.
pub fn render(
    country_code: &str,
    now: Option<DateTime<Utc>>,
    tz_override: Option<&str>,
    phrase_index: Option<usize>,
    include_weather_hint: bool,
) -> Result<AlsBlock, AlsError> {
    let tpl = templates::find(country_code)
        .ok_or_else(|| AlsError::UnsupportedCountry(country_code.to_string()))?;

    let tz = resolve_timezone(tpl, tz_override);
    let now = now.unwrap_or_else(Utc::now);
    let local = now.with_timezone(&tz);
    let stamp = local.format("%Y-%m-%d %H:%M").to_string();
    let offset_str = local.format("%:z").to_string();
    let day_bucket = local.format("%Y-%m-%d").to_string();

    let idx = phrase_index.unwrap_or(0) % tpl.phrases.len();
    let phrase = tpl.phrases[idx];

    let weather_possible = include_weather_hint && !tpl.weather_stub_local.is_empty();

    let mut header = tpl.header;
    let mut weather = weather_possible;
    let mut text = build_text(header, &stamp, &offset_str, tpl, phrase, weather);
    let mut nfc_length = text.nfc().count();

    if nfc_length > MAX_CHARS && weather {
        weather = false;
        text = build_text(header, &stamp, &offset_str, tpl, phrase, weather);
        nfc_length = text.nfc().count();
    }

    if nfc_length > MAX_CHARS {
        header = NEUTRAL_HEADER;
        text = build_text(header, &stamp, &offset_str, tpl, phrase, weather);
        nfc_length = text.nfc().count();
    }

    if nfc_length > MAX_CHARS {
        return Err(AlsError::Overflow {
            country: tpl.code.to_string(),
            actual: nfc_length,
            limit: MAX_CHARS,
        });
    }

    let sha256 = hex::encode(Sha256::digest(text.as_bytes()));

    Ok(AlsBlock {
        country_code: tpl.code.to_string(),
        timezone: tz,
        rendered_text: text,
        sha256,
        variant_id: variant_id(tpl.code, idx, &day_bucket),
        nfc_length,
    })
}

#[must_use]
pub fn supported_countries() -> Vec<&'static str> {
    templates::supported_countries()
}

#[must_use]
pub fn last_updated() -> &'static str {
    "2025-08-12"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 12, 12, 5, 0).unwrap()
    }

    #[test]
    fn render_is_deterministic_given_identical_inputs() {
        let a = render("DE", Some(fixed_now()), None, Some(0), true).unwrap();
        let b = render("DE", Some(fixed_now()), None, Some(0), true).unwrap();
        assert_eq!(a.rendered_text, b.rendered_text);
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.variant_id, b.variant_id);
    }

    #[test]
    fn render_stays_under_350_nfc_chars() {
        for code in supported_countries() {
            let block = render(code, Some(fixed_now()), None, Some(0), true).unwrap();
            assert!(block.nfc_length <= 350, "{code} exceeded budget");
        }
    }

    #[test]
    fn germany_offset_is_summer_plus_two() {
        let block = render("DE", Some(fixed_now()), None, Some(0), true).unwrap();
        assert!(block.rendered_text.contains("+02:00"));
        assert!(block.rendered_text.contains("Bürgeramt"));
    }

    #[test]
    fn phrase_index_wraps_modulo_phrase_count() {
        let a = render("FR", Some(fixed_now()), None, Some(0), true).unwrap();
        let wrapped = render("FR", Some(fixed_now()), None, Some(7), true).unwrap();
        assert_eq!(a.rendered_text, wrapped.rendered_text);
    }

    #[test]
    fn missing_phrase_index_defaults_to_zero() {
        let default = render("US", Some(fixed_now()), None, None, true).unwrap();
        let explicit_zero = render("US", Some(fixed_now()), None, Some(0), true).unwrap();
        assert_eq!(default.rendered_text, explicit_zero.rendered_text);
    }

    #[test]
    fn unsupported_country_is_an_error() {
        assert!(render("ZZ", Some(fixed_now()), None, None, true).is_err());
    }

    #[test]
    fn tz_override_changes_offset() {
        let tokyo = render("US", Some(fixed_now()), Some("Asia/Tokyo"), Some(0), true).unwrap();
        assert!(tokyo.rendered_text.contains("+09:00"));
    }

    #[test]
    fn user_message_is_never_touched_by_als_rendering() {
        // ALS operates purely on its own inputs; this test documents that
        // the function signature has no user-content parameter at all.
        let block = render("GB", Some(fixed_now()), None, Some(0), true).unwrap();
        assert!(!block.rendered_text.is_empty());
    }
}
