use chrono_tz::Tz;

/// A country's ambient-context template. All fields are static data; there
/// is no per-process mutation, so the table is a plain slice rather than a
/// `HashMap` behind a lock.
pub struct CountryTemplate {
    pub code: &'static str,
    pub timezone: Option<Tz>,
    pub timezone_samples: &'static [Tz],
    pub civic_keyword: &'static str,
    pub phrases: &'static [&'static str],
    pub formatting_example: &'static str,
    pub weather_stub_local: &'static str,
    pub header: &'static str,
}

/// Neutral English header used as the length-recovery fallback (§4.1
/// "Length-recovery policy", step 2) and as the default for any country
/// without a localized header.
pub const NEUTRAL_HEADER: &str = "Ambient Context (localization only; do not cite):";

macro_rules! tpl {
    (
        code: $code:expr,
        timezone: $tz:expr,
        civic_keyword: $kw:expr,
        phrases: $phrases:expr,
        formatting_example: $fmt:expr,
        weather_stub_local: $weather:expr,
        header: $header:expr $(,)?
    ) => {
        CountryTemplate {
            code: $code,
            timezone: Some($tz),
            timezone_samples: &[],
            civic_keyword: $kw,
            phrases: $phrases,
            formatting_example: $fmt,
            weather_stub_local: $weather,
            header: $header,
        }
    };
}

pub const TEMPLATES: &[CountryTemplate] = &[
    tpl! {
        code: "DE",
        timezone: chrono_tz::Europe::Berlin,
        civic_keyword: "Bürgeramt",
        phrases: &[
            "Reisepass beantragen Termin",
            "Führerschein umtauschen",
            "Anmeldung Bürgeramt",
            "ELSTER Steuererklärung",
            "Kindergeld Antrag",
            "Aufenthaltstitel verlängern",
        ],
        formatting_example: "10115 Berlin \u{b7} +49 30 xxx xx xx \u{b7} 12,90 \u{20ac}",
        weather_stub_local: "Nationaler Wetterdienst: Berlin",
        header: "Lokaler Kontext (nur zur Lokalisierung; nicht zitieren):",
    },
    tpl! {
        code: "CH",
        timezone: chrono_tz::Europe::Zurich,
        civic_keyword: "Bundesverwaltung",
        phrases: &[
            "Führerausweis verlängern / renouveler permis",
            "AHV / AVS Nummer",
            "e-Umzug melden",
            "Steuererklärung einreichen",
            "ID verlängern",
            "Einwohnerkontrolle",
        ],
        formatting_example: "8001 Zürich \u{b7} +41 44 xxx xx xx \u{b7} CHF 12.90",
        weather_stub_local: "Nationaler Wetterdienst: Zürich",
        header: "Lokaler Kontext (nur zur Lokalisierung; nicht zitieren):",
    },
    CountryTemplate {
        code: "US",
        timezone: None,
        timezone_samples: &[
            chrono_tz::America::New_York,
            chrono_tz::America::Chicago,
            chrono_tz::America::Denver,
            chrono_tz::America::Los_Angeles,
        ],
        civic_keyword: "state DMV",
        phrases: &[
            "driver license renewal appointment",
            "passport application online",
            "Social Security card replacement",
            "voter registration",
            "IRS tax return filing",
            "REAL ID appointment",
            "vehicle registration",
        ],
        formatting_example: "New York, NY 10001 \u{b7} (212) xxx-xxxx \u{b7} $12.90",
        weather_stub_local: "national weather service: New York",
        header: "Ambient Context (localization only; do not cite):",
    },
    tpl! {
        code: "GB",
        timezone: chrono_tz::Europe::London,
        civic_keyword: "GOV.UK",
        phrases: &[
            "driving licence renewal online",
            "passport renewal",
            "council tax payment",
            "NHS GP registration",
            "National Insurance number",
            "Universal Credit claim",
            "MOT test booking",
        ],
        formatting_example: "London SW1A 1AA \u{b7} +44 20 xxxx xxxx \u{b7} \u{a3}12.90",
        weather_stub_local: "national weather service: London",
        header: "Ambient Context (localisation only; do not cite):",
    },
    tpl! {
        code: "AE",
        timezone: chrono_tz::Asia::Dubai,
        civic_keyword: "الهوية والجنسية (ICP)",
        phrases: &[
            "تجديد بطاقة الهوية الإماراتية",
            "حالة تأشيرة الإقامة",
            "سداد المخالفات المرورية",
            "تسجيل عقد الإيجار",
            "تجديد الرخصة التجارية",
            "فحص اللياقة الطبية",
            "تجديد رخصة القيادة",
        ],
        formatting_example: "دبي ص.ب. \u{b7} +971 4 xxx xxxx \u{b7} 49.00 د.إ",
        weather_stub_local: "الخدمة الوطنية للأرصاد: دبي",
        header: "سياق محلي (لأغراض تحديد الموقع فقط؛ لا تُذكر):",
    },
    tpl! {
        code: "SG",
        timezone: chrono_tz::Asia::Singapore,
        civic_keyword: "ICA",
        phrases: &[
            "passport appointment online",
            "Singpass login",
            "CPF statement",
            "FIN card renewal",
            "HDB BTO application",
            "MOM work pass status",
            "road tax renewal",
        ],
        formatting_example: "Singapore 049315 \u{b7} +65 6xxx xxxx \u{b7} S$12.90",
        weather_stub_local: "national weather service: Singapore",
        header: "Ambient Context (localization only; do not cite):",
    },
    tpl! {
        code: "IT",
        timezone: chrono_tz::Europe::Rome,
        civic_keyword: "Agenzia delle Entrate",
        phrases: &[
            "codice fiscale richiesta",
            "patente rinnovo",
            "SPID attivazione",
            "ISEE compilazione",
            "certificato di residenza",
            "Carta d'identità elettronica",
        ],
        formatting_example: "00100 Roma \u{b7} +39 06 xxxx xxxx \u{b7} 12,90 \u{20ac}",
        weather_stub_local: "servizio meteo nazionale: Roma",
        header: "Contesto locale (solo per la localizzazione; non citare):",
    },
    tpl! {
        code: "FR",
        timezone: chrono_tz::Europe::Paris,
        civic_keyword: "Service Public",
        phrases: &[
            "Carte d'identité renouvellement",
            "passeport demande en ligne",
            "permis de conduire",
            "Carte Vitale demande",
            "FranceConnect connexion",
            "impôts déclaration",
            "acte de naissance",
        ],
        formatting_example: "75001 Paris \u{b7} +33 1 xx xx xx xx \u{b7} 12,90 \u{20ac}",
        weather_stub_local: "service m\u{e9}t\u{e9}o national : Paris",
        header: "Contexte local (uniquement pour la localisation ; ne pas citer) :",
    },
];

#[must_use]
pub fn find(code: &str) -> Option<&'static CountryTemplate> {
    let upper = code.to_ascii_uppercase();
    TEMPLATES.iter().find(|t| t.code == upper)
}

#[must_use]
pub fn supported_countries() -> Vec<&'static str> {
    TEMPLATES.iter().map(|t| t.code).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Leak rule (§4.1): configured keyword/phrases must never contain the
    /// country's own TLD string or a bare URL substring.
    #[test]
    fn no_template_leaks_a_tld_or_url() {
        let tld_by_code = [("DE", ".de"), ("CH", ".ch"), ("FR", ".fr")];
        for tpl in TEMPLATES {
            for (code, tld) in tld_by_code {
                if tpl.code == code {
                    assert!(!tpl.civic_keyword.contains(tld));
                    for phrase in tpl.phrases {
                        assert!(!phrase.contains(tld));
                    }
                }
            }
            for banned in ["http://", "https://", "www."] {
                assert!(!tpl.civic_keyword.contains(banned));
                assert!(!tpl.formatting_example.contains(banned));
                for phrase in tpl.phrases {
                    assert!(!phrase.contains(banned));
                }
            }
        }
    }

    #[test]
    fn eight_countries_supported() {
        assert_eq!(supported_countries().len(), 8);
    }

    #[test]
    fn find_is_case_insensitive() {
        assert!(find("de").is_some());
        assert!(find("DE").is_some());
        assert!(find("zz").is_none());
    }
}
