use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlsError {
    #[error("unsupported country code: {0}")]
    UnsupportedCountry(String),

    #[error("als block too long ({actual} NFC chars, limit {limit}) for {country}")]
    Overflow {
        country: String,
        actual: usize,
        limit: usize,
    },
}
