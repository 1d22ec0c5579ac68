use crate::config::LimitsConfig;
use crate::error::{RelayError, Result};
use crate::types::Tier;
use serde::Serialize;

/// A bounded run of sequential message references sharing one prefix.
///
/// `https://t.me/chan/10` with a count of 3 covers `/10`, `/11` and `/12`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
    pub start_reference: String,
    pub prefix: String,
    pub start_index: u64,
    pub count: u32,
}

impl BatchRequest {
    pub fn parse(start_reference: &str, count: u32) -> Result<Self> {
        let start_reference = start_reference.trim();
        let (prefix, last) = start_reference
            .rsplit_once('/')
            .ok_or_else(|| RelayError::InvalidLink(start_reference.to_string()))?;
        if prefix.is_empty() {
            return Err(RelayError::InvalidLink(start_reference.to_string()));
        }
        let start_index: u64 = last
            .parse()
            .map_err(|_| RelayError::InvalidLink(start_reference.to_string()))?;
        if count == 0 {
            return Err(RelayError::InvalidCount(count.to_string()));
        }
        start_index
            .checked_add(u64::from(count))
            .ok_or_else(|| RelayError::InvalidCount(count.to_string()))?;

        Ok(Self {
            start_reference: start_reference.to_string(),
            prefix: prefix.to_string(),
            start_index,
            count,
        })
    }

    /// The `i`-th reference of the batch (0-based).
    pub fn reference_at(&self, i: u32) -> String {
        format!("{}/{}", self.prefix, self.start_index + u64::from(i))
    }

    pub fn references(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.count).map(move |i| self.reference_at(i))
    }
}

/// Parse the user's free-text reply to "How many messages?".
pub fn parse_count(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    match trimmed.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RelayError::InvalidCount(trimmed.to_string())),
    }
}

/// Largest batch a user of `tier` may request.
pub fn ceiling_for(tier: Tier, limits: &LimitsConfig) -> u32 {
    match tier {
        Tier::Free => limits.free_batch,
        Tier::Premium => limits.premium_batch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_sequential_references() {
        let batch = BatchRequest::parse("https://t.me/chan/10", 3).unwrap();
        let refs: Vec<String> = batch.references().collect();
        assert_eq!(
            refs,
            vec![
                "https://t.me/chan/10",
                "https://t.me/chan/11",
                "https://t.me/chan/12",
            ]
        );
    }

    #[test]
    fn keeps_private_channel_prefix() {
        let batch = BatchRequest::parse("https://t.me/c/123456/7", 2).unwrap();
        assert_eq!(batch.prefix, "https://t.me/c/123456");
        assert_eq!(batch.reference_at(1), "https://t.me/c/123456/8");
    }

    #[test]
    fn rejects_non_numeric_tail() {
        let err = BatchRequest::parse("https://t.me/chan", 3).unwrap_err();
        assert!(matches!(err, RelayError::InvalidLink(_)));
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(BatchRequest::parse("12", 1).is_err());
        assert!(BatchRequest::parse("/12", 1).is_err());
    }

    #[test]
    fn rejects_zero_count() {
        let err = BatchRequest::parse("https://t.me/chan/1", 0).unwrap_err();
        assert!(matches!(err, RelayError::InvalidCount(_)));
    }

    #[test]
    fn parse_count_trims_and_validates() {
        assert_eq!(parse_count(" 25\n").unwrap(), 25);
        assert!(parse_count("0").is_err());
        assert!(parse_count("ten").is_err());
        assert!(parse_count("-3").is_err());
    }

    #[test]
    fn ceiling_depends_on_tier() {
        let limits = LimitsConfig {
            free_batch: 5,
            premium_batch: 50,
        };
        assert_eq!(ceiling_for(Tier::Free, &limits), 5);
        assert_eq!(ceiling_for(Tier::Premium, &limits), 50);
    }
}
