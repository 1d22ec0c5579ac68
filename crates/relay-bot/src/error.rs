use thiserror::Error;

/// Failure signalled by a platform collaborator (messenger, fetcher, session
/// factory, credential store).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// Flood control: the platform demands a pause before the next call.
    #[error("flood wait of {seconds} seconds")]
    FloodWait { seconds: u64 },

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// Why a job that was admitted ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("login required for private links")]
    AuthRequired,

    #[error("rate limited for {seconds} seconds")]
    RateLimited { seconds: u64 },

    #[error("transfer failed: {0}")]
    Transfer(String),
}

impl JobError {
    /// Text shown to the user when the job fails.
    pub fn user_message(&self) -> String {
        match self {
            JobError::AuthRequired => "Login required for private links.".to_string(),
            JobError::RateLimited { seconds } => {
                format!("FloodWait: Try again after {seconds} seconds.")
            }
            JobError::Transfer(detail) => format!("Error:\n<code>{}</code>", escape_html(detail)),
        }
    }
}

impl From<PlatformError> for JobError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::FloodWait { seconds } => JobError::RateLimited { seconds },
            other => JobError::Transfer(other.to_string()),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_wait_maps_to_rate_limited() {
        let err: JobError = PlatformError::FloodWait { seconds: 30 }.into();
        assert_eq!(err, JobError::RateLimited { seconds: 30 });
        assert_eq!(err.user_message(), "FloodWait: Try again after 30 seconds.");
    }

    #[test]
    fn other_errors_map_to_transfer_verbatim() {
        let err: JobError = PlatformError::Other("MEDIA_EMPTY".into()).into();
        assert_eq!(err, JobError::Transfer("MEDIA_EMPTY".into()));
        assert_eq!(err.user_message(), "Error:\n<code>MEDIA_EMPTY</code>");
    }

    #[test]
    fn transfer_message_is_escaped() {
        let err = JobError::Transfer("<b>bad</b> & worse".into());
        assert_eq!(
            err.user_message(),
            "Error:\n<code>&lt;b&gt;bad&lt;/b&gt; &amp; worse</code>"
        );
    }
}
