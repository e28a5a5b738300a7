use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;

pub const INVITATION_TOKEN_LEN: usize = 32;

/// Fresh single-use invitation token drawn from the thread-local CSPRNG.
pub fn generate_invitation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Accept and decline links sent to an invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationLinks {
    pub accept: String,
    pub decline: String,
}

impl InvitationLinks {
    pub fn new(base_url: &str, token: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            accept: format!("{base}/set-password?token={token}"),
            decline: format!("{base}/decline-invitation?token={token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_32_alphanumeric_chars() {
        let token = generate_invitation_token();
        assert_eq!(token.len(), INVITATION_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_invitation_token());
    }

    #[test]
    fn links_strip_trailing_slash() {
        let links = InvitationLinks::new("http://localhost:5173/", "abc");
        assert_eq!(links.accept, "http://localhost:5173/set-password?token=abc");
        assert_eq!(links.decline, "http://localhost:5173/decline-invitation?token=abc");
    }
}
