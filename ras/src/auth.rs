//! Message authentication: tokens added to outgoing requests and checked on
//! incoming responses.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use h323_messages::RasMessage;
use h323_types::{CryptoToken, Timestamp};

type HmacSha256 = Hmac<Sha256>;

/// Outcome of checking one message against one authenticator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthResult {
    /// A token this authenticator understands was present and verified.
    Ok,
    /// No token for this authenticator; acceptable unless it is mandatory.
    Absent,
    Failed(String),
}

/// One security mechanism (H.235-style).
pub trait Authenticator: Send + Sync {
    fn name(&self) -> &str;

    /// Attach this mechanism's tokens to an outgoing message. Called after
    /// the sequence number is assigned, and again if it changes.
    fn prepare(&self, message: &mut RasMessage);

    fn validate(&self, message: &RasMessage) -> AuthResult;
}

/// The mechanisms an endpoint applies to every transaction.
#[derive(Clone, Default)]
pub struct AuthenticatorSet {
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl AuthenticatorSet {
    pub fn new(authenticators: Vec<Arc<dyn Authenticator>>) -> Self {
        Self { authenticators }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticators.push(authenticator);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    pub fn prepare(&self, message: &mut RasMessage) {
        for auth in &self.authenticators {
            auth.prepare(message);
        }
    }

    /// Every authenticator must accept (or find nothing to check).
    pub fn validate(&self, message: &RasMessage) -> Result<(), String> {
        for auth in &self.authenticators {
            if let AuthResult::Failed(reason) = auth.validate(message) {
                return Err(format!("{}: {reason}", auth.name()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthenticatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.authenticators.iter().map(|a| a.name()).collect();
        f.debug_tuple("AuthenticatorSet").field(&names).finish()
    }
}

/// Shared-secret HMAC-SHA256 over the token's sender, timestamp and nonce
/// plus the whole encoded message with its crypto tokens left out.
pub struct HmacAuthenticator {
    sender_id: String,
    key: Vec<u8>,
    max_skew_secs: u64,
    /// Fail responses that carry no verifiable token.
    required: bool,
}

impl HmacAuthenticator {
    pub fn new(sender_id: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            sender_id: sender_id.into(),
            key: key.into(),
            max_skew_secs: 30,
            required: true,
        }
    }

    pub fn with_max_skew(mut self, secs: u64) -> Self {
        self.max_skew_secs = secs;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn mac(&self, token: &CryptoToken, message: &RasMessage) -> Option<HmacSha256> {
        let mut unsigned = message.clone();
        unsigned.security_mut().crypto.clear();
        let body = bincode::serialize(&unsigned).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(token.sender_id.as_bytes());
        mac.update(&token.timestamp.as_secs().to_be_bytes());
        mac.update(&token.random.to_be_bytes());
        mac.update(&body);
        Some(mac)
    }
}

impl Authenticator for HmacAuthenticator {
    fn name(&self) -> &str {
        "hmac-sha256"
    }

    fn prepare(&self, message: &mut RasMessage) {
        let mut token = CryptoToken {
            sender_id: self.sender_id.clone(),
            timestamp: Timestamp::now(),
            random: rand::random::<u32>(),
            digest: Vec::new(),
        };
        let Some(mac) = self.mac(&token, message) else {
            return;
        };
        token.digest = mac.finalize().into_bytes().to_vec();
        let security = message.security_mut();
        security.crypto.retain(|t| t.sender_id != self.sender_id);
        security.crypto.push(token);
    }

    fn validate(&self, message: &RasMessage) -> AuthResult {
        let tokens = &message.security().crypto;
        if tokens.is_empty() {
            return if self.required {
                AuthResult::Failed("missing crypto token".into())
            } else {
                AuthResult::Absent
            };
        }
        let now = Timestamp::now();
        for token in tokens {
            if token.timestamp.abs_diff(now) > self.max_skew_secs {
                return AuthResult::Failed(format!(
                    "timestamp {} outside allowed skew",
                    token.timestamp
                ));
            }
            let Some(mac) = self.mac(token, message) else {
                return AuthResult::Failed("cannot compute digest".into());
            };
            if mac.verify_slice(&token.digest).is_ok() {
                return AuthResult::Ok;
            }
        }
        AuthResult::Failed("digest mismatch".into())
    }
}

impl std::fmt::Debug for HmacAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacAuthenticator")
            .field("sender_id", &self.sender_id)
            .field("max_skew_secs", &self.max_skew_secs)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h323_messages::{AdmissionConfirm, CallModel, InfoRequestAck, SecurityTokens};
    use h323_types::{Bandwidth, SequenceNumber};

    fn iack(seq: u16) -> RasMessage {
        InfoRequestAck {
            seq: SequenceNumber::new(seq),
            security: SecurityTokens::default(),
        }
        .into()
    }

    #[test]
    fn signed_message_validates() {
        let auth = HmacAuthenticator::new("gk", b"secret".to_vec());
        let mut msg = iack(7);
        auth.prepare(&mut msg);
        assert_eq!(msg.security().crypto.len(), 1);
        assert_eq!(auth.validate(&msg), AuthResult::Ok);
    }

    #[test]
    fn reprepare_replaces_own_token() {
        let auth = HmacAuthenticator::new("ep", b"secret".to_vec());
        let mut msg = iack(7);
        auth.prepare(&mut msg);
        msg.set_sequence_number(SequenceNumber::new(8));
        auth.prepare(&mut msg);
        assert_eq!(msg.security().crypto.len(), 1);
        assert_eq!(auth.validate(&msg), AuthResult::Ok);
    }

    #[test]
    fn tampered_sequence_fails() {
        let auth = HmacAuthenticator::new("gk", b"secret".to_vec());
        let mut msg = iack(7);
        auth.prepare(&mut msg);
        msg.set_sequence_number(SequenceNumber::new(9));
        assert!(matches!(auth.validate(&msg), AuthResult::Failed(_)));
    }

    fn acf() -> RasMessage {
        AdmissionConfirm {
            seq: SequenceNumber::new(11),
            bandwidth: Bandwidth::from_kbps(128),
            call_model: CallModel::Direct,
            dest_call_signal_address: Some("192.0.2.20:1720".parse().unwrap()),
            irr_frequency: None,
            destination_info: Vec::new(),
            alternate_endpoints: Vec::new(),
            will_respond_to_irr: false,
            security: SecurityTokens::default(),
        }
        .into()
    }

    #[test]
    fn altered_body_fails() {
        let gk = HmacAuthenticator::new("gk", b"secret".to_vec());
        let mut msg = acf();
        gk.prepare(&mut msg);
        assert_eq!(gk.validate(&msg), AuthResult::Ok);

        let RasMessage::AdmissionConfirm(confirm) = &mut msg else {
            unreachable!()
        };
        confirm.dest_call_signal_address = Some("203.0.113.66:1720".parse().unwrap());
        confirm.bandwidth = Bandwidth::from_kbps(99_999);
        assert!(matches!(gk.validate(&msg), AuthResult::Failed(_)));
    }

    #[test]
    fn token_does_not_transfer_to_another_message() {
        let gk = HmacAuthenticator::new("gk", b"secret".to_vec());
        let mut signed = acf();
        gk.prepare(&mut signed);

        let mut other = acf();
        if let RasMessage::AdmissionConfirm(confirm) = &mut other {
            confirm.bandwidth = Bandwidth::from_kbps(64);
        }
        other.security_mut().crypto = signed.security().crypto.clone();
        assert!(matches!(gk.validate(&other), AuthResult::Failed(_)));
    }

    #[test]
    fn clear_tokens_are_covered() {
        let gk = HmacAuthenticator::new("gk", b"secret".to_vec());
        let mut msg = acf();
        gk.prepare(&mut msg);
        msg.security_mut()
            .clear
            .push(h323_types::ClearToken::new("1.2.3".parse().unwrap()));
        assert!(matches!(gk.validate(&msg), AuthResult::Failed(_)));
    }

    #[test]
    fn wrong_key_fails() {
        let signer = HmacAuthenticator::new("gk", b"one".to_vec());
        let checker = HmacAuthenticator::new("gk", b"two".to_vec());
        let mut msg = iack(1);
        signer.prepare(&mut msg);
        assert!(matches!(checker.validate(&msg), AuthResult::Failed(_)));
    }

    #[test]
    fn missing_token_depends_on_requirement() {
        let strict = HmacAuthenticator::new("gk", b"k".to_vec());
        let lax = HmacAuthenticator::new("gk", b"k".to_vec()).optional();
        assert!(matches!(strict.validate(&iack(1)), AuthResult::Failed(_)));
        assert_eq!(lax.validate(&iack(1)), AuthResult::Absent);
    }

    #[test]
    fn stale_timestamp_fails() {
        let auth = HmacAuthenticator::new("gk", b"k".to_vec());
        let mut msg = iack(3);
        auth.prepare(&mut msg);
        msg.security_mut().crypto[0].timestamp = Timestamp::new(1);
        assert!(matches!(auth.validate(&msg), AuthResult::Failed(_)));
    }

    #[test]
    fn set_reports_first_failure() {
        let set = AuthenticatorSet::empty()
            .with(Arc::new(HmacAuthenticator::new("gk", b"k".to_vec())));
        let err = set.validate(&iack(1)).unwrap_err();
        assert!(err.starts_with("hmac-sha256"));
        assert!(AuthenticatorSet::empty().validate(&iack(1)).is_ok());
    }
}
