//! One-time verification codes.
//!
//! Signup and login-by-code hand the caller a `(code, key)` pair: the 6-digit
//! code travels out-of-band (SMS/email) while the uuid key goes back to the
//! client, so intercepting one channel alone is not enough to redeem. Change
//! flows (new mobile/email) are single-factor - the requester is already
//! session-authenticated upstream - and park the proposed value in a pending
//! entry until the code is confirmed.
//!
//! The opportunity entry keyed by the phone number / email address is the
//! rate-limit gate: while it lives, callers must refuse to issue again so a
//! resend cannot clobber a code the user already received. Redemption leaves
//! it in place on purpose; callers clear it once they have acted on the
//! result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::codegen::CodeGenerator;
use crate::kv::KvStore;

/// Generation gives up after this many collisions. With 900k possible codes
/// and a two-minute TTL, reaching it means the backend is misbehaving.
const MAX_GENERATION_ATTEMPTS: usize = 64;

/// The pair returned by [`VerificationStore::issue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedVerification {
    /// 6-digit code, delivered out-of-band.
    pub code: String,
    /// uuid key, returned in-band to the client.
    pub key: String,
}

/// Which contact value a change flow replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Mobile,
    Email,
}

impl ChangeKind {
    fn pending_key(self, user_id: i64) -> String {
        match self {
            ChangeKind::Mobile => format!("mobile-{}", user_id),
            ChangeKind::Email => format!("email-{}", user_id),
        }
    }
}

/// A confirmed change request: who asked, and the value to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    pub user_id: i64,
    pub new_value: String,
}

/// Store for verification code issuance and redemption.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Issue a `(code, key)` pair for the user and open the opportunity gate
    /// for `subject` (their phone number or email address). Callers must
    /// check [`has_opportunity`](Self::has_opportunity) first and reject the
    /// request while it returns true.
    async fn issue(&self, user_id: i64, subject: &str) -> Result<IssuedVerification>;

    /// Whether a verification is already in flight for this subject.
    async fn has_opportunity(&self, subject: &str) -> Result<bool>;

    /// Redeem a pair. Returns the user id only if both tokens resolve to the
    /// same user; consumes them on success. The opportunity gate survives
    /// redemption - call [`clear_opportunity`](Self::clear_opportunity) once
    /// the result has been acted on.
    async fn redeem(&self, code: &str, key: &str) -> Result<Option<i64>>;

    /// Issue a single-factor code confirming a mobile/email change, parking
    /// `new_value` until it is redeemed.
    async fn issue_change(&self, user_id: i64, kind: ChangeKind, new_value: &str)
    -> Result<String>;

    /// Redeem a change code, consuming the code and the pending entry whether
    /// or not both were found.
    async fn redeem_change(&self, kind: ChangeKind, code: &str) -> Result<Option<ChangeRequest>>;

    /// Close the opportunity gate so the subject can start a new flow.
    async fn clear_opportunity(&self, subject: &str) -> Result<()>;

    /// Wipe the whole namespace. Reaper only.
    async fn clear(&self) -> Result<()>;
}

/// [`VerificationStore`] over an injected key-value backend.
pub struct KvVerificationStore {
    kv: Arc<dyn KvStore>,
    codes: Arc<dyn CodeGenerator>,
    ttl: Duration,
}

impl KvVerificationStore {
    pub fn new(kv: Arc<dyn KvStore>, codes: Arc<dyn CodeGenerator>, ttl: Duration) -> Self {
        Self { kv, codes, ttl }
    }

    /// Write a fresh code for the user, regenerating until unused. A fixed
    /// generator cannot produce a different code, so it overwrites instead.
    async fn place_code(&self, user_id: i64) -> Result<String> {
        let value = user_id.to_string();

        if !self.codes.retries_on_collision() {
            let code = self.codes.numeric_code();
            self.kv.set_ex(&code, &value, self.ttl).await?;
            return Ok(code);
        }

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let code = self.codes.numeric_code();
            if self.kv.set_nx_ex(&code, &value, self.ttl).await? {
                return Ok(code);
            }
        }
        bail!("no unused verification code after {MAX_GENERATION_ATTEMPTS} attempts")
    }

    async fn place_key(&self, user_id: i64) -> Result<String> {
        let value = user_id.to_string();

        // uuid collisions are vanishingly rare, but checked all the same
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let key = self.codes.unique_key();
            if self.kv.set_nx_ex(&key, &value, self.ttl).await? {
                return Ok(key);
            }
        }
        bail!("no unused verification key after {MAX_GENERATION_ATTEMPTS} attempts")
    }
}

#[async_trait]
impl VerificationStore for KvVerificationStore {
    async fn issue(&self, user_id: i64, subject: &str) -> Result<IssuedVerification> {
        let code = self.place_code(user_id).await?;
        let key = self.place_key(user_id).await?;
        self.kv
            .set_ex(subject, &user_id.to_string(), self.ttl)
            .await?;

        Ok(IssuedVerification { code, key })
    }

    async fn has_opportunity(&self, subject: &str) -> Result<bool> {
        Ok(self.kv.get(subject).await?.is_some())
    }

    async fn redeem(&self, code: &str, key: &str) -> Result<Option<i64>> {
        let by_code = self.kv.get(code).await?;
        let by_key = self.kv.get(key).await?;

        let user_id = match (by_code, by_key) {
            (Some(a), Some(b)) if a == b => a,
            // Miss or mismatch leaves both entries alone: a guessed code must
            // not invalidate the legitimate user's pair.
            _ => return Ok(None),
        };

        // Atomic take arbitrates concurrent redemptions: one caller gets the
        // code back, everyone else sees None.
        match self.kv.take(code).await? {
            Some(taken) if taken == user_id => {}
            _ => return Ok(None),
        }
        self.kv.delete(key).await?;

        Ok(Some(user_id.parse()?))
    }

    async fn issue_change(
        &self,
        user_id: i64,
        kind: ChangeKind,
        new_value: &str,
    ) -> Result<String> {
        let code = self.place_code(user_id).await?;
        self.kv
            .set_ex(&kind.pending_key(user_id), new_value, self.ttl)
            .await?;
        self.kv
            .set_ex(new_value, &user_id.to_string(), self.ttl)
            .await?;

        Ok(code)
    }

    async fn redeem_change(&self, kind: ChangeKind, code: &str) -> Result<Option<ChangeRequest>> {
        let Some(raw_user_id) = self.kv.take(code).await? else {
            return Ok(None);
        };
        let user_id: i64 = raw_user_id.parse()?;

        // Consumed even when absent, so a half-redeemed flow leaves no
        // orphaned pending state behind.
        let Some(new_value) = self.kv.take(&kind.pending_key(user_id)).await? else {
            return Ok(None);
        };

        if kind == ChangeKind::Mobile {
            // issue_change gated on the new number; a confirmed change frees
            // it immediately so the user can start another flow.
            self.kv.delete(&new_value).await?;
        }

        Ok(Some(ChangeRequest { user_id, new_value }))
    }

    async fn clear_opportunity(&self, subject: &str) -> Result<()> {
        self.kv.delete(subject).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.kv.clear().await
    }
}

/// Normalizes an Iranian mobile number to its bare `9xxxxxxxxx` form:
/// strips a leading `+98`/`98` country prefix and collapses a leading `09`.
pub fn normalize_mobile(mobile: &str) -> String {
    let without_country = mobile
        .strip_prefix("+98")
        .or_else(|| mobile.strip_prefix("98"))
        .unwrap_or(mobile);

    match without_country.strip_prefix("09") {
        Some(rest) => format!("9{}", rest),
        None => without_country.to_string(),
    }
}
