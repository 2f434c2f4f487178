//! Secret Material Policy
//!
//! Decides, per credential field, whether to keep the caller's value or
//! produce a fresh one. [`SecretPolicy::complete`] never mutates its input:
//! it either returns a fully populated copy or fails before anything
//! downstream runs.

pub mod source;

pub use source::*;

use crate::config::{is_present, DeploymentParameters};
use crate::domain::ports::{PasswordPromptRef, SecretSource, SecretSourceRef};
use crate::error::Result;
use crate::prompt::{
    request_password, validate_shared_password, DisabledPrompt, DEFAULT_MAX_ATTEMPTS,
    SHARED_PASSWORD_LABEL,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Generate-once credential policy
#[derive(Clone)]
pub struct SecretPolicy {
    source: SecretSourceRef,
    prompt: PasswordPromptRef,
    max_prompt_attempts: u32,
}

impl SecretPolicy {
    /// Create a policy drawing from `source` and asking `prompt` for a
    /// missing shared password
    pub fn new(source: SecretSourceRef, prompt: PasswordPromptRef) -> Self {
        Self {
            source,
            prompt,
            max_prompt_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Policy with the system source and no interactive prompt
    pub fn non_interactive() -> Self {
        Self::new(Arc::new(SystemSecretSource), Arc::new(DisabledPrompt))
    }

    pub fn with_max_prompt_attempts(mut self, attempts: u32) -> Self {
        self.max_prompt_attempts = attempts;
        self
    }

    /// Return a copy of `params` with every credential field populated
    pub fn complete(&self, params: &DeploymentParameters) -> Result<DeploymentParameters> {
        let mut completed = params.clone();

        fill_token(&mut completed.session_key, "sessionKey", self.source.as_ref());
        fill_token(
            &mut completed.postgres_password,
            "postgresPassword",
            self.source.as_ref(),
        );
        fill_token(
            &mut completed.object_store_access_key,
            "objectStoreAccessKey",
            self.source.as_ref(),
        );
        fill_token(
            &mut completed.object_store_secret_key,
            "objectStoreSecretKey",
            self.source.as_ref(),
        );

        if is_present(&completed.shared_password_bcrypt) {
            debug!("Keeping supplied shared password hash");
        } else {
            let plaintext = match completed.shared_password.as_deref() {
                Some(p) if !p.is_empty() => p.to_string(),
                _ => request_password(
                    self.prompt.as_ref(),
                    SHARED_PASSWORD_LABEL,
                    self.max_prompt_attempts,
                    validate_shared_password,
                )?,
            };
            let hash = self.source.hash_password(&plaintext)?;
            info!("Hashed console shared password");
            completed.shared_password = Some(plaintext);
            completed.shared_password_bcrypt = Some(hash);
        }

        Ok(completed)
    }
}

impl std::fmt::Debug for SecretPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPolicy")
            .field("max_prompt_attempts", &self.max_prompt_attempts)
            .finish_non_exhaustive()
    }
}

fn fill_token(field: &mut Option<String>, name: &str, source: &dyn SecretSource) {
    if is_present(field) {
        debug!("Keeping supplied {}", name);
    } else {
        *field = Some(source.random_token());
        debug!("Generated {}", name);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::prompt::tests::ScriptedPrompt;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;

    /// Deterministic source counting every draw
    #[derive(Default)]
    pub(crate) struct CountingSource {
        pub(crate) tokens: Mutex<u32>,
        pub(crate) hashes: Mutex<Vec<String>>,
        pub(crate) fail_hash: bool,
    }

    impl SecretSource for CountingSource {
        fn random_token(&self) -> String {
            let mut n = self.tokens.lock();
            *n += 1;
            format!("token-{}", *n)
        }

        fn hash_password(&self, plaintext: &str) -> Result<String> {
            if self.fail_hash {
                return Err(Error::Hash(bcrypt::BcryptError::CostNotAllowed(99)));
            }
            self.hashes.lock().push(plaintext.to_string());
            Ok(format!("hashed:{}", plaintext))
        }
    }

    fn policy(source: Arc<CountingSource>, prompt: Arc<ScriptedPrompt>) -> SecretPolicy {
        SecretPolicy::new(source, prompt)
    }

    #[test]
    fn test_fills_every_empty_field_once() {
        let source = Arc::new(CountingSource::default());
        let prompt = Arc::new(ScriptedPrompt::entering(&[]));
        let mut params = DeploymentParameters::new("ns1");
        params.shared_password = Some("hunter22".into());

        let completed = policy(source.clone(), prompt.clone()).complete(&params).unwrap();

        assert_eq!(*source.tokens.lock(), 4);
        assert_eq!(source.hashes.lock().as_slice(), ["hunter22"]);
        assert_eq!(*prompt.asked.lock(), 0);
        assert!(completed.credentials().is_ok());
        assert_eq!(completed.shared_password_bcrypt.as_deref(), Some("hashed:hunter22"));

        // The input is untouched
        assert!(params.session_key.is_none());
        assert!(params.shared_password_bcrypt.is_none());
    }

    #[test]
    fn test_supplied_fields_are_unchanged() {
        let source = Arc::new(CountingSource::default());
        let prompt = Arc::new(ScriptedPrompt::entering(&[]));
        let params = DeploymentParameters {
            session_key: Some("s".into()),
            postgres_password: Some("p".into()),
            shared_password: None,
            shared_password_bcrypt: Some("$2b$10$existing".into()),
            object_store_access_key: Some("a".into()),
            object_store_secret_key: Some("k".into()),
            ..DeploymentParameters::new("ns1")
        };

        let completed = policy(source.clone(), prompt.clone()).complete(&params).unwrap();

        assert_eq!(completed, params);
        assert_eq!(*source.tokens.lock(), 0);
        assert!(source.hashes.lock().is_empty());
        assert_eq!(*prompt.asked.lock(), 0);
    }

    #[test]
    fn test_blank_fields_are_regenerated() {
        let source = Arc::new(CountingSource::default());
        let prompt = Arc::new(ScriptedPrompt::entering(&[]));
        let params = DeploymentParameters {
            session_key: Some(String::new()),
            shared_password: Some("hunter22".into()),
            ..DeploymentParameters::new("ns1")
        };

        let completed = policy(source, prompt).complete(&params).unwrap();
        assert!(completed.session_key.unwrap().starts_with("token-"));
    }

    #[test]
    fn test_second_pass_keeps_computed_hash() {
        let source = Arc::new(CountingSource::default());
        let prompt = Arc::new(ScriptedPrompt::entering(&[]));
        let p = policy(source.clone(), prompt);
        let mut params = DeploymentParameters::new("ns1");
        params.shared_password = Some("hunter22".into());

        let first = p.complete(&params).unwrap();
        let second = p.complete(&first).unwrap();

        assert_eq!(first, second);
        assert_eq!(source.hashes.lock().len(), 1);
    }

    #[test]
    fn test_prompts_when_plaintext_missing() {
        let source = Arc::new(CountingSource::default());
        let prompt = Arc::new(ScriptedPrompt::entering(&["no", "long-enough"]));

        let completed = policy(source.clone(), prompt.clone())
            .complete(&DeploymentParameters::new("ns1"))
            .unwrap();

        assert_eq!(*prompt.asked.lock(), 2);
        assert_eq!(completed.shared_password.as_deref(), Some("long-enough"));
        assert_eq!(source.hashes.lock().as_slice(), ["long-enough"]);
    }

    #[test]
    fn test_cancelled_prompt_is_fatal() {
        let source = Arc::new(CountingSource::default());
        let prompt = Arc::new(ScriptedPrompt::new(vec![]));

        let result = policy(source.clone(), prompt).complete(&DeploymentParameters::new("ns1"));

        assert_matches!(result, Err(Error::PromptCancelled));
        assert!(source.hashes.lock().is_empty());
    }

    #[test]
    fn test_hash_failure_is_fatal() {
        let source = Arc::new(CountingSource {
            fail_hash: true,
            ..Default::default()
        });
        let prompt = Arc::new(ScriptedPrompt::entering(&[]));
        let mut params = DeploymentParameters::new("ns1");
        params.shared_password = Some("hunter22".into());

        assert_matches!(
            policy(source, prompt).complete(&params),
            Err(Error::Hash(_))
        );
    }

    #[test]
    fn test_system_policy_hashes_supplied_plaintext() {
        let mut params = DeploymentParameters::new("ns1");
        params.shared_password = Some("hunter22".into());

        let completed = SecretPolicy::non_interactive().complete(&params).unwrap();
        let hash = completed.shared_password_bcrypt.unwrap();
        assert!(bcrypt::verify("hunter22", &hash).unwrap());
    }
}
