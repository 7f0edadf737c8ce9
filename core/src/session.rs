//! session.rs
//! Caller-owned authentication context.
//!
//! An `AuthSession` threads one validated configuration through the pipeline
//! components and the template store. Enrollment and authentication are
//! all-or-nothing: a template is written only after every stage succeeded,
//! and cancellation is observed between stages.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, blend};
use crate::capture::{CaptureGuard, SignalSource};
use crate::config::EngineConfig;
use crate::constants::MIN_MAGNITUDE;
use crate::crypto::FeatureHasher;
use crate::matcher::{AuthResult, SimilarityMatcher};
use crate::record::{Template, Username};
use crate::signal::{FeatureExtractor, FeatureVector, MentalTask, RawSignal};
use crate::store::TemplateStore;
use crate::telemetry::{Stage, StageTimes, TelemetryTimer};
use crate::types::{ExitStatus, NeuroError, Outcome};
use crate::utils::{magnitude, now_secs};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set.
    pub fn check(&self) -> Result<(), NeuroError> {
        if self.is_cancelled() {
            return Err(NeuroError::Cancelled);
        }
        Ok(())
    }
}

/// Successful enrollment.
#[derive(Debug, Clone)]
pub struct EnrollReport {
    pub username: Username,
    pub path: PathBuf,
    pub trials: usize,
    pub timings: StageTimes,
}

impl Outcome for EnrollReport {
    fn exit_status(&self) -> ExitStatus {
        ExitStatus::Success
    }
}

#[derive(Debug)]
pub struct AuthSession {
    config: EngineConfig,
    store: TemplateStore,
    extractor: FeatureExtractor,
    hasher: FeatureHasher,
    matcher: SimilarityMatcher,
    cancel: CancelToken,
}

impl AuthSession {
    pub fn new(config: EngineConfig) -> Result<Self, NeuroError> {
        config.validate()?;
        let extractor = FeatureExtractor::from_config(&config)?;
        let hasher = FeatureHasher::new(config.hash_alg, config.salt_len)?;
        let matcher = SimilarityMatcher::new(config.similarity_threshold)?;
        let store = TemplateStore::new(config.template_dir.clone(), config.hash_alg);
        Ok(Self { config, store, extractor, hasher, matcher, cancel: CancelToken::new() })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    fn username(raw: &str) -> Result<Username, NeuroError> {
        Username::parse(raw).map_err(|e| NeuroError::Validation(e.to_string()))
    }

    // ============================================================
    // Enrollment
    // ============================================================

    /// Build and persist a template from `trials`.
    pub fn enroll(&self, username: &str, trials: &[RawSignal]) -> Result<EnrollReport, NeuroError> {
        let mut timer = TelemetryTimer::new();
        self.enroll_timed(username, trials, &mut timer)
    }

    fn enroll_timed(
        &self,
        username: &str,
        trials: &[RawSignal],
        timer: &mut TelemetryTimer,
    ) -> Result<EnrollReport, NeuroError> {
        let user = Self::username(username)?;
        self.cancel.check()?;
        if trials.is_empty() {
            return Err(NeuroError::validation("enrollment needs at least one trial"));
        }

        self.store.ensure_dir()?;
        let lock = self.store.lock(&user)?;
        if self.store.exists(&user) {
            return Err(NeuroError::validation(format!("user '{}' is already enrolled", user)));
        }

        let vectors = timer.time(Stage::Extract, || self.extractor.extract_batch(trials))?;
        self.cancel.check()?;

        let mean = timer.time(Stage::Aggregate, || aggregate(&vectors))?;
        drop(vectors);
        if magnitude(mean.as_slice()) < MIN_MAGNITUDE {
            return Err(NeuroError::validation("enrollment trials carry no signal energy"));
        }
        self.cancel.check()?;

        let seal = timer.time(Stage::Seal, || self.hasher.seal(&mean))?;
        self.cancel.check()?;

        let template = Template::new(user.clone(), mean, seal, now_secs());
        let path = timer.time(Stage::Write, || self.store.save(&template, &lock))?;
        timer.finish();

        info!(
            user = %user,
            trials = trials.len(),
            features = template.features.len(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "enrolled"
        );
        Ok(EnrollReport { username: user, path, trials: trials.len(), timings: timer.stage_times.clone() })
    }

    /// Capture `enrollment_trials` recordings from `source`, then enroll.
    pub fn enroll_from_source<S>(
        &self,
        username: &str,
        source: &mut S,
        task: MentalTask,
    ) -> Result<EnrollReport, NeuroError>
    where
        S: SignalSource + ?Sized,
    {
        let user = Self::username(username)?;
        if self.store.exists(&user) {
            return Err(NeuroError::validation(format!("user '{}' is already enrolled", user)));
        }

        let mut timer = TelemetryTimer::new();
        let mut trials = Vec::with_capacity(self.config.enrollment_trials);
        {
            let mut capture = CaptureGuard::start(source)?;
            for i in 0..self.config.enrollment_trials {
                self.cancel.check()?;
                let raw = timer.time(Stage::Capture, || capture.record(self.config.capture_secs, task))?;
                debug!(trial = i + 1, of = self.config.enrollment_trials, "trial captured");
                trials.push(self.fill_empty(raw));
            }
        }
        self.enroll_timed(username, &trials, &mut timer)
    }

    // ============================================================
    // Authentication
    // ============================================================

    /// Match one recording against the stored template.
    ///
    /// `Ok` with `accepted == false` is a rejection; errors are reserved for
    /// failures (missing or tampered template, bad input, cancellation).
    pub fn authenticate(&self, username: &str, trial: &RawSignal) -> Result<AuthResult, NeuroError> {
        let mut timer = TelemetryTimer::new();
        let result = self.authenticate_timed(username, trial, &mut timer)?;
        timer.finish();
        debug!(elapsed_ms = timer.elapsed().as_millis() as u64, "authentication finished");
        Ok(result)
    }

    fn authenticate_timed(
        &self,
        username: &str,
        trial: &RawSignal,
        timer: &mut TelemetryTimer,
    ) -> Result<AuthResult, NeuroError> {
        let user = Self::username(username)?;
        self.cancel.check()?;

        let stored = timer.time(Stage::Read, || self.store.load(&user))?;
        timer.time(Stage::Verify, || self.hasher.verify(&stored.features, &stored.seal))?;
        self.cancel.check()?;

        let fresh = timer.time(Stage::Extract, || self.extractor.extract(trial))?;
        self.cancel.check()?;

        let result = timer.time(Stage::Match, || self.matcher.compare(fresh.as_slice(), stored.features.as_slice()))?;
        if !result.accepted {
            warn!(user = %user, score = result.score, threshold = self.matcher.threshold(), "authentication rejected");
            return Ok(result);
        }

        self.cancel.check()?;
        timer.time(Stage::Update, || self.refresh_template(stored, &fresh))?;
        info!(user = %user, score = result.score, "authentication accepted");
        Ok(result)
    }

    /// Post-acceptance write: refresh `last_used` and, when configured, blend
    /// the trial into the stored vector under a fresh seal.
    ///
    /// The record is re-read under the lock. If it was deleted or replaced
    /// after `matched` was loaded, the update is dropped and the accept stands.
    fn refresh_template(&self, matched: Template, fresh: &FeatureVector) -> Result<(), NeuroError> {
        let lock = self.store.lock(&matched.username)?;
        let mut template = match self.store.load(&matched.username) {
            Ok(current) => current,
            Err(NeuroError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(user = %matched.username, "template removed before refresh, update dropped");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if template.seal != matched.seal || template.features != matched.features {
            warn!(user = %matched.username, "template replaced before refresh, update dropped");
            return Ok(());
        }

        template.last_used = now_secs();
        if let Some(rate) = self.config.adaptive_rate {
            let updated = blend(&template.features, fresh, rate)?;
            template.seal = self.hasher.seal(&updated)?;
            template.features = updated;
            debug!(user = %template.username, rate, "template adapted");
        }
        self.store.save(&template, &lock)?;
        Ok(())
    }

    /// Capture and authenticate, retrying rejected attempts up to
    /// `max_auth_attempts` within `auth_timeout_secs`.
    pub fn authenticate_from_source<S>(
        &self,
        username: &str,
        source: &mut S,
        task: MentalTask,
    ) -> Result<AuthResult, NeuroError>
    where
        S: SignalSource + ?Sized,
    {
        let user = Self::username(username)?;
        if !self.store.exists(&user) {
            return Err(NeuroError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no template for '{}'", user),
            )));
        }

        let deadline = Instant::now() + Duration::from_secs(self.config.auth_timeout_secs);
        let mut capture = CaptureGuard::start(source)?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.cancel.check()?;

            let mut timer = TelemetryTimer::new();
            let raw = timer.time(Stage::Capture, || capture.record(self.config.capture_secs, task))?;
            let trial = self.fill_empty(raw);
            let mut result = self.authenticate_timed(username, &trial, &mut timer)?;
            result.attempts = attempt;

            if result.accepted || attempt >= self.config.max_auth_attempts {
                return Ok(result);
            }
            if Instant::now() >= deadline {
                warn!(user = %user, attempts = attempt, "authentication timed out");
                return Ok(result);
            }
            debug!(attempt, max = self.config.max_auth_attempts, "retrying authentication");
        }
    }

    // ============================================================
    // Management
    // ============================================================

    pub fn delete(&self, username: &str) -> Result<(), NeuroError> {
        let user = Self::username(username)?;
        self.cancel.check()?;
        self.store.delete(&user)
    }

    pub fn list(&self) -> Result<Vec<Username>, NeuroError> {
        self.store.list()
    }

    pub fn exists(&self, username: &str) -> Result<bool, NeuroError> {
        Ok(self.store.exists(&Self::username(username)?))
    }

    /// Load and integrity-check a template without matching.
    pub fn inspect(&self, username: &str) -> Result<Template, NeuroError> {
        let user = Self::username(username)?;
        let template = self.store.load(&user)?;
        self.hasher.verify(&template.features, &template.seal)?;
        Ok(template)
    }

    /// An empty capture becomes a zero matrix of the configured shape.
    fn fill_empty(&self, raw: RawSignal) -> RawSignal {
        if !raw.is_empty() {
            return raw;
        }
        warn!("capture returned no samples, substituting zeros");
        RawSignal::zeros(
            self.config.channels,
            self.config.samples_per_capture(),
            self.config.sampling_rate,
            raw.task,
        )
        .with_timestamp(raw.timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn features(scale: f32) -> FeatureVector {
        FeatureVector::new((0..40).map(|i| scale * (i as f32 + 1.0)).collect(), MentalTask::EyesClosedRest, 0)
    }

    fn session(dir: &std::path::Path, adaptive_rate: Option<f32>) -> AuthSession {
        let mut config = EngineConfig::default().with_template_dir(dir);
        config.adaptive_rate = adaptive_rate;
        AuthSession::new(config).unwrap()
    }

    fn store_template(s: &AuthSession, name: &str, fv: FeatureVector) -> Template {
        let seal = s.hasher.seal(&fv).unwrap();
        let t = Template::new(Username::parse(name).unwrap(), fv, seal, 1_700_000_000);
        let lock = s.store.lock(&t.username).unwrap();
        s.store.save(&t, &lock).unwrap();
        t
    }

    #[test]
    fn refresh_updates_last_used_and_adapts() {
        let dir = tempdir().unwrap();
        let s = session(dir.path(), Some(0.5));
        let matched = store_template(&s, "alice", features(1.0));

        s.refresh_template(matched.clone(), &features(3.0)).unwrap();

        let after = s.inspect("alice").unwrap();
        assert!(after.last_used > matched.last_used);
        assert_eq!(after.features.values, blend(&matched.features, &features(3.0), 0.5).unwrap().values);
        assert_ne!(after.seal, matched.seal);
    }

    #[test]
    fn refresh_after_delete_does_not_resurrect() {
        let dir = tempdir().unwrap();
        let s = session(dir.path(), None);
        let matched = store_template(&s, "alice", features(1.0));

        s.delete("alice").unwrap();
        s.refresh_template(matched, &features(1.0)).unwrap();

        assert!(!s.exists("alice").unwrap());
        assert!(s.list().unwrap().is_empty());
    }

    #[test]
    fn refresh_after_reenroll_keeps_new_template() {
        let dir = tempdir().unwrap();
        let s = session(dir.path(), Some(0.5));
        let matched = store_template(&s, "alice", features(1.0));

        s.delete("alice").unwrap();
        let replacement = store_template(&s, "alice", features(7.0));
        s.refresh_template(matched, &features(1.0)).unwrap();

        assert_eq!(s.inspect("alice").unwrap(), replacement);
    }

    #[test]
    fn second_refresh_of_same_match_is_dropped() {
        let dir = tempdir().unwrap();
        let s = session(dir.path(), Some(0.5));
        let matched = store_template(&s, "alice", features(1.0));

        s.refresh_template(matched.clone(), &features(3.0)).unwrap();
        let first = s.inspect("alice").unwrap();
        s.refresh_template(matched, &features(9.0)).unwrap();

        assert_eq!(s.inspect("alice").unwrap(), first);
    }
}
