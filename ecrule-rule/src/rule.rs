//! The editing context lifecycle rule.

use crate::{ContextFlavor, Description, RuleConfig, RuleError, RuleResult, RuleStatement, Statement};
use ecrule_registry::{ModelLoader, ModelRegistry, ResourceLocator};
use ecrule_storage::EditingContext;
use ecrule_types::{CallLog, LifecycleEvent};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};

/// Where a rule is in its single-shot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    /// Models loaded, context created and unlocked.
    Created,
    /// `before()` ran; the test body may use the context.
    Locked,
    /// `after()` has released the lock and is tearing down.
    Released,
    /// Context disposed and models unloaded. Terminal.
    Disposed,
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Locked => "locked",
            Self::Released => "released",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Manages one editing context for the duration of one test.
///
/// The rule dereferences to its [`EditingContext`], so a test can call
/// `rule.create_object(..)` or `rule.save_changes()` directly.
///
/// Dropping a rule whose `after()` never ran performs the same teardown,
/// so models loaded for a test are unloaded even if the test forgot.
pub struct EditingContextRule {
    context: EditingContext,
    loader: ModelLoader,
    loaded: BTreeSet<String>,
    config: RuleConfig,
    state: RuleState,
    call_log: Option<CallLog>,
}

impl EditingContextRule {
    pub fn builder(registry: &ModelRegistry) -> RuleBuilder {
        RuleBuilder {
            registry: registry.clone(),
            locator: ResourceLocator::default(),
            models: Vec::new(),
            config: RuleConfig::default(),
            call_log: None,
        }
    }

    /// A rule over a temporary (in-memory SQLite) context.
    pub fn temporary(
        registry: &ModelRegistry,
        locator: &ResourceLocator,
        model_names: &[&str],
    ) -> RuleResult<Self> {
        Self::builder(registry)
            .locator(locator.clone())
            .models(model_names.iter().copied())
            .flavor(ContextFlavor::Temporary)
            .build()
    }

    /// A rule over a mock (in-process map) context.
    pub fn mock(
        registry: &ModelRegistry,
        locator: &ResourceLocator,
        model_names: &[&str],
    ) -> RuleResult<Self> {
        Self::builder(registry)
            .locator(locator.clone())
            .models(model_names.iter().copied())
            .flavor(ContextFlavor::Mock)
            .build()
    }

    pub fn context(&self) -> &EditingContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EditingContext {
        &mut self.context
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.loader.registry()
    }

    /// Names of the models this rule loaded (and will unload).
    pub fn loaded_models(&self) -> &BTreeSet<String> {
        &self.loaded
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn state(&self) -> RuleState {
        self.state
    }

    fn record(&self, event: LifecycleEvent) {
        if let Some(log) = &self.call_log {
            log.record(event);
        }
    }

    /// Locks the context. Valid only once, on a freshly created rule.
    pub fn before(&mut self) -> RuleResult<()> {
        self.record(LifecycleEvent::Before);
        if self.state != RuleState::Created {
            return Err(RuleError::InvalidTransition {
                state: self.state,
                operation: "before",
            });
        }
        self.context.lock()?;
        self.state = RuleState::Locked;
        debug!(context = %self.context.id(), "Editing context rule ready");
        Ok(())
    }

    /// Tears the context down: unlock, optional revert, dispose (which
    /// unlocks once more), then unload the models this rule loaded.
    ///
    /// Every step runs even if an earlier one fails; the first failure is
    /// returned. Calling `after()` on a disposed rule does nothing.
    pub fn after(&mut self) -> RuleResult<()> {
        self.record(LifecycleEvent::After);
        if self.state == RuleState::Disposed {
            debug!(context = %self.context.id(), "Editing context rule already torn down");
            return Ok(());
        }

        self.context.unlock();
        self.state = RuleState::Released;

        let reverted = if self.config.revert_on_teardown {
            self.context.revert()
        } else {
            Ok(())
        };
        let disposed = self.context.dispose();
        self.loader.unload(&self.loaded);
        self.state = RuleState::Disposed;

        info!(
            context = %self.context.id(),
            unloaded = ?self.loaded,
            "Editing context rule torn down"
        );
        reverted.and(disposed).map_err(Into::into)
    }

    /// Wraps `base` so that evaluating the result runs `before()`, `base`
    /// and `after()`.
    pub fn apply<S: Statement>(&mut self, base: S, description: Description) -> RuleStatement<'_, S> {
        RuleStatement::new(self, base, description)
    }

    /// Runs `body` against the context with the same guarantees as
    /// [`apply`](Self::apply).
    pub fn run<F>(&mut self, description: Description, body: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut EditingContext) -> anyhow::Result<()>,
    {
        self.guarded(&description, |rule| body(&mut rule.context))
    }

    /// before → body → after, with `after()` always attempted.
    ///
    /// The body's failure wins over a teardown failure: a returned error is
    /// passed through unchanged and a panic is resumed once teardown is done.
    pub(crate) fn guarded<F>(&mut self, description: &Description, body: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Self) -> anyhow::Result<()>,
    {
        let span = info_span!("editing_context_rule", test = %description);
        let _entered = span.enter();

        if let Err(err) = self.before() {
            if let Err(cleanup) = self.after() {
                warn!(error = %cleanup, "Teardown after failed before() also failed");
            }
            return Err(err.into());
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(self)));
        let teardown = self.after();

        match outcome {
            Ok(Ok(())) => teardown.map_err(Into::into),
            Ok(Err(failure)) => {
                if let Err(cleanup) = teardown {
                    warn!(error = %cleanup, test_error = %failure, "Teardown failed after test failure");
                }
                Err(failure)
            }
            Err(payload) => {
                if let Err(cleanup) = teardown {
                    warn!(error = %cleanup, "Teardown failed after test panic");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

impl Deref for EditingContextRule {
    type Target = EditingContext;

    fn deref(&self) -> &EditingContext {
        &self.context
    }
}

impl DerefMut for EditingContextRule {
    fn deref_mut(&mut self) -> &mut EditingContext {
        &mut self.context
    }
}

impl Drop for EditingContextRule {
    fn drop(&mut self) {
        if self.state == RuleState::Disposed {
            return;
        }
        warn!(
            context = %self.context.id(),
            state = %self.state,
            "Editing context rule dropped before after(), tearing down"
        );
        if let Err(err) = self.after() {
            warn!(error = %err, "Teardown on drop failed");
        }
    }
}

impl fmt::Debug for EditingContextRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditingContextRule")
            .field("state", &self.state)
            .field("loaded", &self.loaded)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Configures and constructs an [`EditingContextRule`].
#[derive(Debug)]
pub struct RuleBuilder {
    registry: ModelRegistry,
    locator: ResourceLocator,
    models: Vec<String>,
    config: RuleConfig,
    call_log: Option<CallLog>,
}

impl RuleBuilder {
    #[must_use]
    pub fn locator(mut self, locator: ResourceLocator) -> Self {
        self.locator = locator;
        self
    }

    #[must_use]
    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.locator = self.locator.and_root(root);
        self
    }

    #[must_use]
    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.models.push(name.into());
        self
    }

    #[must_use]
    pub fn models(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.models.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: RuleConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn flavor(mut self, flavor: ContextFlavor) -> Self {
        self.config.flavor = flavor;
        self
    }

    #[must_use]
    pub fn revert_on_teardown(mut self, revert: bool) -> Self {
        self.config.revert_on_teardown = revert;
        self
    }

    /// Records the rule's, its context's and its loader's lifecycle calls.
    #[must_use]
    pub fn call_log(mut self, log: CallLog) -> Self {
        self.call_log = Some(log);
        self
    }

    /// Loads the requested models and creates the context.
    ///
    /// An unknown model name fails before anything is loaded or created.
    pub fn build(self) -> RuleResult<EditingContextRule> {
        let locator = self
            .config
            .resource_roots
            .iter()
            .fold(self.locator, |locator, root| locator.and_root(root));

        let mut loader = ModelLoader::new(self.registry.clone(), locator);
        if let Some(log) = &self.call_log {
            loader = loader.with_call_log(log.clone());
        }

        let loaded = loader.ensure_loaded(&self.models)?;

        let context = match self.config.flavor {
            ContextFlavor::Temporary => EditingContext::temporary(self.registry),
            ContextFlavor::Mock => Ok(EditingContext::mock(self.registry)),
        };
        let mut context = match context {
            Ok(context) => context,
            Err(err) => {
                loader.unload(&loaded);
                return Err(err.into());
            }
        };
        if let Some(log) = &self.call_log {
            context = context.with_call_log(log.clone());
        }

        info!(
            context = %context.id(),
            flavor = ?self.config.flavor,
            loaded = ?loaded,
            "Editing context rule created"
        );
        Ok(EditingContextRule {
            context,
            loader,
            loaded,
            config: self.config,
            state: RuleState::Created,
            call_log: self.call_log,
        })
    }
}
