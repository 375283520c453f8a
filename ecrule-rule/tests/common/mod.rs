//! Shared fixtures and the flavor-independent scenario suite.

#![allow(dead_code)]

use ecrule_model::Entity;
use ecrule_registry::{ModelRegistry, ResourceLocator};
use ecrule_rule::{ContextFlavor, EditingContextRule, RuleResult, Statement};
use ecrule_storage::{EditingContext, StorageResult};
use ecrule_types::{CallLog, EntityId, LifecycleEvent};
use std::path::PathBuf;

pub const TEST_MODEL_NAME: &str = "Test";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn resources() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("resources")
}

/// A private registry and call log per test, so tests can run in parallel.
pub struct Fixture {
    pub registry: ModelRegistry,
    pub locator: ResourceLocator,
    pub log: CallLog,
    pub flavor: ContextFlavor,
}

impl Fixture {
    pub fn new(flavor: ContextFlavor) -> Self {
        init_tracing();
        Self {
            registry: ModelRegistry::new(),
            locator: ResourceLocator::with_root(resources()),
            log: CallLog::new(),
            flavor,
        }
    }

    pub fn create_editing_context(&self, model_names: &[&str]) -> RuleResult<EditingContextRule> {
        EditingContextRule::builder(&self.registry)
            .locator(self.locator.clone())
            .models(model_names.iter().copied())
            .flavor(self.flavor)
            .call_log(self.log.clone())
            .build()
    }

    pub fn count(&self, event: LifecycleEvent) -> usize {
        self.log.count(&event)
    }

    /// Registers `Test` directly, as if some other code loaded it first.
    pub fn preload_test_model(&self) {
        self.registry
            .add_model_with_path(&resources().join("Test.eomodel"))
            .unwrap();
    }
}

/// Typed access to `FooEntity` objects of the `Test` model.
pub struct FooEntity {
    pub id: EntityId,
}

impl FooEntity {
    pub const ENTITY_NAME: &'static str = "FooEntity";

    pub fn create(ec: &mut EditingContext) -> StorageResult<Self> {
        Ok(Self {
            id: ec.create_object(Self::ENTITY_NAME)?,
        })
    }

    pub fn set_bar(&self, ec: &mut EditingContext, bar: &str) -> StorageResult<()> {
        ec.set_value(&self.id, "bar", bar)
    }

    pub fn fetch_all(ec: &EditingContext) -> StorageResult<Vec<Entity>> {
        ec.fetch_all(Self::ENTITY_NAME)
    }
}

/// Stands in for a test body: records `Evaluate`, then optionally fails.
pub struct RecordingStatement {
    log: CallLog,
    failure: Option<&'static str>,
}

impl RecordingStatement {
    pub fn passing(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            failure: None,
        }
    }

    pub fn failing(log: &CallLog, message: &'static str) -> Self {
        Self {
            log: log.clone(),
            failure: Some(message),
        }
    }
}

impl Statement for RecordingStatement {
    fn evaluate(&mut self) -> anyhow::Result<()> {
        self.log.record(LifecycleEvent::Evaluate);
        match self.failure {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }
}

/// Instantiates the scenario suite every context flavor must pass.
#[allow(unused_macros)]
macro_rules! editing_context_scenarios {
    ($flavor:expr) => {
        use common::{FooEntity, Fixture, RecordingStatement, TEST_MODEL_NAME};
        use ecrule_registry::RegistryError;
        use ecrule_rule::{Description, RuleError, RuleState, Statement};
        use ecrule_types::LifecycleEvent;
        use pretty_assertions::assert_eq;

        fn fixture() -> Fixture {
            Fixture::new($flavor)
        }

        #[test]
        fn clear_editing_context_changes_after_test_execution() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context.before().unwrap();
            let foo = FooEntity::create(&mut editing_context).unwrap();
            foo.set_bar(&mut editing_context, "test").unwrap();
            editing_context.save_changes().unwrap();
            editing_context.after().unwrap();

            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());

            let editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();
            let result = FooEntity::fetch_all(&editing_context).unwrap();

            assert!(result.is_empty());
            let load = LifecycleEvent::LoadModel(TEST_MODEL_NAME.into());
            let unload = LifecycleEvent::UnloadModel(TEST_MODEL_NAME.into());
            assert_eq!(fx.count(load.clone()), 2);
            assert!(fx.log.contains_in_order(&[
                load.clone(),
                LifecycleEvent::SaveChanges,
                LifecycleEvent::Dispose,
                unload,
                load,
            ]));
        }

        #[test]
        fn dispose_editing_context_after_test_execution() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context.before().unwrap();
            assert_eq!(fx.count(LifecycleEvent::Dispose), 0);

            editing_context.after().unwrap();
            assert_eq!(fx.count(LifecycleEvent::Dispose), 1);
            assert!(editing_context.is_disposed());
        }

        #[test]
        fn do_not_remove_models_not_loaded_by_the_rule() {
            let fx = fixture();
            fx.preload_test_model();

            let mut editing_context = fx.create_editing_context(&[]).unwrap();
            editing_context.before().unwrap();
            editing_context.after().unwrap();

            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_some());
        }

        #[test]
        fn do_not_remove_preloaded_models_even_when_requested() {
            let fx = fixture();
            fx.preload_test_model();

            let mut editing_context = fx
                .create_editing_context(&[TEST_MODEL_NAME, "AnotherTest"])
                .unwrap();
            assert_eq!(
                editing_context.loaded_models().iter().collect::<Vec<_>>(),
                vec!["AnotherTest"]
            );
            editing_context.before().unwrap();
            editing_context.after().unwrap();

            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_some());
            assert!(fx.registry.model_named("AnotherTest").is_none());
        }

        #[test]
        fn ensure_editing_context_clean_up_is_triggered_after_test_execution() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context
                .apply(RecordingStatement::passing(&fx.log), Description::empty())
                .evaluate()
                .unwrap();

            assert!(fx
                .log
                .contains_in_order(&[LifecycleEvent::Evaluate, LifecycleEvent::After]));
            assert_eq!(editing_context.state(), RuleState::Disposed);
        }

        #[test]
        fn ensure_editing_context_clean_up_is_triggered_even_if_test_execution_fails() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            let result = editing_context
                .apply(RecordingStatement::failing(&fx.log, "test error"), Description::empty())
                .evaluate();

            let err = result.unwrap_err();
            assert_eq!(err.to_string(), "test error");
            assert!(fx
                .log
                .contains_in_order(&[LifecycleEvent::Evaluate, LifecycleEvent::After]));
            assert_eq!(fx.count(LifecycleEvent::Dispose), 1);
            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());
        }

        #[test]
        fn ensure_editing_context_clean_up_is_triggered_even_if_test_execution_panics() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                editing_context.run(Description::new("Scenarios", "panics"), |_| {
                    panic!("test error");
                })
            }));

            let payload = outcome.unwrap_err();
            assert_eq!(payload.downcast_ref::<&str>(), Some(&"test error"));
            assert!(fx
                .log
                .contains_in_order(&[LifecycleEvent::Before, LifecycleEvent::After]));
            assert_eq!(fx.count(LifecycleEvent::Dispose), 1);
            assert_eq!(editing_context.state(), RuleState::Disposed);
            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());
        }

        #[test]
        fn ensure_editing_context_initialization_is_triggered_before_test_execution() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context
                .apply(RecordingStatement::passing(&fx.log), Description::empty())
                .evaluate()
                .unwrap();

            assert!(fx.log.contains_in_order(&[
                LifecycleEvent::Before,
                LifecycleEvent::Lock,
                LifecycleEvent::Evaluate,
            ]));
        }

        #[test]
        fn full_callback_order() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context
                .apply(RecordingStatement::passing(&fx.log), Description::new("Scenarios", "order"))
                .evaluate()
                .unwrap();

            assert_eq!(
                fx.log.events(),
                vec![
                    LifecycleEvent::LoadModel(TEST_MODEL_NAME.into()),
                    LifecycleEvent::Before,
                    LifecycleEvent::Lock,
                    LifecycleEvent::Evaluate,
                    LifecycleEvent::After,
                    LifecycleEvent::Unlock,
                    LifecycleEvent::Dispose,
                    LifecycleEvent::Unlock,
                    LifecycleEvent::UnloadModel(TEST_MODEL_NAME.into()),
                ]
            );
        }

        #[test]
        fn exception_if_cannot_find_model() {
            let fx = fixture();

            let err = fx.create_editing_context(&["UnknownModel"]).unwrap_err();

            assert!(matches!(
                err,
                RuleError::Registry(RegistryError::ModelNotFound(ref name)) if name == "UnknownModel"
            ));
            assert_eq!(err.to_string(), "Cannot load model named 'UnknownModel'");
        }

        #[test]
        fn unknown_model_leaves_no_trace() {
            let fx = fixture();

            let err = fx
                .create_editing_context(&[TEST_MODEL_NAME, "UnknownModel"])
                .unwrap_err();

            assert_eq!(err.to_string(), "Cannot load model named 'UnknownModel'");
            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());
            assert!(fx.log.is_empty());
        }

        #[test]
        fn load_more_than_one_model() {
            let fx = fixture();
            let _editing_context = fx
                .create_editing_context(&[TEST_MODEL_NAME, "AnotherTest"])
                .unwrap();

            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_some());
            assert!(fx.registry.model_named("AnotherTest").is_some());
        }

        #[test]
        fn load_one_model() {
            let fx = fixture();
            let _editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_some());
        }

        #[test]
        fn load_one_model_inside_resources_folder() {
            let fx = fixture();
            let _editing_context = fx.create_editing_context(&["AnotherTest"]).unwrap();

            assert!(fx.registry.model_named("AnotherTest").is_some());
        }

        #[test]
        fn lock_editing_context_before_running_the_test_case() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[]).unwrap();

            assert_eq!(fx.count(LifecycleEvent::Lock), 0);
            editing_context.before().unwrap();

            assert_eq!(fx.count(LifecycleEvent::Lock), 1);
            assert!(editing_context.is_locked());
            assert_eq!(editing_context.state(), RuleState::Locked);
        }

        #[test]
        fn remove_models_loaded_by_the_rule_after_test_execution() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context.before().unwrap();
            editing_context.after().unwrap();

            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());
        }

        #[test]
        fn no_revert_on_teardown_by_default() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[]).unwrap();

            editing_context.before().unwrap();
            editing_context.after().unwrap();

            assert!(!editing_context.config().revert_on_teardown);
            assert_eq!(fx.count(LifecycleEvent::Revert), 0);
        }

        #[test]
        fn revert_editing_context_changes_after_running_the_test_case_when_configured() {
            let fx = fixture();
            let mut editing_context = ecrule_rule::EditingContextRule::builder(&fx.registry)
                .locator(fx.locator.clone())
                .flavor($flavor)
                .revert_on_teardown(true)
                .call_log(fx.log.clone())
                .build()
                .unwrap();

            editing_context.before().unwrap();
            assert_eq!(fx.count(LifecycleEvent::Revert), 0);

            editing_context.after().unwrap();
            assert_eq!(fx.count(LifecycleEvent::Revert), 1);
            assert!(fx
                .log
                .contains_in_order(&[LifecycleEvent::Revert, LifecycleEvent::Dispose]));
        }

        #[test]
        fn unlock_editing_context_after_running_the_test_case() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[]).unwrap();

            editing_context.before().unwrap();
            assert_eq!(fx.count(LifecycleEvent::Unlock), 0);

            editing_context.after().unwrap();

            // Disposal unlocks once more on its own.
            assert_eq!(fx.count(LifecycleEvent::Unlock), 2);
            assert_eq!(editing_context.unlock_calls(), 2);
            assert!(!editing_context.is_locked());
        }

        #[test]
        fn after_twice_is_a_noop() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context.before().unwrap();
            editing_context.after().unwrap();
            editing_context.after().unwrap();

            assert_eq!(fx.count(LifecycleEvent::Dispose), 1);
            assert_eq!(fx.count(LifecycleEvent::Unlock), 2);
            assert_eq!(fx.count(LifecycleEvent::UnloadModel(TEST_MODEL_NAME.into())), 1);
        }

        #[test]
        fn before_twice_is_rejected() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[]).unwrap();

            editing_context.before().unwrap();
            let err = editing_context.before().unwrap_err();

            assert!(matches!(
                err,
                RuleError::InvalidTransition { state: RuleState::Locked, operation: "before" }
            ));
            assert_eq!(fx.count(LifecycleEvent::Lock), 1);
        }

        #[test]
        fn after_without_before_still_cleans_up() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context.after().unwrap();

            assert_eq!(fx.count(LifecycleEvent::Lock), 0);
            assert_eq!(fx.count(LifecycleEvent::Dispose), 1);
            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());
        }

        #[test]
        fn dropping_the_rule_unloads_its_models() {
            let fx = fixture();
            {
                let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();
                editing_context.before().unwrap();
                assert!(fx.registry.model_named(TEST_MODEL_NAME).is_some());
            }

            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());
            assert_eq!(fx.count(LifecycleEvent::Dispose), 1);
        }

        #[test]
        fn dispose_is_not_called_during_before() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context.before().unwrap();

            assert_eq!(fx.count(LifecycleEvent::Dispose), 0);
            assert_eq!(fx.count(LifecycleEvent::Unlock), 0);
            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_some());
        }

        #[test]
        fn run_hands_the_context_to_the_body() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            editing_context
                .run(Description::new("Scenarios", "run"), |ec| {
                    let foo = FooEntity::create(ec)?;
                    foo.set_bar(ec, "test")?;
                    ec.save_changes()?;
                    assert_eq!(FooEntity::fetch_all(ec)?.len(), 1);
                    Ok(())
                })
                .unwrap();

            let fresh = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();
            assert!(FooEntity::fetch_all(&fresh).unwrap().is_empty());
        }

        #[test]
        fn body_error_is_returned_unchanged() {
            #[derive(Debug, thiserror::Error)]
            #[error("custom failure")]
            struct CustomFailure;

            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            let err = editing_context
                .run(Description::empty(), |_| Err(CustomFailure.into()))
                .unwrap_err();

            assert!(err.downcast_ref::<CustomFailure>().is_some());
            assert!(fx.registry.model_named(TEST_MODEL_NAME).is_none());
        }

        #[test]
        fn mutations_outside_before_after_fail() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&[TEST_MODEL_NAME]).unwrap();

            assert!(FooEntity::create(&mut editing_context).is_err());

            editing_context.before().unwrap();
            assert!(FooEntity::create(&mut editing_context).is_ok());
            editing_context.after().unwrap();

            assert!(FooEntity::create(&mut editing_context).is_err());
        }

        #[test]
        fn required_attributes_are_validated_on_save() {
            let fx = fixture();
            let mut editing_context = fx.create_editing_context(&["AnotherTest"]).unwrap();

            editing_context
                .run(Description::empty(), |ec| {
                    let another = ec.create_object("AnotherEntity")?;
                    assert!(ec.save_changes().is_err());
                    ec.set_value(&another, "label", "first")?;
                    ec.save_changes()?;
                    Ok(())
                })
                .unwrap();
        }
    };
}
