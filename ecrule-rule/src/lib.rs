//! Editing context lifecycle rule for ecrule.
//!
//! An [`EditingContextRule`] gives one test its own [`EditingContext`]:
//!
//! 1. construction loads the requested models into the shared registry
//!    (failing fast on unknown names) and creates the context;
//! 2. [`before`](EditingContextRule::before) locks the context;
//! 3. the test body runs;
//! 4. [`after`](EditingContextRule::after) unlocks, optionally reverts,
//!    disposes the context and unloads exactly the models step 1 loaded.
//!
//! [`apply`](EditingContextRule::apply) wraps a [`Statement`] so that step 4
//! runs even when the body returns an error or panics, and the body's
//! failure is what the caller sees.
//!
//! ```no_run
//! use ecrule_registry::{ModelRegistry, ResourceLocator};
//! use ecrule_rule::{Description, EditingContextRule};
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = ModelRegistry::new();
//! let locator = ResourceLocator::with_root("tests/resources");
//! let mut rule = EditingContextRule::temporary(&registry, &locator, &["Test"])?;
//!
//! rule.run(Description::new("FooTest", "creates_foo"), |ec| {
//!     let foo = ec.create_object("FooEntity")?;
//!     ec.set_value(&foo, "bar", "test")?;
//!     ec.save_changes()?;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! [`EditingContext`]: ecrule_storage::EditingContext

mod config;
mod error;
mod rule;
mod statement;

pub use config::{ContextFlavor, RuleConfig, CONFIG_ENV, CONFIG_FILE_NAME};
pub use error::{RuleError, RuleResult};
pub use rule::{EditingContextRule, RuleBuilder, RuleState};
pub use statement::{Description, RuleStatement, Statement};
