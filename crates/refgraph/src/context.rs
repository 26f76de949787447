//! The data set: owning context of a graph of objects

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::reference::{FieldKind, PropertyFieldDescriptor, RefMaker, RefMakerExt};
use crate::undo::{UndoStack, UndoSuspender};
use crate::value::Value;

/// Configuration of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DataSetConfig {
    /// Maximum number of undo steps kept, `None` for no limit
    pub undo_limit: Option<usize>,

    /// Whether new objects pick up memorized default values
    pub memorize_defaults: bool,

    /// Whether every delivered notification is traced
    pub trace_notifications: bool,
}

impl Default for DataSetConfig {
    fn default() -> Self {
        Self {
            undo_limit: Some(20),
            memorize_defaults: true,
            trace_notifications: false,
        }
    }
}

impl DataSetConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with a custom undo limit.
    pub fn with_undo_limit(undo_limit: Option<usize>) -> Self {
        Self {
            undo_limit,
            ..Default::default()
        }
    }

    /// Create a configuration that traces every delivered notification.
    pub fn with_notification_tracing() -> Self {
        Self {
            trace_notifications: true,
            ..Default::default()
        }
    }

    /// Create a configuration that ignores memorized defaults.
    pub fn without_memorized_defaults() -> Self {
        Self {
            memorize_defaults: false,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Owning context of a set of objects.
///
/// Every object is created in a data set and reaches the undo stack and
/// the memorized defaults through it. Objects hold only a weak link to
/// their data set.
pub struct DataSet {
    config: DataSetConfig,
    undo_stack: UndoStack,
    user_defaults: RefCell<IndexMap<String, Value>>,
}

impl DataSet {
    /// Create a data set with default settings.
    pub fn new() -> Rc<Self> {
        Self::with_config(DataSetConfig::default())
    }

    /// Create a data set with the given settings.
    pub fn with_config(config: DataSetConfig) -> Rc<Self> {
        Rc::new(Self {
            undo_stack: UndoStack::new(config.undo_limit),
            config,
            user_defaults: RefCell::new(IndexMap::new()),
        })
    }

    /// Settings
    pub fn config(&self) -> &DataSetConfig {
        &self.config
    }

    /// The undo stack of this data set
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    /// Run `f` as one undoable step. See [`UndoStack::transaction`].
    pub fn undoable_transaction<R>(
        &self,
        display_name: impl Into<String>,
        f: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        self.undo_stack.transaction(display_name, f)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Memorized Defaults
    // ═══════════════════════════════════════════════════════════════════

    /// Store the current value of `field` on `object` as the default for
    /// new instances of the field's class.
    ///
    /// Panics if the field is not a property field flagged `MEMORIZE`.
    pub fn memorize_default_value(&self, object: &dyn RefMaker, field: &'static PropertyFieldDescriptor) {
        assert!(
            field.is_memorizable() && !field.is_reference_field(),
            "field '{}' cannot be memorized",
            field.identifier()
        );
        let value = object.property_field_value(field);
        let key = default_key(field);
        debug!(key = %key, value = %value, "memorized default value");
        self.user_defaults.borrow_mut().insert(key, value);
    }

    /// The memorized default of a field, if any.
    pub fn memorized_default(&self, field: &'static PropertyFieldDescriptor) -> Option<Value> {
        self.user_defaults.borrow().get(&default_key(field)).cloned()
    }

    /// Forget all memorized defaults.
    pub fn clear_memorized_defaults(&self) {
        self.user_defaults.borrow_mut().clear();
    }

    /// Initialize the `MEMORIZE` fields of `object` from the memorized
    /// defaults. Not recorded on the undo stack.
    pub fn load_user_defaults(&self, object: &dyn RefMaker) -> Result<()> {
        let _suspender = UndoSuspender::new(&self.undo_stack);
        for field in object.oo_type().all_fields() {
            if !field.is_memorizable() || !matches!(field.kind(), FieldKind::Property(_)) {
                continue;
            }
            if let Some(value) = self.memorized_default(field) {
                object.set_property_field_value(field, &value)?;
            }
        }
        Ok(())
    }
}

fn default_key(field: &'static PropertyFieldDescriptor) -> String {
    format!("{}.{}", field.defining_class().name(), field.identifier())
}

impl fmt::Debug for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSet")
            .field("config", &self.config)
            .field("undo_stack", &self.undo_stack)
            .field("user_defaults", &self.user_defaults.borrow().len())
            .finish()
    }
}
