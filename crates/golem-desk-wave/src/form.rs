//! Per-function argument form: seeds one field per parameter, tracks edits,
//! and turns a submission into an ordered list of encoded arguments.
//!
//! Submission is all-or-nothing. Unlike [`validate`](crate::validate), which
//! stops at the first problem inside one value, the form reports one error
//! for every parameter that fails.

use crate::encode::encode_args;
use crate::skeleton::skeleton;
use crate::validate::validate;
use golem_desk_types::{ComponentExportFunction, TypeDescriptor};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Lifecycle of one field: `Pristine -> Edited -> {Valid, Invalid}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldState {
    #[default]
    Pristine,
    Edited,
    Valid,
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct FormField {
    name: String,
    typ: TypeDescriptor,
    value: Value,
    /// Raw text as last typed, for values edited as JSON.
    text: Option<String>,
    /// Set while `text` does not parse; `value` then still holds the last
    /// good value.
    parse_error: Option<String>,
    state: FieldState,
}

impl FormField {
    fn new(name: &str, typ: &TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            typ: typ.clone(),
            value: skeleton(typ),
            text: None,
            parse_error: None,
            state: FieldState::Pristine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typ(&self) -> &TypeDescriptor {
        &self.typ
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The raw JSON text, if the field was last edited as text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            FieldState::Invalid(msg) => Some(msg),
            _ => None,
        }
    }

    fn check(&mut self) -> Option<String> {
        let result = match &self.parse_error {
            Some(msg) => Err(msg.clone()),
            None => validate(&self.value, &self.typ, &self.name).map_err(|e| e.to_string()),
        };
        match result {
            Ok(()) => {
                self.state = FieldState::Valid;
                None
            }
            Err(msg) => {
                self.state = FieldState::Invalid(msg.clone());
                Some(msg)
            }
        }
    }
}

/// Validation errors of a rejected submission, keyed by parameter name in
/// parameter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(IndexMap<String, String>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, parameter: &str) -> Option<&str> {
        self.0.get(parameter).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, msg) in self.0.values().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("function has no parameter named '{0}'")]
    UnknownField(String),
    #[error("{n} parameter(s) failed validation:\n{0}", n = .0.len())]
    Invalid(FormErrors),
}

/// A finished, validated invocation ready for the `golem` CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Worker the function is invoked on, when the form was bound to one.
    pub target: Option<String>,
    pub function: String,
    /// One encoded argument per parameter, in parameter order.
    pub args: Vec<String>,
}

/// Receives invocations from a successful submission.
///
/// Implemented for closures so tests and UI callbacks can pass a plain
/// `|invocation| ...`.
pub trait Invoker {
    type Output;

    fn invoke(&mut self, invocation: Invocation) -> Self::Output;
}

impl<F, T> Invoker for F
where
    F: FnMut(Invocation) -> T,
{
    type Output = T;

    fn invoke(&mut self, invocation: Invocation) -> T {
        self(invocation)
    }
}

/// Editing session for the arguments of one exported function.
#[derive(Debug, Clone)]
pub struct InvocationForm {
    function: ComponentExportFunction,
    target: Option<String>,
    fields: Vec<FormField>,
}

impl InvocationForm {
    pub fn new(function: ComponentExportFunction) -> Self {
        let fields = function
            .parameters
            .iter()
            .map(|p| FormField::new(&p.name, &p.typ))
            .collect();
        Self {
            function,
            target: None,
            fields,
        }
    }

    /// Bind the form to a worker.
    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn function(&self) -> &ComponentExportFunction {
        &self.function
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Result<&mut FormField, FormError> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// Replace a field's value. Clears that field's error, and only that one.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), FormError> {
        let field = self.field_mut(name)?;
        field.value = value;
        field.text = None;
        field.parse_error = None;
        field.state = FieldState::Edited;
        Ok(())
    }

    /// Edit a field as raw JSON text.
    ///
    /// Text that does not parse is kept as typed and marks the field
    /// invalid; the last good value is left untouched.
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), FormError> {
        let field = self.field_mut(name)?;
        field.text = Some(text.to_string());
        match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                field.value = value;
                field.parse_error = None;
                field.state = FieldState::Edited;
            }
            Err(e) => {
                let msg = format!("field '{}' is not valid JSON: {e}", field.name);
                field.parse_error = Some(msg.clone());
                field.state = FieldState::Invalid(msg);
            }
        }
        Ok(())
    }

    /// Put a field back to its skeleton value.
    pub fn reset(&mut self, name: &str) -> Result<(), FormError> {
        let field = self.field_mut(name)?;
        *field = FormField::new(&field.name, &field.typ);
        Ok(())
    }

    /// Current values keyed by parameter name.
    pub fn values(&self) -> IndexMap<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }

    /// Validate every field, updating each field's state.
    pub fn validate_all(&mut self) -> FormErrors {
        let mut errors = IndexMap::new();
        for field in &mut self.fields {
            if let Some(msg) = field.check() {
                errors.insert(field.name.clone(), msg);
            }
        }
        FormErrors(errors)
    }

    /// Validate and encode. Nothing is produced unless every field is valid.
    pub fn submit(&mut self) -> Result<Invocation, FormErrors> {
        let errors = self.validate_all();
        if !errors.is_empty() {
            tracing::debug!(
                function = %self.function.name,
                errors = errors.len(),
                "submission rejected"
            );
            return Err(errors);
        }
        Ok(Invocation {
            target: self.target.clone(),
            function: self.function.name.clone(),
            args: encode_args(&self.function, &self.values()),
        })
    }

    /// Submit and hand the invocation to `invoker`. The invoker is not
    /// called when validation fails.
    pub fn submit_with<I: Invoker>(&mut self, invoker: &mut I) -> Result<I::Output, FormErrors> {
        let invocation = self.submit()?;
        Ok(invoker.invoke(invocation))
    }
}
