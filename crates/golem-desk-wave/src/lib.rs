//! Skeleton values, structural validation and wire-value encoding for
//! component invocation arguments.
//!
//! Everything here is pure and synchronous so it can be called from any
//! editor instance without coordination:
//! - [`skeleton`] seeds an editor with an empty value of the right shape
//! - [`validate`] checks an edited JSON value against its type
//! - [`encode`] and [`encode_typed`] render the text the `golem` CLI parses
//! - [`InvocationForm`] ties the three together for one exported function
//!
//! Values are `serde_json::Value`s built with `preserve_order`, so object
//! entries keep insertion order all the way into the encoded output.

pub mod encode;
pub mod form;
pub mod skeleton;
pub mod validate;

pub use encode::{EncodeContext, encode, encode_args, encode_typed, encode_with};
pub use form::{FieldState, FormError, FormErrors, FormField, Invocation, InvocationForm, Invoker};
pub use skeleton::{skeleton, skeleton_args};
pub use validate::{ValidationError, validate, validate_opt};

pub use golem_desk_types as types;
