use std::marker::PhantomData;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tenancy_core::{BeforeHook, HookContext, ServiceError};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "email" => Some("must be a valid email"),
        "length" => Some("has invalid length"),
        "range" => Some("is out of range"),
        _ => None,
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    // validator reports struct-level checks under `__all__`
    let field = if field == "__all__" { "_schema" } else { field };
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn push_field(out: &mut Map<String, Value>, key: String, msg: String) {
    match out.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
        Value::Array(list) => list.push(Value::String(msg)),
        other => *other = Value::Array(vec![Value::String(msg)]),
    }
}

fn push_validation_errors(out: &mut Map<String, Value>, prefix: &str, errs: &ValidationErrors) {
    for (field, kind) in errs.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let key = join_path(prefix, field);
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| m.to_string()))
                        .unwrap_or_else(|| e.code.to_string());
                    push_field(out, key.clone(), msg);
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                push_validation_errors(out, &join_path(prefix, field), nested.as_ref());
            }
            ValidationErrorsKind::List(items) => {
                let base = join_path(prefix, field);
                for (idx, nested) in items {
                    push_validation_errors(out, &format!("{base}[{idx}]"), nested.as_ref());
                }
            }
        }
    }
}

/// `{field: [messages]}` for a failed validation.
pub fn field_errors(errs: &ValidationErrors) -> Value {
    let mut out = Map::new();
    push_validation_errors(&mut out, "", errs);
    Value::Object(out)
}

/// Runs the record type's `validator` rules on create/update payloads.
///
/// A failure becomes a 422 carrying the field map in `errors`.
pub struct Validated<R>(PhantomData<fn() -> R>);

impl<R> Validated<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for Validated<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R> BeforeHook<R> for Validated<R>
where
    R: Validate + Send + Sync + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R>) -> Result<()> {
        let Some(data) = ctx.data.as_ref() else {
            return Ok(());
        };
        data.validate().map_err(|e| {
            ServiceError::unprocessable(format!("Invalid `{}` payload", ctx.service))
                .with_errors(field_errors(&e))
                .into_anyhow()
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use validator::Validate;

    use super::field_errors;

    #[derive(Debug, Validate)]
    struct Profile {
        #[validate(length(min = 2, message = "display_name must be at least 2 chars"))]
        display_name: String,
    }

    #[derive(Debug, Validate)]
    struct Contact {
        #[validate(email)]
        email: String,
    }

    #[derive(Debug, Validate)]
    struct Person {
        #[validate(nested)]
        profile: Profile,
        #[validate(nested)]
        contacts: Vec<Contact>,
    }

    #[test]
    fn nested_and_list_errors_are_flattened_with_paths() {
        let person = Person {
            profile: Profile {
                display_name: "x".into(),
            },
            contacts: vec![Contact {
                email: "nope".into(),
            }],
        };

        let errors = field_errors(&person.validate().unwrap_err());
        assert_eq!(
            errors["profile.display_name"],
            json!(["display_name must be at least 2 chars"])
        );
        assert_eq!(errors["contacts[0].email"], json!(["must be a valid email"]));
    }
}
