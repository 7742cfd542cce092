//! `boa_engine` backend.

use boa_engine::{value::JsVariant, vm::RuntimeLimits, Context, JsString, JsValue, Source};

use crate::{
    sandbox::{Evaluator, SandboxConfig, SandboxValue},
    Error, Result,
};

/// Nested arrays deeper than this convert to [`SandboxValue::Object`].
const MAX_ARRAY_DEPTH: usize = 8;

/// Evaluator running each snippet in a fresh `boa_engine` context.
#[derive(Debug, Clone, Default)]
pub struct BoaSandbox {
    config: SandboxConfig,
}

impl BoaSandbox {
    /// Creates a sandbox with the given limits.
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// The limits applied to every evaluation.
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    fn context(&self) -> Context {
        let mut context = Context::default();
        let mut limits = RuntimeLimits::default();
        limits.set_loop_iteration_limit(self.config.loop_iteration_limit);
        limits.set_recursion_limit(self.config.recursion_limit);
        limits.set_stack_size_limit(self.config.stack_size_limit);
        context.set_runtime_limits(limits);
        context
    }
}

impl Evaluator for BoaSandbox {
    fn evaluate(&self, source: &str) -> Result<SandboxValue> {
        let mut context = self.context();
        let value = context
            .eval(Source::from_bytes(source))
            .map_err(|err| Error::Sandbox(err.to_string()))?;
        convert(&value, &mut context, 0)
    }
}

fn convert(value: &JsValue, context: &mut Context, depth: usize) -> Result<SandboxValue> {
    Ok(match value.variant() {
        JsVariant::Undefined => SandboxValue::Undefined,
        JsVariant::Null => SandboxValue::Null,
        JsVariant::Boolean(value) => SandboxValue::Bool(value),
        JsVariant::Float64(value) => SandboxValue::Number(value),
        JsVariant::Integer32(value) => SandboxValue::Number(f64::from(value)),
        JsVariant::String(value) => SandboxValue::String(value.to_std_string_lossy()),
        JsVariant::BigInt(_) | JsVariant::Symbol(_) => SandboxValue::Object,
        JsVariant::Object(object) => {
            if !object.is_array() || depth >= MAX_ARRAY_DEPTH {
                return Ok(SandboxValue::Object);
            }
            let length = object
                .get(JsString::from("length"), context)
                .and_then(|length| length.to_length(context))
                .map_err(|err| Error::Sandbox(err.to_string()))?;
            let mut elements = Vec::with_capacity(length as usize);
            for index in 0..length {
                let element = object
                    .get(index as u32, context)
                    .map_err(|err| Error::Sandbox(err.to_string()))?;
                elements.push(convert(&element, context, depth + 1)?);
            }
            SandboxValue::Array(elements)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_primitives() {
        let sandbox = BoaSandbox::default();
        assert_eq!(sandbox.evaluate("1 + 2").unwrap(), SandboxValue::Number(3.0));
        assert_eq!(sandbox.evaluate("0.5").unwrap(), SandboxValue::Number(0.5));
        assert_eq!(
            sandbox.evaluate("String.fromCharCode(104, 105)").unwrap(),
            SandboxValue::String("hi".to_string())
        );
        assert_eq!(sandbox.evaluate("!0").unwrap(), SandboxValue::Bool(true));
        assert_eq!(sandbox.evaluate("null").unwrap(), SandboxValue::Null);
        assert_eq!(sandbox.evaluate("var a = 1;").unwrap(), SandboxValue::Undefined);
        assert_eq!(sandbox.evaluate("({})").unwrap(), SandboxValue::Object);
    }

    #[test]
    fn converts_nested_arrays() {
        let sandbox = BoaSandbox::default();
        let value = sandbox.evaluate("[[1], 'x', null]").unwrap();
        assert_eq!(
            value,
            SandboxValue::Array(vec![
                SandboxValue::Array(vec![SandboxValue::Number(1.0)]),
                SandboxValue::String("x".to_string()),
                SandboxValue::Null,
            ])
        );
    }

    #[test]
    fn contexts_are_isolated() {
        let sandbox = BoaSandbox::default();
        sandbox.evaluate("var leaked = 1;").unwrap();
        assert!(sandbox.evaluate("leaked").is_err());
    }

    #[test]
    fn throws_and_limits_are_errors() {
        let config = SandboxConfig {
            loop_iteration_limit: 1_000,
            ..SandboxConfig::default()
        };
        let sandbox = BoaSandbox::new(config);
        assert!(matches!(sandbox.evaluate("throw 1"), Err(Error::Sandbox(_))));
        assert!(matches!(sandbox.evaluate("while (true) {}"), Err(Error::Sandbox(_))));
        assert!(matches!(sandbox.evaluate("var = ;"), Err(Error::Sandbox(_))));
    }
}
