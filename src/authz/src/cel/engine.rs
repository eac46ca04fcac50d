//! CEL expression engine with compiled program caching

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context, Program};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::cel::{
    context::EvalContext,
    convert::{cel_to_json, json_to_cel},
    error::{CelError, Result},
    functions,
};

/// Named CEL expression
#[derive(Debug, Clone, PartialEq)]
pub struct NamedExpr<'a> {
    pub name: &'a str,
    pub expr: &'a str,
}

/// CEL engine for compiling and evaluating expressions
///
/// The compiled program cache belongs to the engine instance; callers clear
/// it when the set of policy programs changes.
pub struct Engine {
    program_cache: DashMap<String, Arc<Program>>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            program_cache: DashMap::new(),
        }
    }

    /// Compile a CEL expression, reusing a cached program when possible
    ///
    /// # Errors
    /// Returns error if expression cannot be compiled
    pub fn compile(&self, name: &str, expr: &str) -> Result<Arc<Program>> {
        if let Some(prog) = self.program_cache.get(expr) {
            return Ok(prog.clone());
        }

        let program = Program::compile(expr).map_err(|e| CelError::CompilationError {
            name: name.to_string(),
            message: format!("{:?}", e),
        })?;

        let program = Arc::new(program);
        self.program_cache.insert(expr.to_string(), program.clone());
        Ok(program)
    }

    /// Evaluate definitions in order, then every output expression
    ///
    /// Each definition's result is bound under its name before the next one
    /// runs, so later definitions and all outputs may refer to it. Returns the
    /// outputs in the order given.
    pub fn evaluate_document(
        &self,
        definitions: &[NamedExpr<'_>],
        outputs: &[NamedExpr<'_>],
        ctx: &EvalContext,
    ) -> Result<Vec<(String, Value)>> {
        let mut context = Context::default();
        self.populate(&mut context, ctx);

        for def in definitions {
            let value = self.execute(def, &context)?;
            context.add_variable_from_value(def.name.to_string(), value);
        }

        outputs
            .iter()
            .map(|out| {
                let value = self.execute(out, &context)?;
                Ok((out.name.to_string(), cel_to_json(&value)))
            })
            .collect()
    }

    /// Clear the compiled program cache
    pub fn clear_cache(&self) {
        self.program_cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.program_cache.len(),
        }
    }

    fn execute(&self, named: &NamedExpr<'_>, context: &Context) -> Result<CelValue> {
        let program = self.compile(named.name, named.expr)?;
        program.execute(context).map_err(|e| CelError::EvaluationError {
            name: named.name.to_string(),
            message: format!("{:?}", e),
        })
    }

    fn populate(&self, context: &mut Context, ctx: &EvalContext) {
        for (key, value) in ctx.to_variables() {
            context.add_variable_from_value(key, json_to_cel(&value));
        }
        context.add_function("seconds", functions::seconds);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cached programs
    pub size: usize,
}
