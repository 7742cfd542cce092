//! Shared helpers for unit tests.

use std::cell::{Cell, RefCell};

use crate::{
    deobfuscation::{EngineConfig, EquivalenceCache, EventLog, Pass, PassContext},
    sandbox::{BoaSandbox, Evaluator, SandboxValue},
    syntax::{parse, print, Ast},
    Error, Result,
};

/// Outcome of running one pass over a parsed snippet.
pub struct PassRun {
    pub ast: Ast,
    pub output: String,
    pub rewrites: usize,
    pub events: EventLog,
}

/// Runs `pass` once over `source` with the default configuration and a Boa sandbox.
pub fn run_pass(pass: &dyn Pass, source: &str) -> PassRun {
    run_pass_with(pass, source, &EngineConfig::default(), &BoaSandbox::default())
}

/// Runs `pass` once with an explicit configuration and evaluator.
pub fn run_pass_with(
    pass: &dyn Pass,
    source: &str,
    config: &EngineConfig,
    sandbox: &dyn Evaluator,
) -> PassRun {
    let mut ast = parse(source).unwrap();
    let events = EventLog::new();
    let mut cache = EquivalenceCache::new();
    let rewrites = {
        let mut ctx = PassContext::new(config, sandbox, &events, &mut cache);
        ctx.enter(pass.name());
        pass.run(&mut ast, &mut ctx).unwrap()
    };
    let output = print(&ast);
    PassRun {
        ast,
        output,
        rewrites,
        events,
    }
}

/// Runs `pass` and returns the error it fails with.
pub fn run_pass_err(pass: &dyn Pass, source: &str) -> Error {
    let mut ast = parse(source).unwrap();
    let events = EventLog::new();
    let mut cache = EquivalenceCache::new();
    let config = EngineConfig::default();
    let sandbox = BoaSandbox::default();
    let mut ctx = PassContext::new(&config, &sandbox, &events, &mut cache);
    ctx.enter(pass.name());
    match pass.run(&mut ast, &mut ctx) {
        Ok(rewrites) => panic!("pass succeeded with {rewrites} rewrites"),
        Err(error) => error,
    }
}

/// Evaluator that answers every snippet with a fixed value and records what it was asked.
pub struct ScriptedEvaluator {
    answer: SandboxValue,
    pub calls: Cell<usize>,
    pub sources: RefCell<Vec<String>>,
}

impl ScriptedEvaluator {
    pub fn new(answer: SandboxValue) -> Self {
        Self {
            answer,
            calls: Cell::new(0),
            sources: RefCell::new(Vec::new()),
        }
    }

    /// An evaluator that fails every call.
    pub fn failing() -> Self {
        Self::new(SandboxValue::Undefined)
    }
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(&self, source: &str) -> Result<SandboxValue> {
        self.calls.set(self.calls.get() + 1);
        self.sources.borrow_mut().push(source.to_string());
        match &self.answer {
            SandboxValue::Undefined => Err(Error::Sandbox("scripted failure".to_string())),
            answer => Ok(answer.clone()),
        }
    }
}
