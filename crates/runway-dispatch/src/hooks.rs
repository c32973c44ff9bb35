//! Named lifecycle events with before/after hook chains.
//!
//! Two events are built in: [`START`] wraps route execution and [`STOP`]
//! wraps sending the response. Further events are added with
//! [`EventRegistry::map`] and fired on demand.

use runway_http::{Error, Hook, HookContext, Output, Response, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Event fired around route execution.
pub const START: &str = "start";

/// Event fired around sending the response.
pub const STOP: &str = "stop";

/// Whether a built-in event carries this name.
pub fn is_builtin(event: &str) -> bool {
	event == START || event == STOP
}

/// Which side of an event a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	Before,
	After,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Before => f.write_str("before"),
			Self::After => f.write_str("after"),
		}
	}
}

/// Implementation of a mapped event.
pub type Action = Arc<dyn Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync>;

/// Hooks per event and phase, plus the actions of mapped events.
#[derive(Clone, Default)]
pub struct EventRegistry {
	hooks: HashMap<(Phase, String), Vec<Arc<dyn Hook>>>,
	actions: HashMap<String, Action>,
}

impl EventRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a hook to the chain of `event`. Hooks run in registration
	/// order.
	pub fn add(&mut self, phase: Phase, event: &str, hook: Arc<dyn Hook>) {
		self.hooks
			.entry((phase, event.to_string()))
			.or_default()
			.push(hook);
	}

	pub fn hooks(&self, phase: Phase, event: &str) -> &[Arc<dyn Hook>] {
		self.hooks
			.get(&(phase, event.to_string()))
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	/// Registers the action of a custom event, replacing any earlier one.
	///
	/// # Errors
	///
	/// [`Error::ReservedEvent`] for the built-in event names.
	pub fn map(&mut self, event: &str, action: Action) -> Result<()> {
		if is_builtin(event) {
			return Err(Error::ReservedEvent(event.to_string()));
		}
		self.actions.insert(event.to_string(), action);
		Ok(())
	}

	pub fn action(&self, event: &str) -> Option<&Action> {
		self.actions.get(event)
	}

	pub fn is_mapped(&self, event: &str) -> bool {
		self.actions.contains_key(event)
	}

	/// Runs the hook chain of `event`. A hook returning
	/// [`Control::Stop`](runway_http::Control::Stop) ends the chain.
	pub fn fire(
		&self,
		phase: Phase,
		event: &str,
		response: &mut Response,
		mut output: Output<'_>,
	) -> Result<()> {
		let hooks = self.hooks(phase, event);
		if hooks.is_empty() {
			return Ok(());
		}
		tracing::debug!(event = event, phase = %phase, hooks = hooks.len(), "Firing hooks");
		for (position, hook) in hooks.iter().enumerate() {
			let mut ctx = HookContext::new(event, &mut *response, output.reborrow());
			if hook.call(&mut ctx)?.is_stop() {
				tracing::debug!(
					event = event,
					phase = %phase,
					position = position,
					"Hook stopped the chain"
				);
				break;
			}
		}
		Ok(())
	}

	/// Runs a mapped event: before hooks, the action, then after hooks.
	/// Built-in events only run their hooks.
	///
	/// # Errors
	///
	/// [`Error::UnmappedHandler`] when the event is neither built in nor
	/// mapped.
	pub fn run(&self, event: &str, response: &mut Response, mut output: Output<'_>) -> Result<()> {
		let action = self.action(event);
		if action.is_none() && !is_builtin(event) {
			return Err(Error::UnmappedHandler(event.to_string()));
		}
		self.fire(Phase::Before, event, response, output.reborrow())?;
		if let Some(action) = action {
			let mut ctx = HookContext::new(event, &mut *response, output.reborrow());
			action(&mut ctx)?;
		}
		self.fire(Phase::After, event, response, output)
	}
}
