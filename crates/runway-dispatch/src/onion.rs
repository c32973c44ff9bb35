//! Onion-ordered execution of a middleware stack around an inner call.

use runway_http::{Control, Middleware, Result};
use std::sync::Arc;

/// How far execution got through the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layered<T> {
	/// Every `before` phase continued and the inner call returned.
	Inner(T),
	/// The middleware at this position stopped the request.
	Stopped(usize),
}

/// Runs `before` outer-to-inner, then `inner`, then `after` inner-to-outer.
///
/// Every layer whose `before` phase returned (continue or stop) gets its
/// `after` phase, whatever happens further in. A layer whose `before`
/// fails is not entered. When several phases fail, the error raised first
/// is returned; `after` phases still all run.
pub fn around<S, T>(
	layers: &[Arc<dyn Middleware>],
	state: &mut S,
	mut before: impl FnMut(&mut S, &dyn Middleware) -> Result<Control>,
	inner: impl FnOnce(&mut S) -> Result<T>,
	mut after: impl FnMut(&mut S, &dyn Middleware) -> Result<()>,
) -> Result<Layered<T>> {
	let mut entered = 0;
	let mut outcome = None;

	for (position, layer) in layers.iter().enumerate() {
		match before(state, layer.as_ref()) {
			Ok(Control::Continue) => entered += 1,
			Ok(Control::Stop) => {
				entered += 1;
				outcome = Some(Ok(Layered::Stopped(position)));
				break;
			}
			Err(err) => {
				outcome = Some(Err(err));
				break;
			}
		}
	}

	let outcome = match outcome {
		Some(outcome) => outcome,
		None => inner(state).map(Layered::Inner),
	};

	let mut unwind_error = None;
	for layer in layers[..entered].iter().rev() {
		if let Err(err) = after(state, layer.as_ref()) {
			unwind_error.get_or_insert(err);
		}
	}

	let outcome = outcome?;
	match unwind_error {
		Some(err) => Err(err),
		None => Ok(outcome),
	}
}
