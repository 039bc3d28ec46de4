//! Stack growth for deep recursion.
//!
//! Reading and evaluation are plain recursive functions with no tail-call
//! elimination, so deeply nested input or deep user recursion would overflow
//! the native stack. Recursive entry points wrap their bodies in
//! [`ensure_sufficient_stack`], which moves execution onto a freshly
//! allocated segment when the remaining stack runs low.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
