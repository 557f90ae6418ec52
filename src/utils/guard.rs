/// A scope guard that runs a cleanup closure when dropped.
///
/// The closure also runs while unwinding from a panic. Call [`ExitGuard::dismiss`]
/// once the guarded work has succeeded and the cleanup is no longer wanted.
///
/// # Examples
///
/// ```
/// use rusty_edit::utils::guard::ExitGuard;
///
/// let mut cleaned = false;
/// {
///     let _guard = ExitGuard::with(|| cleaned = true);
/// }
/// assert!(cleaned);
/// ```
pub struct ExitGuard<AtExit: FnOnce()> {
    exit_cb: Option<AtExit>,
}

impl<F: FnOnce()> ExitGuard<F> {
    /// Creates a guard that runs `f` on drop.
    pub fn with(f: F) -> Self {
        Self { exit_cb: Some(f) }
    }

    /// Disarms the guard; the cleanup closure will not run.
    pub fn dismiss(mut self) {
        self.exit_cb = None;
    }
}

impl<F: FnOnce()> Drop for ExitGuard<F> {
    fn drop(&mut self) {
        if let Some(f) = self.exit_cb.take() {
            f()
        }
    }
}
