use serde_json::Value;
use thiserror::Error;

/// Configuration failures that terminate the process: these indicate a
/// deployment mistake no retry will fix.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("cannot load classifier {path}: {source:#}")]
    ClassifierLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("instance is already configured")]
    AlreadyConfigured,

    #[error("metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Two-state instance lifecycle: state materializes on the first qualifying
/// command and is never torn down within one process run.
pub enum Lifecycle<S> {
    Uninitialized,
    Configured(S),
}

impl<S> Lifecycle<S> {
    pub fn new() -> Self {
        Lifecycle::Uninitialized
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Lifecycle::Configured(_))
    }

    pub fn get_mut(&mut self) -> Option<&mut S> {
        match self {
            Lifecycle::Configured(s) => Some(s),
            Lifecycle::Uninitialized => None,
        }
    }

    /// Materialize state on first contact; later calls return the live state
    /// untouched. Used by the relaxed protocol, where any first command
    /// initializes the instance.
    pub fn get_or_init(
        &mut self,
        init: impl FnOnce() -> Result<S, FatalError>,
    ) -> Result<&mut S, FatalError> {
        if let Lifecycle::Uninitialized = self {
            *self = Lifecycle::Configured(init()?);
        }
        match self {
            Lifecycle::Configured(s) => Ok(s),
            Lifecycle::Uninitialized => unreachable!("state was configured above"),
        }
    }

    /// Strict transition: exactly one successful configure per instance.
    pub fn configure_once(
        &mut self,
        init: impl FnOnce() -> Result<S, FatalError>,
    ) -> Result<&mut S, FatalError> {
        if self.is_configured() {
            return Err(FatalError::AlreadyConfigured);
        }
        *self = Lifecycle::Configured(init()?);
        match self {
            Lifecycle::Configured(s) => Ok(s),
            Lifecycle::Uninitialized => unreachable!("state was configured above"),
        }
    }
}

impl<S> Default for Lifecycle<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The `action` field of a command document, when present and a string.
pub fn action(command: &Value) -> Option<&str> {
    command.get("action").and_then(Value::as_str)
}

/// The sender token of a command document, used to address acknowledgments.
pub fn sender(command: &Value) -> Option<&str> {
    command.get("from").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_or_init_runs_init_exactly_once() {
        let mut lc: Lifecycle<u32> = Lifecycle::new();
        let mut calls = 0;
        for _ in 0..3 {
            let s = lc
                .get_or_init(|| {
                    calls += 1;
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*s, 7);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn configure_once_rejects_second_configure() {
        let mut lc: Lifecycle<u32> = Lifecycle::new();
        lc.configure_once(|| Ok(1)).unwrap();
        assert!(matches!(
            lc.configure_once(|| Ok(2)),
            Err(FatalError::AlreadyConfigured)
        ));
        assert_eq!(lc.get_mut(), Some(&mut 1));
    }

    #[test]
    fn failed_init_leaves_instance_uninitialized() {
        let mut lc: Lifecycle<u32> = Lifecycle::new();
        let res = lc.configure_once(|| Err(FatalError::AlreadyConfigured));
        assert!(res.is_err());
        assert!(!lc.is_configured());
    }

    #[test]
    fn command_field_accessors() {
        let cmd = json!({"action": "configure", "from": "ops-7"});
        assert_eq!(action(&cmd), Some("configure"));
        assert_eq!(sender(&cmd), Some("ops-7"));
        assert_eq!(action(&json!({"action": 3})), None);
        assert_eq!(sender(&json!([])), None);
    }
}
